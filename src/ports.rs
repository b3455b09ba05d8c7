//! Boundary contracts the pipeline runs against. The concrete SQLite and
//! HTTP-relay implementations live in `db/` and `notifier`; tests substitute
//! in-memory doubles.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::alert::{Alert, AlertKind, AlertStatus, NewAlert};
use crate::error::Result;
use crate::notifier::NotificationMessage;
use crate::types::{Account, AccountScope, Snapshot, SnapshotKind};

/// Read-only access to collected operational snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Most recent snapshot of `kind` for an account scope, if any.
    async fn latest(
        &self,
        account_id: &str,
        kind: SnapshotKind,
        scope: &AccountScope,
    ) -> Result<Option<Snapshot>>;

    /// Up to `n` most recent snapshots, newest first.
    async fn recent(
        &self,
        account_id: &str,
        kind: SnapshotKind,
        scope: &AccountScope,
        n: u32,
    ) -> Result<Vec<Snapshot>>;
}

#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub status: Option<AlertStatus>,
    pub kind: Option<AlertKind>,
}

#[async_trait]
pub trait AlertRepository: Send + Sync {
    async fn create(&self, alert: NewAlert) -> Result<Alert>;

    /// Page of alerts for an account scope plus the unpaged total.
    async fn find(
        &self,
        account_id: &str,
        scope: &AccountScope,
        filter: AlertFilter,
        limit: i64,
        skip: i64,
    ) -> Result<(Vec<Alert>, i64)>;

    async fn find_by_id(&self, id: i64, account_id: &str) -> Result<Option<Alert>>;

    async fn mark_viewed(&self, id: i64, account_id: &str) -> Result<Option<Alert>>;

    /// Creation time of the newest alert of `kind` for an account scope.
    /// Detectors use this as the no-new-data idempotence gate.
    async fn latest_created_at(
        &self,
        account_id: &str,
        kind: AlertKind,
        scope: &AccountScope,
    ) -> Result<Option<DateTime<Utc>>>;
}

/// Enumeration of accounts eligible for a detection run: verified, not
/// opted out of monitoring, at least one region configured.
#[async_trait]
pub trait AccountSource: Send + Sync {
    async fn eligible_accounts(&self) -> Result<Vec<Account>>;
}

/// Delivery of one composed notification.
#[async_trait]
pub trait NotifyTransport: Send + Sync {
    async fn send(&self, email: &str, message: &NotificationMessage) -> Result<()>;
}
