//! In-memory implementations of the boundary traits plus small builders,
//! shared by the detector/aggregator/orchestrator test modules.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::alert::{Alert, AlertKind, AlertStatus, NewAlert};
use crate::detector::DetectorCtx;
use crate::error::{AppError, Result};
use crate::notifier::NotificationMessage;
use crate::ports::{AccountSource, AlertFilter, AlertRepository, NotifyTransport, SnapshotStore};
use crate::types::{Account, AccountScope, Snapshot, SnapshotKind, SnapshotPayload};

pub fn scope() -> AccountScope {
    AccountScope::new("NA", "US")
}

pub fn account(id: &str) -> Account {
    Account {
        id: id.to_string(),
        email: format!("{id}@example.com"),
        first_name: "Test".to_string(),
        subscribed: None,
        regions: vec![scope()],
    }
}

pub fn ctx_at(
    snapshots: &Arc<MemorySnapshotStore>,
    alerts: &Arc<MemoryAlertRepo>,
    now: DateTime<Utc>,
) -> DetectorCtx {
    DetectorCtx {
        snapshots: Arc::clone(snapshots) as Arc<dyn SnapshotStore>,
        alerts: Arc::clone(alerts) as Arc<dyn AlertRepository>,
        now,
    }
}

pub fn ctx(snapshots: &Arc<MemorySnapshotStore>, alerts: &Arc<MemoryAlertRepo>) -> DetectorCtx {
    ctx_at(snapshots, alerts, Utc::now())
}

// ---------------------------------------------------------------------------
// Snapshot store double
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemorySnapshotStore {
    inner: Mutex<Vec<Snapshot>>,
    next_id: AtomicI64,
}

impl MemorySnapshotStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add(
        &self,
        account_id: &str,
        kind: SnapshotKind,
        scope: &AccountScope,
        created_at: DateTime<Utc>,
        payload: SnapshotPayload,
    ) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.lock().unwrap().push(Snapshot {
            id,
            account_id: account_id.to_string(),
            kind,
            region: scope.region.clone(),
            country: scope.country.clone(),
            created_at,
            payload,
        });
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn latest(
        &self,
        account_id: &str,
        kind: SnapshotKind,
        scope: &AccountScope,
    ) -> Result<Option<Snapshot>> {
        Ok(self.recent(account_id, kind, scope, 1).await?.into_iter().next())
    }

    async fn recent(
        &self,
        account_id: &str,
        kind: SnapshotKind,
        scope: &AccountScope,
        n: u32,
    ) -> Result<Vec<Snapshot>> {
        let mut matching: Vec<Snapshot> = self
            .inner
            .lock()
            .unwrap()
            .iter()
            .filter(|s| {
                s.account_id == account_id
                    && s.kind == kind
                    && s.region == scope.region
                    && s.country == scope.country
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.truncate(n as usize);
        Ok(matching)
    }
}

// ---------------------------------------------------------------------------
// Alert repository double
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryAlertRepo {
    inner: Mutex<Vec<Alert>>,
}

impl MemoryAlertRepo {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn all(&self) -> Vec<Alert> {
        self.inner.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<AlertKind> {
        self.inner.lock().unwrap().iter().map(|a| a.kind).collect()
    }
}

#[async_trait]
impl AlertRepository for MemoryAlertRepo {
    async fn create(&self, alert: NewAlert) -> Result<Alert> {
        alert.validate()?;
        let mut inner = self.inner.lock().unwrap();
        let now = Utc::now();
        let stored = Alert {
            id: inner.len() as i64 + 1,
            account_id: alert.account_id,
            region: alert.region,
            country: alert.country,
            kind: alert.kind,
            status: AlertStatus::Active,
            viewed: false,
            message: alert.message,
            payload: alert.payload,
            metadata: alert.metadata,
            created_at: now,
            updated_at: now,
        };
        inner.push(stored.clone());
        Ok(stored)
    }

    async fn find(
        &self,
        account_id: &str,
        scope: &AccountScope,
        filter: AlertFilter,
        limit: i64,
        skip: i64,
    ) -> Result<(Vec<Alert>, i64)> {
        let mut matching: Vec<Alert> = self
            .inner
            .lock()
            .unwrap()
            .iter()
            .filter(|a| {
                a.account_id == account_id
                    && a.region == scope.region
                    && a.country == scope.country
                    && filter.status.map_or(true, |s| a.status == s)
                    && filter.kind.map_or(true, |k| a.kind == k)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn find_by_id(&self, id: i64, account_id: &str) -> Result<Option<Alert>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == id && a.account_id == account_id)
            .cloned())
    }

    async fn mark_viewed(&self, id: i64, account_id: &str) -> Result<Option<Alert>> {
        let mut inner = self.inner.lock().unwrap();
        let Some(alert) = inner
            .iter_mut()
            .find(|a| a.id == id && a.account_id == account_id)
        else {
            return Ok(None);
        };
        alert.viewed = true;
        alert.updated_at = Utc::now();
        Ok(Some(alert.clone()))
    }

    async fn latest_created_at(
        &self,
        account_id: &str,
        kind: AlertKind,
        scope: &AccountScope,
    ) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .iter()
            .filter(|a| {
                a.account_id == account_id
                    && a.kind == kind
                    && a.region == scope.region
                    && a.country == scope.country
            })
            .map(|a| a.created_at)
            .max())
    }
}

// ---------------------------------------------------------------------------
// Notification transport double
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingTransport {
    fail: bool,
    pub sent: Mutex<Vec<(String, NotificationMessage)>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl NotifyTransport for RecordingTransport {
    async fn send(&self, email: &str, message: &NotificationMessage) -> Result<()> {
        if self.fail {
            return Err(AppError::Notify("transport down".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((email.to_string(), message.clone()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Account source double
// ---------------------------------------------------------------------------

pub struct MemoryAccounts {
    accounts: Vec<Account>,
}

impl MemoryAccounts {
    pub fn new(accounts: Vec<Account>) -> Arc<Self> {
        Arc::new(Self { accounts })
    }
}

#[async_trait]
impl AccountSource for MemoryAccounts {
    async fn eligible_accounts(&self) -> Result<Vec<Account>> {
        Ok(self.accounts.clone())
    }
}

/// Account source whose enumeration always fails.
pub struct FailingAccounts;

#[async_trait]
impl AccountSource for FailingAccounts {
    async fn eligible_accounts(&self) -> Result<Vec<Account>> {
        Err(AppError::Account("enumeration backend unavailable".to_string()))
    }
}
