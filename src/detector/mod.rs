pub mod aplus;
pub mod buybox;
pub mod content_change;
pub mod low_inventory;
pub mod reviews;
pub mod sales_drop;
pub mod stranded;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::alert::{AlertKind, AlertPayload, NewAlert};
use crate::error::Result;
use crate::ports::{AlertRepository, SnapshotStore};
use crate::types::{Account, AccountScope};

/// Shared read/write handles plus the run's wall clock. Date-window
/// detectors read `now` from here, never from the system clock.
#[derive(Clone)]
pub struct DetectorCtx {
    pub snapshots: Arc<dyn SnapshotStore>,
    pub alerts: Arc<dyn AlertRepository>,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No snapshot of the required kind exists for this account scope.
    NoData,
    /// Diff detector with fewer than two historical snapshots.
    InsufficientHistory,
    /// Snapshot exists but falls outside the detector's freshness window.
    StaleSnapshot,
    /// Newest snapshot is already covered by the most recent stored alert.
    NoNewData,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SkipReason::NoData => "no data",
            SkipReason::InsufficientHistory => "insufficient snapshot history",
            SkipReason::StaleSnapshot => "stale snapshot",
            SkipReason::NoNewData => "no new data",
        };
        write!(f, "{s}")
    }
}

/// Per-detector result for one account scope. `Skipped` is not a failure;
/// `Failed` carries the fault message for the run summary.
#[derive(Debug, Clone)]
pub enum Outcome {
    Created { alert_id: i64, count: usize },
    Clean,
    Skipped(SkipReason),
    Failed(String),
}

impl Outcome {
    pub fn count(&self) -> usize {
        match self {
            Outcome::Created { count, .. } => *count,
            _ => 0,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Created { alert_id, count } => {
                write!(f, "created alert {alert_id} with {count} finding(s)")
            }
            Outcome::Clean => write!(f, "clean"),
            Outcome::Skipped(reason) => write!(f, "skipped: {reason}"),
            Outcome::Failed(msg) => write!(f, "failed: {msg}"),
        }
    }
}

/// One alert condition's evaluation unit. Implementations are read-only over
/// snapshots, never read another detector's output, and map every internal
/// fault to `Outcome::Failed` instead of propagating it.
#[async_trait]
pub trait Detector: Send + Sync {
    fn kind(&self) -> AlertKind;

    async fn detect(&self, ctx: &DetectorCtx, account: &Account, scope: &AccountScope) -> Outcome;
}

/// The fixed detector set, in notification row order.
pub fn all_detectors() -> Vec<Arc<dyn Detector>> {
    vec![
        Arc::new(content_change::ProductContentChange),
        Arc::new(buybox::BuyBoxMissing),
        Arc::new(reviews::NegativeReviews),
        Arc::new(aplus::AplusMissing),
        Arc::new(sales_drop::SalesDrop),
        Arc::new(low_inventory::LowInventory),
        Arc::new(stranded::ReportPresence::stranded_inventory()),
        Arc::new(stranded::ReportPresence::inbound_shipments()),
    ]
}

/// True when `snapshot_ts` is strictly newer than the most recent stored
/// alert of `kind` for this account scope. The gate that makes re-running
/// against unchanged snapshots a no-op.
pub(crate) async fn is_new_data(
    ctx: &DetectorCtx,
    account_id: &str,
    kind: AlertKind,
    scope: &AccountScope,
    snapshot_ts: DateTime<Utc>,
) -> Result<bool> {
    let last = ctx.alerts.latest_created_at(account_id, kind, scope).await?;
    Ok(match last {
        Some(alert_ts) => snapshot_ts > alert_ts,
        None => true,
    })
}

/// Writes one alert for a non-empty findings payload and maps the write
/// result into an Outcome. A failed write loses the finding for this run;
/// logged, never fatal.
pub(crate) async fn persist(
    ctx: &DetectorCtx,
    account_id: &str,
    scope: &AccountScope,
    kind: AlertKind,
    message: String,
    payload: AlertPayload,
    metadata: serde_json::Value,
) -> Outcome {
    let count = payload.count();
    let new_alert = NewAlert {
        account_id: account_id.to_string(),
        region: scope.region.clone(),
        country: scope.country.clone(),
        kind,
        message,
        payload,
        metadata,
    };

    match ctx.alerts.create(new_alert).await {
        Ok(alert) => {
            info!(
                account_id,
                kind = %kind,
                alert_id = alert.id,
                findings = count,
                "alert created"
            );
            Outcome::Created { alert_id: alert.id, count }
        }
        Err(e) => {
            error!(account_id, kind = %kind, "alert write failed: {e}");
            Outcome::Failed(format!("alert write failed: {e}"))
        }
    }
}
