use std::sync::Arc;

use chrono::Utc;
use futures_util::future::join_all;
use tracing::{info, warn};

use crate::alert::AlertKind;
use crate::detector::{all_detectors, Detector, DetectorCtx, Outcome};
use crate::error::{AppError, Result};
use crate::notifier::Notifier;
use crate::ports::{AlertRepository, SnapshotStore};
use crate::types::Account;

/// One account's result for one run: every detector's outcome in registry
/// order (per configured scope), plus the derived totals that gate the
/// notification decision.
#[derive(Debug)]
pub struct AccountRunSummary {
    pub account_id: String,
    pub outcomes: Vec<(AlertKind, Outcome)>,
}

impl AccountRunSummary {
    pub fn total_findings(&self) -> usize {
        self.outcomes.iter().map(|(_, o)| o.count()).sum()
    }

    pub fn failed_detectors(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_failure()).count()
    }

    /// Finding counts merged by kind across scopes, in first-appearance order.
    pub fn kind_counts(&self) -> Vec<(AlertKind, usize)> {
        let mut counts: Vec<(AlertKind, usize)> = Vec::new();
        for (kind, outcome) in &self.outcomes {
            match counts.iter_mut().find(|(k, _)| k == kind) {
                Some((_, count)) => *count += outcome.count(),
                None => counts.push((*kind, outcome.count())),
            }
        }
        counts
    }
}

pub struct Aggregator {
    snapshots: Arc<dyn SnapshotStore>,
    alerts: Arc<dyn AlertRepository>,
    notifier: Arc<Notifier>,
    detectors: Vec<Arc<dyn Detector>>,
}

impl Aggregator {
    pub fn new(
        snapshots: Arc<dyn SnapshotStore>,
        alerts: Arc<dyn AlertRepository>,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            snapshots,
            alerts,
            notifier,
            detectors: all_detectors(),
        }
    }

    #[cfg(test)]
    pub fn with_detectors(
        snapshots: Arc<dyn SnapshotStore>,
        alerts: Arc<dyn AlertRepository>,
        notifier: Arc<Notifier>,
        detectors: Vec<Arc<dyn Detector>>,
    ) -> Self {
        Self { snapshots, alerts, notifier, detectors }
    }

    /// Runs the full detector set over every configured scope of one account,
    /// then makes the notification decision. Detector faults land in the
    /// summary, never abort siblings; only a broken account configuration is
    /// an error for the caller.
    pub async fn run_account(&self, account: &Account) -> Result<AccountRunSummary> {
        if account.regions.is_empty() {
            return Err(AppError::Account(format!(
                "account {} has no regions configured",
                account.id
            )));
        }

        let ctx = DetectorCtx {
            snapshots: Arc::clone(&self.snapshots),
            alerts: Arc::clone(&self.alerts),
            now: Utc::now(),
        };

        let mut outcomes = Vec::with_capacity(self.detectors.len() * account.regions.len());
        for scope in &account.regions {
            // Every detector settles before the notification decision.
            let settled = join_all(self.detectors.iter().map(|detector| {
                let ctx = &ctx;
                async move { (detector.kind(), detector.detect(ctx, account, scope).await) }
            }))
            .await;
            outcomes.extend(settled);
        }

        for (kind, outcome) in &outcomes {
            if let Outcome::Failed(msg) = outcome {
                warn!(account_id = %account.id, kind = %kind, "detector failed: {msg}");
            }
        }

        let summary = AccountRunSummary {
            account_id: account.id.clone(),
            outcomes,
        };
        let total = summary.total_findings();
        info!(
            account_id = %account.id,
            findings = total,
            detector_failures = summary.failed_detectors(),
            "account aggregation complete"
        );

        if total > 0 && account.subscribed != Some(false) {
            if let Err(e) = self.notifier.notify(account, &summary).await {
                warn!(account_id = %account.id, "notification send failed: {e}");
            }
        }

        Ok(summary)
    }
}
