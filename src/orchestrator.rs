use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use futures_util::future::join_all;
use serde::Serialize;
use tracing::{error, info};

use crate::aggregator::Aggregator;
use crate::api::health::HealthState;
use crate::config::{BATCH_PAUSE_MS, BATCH_SIZE};
use crate::error::Result;
use crate::ports::AccountSource;

/// Totals for one orchestrator invocation. Serialized as the manual
/// trigger's response body.
#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    pub enumerated_accounts: usize,
    pub processed_accounts: usize,
    pub failed_accounts: usize,
    pub duration_seconds: f64,
}

/// Fans the aggregator out over all eligible accounts in fixed-size batches.
/// Every account in a batch settles before the next batch starts; a fixed
/// pause between batches bounds pressure on downstream systems.
pub struct Orchestrator {
    accounts: Arc<dyn AccountSource>,
    aggregator: Aggregator,
    health: Arc<HealthState>,
    batch_size: usize,
    batch_pause: Duration,
}

impl Orchestrator {
    pub fn new(
        accounts: Arc<dyn AccountSource>,
        aggregator: Aggregator,
        health: Arc<HealthState>,
    ) -> Self {
        Self::with_policy(
            accounts,
            aggregator,
            health,
            BATCH_SIZE,
            Duration::from_millis(BATCH_PAUSE_MS),
        )
    }

    pub fn with_policy(
        accounts: Arc<dyn AccountSource>,
        aggregator: Aggregator,
        health: Arc<HealthState>,
        batch_size: usize,
        batch_pause: Duration,
    ) -> Self {
        Self {
            accounts,
            aggregator,
            health,
            batch_size: batch_size.max(1),
            batch_pause,
        }
    }

    /// One full detection run. Only account enumeration is fatal; each
    /// account settles on its own and a failure is counted without touching
    /// its batch siblings. Shared by the scheduler and the manual trigger.
    pub async fn run(&self) -> Result<RunStats> {
        let started = Instant::now();
        let accounts = self.accounts.eligible_accounts().await?;
        let enumerated = accounts.len();
        let batches = enumerated.div_ceil(self.batch_size);
        info!(accounts = enumerated, batches, "detection run started");

        let mut processed = 0usize;
        let mut failed = 0usize;

        for (index, batch) in accounts.chunks(self.batch_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.batch_pause).await;
            }

            let settled = join_all(batch.iter().map(|account| async move {
                (account, self.aggregator.run_account(account).await)
            }))
            .await;

            for (account, result) in settled {
                processed += 1;
                if let Err(e) = result {
                    failed += 1;
                    error!(account_id = %account.id, "account aggregation failed: {e}");
                }
            }
            info!(batch = index + 1, of = batches, size = batch.len(), "batch settled");
        }

        let stats = RunStats {
            enumerated_accounts: enumerated,
            processed_accounts: processed,
            failed_accounts: failed,
            duration_seconds: started.elapsed().as_secs_f64(),
        };
        self.health.record_run(&stats, now_secs());
        info!(
            processed = stats.processed_accounts,
            failed = stats.failed_accounts,
            duration_s = format_args!("{:.1}", stats.duration_seconds),
            "detection run complete"
        );
        Ok(stats)
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
