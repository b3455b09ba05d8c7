//! Shared health state for the /health endpoint.
//! Updated by the orchestrator after every run, read by the API.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::orchestrator::RunStats;

/// Last-run metrics. Written by whichever path triggered the run (schedule
/// or manual), read by the API.
#[derive(Default)]
pub struct HealthState {
    /// Unix seconds of the last completed run (0 = none yet).
    pub last_run_at_secs: AtomicU64,
    pub last_run_processed: AtomicU64,
    pub last_run_failed: AtomicU64,
    pub runs_completed: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_run(&self, stats: &RunStats, completed_at_secs: u64) {
        self.last_run_at_secs.store(completed_at_secs, Ordering::Relaxed);
        self.last_run_processed
            .store(stats.processed_accounts as u64, Ordering::Relaxed);
        self.last_run_failed
            .store(stats.failed_accounts as u64, Ordering::Relaxed);
        self.runs_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn last_run_at_secs(&self) -> u64 {
        self.last_run_at_secs.load(Ordering::Relaxed)
    }

    pub fn last_run_processed(&self) -> u64 {
        self.last_run_processed.load(Ordering::Relaxed)
    }

    pub fn last_run_failed(&self) -> u64 {
        self.last_run_failed.load(Ordering::Relaxed)
    }

    pub fn runs_completed(&self) -> u64 {
        self.runs_completed.load(Ordering::Relaxed)
    }
}
