mod aggregator;
mod alert;
mod api;
mod config;
mod db;
mod detector;
mod error;
mod notifier;
mod orchestrator;
mod ports;
mod scheduler;
#[cfg(test)]
mod testutil;
mod types;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::aggregator::Aggregator;
use crate::api::health::HealthState;
use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::db::{SqliteAccountSource, SqliteAlertRepository, SqliteSnapshotStore};
use crate::error::Result;
use crate::notifier::{HttpRelayTransport, MessageTemplate, Notifier};
use crate::orchestrator::Orchestrator;
use crate::ports::{AccountSource, AlertRepository, NotifyTransport, SnapshotStore};
use crate::scheduler::{Schedule, Scheduler};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let pool = sqlx::SqlitePool::connect(&format!("sqlite:{}", cfg.db_path)).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database ready at {}", cfg.db_path);

    // --- Boundary adapters ---
    let snapshots: Arc<dyn SnapshotStore> = Arc::new(SqliteSnapshotStore::new(pool.clone()));
    let alerts: Arc<dyn AlertRepository> = Arc::new(SqliteAlertRepository::new(pool.clone()));
    let accounts: Arc<dyn AccountSource> = Arc::new(SqliteAccountSource::new(pool.clone()));

    // --- Notifier: transport + template resolved once, passed in ---
    let transport: Arc<dyn NotifyTransport> =
        Arc::new(HttpRelayTransport::new(cfg.relay_url.clone())?);
    let template = MessageTemplate::from_config(&cfg);
    let notifier = Arc::new(Notifier::new(transport, template));
    info!("Notification relay: {}", cfg.relay_url);

    // --- Pipeline ---
    let aggregator = Aggregator::new(Arc::clone(&snapshots), Arc::clone(&alerts), notifier);
    let health = Arc::new(HealthState::new());
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&accounts),
        aggregator,
        Arc::clone(&health),
    ));

    // --- Detection schedule ---
    let schedule = Schedule::parse(&cfg.schedule, cfg.schedule_utc_offset_hours)?;
    info!(
        schedule = %cfg.schedule,
        utc_offset_hours = cfg.schedule_utc_offset_hours,
        "Detection schedule armed"
    );
    let scheduler = Scheduler::new(schedule, Arc::clone(&orchestrator));
    tokio::spawn(async move { scheduler.run().await });

    // --- HTTP API server ---
    let api_state = ApiState {
        alerts: Arc::clone(&alerts),
        orchestrator: Arc::clone(&orchestrator),
        health: Arc::clone(&health),
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
