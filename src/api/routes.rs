use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::alert::{Alert, AlertKind, AlertStatus};
use crate::api::health::HealthState;
use crate::error::AppError;
use crate::orchestrator::{Orchestrator, RunStats};
use crate::ports::{AlertFilter, AlertRepository};
use crate::types::AccountScope;

#[derive(Clone)]
pub struct ApiState {
    pub alerts: Arc<dyn AlertRepository>,
    pub orchestrator: Arc<Orchestrator>,
    pub health: Arc<HealthState>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/runs", post(trigger_run))
        .route("/accounts/:account_id/alerts", get(list_alerts))
        .route("/accounts/:account_id/alerts/:alert_id", get(get_alert))
        .route("/accounts/:account_id/alerts/:alert_id/viewed", post(mark_viewed))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param / response types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct AlertsQuery {
    pub region: String,
    pub country: String,
    pub status: Option<String>,
    pub kind: Option<String>,
    pub limit: Option<i64>,
    pub skip: Option<i64>,
}

#[derive(Serialize)]
pub struct AlertListResponse {
    pub alerts: Vec<Alert>,
    pub total: i64,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub runs_completed: u64,
    pub last_run_at_secs: u64,
    pub last_run_processed: u64,
    pub last_run_failed: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        runs_completed: state.health.runs_completed(),
        last_run_at_secs: state.health.last_run_at_secs(),
        last_run_processed: state.health.last_run_processed(),
        last_run_failed: state.health.last_run_failed(),
    })
}

/// Manual trigger. Same execution function, semantics and return shape as
/// the scheduled path.
async fn trigger_run(State(state): State<ApiState>) -> Result<Json<RunStats>, AppError> {
    let stats = state.orchestrator.run().await?;
    Ok(Json(stats))
}

async fn list_alerts(
    State(state): State<ApiState>,
    Path(account_id): Path<String>,
    Query(params): Query<AlertsQuery>,
) -> Result<Json<AlertListResponse>, AppError> {
    let status = params
        .status
        .as_deref()
        .map(|s| AlertStatus::parse(s).ok_or_else(|| AppError::Config(format!("unknown status {s:?}"))))
        .transpose()?;
    let kind = params
        .kind
        .as_deref()
        .map(|k| AlertKind::parse(k).ok_or_else(|| AppError::Config(format!("unknown kind {k:?}"))))
        .transpose()?;

    let scope = AccountScope::new(params.region, params.country);
    let limit = params.limit.unwrap_or(50).clamp(1, 500);
    let skip = params.skip.unwrap_or(0).max(0);

    let (alerts, total) = state
        .alerts
        .find(&account_id, &scope, AlertFilter { status, kind }, limit, skip)
        .await?;
    Ok(Json(AlertListResponse { alerts, total }))
}

async fn get_alert(
    State(state): State<ApiState>,
    Path((account_id, alert_id)): Path<(String, i64)>,
) -> Result<Json<Alert>, AppError> {
    state
        .alerts
        .find_by_id(alert_id, &account_id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

async fn mark_viewed(
    State(state): State<ApiState>,
    Path((account_id, alert_id)): Path<(String, i64)>,
) -> Result<Json<Alert>, AppError> {
    state
        .alerts
        .mark_viewed(alert_id, &account_id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}
