use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use serde_json::json;
use tracing::error;

use crate::alert::{AlertKind, AlertPayload, DayFinding};
use crate::config::thresholds::{DROP_PCT, SALES_WINDOW_DAYS};
use crate::detector::{is_new_data, persist, Detector, DetectorCtx, Outcome, SkipReason};
use crate::error::{AppError, Result};
use crate::types::{Account, AccountScope, DayRecord, SnapshotKind, SnapshotPayload};

/// Time-series detector: flags days inside a fixed window ending yesterday
/// (UTC) whose revenue or unit count dropped ≥ 40% versus the previous day.
pub struct SalesDrop;

#[async_trait]
impl Detector for SalesDrop {
    fn kind(&self) -> AlertKind {
        AlertKind::SalesDrop
    }

    async fn detect(&self, ctx: &DetectorCtx, account: &Account, scope: &AccountScope) -> Outcome {
        match run(ctx, account, scope).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(account_id = %account.id, kind = %self.kind(), "detection failed: {e}");
                Outcome::Failed(e.to_string())
            }
        }
    }
}

async fn run(ctx: &DetectorCtx, account: &Account, scope: &AccountScope) -> Result<Outcome> {
    let Some(snapshot) = ctx
        .snapshots
        .latest(&account.id, SnapshotKind::SalesDaily, scope)
        .await?
    else {
        return Ok(Outcome::Skipped(SkipReason::NoData));
    };
    if !is_new_data(ctx, &account.id, AlertKind::SalesDrop, scope, snapshot.created_at).await? {
        return Ok(Outcome::Skipped(SkipReason::NoNewData));
    }
    let SnapshotPayload::SalesDaily(records) = &snapshot.payload else {
        return Err(AppError::Snapshot(format!(
            "expected sales_daily payload, got {}",
            snapshot.payload.variant_name()
        )));
    };

    let end = ctx.now.date_naive() - Duration::days(1);
    let start = end - Duration::days(SALES_WINDOW_DAYS - 1);
    let drops = find_drops(records, start, end);

    let count = drops.len();
    let Some(payload) = AlertPayload::daily_series(start, end, drops) else {
        return Ok(Outcome::Clean);
    };
    let metadata = json!({
        "snapshot_id": snapshot.id,
        "snapshot_created_at": snapshot.created_at,
        "window": { "start": start, "end": end },
        "drop_pct": DROP_PCT,
    });
    Ok(persist(
        ctx,
        &account.id,
        scope,
        AlertKind::SalesDrop,
        format!("Sales dropped sharply on {count} day(s)"),
        payload,
        metadata,
    )
    .await)
}

fn drop_pct(prev: f64, curr: f64) -> Option<f64> {
    // A side needs a positive previous value to yield a verdict.
    (prev > 0.0).then(|| (prev - curr) / prev * 100.0)
}

/// Pairwise day-over-day comparison inside [start, end]. Records are sorted
/// ascending first; only adjacent calendar days form a comparable pair.
fn find_drops(records: &[DayRecord], start: NaiveDate, end: NaiveDate) -> Vec<DayFinding> {
    let mut window: Vec<&DayRecord> = records
        .iter()
        .filter(|r| r.date >= start && r.date <= end)
        .collect();
    window.sort_by_key(|r| r.date);

    let mut drops = Vec::new();
    for pair in window.windows(2) {
        let (prev, curr) = (pair[0], pair[1]);
        if curr.date != prev.date + Duration::days(1) {
            continue;
        }
        let revenue_drop = drop_pct(prev.revenue, curr.revenue);
        let unit_drop = drop_pct(prev.units as f64, curr.units as f64);
        let flagged = revenue_drop.is_some_and(|p| p >= DROP_PCT)
            || unit_drop.is_some_and(|p| p >= DROP_PCT);
        if !flagged {
            continue;
        }
        drops.push(DayFinding {
            date: curr.date,
            revenue_prev: prev.revenue,
            revenue: curr.revenue,
            revenue_drop_pct: revenue_drop,
            units_prev: prev.units,
            units: curr.units,
            unit_drop_pct: unit_drop,
        });
    }
    drops
}
