use async_trait::async_trait;
use serde_json::json;
use tracing::error;

use crate::alert::{AlertKind, AlertPayload, FindingDetail, ProductFinding};
use crate::config::thresholds::REPLENISH_QTY;
use crate::detector::{persist, Detector, DetectorCtx, Outcome, SkipReason};
use crate::error::{AppError, Result};
use crate::types::{Account, AccountScope, SnapshotKind, SnapshotPayload, StockRecord};

/// Flags products that are out of stock, or in stock with a recommended
/// replenishment quantity above the threshold. Only runs against a
/// replenishment report collected the same UTC calendar day. The report is
/// refreshed daily, so the day window doubles as the idempotence gate.
pub struct LowInventory;

#[async_trait]
impl Detector for LowInventory {
    fn kind(&self) -> AlertKind {
        AlertKind::LowInventory
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

/// Out-of-stock takes precedence over the quantity threshold.
fn flag(record: &StockRecord) -> Option<FindingDetail> {
    let qty = record.recommended_qty.unwrap_or(0);
    if record.out_of_stock {
        return Some(FindingDetail::Stock { out_of_stock: true, recommended_qty: qty });
    }
    (qty > REPLENISH_QTY).then_some(FindingDetail::Stock {
        out_of_stock: false,
        recommended_qty: qty,
    })
}

async fn run(ctx: &DetectorCtx, account: &Account, scope: &AccountScope) -> Result<Outcome> {
    let Some(snapshot) = ctx
        .snapshots
        .latest(&account.id, SnapshotKind::Replenishment, scope)
        .await?
    else {
        return Ok(Outcome::Skipped(SkipReason::NoData));
    };
    if snapshot.created_at.date_naive() != ctx.now.date_naive() {
        return Ok(Outcome::Skipped(SkipReason::StaleSnapshot));
    }
    let SnapshotPayload::Replenishment(records) = &snapshot.payload else {
        return Err(AppError::Snapshot(format!(
            "expected replenishment payload, got {}",
            snapshot.payload.variant_name()
        )));
    };

    let findings: Vec<ProductFinding> = records
        .iter()
        .filter_map(|r| {
            flag(r).map(|detail| ProductFinding {
                asin: r.asin.clone(),
                sku: r.sku.clone(),
                title: r.title.clone(),
                detail,
                message: None,
            })
        })
        .collect();

    let count = findings.len();
    let Some(payload) = AlertPayload::products(findings) else {
        return Ok(Outcome::Clean);
    };
    let metadata = json!({
        "snapshot_id": snapshot.id,
        "snapshot_created_at": snapshot.created_at,
        "replenish_qty": REPLENISH_QTY,
    });
    Ok(persist(
        ctx,
        &account.id,
        scope,
        AlertKind::LowInventory,
        format!("{count} product(s) are low on inventory"),
        payload,
        metadata,
    )
    .await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{account, ctx_at, scope, MemoryAlertRepo, MemorySnapshotStore};
    use chrono::{Duration, TimeZone, Utc};

    fn stock(asin: &str, out_of_stock: bool, qty: i64) -> StockRecord {
        StockRecord {
            asin: asin.to_string(),
            sku: None,
            title: None,
            out_of_stock,
            recommended_qty: Some(qty),
        }
    }

    async fn detect_with(age_hours: i64, records: Vec<StockRecord>) -> Outcome {
        let snapshots = MemorySnapshotStore::new();
        let alerts = MemoryAlertRepo::new();
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 18, 0, 0).unwrap();
        snapshots.add(
            "a1",
            SnapshotKind::Replenishment,
            &scope(),
            now - Duration::hours(age_hours),
            SnapshotPayload::Replenishment(records),
        );
        let ctx = ctx_at(&snapshots, &alerts, now);
        LowInventory.detect(&ctx, &account("a1"), &scope()).await
    }

    #[tokio::test]
    async fn qty_boundary_is_strictly_above_threshold() {
        let outcome = detect_with(1, vec![stock("B000A", false, 31), stock("B000B", false, 30)]).await;
        assert_eq!(outcome.count(), 1);
    }

    #[tokio::test]
    async fn out_of_stock_is_flagged_regardless_of_qty() {
        let outcome = detect_with(1, vec![stock("B000A", true, 0)]).await;
        assert_eq!(outcome.count(), 1);
    }

    #[tokio::test]
    async fn out_of_stock_takes_precedence_over_threshold() {
        let outcome = detect_with(1, vec![stock("B000A", true, 50)]).await;
        match outcome {
            Outcome::Created { count, .. } => assert_eq!(count, 1),
            other => panic!("expected Created, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn report_from_a_previous_day_skips() {
        // now is 18:00; 20 hours ago lands on the previous UTC day.
        let outcome = detect_with(20, vec![stock("B000A", true, 50)]).await;
        assert!(matches!(outcome, Outcome::Skipped(SkipReason::StaleSnapshot)));
    }
}
