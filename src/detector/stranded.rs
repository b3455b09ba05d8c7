use async_trait::async_trait;
use serde_json::json;
use tracing::error;

use crate::alert::{AlertKind, AlertPayload, FindingDetail, ProductFinding};
use crate::config::thresholds::REPORT_FRESH_DAYS;
use crate::detector::{persist, Detector, DetectorCtx, Outcome, SkipReason};
use crate::error::{AppError, Result};
use crate::types::{Account, AccountScope, SnapshotKind, SnapshotPayload};

/// Presence detector over problem reports: every row in a fresh stranded
/// inventory or inbound non-compliance report is a finding; no threshold.
/// One implementation, registered once per report kind. The 3-day freshness
/// window is the idempotence gate.
pub struct ReportPresence {
    alert_kind: AlertKind,
    snapshot_kind: SnapshotKind,
    message_noun: &'static str,
}

impl ReportPresence {
    pub fn stranded_inventory() -> Self {
        Self {
            alert_kind: AlertKind::StrandedInventory,
            snapshot_kind: SnapshotKind::StrandedInventory,
            message_noun: "stranded inventory",
        }
    }

    pub fn inbound_shipments() -> Self {
        Self {
            alert_kind: AlertKind::InboundShipment,
            snapshot_kind: SnapshotKind::InboundNonCompliance,
            message_noun: "inbound shipment problems",
        }
    }
}

#[async_trait]
impl Detector for ReportPresence {
    fn kind(&self) -> AlertKind {
        self.alert_kind
    }

    async fn detect(&self, ctx: &DetectorCtx, account: &Account, scope: &AccountScope) -> Outcome {
        match self.run(ctx, account, scope).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(account_id = %account.id, kind = %self.alert_kind, "detection failed: {e}");
                Outcome::Failed(e.to_string())
            }
        }
    }
}

impl ReportPresence {
    async fn run(&self, ctx: &DetectorCtx, account: &Account, scope: &AccountScope) -> Result<Outcome> {
        let Some(snapshot) = ctx
            .snapshots
            .latest(&account.id, self.snapshot_kind, scope)
            .await?
        else {
            return Ok(Outcome::Skipped(SkipReason::NoData));
        };
        let age_days = (ctx.now.date_naive() - snapshot.created_at.date_naive()).num_days();
        if age_days > REPORT_FRESH_DAYS {
            return Ok(Outcome::Skipped(SkipReason::StaleSnapshot));
        }
        let SnapshotPayload::ReportRows(rows) = &snapshot.payload else {
            return Err(AppError::Snapshot(format!(
                "expected report_rows payload, got {}",
                snapshot.payload.variant_name()
            )));
        };

        let findings: Vec<ProductFinding> = rows
            .iter()
            .map(|row| ProductFinding {
                asin: row.asin.clone().unwrap_or_default(),
                sku: row.sku.clone(),
                title: row.title.clone(),
                detail: FindingDetail::ReportRow { columns: row.columns.clone() },
                message: None,
            })
            .collect();

        let count = findings.len();
        let Some(payload) = AlertPayload::products(findings) else {
            return Ok(Outcome::Clean);
        };
        let metadata = json!({
            "snapshot_id": snapshot.id,
            "snapshot_created_at": snapshot.created_at,
            "fresh_days": REPORT_FRESH_DAYS,
        });
        Ok(persist(
            ctx,
            &account.id,
            scope,
            self.alert_kind,
            format!("{count} report row(s) flag {}", self.message_noun),
            payload,
            metadata,
        )
        .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{account, ctx_at, scope, MemoryAlertRepo, MemorySnapshotStore};
    use crate::types::ReportRow;
    use chrono::{Duration, TimeZone, Utc};

    fn row(asin: &str, reason: &str) -> ReportRow {
        let mut columns = serde_json::Map::new();
        columns.insert("reason".to_string(), serde_json::Value::String(reason.to_string()));
        ReportRow {
            asin: Some(asin.to_string()),
            sku: None,
            title: None,
            columns,
        }
    }

    async fn detect_with(age_days: i64, rows: Vec<ReportRow>) -> Outcome {
        let snapshots = MemorySnapshotStore::new();
        let alerts = MemoryAlertRepo::new();
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();
        snapshots.add(
            "a1",
            SnapshotKind::StrandedInventory,
            &scope(),
            now - Duration::days(age_days),
            SnapshotPayload::ReportRows(rows),
        );
        let ctx = ctx_at(&snapshots, &alerts, now);
        ReportPresence::stranded_inventory()
            .detect(&ctx, &account("a1"), &scope())
            .await
    }

    #[tokio::test]
    async fn any_row_in_a_fresh_report_is_a_finding() {
        let outcome = detect_with(1, vec![row("B000A", "stranded"), row("B000B", "no listing")]).await;
        assert_eq!(outcome.count(), 2);
    }

    #[tokio::test]
    async fn four_day_old_report_skips_as_stale() {
        // Stale skip must be distinguishable from an empty fresh report.
        let outcome = detect_with(4, vec![row("B000A", "stranded")]).await;
        assert!(matches!(outcome, Outcome::Skipped(SkipReason::StaleSnapshot)));
    }

    #[tokio::test]
    async fn empty_fresh_report_is_clean_not_skipped() {
        let outcome = detect_with(1, Vec::new()).await;
        assert!(matches!(outcome, Outcome::Clean));
    }

    #[tokio::test]
    async fn inbound_variant_tags_its_own_kind() {
        let snapshots = MemorySnapshotStore::new();
        let alerts = MemoryAlertRepo::new();
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();
        snapshots.add(
            "a1",
            SnapshotKind::InboundNonCompliance,
            &scope(),
            now - Duration::days(1),
            SnapshotPayload::ReportRows(vec![row("B000A", "label mismatch")]),
        );
        let ctx = ctx_at(&snapshots, &alerts, now);
        let outcome = ReportPresence::inbound_shipments()
            .detect(&ctx, &account("a1"), &scope())
            .await;
        assert_eq!(outcome.count(), 1);
        assert_eq!(alerts.kinds(), vec![AlertKind::InboundShipment]);
    }
}
