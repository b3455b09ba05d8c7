use async_trait::async_trait;
use serde_json::json;
use tracing::error;

use crate::alert::{AlertKind, AlertPayload, FindingDetail, ProductFinding};
use crate::detector::{is_new_data, persist, Detector, DetectorCtx, Outcome, SkipReason};
use crate::error::{AppError, Result};
use crate::types::{Account, AccountScope, SnapshotKind, SnapshotPayload};

/// Statuses that count as A+ content being live. "true" appears where the
/// upstream report carries a boolean instead of a review state.
const APPROVED_STATUSES: &[&str] = &["APPROVED", "PUBLISHED", "true"];

/// Flags products without approved/published A+ content. An absent status
/// counts as missing.
pub struct AplusMissing;

#[async_trait]
impl Detector for AplusMissing {
    fn kind(&self) -> AlertKind {
        AlertKind::APlusMissing
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

fn is_approved(status: Option<&str>) -> bool {
    status
        .map(str::trim)
        .is_some_and(|s| APPROVED_STATUSES.contains(&s))
}

async fn run(ctx: &DetectorCtx, account: &Account, scope: &AccountScope) -> Result<Outcome> {
    let Some(snapshot) = ctx
        .snapshots
        .latest(&account.id, SnapshotKind::AplusContent, scope)
        .await?
    else {
        return Ok(Outcome::Skipped(SkipReason::NoData));
    };
    if !is_new_data(ctx, &account.id, AlertKind::APlusMissing, scope, snapshot.created_at).await? {
        return Ok(Outcome::Skipped(SkipReason::NoNewData));
    }
    let SnapshotPayload::Aplus(records) = &snapshot.payload else {
        return Err(AppError::Snapshot(format!(
            "expected aplus payload, got {}",
            snapshot.payload.variant_name()
        )));
    };

    let findings: Vec<ProductFinding> = records
        .iter()
        .filter(|r| !is_approved(r.status.as_deref()))
        .map(|r| ProductFinding {
            asin: r.asin.clone(),
            sku: None,
            title: r.title.clone(),
            detail: FindingDetail::AplusStatus { status: r.status.clone() },
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
    });
    Ok(persist(
        ctx,
        &account.id,
        scope,
        AlertKind::APlusMissing,
        format!("{count} product(s) are missing A+ content"),
        payload,
        metadata,
    )
    .await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{account, ctx, scope, MemoryAlertRepo, MemorySnapshotStore};
    use crate::types::AplusRecord;
    use chrono::{Duration, Utc};

    fn record(asin: &str, status: Option<&str>) -> AplusRecord {
        AplusRecord {
            asin: asin.to_string(),
            title: None,
            status: status.map(str::to_string),
        }
    }

    async fn detect_with(records: Vec<AplusRecord>) -> Outcome {
        let snapshots = MemorySnapshotStore::new();
        let alerts = MemoryAlertRepo::new();
        snapshots.add(
            "a1",
            SnapshotKind::AplusContent,
            &scope(),
            Utc::now() - Duration::hours(1),
            SnapshotPayload::Aplus(records),
        );
        let ctx = ctx(&snapshots, &alerts);
        AplusMissing.detect(&ctx, &account("a1"), &scope()).await
    }

    #[tokio::test]
    async fn approved_statuses_are_not_flagged() {
        let outcome = detect_with(vec![
            record("B000A", Some("APPROVED")),
            record("B000B", Some("PUBLISHED")),
            record("B000C", Some("true")),
        ])
        .await;
        assert!(matches!(outcome, Outcome::Clean));
    }

    #[tokio::test]
    async fn absent_or_other_status_is_missing() {
        let outcome = detect_with(vec![
            record("B000A", None),
            record("B000B", Some("DRAFT")),
            record("B000C", Some("APPROVED")),
        ])
        .await;
        assert_eq!(outcome.count(), 2);
    }
}
