use async_trait::async_trait;
use serde_json::json;
use tracing::error;

use crate::alert::{AlertKind, AlertPayload, FindingDetail, ProductFinding};
use crate::config::thresholds::RATING_FLOOR;
use crate::detector::{is_new_data, persist, Detector, DetectorCtx, Outcome, SkipReason};
use crate::error::{AppError, Result};
use crate::types::{Account, AccountScope, SnapshotKind, SnapshotPayload};

/// Flags products whose average star rating fell below the floor.
/// Non-numeric ratings are excluded, not flagged.
pub struct NegativeReviews;

#[async_trait]
impl Detector for NegativeReviews {
    fn kind(&self) -> AlertKind {
        AlertKind::NegativeReviews
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
        .latest(&account.id, SnapshotKind::Reviews, scope)
        .await?
    else {
        return Ok(Outcome::Skipped(SkipReason::NoData));
    };
    if !is_new_data(ctx, &account.id, AlertKind::NegativeReviews, scope, snapshot.created_at).await? {
        return Ok(Outcome::Skipped(SkipReason::NoNewData));
    }
    let SnapshotPayload::Reviews(records) = &snapshot.payload else {
        return Err(AppError::Snapshot(format!(
            "expected reviews payload, got {}",
            snapshot.payload.variant_name()
        )));
    };

    let findings: Vec<ProductFinding> = records
        .iter()
        .filter_map(|r| {
            let rating = r.star_rating.as_deref()?.trim().parse::<f64>().ok()?;
            (rating < RATING_FLOOR).then(|| ProductFinding {
                asin: r.asin.clone(),
                sku: None,
                title: r.title.clone(),
                detail: FindingDetail::Review { rating },
                message: Some(format!("Average rating {rating:.2} is below {RATING_FLOOR:.1}")),
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
        "rating_floor": RATING_FLOOR,
    });
    Ok(persist(
        ctx,
        &account.id,
        scope,
        AlertKind::NegativeReviews,
        format!("{count} product(s) rated below {RATING_FLOOR:.1} stars"),
        payload,
        metadata,
    )
    .await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{account, ctx, scope, MemoryAlertRepo, MemorySnapshotStore};
    use crate::types::ReviewRecord;
    use chrono::{Duration, Utc};

    fn review(asin: &str, rating: &str) -> ReviewRecord {
        ReviewRecord {
            asin: asin.to_string(),
            title: None,
            star_rating: Some(rating.to_string()),
        }
    }

    async fn detect_with(records: Vec<ReviewRecord>) -> (Outcome, Vec<crate::alert::Alert>) {
        let snapshots = MemorySnapshotStore::new();
        let alerts = MemoryAlertRepo::new();
        let acct = account("a1");
        let sc = scope();
        snapshots.add(
            "a1",
            SnapshotKind::Reviews,
            &sc,
            Utc::now() - Duration::hours(1),
            SnapshotPayload::Reviews(records),
        );
        let ctx = ctx(&snapshots, &alerts);
        let outcome = NegativeReviews.detect(&ctx, &acct, &sc).await;
        (outcome, alerts.all())
    }

    #[tokio::test]
    async fn rating_just_below_floor_is_flagged() {
        let (outcome, alerts) = detect_with(vec![review("B000X", "3.99")]).await;
        assert_eq!(outcome.count(), 1);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::NegativeReviews);
    }

    #[tokio::test]
    async fn rating_at_floor_is_not_flagged() {
        let (outcome, alerts) = detect_with(vec![review("B000X", "4.00")]).await;
        assert!(matches!(outcome, Outcome::Clean));
        assert!(alerts.is_empty());
    }

    #[tokio::test]
    async fn non_numeric_rating_is_excluded() {
        let (outcome, alerts) =
            detect_with(vec![review("B000X", "n/a"), review("B000Y", "2.5")]).await;
        assert_eq!(outcome.count(), 1);
        assert_eq!(alerts[0].payload.count(), 1);
    }

    #[tokio::test]
    async fn missing_snapshot_skips_with_no_data() {
        let snapshots = MemorySnapshotStore::new();
        let alerts = MemoryAlertRepo::new();
        let ctx = ctx(&snapshots, &alerts);
        let outcome = NegativeReviews.detect(&ctx, &account("a1"), &scope()).await;
        assert!(matches!(outcome, Outcome::Skipped(SkipReason::NoData)));
    }
}
