use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::json;
use tracing::error;

use crate::alert::{AlertKind, AlertPayload, ContentField, FindingDetail, ProductFinding};
use crate::detector::{is_new_data, persist, Detector, DetectorCtx, Outcome, SkipReason};
use crate::error::{AppError, Result};
use crate::types::{Account, AccountScope, ContentRecord, Snapshot, SnapshotKind, SnapshotPayload};

/// Diff detector: compares the two most recent catalog snapshots per ASIN
/// and flags listings whose title, description, bullets or images changed.
pub struct ProductContentChange;

#[async_trait]
impl Detector for ProductContentChange {
    fn kind(&self) -> AlertKind {
        AlertKind::ProductContentChange
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
    let history = ctx
        .snapshots
        .recent(&account.id, SnapshotKind::ProductContent, scope, 2)
        .await?;
    if history.is_empty() {
        return Ok(Outcome::Skipped(SkipReason::NoData));
    }
    if history.len() < 2 {
        return Ok(Outcome::Skipped(SkipReason::InsufficientHistory));
    }

    let newest = &history[0];
    let previous = &history[1];

    // The two-most-recent pointer only advances when a new snapshot lands;
    // an alert at least as new as `newest` means this pair was already seen.
    if !is_new_data(ctx, &account.id, AlertKind::ProductContentChange, scope, newest.created_at)
        .await?
    {
        return Ok(Outcome::Skipped(SkipReason::NoNewData));
    }

    let newest_records = content_records(newest)?;
    let previous_by_asin: HashMap<&str, &ContentRecord> = content_records(previous)?
        .iter()
        .map(|r| (r.asin.as_str(), r))
        .collect();

    let mut findings = Vec::new();
    for record in newest_records {
        let Some(prev) = previous_by_asin.get(record.asin.as_str()) else {
            continue;
        };
        let changed = changed_fields(prev, record);
        if changed.is_empty() {
            continue;
        }
        let labels: Vec<String> = changed.iter().map(ToString::to_string).collect();
        findings.push(ProductFinding {
            asin: record.asin.clone(),
            sku: record.sku.clone(),
            title: record.title.clone(),
            detail: FindingDetail::ContentChange { changed_fields: changed },
            message: Some(format!("Changed: {}", labels.join(", "))),
        });
    }

    let count = findings.len();
    let Some(payload) = AlertPayload::products(findings) else {
        return Ok(Outcome::Clean);
    };
    let metadata = json!({
        "snapshot_ids": [newest.id, previous.id],
        "snapshot_created_at": [newest.created_at, previous.created_at],
    });
    Ok(persist(
        ctx,
        &account.id,
        scope,
        AlertKind::ProductContentChange,
        format!("{count} product listing(s) changed content"),
        payload,
        metadata,
    )
    .await)
}

fn content_records(snapshot: &Snapshot) -> Result<&[ContentRecord]> {
    match &snapshot.payload {
        SnapshotPayload::Content(records) => Ok(records),
        other => Err(AppError::Snapshot(format!(
            "expected content payload, got {}",
            other.variant_name()
        ))),
    }
}

/// Collapse whitespace runs and trim, so formatting noise never diffs.
fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn normalize_opt(s: &Option<String>) -> String {
    s.as_deref().map(normalize).unwrap_or_default()
}

fn normalize_list(items: &[String]) -> Vec<String> {
    items.iter().map(|s| normalize(s)).collect()
}

/// Field-by-field comparison after normalization. List equality is
/// order-sensitive; any one field differing flags the ASIN.
fn changed_fields(prev: &ContentRecord, curr: &ContentRecord) -> Vec<ContentField> {
    let mut changed = Vec::new();
    if normalize_opt(&prev.title) != normalize_opt(&curr.title) {
        changed.push(ContentField::Title);
    }
    if normalize_opt(&prev.description) != normalize_opt(&curr.description) {
        changed.push(ContentField::Description);
    }
    if normalize_list(&prev.bullet_points) != normalize_list(&curr.bullet_points) {
        changed.push(ContentField::BulletPoints);
    }
    if normalize_list(&prev.images) != normalize_list(&curr.images) {
        changed.push(ContentField::Images);
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{account, ctx, scope, MemoryAlertRepo, MemorySnapshotStore};
    use chrono::{Duration, Utc};

    fn record(asin: &str, title: &str) -> ContentRecord {
        ContentRecord {
            asin: asin.to_string(),
            sku: None,
            title: Some(title.to_string()),
            description: Some("A fine product".to_string()),
            bullet_points: vec!["one".to_string(), "two".to_string()],
            images: vec!["img1.jpg".to_string()],
        }
    }

    #[test]
    fn whitespace_only_difference_is_not_a_change() {
        let prev = record("B000X", "Steel  Water Bottle");
        let curr = record("B000X", "Steel Water\tBottle ");
        assert!(changed_fields(&prev, &curr).is_empty());
    }

    #[test]
    fn title_change_is_flagged() {
        let prev = record("B000X", "Steel Water Bottle");
        let curr = record("B000X", "Steel Water Bottle 2.0");
        assert_eq!(changed_fields(&prev, &curr), vec![ContentField::Title]);
    }

    #[test]
    fn bullet_reorder_is_a_change() {
        let prev = record("B000X", "Bottle");
        let mut curr = record("B000X", "Bottle");
        curr.bullet_points = vec!["two".to_string(), "one".to_string()];
        assert_eq!(changed_fields(&prev, &curr), vec![ContentField::BulletPoints]);
    }

    #[tokio::test]
    async fn fewer_than_two_snapshots_skips() {
        let snapshots = MemorySnapshotStore::new();
        let alerts = MemoryAlertRepo::new();
        let acct = account("a1");
        let sc = scope();
        let detector = ProductContentChange;

        let ctx = ctx(&snapshots, &alerts);
        let outcome = detector.detect(&ctx, &acct, &sc).await;
        assert!(matches!(outcome, Outcome::Skipped(SkipReason::NoData)));

        snapshots.add(
            "a1",
            SnapshotKind::ProductContent,
            &sc,
            Utc::now() - Duration::hours(1),
            SnapshotPayload::Content(vec![record("B000X", "Bottle")]),
        );
        let outcome = detector.detect(&ctx, &acct, &sc).await;
        assert!(matches!(outcome, Outcome::Skipped(SkipReason::InsufficientHistory)));
        assert!(alerts.all().is_empty());
    }

    #[tokio::test]
    async fn changed_title_creates_alert_then_second_run_skips() {
        let snapshots = MemorySnapshotStore::new();
        let alerts = MemoryAlertRepo::new();
        let acct = account("a1");
        let sc = scope();
        let now = Utc::now();

        snapshots.add(
            "a1",
            SnapshotKind::ProductContent,
            &sc,
            now - Duration::hours(2),
            SnapshotPayload::Content(vec![record("B000X", "Bottle"), record("B000Y", "Mug")]),
        );
        snapshots.add(
            "a1",
            SnapshotKind::ProductContent,
            &sc,
            now - Duration::hours(1),
            SnapshotPayload::Content(vec![record("B000X", "Bottle Pro"), record("B000Y", "Mug")]),
        );

        let detector = ProductContentChange;
        let ctx = ctx(&snapshots, &alerts);

        let outcome = detector.detect(&ctx, &acct, &sc).await;
        match outcome {
            Outcome::Created { count, .. } => assert_eq!(count, 1),
            other => panic!("expected Created, got {other:?}"),
        }
        assert_eq!(alerts.kinds(), vec![AlertKind::ProductContentChange]);

        // Same snapshot pair, no new data: must not re-alert.
        let outcome = detector.detect(&ctx, &acct, &sc).await;
        assert!(matches!(outcome, Outcome::Skipped(SkipReason::NoNewData)));
        assert_eq!(alerts.all().len(), 1);
    }

    #[tokio::test]
    async fn identical_snapshots_are_clean() {
        let snapshots = MemorySnapshotStore::new();
        let alerts = MemoryAlertRepo::new();
        let acct = account("a1");
        let sc = scope();
        let now = Utc::now();

        for hours in [2, 1] {
            snapshots.add(
                "a1",
                SnapshotKind::ProductContent,
                &sc,
                now - Duration::hours(hours),
                SnapshotPayload::Content(vec![record("B000X", "Bottle")]),
            );
        }

        let ctx = ctx(&snapshots, &alerts);
        let outcome = ProductContentChange.detect(&ctx, &acct, &sc).await;
        assert!(matches!(outcome, Outcome::Clean));
        assert!(alerts.all().is_empty());
    }
}
