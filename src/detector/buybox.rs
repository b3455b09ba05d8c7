use async_trait::async_trait;
use serde_json::json;
use tracing::error;

use crate::alert::{AlertKind, AlertPayload, FindingDetail, ProductFinding};
use crate::detector::{is_new_data, persist, Detector, DetectorCtx, Outcome, SkipReason};
use crate::error::{AppError, Result};
use crate::types::{Account, AccountScope, SnapshotKind, SnapshotPayload};

/// Flags products with a 0% buy-box share. An absent share is treated as 0.
pub struct BuyBoxMissing;

#[async_trait]
impl Detector for BuyBoxMissing {
    fn kind(&self) -> AlertKind {
        AlertKind::BuyBoxMissing
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
        .latest(&account.id, SnapshotKind::BuyBox, scope)
        .await?
    else {
        return Ok(Outcome::Skipped(SkipReason::NoData));
    };
    if !is_new_data(ctx, &account.id, AlertKind::BuyBoxMissing, scope, snapshot.created_at).await? {
        return Ok(Outcome::Skipped(SkipReason::NoNewData));
    }
    let SnapshotPayload::BuyBox(records) = &snapshot.payload else {
        return Err(AppError::Snapshot(format!(
            "expected buy_box payload, got {}",
            snapshot.payload.variant_name()
        )));
    };

    let findings: Vec<ProductFinding> = records
        .iter()
        .filter_map(|r| {
            let share = r.share.unwrap_or(0.0);
            (share == 0.0).then(|| ProductFinding {
                asin: r.asin.clone(),
                sku: None,
                title: r.title.clone(),
                detail: FindingDetail::BuyBoxShare { share },
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
    });
    Ok(persist(
        ctx,
        &account.id,
        scope,
        AlertKind::BuyBoxMissing,
        format!("{count} product(s) are not winning the Buy Box"),
        payload,
        metadata,
    )
    .await)
}
