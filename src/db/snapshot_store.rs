use async_trait::async_trait;

use crate::db::models::SnapshotRow;
use crate::error::Result;
use crate::ports::SnapshotStore;
use crate::types::{AccountScope, Snapshot, SnapshotKind};

/// SQLite-backed snapshot reads. The collection jobs own the write side of
/// this table; the pipeline only ever reads the most recent document(s).
pub struct SqliteSnapshotStore {
    pool: sqlx::SqlitePool,
}

impl SqliteSnapshotStore {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn latest(
        &self,
        account_id: &str,
        kind: SnapshotKind,
        scope: &AccountScope,
    ) -> Result<Option<Snapshot>> {
        Ok(self.recent(account_id, kind, scope, 1).await?.into_iter().next())
    }

    async fn recent(
        &self,
        account_id: &str,
        kind: SnapshotKind,
        scope: &AccountScope,
        n: u32,
    ) -> Result<Vec<Snapshot>> {
        let rows: Vec<SnapshotRow> = sqlx::query_as(
            r#"
            SELECT id, account_id, kind, region, country, payload, created_at
            FROM snapshots
            WHERE account_id = ? AND kind = ? AND region = ? AND country = ?
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(account_id)
        .bind(kind.as_str())
        .bind(&scope.region)
        .bind(&scope.country)
        .bind(i64::from(n))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SnapshotRow::into_snapshot).collect()
    }
}
