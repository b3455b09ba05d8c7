use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::alert::{Alert, AlertKind, AlertStatus, NewAlert};
use crate::db::models::AlertRow;
use crate::error::Result;
use crate::ports::{AlertFilter, AlertRepository};
use crate::types::AccountScope;

pub struct SqliteAlertRepository {
    pool: sqlx::SqlitePool,
}

impl SqliteAlertRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertRepository for SqliteAlertRepository {
    async fn create(&self, alert: NewAlert) -> Result<Alert> {
        alert.validate()?;

        let now = Utc::now();
        let payload = serde_json::to_string(&alert.payload)?;
        let metadata = serde_json::to_string(&alert.metadata)?;

        let result = sqlx::query(
            r#"
            INSERT INTO alerts (
                account_id, region, country, kind, status, viewed,
                message, payload, metadata, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&alert.account_id)
        .bind(&alert.region)
        .bind(&alert.country)
        .bind(alert.kind.as_str())
        .bind(AlertStatus::Active.as_str())
        .bind(&alert.message)
        .bind(&payload)
        .bind(&metadata)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Alert {
            id: result.last_insert_rowid(),
            account_id: alert.account_id,
            region: alert.region,
            country: alert.country,
            kind: alert.kind,
            status: AlertStatus::Active,
            viewed: false,
            message: alert.message,
            payload: alert.payload,
            metadata: alert.metadata,
            created_at: now,
            updated_at: now,
        })
    }

    async fn find(
        &self,
        account_id: &str,
        scope: &AccountScope,
        filter: AlertFilter,
        limit: i64,
        skip: i64,
    ) -> Result<(Vec<Alert>, i64)> {
        let status = filter.status.map(|s| s.as_str());
        let kind = filter.kind.map(|k| k.as_str());

        // Optional filters use the (? IS NULL OR col = ?) pattern instead of
        // building SQL strings per filter combination.
        let rows: Vec<AlertRow> = sqlx::query_as(
            r#"
            SELECT id, account_id, region, country, kind, status, viewed,
                   message, payload, metadata, created_at, updated_at
            FROM alerts
            WHERE account_id = ?1 AND region = ?2 AND country = ?3
              AND (?4 IS NULL OR status = ?4)
              AND (?5 IS NULL OR kind = ?5)
            ORDER BY created_at DESC
            LIMIT ?6 OFFSET ?7
            "#,
        )
        .bind(account_id)
        .bind(&scope.region)
        .bind(&scope.country)
        .bind(status)
        .bind(kind)
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM alerts
            WHERE account_id = ?1 AND region = ?2 AND country = ?3
              AND (?4 IS NULL OR status = ?4)
              AND (?5 IS NULL OR kind = ?5)
            "#,
        )
        .bind(account_id)
        .bind(&scope.region)
        .bind(&scope.country)
        .bind(status)
        .bind(kind)
        .fetch_one(&self.pool)
        .await?;

        let alerts = rows
            .into_iter()
            .map(AlertRow::into_alert)
            .collect::<Result<Vec<_>>>()?;
        Ok((alerts, total))
    }

    async fn find_by_id(&self, id: i64, account_id: &str) -> Result<Option<Alert>> {
        let row: Option<AlertRow> = sqlx::query_as(
            r#"
            SELECT id, account_id, region, country, kind, status, viewed,
                   message, payload, metadata, created_at, updated_at
            FROM alerts
            WHERE id = ? AND account_id = ?
            "#,
        )
        .bind(id)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(AlertRow::into_alert).transpose()
    }

    async fn mark_viewed(&self, id: i64, account_id: &str) -> Result<Option<Alert>> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE alerts SET viewed = 1, updated_at = ? WHERE id = ? AND account_id = ?",
        )
        .bind(now)
        .bind(id)
        .bind(account_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_id(id, account_id).await
    }

    async fn latest_created_at(
        &self,
        account_id: &str,
        kind: AlertKind,
        scope: &AccountScope,
    ) -> Result<Option<DateTime<Utc>>> {
        let ts: Option<DateTime<Utc>> = sqlx::query_scalar(
            r#"
            SELECT created_at
            FROM alerts
            WHERE account_id = ? AND kind = ? AND region = ? AND country = ?
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(account_id)
        .bind(kind.as_str())
        .bind(&scope.region)
        .bind(&scope.country)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ts)
    }
}
