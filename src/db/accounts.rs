use async_trait::async_trait;
use tracing::warn;

use crate::db::models::AccountRow;
use crate::error::Result;
use crate::ports::AccountSource;
use crate::types::Account;

pub struct SqliteAccountSource {
    pool: sqlx::SqlitePool,
}

impl SqliteAccountSource {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountSource for SqliteAccountSource {
    async fn eligible_accounts(&self) -> Result<Vec<Account>> {
        let rows: Vec<AccountRow> = sqlx::query_as(
            r#"
            SELECT id, email, first_name, subscribed, regions
            FROM accounts
            WHERE verified = 1 AND opted_out = 0
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut accounts = Vec::with_capacity(rows.len());
        for row in rows {
            let account = row.into_account()?;
            // No configured marketplace means nothing to detect against.
            if account.regions.is_empty() {
                warn!(account_id = %account.id, "account has no regions configured, skipping");
                continue;
            }
            accounts.push(account);
        }
        Ok(accounts)
    }
}
