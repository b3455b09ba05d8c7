//! Database row types used by sqlx for typed queries, plus their conversions
//! into the domain model (JSON payload columns are parsed here).

use chrono::{DateTime, Utc};

use crate::alert::{Alert, AlertKind, AlertStatus};
use crate::error::{AppError, Result};
use crate::types::{Account, AccountScope, Snapshot, SnapshotKind};

#[derive(Debug, sqlx::FromRow)]
pub struct AlertRow {
    pub id: i64,
    pub account_id: String,
    pub region: String,
    pub country: String,
    pub kind: String,
    pub status: String,
    pub viewed: i64,
    pub message: String,
    pub payload: String,
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AlertRow {
    pub fn into_alert(self) -> Result<Alert> {
        let kind = AlertKind::parse(&self.kind)
            .ok_or_else(|| AppError::Database(sqlx::Error::Decode(
                format!("unknown alert kind {:?}", self.kind).into(),
            )))?;
        let status = AlertStatus::parse(&self.status)
            .ok_or_else(|| AppError::Database(sqlx::Error::Decode(
                format!("unknown alert status {:?}", self.status).into(),
            )))?;
        let metadata = match self.metadata {
            Some(raw) => serde_json::from_str(&raw)?,
            None => serde_json::Value::Null,
        };
        Ok(Alert {
            id: self.id,
            account_id: self.account_id,
            region: self.region,
            country: self.country,
            kind,
            status,
            viewed: self.viewed != 0,
            message: self.message,
            payload: serde_json::from_str(&self.payload)?,
            metadata,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct SnapshotRow {
    pub id: i64,
    pub account_id: String,
    pub kind: String,
    pub region: String,
    pub country: String,
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

impl SnapshotRow {
    pub fn into_snapshot(self) -> Result<Snapshot> {
        let kind = SnapshotKind::parse(&self.kind)
            .ok_or_else(|| AppError::Database(sqlx::Error::Decode(
                format!("unknown snapshot kind {:?}", self.kind).into(),
            )))?;
        Ok(Snapshot {
            id: self.id,
            account_id: self.account_id,
            kind,
            region: self.region,
            country: self.country,
            created_at: self.created_at,
            payload: serde_json::from_str(&self.payload)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct AccountRow {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub subscribed: Option<i64>,
    pub regions: String,
}

impl AccountRow {
    pub fn into_account(self) -> Result<Account> {
        let regions: Vec<AccountScope> = serde_json::from_str(&self.regions)?;
        Ok(Account {
            id: self.id,
            email: self.email,
            first_name: self.first_name,
            subscribed: self.subscribed.map(|v| v != 0),
            regions,
        })
    }
}
