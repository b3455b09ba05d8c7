use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

// ---------------------------------------------------------------------------
// Alert kind: closed tag set
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    ProductContentChange,
    BuyBoxMissing,
    NegativeReviews,
    APlusMissing,
    SalesDrop,
    /// Legacy kind kept for the read path; no detector produces it.
    ConversionRates,
    LowInventory,
    StrandedInventory,
    InboundShipment,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::ProductContentChange => "product_content_change",
            AlertKind::BuyBoxMissing => "buy_box_missing",
            AlertKind::NegativeReviews => "negative_reviews",
            AlertKind::APlusMissing => "a_plus_missing",
            AlertKind::SalesDrop => "sales_drop",
            AlertKind::ConversionRates => "conversion_rates",
            AlertKind::LowInventory => "low_inventory",
            AlertKind::StrandedInventory => "stranded_inventory",
            AlertKind::InboundShipment => "inbound_shipment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "product_content_change" => AlertKind::ProductContentChange,
            "buy_box_missing" => AlertKind::BuyBoxMissing,
            "negative_reviews" => AlertKind::NegativeReviews,
            "a_plus_missing" => AlertKind::APlusMissing,
            "sales_drop" => AlertKind::SalesDrop,
            "conversion_rates" => AlertKind::ConversionRates,
            "low_inventory" => AlertKind::LowInventory,
            "stranded_inventory" => AlertKind::StrandedInventory,
            "inbound_shipment" => AlertKind::InboundShipment,
            _ => return None,
        })
    }

    /// Row label used in the consolidated notification.
    pub fn label(&self) -> &'static str {
        match self {
            AlertKind::ProductContentChange => "Listing content changes",
            AlertKind::BuyBoxMissing => "Buy Box missing",
            AlertKind::NegativeReviews => "Negative reviews",
            AlertKind::APlusMissing => "A+ content missing",
            AlertKind::SalesDrop => "Sales drops",
            AlertKind::ConversionRates => "Conversion rate changes",
            AlertKind::LowInventory => "Low inventory",
            AlertKind::StrandedInventory => "Stranded inventory",
            AlertKind::InboundShipment => "Inbound shipment problems",
        }
    }

    /// Unit word for notification rows: what one finding counts.
    pub fn unit(&self) -> &'static str {
        match self {
            AlertKind::SalesDrop => "days",
            _ => "products",
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Acknowledged => "acknowledged",
            AlertStatus::Resolved => "resolved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "active" => AlertStatus::Active,
            "acknowledged" => AlertStatus::Acknowledged,
            "resolved" => AlertStatus::Resolved,
            _ => return None,
        })
    }
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Payload: kind-indexed variant body behind one envelope
// ---------------------------------------------------------------------------

/// Alert body. Product kinds carry an ordered list of per-product findings;
/// time-series kinds carry a date range plus flagged days. Both lists are
/// non-empty; the constructors below enforce it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlertPayload {
    Products {
        items: Vec<ProductFinding>,
    },
    DailySeries {
        start: NaiveDate,
        end: NaiveDate,
        days: Vec<DayFinding>,
    },
}

impl AlertPayload {
    /// Returns `None` for an empty findings list; a detector that found
    /// nothing must not construct an alert.
    pub fn products(items: Vec<ProductFinding>) -> Option<Self> {
        if items.is_empty() {
            None
        } else {
            Some(AlertPayload::Products { items })
        }
    }

    /// Same non-empty rule for the time-series shape.
    pub fn daily_series(start: NaiveDate, end: NaiveDate, days: Vec<DayFinding>) -> Option<Self> {
        if days.is_empty() {
            None
        } else {
            Some(AlertPayload::DailySeries { start, end, days })
        }
    }

    pub fn count(&self) -> usize {
        match self {
            AlertPayload::Products { items } => items.len(),
            AlertPayload::DailySeries { days, .. } => days.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductFinding {
    pub asin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub detail: FindingDetail,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Kind-specific finding body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "detail", rename_all = "snake_case")]
pub enum FindingDetail {
    ContentChange { changed_fields: Vec<ContentField> },
    Review { rating: f64 },
    AplusStatus { status: Option<String> },
    BuyBoxShare { share: f64 },
    Stock { out_of_stock: bool, recommended_qty: i64 },
    ReportRow { columns: serde_json::Map<String, serde_json::Value> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentField {
    Title,
    Description,
    BulletPoints,
    Images,
}

impl std::fmt::Display for ContentField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ContentField::Title => "title",
            ContentField::Description => "description",
            ContentField::BulletPoints => "bullet_points",
            ContentField::Images => "images",
        };
        write!(f, "{s}")
    }
}

/// One flagged day in a sales-drop series. A side's drop percentage is absent
/// when the previous day's value was 0 (no verdict on that side).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayFinding {
    pub date: NaiveDate,
    pub revenue_prev: f64,
    pub revenue: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_drop_pct: Option<f64>,
    pub units_prev: i64,
    pub units: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_drop_pct: Option<f64>,
}

// ---------------------------------------------------------------------------
// Alert envelope
// ---------------------------------------------------------------------------

/// An alert about to be written. `validate` upholds the non-empty payload
/// invariant before any repository sees it.
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub account_id: String,
    pub region: String,
    pub country: String,
    pub kind: AlertKind,
    pub message: String,
    pub payload: AlertPayload,
    /// Provenance only (source snapshot ids, thresholds). Never read back
    /// by detection logic.
    pub metadata: serde_json::Value,
}

impl NewAlert {
    pub fn validate(&self) -> Result<()> {
        if self.payload.count() == 0 {
            return Err(AppError::EmptyPayload);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub id: i64,
    pub account_id: String,
    pub region: String,
    pub country: String,
    pub kind: AlertKind,
    pub status: AlertStatus,
    pub viewed: bool,
    pub message: String,
    pub payload: AlertPayload,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_product_list_is_rejected() {
        assert!(AlertPayload::products(Vec::new()).is_none());
    }

    #[test]
    fn empty_day_list_is_rejected() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert!(AlertPayload::daily_series(d, d, Vec::new()).is_none());
    }

    #[test]
    fn non_empty_payload_counts_findings() {
        let payload = AlertPayload::products(vec![ProductFinding {
            asin: "B000X".to_string(),
            sku: None,
            title: None,
            detail: FindingDetail::BuyBoxShare { share: 0.0 },
            message: None,
        }])
        .expect("one finding is a valid payload");
        assert_eq!(payload.count(), 1);
    }

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [
            AlertKind::ProductContentChange,
            AlertKind::BuyBoxMissing,
            AlertKind::NegativeReviews,
            AlertKind::APlusMissing,
            AlertKind::SalesDrop,
            AlertKind::ConversionRates,
            AlertKind::LowInventory,
            AlertKind::StrandedInventory,
            AlertKind::InboundShipment,
        ] {
            assert_eq!(AlertKind::parse(kind.as_str()), Some(kind));
        }
    }
}
