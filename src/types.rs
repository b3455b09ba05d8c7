use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// One marketplace coordinate pair an account is monitored in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountScope {
    pub region: String,
    pub country: String,
}

impl AccountScope {
    pub fn new(region: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            country: country.into(),
        }
    }
}

impl std::fmt::Display for AccountScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.region, self.country)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub email: String,
    pub first_name: String,
    /// Email opt-in. Only an explicit `Some(false)` suppresses sends.
    pub subscribed: Option<bool>,
    pub regions: Vec<AccountScope>,
}

// ---------------------------------------------------------------------------
// Snapshots: previously-collected marketplace reads, keyed by kind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKind {
    ProductContent,
    Reviews,
    AplusContent,
    BuyBox,
    SalesDaily,
    Replenishment,
    StrandedInventory,
    InboundNonCompliance,
}

impl SnapshotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotKind::ProductContent => "product_content",
            SnapshotKind::Reviews => "reviews",
            SnapshotKind::AplusContent => "aplus_content",
            SnapshotKind::BuyBox => "buy_box",
            SnapshotKind::SalesDaily => "sales_daily",
            SnapshotKind::Replenishment => "replenishment",
            SnapshotKind::StrandedInventory => "stranded_inventory",
            SnapshotKind::InboundNonCompliance => "inbound_non_compliance",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "product_content" => SnapshotKind::ProductContent,
            "reviews" => SnapshotKind::Reviews,
            "aplus_content" => SnapshotKind::AplusContent,
            "buy_box" => SnapshotKind::BuyBox,
            "sales_daily" => SnapshotKind::SalesDaily,
            "replenishment" => SnapshotKind::Replenishment,
            "stranded_inventory" => SnapshotKind::StrandedInventory,
            "inbound_non_compliance" => SnapshotKind::InboundNonCompliance,
            _ => return None,
        })
    }
}

impl std::fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub id: i64,
    pub account_id: String,
    pub kind: SnapshotKind,
    pub region: String,
    pub country: String,
    pub created_at: DateTime<Utc>,
    pub payload: SnapshotPayload,
}

/// Kind-specific snapshot body. Stored as tagged JSON; detectors match on
/// the variant they expect and treat a mismatch as a detector fault.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "records", rename_all = "snake_case")]
pub enum SnapshotPayload {
    Content(Vec<ContentRecord>),
    Reviews(Vec<ReviewRecord>),
    Aplus(Vec<AplusRecord>),
    BuyBox(Vec<BuyBoxRecord>),
    SalesDaily(Vec<DayRecord>),
    Replenishment(Vec<StockRecord>),
    ReportRows(Vec<ReportRow>),
}

impl SnapshotPayload {
    pub fn variant_name(&self) -> &'static str {
        match self {
            SnapshotPayload::Content(_) => "content",
            SnapshotPayload::Reviews(_) => "reviews",
            SnapshotPayload::Aplus(_) => "aplus",
            SnapshotPayload::BuyBox(_) => "buy_box",
            SnapshotPayload::SalesDaily(_) => "sales_daily",
            SnapshotPayload::Replenishment(_) => "replenishment",
            SnapshotPayload::ReportRows(_) => "report_rows",
        }
    }
}

/// Per-ASIN listing content as collected from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentRecord {
    pub asin: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub bullet_points: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub asin: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Star rating as collected. Parsed to a float at detection time.
    #[serde(default)]
    pub star_rating: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AplusRecord {
    pub asin: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyBoxRecord {
    pub asin: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Buy-box share percentage. Absent is treated as 0 by detection.
    #[serde(default)]
    pub share: Option<f64>,
}

/// One calendar day of ordered sales.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayRecord {
    pub date: NaiveDate,
    pub revenue: f64,
    pub units: i64,
}

/// One row of the FBA replenishment recommendation report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockRecord {
    pub asin: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub out_of_stock: bool,
    #[serde(default)]
    pub recommended_qty: Option<i64>,
}

/// One row of a stranded-inventory or inbound non-compliance report.
/// Column set varies by report; kept as free-form values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRow {
    #[serde(default)]
    pub asin: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(flatten)]
    pub columns: serde_json::Map<String, serde_json::Value>,
}
