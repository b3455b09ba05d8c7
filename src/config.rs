use crate::error::{AppError, Result};

/// Accounts aggregated concurrently per batch.
pub const BATCH_SIZE: usize = 10;

/// Pause between batches (milliseconds). Bounds request/email rate against
/// the snapshot store and the notification relay.
pub const BATCH_PAUSE_MS: u64 = 1_000;

/// Scheduler tick interval (seconds). Well under a minute so a schedule
/// slot is never stepped over.
pub const SCHEDULER_TICK_SECS: u64 = 30;

/// Default detection schedule: twice weekly.
pub const DEFAULT_SCHEDULE: &str = "mon,thu 08:30";

/// Detection thresholds. Fixed policy, not user-configurable.
pub mod thresholds {
    /// Ratings strictly below this flag a product.
    pub const RATING_FLOOR: f64 = 4.0;

    /// Day-over-day drop percentage that flags a day (revenue or units side).
    pub const DROP_PCT: f64 = 40.0;

    /// Recommended replenishment quantities strictly above this flag a product.
    pub const REPLENISH_QTY: i64 = 30;

    /// Length of the sales window, ending yesterday (UTC days).
    pub const SALES_WINDOW_DAYS: i64 = 8;

    /// Maximum age (UTC days) of a stranded/inbound report for it to be eligible.
    pub const REPORT_FRESH_DAYS: i64 = 3;
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Notification relay endpoint (NOTIFY_RELAY_URL); receives the composed
    /// summary as JSON and handles actual email delivery.
    pub relay_url: String,
    /// Email subject line (NOTIFY_SUBJECT).
    pub notify_subject: String,
    /// Greeting template (NOTIFY_GREETING); `{name}` is replaced per account.
    pub notify_greeting: String,
    /// Detection schedule expression (ALERT_SCHEDULE), e.g. "mon,thu 08:30".
    pub schedule: String,
    /// Fixed UTC offset in hours for the schedule (SCHEDULE_UTC_OFFSET_HOURS).
    pub schedule_utc_offset_hours: i32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "sellerwatch.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            relay_url: std::env::var("NOTIFY_RELAY_URL")
                .unwrap_or_else(|_| "http://localhost:8025/send".to_string()),
            notify_subject: std::env::var("NOTIFY_SUBJECT")
                .unwrap_or_else(|_| "Account health alerts".to_string()),
            notify_greeting: std::env::var("NOTIFY_GREETING").unwrap_or_else(|_| {
                "Hi {name}, here is what changed on your account since the last check:"
                    .to_string()
            }),
            schedule: std::env::var("ALERT_SCHEDULE").unwrap_or_else(|_| DEFAULT_SCHEDULE.to_string()),
            schedule_utc_offset_hours: std::env::var("SCHEDULE_UTC_OFFSET_HOURS")
                .unwrap_or_else(|_| "0".to_string())
                .parse::<i32>()
                .map_err(|_| {
                    AppError::Config("SCHEDULE_UTC_OFFSET_HOURS must be an integer".to_string())
                })?,
        })
    }
}
