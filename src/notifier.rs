use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::aggregator::AccountRunSummary;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::ports::NotifyTransport;
use crate::types::Account;

/// Message text resources, resolved once at process start and handed to the
/// Notifier. There is no lazily-loaded module state.
#[derive(Debug, Clone)]
pub struct MessageTemplate {
    pub subject: String,
    /// `{name}` is replaced with the account's first name.
    pub greeting: String,
}

impl MessageTemplate {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            subject: cfg.notify_subject.clone(),
            greeting: cfg.notify_greeting.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryRow {
    pub label: String,
    pub count: usize,
    pub unit: &'static str,
}

/// One consolidated per-account message: a row per detector kind that fired.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationMessage {
    pub subject: String,
    pub greeting: String,
    pub rows: Vec<SummaryRow>,
}

impl NotificationMessage {
    pub fn body_text(&self) -> String {
        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        lines.push(self.greeting.clone());
        lines.push(String::new());
        for row in &self.rows {
            lines.push(format!("{}: {} {}", row.label, row.count, row.unit));
        }
        lines.join("\n")
    }
}

pub struct Notifier {
    transport: Arc<dyn NotifyTransport>,
    template: MessageTemplate,
}

impl Notifier {
    pub fn new(transport: Arc<dyn NotifyTransport>, template: MessageTemplate) -> Self {
        Self { transport, template }
    }

    /// Composes and sends the account's summary. No-op when nothing fired or
    /// when the account explicitly unsubscribed.
    pub async fn notify(&self, account: &Account, summary: &AccountRunSummary) -> Result<()> {
        if account.subscribed == Some(false) {
            debug!(account_id = %account.id, "notifications disabled, skipping send");
            return Ok(());
        }

        let rows: Vec<SummaryRow> = summary
            .kind_counts()
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(kind, count)| SummaryRow {
                label: kind.label().to_string(),
                count,
                unit: kind.unit(),
            })
            .collect();
        if rows.is_empty() {
            return Ok(());
        }

        let message = NotificationMessage {
            subject: self.template.subject.clone(),
            greeting: self.template.greeting.replace("{name}", &account.first_name),
            rows,
        };
        self.transport.send(&account.email, &message).await
    }
}

/// Production transport: hands the composed message to an HTTP relay that
/// owns actual email delivery.
pub struct HttpRelayTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpRelayTransport {
    pub fn new(url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl NotifyTransport for HttpRelayTransport {
    async fn send(&self, email: &str, message: &NotificationMessage) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({
                "to": email,
                "subject": message.subject,
                "body": message.body_text(),
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Notify(format!("relay returned {}", response.status())));
        }
        Ok(())
    }
}
