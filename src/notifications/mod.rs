//! Outbound channels for deletion warnings.
//!
//! The engine treats every channel as best-effort: a failed send is logged
//! and counted, never retried, and never aborts a lifecycle pass.

mod error;
mod log;
#[cfg(test)]
pub mod testing;
mod webhook;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
pub use error::{ChannelError, ChannelResult};
pub use log::LogChannel;
use serde::Serialize;
pub use webhook::WebhookChannel;

use crate::config::NotificationsConfig;

/// A warning that some of a subject's records are about to be deleted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionWarning {
    pub subject_name: String,
    /// Human-readable date, e.g. "18 December 2026"
    pub deletion_date: String,
    pub record_count: usize,
}

impl DeletionWarning {
    pub fn new(subject_name: impl Into<String>, deletion_date: DateTime<Utc>, record_count: usize) -> Self {
        Self {
            subject_name: subject_name.into(),
            deletion_date: format_deletion_date(deletion_date),
            record_count,
        }
    }

    /// Text body for SMS/push delivery.
    pub fn message(&self) -> String {
        let records = if self.record_count == 1 {
            "1 conversation record".to_string()
        } else {
            format!("{} conversation records", self.record_count)
        };
        format!(
            "{records} for {} will be permanently deleted on {}. Contact us before then if they need to be kept.",
            self.subject_name, self.deletion_date
        )
    }
}

pub fn format_deletion_date(date: DateTime<Utc>) -> String {
    date.format("%-d %B %Y").to_string()
}

/// Mask all but the last three digits of a phone number for logging.
pub fn mask_phone(phone: &str) -> String {
    let digits: Vec<char> = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() <= 3 {
        return "***".to_string();
    }
    let tail: String = digits[digits.len() - 3..].iter().collect();
    format!("***{tail}")
}

/// Outbound SMS/push channel.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Short name used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Deliver one warning to one phone number.
    async fn send(&self, phone: &str, warning: &DeletionWarning) -> ChannelResult<()>;
}

/// Build the configured channel.
pub fn from_config(config: &NotificationsConfig) -> ChannelResult<Arc<dyn NotificationChannel>> {
    match config {
        NotificationsConfig::Log => Ok(Arc::new(LogChannel)),
        NotificationsConfig::Webhook(c) => Ok(Arc::new(WebhookChannel::new(c)?)),
    }
}
