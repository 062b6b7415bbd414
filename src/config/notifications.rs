use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Outbound channel for deletion warnings.
///
/// ```toml
/// [notifications]
/// type = "webhook"
/// url = "https://sms-gateway.internal/v1/messages"
/// api_key = "${SMS_GATEWAY_KEY}"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
pub enum NotificationsConfig {
    /// Write warnings to the log only.
    #[default]
    Log,

    /// POST each warning as JSON to an SMS/push gateway.
    Webhook(WebhookChannelConfig),
}

impl NotificationsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            NotificationsConfig::Log => Ok(()),
            NotificationsConfig::Webhook(c) => c.validate(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookChannelConfig {
    pub url: String,

    /// Sent as a bearer token.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Extra headers added to every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_timeout_ms() -> u64 {
    5000
}

impl WebhookChannelConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "notifications.url must be an http(s) URL, got '{}'",
                self.url
            )));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "notifications.timeout_ms must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
