use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

use super::{ChannelError, ChannelResult, DeletionWarning, NotificationChannel};
use crate::config::WebhookChannelConfig;

/// Channel that POSTs each warning as JSON to an SMS/push gateway.
pub struct WebhookChannel {
    client: reqwest::Client,
    url: String,
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    to: &'a str,
    message: String,
    #[serde(flatten)]
    warning: &'a DeletionWarning,
}

impl WebhookChannel {
    pub fn new(config: &WebhookChannelConfig) -> ChannelResult<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ChannelError::Config(format!("header name '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ChannelError::Config(format!("header '{name}': {e}")))?;
            headers.insert(name, value);
        }
        if let Some(api_key) = &config.api_key {
            let mut value = HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| ChannelError::Config(format!("api_key: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn send(&self, phone: &str, warning: &DeletionWarning) -> ChannelResult<()> {
        let payload = WebhookPayload {
            to: phone,
            message: warning.message(),
            warning,
        };

        let response = self.client.post(&self.url).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChannelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
