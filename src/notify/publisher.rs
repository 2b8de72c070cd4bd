// src/notify/publisher.rs
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::provider::ProviderError;

/// Write-side collaborator: delivers one alert message to a named
/// notification channel.
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    async fn publish(
        &self,
        channel_id: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), ProviderError>;
}

/// Delivers alerts as an HTTP POST to a configured webhook.
pub struct WebhookPublisher {
    client: Client,
    url: Url,
}

impl WebhookPublisher {
    pub fn new(url: Url, client: Client) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl NotificationPublisher for WebhookPublisher {
    async fn publish(
        &self,
        channel_id: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), ProviderError> {
        let payload = serde_json::json!({
            "channel": channel_id,
            "subject": subject,
            "message": body,
        });

        let response = self
            .client
            .post(self.url.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::Delivery {
                channel: channel_id.to_string(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ProviderError::Delivery {
                channel: channel_id.to_string(),
                message: format!("webhook returned HTTP {}", response.status()),
            });
        }

        debug!(channel = channel_id, url = %self.url, "alert delivered");
        Ok(())
    }
}

/// Emits alerts as structured warnings instead of an outbound call.
/// Used for dry runs; delivery cannot fail.
pub struct LogPublisher;

#[async_trait]
impl NotificationPublisher for LogPublisher {
    async fn publish(
        &self,
        channel_id: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), ProviderError> {
        warn!(channel = channel_id, subject, "{}", body);
        Ok(())
    }
}
