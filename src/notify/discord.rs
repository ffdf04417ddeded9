//! Discord webhook delivery
//!
//! Discord answers a successful webhook execution with `204 No Content`; any
//! other status, including other 2xx codes, is treated as a failed delivery.

use crate::config::validate_webhook_url;
use crate::notify::message::TEST_MESSAGE;
use crate::notify::{DispatchError, Notifier};
use crate::state::Target;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
}

/// Posts `{"content": message}` to a webhook URL
///
/// # Returns
///
/// * `Ok(())` - The provider answered 204
/// * `Err(DispatchError)` - Any other status or a transport failure
pub async fn post_message(client: &Client, url: &str, message: &str) -> Result<(), DispatchError> {
    let response = client
        .post(url)
        .json(&WebhookPayload { content: message })
        .send()
        .await?;

    let status = response.status();
    if status == StatusCode::NO_CONTENT {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    Err(DispatchError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Checks a candidate webhook URL and sends it a test message
///
/// Used by the configuration flow only; no target is read or written.
pub async fn validate_webhook(client: &Client, url: &str) -> Result<(), DispatchError> {
    validate_webhook_url(url).map_err(|e| DispatchError::InvalidUrl(e.to_string()))?;
    post_message(client, url, TEST_MESSAGE).await?;
    tracing::info!("Discord webhook URL is valid");
    Ok(())
}

/// Notifier that delivers to a single Discord webhook
pub struct DiscordWebhook {
    client: Client,
    url: String,
}

impl DiscordWebhook {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for DiscordWebhook {
    async fn send(&self, target: &Target, message: &str) -> Result<(), DispatchError> {
        match post_message(&self.client, &self.url, message).await {
            Ok(()) => {
                tracing::info!("Notification sent for {}", target.name);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Failed to send notification for {}: {}", target.name, e);
                Err(e)
            }
        }
    }
}
