//! Notification dispatch
//!
//! Notifications are best-effort: one attempt per qualifying tick, no queue.
//! A failed attempt is reported to the caller, which decides whether to retry
//! on a later tick.

mod discord;
mod message;

pub use discord::{post_message, validate_webhook, DiscordWebhook};
pub use message::{format_message, TEST_MESSAGE};

use crate::state::Target;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while delivering a notification
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("webhook returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("webhook transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid webhook URL: {0}")]
    InvalidUrl(String),
}

/// A destination for slot notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers `message` about `target`
    async fn send(&self, target: &Target, message: &str) -> Result<(), DispatchError>;
}
