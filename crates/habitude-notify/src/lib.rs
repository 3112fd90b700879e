//! Outbound notifications: the `Notifier` boundary, its Telegram
//! implementation, and the scheduled reminder dispatch cycle.

pub mod dispatcher;
pub mod telegram;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("messaging API returned {status}: {body}")]
    Api { status: u16, body: String },
}

/// Fire-and-forget delivery to a user's messaging endpoint. Ordinary
/// delivery failures come back as `Err`, never as a panic, so a dispatch
/// cycle can keep going past one bad target.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, chat_id: &str, text: &str) -> Result<(), NotifyError>;
}
