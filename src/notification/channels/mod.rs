//! Notification channel implementations.

use async_trait::async_trait;

use crate::error::Result;

mod mail;
mod ntfy;

pub use mail::MailChannel;
pub use ntfy::NtfyChannel;

/// The payload handed to a channel for one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendData {
    pub title: String,
    pub body: String,
}

impl SendData {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// A transport capable of delivering a notification.
///
/// Implementations are registered with the dispatcher under their `name()`
/// and shared behind `Arc`, so they must be stateless or internally
/// synchronized.
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    /// Stable name services reference in configuration.
    fn name(&self) -> &str;

    /// Cheap configuration check run at startup, before any delivery.
    fn validate(&self) -> Result<()>;

    /// Deliver one notification. Errors describe the transport failure and
    /// are attributed to this channel by the dispatcher.
    async fn send(&self, data: &SendData) -> Result<()>;
}
