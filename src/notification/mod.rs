//! Notification dispatch.
//!
//! The dispatcher owns every configured channel and fans one payload out to
//! a set of them by name, collecting per-channel failures instead of
//! stopping at the first error. Two-tier delivery escalates to fallback
//! channels only when every primary channel has failed.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{error, info};

use crate::config::NotificationConfig;
use crate::error::{DeliveryFailures, Error, Result, SendFailure};

pub mod channels;

pub use channels::{MailChannel, NotifyChannel, NtfyChannel, SendData};

/// Title used for every fallback-tier notification.
pub const FALLBACK_TITLE: &str = "Fallback notification: primary notifier failed";

/// Routes notifications to named channels.
pub struct NotificationDispatcher {
    channels: HashMap<String, Arc<dyn NotifyChannel>>,
}

impl NotificationDispatcher {
    /// Build a dispatcher with one channel per configured section.
    pub fn from_config(config: &NotificationConfig) -> Self {
        let mut dispatcher = Self {
            channels: HashMap::new(),
        };

        if let Some(mail) = &config.mail {
            dispatcher.register(Arc::new(MailChannel::new(mail.clone())));
        }
        if let Some(ntfy) = &config.ntfy {
            dispatcher.register(Arc::new(NtfyChannel::new(ntfy.clone())));
        }

        dispatcher
    }

    /// Register a channel under its own name, replacing any previous
    /// channel with that name.
    pub fn register(&mut self, channel: Arc<dyn NotifyChannel>) {
        info!(channel = channel.name(), "registered notification channel");
        self.channels.insert(channel.name().to_string(), channel);
    }

    /// Validate one list of channel references: no duplicates, every name
    /// registered, every referenced channel passing its own configuration
    /// check.
    pub fn validate_for(&self, names: &[String]) -> Result<()> {
        let mut seen = HashSet::new();
        for name in names {
            if !seen.insert(name.as_str()) {
                return Err(Error::DuplicateChannelReference(name.clone()));
            }
            let channel = self
                .channels
                .get(name)
                .ok_or_else(|| Error::UnknownChannel(name.clone()))?;
            channel.validate()?;
        }
        Ok(())
    }

    /// Deliver `data` to every named channel sequentially, returning every
    /// failure. An unregistered name is recorded as a failure for that name
    /// rather than aborting the rest of the fan-out.
    pub async fn send_all(&self, names: &[String], data: &SendData) -> Vec<SendFailure> {
        let mut failures = Vec::new();

        for name in names {
            let Some(channel) = self.channels.get(name) else {
                failures.push(SendFailure {
                    channel: name.clone(),
                    error: Error::UnknownChannel(name.clone()).to_string(),
                });
                continue;
            };

            if let Err(e) = channel.send(data).await {
                failures.push(SendFailure {
                    channel: name.clone(),
                    error: e.to_string(),
                });
            }
        }

        failures
    }

    /// Deliver `data` to every named channel, failing if any delivery
    /// failed.
    pub async fn send(&self, names: &[String], data: &SendData) -> Result<()> {
        finish(self.send_all(names, data).await)
    }

    /// Deliver `data` to the primary channels; on any primary failure,
    /// compose a fallback notification carrying the original payload and
    /// the primary failure list and deliver it to the fallback channels.
    ///
    /// One escalation hop only: fallback failures are appended to the
    /// aggregate, marked `(fallback)`, never themselves escalated. Any
    /// primary failure makes the result an error even when the fallback
    /// tier delivered, so the caller always learns which primaries failed.
    pub async fn send_with_fallback(
        &self,
        primary: &[String],
        fallback: &[String],
        data: &SendData,
    ) -> Result<()> {
        let mut failures = self.send_all(primary, data).await;

        if failures.is_empty() {
            return Ok(());
        }

        if !fallback.is_empty() {
            error!(
                failed = failures.len(),
                "primary notification channels failed, escalating to fallback"
            );

            let escalation = SendData::new(FALLBACK_TITLE, fallback_body(data, &failures));
            let fallback_failures = self.send_all(fallback, &escalation).await;
            failures.extend(fallback_failures.into_iter().map(|f| SendFailure {
                channel: format!("{} (fallback)", f.channel),
                error: f.error,
            }));
        }

        finish(failures)
    }
}

/// Body of a fallback notification: the payload that could not be
/// delivered, followed by the primary failure list.
fn fallback_body(original: &SendData, failures: &[SendFailure]) -> String {
    let mut body = format!(
        "Original notification:\nTitle: {}\n\n{}\n\nFailed primary channels:",
        original.title, original.body
    );
    for failure in failures {
        body.push_str(&format!("\n- {}: {}", failure.channel, failure.error));
    }
    body
}

/// Convert a failure list into the aggregate result, logging each entry.
fn finish(failures: Vec<SendFailure>) -> Result<()> {
    if failures.is_empty() {
        return Ok(());
    }

    for failure in &failures {
        error!(
            channel = %failure.channel,
            error = %failure.error,
            "notification delivery failed"
        );
    }
    Err(Error::NotificationFailed(DeliveryFailures(failures)))
}
