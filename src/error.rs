//! Application-wide error types.

use std::fmt;

use thiserror::Error;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("duplicate service name: {0}")]
    DuplicateServiceName(String),

    #[error("duplicate channel reference: {0}")]
    DuplicateChannelReference(String),

    #[error("unknown notification channel: {0}")]
    UnknownChannel(String),

    #[error("fallback channels overlap primary notifiers: {0}")]
    FallbackOverlap(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("channel configuration error: {0}")]
    ChannelConfig(String),

    /// Aggregate delivery failure. Per-channel attribution is preserved in
    /// the failure list so callers can tell which channels failed and why.
    #[error("notification delivery failed:{0}")]
    NotificationFailed(DeliveryFailures),

    #[error("secret file is empty: {0}")]
    SecretFileEmpty(String),

    #[error("secret file too long (max {max} bytes): {path}")]
    SecretFileTooLong { path: String, max: usize },

    #[error("mail transport error: {0}")]
    Mail(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

/// One failed delivery attempt, attributed to a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendFailure {
    /// Channel name as referenced by configuration; fallback-tier failures
    /// carry a `" (fallback)"` suffix.
    pub channel: String,
    /// Rendered cause of the failure.
    pub error: String,
}

/// The set of per-channel failures behind one aggregate delivery error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryFailures(pub Vec<SendFailure>);

impl fmt::Display for DeliveryFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for failure in &self.0 {
            write!(f, "\n- {}: {}", failure.channel, failure.error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_failures_enumerate_every_channel() {
        let failures = DeliveryFailures(vec![
            SendFailure {
                channel: "ntfy".to_string(),
                error: "connection refused".to_string(),
            },
            SendFailure {
                channel: "mail (fallback)".to_string(),
                error: "relay rejected".to_string(),
            },
        ]);

        let err = Error::NotificationFailed(failures);
        let rendered = err.to_string();
        assert!(rendered.contains("ntfy: connection refused"));
        assert!(rendered.contains("mail (fallback): relay rejected"));
    }
}
