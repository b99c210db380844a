//! TOML configuration loading and validation.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::notification::NotificationDispatcher;
use crate::registry::ServiceSpec;

/// Minimum accepted service name length.
pub const MIN_NAME_LEN: usize = 2;
/// Maximum accepted service name length.
pub const MAX_NAME_LEN: usize = 64;
/// Minimum accepted heartbeat timeout.
pub const MIN_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(60);

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub services: Vec<ServiceConfig>,
    pub timings: Timings,
    #[serde(default)]
    pub notification: NotificationConfig,
}

/// One monitored service.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    pub name: String,
    pub heartbeat_timeout_secs: u64,
    pub notifiers: Vec<String>,
    #[serde(default)]
    pub fallback_notifiers: Vec<String>,
}

/// Monitoring cadence settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Timings {
    pub poll_interval_secs: u64,
    pub success_report_cooldown_secs: u64,
}

impl Timings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn success_report_cooldown(&self) -> Duration {
        Duration::from_secs(self.success_report_cooldown_secs)
    }
}

/// Channel settings. A channel is registered only when its section is
/// present.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationConfig {
    pub mail: Option<MailConfig>,
    pub ntfy: Option<NtfyConfig>,
}

/// SMTP mail channel settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MailConfig {
    pub from: String,
    pub to: String,
    pub smtp: SmtpConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password_file: String,
}

/// ntfy push channel settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NtfyConfig {
    pub server: String,
    pub topic: String,
    pub token_file: Option<String>,
}

impl Config {
    /// Load and structurally validate configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&raw)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Structural validation that needs no channel registry: name and timing
    /// bounds, non-empty notifier lists, and primary/fallback disjointness
    /// per service. Duplicate service names are left to registry
    /// construction.
    fn validate(&self) -> Result<()> {
        if self.services.is_empty() {
            return Err(Error::config("no services configured"));
        }

        for service in &self.services {
            let name = service.name.trim();
            if name.len() < MIN_NAME_LEN || name.len() > MAX_NAME_LEN {
                return Err(Error::config(format!(
                    "service name {:?} must be between {MIN_NAME_LEN} and {MAX_NAME_LEN} characters",
                    service.name
                )));
            }

            if service.heartbeat_timeout_secs < MIN_HEARTBEAT_TIMEOUT.as_secs() {
                return Err(Error::config(format!(
                    "service {:?}: heartbeat_timeout_secs must be at least {}",
                    service.name,
                    MIN_HEARTBEAT_TIMEOUT.as_secs()
                )));
            }

            if service.notifiers.is_empty() {
                return Err(Error::config(format!(
                    "service {:?} has no notifiers",
                    service.name
                )));
            }

            let primary: HashSet<&str> = service.notifiers.iter().map(String::as_str).collect();
            for fallback in &service.fallback_notifiers {
                if primary.contains(fallback.as_str()) {
                    return Err(Error::FallbackOverlap(format!(
                        "service {:?}: {fallback:?} is both a notifier and a fallback",
                        service.name
                    )));
                }
            }
        }

        if self.timings.poll_interval_secs == 0 {
            return Err(Error::config("poll_interval_secs must be non-zero"));
        }
        if self.timings.success_report_cooldown_secs == 0 {
            return Err(Error::config("success_report_cooldown_secs must be non-zero"));
        }

        Ok(())
    }

    /// Check that every channel referenced by a service is registered with
    /// the dispatcher, with no duplicates within one service's lists.
    pub fn validate_channel_references(&self, dispatcher: &NotificationDispatcher) -> Result<()> {
        for service in &self.services {
            dispatcher.validate_for(&service.notifiers)?;
            dispatcher.validate_for(&service.fallback_notifiers)?;
        }
        Ok(())
    }

    /// Convert validated service entries into registry specs.
    pub fn service_specs(&self) -> Vec<ServiceSpec> {
        self.services
            .iter()
            .map(|s| ServiceSpec {
                name: s.name.trim().to_string(),
                heartbeat_timeout: Duration::from_secs(s.heartbeat_timeout_secs),
                notifiers: s.notifiers.clone(),
                fallback_notifiers: s.fallback_notifiers.clone(),
            })
            .collect()
    }
}
