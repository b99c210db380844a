//! Service registry: the authoritative record of monitored services.
//!
//! The registry owns every [`ServiceState`] exclusively. Pulse recording and
//! the post-classification mark operations take the write lock; the
//! classification scan takes the read lock and copies out snapshots, so
//! notification delivery never holds the lock. Pulses recorded before a
//! scan's read-lock acquisition are visible to that scan; pulses racing with
//! a scan are observed no later than the next poll tick.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::error::{Error, Result};

/// Definition of one monitored service, as produced by configuration.
#[derive(Debug, Clone)]
pub struct ServiceSpec {
    pub name: String,
    pub heartbeat_timeout: Duration,
    pub notifiers: Vec<String>,
    pub fallback_notifiers: Vec<String>,
}

/// Mutable per-service state, owned by the registry.
#[derive(Debug)]
struct ServiceState {
    name: String,
    heartbeat_timeout: Duration,
    last_pulse: DateTime<Utc>,
    last_problem_at: Option<DateTime<Utc>>,
    last_success_report_at: Option<DateTime<Utc>>,
    notifiers: Vec<String>,
    fallback_notifiers: Vec<String>,
}

impl ServiceState {
    fn snapshot(&self, now: DateTime<Utc>) -> ServiceSnapshot {
        ServiceSnapshot {
            name: self.name.clone(),
            heartbeat_timeout: self.heartbeat_timeout,
            last_pulse: self.last_pulse,
            silence: (now - self.last_pulse).to_std().unwrap_or_default(),
            notifiers: self.notifiers.clone(),
            fallback_notifiers: self.fallback_notifiers.clone(),
        }
    }
}

/// Owned copy of a service's state taken during classification, used for
/// composing notifications after the lock is released.
#[derive(Debug, Clone)]
pub struct ServiceSnapshot {
    pub name: String,
    pub heartbeat_timeout: Duration,
    pub last_pulse: DateTime<Utc>,
    /// Time since the last pulse, measured at the classification instant.
    pub silence: Duration,
    pub notifiers: Vec<String>,
    pub fallback_notifiers: Vec<String>,
}

/// Result of one classification pass. A service never appears in both sets.
#[derive(Debug, Default)]
pub struct Classification {
    pub problematic: Vec<ServiceSnapshot>,
    pub ready_to_report_success: Vec<ServiceSnapshot>,
}

/// Serializable per-service view for the status API.
///
/// Timestamp fields whose underlying value is unset are omitted from the
/// JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub name: String,
    pub problematic: bool,
    pub heartbeat_timeout_secs: u64,
    pub last_pulse: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_problem_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_success_report_at: Option<DateTime<Utc>>,
}

/// The service registry.
#[derive(Debug)]
pub struct ServiceRegistry {
    services: RwLock<Vec<ServiceState>>,
    /// Name to slot index; immutable after construction.
    lookup: HashMap<String, usize>,
    /// Minimum interval between two "still healthy" reports for a service.
    success_cooldown: Duration,
    /// Construction instant. Stands in for the unset mark timestamps so no
    /// service is problematic or ready-to-report right after startup.
    created_at: DateTime<Utc>,
}

impl ServiceRegistry {
    /// Build a registry from validated service definitions.
    ///
    /// Every service starts with `last_pulse` set to the construction time
    /// (startup grace period). Fails on a duplicate name; no partially
    /// constructed registry is observable in that case.
    pub fn new(specs: Vec<ServiceSpec>, success_cooldown: Duration) -> Result<Self> {
        Self::new_at(specs, success_cooldown, Utc::now())
    }

    pub fn new_at(
        specs: Vec<ServiceSpec>,
        success_cooldown: Duration,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let mut lookup = HashMap::with_capacity(specs.len());
        let mut services = Vec::with_capacity(specs.len());

        for spec in specs {
            if lookup.contains_key(&spec.name) {
                return Err(Error::DuplicateServiceName(spec.name));
            }

            lookup.insert(spec.name.clone(), services.len());
            services.push(ServiceState {
                name: spec.name,
                heartbeat_timeout: spec.heartbeat_timeout,
                last_pulse: now,
                last_problem_at: None,
                last_success_report_at: None,
                notifiers: spec.notifiers,
                fallback_notifiers: spec.fallback_notifiers,
            });
        }

        Ok(Self {
            services: RwLock::new(services),
            lookup,
            success_cooldown,
            created_at: now,
        })
    }

    /// Record a pulse for `name`.
    ///
    /// Returns `true` and refreshes the service's `last_pulse` when the name
    /// is known, `false` with no side effect otherwise. An unknown name is a
    /// routine boundary outcome, not an error. Concurrent pulses race under
    /// last-writer-wins; either outcome is a valid recent timestamp.
    pub fn record_pulse(&self, name: &str) -> bool {
        self.record_pulse_at(name, Utc::now())
    }

    pub fn record_pulse_at(&self, name: &str, now: DateTime<Utc>) -> bool {
        let Some(&index) = self.lookup.get(name) else {
            return false;
        };

        let mut services = self.services.write();
        services[index].last_pulse = now;
        true
    }

    /// Classify every service under the read lock.
    ///
    /// A service is problematic once its silence meets or exceeds its
    /// heartbeat timeout (boundary inclusive). A non-problematic service is
    /// ready for a "still healthy" report once the success cooldown has
    /// elapsed since both its last success report and its last recorded
    /// problem; before either event has happened, the cooldown is measured
    /// from registry construction.
    pub fn classify(&self) -> Classification {
        self.classify_at(Utc::now())
    }

    pub fn classify_at(&self, now: DateTime<Utc>) -> Classification {
        let services = self.services.read();
        let mut classification = Classification::default();

        for service in services.iter() {
            if elapsed_at_least(now, service.last_pulse, service.heartbeat_timeout) {
                classification.problematic.push(service.snapshot(now));
                continue;
            }

            let since_report = service.last_success_report_at.unwrap_or(self.created_at);
            let since_problem = service.last_problem_at.unwrap_or(self.created_at);
            if elapsed_at_least(now, since_report, self.success_cooldown)
                && elapsed_at_least(now, since_problem, self.success_cooldown)
            {
                classification
                    .ready_to_report_success
                    .push(service.snapshot(now));
            }
        }

        classification
    }

    /// Stamp `last_problem_at` for the named services.
    ///
    /// Runs in its own short write-lock section after classification so the
    /// subsequent notification send never holds the registry lock.
    pub fn mark_problematic(&self, names: &[String], now: DateTime<Utc>) {
        let mut services = self.services.write();
        for name in names {
            if let Some(&index) = self.lookup.get(name) {
                services[index].last_problem_at = Some(now);
            }
        }
    }

    /// Stamp `last_success_report_at` for the named services.
    pub fn mark_success_reported(&self, names: &[String], now: DateTime<Utc>) {
        let mut services = self.services.write();
        for name in names {
            if let Some(&index) = self.lookup.get(name) {
                services[index].last_success_report_at = Some(now);
            }
        }
    }

    /// Serializable snapshot of every service for the status API.
    pub fn status_snapshot(&self) -> Vec<ServiceStatus> {
        self.status_snapshot_at(Utc::now())
    }

    pub fn status_snapshot_at(&self, now: DateTime<Utc>) -> Vec<ServiceStatus> {
        let services = self.services.read();
        services
            .iter()
            .map(|service| ServiceStatus {
                name: service.name.clone(),
                problematic: elapsed_at_least(now, service.last_pulse, service.heartbeat_timeout),
                heartbeat_timeout_secs: service.heartbeat_timeout.as_secs(),
                last_pulse: service.last_pulse,
                last_problem_at: service.last_problem_at,
                last_success_report_at: service.last_success_report_at,
            })
            .collect()
    }

    /// Number of monitored services.
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }
}

/// True when at least `min` has elapsed between `since` and `now`.
/// A `since` in the future counts as "not yet elapsed".
fn elapsed_at_least(now: DateTime<Utc>, since: DateTime<Utc>, min: Duration) -> bool {
    (now - since).to_std().map(|e| e >= min).unwrap_or(false)
}
