//! The monitoring loop.
//!
//! A single background task wakes every poll interval, classifies all
//! services, stamps the registry, and dispatches one notification per
//! category. Delivery runs as a detached task per category so a slow or
//! down channel never delays the next tick; failures are logged and the
//! loop keeps running.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::notification::{NotificationDispatcher, SendData};
use crate::registry::{ServiceRegistry, ServiceSnapshot};
use crate::util::format_duration;

pub struct MonitoringLoop {
    registry: Arc<ServiceRegistry>,
    dispatcher: Arc<NotificationDispatcher>,
    poll_interval: Duration,
    cancellation: CancellationToken,
}

impl MonitoringLoop {
    pub fn new(
        registry: Arc<ServiceRegistry>,
        dispatcher: Arc<NotificationDispatcher>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            poll_interval,
            cancellation: CancellationToken::new(),
        }
    }

    /// Spawn the poll loop on the current runtime.
    pub fn start(self: &Arc<Self>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            info!(
                services = this.registry.len(),
                poll_interval_secs = this.poll_interval.as_secs(),
                "monitoring loop started"
            );

            let mut ticker = tokio::time::interval(this.poll_interval);
            // The immediate first tick would fire inside the startup grace
            // period; skip straight to the cadence.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => this.run_tick(Utc::now()),
                    _ = this.cancellation.cancelled() => {
                        info!("monitoring loop stopped");
                        return;
                    }
                }
            }
        });
    }

    pub fn stop(&self) {
        self.cancellation.cancel();
    }

    /// One poll cycle: classify, stamp the registry, dispatch.
    ///
    /// The registry marks are applied before the sends are spawned, so a
    /// tick whose dispatch is still in flight can never re-select the same
    /// services.
    pub fn run_tick(&self, now: DateTime<Utc>) {
        let classification = self.registry.classify_at(now);

        if !classification.problematic.is_empty() {
            let names = service_names(&classification.problematic);
            warn!(services = ?names, "services overdue");
            self.registry.mark_problematic(&names, now);

            let data = problem_report(&classification.problematic, now);
            self.dispatch(&classification.problematic, data);
        }

        if !classification.ready_to_report_success.is_empty() {
            let names = service_names(&classification.ready_to_report_success);
            debug!(services = ?names, "services due for a healthy report");
            self.registry.mark_success_reported(&names, now);

            let data = success_report(&classification.ready_to_report_success);
            self.dispatch(&classification.ready_to_report_success, data);
        }
    }

    /// Fire-and-forget delivery to the union of the affected services'
    /// channels.
    fn dispatch(&self, services: &[ServiceSnapshot], data: SendData) {
        let (primary, fallback) = channel_targets(services);
        let dispatcher = Arc::clone(&self.dispatcher);

        tokio::spawn(async move {
            if let Err(e) = dispatcher
                .send_with_fallback(&primary, &fallback, &data)
                .await
            {
                error!(error = %e, title = %data.title, "notification dispatch failed");
            }
        });
    }
}

fn service_names(services: &[ServiceSnapshot]) -> Vec<String> {
    services.iter().map(|s| s.name.clone()).collect()
}

/// Union of the primary and fallback channel names referenced by the given
/// services, order-preserving and deduplicated. A channel in some service's
/// fallback list stays out of the fallback union if any affected service
/// uses it as a primary.
fn channel_targets(services: &[ServiceSnapshot]) -> (Vec<String>, Vec<String>) {
    let mut primary = Vec::new();
    for service in services {
        for name in &service.notifiers {
            if !primary.contains(name) {
                primary.push(name.clone());
            }
        }
    }

    let mut fallback = Vec::new();
    for service in services {
        for name in &service.fallback_notifiers {
            if !primary.contains(name) && !fallback.contains(name) {
                fallback.push(name.clone());
            }
        }
    }

    (primary, fallback)
}

/// Tabular summary of every overdue service.
fn problem_report(services: &[ServiceSnapshot], now: DateTime<Utc>) -> SendData {
    let title = if services.len() == 1 {
        format!("Service {} is overdue", services[0].name)
    } else {
        format!("{} services are overdue", services.len())
    };

    let mut body = String::from("Service Name, Last Pulse, Problem Duration, Overdue\n");
    for service in services {
        let overdue = service.silence.saturating_sub(service.heartbeat_timeout);
        body.push_str(&format!(
            "{}, {}, {}, {}\n",
            service.name,
            service.last_pulse.format("%Y-%m-%d %H:%M:%S UTC"),
            format_duration(service.silence),
            format_duration(overdue),
        ));
    }
    body.push_str(&format!("\nReport generated at {}", now.format("%Y-%m-%d %H:%M:%S UTC")));

    SendData::new(title, body)
}

/// Periodic "still healthy" summary.
fn success_report(services: &[ServiceSnapshot]) -> SendData {
    let title = if services.len() == 1 {
        format!("Service {} is healthy", services[0].name)
    } else {
        format!("{} services are healthy", services.len())
    };

    let mut body = String::from("All pulses on time:\n");
    for service in services {
        body.push_str(&format!(
            "- {} (last pulse {} ago)\n",
            service.name,
            format_duration(service.silence)
        ));
    }

    SendData::new(title, body)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::TimeDelta;
    use parking_lot::Mutex;

    use crate::error::{Error, Result};
    use crate::notification::NotifyChannel;
    use crate::registry::ServiceSpec;

    use super::*;

    struct RecordingChannel {
        name: &'static str,
        fail: bool,
        sent: Mutex<Vec<SendData>>,
    }

    impl RecordingChannel {
        fn new(name: &'static str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                fail,
                sent: Mutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<SendData> {
            self.sent.lock().clone()
        }
    }

    #[async_trait]
    impl NotifyChannel for RecordingChannel {
        fn name(&self) -> &str {
            self.name
        }

        fn validate(&self) -> Result<()> {
            Ok(())
        }

        async fn send(&self, data: &SendData) -> Result<()> {
            if self.fail {
                return Err(Error::Http("simulated outage".to_string()));
            }
            self.sent.lock().push(data.clone());
            Ok(())
        }
    }

    fn spec(name: &str, timeout_secs: u64, notifiers: &[&str], fallback: &[&str]) -> ServiceSpec {
        ServiceSpec {
            name: name.to_string(),
            heartbeat_timeout: Duration::from_secs(timeout_secs),
            notifiers: notifiers.iter().map(|s| s.to_string()).collect(),
            fallback_notifiers: fallback.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn snapshot(name: &str, notifiers: &[&str], fallback: &[&str]) -> ServiceSnapshot {
        ServiceSnapshot {
            name: name.to_string(),
            heartbeat_timeout: Duration::from_secs(90),
            last_pulse: Utc::now(),
            silence: Duration::from_secs(150),
            notifiers: notifiers.iter().map(|s| s.to_string()).collect(),
            fallback_notifiers: fallback.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn build_loop(
        specs: Vec<ServiceSpec>,
        channels: Vec<Arc<RecordingChannel>>,
        start: DateTime<Utc>,
    ) -> MonitoringLoop {
        let registry = Arc::new(
            ServiceRegistry::new_at(specs, Duration::from_secs(86400), start).unwrap(),
        );
        let mut dispatcher = NotificationDispatcher::from_config(&Default::default());
        for channel in channels {
            dispatcher.register(channel);
        }
        MonitoringLoop::new(registry, Arc::new(dispatcher), Duration::from_secs(15))
    }

    #[test]
    fn channel_targets_deduplicate_preserving_order() {
        let services = vec![
            snapshot("api", &["ntfy", "mail"], &["pager"]),
            snapshot("db", &["mail", "ntfy"], &["pager", "sms"]),
        ];

        let (primary, fallback) = channel_targets(&services);
        assert_eq!(primary, vec!["ntfy", "mail"]);
        assert_eq!(fallback, vec!["pager", "sms"]);
    }

    #[test]
    fn fallback_union_excludes_channels_used_as_primary() {
        let services = vec![
            snapshot("api", &["ntfy"], &["mail"]),
            snapshot("db", &["mail"], &[]),
        ];

        let (primary, fallback) = channel_targets(&services);
        assert_eq!(primary, vec!["ntfy", "mail"]);
        assert!(fallback.is_empty());
    }

    #[test]
    fn problem_report_is_tabular() {
        let start = Utc::now();
        let services = vec![ServiceSnapshot {
            name: "api".to_string(),
            heartbeat_timeout: Duration::from_secs(90),
            last_pulse: start,
            silence: Duration::from_secs(150),
            notifiers: vec!["ntfy".to_string()],
            fallback_notifiers: vec![],
        }];

        let data = problem_report(&services, start + TimeDelta::seconds(150));
        assert_eq!(data.title, "Service api is overdue");
        assert!(
            data.body
                .starts_with("Service Name, Last Pulse, Problem Duration, Overdue\n")
        );
        assert!(data.body.contains("api, "));
        assert!(data.body.contains("2m30s"));
        assert!(data.body.contains("1m00s"));
    }

    #[tokio::test]
    async fn tick_notifies_only_overdue_services() {
        let start = Utc::now();
        let ntfy = RecordingChannel::new("ntfy", false);
        let looper = build_loop(
            vec![
                spec("api", 90, &["ntfy"], &[]),
                spec("db", 300, &["ntfy"], &[]),
            ],
            vec![ntfy.clone()],
            start,
        );

        looper.run_tick(start + TimeDelta::seconds(120));
        tokio::time::sleep(Duration::from_millis(100)).await;

        let sent = ntfy.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].title, "Service api is overdue");
        assert!(sent[0].body.contains("api, "));
        assert!(!sent[0].body.contains("db, "));
    }

    #[tokio::test]
    async fn marks_are_applied_even_when_dispatch_fails() {
        let start = Utc::now();
        let ntfy = RecordingChannel::new("ntfy", true);
        let looper = build_loop(vec![spec("api", 90, &["ntfy"], &[])], vec![ntfy], start);

        let tick_at = start + TimeDelta::seconds(120);
        looper.run_tick(tick_at);
        tokio::time::sleep(Duration::from_millis(100)).await;

        let status = looper.registry.status_snapshot_at(tick_at);
        assert_eq!(status[0].last_problem_at, Some(tick_at));
    }

    #[tokio::test]
    async fn healthy_services_get_a_success_report_after_the_cooldown() {
        let start = Utc::now();
        let ntfy = RecordingChannel::new("ntfy", false);
        let looper = build_loop(vec![spec("api", 90, &["ntfy"], &[])], vec![ntfy.clone()], start);

        // One cooldown later, with a fresh pulse, the healthy report is due.
        let due = start + TimeDelta::seconds(86400);
        looper.registry.record_pulse_at("api", due);
        looper.run_tick(due);
        tokio::time::sleep(Duration::from_millis(100)).await;

        let sent = ntfy.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].title, "Service api is healthy");

        // A tick right after must not repeat the report.
        let next = due + TimeDelta::seconds(15);
        looper.registry.record_pulse_at("api", next);
        looper.run_tick(next);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(ntfy.sent().len(), 1);
    }

    #[tokio::test]
    async fn loop_survives_total_channel_outage() {
        let start = Utc::now();
        let ntfy = RecordingChannel::new("ntfy", true);
        let mail = RecordingChannel::new("mail", true);
        let looper = build_loop(
            vec![spec("api", 90, &["ntfy"], &["mail"])],
            vec![ntfy, mail],
            start,
        );

        looper.run_tick(start + TimeDelta::seconds(120));
        tokio::time::sleep(Duration::from_millis(100)).await;

        // The next tick still classifies; no panic, no poisoned state.
        let status = looper.registry.status_snapshot_at(start + TimeDelta::seconds(135));
        assert!(status[0].problematic);
    }
}
