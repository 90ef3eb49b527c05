//! # Health Monitor
//!
//! Periodically probes every registered subsystem and counts consecutive unhealthy checks.
//! Once the count reaches the configured threshold, and automatic failover is enabled, a
//! system-failure disaster event is raised through the [`RecoveryTrigger`].
//!
//! ## Counting rules
//!
//! - A check where any subsystem is unhealthy increments the counter by one
//! - A fully healthy check resets the counter to zero
//! - The counter keeps growing past the threshold, so every further unhealthy check while
//!   auto-failover is on raises a new event; the orchestrator debounces those while an
//!   automatic recovery is still in flight

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::probe::{NamedProbe, ProbeRegistry};
use crate::clock::Clock;
use crate::config::DisasterRecoveryConfig;
use crate::constants::events;
use crate::error::Result;
use crate::events::EventPublisher;
use crate::models::DisasterEvent;
use crate::orchestration::DisasterEventFactory;

/// Receiver of automatically detected disasters
#[async_trait]
pub trait RecoveryTrigger: Send + Sync {
    /// Start (or join) a recovery for the event, returning the execution id
    async fn trigger_automatic_recovery(&self, event: DisasterEvent) -> Result<Uuid>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct HealthMonitorConfig {
    pub interval: Duration,
    pub failure_threshold: u32,
    pub auto_failover: bool,
    pub probe_timeout: Duration,
}

impl From<&DisasterRecoveryConfig> for HealthMonitorConfig {
    fn from(config: &DisasterRecoveryConfig) -> Self {
        Self {
            interval: config.health_check_interval_duration(),
            failure_threshold: config.failure_threshold,
            auto_failover: config.auto_failover,
            probe_timeout: config.probe_timeout(),
        }
    }
}

/// Outcome of probing one subsystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsystemHealth {
    pub subsystem: String,
    pub healthy: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Outcome of one full health check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckReport {
    pub checked_at: DateTime<Utc>,
    pub results: Vec<SubsystemHealth>,
    /// Consecutive unhealthy checks after this one
    pub failure_count: u32,
    /// Execution started (or joined) because of this check
    pub triggered_recovery: Option<Uuid>,
}

impl HealthCheckReport {
    pub fn is_healthy(&self) -> bool {
        self.results.iter().all(|result| result.healthy)
    }

    pub fn failing_subsystems(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|result| !result.healthy)
            .map(|result| result.subsystem.clone())
            .collect()
    }
}

pub struct HealthMonitor {
    config: HealthMonitorConfig,
    probes: ProbeRegistry,
    factory: DisasterEventFactory,
    trigger: Arc<dyn RecoveryTrigger>,
    clock: Arc<dyn Clock>,
    publisher: EventPublisher,
    failure_count: AtomicU32,
    last_report: RwLock<Option<HealthCheckReport>>,
    shutdown_notify: Arc<Notify>,
    running: AtomicBool,
}

impl std::fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("config", &self.config)
            .field("subsystems", &self.probes.subsystems())
            .field("failure_count", &self.failure_count())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl HealthMonitor {
    pub fn new(
        config: HealthMonitorConfig,
        probes: ProbeRegistry,
        trigger: Arc<dyn RecoveryTrigger>,
        clock: Arc<dyn Clock>,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            config,
            probes,
            factory: DisasterEventFactory::new(clock.clone()),
            trigger,
            clock,
            publisher,
            failure_count: AtomicU32::new(0),
            last_report: RwLock::new(None),
            shutdown_notify: Arc::new(Notify::new()),
            running: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &HealthMonitorConfig {
        &self.config
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::SeqCst)
    }

    pub fn last_report(&self) -> Option<HealthCheckReport> {
        self.last_report.read().clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run one health check immediately, outside the periodic loop
    #[instrument(skip(self), fields(subsystems = self.probes.len()))]
    pub async fn run_health_check(&self) -> HealthCheckReport {
        let checked_at = self.clock.now();
        let results = join_all(
            self.probes
                .iter()
                .map(|probe| probe_subsystem(probe.clone(), self.config.probe_timeout)),
        )
        .await;

        for result in results.iter().filter(|result| !result.healthy) {
            warn!(
                subsystem = %result.subsystem,
                error = result.error.as_deref().unwrap_or("unhealthy"),
                "🩺 HEALTH: Subsystem check failed"
            );
        }

        let any_unhealthy = results.iter().any(|result| !result.healthy);
        let failure_count = if any_unhealthy {
            self.failure_count.fetch_add(1, Ordering::SeqCst).saturating_add(1)
        } else {
            self.failure_count.store(0, Ordering::SeqCst);
            0
        };

        let mut report = HealthCheckReport {
            checked_at,
            results,
            failure_count,
            triggered_recovery: None,
        };

        if any_unhealthy && failure_count >= self.config.failure_threshold {
            let failing = report.failing_subsystems();
            self.publisher.publish(
                events::HEALTH_THRESHOLD_REACHED,
                json!({
                    "failure_count": failure_count,
                    "threshold": self.config.failure_threshold,
                    "failing_subsystems": failing,
                    "auto_failover": self.config.auto_failover,
                }),
            );

            if self.config.auto_failover {
                report.triggered_recovery = self.raise_disaster(failing).await;
            } else {
                warn!(
                    failure_count = failure_count,
                    "🩺 HEALTH: Failure threshold reached but automatic failover is disabled"
                );
            }
        }

        debug!(
            healthy = report.is_healthy(),
            failure_count = failure_count,
            "🩺 HEALTH: Check completed"
        );
        self.publisher.publish(
            events::HEALTH_CHECK_COMPLETED,
            json!({
                "healthy": report.is_healthy(),
                "failure_count": failure_count,
                "failing_subsystems": report.failing_subsystems(),
            }),
        );

        *self.last_report.write() = Some(report.clone());
        report
    }

    async fn raise_disaster(&self, failing: Vec<String>) -> Option<Uuid> {
        let event = self.factory.automatic(failing);
        info!(
            event_id = %event.id,
            severity = %event.severity,
            affected_systems = ?event.affected_systems,
            "🚨 HEALTH: Triggering automatic recovery"
        );

        match self.trigger.trigger_automatic_recovery(event).await {
            Ok(recovery_id) => Some(recovery_id),
            Err(e) => {
                error!(error = %e, "🚨 HEALTH: Automatic recovery could not be triggered");
                None
            }
        }
    }

    /// Start the periodic loop: one check now, then one per interval until [`stop`](Self::stop)
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            info!("HEALTH: Monitor already running");
            return;
        }

        info!(
            interval_seconds = self.config.interval.as_secs(),
            failure_threshold = self.config.failure_threshold,
            auto_failover = self.config.auto_failover,
            "🚀 HEALTH: Starting health monitoring loop"
        );

        let monitor = Arc::clone(self);
        let shutdown_notify = self.shutdown_notify.clone();
        tokio::spawn(async move {
            loop {
                // Registered before the check so a stop issued mid-check is not lost
                let shutdown = shutdown_notify.notified();
                tokio::pin!(shutdown);
                shutdown.as_mut().enable();

                monitor.run_health_check().await;

                tokio::select! {
                    biased;
                    _ = &mut shutdown => {
                        info!("Health monitoring loop shutting down");
                        break;
                    }
                    _ = monitor.clock.sleep(monitor.config.interval) => {}
                }
            }
        });
    }

    /// Stop the periodic loop; calling it again is a no-op
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            debug!("HEALTH: Monitor already stopped");
            return;
        }

        info!("🛑 HEALTH: Stopping health monitoring loop");
        self.shutdown_notify.notify_waiters();
    }
}

/// Probe one subsystem in its own task so a panicking probe only fails its own check
async fn probe_subsystem(probe: NamedProbe, timeout: Duration) -> SubsystemHealth {
    let started = Instant::now();
    let check = probe.probe.clone();
    let mut handle = tokio::spawn(async move { check.check().await });

    let (healthy, error) = match tokio::time::timeout(timeout, &mut handle).await {
        Ok(Ok(Ok(true))) => (true, None),
        Ok(Ok(Ok(false))) => (false, Some("probe reported unhealthy".to_string())),
        Ok(Ok(Err(e))) => (false, Some(format!("{e:#}"))),
        Ok(Err(join_error)) => (false, Some(format!("probe task failed: {join_error}"))),
        Err(_) => {
            handle.abort();
            (false, Some(format!("probe timed out after {timeout:?}")))
        }
    };

    SubsystemHealth {
        subsystem: probe.subsystem,
        healthy,
        error,
        duration_ms: started.elapsed().as_millis() as u64,
    }
}
