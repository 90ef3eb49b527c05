//! # Recovery Orchestrator
//!
//! Owns every recovery execution and drives each one through its runbook:
//!
//! 1. Register the execution as `pending` and return its id immediately
//! 2. In a background task, move it to `running` and send the disaster notification
//! 3. Walk the configured steps by ascending `order`, skipping steps whose dependencies are
//!    not `completed`, retrying failed attempts with linear backoff
//! 4. Halt on a failed critical step, otherwise finish as `completed` or `failed`
//! 5. Send the completion notification
//!
//! Executions live in a `DashMap` keyed by recovery id. Each mutation happens inside one
//! short `with_execution` section that is never held across an await,
//! so status reads always see a consistent snapshot. Log entries appended inside a section
//! are forwarded to the [`LogSink`] after the section's lock is released.
//!
//! The execution loop runs in its own task under a supervisor task. If the loop returns an
//! error or panics, the supervisor marks the execution `failed` so it never stays
//! `running` forever.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::backoff_calculator::{BackoffCalculator, BackoffCalculatorConfig};
use super::event_factory::DisasterEventFactory;
use super::notification::{LoggingNotificationGateway, NotificationGateway};
use super::step_executor::StepExecutor;
use super::step_handler::{StepHandler, StepHandlerRegistry};
use crate::clock::{Clock, SystemClock};
use crate::config::DisasterRecoveryConfig;
use crate::constants::{events, system};
use crate::error::{RecoveryError, Result};
use crate::events::{EventPublisher, PublishedEvent};
use crate::health::{HealthMonitor, HealthMonitorConfig, HealthProbe, ProbeRegistry, RecoveryTrigger};
use crate::logging::{LogSink, TracingLogSink};
use crate::models::{
    execution_order, DisasterEvent, DisasterType, LogLevel, RecoveryExecution, RecoveryLog,
    RecoveryStep, Severity, StepType,
};
use crate::state_machine::{
    ExecutionEvent, ExecutionState, StateGuard, StepDependenciesMetGuard, StepEvent,
};

/// Per-execution state that only the orchestrator needs
struct ExecutionContext {
    /// Configuration snapshot taken when the execution was triggered
    config: Arc<DisasterRecoveryConfig>,
    cancel_tx: watch::Sender<bool>,
}

enum StepPreparation {
    Started,
    Skipped(String),
    /// The execution left `running` (cancelled) before the step began
    Halted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepOutcome {
    Completed,
    Failed,
}

pub(crate) struct OrchestrationCore {
    config: RwLock<Arc<DisasterRecoveryConfig>>,
    executor: StepExecutor,
    factory: DisasterEventFactory,
    gateway: RwLock<Arc<dyn NotificationGateway>>,
    /// Whether `gateway` is the built-in logging gateway, rebuilt on reconfigure
    default_gateway: bool,
    log_sink: Arc<dyn LogSink>,
    clock: Arc<dyn Clock>,
    publisher: EventPublisher,
    started: AtomicBool,
    executions: DashMap<Uuid, RecoveryExecution>,
    events: DashMap<Uuid, DisasterEvent>,
    contexts: DashMap<Uuid, ExecutionContext>,
}

impl OrchestrationCore {
    fn config(&self) -> Arc<DisasterRecoveryConfig> {
        self.config.read().clone()
    }

    fn gateway(&self) -> Arc<dyn NotificationGateway> {
        self.gateway.read().clone()
    }

    /// Run `f` against the execution under its map lock, then forward any log entries it
    /// appended
    fn with_execution<T>(
        &self,
        recovery_id: Uuid,
        f: impl FnOnce(&mut RecoveryExecution, DateTime<Utc>) -> Result<T>,
    ) -> Result<T> {
        let now = self.clock.now();
        let (result, appended) = {
            let mut execution = self
                .executions
                .get_mut(&recovery_id)
                .ok_or(RecoveryError::RecoveryNotFound { recovery_id })?;
            let log_mark = execution.logs.len();
            let result = f(execution.value_mut(), now);
            (result, execution.logs[log_mark..].to_vec())
        };

        for entry in &appended {
            self.forward_log(recovery_id, entry);
        }
        result
    }

    fn forward_log(&self, recovery_id: Uuid, entry: &RecoveryLog) {
        self.log_sink.log(
            entry.level,
            &entry.message,
            system::LOG_CATEGORY,
            json!({
                "recovery_id": recovery_id,
                "step_id": entry.step_id,
                "timestamp": entry.timestamp,
            }),
        );
    }

    /// Append a log entry, tolerating an execution that is no longer tracked
    fn log_best_effort(
        &self,
        recovery_id: Uuid,
        level: LogLevel,
        message: String,
        step_id: Option<&str>,
    ) {
        let appended = self.with_execution(recovery_id, |execution, now| {
            execution.append_log(level, message, step_id, now);
            Ok(())
        });
        if let Err(e) = appended {
            warn!(recovery_id = %recovery_id, error = %e, "ORCHESTRATOR: Could not record log entry");
        }
    }

    fn launch(self: &Arc<Self>, event: DisasterEvent) -> Result<Uuid> {
        let runtime = Handle::try_current().map_err(|e| {
            RecoveryError::InvalidState(format!(
                "recoveries must be triggered from within a Tokio runtime: {e}"
            ))
        })?;

        let config = self.config();
        let recovery_id = Uuid::new_v4();
        let now = self.clock.now();

        let mut execution =
            RecoveryExecution::new(recovery_id, event.id, &config.recovery_steps, now);
        let registered = execution.append_log(
            LogLevel::Info,
            format!(
                "Recovery registered for {} event ({} severity): {}",
                event.disaster_type, event.severity, event.description
            ),
            None,
            now,
        );
        let (cancel_tx, cancel_rx) = watch::channel(false);

        self.events.insert(event.id, event.clone());
        self.contexts.insert(
            recovery_id,
            ExecutionContext {
                config: config.clone(),
                cancel_tx,
            },
        );
        self.executions.insert(recovery_id, execution);
        self.forward_log(recovery_id, &registered);

        info!(
            recovery_id = %recovery_id,
            event_id = %event.id,
            disaster_type = %event.disaster_type,
            severity = %event.severity,
            steps = config.recovery_steps.len(),
            automatic = event.auto_recovery_triggered,
            "🚑 ORCHESTRATOR: Recovery triggered"
        );
        self.publisher.publish(
            events::RECOVERY_TRIGGERED,
            json!({
                "recovery_id": recovery_id,
                "event_id": event.id,
                "disaster_type": event.disaster_type,
                "severity": event.severity,
                "automatic": event.auto_recovery_triggered,
            }),
        );

        let core = Arc::clone(self);
        runtime.spawn(async move { core.supervise(recovery_id, event, config, cancel_rx).await });

        Ok(recovery_id)
    }

    /// Start a recovery for a monitor-raised event unless an automatic recovery is
    /// already in flight, in which case its id is returned
    fn launch_automatic(self: &Arc<Self>, event: DisasterEvent) -> Result<Uuid> {
        let in_flight = self
            .executions
            .iter()
            .filter(|execution| !execution.is_terminal())
            .find(|execution| {
                self.events
                    .get(&execution.disaster_event_id)
                    .is_some_and(|existing| existing.auto_recovery_triggered)
            })
            .map(|execution| *execution.key());

        if let Some(existing) = in_flight {
            info!(
                recovery_id = %existing,
                ignored_event_id = %event.id,
                "🔁 ORCHESTRATOR: Automatic recovery already in progress, not starting another"
            );
            self.publisher.publish(
                events::RECOVERY_DEBOUNCED,
                json!({
                    "recovery_id": existing,
                    "ignored_event_id": event.id,
                    "affected_systems": event.affected_systems,
                }),
            );
            return Ok(existing);
        }

        self.launch(event)
    }

    async fn supervise(
        self: Arc<Self>,
        recovery_id: Uuid,
        event: DisasterEvent,
        config: Arc<DisasterRecoveryConfig>,
        cancel_rx: watch::Receiver<bool>,
    ) {
        let core = Arc::clone(&self);
        let run_config = config.clone();
        let run = tokio::spawn(async move {
            core.run_execution(recovery_id, &event, &run_config, cancel_rx)
                .await
        });

        let fault = match run.await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(join_error) if join_error.is_panic() => {
                Some(format!("execution task panicked: {join_error}"))
            }
            Err(join_error) => Some(format!("execution task aborted: {join_error}")),
        };

        if let Some(reason) = fault {
            self.fail_on_fault(recovery_id, &config, reason).await;
        }

        self.contexts.remove(&recovery_id);
    }

    #[instrument(skip(self, event, config, cancel_rx), fields(recovery_id = %recovery_id))]
    async fn run_execution(
        &self,
        recovery_id: Uuid,
        event: &DisasterEvent,
        config: &DisasterRecoveryConfig,
        mut cancel_rx: watch::Receiver<bool>,
    ) -> Result<()> {
        let definitions = &config.recovery_steps;
        let backoff = BackoffCalculator::new(BackoffCalculatorConfig::from(config));

        let snapshot = self.with_execution(recovery_id, |execution, now| {
            execution.transition(&ExecutionEvent::Start, now)?;
            execution.append_log(
                LogLevel::Info,
                format!("Recovery started with {} step(s)", definitions.len()),
                None,
                now,
            );
            Ok(execution.clone())
        })?;
        self.publisher.publish(
            events::RECOVERY_STARTED,
            json!({ "recovery_id": recovery_id, "total_steps": definitions.len() }),
        );

        if let Err(e) = self
            .gateway()
            .send_disaster_notification(event, &snapshot)
            .await
        {
            self.log_best_effort(
                recovery_id,
                LogLevel::Warn,
                format!("Disaster notification failed: {e:#}"),
                None,
            );
        }

        for step in execution_order(definitions) {
            match self.prepare_step(recovery_id, step, definitions)? {
                StepPreparation::Halted => {
                    debug!(step_id = %step.id, "Execution no longer running, stopping step loop");
                    break;
                }
                StepPreparation::Skipped(reason) => {
                    self.publisher.publish(
                        events::STEP_SKIPPED,
                        json!({ "recovery_id": recovery_id, "step_id": step.id, "reason": reason }),
                    );
                    continue;
                }
                StepPreparation::Started => {
                    self.publisher.publish(
                        events::STEP_STARTED,
                        json!({ "recovery_id": recovery_id, "step_id": step.id, "step_type": step.step_type }),
                    );
                }
            }

            let outcome = self
                .run_step(recovery_id, step, definitions, &backoff, &mut cancel_rx)
                .await?;

            if outcome == StepOutcome::Failed && step.critical {
                self.with_execution(recovery_id, |execution, now| {
                    if execution.status == ExecutionState::Running {
                        let reason = RecoveryError::CriticalStepFailure {
                            step_id: step.id.clone(),
                        }
                        .to_string();
                        execution.transition(&ExecutionEvent::fail_with_error(reason.clone()), now)?;
                        execution.append_log(LogLevel::Error, reason, Some(&step.id), now);
                    }
                    Ok(())
                })?;
                break;
            }
        }

        self.finish_execution(recovery_id).await
    }

    fn prepare_step(
        &self,
        recovery_id: Uuid,
        step: &RecoveryStep,
        definitions: &[RecoveryStep],
    ) -> Result<StepPreparation> {
        self.with_execution(recovery_id, |execution, now| {
            if execution.status != ExecutionState::Running {
                return Ok(StepPreparation::Halted);
            }

            if let Err(unmet) = StepDependenciesMetGuard.check(step, &*execution) {
                let reason = unmet.to_string();
                execution.transition_step(&step.id, StepEvent::Skip(reason.clone()), now)?;
                execution.recompute_metrics(definitions);
                execution.append_log(
                    LogLevel::Warn,
                    format!("Skipping step {}: {reason}", step.display_name()),
                    Some(&step.id),
                    now,
                );
                return Ok(StepPreparation::Skipped(reason));
            }

            execution.transition_step(&step.id, StepEvent::Start, now)?;
            execution.append_log(
                LogLevel::Info,
                format!("Starting step {} ({})", step.display_name(), step.step_type),
                Some(&step.id),
                now,
            );
            Ok(StepPreparation::Started)
        })
    }

    async fn run_step(
        &self,
        recovery_id: Uuid,
        step: &RecoveryStep,
        definitions: &[RecoveryStep],
        backoff: &BackoffCalculator,
        cancel_rx: &mut watch::Receiver<bool>,
    ) -> Result<StepOutcome> {
        // Cancel sets the status before signalling, so the status is authoritative here.
        // A rollback issued for a step must never precede its first attempt.
        let cancelled = self.with_execution(recovery_id, |execution, _| {
            Ok(execution.status != ExecutionState::Running)
        })?;
        if cancelled {
            let reason = RecoveryError::DispatchAborted {
                step_id: step.id.clone(),
            }
            .to_string();
            self.fail_step(recovery_id, step, definitions, reason)?;
            return Ok(StepOutcome::Failed);
        }

        let mut attempt = 1;

        loop {
            match self.executor.execute_attempt(step, attempt).await {
                Ok(output) => {
                    self.with_execution(recovery_id, |execution, now| {
                        execution.transition_step(&step.id, StepEvent::Complete(Some(output)), now)?;
                        execution.recompute_metrics(definitions);
                        let duration_ms = execution
                            .step(&step.id)
                            .and_then(|record| record.duration_ms)
                            .unwrap_or_default();
                        execution.append_log(
                            LogLevel::Info,
                            format!("Step {} completed in {duration_ms}ms", step.display_name()),
                            Some(&step.id),
                            now,
                        );
                        Ok(())
                    })?;
                    self.publisher.publish(
                        events::STEP_COMPLETED,
                        json!({ "recovery_id": recovery_id, "step_id": step.id, "attempts": attempt }),
                    );
                    return Ok(StepOutcome::Completed);
                }
                Err(error) if attempt <= step.retries => {
                    let reason = error.to_string();
                    let retry_delay = self.with_execution(recovery_id, |execution, now| {
                        if execution.status != ExecutionState::Running {
                            return Ok(None);
                        }
                        let retry_count = execution.record_retry(&step.id, reason.clone());
                        let delay = backoff.delay_for_retry(retry_count);
                        execution.append_log(
                            LogLevel::Warn,
                            format!(
                                "Step {} attempt {attempt} failed, retrying in {}ms: {reason}",
                                step.display_name(),
                                delay.as_millis()
                            ),
                            Some(&step.id),
                            now,
                        );
                        Ok(Some(delay))
                    })?;

                    let aborted = match retry_delay {
                        None => true,
                        Some(delay) => {
                            self.publisher.publish(
                                events::STEP_RETRY_SCHEDULED,
                                json!({
                                    "recovery_id": recovery_id,
                                    "step_id": step.id,
                                    "attempt": attempt,
                                    "delay_ms": delay.as_millis() as u64,
                                }),
                            );
                            tokio::select! {
                                _ = self.clock.sleep(delay) => false,
                                _ = cancellation_requested(cancel_rx) => true,
                            }
                        }
                    };

                    if aborted {
                        let reason = RecoveryError::RetryAborted {
                            step_id: step.id.clone(),
                        }
                        .to_string();
                        self.fail_step(recovery_id, step, definitions, reason)?;
                        return Ok(StepOutcome::Failed);
                    }

                    attempt += 1;
                }
                Err(error) => {
                    let reason = RecoveryError::StepFailed {
                        step_id: step.id.clone(),
                        attempts: attempt,
                        reason: error.to_string(),
                    }
                    .to_string();
                    self.fail_step(recovery_id, step, definitions, reason)?;
                    return Ok(StepOutcome::Failed);
                }
            }
        }
    }

    fn fail_step(
        &self,
        recovery_id: Uuid,
        step: &RecoveryStep,
        definitions: &[RecoveryStep],
        reason: String,
    ) -> Result<()> {
        self.with_execution(recovery_id, |execution, now| {
            execution.transition_step(&step.id, StepEvent::fail_with_error(reason.clone()), now)?;
            execution.recompute_metrics(definitions);
            execution.append_log(
                LogLevel::Error,
                format!("Step {} failed: {reason}", step.display_name()),
                Some(&step.id),
                now,
            );
            Ok(())
        })?;
        self.publisher.publish(
            events::STEP_FAILED,
            json!({
                "recovery_id": recovery_id,
                "step_id": step.id,
                "critical": step.critical,
                "reason": reason,
            }),
        );
        Ok(())
    }

    async fn finish_execution(&self, recovery_id: Uuid) -> Result<()> {
        let snapshot = self.with_execution(recovery_id, |execution, now| {
            if execution.status == ExecutionState::Running {
                let metrics = execution.metrics.clone();
                if metrics.failed_steps > 0 {
                    let reason = format!("{} step(s) failed", metrics.failed_steps);
                    execution.transition(&ExecutionEvent::fail_with_error(reason.clone()), now)?;
                    execution.append_log(LogLevel::Error, format!("Recovery failed: {reason}"), None, now);
                } else {
                    execution.transition(&ExecutionEvent::Complete, now)?;
                    execution.append_log(
                        LogLevel::Info,
                        format!(
                            "Recovery completed: {}/{} step(s) completed, {} skipped",
                            metrics.completed_steps, metrics.total_steps, metrics.skipped_steps
                        ),
                        None,
                        now,
                    );
                }
            }
            Ok(execution.clone())
        })?;

        self.announce_outcome(&snapshot);
        self.send_completion(&snapshot).await;
        Ok(())
    }

    fn announce_outcome(&self, execution: &RecoveryExecution) {
        let event_name = match execution.status {
            ExecutionState::Completed => events::RECOVERY_COMPLETED,
            ExecutionState::Failed => events::RECOVERY_FAILED,
            // Cancellation is announced when it is requested
            _ => {
                info!(recovery_id = %execution.id, status = %execution.status, "ORCHESTRATOR: Recovery loop exited");
                return;
            }
        };

        info!(
            recovery_id = %execution.id,
            status = %execution.status,
            progress = execution.progress,
            completed_steps = execution.metrics.completed_steps,
            failed_steps = execution.metrics.failed_steps,
            skipped_steps = execution.metrics.skipped_steps,
            "🏁 ORCHESTRATOR: Recovery finished"
        );
        self.publisher.publish(
            event_name,
            json!({
                "recovery_id": execution.id,
                "status": execution.status,
                "progress": execution.progress,
                "metrics": execution.metrics,
            }),
        );
    }

    async fn send_completion(&self, execution: &RecoveryExecution) {
        if let Err(e) = self.gateway().send_recovery_completion(execution).await {
            self.log_best_effort(
                execution.id,
                LogLevel::Warn,
                format!("Completion notification failed: {e:#}"),
                None,
            );
        }
    }

    /// Mark a non-terminal execution failed after its loop errored or panicked
    async fn fail_on_fault(&self, recovery_id: Uuid, config: &DisasterRecoveryConfig, reason: String) {
        let fault = RecoveryError::OrchestrationFault(reason).to_string();
        let recorded = self.with_execution(recovery_id, |execution, now| {
            if execution.is_terminal() {
                return Ok(None);
            }
            if let Some(step_id) = execution.running_step().map(|step| step.step_id.clone()) {
                execution.transition_step(&step_id, StepEvent::fail_with_error(fault.clone()), now)?;
            }
            execution.transition(&ExecutionEvent::fail_with_error(fault.clone()), now)?;
            execution.recompute_metrics(&config.recovery_steps);
            execution.append_log(LogLevel::Error, format!("Recovery aborted: {fault}"), None, now);
            Ok(Some(execution.clone()))
        });

        match recorded {
            Ok(Some(snapshot)) => {
                error!(recovery_id = %recovery_id, error = %fault, "❌ ORCHESTRATOR: Recovery aborted by orchestration fault");
                self.announce_outcome(&snapshot);
                self.send_completion(&snapshot).await;
            }
            Ok(None) => {
                warn!(recovery_id = %recovery_id, error = %fault, "ORCHESTRATOR: Fault after recovery already finished");
            }
            Err(e) => {
                error!(recovery_id = %recovery_id, error = %e, fault = %fault, "❌ ORCHESTRATOR: Could not record orchestration fault");
            }
        }
    }

    async fn cancel(&self, recovery_id: Uuid) -> Result<()> {
        let running_step = self.with_execution(recovery_id, |execution, now| {
            if execution.status != ExecutionState::Running {
                return Err(RecoveryError::NotRunning {
                    recovery_id,
                    status: execution.status,
                });
            }
            let running_step = execution.running_step().map(|step| step.step_id.clone());
            execution.transition(&ExecutionEvent::Cancel, now)?;
            execution.append_log(LogLevel::Warn, "Recovery cancelled", None, now);
            Ok(running_step)
        })?;

        let config = self.contexts.get(&recovery_id).map(|context| {
            context.cancel_tx.send_replace(true);
            context.config.clone()
        });

        info!(
            recovery_id = %recovery_id,
            running_step = running_step.as_deref(),
            "🛑 ORCHESTRATOR: Recovery cancelled"
        );
        self.publisher.publish(
            events::RECOVERY_CANCELLED,
            json!({ "recovery_id": recovery_id, "running_step": running_step }),
        );

        let step = running_step.zip(config).and_then(|(step_id, config)| {
            config
                .recovery_steps
                .iter()
                .find(|definition| definition.id == step_id)
                .cloned()
        });
        if let Some(step) = step {
            self.roll_back(recovery_id, &step).await;
        }

        Ok(())
    }

    async fn roll_back(&self, recovery_id: Uuid, step: &RecoveryStep) {
        match self.executor.rollback(step).await {
            Ok(true) => {
                self.log_best_effort(
                    recovery_id,
                    LogLevel::Info,
                    format!("Rolled back step {}", step.display_name()),
                    Some(&step.id),
                );
                self.publisher.publish(
                    events::STEP_ROLLED_BACK,
                    json!({ "recovery_id": recovery_id, "step_id": step.id }),
                );
            }
            Ok(false) => {
                self.log_best_effort(
                    recovery_id,
                    LogLevel::Debug,
                    format!("Step {} has no rollback command", step.display_name()),
                    Some(&step.id),
                );
            }
            Err(e) => {
                self.log_best_effort(recovery_id, LogLevel::Error, e.to_string(), Some(&step.id));
            }
        }
    }
}

/// Resolves once cancellation is signalled, or once the sender is gone
async fn cancellation_requested(cancel_rx: &mut watch::Receiver<bool>) {
    let _ = cancel_rx.wait_for(|cancelled| *cancelled).await;
}

/// Adapter handing monitor-raised events to the core
struct CoreTrigger(Arc<OrchestrationCore>);

#[async_trait]
impl RecoveryTrigger for CoreTrigger {
    async fn trigger_automatic_recovery(&self, event: DisasterEvent) -> Result<Uuid> {
        self.0.launch_automatic(event)
    }
}

/// Entry point of the recovery engine
///
/// ```rust,no_run
/// use recovery_core::config::DisasterRecoveryConfig;
/// use recovery_core::models::DisasterType;
/// use recovery_core::orchestration::RecoveryOrchestrator;
///
/// # async fn example(handler: std::sync::Arc<dyn recovery_core::orchestration::StepHandler>) -> recovery_core::error::Result<()> {
/// let orchestrator = RecoveryOrchestrator::builder(DisasterRecoveryConfig::default())
///     .with_handler_for_all(handler)
///     .build()?;
///
/// let recovery_id = orchestrator.trigger_recovery(
///     DisasterType::ManualTrigger,
///     "Primary region unreachable",
///     vec!["database".to_string()],
///     None,
/// )?;
/// let status = orchestrator.get_recovery_status(recovery_id);
/// # Ok(())
/// # }
/// ```
pub struct RecoveryOrchestrator {
    core: Arc<OrchestrationCore>,
    probes: ProbeRegistry,
    monitor: Mutex<Option<Arc<HealthMonitor>>>,
}

impl std::fmt::Debug for RecoveryOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoveryOrchestrator")
            .field("started", &self.is_started())
            .field("tracked_executions", &self.core.executions.len())
            .field("subsystems", &self.probes.subsystems())
            .finish_non_exhaustive()
    }
}

impl RecoveryOrchestrator {
    pub fn builder(config: DisasterRecoveryConfig) -> RecoveryOrchestratorBuilder {
        RecoveryOrchestratorBuilder::new(config)
    }

    /// Start health monitoring when the configuration enables it
    ///
    /// Manual triggers work whether or not the orchestrator is started.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<()> {
        let mut monitor_slot = self.monitor.lock().await;
        if self.core.started.load(Ordering::SeqCst) {
            info!("ORCHESTRATOR: Already started");
            return Ok(());
        }

        let config = self.core.config();
        info!(
            enabled = config.enabled,
            auto_failover = config.auto_failover,
            health_check_interval = config.health_check_interval,
            failure_threshold = config.failure_threshold,
            steps = config.recovery_steps.len(),
            "🚀 ORCHESTRATOR: Starting recovery orchestrator"
        );

        if config.enabled {
            let monitor = Arc::new(HealthMonitor::new(
                HealthMonitorConfig::from(config.as_ref()),
                self.probes.clone(),
                self.recovery_trigger(),
                self.core.clock.clone(),
                self.core.publisher.clone(),
            ));
            monitor.start();
            *monitor_slot = Some(monitor);
        } else {
            warn!("ORCHESTRATOR: Disaster recovery disabled, health monitoring not started");
        }

        self.core.started.store(true, Ordering::SeqCst);
        info!("✅ ORCHESTRATOR: Recovery orchestrator started");
        Ok(())
    }

    /// Stop health monitoring; in-flight executions keep running
    #[instrument(skip(self))]
    pub async fn stop(&self) {
        let mut monitor_slot = self.monitor.lock().await;
        if !self.core.started.swap(false, Ordering::SeqCst) {
            info!("ORCHESTRATOR: Already stopped");
            return;
        }

        if let Some(monitor) = monitor_slot.take() {
            monitor.stop();
        }
        info!("🛑 ORCHESTRATOR: Recovery orchestrator stopped");
    }

    pub fn is_started(&self) -> bool {
        self.core.started.load(Ordering::SeqCst)
    }

    /// Replace the configuration; only allowed while stopped
    pub async fn reconfigure(&self, config: DisasterRecoveryConfig) -> Result<()> {
        let _monitor_slot = self.monitor.lock().await;
        if self.is_started() {
            return Err(RecoveryError::InvalidState(
                "orchestrator must be stopped before reconfiguring".to_string(),
            ));
        }

        config.validate()?;
        for hazard in config.ordering_hazards() {
            warn!(hazard = %hazard, "⚙️ CONFIG: Dependency ordering hazard");
        }

        if self.core.default_gateway {
            *self.core.gateway.write() =
                Arc::new(LoggingNotificationGateway::new(config.notifications.clone()));
        }
        *self.core.config.write() = Arc::new(config);

        info!(config = %self.core.config().sanitized_for_logging(), "⚙️ ORCHESTRATOR: Configuration replaced");
        Ok(())
    }

    pub fn config(&self) -> Arc<DisasterRecoveryConfig> {
        self.core.config()
    }

    /// Declare a disaster and start recovering from it
    ///
    /// Returns as soon as the execution is registered as `pending`; the runbook runs in a
    /// background task. Must be called from within a Tokio runtime.
    pub fn trigger_recovery(
        &self,
        disaster_type: DisasterType,
        description: impl Into<String>,
        affected_systems: Vec<String>,
        severity: Option<Severity>,
    ) -> Result<Uuid> {
        let event = self
            .core
            .factory
            .manual(disaster_type, description, affected_systems, severity);
        self.core.launch(event)
    }

    /// Snapshot of one execution
    pub fn get_recovery_status(&self, recovery_id: Uuid) -> Option<RecoveryExecution> {
        self.core
            .executions
            .get(&recovery_id)
            .map(|execution| execution.value().clone())
    }

    /// Snapshots of every tracked execution, oldest first
    ///
    /// Finished executions stay listed until [`prune_finished`](Self::prune_finished)
    /// removes them.
    pub fn get_active_recoveries(&self) -> Vec<RecoveryExecution> {
        let mut executions: Vec<RecoveryExecution> = self
            .core
            .executions
            .iter()
            .map(|execution| execution.value().clone())
            .collect();
        executions.sort_by_key(|execution| execution.started_at);
        executions
    }

    pub fn get_disaster_event(&self, event_id: Uuid) -> Option<DisasterEvent> {
        self.core
            .events
            .get(&event_id)
            .map(|event| event.value().clone())
    }

    /// Cancel a running execution and roll back the step that was in progress
    ///
    /// Fails with [`RecoveryError::NotRunning`] for pending or finished executions, whose
    /// state is left untouched.
    #[instrument(skip(self))]
    pub async fn cancel_recovery(&self, recovery_id: Uuid) -> Result<()> {
        self.core.cancel(recovery_id).await
    }

    /// Drop finished executions completed more than `older_than` ago; returns how many
    /// were removed
    pub fn prune_finished(&self, older_than: Duration) -> usize {
        let Some(cutoff) = chrono::Duration::from_std(older_than)
            .ok()
            .and_then(|age| self.core.clock.now().checked_sub_signed(age))
        else {
            return 0;
        };

        let expired: Vec<(Uuid, Uuid)> = self
            .core
            .executions
            .iter()
            .filter(|execution| {
                execution.is_terminal()
                    && execution.completed_at.is_some_and(|at| at <= cutoff)
                    && !self.core.contexts.contains_key(execution.key())
            })
            .map(|execution| (execution.id, execution.disaster_event_id))
            .collect();

        for (recovery_id, event_id) in &expired {
            self.core.executions.remove(recovery_id);
            self.core.events.remove(event_id);
        }

        if !expired.is_empty() {
            debug!(removed = expired.len(), "ORCHESTRATOR: Pruned finished recoveries");
        }
        expired.len()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.core.publisher.subscribe()
    }

    pub fn event_publisher(&self) -> &EventPublisher {
        &self.core.publisher
    }

    /// The running health monitor, if started with monitoring enabled
    pub async fn health_monitor(&self) -> Option<Arc<HealthMonitor>> {
        self.monitor.lock().await.clone()
    }

    /// Trigger that routes monitor-raised events into this orchestrator
    pub fn recovery_trigger(&self) -> Arc<dyn RecoveryTrigger> {
        Arc::new(CoreTrigger(self.core.clone()))
    }
}

impl Drop for RecoveryOrchestrator {
    fn drop(&mut self) {
        if let Some(monitor) = self.monitor.get_mut().take() {
            monitor.stop();
        }
    }
}

pub struct RecoveryOrchestratorBuilder {
    config: DisasterRecoveryConfig,
    handlers: StepHandlerRegistry,
    probes: ProbeRegistry,
    gateway: Option<Arc<dyn NotificationGateway>>,
    log_sink: Arc<dyn LogSink>,
    clock: Arc<dyn Clock>,
    publisher: EventPublisher,
}

impl RecoveryOrchestratorBuilder {
    pub fn new(config: DisasterRecoveryConfig) -> Self {
        Self {
            config,
            handlers: StepHandlerRegistry::new(),
            probes: ProbeRegistry::with_default_subsystems(),
            gateway: None,
            log_sink: Arc::new(TracingLogSink),
            clock: Arc::new(SystemClock),
            publisher: EventPublisher::default(),
        }
    }

    pub fn with_step_handler(mut self, step_type: StepType, handler: Arc<dyn StepHandler>) -> Self {
        self.handlers.register(step_type, handler);
        self
    }

    pub fn with_handler_for_all(mut self, handler: Arc<dyn StepHandler>) -> Self {
        self.handlers = self.handlers.with_handler_for_all(handler);
        self
    }

    pub fn with_handler_registry(mut self, handlers: StepHandlerRegistry) -> Self {
        self.handlers = handlers;
        self
    }

    /// Probe a subsystem, replacing the default probe of the same name
    pub fn with_probe(mut self, subsystem: impl Into<String>, probe: Arc<dyn HealthProbe>) -> Self {
        self.probes.register(subsystem, probe);
        self
    }

    pub fn with_probes(mut self, probes: ProbeRegistry) -> Self {
        self.probes = probes;
        self
    }

    pub fn with_notification_gateway(mut self, gateway: Arc<dyn NotificationGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn with_log_sink(mut self, log_sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = log_sink;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_event_publisher(mut self, publisher: EventPublisher) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn build(self) -> Result<RecoveryOrchestrator> {
        self.config.validate()?;

        for hazard in self.config.ordering_hazards() {
            warn!(hazard = %hazard, "⚙️ CONFIG: Dependency ordering hazard");
        }
        for step in &self.config.recovery_steps {
            if !self.handlers.is_registered(step.step_type) {
                warn!(
                    step_id = %step.id,
                    step_type = %step.step_type,
                    "ORCHESTRATOR: No handler registered, step will fail when reached"
                );
            }
        }

        let default_gateway = self.gateway.is_none();
        let gateway = self.gateway.unwrap_or_else(|| {
            Arc::new(LoggingNotificationGateway::new(self.config.notifications.clone()))
        });

        debug!(
            config = %self.config.sanitized_for_logging(),
            handlers = self.handlers.len(),
            subsystems = ?self.probes.subsystems(),
            "ORCHESTRATOR: Built recovery orchestrator"
        );

        let core = OrchestrationCore {
            config: RwLock::new(Arc::new(self.config)),
            executor: StepExecutor::new(Arc::new(self.handlers)),
            factory: DisasterEventFactory::new(self.clock.clone()),
            gateway: RwLock::new(gateway),
            default_gateway,
            log_sink: self.log_sink,
            clock: self.clock,
            publisher: self.publisher,
            started: AtomicBool::new(false),
            executions: DashMap::new(),
            events: DashMap::new(),
            contexts: DashMap::new(),
        };

        Ok(RecoveryOrchestrator {
            core: Arc::new(core),
            probes: self.probes,
            monitor: Mutex::new(None),
        })
    }
}
