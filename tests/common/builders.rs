//! Builders and polling helpers shared by the integration tests

use recovery_core::clock::{Clock, ImmediateClock};
use recovery_core::config::DisasterRecoveryConfig;
use recovery_core::models::{RecoveryExecution, RecoveryStep};
use recovery_core::orchestration::RecoveryOrchestrator;
use recovery_core::state_machine::StepState;
use std::sync::Arc;
use uuid::Uuid;

use super::mocks::{RecordingGateway, RecordingLogSink, ScriptedStepHandler};

const MAX_POLLS: usize = 10_000;

pub fn config_with_steps(steps: Vec<RecoveryStep>) -> DisasterRecoveryConfig {
    DisasterRecoveryConfig {
        recovery_steps: steps,
        ..DisasterRecoveryConfig::default()
    }
}

/// Orchestrator wired to recording collaborators
pub struct TestHarness {
    pub orchestrator: RecoveryOrchestrator,
    pub handler: Arc<ScriptedStepHandler>,
    pub gateway: Arc<RecordingGateway>,
    pub log_sink: Arc<RecordingLogSink>,
    pub clock: Arc<ImmediateClock>,
}

impl TestHarness {
    pub fn new(steps: Vec<RecoveryStep>, handler: ScriptedStepHandler) -> Self {
        Self::with_gateway(config_with_steps(steps), handler, RecordingGateway::new())
    }

    pub fn with_gateway(
        config: DisasterRecoveryConfig,
        handler: ScriptedStepHandler,
        gateway: RecordingGateway,
    ) -> Self {
        let clock = Arc::new(ImmediateClock::new());
        Self::with_clock(config, handler, gateway, clock.clone(), clock)
    }

    pub fn with_clock(
        config: DisasterRecoveryConfig,
        handler: ScriptedStepHandler,
        gateway: RecordingGateway,
        orchestrator_clock: Arc<dyn Clock>,
        recorded_clock: Arc<ImmediateClock>,
    ) -> Self {
        let handler = Arc::new(handler);
        let gateway = Arc::new(gateway);
        let log_sink = Arc::new(RecordingLogSink::new());

        let orchestrator = RecoveryOrchestrator::builder(config)
            .with_handler_for_all(handler.clone())
            .with_notification_gateway(gateway.clone())
            .with_log_sink(log_sink.clone())
            .with_clock(orchestrator_clock)
            .build()
            .expect("test configuration should be valid");

        Self {
            orchestrator,
            handler,
            gateway,
            log_sink,
            clock: recorded_clock,
        }
    }

    pub async fn wait_for_terminal(&self, recovery_id: Uuid) -> RecoveryExecution {
        wait_for_terminal(&self.orchestrator, recovery_id).await
    }

    pub async fn wait_for_step(
        &self,
        recovery_id: Uuid,
        step_id: &str,
        predicate: impl Fn(&RecoveryExecution) -> bool,
    ) -> RecoveryExecution {
        for _ in 0..MAX_POLLS {
            let execution = self
                .orchestrator
                .get_recovery_status(recovery_id)
                .expect("recovery should be tracked");
            if predicate(&execution) {
                return execution;
            }
            tokio::task::yield_now().await;
        }
        panic!("condition on step {step_id} of recovery {recovery_id} never held");
    }

    /// Let background tasks run to completion after the execution went terminal
    pub async fn settle(&self) {
        for _ in 0..100 {
            tokio::task::yield_now().await;
        }
    }
}

pub async fn wait_for_terminal(
    orchestrator: &RecoveryOrchestrator,
    recovery_id: Uuid,
) -> RecoveryExecution {
    for _ in 0..MAX_POLLS {
        let execution = orchestrator
            .get_recovery_status(recovery_id)
            .expect("recovery should be tracked");
        if execution.is_terminal() {
            return execution;
        }
        tokio::task::yield_now().await;
    }
    panic!("recovery {recovery_id} did not reach a terminal state");
}

pub fn step_state(execution: &RecoveryExecution, step_id: &str) -> StepState {
    execution
        .step_state(step_id)
        .unwrap_or_else(|| panic!("step {step_id} missing from execution"))
}
