mod common;

use common::strategies::*;
use common::*;
use proptest::prelude::*;
use recovery_core::config::DisasterRecoveryConfig;
use recovery_core::orchestration::{classify_severity, BackoffCalculator, BackoffCalculatorConfig};
use recovery_core::state_machine::{ExecutionState, StepState};
use std::time::Duration;

fn run_runbook(scripts: &[StepScript]) -> (recovery_core::models::RecoveryExecution, Vec<u32>) {
    tokio_test::block_on(async {
        let handler = scripts
            .iter()
            .fold(ScriptedStepHandler::new(), |handler, script| {
                handler.fail_times(&script.step.id, script.failures)
            });
        let config = DisasterRecoveryConfig {
            recovery_steps: scripts.iter().map(|script| script.step.clone()).collect(),
            ..DisasterRecoveryConfig::default()
        };
        let harness = TestHarness::with_gateway(config, handler, RecordingGateway::new());

        let id = harness
            .orchestrator
            .trigger_recovery(
                recovery_core::models::DisasterType::ManualTrigger,
                "property run",
                vec![],
                None,
            )
            .expect("trigger");
        let execution = harness.wait_for_terminal(id).await;
        harness.settle().await;

        let attempts = scripts
            .iter()
            .map(|script| harness.handler.attempts(&script.step.id))
            .collect();
        (execution, attempts)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: step counts always partition the runbook and progress tracks completions
    #[test]
    fn step_counts_partition_runbook(scripts in runbook_strategy(6)) {
        let (execution, _) = run_runbook(&scripts);

        prop_assert!(execution.is_terminal());
        prop_assert!(execution.completed_at.is_some());

        let pending = execution.count_in_state(StepState::Pending);
        let running = execution.count_in_state(StepState::Running);
        let metrics = &execution.metrics;
        prop_assert_eq!(running, 0);
        prop_assert_eq!(
            metrics.completed_steps + metrics.failed_steps + metrics.skipped_steps + pending,
            metrics.total_steps
        );

        let expected_progress = if metrics.total_steps == 0 {
            0
        } else {
            ((metrics.completed_steps as f64 / metrics.total_steps as f64) * 100.0).round() as u8
        };
        prop_assert_eq!(execution.progress, expected_progress);

        // Pending steps only remain after a critical failure halted the loop
        if pending > 0 {
            prop_assert_eq!(execution.status, ExecutionState::Failed);
        }
        if execution.status == ExecutionState::Completed {
            prop_assert_eq!(metrics.failed_steps, 0);
        }
    }

    /// Property: a step is attempted at most retries + 1 times
    #[test]
    fn attempts_are_bounded_by_retries(scripts in runbook_strategy(5)) {
        let (execution, attempts) = run_runbook(&scripts);

        for (script, attempts) in scripts.iter().zip(attempts) {
            prop_assert!(attempts <= script.step.retries + 1);

            let record = execution.step(&script.step.id).unwrap();
            if record.status == StepState::Completed {
                prop_assert_eq!(attempts, script.failures + 1);
                prop_assert_eq!(record.retry_count, script.failures);
            }
            if record.status == StepState::Skipped || record.status == StepState::Pending {
                prop_assert_eq!(attempts, 0);
            }
        }
    }

    /// Property: more failing subsystems never lower severity
    #[test]
    fn severity_is_monotonic(failing in 0usize..64) {
        prop_assert!(classify_severity(failing) <= classify_severity(failing + 1));
    }

    /// Property: retry delays never decrease and never exceed the cap
    #[test]
    fn backoff_is_monotonic_and_capped(
        base_ms in 1u64..10_000,
        max_ms in 1u64..600_000,
        retry in 1u32..1_000,
    ) {
        let calculator = BackoffCalculator::new(BackoffCalculatorConfig {
            base_delay: Duration::from_millis(base_ms),
            max_delay: Duration::from_millis(max_ms),
        });

        let delay = calculator.delay_for_retry(retry);
        prop_assert!(delay <= Duration::from_millis(max_ms));
        prop_assert!(delay <= calculator.delay_for_retry(retry + 1));
    }
}
