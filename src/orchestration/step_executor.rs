//! # Step Executor
//!
//! Dispatches a single attempt of a recovery step to its registered handler, bounded by the
//! step's timeout. Retry policy and state bookkeeping live in the orchestrator; this type
//! only turns a handler call into a `Result`.

use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::step_handler::StepHandlerRegistry;
use crate::error::{RecoveryError, Result};
use crate::models::RecoveryStep;

#[derive(Debug, Clone)]
pub struct StepExecutor {
    registry: Arc<StepHandlerRegistry>,
}

impl StepExecutor {
    pub fn new(registry: Arc<StepHandlerRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &StepHandlerRegistry {
        &self.registry
    }

    /// Run one handler attempt (`attempt` is 1-based)
    #[instrument(skip(self, step), fields(step_id = %step.id, step_type = %step.step_type))]
    pub async fn execute_attempt(&self, step: &RecoveryStep, attempt: u32) -> Result<Value> {
        let handler = self.registry.resolve(step.step_type)?;

        debug!(
            handler = handler.handler_name(),
            attempt = attempt,
            max_attempts = step.max_attempts(),
            "Dispatching recovery step"
        );

        // A panicking handler is an ordinary failed attempt, not a fault of the run.
        let guarded = AssertUnwindSafe(handler.execute(step))
            .catch_unwind()
            .map(|caught| {
                caught.unwrap_or_else(|payload| {
                    let message = panic_message(payload.as_ref());
                    warn!(step_id = %step.id, attempt = attempt, panic = %message, "Step handler panicked");
                    Err(anyhow::anyhow!("handler panicked: {message}"))
                })
            });

        let outcome = match step.timeout_duration() {
            Some(limit) => match tokio::time::timeout(limit, guarded).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    return Err(RecoveryError::StepTimeout {
                        step_id: step.id.clone(),
                        timeout: limit,
                    })
                }
            },
            None => guarded.await,
        };

        outcome.map_err(|e| RecoveryError::StepExecution {
            step_id: step.id.clone(),
            attempt,
            reason: format!("{e:#}"),
        })
    }

    /// Invoke the handler's rollback when the step declares a rollback command.
    ///
    /// Returns `Ok(false)` when the step has nothing to roll back.
    #[instrument(skip(self, step), fields(step_id = %step.id))]
    pub async fn rollback(&self, step: &RecoveryStep) -> Result<bool> {
        let Some(command) = step.rollback_command.as_deref() else {
            return Ok(false);
        };

        let handler = self.registry.resolve(step.step_type)?;
        handler
            .rollback(step, command)
            .await
            .map_err(|e| RecoveryError::RollbackFailed {
                step_id: step.id.clone(),
                reason: format!("{e:#}"),
            })?;

        Ok(true)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StepType;
    use crate::orchestration::step_handler::StepHandler;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct FailingHandler;

    #[async_trait]
    impl StepHandler for FailingHandler {
        async fn execute(&self, _step: &RecoveryStep) -> anyhow::Result<Value> {
            Err(anyhow::anyhow!("replica unreachable"))
        }

        fn handler_name(&self) -> &str {
            "failing"
        }
    }

    struct PanickingHandler;

    #[async_trait]
    impl StepHandler for PanickingHandler {
        async fn execute(&self, step: &RecoveryStep) -> anyhow::Result<Value> {
            panic!("driver crashed while restoring {}", step.id);
        }

        fn handler_name(&self) -> &str {
            "panicking"
        }
    }

    struct SlowHandler;

    #[async_trait]
    impl StepHandler for SlowHandler {
        async fn execute(&self, _step: &RecoveryStep) -> anyhow::Result<Value> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Value::Null)
        }

        fn handler_name(&self) -> &str {
            "slow"
        }
    }

    #[derive(Default)]
    struct RollbackCounter {
        rollbacks: AtomicU32,
    }

    #[async_trait]
    impl StepHandler for RollbackCounter {
        async fn execute(&self, _step: &RecoveryStep) -> anyhow::Result<Value> {
            Ok(Value::Null)
        }

        async fn rollback(&self, _step: &RecoveryStep, _command: &str) -> anyhow::Result<()> {
            self.rollbacks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn handler_name(&self) -> &str {
            "rollback_counter"
        }
    }

    #[tokio::test]
    async fn test_handler_error_is_wrapped() {
        let registry = StepHandlerRegistry::new().with_handler(StepType::Database, Arc::new(FailingHandler));
        let executor = StepExecutor::new(Arc::new(registry));

        let err = executor
            .execute_attempt(&RecoveryStep::new("db", StepType::Database, 1), 2)
            .await
            .unwrap_err();
        match err {
            RecoveryError::StepExecution { step_id, attempt, reason } => {
                assert_eq!(step_id, "db");
                assert_eq!(attempt, 2);
                assert!(reason.contains("replica unreachable"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_handler_panic_becomes_step_error() {
        let registry =
            StepHandlerRegistry::new().with_handler(StepType::Database, Arc::new(PanickingHandler));
        let executor = StepExecutor::new(Arc::new(registry));

        let err = executor
            .execute_attempt(&RecoveryStep::new("db", StepType::Database, 1), 1)
            .await
            .unwrap_err();
        match err {
            RecoveryError::StepExecution { step_id, attempt, reason } => {
                assert_eq!(step_id, "db");
                assert_eq!(attempt, 1);
                assert!(reason.contains("handler panicked"));
                assert!(reason.contains("driver crashed while restoring db"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_bounds_handler() {
        let registry = StepHandlerRegistry::new().with_handler(StepType::Service, Arc::new(SlowHandler));
        let executor = StepExecutor::new(Arc::new(registry));
        let step = RecoveryStep::new("restart", StepType::Service, 1).with_timeout_minutes(1);

        let err = executor.execute_attempt(&step, 1).await.unwrap_err();
        assert!(matches!(err, RecoveryError::StepTimeout { timeout, .. } if timeout == Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn test_rollback_requires_command() {
        let handler = Arc::new(RollbackCounter::default());
        let registry = StepHandlerRegistry::new().with_handler(StepType::Files, handler.clone());
        let executor = StepExecutor::new(Arc::new(registry));

        let plain = RecoveryStep::new("sync", StepType::Files, 1);
        assert!(!executor.rollback(&plain).await.unwrap());

        let with_rollback = plain.with_rollback("restore-snapshot");
        assert!(executor.rollback(&with_rollback).await.unwrap());
        assert_eq!(handler.rollbacks.load(Ordering::SeqCst), 1);
    }
}
