//! Error types for the recovery engine.
//!
//! Step and probe failures are contained inside executions and health reports; only the
//! variants callers can act on cross the orchestrator boundary.

use crate::config::ConfigurationError;
use crate::state_machine::{ExecutionState, StateMachineError};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("Recovery {recovery_id} not found")]
    RecoveryNotFound { recovery_id: Uuid },

    #[error("Recovery {recovery_id} is not running (status: {status})")]
    NotRunning {
        recovery_id: Uuid,
        status: ExecutionState,
    },

    #[error("No step handler registered for step type '{step_type}'")]
    HandlerNotRegistered { step_type: String },

    #[error("Step {step_id} attempt {attempt} failed: {reason}")]
    StepExecution {
        step_id: String,
        attempt: u32,
        reason: String,
    },

    #[error("Step {step_id} timed out after {timeout:?}")]
    StepTimeout { step_id: String, timeout: Duration },

    #[error("Step {step_id} failed after {attempts} attempt(s): {reason}")]
    StepFailed {
        step_id: String,
        attempts: u32,
        reason: String,
    },

    #[error("Critical step {step_id} failed, halting recovery")]
    CriticalStepFailure { step_id: String },

    #[error("Rollback of step {step_id} failed: {reason}")]
    RollbackFailed { step_id: String, reason: String },

    #[error("Recovery cancelled while step {step_id} was waiting to retry")]
    RetryAborted { step_id: String },

    #[error("Recovery cancelled before step {step_id} was dispatched")]
    DispatchAborted { step_id: String },

    #[error("Orchestration fault: {0}")]
    OrchestrationFault(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("State transition error: {0}")]
    StateTransition(#[from] StateMachineError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

pub type Result<T> = std::result::Result<T, RecoveryError>;
