//! # Recovery Data Model
//!
//! - [`RecoveryStep`] - configuration-time runbook step definitions
//! - [`DisasterEvent`] - immutable incident records
//! - [`RecoveryExecution`] - per-incident run state with nested step records and logs

pub mod disaster_event;
pub mod recovery_execution;
pub mod recovery_step;

pub use disaster_event::{DisasterEvent, DisasterType, Severity};
pub use recovery_execution::{
    ExecutionMetrics, LogLevel, RecoveryExecution, RecoveryLog, RecoveryStepExecution,
};
pub use recovery_step::{execution_order, RecoveryStep, StepType};
