// State machine module for recovery orchestration
//
// Pure transition tables for executions and their steps. The orchestrator applies every
// status change through these so terminal states stay terminal.

pub mod errors;
pub mod events;
pub mod execution_state_machine;
pub mod guards;
pub mod states;
pub mod step_state_machine;

// Re-export main types for convenient access
pub use errors::{GuardError, StateMachineError, StateMachineResult};
pub use events::{ExecutionEvent, StepEvent};
pub use execution_state_machine::ExecutionStateMachine;
pub use guards::{StateGuard, StepDependenciesMetGuard};
pub use states::{ExecutionState, StepState};
pub use step_state_machine::StepStateMachine;
