use thiserror::Error;

/// Errors raised when a requested transition is not part of a state machine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateMachineError {
    #[error("Invalid transition from {from} on event {event}")]
    InvalidTransition { from: String, event: String },

    #[error("Guard failed: {reason}")]
    GuardFailed { reason: String },
}

/// Errors raised by transition guards
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GuardError {
    #[error("Dependencies not satisfied: {reason}")]
    DependenciesNotMet { reason: String },
}

impl From<GuardError> for StateMachineError {
    fn from(error: GuardError) -> Self {
        StateMachineError::GuardFailed {
            reason: error.to_string(),
        }
    }
}

pub type StateMachineResult<T> = Result<T, StateMachineError>;
pub type GuardResult<T> = Result<T, GuardError>;

pub fn dependencies_not_met(reason: impl Into<String>) -> GuardError {
    GuardError::DependenciesNotMet {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_chain() {
        let guard_err = dependencies_not_met("step b waits on a");
        let sm_err: StateMachineError = guard_err.into();

        match sm_err {
            StateMachineError::GuardFailed { reason } => {
                assert!(reason.contains("Dependencies not satisfied"));
                assert!(reason.contains("step b waits on a"));
            }
            _ => panic!("Expected GuardFailed error"),
        }
    }
}
