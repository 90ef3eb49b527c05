use super::{
    errors::{StateMachineError, StateMachineResult},
    events::ExecutionEvent,
    states::ExecutionState,
};

/// Transition table for `RecoveryExecution.status`
///
/// `pending -> running -> {completed | failed | cancelled}`. A pending execution may also go
/// straight to `failed` when the execution loop faults before it could start.
pub struct ExecutionStateMachine;

impl ExecutionStateMachine {
    /// Determine the target state for an event, rejecting transitions out of terminal states
    pub fn determine_target_state(
        current_state: ExecutionState,
        event: &ExecutionEvent,
    ) -> StateMachineResult<ExecutionState> {
        let target = match (current_state, event) {
            (ExecutionState::Pending, ExecutionEvent::Start) => ExecutionState::Running,

            (ExecutionState::Running, ExecutionEvent::Complete) => ExecutionState::Completed,

            (ExecutionState::Running, ExecutionEvent::Fail(_)) => ExecutionState::Failed,
            (ExecutionState::Pending, ExecutionEvent::Fail(_)) => ExecutionState::Failed,

            (ExecutionState::Running, ExecutionEvent::Cancel) => ExecutionState::Cancelled,

            (from_state, _) => {
                return Err(StateMachineError::InvalidTransition {
                    from: from_state.to_string(),
                    event: event.event_type().to_string(),
                })
            }
        };

        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let running =
            ExecutionStateMachine::determine_target_state(ExecutionState::Pending, &ExecutionEvent::Start)
                .unwrap();
        assert_eq!(running, ExecutionState::Running);

        let done = ExecutionStateMachine::determine_target_state(running, &ExecutionEvent::Complete)
            .unwrap();
        assert_eq!(done, ExecutionState::Completed);
    }

    #[test]
    fn test_cancel_only_from_running() {
        assert_eq!(
            ExecutionStateMachine::determine_target_state(
                ExecutionState::Running,
                &ExecutionEvent::Cancel
            )
            .unwrap(),
            ExecutionState::Cancelled
        );
        assert!(ExecutionStateMachine::determine_target_state(
            ExecutionState::Pending,
            &ExecutionEvent::Cancel
        )
        .is_err());
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        let events = [
            ExecutionEvent::Start,
            ExecutionEvent::Complete,
            ExecutionEvent::fail_with_error("late"),
            ExecutionEvent::Cancel,
        ];

        for terminal in [
            ExecutionState::Completed,
            ExecutionState::Failed,
            ExecutionState::Cancelled,
        ] {
            for event in &events {
                let result = ExecutionStateMachine::determine_target_state(terminal, event);
                assert!(
                    matches!(result, Err(StateMachineError::InvalidTransition { .. })),
                    "{terminal} accepted {}",
                    event.event_type()
                );
            }
        }
    }
}
