use super::{
    errors::{StateMachineError, StateMachineResult},
    events::StepEvent,
    states::StepState,
};

/// Transition table for `RecoveryStepExecution.status`
///
/// `pending -> running -> {completed | failed}` and `pending -> skipped`. Retries do not
/// leave `running`; only the retry counter moves.
pub struct StepStateMachine;

impl StepStateMachine {
    /// Determine the target state based on current state and event
    pub fn determine_target_state(
        current_state: StepState,
        event: &StepEvent,
    ) -> StateMachineResult<StepState> {
        let target = match (current_state, event) {
            (StepState::Pending, StepEvent::Start) => StepState::Running,

            (StepState::Running, StepEvent::Complete(_)) => StepState::Completed,

            (StepState::Running, StepEvent::Fail(_)) => StepState::Failed,

            (StepState::Pending, StepEvent::Skip(_)) => StepState::Skipped,

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
