use super::errors::{dependencies_not_met, GuardResult};
use crate::models::{RecoveryExecution, RecoveryStep};

/// Trait for implementing state transition guards
pub trait StateGuard<T, C> {
    /// Check if a transition is allowed
    fn check(&self, entity: &T, context: &C) -> GuardResult<()>;

    /// Get a description of this guard for logging
    fn description(&self) -> &'static str;
}

/// Guard to check if step dependencies are satisfied before starting a step
///
/// Dependencies are evaluated against the *current* status of their step records, at the
/// moment the dependent step is reached. A dependency on a step that runs later in the
/// order therefore never passes.
pub struct StepDependenciesMetGuard;

impl StateGuard<RecoveryStep, RecoveryExecution> for StepDependenciesMetGuard {
    fn check(&self, step: &RecoveryStep, execution: &RecoveryExecution) -> GuardResult<()> {
        let unmet: Vec<String> = step
            .dependencies
            .iter()
            .filter_map(|dependency| {
                match execution.step_state(dependency) {
                    Some(state) if state.satisfies_dependencies() => None,
                    Some(state) => Some(format!("{dependency} ({state})")),
                    None => Some(format!("{dependency} (unknown)")),
                }
            })
            .collect();

        if unmet.is_empty() {
            Ok(())
        } else {
            Err(dependencies_not_met(format!(
                "step {} requires completed {}",
                step.id,
                unmet.join(", ")
            )))
        }
    }

    fn description(&self) -> &'static str {
        "All step dependencies must be completed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StepType;
    use crate::state_machine::StepEvent;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_dependencies_checked_by_current_status() {
        let defs = vec![
            RecoveryStep::new("a", StepType::Database, 1),
            RecoveryStep::new("b", StepType::Service, 2).with_dependencies(["a"]),
        ];
        let now = Utc::now();
        let mut execution = RecoveryExecution::new(Uuid::new_v4(), Uuid::new_v4(), &defs, now);

        let guard = StepDependenciesMetGuard;
        let err = guard.check(&defs[1], &execution).unwrap_err();
        assert!(err.to_string().contains("a (pending)"));

        execution.transition_step("a", StepEvent::Start, now).unwrap();
        execution
            .transition_step("a", StepEvent::Complete(None), now)
            .unwrap();
        assert!(guard.check(&defs[1], &execution).is_ok());
    }

    #[test]
    fn test_unknown_dependency_never_satisfied() {
        let defs = vec![RecoveryStep::new("a", StepType::Custom, 1).with_dependencies(["ghost"])];
        let execution = RecoveryExecution::new(Uuid::new_v4(), Uuid::new_v4(), &defs, Utc::now());

        let err = StepDependenciesMetGuard
            .check(&defs[0], &execution)
            .unwrap_err();
        assert!(err.to_string().contains("ghost (unknown)"));
    }
}
