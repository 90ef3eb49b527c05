use proptest::prelude::*;
use recovery_core::models::{RecoveryStep, StepType};

/// A generated runbook step plus how many times its handler should fail
#[derive(Debug, Clone)]
pub struct StepScript {
    pub step: RecoveryStep,
    pub failures: u32,
}

pub fn step_type_strategy() -> impl Strategy<Value = StepType> {
    prop::sample::select(StepType::ALL.to_vec())
}

/// Runbooks of up to `max_steps` steps with unique ids, arbitrary (possibly tied) orders,
/// and dependencies on any other step
pub fn runbook_strategy(max_steps: usize) -> impl Strategy<Value = Vec<StepScript>> {
    prop::collection::vec(
        (
            step_type_strategy(),
            0i32..5,
            0u32..3,
            0u32..4,
            any::<bool>(),
            prop::collection::vec(any::<prop::sample::Index>(), 0..3),
        ),
        0..=max_steps,
    )
    .prop_map(|specs| {
        let ids: Vec<String> = (0..specs.len()).map(|i| format!("step_{i}")).collect();
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (step_type, order, retries, failures, critical, deps))| {
                let mut dependencies: Vec<String> = deps
                    .iter()
                    .map(|index| ids[index.index(ids.len())].clone())
                    .filter(|dependency| dependency != &ids[i])
                    .collect();
                dependencies.dedup();

                let mut step = RecoveryStep::new(ids[i].clone(), step_type, order)
                    .with_retries(retries)
                    .with_dependencies(dependencies);
                if critical {
                    step = step.critical();
                }
                StepScript { step, failures }
            })
            .collect()
    })
}
