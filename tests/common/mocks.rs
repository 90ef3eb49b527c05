//! Mock collaborators for exercising the orchestrator and health monitor without real
//! infrastructure.

use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::Mutex;
use recovery_core::error::Result;
use recovery_core::health::{HealthProbe, RecoveryTrigger};
use recovery_core::logging::LogSink;
use recovery_core::models::{DisasterEvent, LogLevel, RecoveryExecution, RecoveryStep};
use recovery_core::orchestration::{NotificationGateway, StepHandler};
use recovery_core::state_machine::ExecutionState;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use uuid::Uuid;

/// Step handler whose behaviour is scripted per step id
#[derive(Default)]
pub struct ScriptedStepHandler {
    /// Remaining failures per step; `u32::MAX` fails forever
    failures: Mutex<HashMap<String, u32>>,
    panics: HashSet<String>,
    gates: HashMap<String, Arc<Notify>>,
    attempts: Mutex<HashMap<String, u32>>,
    executed: Mutex<Vec<String>>,
    rollbacks: Mutex<Vec<String>>,
}

impl ScriptedStepHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_times(self, step_id: &str, times: u32) -> Self {
        self.failures.lock().insert(step_id.to_string(), times);
        self
    }

    pub fn always_fail(self, step_id: &str) -> Self {
        self.fail_times(step_id, u32::MAX)
    }

    pub fn panic_on(mut self, step_id: &str) -> Self {
        self.panics.insert(step_id.to_string());
        self
    }

    /// Block the step until the returned gate is notified
    pub fn gate(&mut self, step_id: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.insert(step_id.to_string(), gate.clone());
        gate
    }

    pub fn attempts(&self, step_id: &str) -> u32 {
        self.attempts.lock().get(step_id).copied().unwrap_or(0)
    }

    /// Step ids in the order their first attempt began
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }

    pub fn rollbacks(&self) -> Vec<String> {
        self.rollbacks.lock().clone()
    }
}

#[async_trait]
impl StepHandler for ScriptedStepHandler {
    async fn execute(&self, step: &RecoveryStep) -> anyhow::Result<Value> {
        let attempt = {
            let mut attempts = self.attempts.lock();
            let count = attempts.entry(step.id.clone()).or_insert(0);
            *count += 1;
            *count
        };
        if attempt == 1 {
            self.executed.lock().push(step.id.clone());
        }

        if self.panics.contains(&step.id) {
            panic!("handler for {} blew up", step.id);
        }

        if let Some(gate) = self.gates.get(&step.id) {
            gate.notified().await;
        }

        let should_fail = {
            let mut failures = self.failures.lock();
            match failures.get_mut(&step.id) {
                Some(remaining) if *remaining > 0 => {
                    if *remaining != u32::MAX {
                        *remaining -= 1;
                    }
                    true
                }
                _ => false,
            }
        };

        if should_fail {
            Err(anyhow!("simulated failure of {} on attempt {attempt}", step.id))
        } else {
            Ok(json!({ "step": step.id, "attempt": attempt }))
        }
    }

    async fn rollback(&self, step: &RecoveryStep, _command: &str) -> anyhow::Result<()> {
        self.rollbacks.lock().push(step.id.clone());
        Ok(())
    }

    fn handler_name(&self) -> &str {
        "scripted"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeBehavior {
    Healthy,
    Unhealthy,
    Error,
    Hang,
    Panic,
}

/// Probe that plays back a script, repeating the last behaviour once exhausted
pub struct ScriptedProbe {
    script: Mutex<VecDeque<ProbeBehavior>>,
    last: Mutex<ProbeBehavior>,
    calls: Mutex<u32>,
}

impl ScriptedProbe {
    pub fn new(script: impl IntoIterator<Item = ProbeBehavior>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            last: Mutex::new(ProbeBehavior::Healthy),
            calls: Mutex::new(0),
        }
    }

    pub fn always(behavior: ProbeBehavior) -> Self {
        Self::new([behavior])
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock()
    }

    fn next_behavior(&self) -> ProbeBehavior {
        *self.calls.lock() += 1;
        let mut last = self.last.lock();
        if let Some(next) = self.script.lock().pop_front() {
            *last = next;
        }
        *last
    }
}

#[async_trait]
impl HealthProbe for ScriptedProbe {
    async fn check(&self) -> anyhow::Result<bool> {
        match self.next_behavior() {
            ProbeBehavior::Healthy => Ok(true),
            ProbeBehavior::Unhealthy => Ok(false),
            ProbeBehavior::Error => Err(anyhow!("connection refused")),
            ProbeBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
                Ok(true)
            }
            ProbeBehavior::Panic => panic!("probe blew up"),
        }
    }
}

/// Gateway recording every notification, optionally failing each call
#[derive(Default)]
pub struct RecordingGateway {
    fail: bool,
    disaster: Mutex<Vec<(Uuid, Uuid)>>,
    completion: Mutex<Vec<(Uuid, ExecutionState)>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// `(event id, recovery id)` per disaster notification
    pub fn disaster_notifications(&self) -> Vec<(Uuid, Uuid)> {
        self.disaster.lock().clone()
    }

    pub fn completion_notifications(&self) -> Vec<(Uuid, ExecutionState)> {
        self.completion.lock().clone()
    }
}

#[async_trait]
impl NotificationGateway for RecordingGateway {
    async fn send_disaster_notification(
        &self,
        event: &DisasterEvent,
        execution: &RecoveryExecution,
    ) -> anyhow::Result<()> {
        self.disaster.lock().push((event.id, execution.id));
        if self.fail {
            return Err(anyhow!("smtp relay unavailable"));
        }
        Ok(())
    }

    async fn send_recovery_completion(&self, execution: &RecoveryExecution) -> anyhow::Result<()> {
        self.completion.lock().push((execution.id, execution.status));
        if self.fail {
            return Err(anyhow!("smtp relay unavailable"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SinkEntry {
    pub level: LogLevel,
    pub message: String,
    pub category: String,
    pub metadata: Value,
}

#[derive(Default)]
pub struct RecordingLogSink {
    entries: Mutex<Vec<SinkEntry>>,
}

impl RecordingLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<SinkEntry> {
        self.entries.lock().clone()
    }
}

impl LogSink for RecordingLogSink {
    fn log(&self, level: LogLevel, message: &str, category: &str, metadata: Value) {
        self.entries.lock().push(SinkEntry {
            level,
            message: message.to_string(),
            category: category.to_string(),
            metadata,
        });
    }
}

/// Trigger that records raised events instead of running recoveries
#[derive(Default)]
pub struct RecordingTrigger {
    events: Mutex<Vec<DisasterEvent>>,
}

impl RecordingTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DisasterEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl RecoveryTrigger for RecordingTrigger {
    async fn trigger_automatic_recovery(&self, event: DisasterEvent) -> Result<Uuid> {
        self.events.lock().push(event);
        Ok(Uuid::new_v4())
    }
}
