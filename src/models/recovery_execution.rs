//! # Recovery Execution
//!
//! Aggregate root for one recovery run. The orchestrator owns every execution and is the
//! only writer; callers receive cloned snapshots.
//!
//! All status changes go through [`ExecutionStateMachine`] and [`StepStateMachine`], so a
//! terminal execution or step can never be moved again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::recovery_step::RecoveryStep;
use crate::state_machine::{
    ExecutionEvent, ExecutionState, ExecutionStateMachine, StateMachineResult, StepEvent,
    StepState, StepStateMachine,
};

/// Severity of a recovery log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Append-only log entry attached to an execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryLog {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub step_id: Option<String>,
}

/// Aggregate counters, recomputed after every step transition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMetrics {
    pub total_steps: usize,
    pub completed_steps: usize,
    pub failed_steps: usize,
    pub skipped_steps: usize,
    /// Minutes: sum of the configured timeouts of steps not yet finished
    pub estimated_time_remaining: u64,
}

/// Runtime record of one step within an execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryStepExecution {
    pub step_id: String,
    pub status: StepState,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    pub retry_count: u32,
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl RecoveryStepExecution {
    fn new(step_id: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            status: StepState::Pending,
            started_at: None,
            completed_at: None,
            duration_ms: None,
            retry_count: 0,
            output: None,
            error: None,
        }
    }

    fn finish(&mut self, now: DateTime<Utc>) {
        self.completed_at = Some(now);
        if let Some(started_at) = self.started_at {
            self.duration_ms = Some((now - started_at).num_milliseconds().max(0) as u64);
        }
    }
}

/// One recovery run for one disaster event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryExecution {
    pub id: Uuid,
    pub disaster_event_id: Uuid,
    pub status: ExecutionState,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub current_step: Option<String>,
    /// 0-100
    pub progress: u8,
    pub steps: Vec<RecoveryStepExecution>,
    pub logs: Vec<RecoveryLog>,
    pub metrics: ExecutionMetrics,
}

impl RecoveryExecution {
    /// Create a pending execution with one step record per configured step
    pub fn new(
        id: Uuid,
        disaster_event_id: Uuid,
        definitions: &[RecoveryStep],
        now: DateTime<Utc>,
    ) -> Self {
        let mut execution = Self {
            id,
            disaster_event_id,
            status: ExecutionState::Pending,
            started_at: now,
            completed_at: None,
            current_step: None,
            progress: 0,
            steps: definitions
                .iter()
                .map(|definition| RecoveryStepExecution::new(&definition.id))
                .collect(),
            logs: Vec::new(),
            metrics: ExecutionMetrics::default(),
        };
        execution.recompute_metrics(definitions);
        execution
    }

    pub fn step(&self, step_id: &str) -> Option<&RecoveryStepExecution> {
        self.steps.iter().find(|step| step.step_id == step_id)
    }

    fn step_mut(&mut self, step_id: &str) -> Option<&mut RecoveryStepExecution> {
        self.steps.iter_mut().find(|step| step.step_id == step_id)
    }

    pub fn step_state(&self, step_id: &str) -> Option<StepState> {
        self.step(step_id).map(|step| step.status)
    }

    /// The step currently being executed, if any
    pub fn running_step(&self) -> Option<&RecoveryStepExecution> {
        self.steps.iter().find(|step| step.status.is_active())
    }

    pub fn count_in_state(&self, state: StepState) -> usize {
        self.steps.iter().filter(|step| step.status == state).count()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Append a log entry and return a copy for forwarding to external sinks
    pub fn append_log(
        &mut self,
        level: LogLevel,
        message: impl Into<String>,
        step_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> RecoveryLog {
        let entry = RecoveryLog {
            timestamp: now,
            level,
            message: message.into(),
            step_id: step_id.map(str::to_string),
        };
        self.logs.push(entry.clone());
        entry
    }

    /// Apply an execution-level event. Terminal transitions stamp `completed_at` and clear
    /// `current_step`.
    pub fn transition(
        &mut self,
        event: &ExecutionEvent,
        now: DateTime<Utc>,
    ) -> StateMachineResult<ExecutionState> {
        let target = ExecutionStateMachine::determine_target_state(self.status, event)?;
        self.status = target;

        if target.is_terminal() {
            self.completed_at = Some(now);
            self.current_step = None;
        }

        Ok(target)
    }

    /// Apply a step-level event to the named step record
    pub fn transition_step(
        &mut self,
        step_id: &str,
        event: StepEvent,
        now: DateTime<Utc>,
    ) -> StateMachineResult<StepState> {
        let step = self.step_mut(step_id).ok_or_else(|| {
            crate::state_machine::StateMachineError::InvalidTransition {
                from: format!("unknown step {step_id}"),
                event: event.event_type().to_string(),
            }
        })?;

        let target = StepStateMachine::determine_target_state(step.status, &event)?;
        step.status = target;

        match event {
            StepEvent::Start => {
                step.started_at = Some(now);
            }
            StepEvent::Complete(output) => {
                step.output = output;
                step.finish(now);
            }
            StepEvent::Fail(error) => {
                step.error = Some(error);
                step.finish(now);
            }
            StepEvent::Skip(reason) => {
                step.error = Some(reason);
            }
        }

        match target {
            StepState::Running => self.current_step = Some(step_id.to_string()),
            _ if self.current_step.as_deref() == Some(step_id) => self.current_step = None,
            _ => {}
        }

        Ok(target)
    }

    /// Record a failed attempt that will be retried; returns the new retry count
    pub fn record_retry(&mut self, step_id: &str, error: impl Into<String>) -> u32 {
        match self.step_mut(step_id) {
            Some(step) => {
                step.retry_count += 1;
                step.error = Some(error.into());
                step.retry_count
            }
            None => 0,
        }
    }

    /// Recompute counters and progress from the step records
    pub fn recompute_metrics(&mut self, definitions: &[RecoveryStep]) {
        let total = self.steps.len();
        let completed = self.count_in_state(StepState::Completed);

        let estimated_time_remaining = definitions
            .iter()
            .filter(|definition| {
                self.step_state(&definition.id)
                    .is_some_and(|state| !state.is_terminal())
            })
            .fold(0u64, |minutes, definition| minutes.saturating_add(definition.timeout));

        self.metrics = ExecutionMetrics {
            total_steps: total,
            completed_steps: completed,
            failed_steps: self.count_in_state(StepState::Failed),
            skipped_steps: self.count_in_state(StepState::Skipped),
            estimated_time_remaining,
        };

        self.progress = if total == 0 {
            0
        } else {
            ((completed as f64 / total as f64) * 100.0).round() as u8
        };
    }
}
