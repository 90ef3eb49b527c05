//! # Recovery Step Definitions
//!
//! Configuration-time description of one runbook step. Definitions are immutable once the
//! orchestrator has started; each triggered recovery creates its own runtime
//! [`RecoveryStepExecution`](super::RecoveryStepExecution) per definition.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Kind of recovery action; selects the registered `StepHandler`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Database,
    Files,
    Configuration,
    Service,
    Validation,
    Custom,
}

impl StepType {
    pub const ALL: [StepType; 6] = [
        StepType::Database,
        StepType::Files,
        StepType::Configuration,
        StepType::Service,
        StepType::Validation,
        StepType::Custom,
    ];
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database => write!(f, "database"),
            Self::Files => write!(f, "files"),
            Self::Configuration => write!(f, "configuration"),
            Self::Service => write!(f, "service"),
            Self::Validation => write!(f, "validation"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

impl std::str::FromStr for StepType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "database" => Ok(Self::Database),
            "files" => Ok(Self::Files),
            "configuration" => Ok(Self::Configuration),
            "service" => Ok(Self::Service),
            "validation" => Ok(Self::Validation),
            "custom" => Ok(Self::Custom),
            _ => Err(format!("Invalid step type: {s}")),
        }
    }
}

/// One configured unit of the recovery runbook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryStep {
    /// Unique within a configuration
    pub id: String,
    /// Human readable name, defaults to the id in logs
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub step_type: StepType,
    /// Scheduling sequence, ascending; ties keep configuration order
    pub order: i32,
    /// Handler timeout in minutes, 0 disables the bound
    #[serde(default)]
    pub timeout: u64,
    /// Retry attempts after the first
    #[serde(default)]
    pub retries: u32,
    /// Step ids that must be `completed` before this step may run
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Failure halts the whole execution
    #[serde(default)]
    pub critical: bool,
    #[serde(default)]
    pub rollback_command: Option<String>,
}

impl RecoveryStep {
    pub fn new(id: impl Into<String>, step_type: StepType, order: i32) -> Self {
        Self {
            id: id.into(),
            name: None,
            description: None,
            step_type,
            order,
            timeout: 0,
            retries: 0,
            dependencies: Vec::new(),
            critical: false,
            rollback_command: None,
        }
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_timeout_minutes(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    pub fn with_rollback(mut self, command: impl Into<String>) -> Self {
        self.rollback_command = Some(command.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Handler time bound, `None` when unbounded
    pub fn timeout_duration(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_secs(self.timeout.saturating_mul(60)))
    }

    /// Maximum number of handler invocations
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

/// Sort step definitions ascending by `order`, keeping configuration order on ties
pub fn execution_order(steps: &[RecoveryStep]) -> Vec<&RecoveryStep> {
    let mut ordered: Vec<&RecoveryStep> = steps.iter().collect();
    // sort_by_key is stable
    ordered.sort_by_key(|step| step.order);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_order_is_stable() {
        let steps = vec![
            RecoveryStep::new("verify", StepType::Validation, 3),
            RecoveryStep::new("db", StepType::Database, 1),
            RecoveryStep::new("files", StepType::Files, 2),
            RecoveryStep::new("config", StepType::Configuration, 2),
        ];

        let ids: Vec<&str> = execution_order(&steps).iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["db", "files", "config", "verify"]);
    }

    #[test]
    fn test_timeout_duration() {
        let step = RecoveryStep::new("db", StepType::Database, 1);
        assert_eq!(step.timeout_duration(), None);

        let step = step.with_timeout_minutes(5);
        assert_eq!(step.timeout_duration(), Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_oversized_timeout_saturates() {
        let step = RecoveryStep::new("db", StepType::Database, 1).with_timeout_minutes(u64::MAX / 30);
        assert_eq!(step.timeout_duration(), Some(Duration::from_secs(u64::MAX)));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let step: RecoveryStep = serde_json::from_str(
            r#"{"id": "restore_db", "type": "database", "order": 1, "critical": true}"#,
        )
        .unwrap();

        assert_eq!(step.step_type, StepType::Database);
        assert_eq!(step.retries, 0);
        assert!(step.dependencies.is_empty());
        assert!(step.critical);
        assert_eq!(step.max_attempts(), 1);
    }
}
