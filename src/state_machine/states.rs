use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle states of a recovery execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    /// Registered but the execution task has not started yet
    #[default]
    Pending,
    /// Steps are being processed
    Running,
    /// All steps finished without a failed step
    Completed,
    /// A step failed, a critical step halted the run, or the loop faulted
    Failed,
    /// Cancelled by an operator while running
    Cancelled,
}

impl ExecutionState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Check if the execution is currently processing steps
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for ExecutionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid execution state: {s}")),
        }
    }
}

/// Lifecycle states of a single recovery step within an execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    /// Not reached yet, or left untouched after a critical halt
    #[default]
    Pending,
    /// Handler is executing (retries keep the step here)
    Running,
    /// Handler succeeded
    Completed,
    /// Handler failed after exhausting retries
    Failed,
    /// A dependency had not completed when the step was reached
    Skipped,
}

impl StepState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }

    /// Check if this is an active state (step is being processed)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Check if this step satisfies dependencies for other steps
    pub fn satisfies_dependencies(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

impl std::str::FromStr for StepState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "skipped" => Ok(Self::Skipped),
            _ => Err(format!("Invalid step state: {s}")),
        }
    }
}
