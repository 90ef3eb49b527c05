use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Events that can trigger recovery execution state transitions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ExecutionEvent {
    /// Begin processing steps
    Start,
    /// Every step finished without failures
    Complete,
    /// Execution failed with a reason
    Fail(String),
    /// Operator cancellation
    Cancel,
}

impl ExecutionEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Complete => "complete",
            Self::Fail(_) => "fail",
            Self::Cancel => "cancel",
        }
    }

    /// Extract error message if this is a failure event
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Fail(msg) => Some(msg),
            _ => None,
        }
    }

    /// Create a failure event with the given error message
    pub fn fail_with_error(error: impl Into<String>) -> Self {
        Self::Fail(error.into())
    }
}

/// Events that can trigger recovery step state transitions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum StepEvent {
    /// Dispatch the step to its handler
    Start,
    /// Handler succeeded with optional output
    Complete(Option<Value>),
    /// Handler failed and retries are exhausted
    Fail(String),
    /// A dependency was not completed when the step was reached
    Skip(String),
}

impl StepEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Complete(_) => "complete",
            Self::Fail(_) => "fail",
            Self::Skip(_) => "skip",
        }
    }

    /// Extract error message if this is a failure event
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Fail(msg) => Some(msg),
            _ => None,
        }
    }

    /// Extract output if this is a completion event
    pub fn output(&self) -> Option<&Value> {
        match self {
            Self::Complete(output) => output.as_ref(),
            _ => None,
        }
    }

    /// Create a failure event with the given error message
    pub fn fail_with_error(error: impl Into<String>) -> Self {
        Self::Fail(error.into())
    }
}
