//! Configuration Error Types
//!
//! Specific, actionable errors for loading and validating the disaster recovery
//! configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors with detailed context
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Base configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigFileNotFound { path: PathBuf },

    /// Source could not be read or parsed into the expected shape
    #[error("Failed to load configuration from '{source_name}': {error}")]
    LoadError { source_name: String, error: String },

    /// Invalid configuration value
    #[error("Invalid value '{value}' for field '{field}': {context}")]
    InvalidValue {
        field: String,
        value: String,
        context: String,
    },

    /// Two recovery steps share an id
    #[error("Duplicate recovery step id '{step_id}'")]
    DuplicateStepId { step_id: String },

    /// A dependency names a step that is not configured
    #[error("Recovery step '{step_id}' depends on unknown step '{dependency}'")]
    UnknownDependency { step_id: String, dependency: String },

    /// A step lists itself as a dependency
    #[error("Recovery step '{step_id}' depends on itself")]
    SelfDependency { step_id: String },
}

impl ConfigurationError {
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl ToString,
        context: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.to_string(),
            context: context.into(),
        }
    }

    pub fn load_error(source_name: impl Into<String>, error: impl ToString) -> Self {
        Self::LoadError {
            source_name: source_name.into(),
            error: error.to_string(),
        }
    }
}

impl From<config::ConfigError> for ConfigurationError {
    fn from(error: config::ConfigError) -> Self {
        Self::load_error("config", error)
    }
}

pub type ConfigResult<T> = Result<T, ConfigurationError>;
