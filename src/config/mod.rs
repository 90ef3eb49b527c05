//! # Disaster Recovery Configuration
//!
//! Process-wide configuration for the recovery orchestrator. The configuration is bound to
//! the orchestrator lifecycle: it is frozen while the orchestrator runs and replacing it
//! requires a stop first.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use recovery_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load_from_path("config/disaster_recovery.toml")?;
//! let config = manager.config();
//!
//! for hazard in config.ordering_hazards() {
//!     println!("{hazard}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use crate::constants::system;
use crate::models::{execution_order, RecoveryStep};

pub use error::{ConfigResult, ConfigurationError};
pub use loader::{ConfigManager, LoadOptions};

/// Root configuration structure mirroring `disaster_recovery.toml`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DisasterRecoveryConfig {
    /// Master switch for `start()`
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Permits the health monitor to trigger recoveries on its own
    #[serde(default)]
    pub auto_failover: bool,

    /// Recovery time objective in minutes (informational)
    #[serde(default = "default_rto")]
    pub recovery_time_objective: u64,

    /// Recovery point objective in minutes (informational)
    #[serde(default = "default_rpo")]
    pub recovery_point_objective: u64,

    /// Seconds between health ticks
    #[serde(default = "default_health_check_interval")]
    pub health_check_interval: u64,

    /// Consecutive unhealthy ticks before an automatic recovery
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Per-probe bound in seconds, defaults to the health-check interval
    #[serde(default)]
    pub probe_timeout_seconds: Option<u64>,

    /// Retry delay is `retry_backoff_base_ms * retry_count`
    #[serde(default = "default_retry_backoff_base_ms")]
    pub retry_backoff_base_ms: u64,

    #[serde(default = "default_max_retry_backoff_ms")]
    pub max_retry_backoff_ms: u64,

    #[serde(default)]
    pub notifications: NotificationConfig,

    #[serde(default)]
    pub backup_sources: Vec<BackupSource>,

    /// Runbook executed on every triggered recovery
    #[serde(default)]
    pub recovery_steps: Vec<RecoveryStep>,
}

fn default_enabled() -> bool {
    true
}

fn default_rto() -> u64 {
    60
}

fn default_rpo() -> u64 {
    15
}

fn default_health_check_interval() -> u64 {
    system::DEFAULT_HEALTH_CHECK_INTERVAL_SECONDS
}

fn default_failure_threshold() -> u32 {
    system::DEFAULT_FAILURE_THRESHOLD
}

fn default_retry_backoff_base_ms() -> u64 {
    system::RETRY_BACKOFF_BASE_MS
}

fn default_max_retry_backoff_ms() -> u64 {
    system::MAX_RETRY_BACKOFF_MS
}

impl Default for DisasterRecoveryConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            auto_failover: false,
            recovery_time_objective: default_rto(),
            recovery_point_objective: default_rpo(),
            health_check_interval: default_health_check_interval(),
            failure_threshold: default_failure_threshold(),
            probe_timeout_seconds: None,
            retry_backoff_base_ms: default_retry_backoff_base_ms(),
            max_retry_backoff_ms: default_max_retry_backoff_ms(),
            notifications: NotificationConfig::default(),
            backup_sources: Vec::new(),
            recovery_steps: Vec::new(),
        }
    }
}

/// Notification delivery channels understood by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Email,
    Sms,
    Webhook,
    Slack,
}

impl fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Email => write!(f, "email"),
            Self::Sms => write!(f, "sms"),
            Self::Webhook => write!(f, "webhook"),
            Self::Slack => write!(f, "slack"),
        }
    }
}

/// Delivery targets for the notification gateway
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub channels: Vec<NotificationChannel>,
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub slack_channel: Option<String>,
}

/// A data source covered by backups (informational)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BackupSource {
    pub name: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// A dependency that can never be satisfied because of step ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderingHazard {
    pub step_id: String,
    pub step_order: i32,
    pub dependency: String,
    pub dependency_order: i32,
}

impl fmt::Display for OrderingHazard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "step '{}' (order {}) depends on '{}' (order {}), which has not run when '{}' is reached; '{}' will always be skipped",
            self.step_id,
            self.step_order,
            self.dependency,
            self.dependency_order,
            self.step_id,
            self.step_id
        )
    }
}

impl DisasterRecoveryConfig {
    /// Validate structural constraints of the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.health_check_interval == 0 {
            return Err(ConfigurationError::invalid_value(
                "health_check_interval",
                self.health_check_interval,
                "must be at least 1 second",
            ));
        }

        if self.failure_threshold == 0 {
            return Err(ConfigurationError::invalid_value(
                "failure_threshold",
                self.failure_threshold,
                "must be at least 1",
            ));
        }

        if self.probe_timeout_seconds == Some(0) {
            return Err(ConfigurationError::invalid_value(
                "probe_timeout_seconds",
                0,
                "must be at least 1 second when set",
            ));
        }

        let mut seen = HashSet::new();
        for step in &self.recovery_steps {
            if step.id.trim().is_empty() {
                return Err(ConfigurationError::invalid_value(
                    "recovery_steps.id",
                    &step.id,
                    "step ids must not be empty",
                ));
            }
            if !seen.insert(step.id.as_str()) {
                return Err(ConfigurationError::DuplicateStepId {
                    step_id: step.id.clone(),
                });
            }
        }

        for step in &self.recovery_steps {
            for dependency in &step.dependencies {
                if dependency == &step.id {
                    return Err(ConfigurationError::SelfDependency {
                        step_id: step.id.clone(),
                    });
                }
                if !seen.contains(dependency.as_str()) {
                    return Err(ConfigurationError::UnknownDependency {
                        step_id: step.id.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Dependencies on steps that are not scheduled strictly before the dependent step.
    ///
    /// These are legal configurations; the dependent step is simply always skipped.
    pub fn ordering_hazards(&self) -> Vec<OrderingHazard> {
        let ordered = execution_order(&self.recovery_steps);
        let position = |id: &str| ordered.iter().position(|step| step.id == id);

        let mut hazards = Vec::new();
        for (index, step) in ordered.iter().enumerate() {
            for dependency in &step.dependencies {
                let Some(dep_index) = position(dependency) else {
                    continue;
                };
                if dep_index >= index {
                    hazards.push(OrderingHazard {
                        step_id: step.id.clone(),
                        step_order: step.order,
                        dependency: dependency.clone(),
                        dependency_order: ordered[dep_index].order,
                    });
                }
            }
        }
        hazards
    }

    pub fn health_check_interval_duration(&self) -> Duration {
        Duration::from_secs(self.health_check_interval)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(
            self.probe_timeout_seconds
                .unwrap_or(self.health_check_interval),
        )
    }

    /// JSON view with delivery targets masked, safe for logs
    pub fn sanitized_for_logging(&self) -> serde_json::Value {
        let mut value = serde_json::json!(self);
        sanitize_json_recursive(&mut value, &system::SENSITIVE_CONFIG_PATTERNS);
        value
    }
}

/// Recursively mask fields whose names match a sensitive pattern
fn sanitize_json_recursive(value: &mut serde_json::Value, sensitive_patterns: &[&str]) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                let key_lower = key.to_lowercase();
                let is_sensitive = sensitive_patterns
                    .iter()
                    .any(|pattern| key_lower.contains(pattern));

                if is_sensitive && !val.is_null() {
                    *val = serde_json::Value::String("[MASKED]".to_string());
                } else {
                    sanitize_json_recursive(val, sensitive_patterns);
                }
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                sanitize_json_recursive(item, sensitive_patterns);
            }
        }
        _ => {}
    }
}
