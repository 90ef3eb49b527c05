//! # System Constants
//!
//! Defaults, event names and subsystem identifiers shared across the recovery engine.

/// Lifecycle event names published on the [`EventPublisher`](crate::events::EventPublisher)
pub mod events {
    // Recovery lifecycle events
    pub const RECOVERY_TRIGGERED: &str = "recovery.triggered";
    pub const RECOVERY_STARTED: &str = "recovery.started";
    pub const RECOVERY_COMPLETED: &str = "recovery.completed";
    pub const RECOVERY_FAILED: &str = "recovery.failed";
    pub const RECOVERY_CANCELLED: &str = "recovery.cancelled";
    pub const RECOVERY_DEBOUNCED: &str = "recovery.debounced";

    // Step lifecycle events
    pub const STEP_STARTED: &str = "recovery.step.started";
    pub const STEP_COMPLETED: &str = "recovery.step.completed";
    pub const STEP_RETRY_SCHEDULED: &str = "recovery.step.retry_scheduled";
    pub const STEP_FAILED: &str = "recovery.step.failed";
    pub const STEP_SKIPPED: &str = "recovery.step.skipped";
    pub const STEP_ROLLED_BACK: &str = "recovery.step.rolled_back";

    // Health monitoring events
    pub const HEALTH_CHECK_COMPLETED: &str = "health.check.completed";
    pub const HEALTH_THRESHOLD_REACHED: &str = "health.threshold_reached";
}

/// Subsystems probed by the health monitor when no custom set is registered
pub mod subsystems {
    pub const DATABASE: &str = "database";
    pub const API: &str = "api";
    pub const STORAGE: &str = "storage";
    pub const NETWORK: &str = "network";

    pub const DEFAULT: [&str; 4] = [DATABASE, API, STORAGE, NETWORK];
}

pub mod system {
    /// Category attached to every entry sent to the external log sink
    pub const LOG_CATEGORY: &str = "disaster_recovery";

    pub const DEFAULT_HEALTH_CHECK_INTERVAL_SECONDS: u64 = 30;
    pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

    /// Retry delay grows by this much per retry
    pub const RETRY_BACKOFF_BASE_MS: u64 = 2000;
    pub const MAX_RETRY_BACKOFF_MS: u64 = 300_000;

    pub const EVENT_CHANNEL_CAPACITY: usize = 1000;

    pub const DEFAULT_CONFIG_PATH: &str = "config/disaster_recovery.toml";
    pub const CONFIG_ENV_PREFIX: &str = "DR";

    pub const SENSITIVE_CONFIG_PATTERNS: [&str; 6] = [
        "password",
        "secret",
        "token",
        "credential",
        "webhook",
        "recipient",
    ];
}
