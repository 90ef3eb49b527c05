//! # Structured Logging Module
//!
//! Environment-aware structured logging for the recovery engine, plus the [`LogSink`]
//! collaborator that receives every recovery log entry.

use chrono::Utc;
use serde_json::Value;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::models::LogLevel;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
///
/// `RUST_LOG` takes precedence over the environment default. Set `DR_LOG_FORMAT=json` for
/// JSON lines instead of the human-readable console format.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment);
        let json_output = std::env::var("DR_LOG_FORMAT").is_ok_and(|format| format == "json");

        let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        let console_layer = (!json_output).then(|| {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true)
                .with_filter(filter())
        });

        let json_layer = json_output.then(|| {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(false)
                .json()
                .with_filter(filter())
        });

        // A global subscriber may already be set by the embedding application
        if tracing_subscriber::registry()
            .with(console_layer)
            .with(json_layer)
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            environment = %environment,
            json = json_output,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("DR_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

/// External structured log collaborator
///
/// Receives every entry appended to a recovery execution's log, with the recovery and step
/// identifiers in `metadata`. Called outside any execution lock, so implementations may
/// query the orchestrator.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, message: &str, category: &str, metadata: Value);
}

/// Default sink forwarding entries to `tracing`
#[derive(Debug, Default, Clone)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn log(&self, level: LogLevel, message: &str, category: &str, metadata: Value) {
        match level {
            LogLevel::Debug => tracing::debug!(category = %category, metadata = %metadata, "{message}"),
            LogLevel::Info => tracing::info!(category = %category, metadata = %metadata, "{message}"),
            LogLevel::Warn => tracing::warn!(category = %category, metadata = %metadata, "{message}"),
            LogLevel::Error => tracing::error!(category = %category, metadata = %metadata, "{message}"),
        }
    }
}

/// Log structured data for recovery operations
pub fn log_recovery_operation(
    operation: &str,
    recovery_id: Option<&str>,
    disaster_type: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        recovery_id = recovery_id,
        disaster_type = disaster_type,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🚑 RECOVERY_OPERATION"
    );
}

/// Log structured data for step operations
pub fn log_step_operation(
    operation: &str,
    recovery_id: Option<&str>,
    step_id: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        recovery_id = recovery_id,
        step_id = step_id,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🔧 STEP_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ ERROR"
    );
}
