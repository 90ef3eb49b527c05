#![allow(clippy::doc_markdown)] // Allow technical terms like RTO, RPO in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Recovery Core
//!
//! Disaster recovery automation engine.
//!
//! ## Overview
//!
//! The engine watches a set of subsystems, decides when repeated health check failures
//! amount to a disaster, and runs a configured runbook of recovery steps in order. It can
//! also be triggered by an operator. Each run is tracked as a
//! [`RecoveryExecution`](models::RecoveryExecution) with per-step status, retries, logs and
//! progress.
//!
//! ## Architecture
//!
//! - **Step handlers** perform the real work (restoring a database, restarting a service).
//!   The engine only sequences them, bounds them with timeouts and retries them.
//! - **Health probes** report per-subsystem health; the [`health::HealthMonitor`] counts
//!   consecutive failures and raises automatic disaster events.
//! - **State machines** guard every execution and step status change, so terminal states
//!   are final.
//!
//! ## Module Organization
//!
//! - [`models`] - Disaster events, recovery steps and executions
//! - [`state_machine`] - Execution and step state management
//! - [`orchestration`] - The orchestrator, step execution and retry policy
//! - [`health`] - Subsystem probes and the periodic health monitor
//! - [`config`] - Configuration loading and validation
//! - [`events`] - Lifecycle event publishing
//! - [`logging`] - Structured logging and the recovery log sink
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use recovery_core::config::ConfigManager;
//! use recovery_core::orchestration::{RecoveryOrchestrator, StepHandler};
//! use std::sync::Arc;
//!
//! # async fn example(handler: Arc<dyn StepHandler>) -> Result<(), Box<dyn std::error::Error>> {
//! recovery_core::logging::init_structured_logging();
//!
//! let manager = ConfigManager::load()?;
//! let orchestrator = RecoveryOrchestrator::builder(manager.config().clone())
//!     .with_handler_for_all(handler)
//!     .build()?;
//!
//! orchestrator.start().await?;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod health;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod state_machine;

pub use clock::{Clock, ImmediateClock, SystemClock};
pub use config::{ConfigManager, ConfigurationError, DisasterRecoveryConfig};
pub use error::{RecoveryError, Result};
pub use events::{EventPublisher, PublishedEvent};
pub use health::{HealthCheckReport, HealthMonitor, HealthProbe, RecoveryTrigger};
pub use logging::{LogSink, TracingLogSink};
pub use models::{
    DisasterEvent, DisasterType, RecoveryExecution, RecoveryLog, RecoveryStep, Severity,
    StepType,
};
pub use orchestration::{
    NotificationGateway, RecoveryOrchestrator, RecoveryOrchestratorBuilder, StepHandler,
    StepHandlerRegistry,
};
pub use state_machine::{ExecutionState, StepState};
