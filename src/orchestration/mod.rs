//! # Orchestration Engine
//!
//! Drives recovery executions from trigger to completion.
//!
//! ## Core Components
//!
//! - **RecoveryOrchestrator**: Owns executions, runs the step loop, handles cancellation
//! - **StepExecutor**: Dispatches one step attempt to its handler under the step timeout
//! - **StepHandlerRegistry**: Maps step types to the handlers that perform them
//! - **BackoffCalculator**: Linear retry delays, capped
//! - **DisasterEventFactory**: Builds manual and monitor-raised disaster events
//! - **NotificationGateway**: Best-effort disaster and completion notices

pub mod backoff_calculator;
pub mod event_factory;
pub mod notification;
pub mod orchestrator;
pub mod step_executor;
pub mod step_handler;

pub use backoff_calculator::{BackoffCalculator, BackoffCalculatorConfig};
pub use event_factory::{classify_severity, estimate_impact, DisasterEventFactory};
pub use notification::{LoggingNotificationGateway, NotificationGateway};
pub use orchestrator::{RecoveryOrchestrator, RecoveryOrchestratorBuilder};
pub use step_executor::StepExecutor;
pub use step_handler::{StepHandler, StepHandlerRegistry};
