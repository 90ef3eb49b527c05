//! # Step Handlers
//!
//! Recovery actions are opaque to the orchestrator. Each [`StepType`] maps to one
//! [`StepHandler`] registered at construction time; the orchestrator only knows that a
//! handler either succeeds with some output or fails.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{RecoveryError, Result};
use crate::models::{RecoveryStep, StepType};

/// A pluggable recovery action for one step type
#[async_trait]
pub trait StepHandler: Send + Sync {
    /// Attempt the recovery action for `step`
    async fn execute(&self, step: &RecoveryStep) -> anyhow::Result<Value>;

    /// Compensate a step interrupted by cancellation. Only invoked when the step declares a
    /// `rollback_command`.
    async fn rollback(&self, _step: &RecoveryStep, _command: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn handler_name(&self) -> &str;
}

/// Capability map from step type to handler
#[derive(Clone, Default)]
pub struct StepHandlerRegistry {
    handlers: HashMap<StepType, Arc<dyn StepHandler>>,
}

impl std::fmt::Debug for StepHandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<String> = self.handlers.keys().map(ToString::to_string).collect();
        types.sort();
        f.debug_struct("StepHandlerRegistry")
            .field("handlers", &types)
            .finish()
    }
}

impl StepHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one for the type
    pub fn register(&mut self, step_type: StepType, handler: Arc<dyn StepHandler>) {
        tracing::debug!(
            step_type = %step_type,
            handler = handler.handler_name(),
            "Registered step handler"
        );
        self.handlers.insert(step_type, handler);
    }

    pub fn with_handler(mut self, step_type: StepType, handler: Arc<dyn StepHandler>) -> Self {
        self.register(step_type, handler);
        self
    }

    /// Register the same handler for every step type
    pub fn with_handler_for_all(mut self, handler: Arc<dyn StepHandler>) -> Self {
        for step_type in StepType::ALL {
            self.register(step_type, handler.clone());
        }
        self
    }

    pub fn resolve(&self, step_type: StepType) -> Result<Arc<dyn StepHandler>> {
        self.handlers
            .get(&step_type)
            .cloned()
            .ok_or_else(|| RecoveryError::HandlerNotRegistered {
                step_type: step_type.to_string(),
            })
    }

    pub fn is_registered(&self, step_type: StepType) -> bool {
        self.handlers.contains_key(&step_type)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoHandler;

    #[async_trait]
    impl StepHandler for EchoHandler {
        async fn execute(&self, step: &RecoveryStep) -> anyhow::Result<Value> {
            Ok(json!({ "step": step.id }))
        }

        fn handler_name(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn test_resolve_registered_handler() {
        let registry = StepHandlerRegistry::new().with_handler(StepType::Database, Arc::new(EchoHandler));

        let handler = registry.resolve(StepType::Database).unwrap();
        let output = handler
            .execute(&RecoveryStep::new("restore", StepType::Database, 1))
            .await
            .unwrap();
        assert_eq!(output["step"], "restore");
    }

    #[tokio::test]
    async fn test_default_rollback_is_a_no_op() {
        let step = RecoveryStep::new("restore", StepType::Database, 1).with_rollback("undo");
        EchoHandler.rollback(&step, "undo").await.unwrap();
    }

    #[test]
    fn test_missing_handler() {
        let registry = StepHandlerRegistry::new();
        let err = registry.resolve(StepType::Files).err().unwrap();
        assert!(matches!(err, RecoveryError::HandlerNotRegistered { ref step_type } if step_type == "files"));
    }

    #[test]
    fn test_register_for_all_types() {
        let registry = StepHandlerRegistry::new().with_handler_for_all(Arc::new(EchoHandler));
        assert_eq!(registry.len(), StepType::ALL.len());
        assert!(StepType::ALL.iter().all(|t| registry.is_registered(*t)));
    }
}
