//! # Health Probes
//!
//! A probe answers one question: is this subsystem healthy right now? Real connectivity
//! checks are supplied by the embedding application; [`PassiveProbe`] stands in for
//! subsystems without one.

use async_trait::async_trait;
use std::sync::Arc;

use crate::constants::subsystems;

#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// `Ok(false)` and `Err(_)` both count as unhealthy
    async fn check(&self) -> anyhow::Result<bool>;
}

/// Probe that always reports healthy
#[derive(Debug, Default, Clone, Copy)]
pub struct PassiveProbe;

#[async_trait]
impl HealthProbe for PassiveProbe {
    async fn check(&self) -> anyhow::Result<bool> {
        Ok(true)
    }
}

/// A probe bound to the subsystem it checks
#[derive(Clone)]
pub struct NamedProbe {
    pub subsystem: String,
    pub probe: Arc<dyn HealthProbe>,
}

impl std::fmt::Debug for NamedProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedProbe")
            .field("subsystem", &self.subsystem)
            .finish_non_exhaustive()
    }
}

/// Ordered set of probes, one per subsystem name
#[derive(Debug, Clone, Default)]
pub struct ProbeRegistry {
    probes: Vec<NamedProbe>,
}

impl ProbeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `database`, `api`, `storage` and `network`, each with a [`PassiveProbe`]
    pub fn with_default_subsystems() -> Self {
        let mut registry = Self::new();
        for subsystem in subsystems::DEFAULT {
            registry.register(subsystem, Arc::new(PassiveProbe));
        }
        registry
    }

    /// Register a probe, replacing any existing probe for the same subsystem
    pub fn register(&mut self, subsystem: impl Into<String>, probe: Arc<dyn HealthProbe>) {
        let subsystem = subsystem.into();
        match self.probes.iter_mut().find(|p| p.subsystem == subsystem) {
            Some(existing) => existing.probe = probe,
            None => self.probes.push(NamedProbe { subsystem, probe }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedProbe> {
        self.probes.iter()
    }

    pub fn subsystems(&self) -> Vec<&str> {
        self.probes.iter().map(|p| p.subsystem.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }
}
