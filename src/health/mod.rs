//! # Health Monitoring
//!
//! Subsystem probes and the periodic monitor that turns repeated failures into automatic
//! disaster events.

pub mod monitor;
pub mod probe;

pub use monitor::{
    HealthCheckReport, HealthMonitor, HealthMonitorConfig, RecoveryTrigger, SubsystemHealth,
};
pub use probe::{HealthProbe, NamedProbe, PassiveProbe, ProbeRegistry};
