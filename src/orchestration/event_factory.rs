//! # Disaster Event Factory
//!
//! Builds immutable [`DisasterEvent`]s for manual triggers and for health-monitor
//! escalations, deriving severity and the impact summary.

use std::sync::Arc;
use uuid::Uuid;

use crate::clock::Clock;
use crate::models::{DisasterEvent, DisasterType, Severity};

/// Severity for automatic events, from the number of failing subsystems
pub fn classify_severity(failing_subsystems: usize) -> Severity {
    match failing_subsystems {
        n if n >= 3 => Severity::Critical,
        2 => Severity::High,
        _ => Severity::Medium,
    }
}

/// Human readable impact summary; descriptive only
pub fn estimate_impact(severity: Severity, affected_systems: usize) -> String {
    let scope = match severity {
        Severity::Critical => "full service outage likely",
        Severity::High => "major service degradation",
        Severity::Medium => "partial service degradation",
        Severity::Low => "minor disruption",
    };
    format!("{severity} impact: {scope} across {affected_systems} system(s)")
}

#[derive(Clone)]
pub struct DisasterEventFactory {
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for DisasterEventFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisasterEventFactory").finish_non_exhaustive()
    }
}

impl DisasterEventFactory {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Operator-declared incident; severity defaults to `high`
    pub fn manual(
        &self,
        disaster_type: DisasterType,
        description: impl Into<String>,
        affected_systems: Vec<String>,
        severity: Option<Severity>,
    ) -> DisasterEvent {
        let severity = severity.unwrap_or_default();
        DisasterEvent {
            id: Uuid::new_v4(),
            disaster_type,
            severity,
            detected_at: self.clock.now(),
            description: description.into(),
            estimated_impact: estimate_impact(severity, affected_systems.len()),
            affected_systems,
            auto_recovery_triggered: false,
        }
    }

    /// Incident raised by the health monitor for the currently failing subsystems
    pub fn automatic(&self, failing_subsystems: Vec<String>) -> DisasterEvent {
        let severity = classify_severity(failing_subsystems.len());
        DisasterEvent {
            id: Uuid::new_v4(),
            disaster_type: DisasterType::SystemFailure,
            severity,
            detected_at: self.clock.now(),
            description: format!(
                "Automatic failover: {} subsystem(s) failing health checks: {}",
                failing_subsystems.len(),
                failing_subsystems.join(", ")
            ),
            estimated_impact: estimate_impact(severity, failing_subsystems.len()),
            affected_systems: failing_subsystems,
            auto_recovery_triggered: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;

    fn factory() -> DisasterEventFactory {
        DisasterEventFactory::new(Arc::new(SystemClock))
    }

    #[test]
    fn test_severity_classification() {
        assert_eq!(classify_severity(0), Severity::Medium);
        assert_eq!(classify_severity(1), Severity::Medium);
        assert_eq!(classify_severity(2), Severity::High);
        assert_eq!(classify_severity(3), Severity::Critical);
        assert_eq!(classify_severity(4), Severity::Critical);
    }

    #[test]
    fn test_manual_event_defaults_to_high() {
        let event = factory().manual(
            DisasterType::DataCorruption,
            "orders table corrupted",
            vec!["database".to_string()],
            None,
        );

        assert_eq!(event.severity, Severity::High);
        assert!(!event.auto_recovery_triggered);
        assert_eq!(event.estimated_impact, "high impact: major service degradation across 1 system(s)");
    }

    #[test]
    fn test_manual_event_keeps_explicit_severity() {
        let event = factory().manual(
            DisasterType::ManualTrigger,
            "drill",
            vec![],
            Some(Severity::Low),
        );
        assert_eq!(event.severity, Severity::Low);
    }

    #[test]
    fn test_automatic_event() {
        let event = factory().automatic(vec!["database".to_string(), "api".to_string()]);

        assert_eq!(event.disaster_type, DisasterType::SystemFailure);
        assert_eq!(event.severity, Severity::High);
        assert!(event.auto_recovery_triggered);
        assert_eq!(event.affected_systems, vec!["database", "api"]);
        assert!(event.description.contains("database, api"));
    }
}
