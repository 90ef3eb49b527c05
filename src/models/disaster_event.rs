use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Classification of an incident
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisasterType {
    SystemFailure,
    DataCorruption,
    SecurityBreach,
    NaturalDisaster,
    ManualTrigger,
}

impl fmt::Display for DisasterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SystemFailure => write!(f, "system_failure"),
            Self::DataCorruption => write!(f, "data_corruption"),
            Self::SecurityBreach => write!(f, "security_breach"),
            Self::NaturalDisaster => write!(f, "natural_disaster"),
            Self::ManualTrigger => write!(f, "manual_trigger"),
        }
    }
}

/// Incident severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Default for Severity {
    /// Severity assumed for manual triggers that do not specify one
    fn default() -> Self {
        Self::High
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(format!("Invalid severity: {s}")),
        }
    }
}

/// A detected or declared incident. Created once by the factory and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisasterEvent {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub disaster_type: DisasterType,
    pub severity: Severity,
    pub detected_at: DateTime<Utc>,
    pub description: String,
    pub affected_systems: Vec<String>,
    pub estimated_impact: String,
    pub auto_recovery_triggered: bool,
}
