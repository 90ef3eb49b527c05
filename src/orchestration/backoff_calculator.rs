//! # Backoff Calculator
//!
//! Retry delays for failed recovery steps. The delay grows with the retry count:
//! `base_delay * retry_count`, capped at `max_delay`.

use std::time::Duration;

use crate::config::DisasterRecoveryConfig;
use crate::constants::system;

/// Configuration for backoff calculation behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffCalculatorConfig {
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffCalculatorConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(system::RETRY_BACKOFF_BASE_MS),
            max_delay: Duration::from_millis(system::MAX_RETRY_BACKOFF_MS),
        }
    }
}

impl From<&DisasterRecoveryConfig> for BackoffCalculatorConfig {
    fn from(config: &DisasterRecoveryConfig) -> Self {
        Self {
            base_delay: Duration::from_millis(config.retry_backoff_base_ms),
            max_delay: Duration::from_millis(config.max_retry_backoff_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BackoffCalculator {
    config: BackoffCalculatorConfig,
}

impl BackoffCalculator {
    pub fn new(config: BackoffCalculatorConfig) -> Self {
        Self { config }
    }

    /// Delay before the retry numbered `retry_count` (1-based)
    pub fn delay_for_retry(&self, retry_count: u32) -> Duration {
        self.config
            .base_delay
            .saturating_mul(retry_count)
            .min(self.config.max_delay)
    }
}
