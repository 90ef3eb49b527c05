//! # Notification Gateway
//!
//! Delivery of disaster and completion notices is external to the engine. The orchestrator
//! calls the gateway best-effort: errors are logged on the execution and never abort a
//! recovery.

use async_trait::async_trait;
use tracing::info;

use crate::config::{NotificationChannel, NotificationConfig};
use crate::models::{DisasterEvent, RecoveryExecution};

#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send_disaster_notification(
        &self,
        event: &DisasterEvent,
        execution: &RecoveryExecution,
    ) -> anyhow::Result<()>;

    async fn send_recovery_completion(&self, execution: &RecoveryExecution) -> anyhow::Result<()>;
}

/// Gateway that records each notice per configured channel in the structured log
#[derive(Debug, Clone, Default)]
pub struct LoggingNotificationGateway {
    config: NotificationConfig,
}

impl LoggingNotificationGateway {
    pub fn new(config: NotificationConfig) -> Self {
        Self { config }
    }

    fn target(&self, channel: NotificationChannel) -> String {
        match channel {
            NotificationChannel::Email | NotificationChannel::Sms => {
                format!("{} recipient(s)", self.config.recipients.len())
            }
            NotificationChannel::Webhook => {
                if self.config.webhook_url.is_some() {
                    "configured webhook".to_string()
                } else {
                    "no webhook configured".to_string()
                }
            }
            NotificationChannel::Slack => self
                .config
                .slack_channel
                .clone()
                .unwrap_or_else(|| "no slack channel configured".to_string()),
        }
    }
}

#[async_trait]
impl NotificationGateway for LoggingNotificationGateway {
    async fn send_disaster_notification(
        &self,
        event: &DisasterEvent,
        execution: &RecoveryExecution,
    ) -> anyhow::Result<()> {
        for channel in &self.config.channels {
            info!(
                channel = %channel,
                target = %self.target(*channel),
                recovery_id = %execution.id,
                disaster_type = %event.disaster_type,
                severity = %event.severity,
                affected_systems = ?event.affected_systems,
                "📣 NOTIFICATION: Disaster detected"
            );
        }
        Ok(())
    }

    async fn send_recovery_completion(&self, execution: &RecoveryExecution) -> anyhow::Result<()> {
        for channel in &self.config.channels {
            info!(
                channel = %channel,
                target = %self.target(*channel),
                recovery_id = %execution.id,
                status = %execution.status,
                progress = execution.progress,
                failed_steps = execution.metrics.failed_steps,
                "📣 NOTIFICATION: Recovery finished"
            );
        }
        Ok(())
    }
}
