//! Notifier that writes messages to the structured log.

use async_trait::async_trait;

use crate::collaborators::{Notifier, NotifyError};
use crate::health::HealthStatus;

/// Emits each notification as a tracing event at a level matching its status.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, status: HealthStatus, subject: &str, body: &str) -> Result<(), NotifyError> {
        match status {
            HealthStatus::Healthy => tracing::info!(subject = %subject, "{}", body),
            HealthStatus::Warning => tracing::warn!(subject = %subject, "{}", body),
            HealthStatus::Critical => tracing::error!(subject = %subject, "{}", body),
        }
        Ok(())
    }
}
