//! Notifier that POSTs messages to an HTTP endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::collaborators::{Notifier, NotifyError};
use crate::health::HealthStatus;

/// JSON body sent to the webhook.
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    severity: HealthStatus,
    subject: &'a str,
    body: &'a str,
}

/// Delivers notifications as JSON to a webhook URL.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: url::Url,
}

impl WebhookNotifier {
    pub fn new(url: url::Url, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, status: HealthStatus, subject: &str, body: &str) -> Result<(), NotifyError> {
        let payload = WebhookPayload {
            severity: status,
            subject,
            body,
        };

        let response = self
            .client
            .post(self.url.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let code = response.status();
        if !code.is_success() {
            return Err(NotifyError::Rejected(code.as_u16()));
        }

        tracing::debug!(subject = %subject, url = %self.url, "Notification delivered");
        Ok(())
    }
}
