//! Notification delivery.
//!
//! # Data Flow
//! ```text
//! notifications.destination
//!     "log"        → log.rs (tracing event)
//!     http(s) URL  → webhook.rs (JSON POST)
//! ```
//!
//! # Design Decisions
//! - Delivery is best-effort; callers log failures and carry on

pub mod log;
pub mod webhook;

use std::sync::Arc;
use std::time::Duration;

use crate::collaborators::{Notifier, NotifyError};

pub use self::log::LogNotifier;
pub use self::webhook::WebhookNotifier;

/// Build the notifier for a configured destination.
pub fn from_destination(destination: &str, timeout: Duration) -> Result<Arc<dyn Notifier>, NotifyError> {
    if destination == "log" {
        return Ok(Arc::new(LogNotifier));
    }
    let url = url::Url::parse(destination).map_err(|e| NotifyError::Transport(e.to_string()))?;
    Ok(Arc::new(WebhookNotifier::new(url, timeout)?))
}
