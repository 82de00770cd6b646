//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds finite, ttl at most a year, timeouts > 0)
//! - Check target consistency (bucket pair distinct and named)
//! - Check the notification destination and metrics address parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SentinelConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::SentinelConfig;

/// Longest lifetime a restore-test resource may be given.
pub const MAX_TTL_HOURS: u64 = 24 * 365;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &SentinelConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let max_age = config.thresholds.max_age_hours;
    if !max_age.is_finite() || max_age <= 0.0 {
        errors.push(ValidationError::new(
            "thresholds.max_age_hours",
            "must be a positive number",
        ));
    }

    if let Some(db) = &config.targets.database {
        if db.db_instance_id.trim().is_empty() {
            errors.push(ValidationError::new("targets.database.db_instance_id", "must not be empty"));
        }
    }

    if let Some(storage) = &config.targets.object_storage {
        if storage.primary_bucket.trim().is_empty() {
            errors.push(ValidationError::new("targets.object_storage.primary_bucket", "must not be empty"));
        }
        if storage.secondary_bucket.trim().is_empty() {
            errors.push(ValidationError::new("targets.object_storage.secondary_bucket", "must not be empty"));
        }
        if storage.primary_bucket == storage.secondary_bucket {
            errors.push(ValidationError::new(
                "targets.object_storage",
                "primary and secondary buckets must differ",
            ));
        }
    }

    if let Some(image) = &config.targets.machine_image {
        if image.instance_id.trim().is_empty() {
            errors.push(ValidationError::new("targets.machine_image.instance_id", "must not be empty"));
        }
    }

    let destination = config.notifications.destination.as_str();
    if destination != "log" {
        match url::Url::parse(destination) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => errors.push(ValidationError::new(
                "notifications.destination",
                format!("unsupported scheme '{}'", url.scheme()),
            )),
            Err(e) => errors.push(ValidationError::new(
                "notifications.destination",
                format!("expected \"log\" or a webhook URL: {}", e),
            )),
        }
    }

    let ttl_hours = config.restore.ttl_hours;
    if ttl_hours == 0 {
        errors.push(ValidationError::new("restore.ttl_hours", "must be greater than zero"));
    } else if ttl_hours > MAX_TTL_HOURS {
        errors.push(ValidationError::new(
            "restore.ttl_hours",
            format!("must be at most {} (one year)", MAX_TTL_HOURS),
        ));
    }
    if config.restore.region.trim().is_empty() {
        errors.push(ValidationError::new("restore.region", "must not be empty"));
    }
    if config.restore.source_region.trim().is_empty() {
        errors.push(ValidationError::new("restore.source_region", "must not be empty"));
    } else if config.restore.source_region == config.restore.region {
        errors.push(ValidationError::new(
            "restore.source_region",
            "must differ from restore.region",
        ));
    }

    let timeouts = [
        ("timeouts.probe_secs", config.timeouts.probe_secs),
        ("timeouts.provision_secs", config.timeouts.provision_secs),
        ("timeouts.cleanup_secs", config.timeouts.cleanup_secs),
        ("timeouts.notify_secs", config.timeouts.notify_secs),
    ];
    for (field, secs) in timeouts {
        if secs == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "must be a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
