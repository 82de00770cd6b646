//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the sentinel.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::health::Severity;

/// Root configuration for one sentinel deployment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SentinelConfig {
    /// Backup targets per subsystem. Absent targets are not checked.
    #[serde(default)]
    pub targets: TargetConfig,

    /// Rule thresholds. Required: there are no built-in defaults.
    pub thresholds: ThresholdConfig,

    /// Notification destination and mode flags.
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Restore-test provisioning settings.
    #[serde(default)]
    pub restore: RestoreConfig,

    /// Durable registry of test resources.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Offline provider document.
    #[serde(default)]
    pub inventory: InventoryConfig,

    /// Deadlines at the collaborator boundary.
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl SentinelConfig {
    /// Minimal config with the given thresholds and everything else defaulted.
    pub fn with_thresholds(thresholds: ThresholdConfig) -> Self {
        Self {
            targets: TargetConfig::default(),
            thresholds,
            notifications: NotificationConfig::default(),
            restore: RestoreConfig::default(),
            registry: RegistryConfig::default(),
            inventory: InventoryConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Per-subsystem targets.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TargetConfig {
    pub database: Option<DatabaseTarget>,
    pub object_storage: Option<ObjectStorageTarget>,
    pub machine_image: Option<MachineImageTarget>,
}

/// Database whose snapshots are watched.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DatabaseTarget {
    pub db_instance_id: String,
}

/// Replicated bucket pair.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ObjectStorageTarget {
    pub primary_bucket: String,
    pub secondary_bucket: String,
}

/// Instance whose machine images are watched.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MachineImageTarget {
    pub instance_id: String,
}

/// Rule thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThresholdConfig {
    /// Latest primary backup older than this (strictly) raises a warning.
    pub max_age_hours: f64,

    /// Primary/secondary object count difference tolerated (raw count).
    pub count_threshold: u64,

    /// Severity per capability rule.
    #[serde(default)]
    pub severity: RuleSeverityConfig,
}

/// Severity emitted by each capability rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RuleSeverityConfig {
    pub backup_retention_disabled: Severity,
    pub replication_absent: Severity,
    pub lifecycle_policy_disabled: Severity,
    pub versioning_disabled: Severity,
    pub secondary_missing: Severity,
}

impl Default for RuleSeverityConfig {
    fn default() -> Self {
        Self {
            backup_retention_disabled: Severity::Critical,
            replication_absent: Severity::Critical,
            lifecycle_policy_disabled: Severity::Warning,
            versioning_disabled: Severity::Warning,
            secondary_missing: Severity::Warning,
        }
    }
}

/// Notification settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// "log" or an http(s) webhook URL.
    pub destination: String,

    /// Send the full report even when healthy.
    pub send_summary: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            destination: "log".to_string(),
            send_summary: false,
        }
    }
}

/// Restore-test settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RestoreConfig {
    /// Region where test resources are launched and snapshots are copied to.
    pub region: String,

    /// Region holding the primary database snapshots.
    pub source_region: String,

    /// Age after which a test resource is reclaimed.
    pub ttl_hours: u64,

    /// Instance class for restored test databases.
    pub database_instance_class: String,

    /// Instance type for launched test compute instances.
    pub compute_instance_type: String,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            region: "us-west-2".to_string(),
            source_region: "us-east-1".to_string(),
            ttl_hours: 24,
            database_instance_class: "db.t3.micro".to_string(),
            compute_instance_type: "t2.micro".to_string(),
        }
    }
}

/// Registry persistence.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// JSON file; `None` keeps records in memory only.
    pub path: Option<String>,
}

/// Offline provider document.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct InventoryConfig {
    pub path: Option<String>,
}

/// Timeout configuration for collaborator calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Fact acquisition per subsystem, in seconds.
    pub probe_secs: u64,

    /// Restore-point lookup, placement and creation, in seconds.
    pub provision_secs: u64,

    /// Deletion of one test resource, in seconds.
    pub cleanup_secs: u64,

    /// Notification delivery, in seconds.
    pub notify_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            probe_secs: 30,
            provision_secs: 60,
            cleanup_secs: 30,
            notify_secs: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
