//! Fact sets produced by probes.
//!
//! Facts are a fresh, immutable snapshot of measured reality for one backup
//! subsystem. They are never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Backup subsystems watched by the monitor, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubsystemId {
    Database,
    ObjectStorage,
    MachineImage,
}

impl SubsystemId {
    pub const ALL: [SubsystemId; 3] = [
        SubsystemId::Database,
        SubsystemId::ObjectStorage,
        SubsystemId::MachineImage,
    ];

    /// Stable key used in metric names and JSON output.
    pub fn key(self) -> &'static str {
        match self {
            SubsystemId::Database => "database",
            SubsystemId::ObjectStorage => "object_storage",
            SubsystemId::MachineImage => "machine_image",
        }
    }

    /// Name of the backed-up artifact in human-readable messages.
    pub fn artifact_noun(self) -> &'static str {
        match self {
            SubsystemId::Database => "database snapshot",
            SubsystemId::ObjectStorage => "replicated object",
            SubsystemId::MachineImage => "machine image",
        }
    }
}

impl std::fmt::Display for SubsystemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubsystemId::Database => f.write_str("database"),
            SubsystemId::ObjectStorage => f.write_str("object storage"),
            SubsystemId::MachineImage => f.write_str("machine image"),
        }
    }
}

/// A point-in-time backup (snapshot or image).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Artifact {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            created_at,
        }
    }
}

/// Latest artifact by creation time, if any.
pub fn latest(artifacts: &[Artifact]) -> Option<&Artifact> {
    artifacts.iter().max_by_key(|a| a.created_at)
}

/// Database snapshot facts across the region pair.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SnapshotFacts {
    /// Automated backup retention is switched on for the source instance.
    pub backup_retention_enabled: bool,
    pub primary: Vec<Artifact>,
    pub secondary: Vec<Artifact>,
}

/// Object-storage replication facts.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReplicationFacts {
    pub replication_configured: bool,
    pub versioning_enabled: bool,
    pub primary_count: u64,
    pub secondary_count: u64,
}

/// Machine-image facts across the region pair.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ImageFacts {
    /// At least one image lifecycle policy is enabled.
    pub lifecycle_policy_enabled: bool,
    pub primary: Vec<Artifact>,
    pub secondary: Vec<Artifact>,
}

/// Facts for any subsystem.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Facts {
    Snapshots(SnapshotFacts),
    Replication(ReplicationFacts),
    Images(ImageFacts),
}

impl Facts {
    /// The subsystem this fact set describes.
    pub fn subsystem(&self) -> SubsystemId {
        match self {
            Facts::Snapshots(_) => SubsystemId::Database,
            Facts::Replication(_) => SubsystemId::ObjectStorage,
            Facts::Images(_) => SubsystemId::MachineImage,
        }
    }
}
