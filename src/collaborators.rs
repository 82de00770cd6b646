//! Capability interfaces the core calls out to.
//!
//! # Data Flow
//! ```text
//! monitor.rs ──▶ Probe ──▶ Facts | ProbeError
//!            ──▶ Notifier / MetricsEmitter
//!
//! restore/manager.rs ──▶ Provisioner (restore points, placement, create, delete, copy)
//!                    ──▶ Registry (put, scan, delete)
//! ```
//!
//! # Design Decisions
//! - Collaborators are passed in explicitly; no process-wide clients
//! - Every failure is a typed value; callers branch on the variant
//! - Deletion distinguishes "not found" from "failed" so cleanup is idempotent

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::{DatabaseTarget, MachineImageTarget, ObjectStorageTarget};
use crate::health::{Facts, HealthStatus, SubsystemId};
use crate::restore::launch::{LaunchSpec, NetworkPlacement, RestorePoint, SnapshotCopy, TaggedResource};
use crate::restore::record::{ResourceKind, TestResourceRecord};

/// A subsystem's facts could not be obtained.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("target not found: {0}")]
    NotFound(String),

    #[error("probe timed out after {0} seconds")]
    Timeout(u64),
}

/// Resource creation failed during provisioning.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProvisionError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("network placement unavailable: {0}")]
    Placement(String),

    #[error("create failed: {0}")]
    Create(String),

    #[error("provisioning call timed out after {0} seconds")]
    Timeout(u64),
}

/// Deletion failed for one test resource.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CleanupError {
    #[error("delete failed: {0}")]
    Delete(String),

    #[error("delete timed out after {0} seconds")]
    Timeout(u64),

    #[error("registry update failed: {0}")]
    Registry(String),
}

/// Registry read or write failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("registry I/O failed: {0}")]
    Io(String),

    #[error("registry serialization failed: {0}")]
    Serialization(String),

    #[error("registry unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        RegistryError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::Serialization(err.to_string())
    }
}

/// Notification delivery failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification transport failed: {0}")]
    Transport(String),

    #[error("notification rejected with status {0}")]
    Rejected(u16),

    #[error("notification timed out after {0} seconds")]
    Timeout(u64),
}

/// What a probe is pointed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetDescriptor {
    Database(DatabaseTarget),
    ObjectStorage(ObjectStorageTarget),
    MachineImage(MachineImageTarget),
}

impl TargetDescriptor {
    pub fn subsystem(&self) -> SubsystemId {
        match self {
            TargetDescriptor::Database(_) => SubsystemId::Database,
            TargetDescriptor::ObjectStorage(_) => SubsystemId::ObjectStorage,
            TargetDescriptor::MachineImage(_) => SubsystemId::MachineImage,
        }
    }
}

/// Queries one backup subsystem.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn fetch(&self, subsystem: SubsystemId, target: &TargetDescriptor) -> Result<Facts, ProbeError>;
}

/// Best-effort message delivery.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, status: HealthStatus, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Unit attached to an emitted metric point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricUnit {
    Count,
    Hours,
    Percent,
}

impl MetricUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricUnit::Count => "count",
            MetricUnit::Hours => "hours",
            MetricUnit::Percent => "percent",
        }
    }
}

/// Metric sink. Emission never fails from the caller's point of view.
pub trait MetricsEmitter: Send + Sync {
    fn emit(&self, name: &str, value: f64, unit: MetricUnit, timestamp: DateTime<Utc>);
}

/// Predicate used to filter registry scans.
pub type RecordFilter<'a> = &'a (dyn Fn(&TestResourceRecord) -> bool + Send + Sync);

/// Durable key/value store of test resource records, keyed by `test_id`.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Insert or overwrite a record.
    async fn put(&self, record: &TestResourceRecord) -> Result<(), RegistryError>;

    /// All records matching `filter`, ordered by creation time.
    async fn scan(&self, filter: RecordFilter<'_>) -> Result<Vec<TestResourceRecord>, RegistryError>;

    /// Remove a record. No-op if absent.
    async fn delete(&self, test_id: &str) -> Result<(), RegistryError>;
}

/// Result of a delete call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Launch, restore and delete calls against the provider.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Candidate restore points (snapshots or images) in a region.
    async fn restore_points(&self, kind: ResourceKind, region: &str) -> Result<Vec<RestorePoint>, ProvisionError>;

    /// Default network, subnet and security group for a region.
    async fn placement(&self, region: &str) -> Result<NetworkPlacement, ProvisionError>;

    /// Create the resource, tagged per `spec.tags`, and return its id.
    async fn create(&self, kind: ResourceKind, spec: &LaunchSpec) -> Result<String, ProvisionError>;

    /// Delete a resource. A resource that no longer exists is `NotFound`, not an error.
    async fn delete(&self, kind: ResourceKind, region: &str, resource_id: &str) -> Result<DeleteOutcome, CleanupError>;

    /// Live resources carrying the restore-test tag.
    async fn tagged_resources(&self, region: &str) -> Result<Vec<TaggedResource>, ProvisionError>;

    /// Snapshots taken of one database instance in a region.
    async fn snapshots(&self, region: &str, db_instance_id: &str) -> Result<Vec<RestorePoint>, ProvisionError>;

    /// Start copying a snapshot across regions, keeping its tags.
    async fn copy_snapshot(&self, copy: &SnapshotCopy) -> Result<(), ProvisionError>;
}
