//! Restore-test resource lifecycle.
//!
//! # Data Flow
//! ```text
//! Test trigger:
//!     → launch.rs (latest available restore point, default placement, tags)
//!     → Provisioner::create
//!     → record.rs (Requested → Provisioned → Registered)
//!     → Registry::put
//!
//! Cleanup trigger:
//!     → Registry::scan (Registered | CleanupFailed)
//!     → record.rs (classify: Expired if age ≥ ttl)
//!     → Provisioner::delete per record
//!     → Registry::delete (Cleaned) or Registry::put (CleanupFailed)
//!
//! Snapshot copy trigger:
//!     → Provisioner::snapshots (source region)
//!     → launch.rs (latest available, dr-copy-<timestamp>)
//!     → Provisioner::copy_snapshot (into the restore region)
//! ```
//!
//! # Design Decisions
//! - The manager is the only writer of records; the registry is the only
//!   durable copy
//! - Test resources are found by registry data or tags, never name patterns
//! - Concurrent sweeps are tolerated because deletion is idempotent

pub mod launch;
pub mod manager;
pub mod record;

pub use launch::{LaunchSpec, NetworkPlacement, RestorePoint, SnapshotCopy, TaggedResource};
pub use manager::{LifecycleError, LifecycleManager, ReconcileSummary, SweepSummary};
pub use record::{RecordState, ResourceKind, TestResourceRecord, TtlOutOfRange};
