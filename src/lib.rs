//! Disaster-recovery backup sentinel.
//!
//! Two workflows share this crate:
//! - health: probe each backup subsystem, evaluate its facts, aggregate one
//!   verdict and notify
//! - restore: launch ephemeral restore-test resources, track them in a
//!   registry and reclaim them once their ttl passes

// Core workflows
pub mod health;
pub mod monitor;
pub mod restore;

// Collaborator seams and their implementations
pub mod collaborators;
pub mod inventory;
pub mod notify;
pub mod registry;

// Cross-cutting concerns
pub mod config;
pub mod observability;
pub mod resilience;

pub use config::schema::SentinelConfig;
pub use monitor::{BackupMonitor, InvocationOutcome, InvocationStatus};
pub use restore::LifecycleManager;
