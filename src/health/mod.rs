//! Backup health aggregation.
//!
//! # Data Flow
//! ```text
//! Probe (per subsystem)
//!     → facts.rs (fact set, or a probe error)
//!     → evaluator.rs (rules → SubsystemResult)
//!     → aggregator.rs (severity lattice → HealthReport)
//!     → render.rs (alert / summary messages)
//! ```
//!
//! # Design Decisions
//! - Evaluation and aggregation are pure; all I/O lives in the monitor
//! - One subsystem's probe failure becomes data, never an abort
//! - Verdicts combine under `Healthy < Warning < Critical`

pub mod aggregator;
pub mod evaluator;
pub mod facts;
pub mod render;
pub mod severity;

pub use aggregator::{aggregate, AggregationFault, Dispatch, HealthReport};
pub use evaluator::{evaluate, Issue, SubsystemResult};
pub use facts::{Artifact, Facts, ImageFacts, ReplicationFacts, SnapshotFacts, SubsystemId};
pub use severity::{HealthStatus, Severity};
