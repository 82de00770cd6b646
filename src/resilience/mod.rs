//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a collaborator (probe, provisioner, notifier):
//!     → timeouts.rs (enforce deadline)
//!     → On expiry: typed timeout error, handled like any other failure
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No retries: a failed record is retried by the next sweep instead

pub mod timeouts;
