//! Offline provider.
//!
//! # Responsibilities
//! - Answer probe queries from a JSON inventory of both regions
//! - Serve restore points, placement, creation and deletion for restore tests
//! - Copy database snapshots between regions
//!
//! # Design Decisions
//! - The whole document is held in memory and rewritten on every change
//! - The primary and secondary region names live in the document itself

pub mod document;
pub mod provider;

pub use document::InventoryDocument;
pub use provider::{InventoryError, InventoryFile};
