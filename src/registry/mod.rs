//! Test resource registry implementations.
//!
//! # Design Decisions
//! - `FileRegistry` is a concurrent map; the JSON file is the durable copy
//! - A failed write is rolled back in memory so callers see one truth

pub mod file;

pub use file::FileRegistry;
