//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → SentinelConfig (validated, immutable)
//!     → passed by reference into the monitor and lifecycle manager
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; each invocation reads it fresh
//! - Thresholds have no defaults; everything else does
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::SentinelConfig;
pub use schema::{DatabaseTarget, MachineImageTarget, ObjectStorageTarget, TargetConfig};
pub use schema::{RestoreConfig, RuleSeverityConfig, ThresholdConfig, TimeoutConfig};
