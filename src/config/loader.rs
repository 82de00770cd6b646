//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::SentinelConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[source] std::io::Error),

    #[error("cannot parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<SentinelConfig, ConfigError> {
    let config: SentinelConfig = toml::from_str(content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<SentinelConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[thresholds]\nmax_age_hours = 48\ncount_threshold = 10").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.thresholds.count_threshold, 10);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/dr-sentinel.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_oversized_ttl_is_rejected() {
        let err = parse_config("[thresholds]\nmax_age_hours = 48\ncount_threshold = 10\n[restore]\nttl_hours = 3000000000000\n")
            .unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert_eq!(errors[0].field, "restore.ttl_hours"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_validation_errors_are_joined() {
        let err = parse_config("[thresholds]\nmax_age_hours = -1\ncount_threshold = 0\n[restore]\nttl_hours = 0\n")
            .unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Validation failed: "));
        assert!(message.contains("thresholds.max_age_hours"));
        assert!(message.contains(", restore.ttl_hours"));
    }
}
