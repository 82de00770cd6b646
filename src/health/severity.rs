//! Severity lattice.
//!
//! # States
//! ```text
//! Healthy < Warning < Critical
//! ```
//!
//! # Design Decisions
//! - Combination is a plain `max` over the total order
//! - Issues carry only Warning/Critical; Healthy is the absence of issues

use serde::{Deserialize, Serialize};

/// Severity attached to a single issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

/// Health verdict for a subsystem or a whole report.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    #[default]
    Healthy,
    Warning,
    Critical,
}

impl HealthStatus {
    /// Fold a sequence of statuses under the lattice. Empty input is `Healthy`.
    pub fn combine<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = HealthStatus>,
    {
        statuses.into_iter().max().unwrap_or_default()
    }

    /// Status implied by a set of issue severities.
    pub fn from_severities<I>(severities: I) -> Self
    where
        I: IntoIterator<Item = Severity>,
    {
        Self::combine(severities.into_iter().map(HealthStatus::from))
    }

    /// Health score exported as a percentage gauge.
    pub fn score(self) -> f64 {
        match self {
            HealthStatus::Healthy => 100.0,
            HealthStatus::Warning => 50.0,
            HealthStatus::Critical => 0.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Warning => "warning",
            HealthStatus::Critical => "critical",
        }
    }
}

impl From<Severity> for HealthStatus {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Warning => HealthStatus::Warning,
            Severity::Critical => HealthStatus::Critical,
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Critical => f.write_str("critical"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lattice_order() {
        assert!(HealthStatus::Healthy < HealthStatus::Warning);
        assert!(HealthStatus::Warning < HealthStatus::Critical);
    }

    #[test]
    fn test_combine() {
        assert_eq!(HealthStatus::combine([]), HealthStatus::Healthy);
        assert_eq!(
            HealthStatus::combine([HealthStatus::Warning, HealthStatus::Healthy]),
            HealthStatus::Warning
        );
        assert_eq!(
            HealthStatus::from_severities([Severity::Warning, Severity::Critical]),
            HealthStatus::Critical
        );
    }

    #[test]
    fn test_score() {
        assert_eq!(HealthStatus::Healthy.score(), 100.0);
        assert_eq!(HealthStatus::Warning.score(), 50.0);
        assert_eq!(HealthStatus::Critical.score(), 0.0);
    }
}
