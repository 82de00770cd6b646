//! Combining subsystem results into one report.
//!
//! # Responsibilities
//! - Fold subsystem statuses under the severity lattice
//! - Concatenate issues in subsystem invocation order
//! - Decide which notifications fire
//!
//! # Design Decisions
//! - Omitted subsystems contribute nothing and cannot raise the verdict
//! - Malformed input (duplicates, status/issue disagreement) is a fault,
//!   not something to paper over

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::health::evaluator::{Issue, SubsystemResult};
use crate::health::facts::SubsystemId;
use crate::health::severity::HealthStatus;

/// Unexpected input while combining results.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AggregationFault {
    #[error("subsystem {0} reported more than once")]
    DuplicateSubsystem(SubsystemId),

    #[error("subsystem {subsystem} reports status {reported} but its issues imply {derived}")]
    InconsistentStatus {
        subsystem: SubsystemId,
        reported: HealthStatus,
        derived: HealthStatus,
    },

    #[error("issue for {found} filed under subsystem {subsystem}")]
    MisfiledIssue {
        subsystem: SubsystemId,
        found: SubsystemId,
    },
}

/// The single verdict for one invocation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HealthReport {
    pub timestamp: DateTime<Utc>,
    pub overall_status: HealthStatus,
    /// Results in invocation order; at most one per subsystem.
    pub subsystem_results: Vec<SubsystemResult>,
    pub all_issues: Vec<Issue>,
}

impl HealthReport {
    /// Result for a subsystem, if it was included.
    pub fn result(&self, subsystem: SubsystemId) -> Option<&SubsystemResult> {
        self.subsystem_results.iter().find(|r| r.subsystem == subsystem)
    }

    /// An alert fires whenever any issue is present, whatever the verdict.
    pub fn should_alert(&self) -> bool {
        !self.all_issues.is_empty()
    }
}

/// Notifications to send for a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    pub alert: bool,
    pub summary: bool,
}

impl Dispatch {
    /// Alerting and summary are independent decisions.
    pub fn plan(report: &HealthReport, send_summary: bool) -> Self {
        Self {
            alert: report.should_alert(),
            summary: send_summary,
        }
    }
}

/// Combine subsystem results into a `HealthReport`.
pub fn aggregate(
    results: Vec<SubsystemResult>,
    timestamp: DateTime<Utc>,
) -> Result<HealthReport, AggregationFault> {
    let mut seen = Vec::with_capacity(results.len());
    let mut all_issues = Vec::new();

    for result in &results {
        if seen.contains(&result.subsystem) {
            return Err(AggregationFault::DuplicateSubsystem(result.subsystem));
        }
        seen.push(result.subsystem);

        if let Some(issue) = result.issues.iter().find(|i| i.subsystem != result.subsystem) {
            return Err(AggregationFault::MisfiledIssue {
                subsystem: result.subsystem,
                found: issue.subsystem,
            });
        }

        let derived = HealthStatus::from_severities(result.issues.iter().map(|i| i.severity));
        if derived != result.status {
            return Err(AggregationFault::InconsistentStatus {
                subsystem: result.subsystem,
                reported: result.status,
                derived,
            });
        }

        all_issues.extend(result.issues.iter().cloned());
    }

    let overall_status = HealthStatus::combine(results.iter().map(|r| r.status));

    Ok(HealthReport {
        timestamp,
        overall_status,
        subsystem_results: results,
        all_issues,
    })
}
