//! Per-subsystem rule evaluation.
//!
//! # Responsibilities
//! - Turn one fact set into a `SubsystemResult`
//! - Convert probe failures into a single critical issue
//!
//! # Design Decisions
//! - Pure and deterministic: `now` is passed in, no I/O
//! - An empty primary collection short-circuits freshness and parity checks
//! - Threshold comparisons are strict: equality is not a violation

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collaborators::ProbeError;
use crate::config::ThresholdConfig;
use crate::health::facts::{self, Artifact, Facts, ImageFacts, ReplicationFacts, SnapshotFacts, SubsystemId};
use crate::health::severity::{HealthStatus, Severity};

/// A single finding.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Issue {
    pub subsystem: SubsystemId,
    pub severity: Severity,
    pub message: String,
}

impl Issue {
    pub fn new(subsystem: SubsystemId, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            subsystem,
            severity,
            message: message.into(),
        }
    }
}

/// Outcome of evaluating one subsystem.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SubsystemResult {
    pub subsystem: SubsystemId,
    pub status: HealthStatus,
    pub issues: Vec<Issue>,
    pub measurements: BTreeMap<String, f64>,
}

impl SubsystemResult {
    /// Build a result whose status is derived from its issues.
    pub fn from_issues(
        subsystem: SubsystemId,
        issues: Vec<Issue>,
        measurements: BTreeMap<String, f64>,
    ) -> Self {
        let status = HealthStatus::from_severities(issues.iter().map(|i| i.severity));
        Self {
            subsystem,
            status,
            issues,
            measurements,
        }
    }

    pub fn measurement(&self, name: &str) -> Option<f64> {
        self.measurements.get(name).copied()
    }
}

/// Evaluate one subsystem.
///
/// `facts` is `Err` when the probe could not produce a fact set; that is
/// recorded as a critical issue instead of being propagated.
pub fn evaluate(
    subsystem: SubsystemId,
    facts: Result<&Facts, &ProbeError>,
    thresholds: &ThresholdConfig,
    now: DateTime<Utc>,
) -> SubsystemResult {
    let facts = match facts {
        Ok(facts) => facts,
        Err(e) => return unavailable(subsystem, &e.to_string()),
    };

    if facts.subsystem() != subsystem {
        return unavailable(
            subsystem,
            &format!("probe returned {} facts", facts.subsystem()),
        );
    }

    let mut eval = Evaluation::new(subsystem, thresholds, now);
    match facts {
        Facts::Snapshots(f) => eval.snapshots(f),
        Facts::Replication(f) => eval.replication(f),
        Facts::Images(f) => eval.images(f),
    }
    eval.finish()
}

fn unavailable(subsystem: SubsystemId, cause: &str) -> SubsystemResult {
    SubsystemResult::from_issues(
        subsystem,
        vec![Issue::new(
            subsystem,
            Severity::Critical,
            format!("error checking {}: {}", subsystem, cause),
        )],
        BTreeMap::new(),
    )
}

struct Evaluation<'a> {
    subsystem: SubsystemId,
    thresholds: &'a ThresholdConfig,
    now: DateTime<Utc>,
    issues: Vec<Issue>,
    measurements: BTreeMap<String, f64>,
}

impl<'a> Evaluation<'a> {
    fn new(subsystem: SubsystemId, thresholds: &'a ThresholdConfig, now: DateTime<Utc>) -> Self {
        Self {
            subsystem,
            thresholds,
            now,
            issues: Vec::new(),
            measurements: BTreeMap::new(),
        }
    }

    fn push(&mut self, severity: Severity, message: String) {
        self.issues.push(Issue::new(self.subsystem, severity, message));
    }

    fn measure(&mut self, name: &str, value: f64) {
        self.measurements.insert(name.to_string(), value);
    }

    fn flag(&mut self, name: &str, enabled: bool) {
        self.measure(name, if enabled { 1.0 } else { 0.0 });
    }

    fn snapshots(&mut self, f: &SnapshotFacts) {
        let severity = self.thresholds.severity.backup_retention_disabled;
        self.flag("backup_enabled", f.backup_retention_enabled);
        if !f.backup_retention_enabled {
            self.push(severity, "automated backups are disabled".into());
        }
        self.measure("primary_snapshots", f.primary.len() as f64);
        self.measure("secondary_snapshots", f.secondary.len() as f64);
        self.existence_and_freshness(&f.primary);
        self.secondary_presence(f.secondary.is_empty());
    }

    fn replication(&mut self, f: &ReplicationFacts) {
        let severity = &self.thresholds.severity;
        let (replication_absent, versioning_disabled) =
            (severity.replication_absent, severity.versioning_disabled);

        self.flag("replication_enabled", f.replication_configured);
        self.flag("versioning_enabled", f.versioning_enabled);
        if !f.replication_configured {
            self.push(replication_absent, "replication is not configured".into());
        }
        if !f.versioning_enabled {
            self.push(versioning_disabled, "versioning is disabled".into());
        }

        let difference = f.primary_count.abs_diff(f.secondary_count);
        self.measure("primary_objects", f.primary_count as f64);
        self.measure("secondary_objects", f.secondary_count as f64);
        self.measure("replication_difference", difference as f64);

        if f.primary_count == 0 {
            self.no_backups();
        }
        self.secondary_presence(f.secondary_count == 0);
        if f.primary_count == 0 {
            return;
        }

        // Raw count, not normalised by bucket size.
        if difference > self.thresholds.count_threshold {
            self.push(
                Severity::Warning,
                format!(
                    "object count difference {} exceeds {} (primary={}, secondary={})",
                    difference, self.thresholds.count_threshold, f.primary_count, f.secondary_count
                ),
            );
        }
    }

    fn images(&mut self, f: &ImageFacts) {
        let severity = self.thresholds.severity.lifecycle_policy_disabled;
        self.flag("lifecycle_policy_enabled", f.lifecycle_policy_enabled);
        if !f.lifecycle_policy_enabled {
            self.push(severity, "no enabled lifecycle policies found".into());
        }
        self.measure("primary_images", f.primary.len() as f64);
        self.measure("secondary_images", f.secondary.len() as f64);
        self.existence_and_freshness(&f.primary);
        self.secondary_presence(f.secondary.is_empty());
    }

    fn no_backups(&mut self) {
        self.push(Severity::Critical, format!("no backups found for {}", self.subsystem));
    }

    fn existence_and_freshness(&mut self, primary: &[Artifact]) {
        let Some(newest) = facts::latest(primary) else {
            self.no_backups();
            return;
        };

        let age_hours = (self.now - newest.created_at).num_milliseconds() as f64 / 3_600_000.0;
        self.measure("latest_age_hours", age_hours);

        let max_age_hours = self.thresholds.max_age_hours;
        if age_hours > max_age_hours {
            self.push(
                Severity::Warning,
                format!(
                    "latest {} is {:.1} hours old (threshold: {}h)",
                    self.subsystem.artifact_noun(),
                    age_hours,
                    max_age_hours
                ),
            );
        }
    }

    fn secondary_presence(&mut self, secondary_empty: bool) {
        if secondary_empty {
            let severity = self.thresholds.severity.secondary_missing;
            self.push(
                severity,
                format!("no {}s found in secondary region", self.subsystem.artifact_noun()),
            );
        }
    }

    fn finish(self) -> SubsystemResult {
        SubsystemResult::from_issues(self.subsystem, self.issues, self.measurements)
    }
}
