//! Test resource records and their state machine.
//!
//! # States
//! ```text
//! Requested → Provisioned → Registered → Expired → Cleaned
//!                                           │
//!                                           └──→ CleanupFailed ──→ Cleaned
//!                                                    ↺ (retried each sweep)
//! ```
//!
//! # Design Decisions
//! - Requested/Provisioned exist only in memory; Registered is the first durable state
//! - Expired is a classification made at sweep time, not a separate store write
//! - Expiry is inclusive: age == ttl is expired
//! - A stored ttl that does not fit a `TimeDelta` is an error for that record only

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of ephemeral resource launched for a restore test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Database instance restored from a snapshot.
    DatabaseInstance,
    /// Compute instance launched from a machine image.
    ComputeInstance,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::DatabaseInstance => "database_instance",
            ResourceKind::ComputeInstance => "compute_instance",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a test resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    Requested,
    Provisioned,
    Registered,
    Expired,
    Cleaned,
    CleanupFailed,
}

impl RecordState {
    /// Whether `self → to` is an edge of the lifecycle.
    pub fn can_transition_to(self, to: RecordState) -> bool {
        use RecordState::*;
        matches!(
            (self, to),
            (Requested, Provisioned)
                | (Provisioned, Registered)
                | (Registered, Expired)
                | (Expired, Cleaned)
                | (Expired, CleanupFailed)
                | (CleanupFailed, Cleaned)
                | (CleanupFailed, CleanupFailed)
        )
    }
}

/// Attempted a transition the lifecycle does not allow.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid transition for {test_id}: {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub test_id: String,
    pub from: RecordState,
    pub to: RecordState,
}

/// A stored ttl too large to measure an age against.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("ttl of {ttl_secs} seconds for {test_id} is out of range")]
pub struct TtlOutOfRange {
    pub test_id: String,
    pub ttl_secs: u64,
}

/// A restore-test resource tracked for later cleanup.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TestResourceRecord {
    pub test_id: String,
    pub resource_kind: ResourceKind,
    /// Provider id; empty until the creation call succeeds.
    pub resource_id: String,
    pub region: String,
    pub created_at: DateTime<Utc>,
    pub ttl_secs: u64,
    pub state: RecordState,
    /// Most recent cleanup failure, if any.
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default)]
    pub cleanup_attempts: u32,
}

impl TestResourceRecord {
    /// A fresh in-memory record for a provisioning request.
    pub fn requested(
        test_id: impl Into<String>,
        resource_kind: ResourceKind,
        region: impl Into<String>,
        created_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            test_id: test_id.into(),
            resource_kind,
            resource_id: String::new(),
            region: region.into(),
            created_at,
            ttl_secs: ttl.num_seconds().max(0) as u64,
            state: RecordState::Requested,
            last_error: None,
            cleanup_attempts: 0,
        }
    }

    pub fn ttl(&self) -> Result<Duration, TtlOutOfRange> {
        i64::try_from(self.ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| TtlOutOfRange {
                test_id: self.test_id.clone(),
                ttl_secs: self.ttl_secs,
            })
    }

    /// `now − created_at ≥ ttl`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> Result<bool, TtlOutOfRange> {
        Ok(now - self.created_at >= self.ttl()?)
    }

    /// Sweep-time classification of a stored record.
    pub fn classify(&self, now: DateTime<Utc>) -> Result<RecordState, TtlOutOfRange> {
        if self.state == RecordState::Registered && self.is_expired(now)? {
            return Ok(RecordState::Expired);
        }
        Ok(self.state)
    }

    /// Move to `to`, rejecting edges the lifecycle does not have.
    pub fn advance(&mut self, to: RecordState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(to) {
            return Err(InvalidTransition {
                test_id: self.test_id.clone(),
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }
}

/// Identifier for a new restore test, e.g. `restore-test-20260301-060000-1a2b3c4d`.
pub fn new_test_id(now: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("restore-test-{}-{}", now.format("%Y%m%d-%H%M%S"), &suffix[..8])
}

/// Provider-side name for the resource of a test.
pub fn resource_name(test_id: &str) -> String {
    format!("dr-test-{}", test_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(created_at: DateTime<Utc>) -> TestResourceRecord {
        let mut record = TestResourceRecord::requested(
            "restore-test-1",
            ResourceKind::DatabaseInstance,
            "us-west-2",
            created_at,
            Duration::hours(24),
        );
        record.state = RecordState::Registered;
        record
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let ttl = Duration::hours(24);

        let past = record(now - ttl - Duration::seconds(1));
        assert_eq!(past.classify(now), Ok(RecordState::Expired));

        let exact = record(now - ttl);
        assert_eq!(exact.is_expired(now), Ok(true));

        let fresh = record(now - ttl + Duration::seconds(1));
        assert_eq!(fresh.classify(now), Ok(RecordState::Registered));
    }

    #[test]
    fn test_cleanup_failed_is_not_reclassified() {
        let now = Utc::now();
        let mut failed = record(now);
        failed.state = RecordState::CleanupFailed;
        assert_eq!(failed.classify(now), Ok(RecordState::CleanupFailed));
    }

    #[test]
    fn test_oversized_ttl_is_an_error_not_a_panic() {
        let now = Utc::now();
        for ttl_secs in [u64::MAX, i64::MAX as u64] {
            let mut stored = record(now);
            stored.ttl_secs = ttl_secs;
            assert_eq!(
                stored.classify(now),
                Err(TtlOutOfRange {
                    test_id: "restore-test-1".into(),
                    ttl_secs,
                })
            );
        }

        let mut failed = record(now);
        failed.ttl_secs = u64::MAX;
        failed.state = RecordState::CleanupFailed;
        assert_eq!(failed.classify(now), Ok(RecordState::CleanupFailed));
    }

    #[test]
    fn test_transitions() {
        let mut record = TestResourceRecord::requested(
            "t",
            ResourceKind::ComputeInstance,
            "us-west-2",
            Utc::now(),
            Duration::hours(1),
        );
        assert!(record.advance(RecordState::Registered).is_err());
        record.advance(RecordState::Provisioned).unwrap();
        record.advance(RecordState::Registered).unwrap();
        record.advance(RecordState::Expired).unwrap();
        record.advance(RecordState::CleanupFailed).unwrap();
        record.advance(RecordState::CleanupFailed).unwrap();
        record.advance(RecordState::Cleaned).unwrap();

        let err = record.advance(RecordState::Registered).unwrap_err();
        assert_eq!(err.from, RecordState::Cleaned);
    }

    #[test]
    fn test_ids() {
        let now = chrono::TimeZone::with_ymd_and_hms(&Utc, 2026, 3, 1, 6, 0, 0).unwrap();
        let id = new_test_id(now);
        assert!(id.starts_with("restore-test-20260301-060000-"));
        assert_eq!(id.len(), "restore-test-20260301-060000-".len() + 8);
        assert_eq!(resource_name("abc"), "dr-test-abc");
    }

    #[test]
    fn test_record_json_round_trip_keeps_state() {
        let mut record = record(Utc::now());
        record.state = RecordState::CleanupFailed;
        record.last_error = Some("delete failed: busy".into());
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"cleanup_failed\""));
        let back: TestResourceRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
