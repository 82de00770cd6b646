//! Inputs to the provider's creation call.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collaborators::ProvisionError;
use crate::restore::record::{resource_name, ResourceKind};

pub const TAG_PURPOSE: &str = "Purpose";
pub const TAG_TEST_ID: &str = "TestID";
pub const TAG_AUTO_DELETE: &str = "AutoDelete";
pub const PURPOSE_RESTORE_TEST: &str = "RestoreTest";

/// A snapshot or image a test resource can be restored from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RestorePoint {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Only available restore points can be used.
    pub available: bool,
}

/// Latest available restore point.
pub fn select_restore_point(points: &[RestorePoint]) -> Result<&RestorePoint, ProvisionError> {
    if points.is_empty() {
        return Err(ProvisionError::NotFound("no restore points found".into()));
    }
    points
        .iter()
        .filter(|p| p.available)
        .max_by_key(|p| p.created_at)
        .ok_or_else(|| ProvisionError::NotFound("no available restore points found".into()))
}

/// Where a test resource is launched.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NetworkPlacement {
    pub network_id: String,
    pub subnet_id: String,
    pub security_group_id: String,
}

/// Everything the provider needs to create one test resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchSpec {
    pub test_id: String,
    pub name: String,
    pub region: String,
    pub restore_point_id: String,
    /// Instance class or instance type.
    pub size: String,
    pub placement: NetworkPlacement,
    pub tags: BTreeMap<String, String>,
}

impl LaunchSpec {
    pub fn new(
        test_id: &str,
        region: &str,
        restore_point: &RestorePoint,
        size: &str,
        placement: NetworkPlacement,
    ) -> Self {
        Self {
            test_id: test_id.to_string(),
            name: resource_name(test_id),
            region: region.to_string(),
            restore_point_id: restore_point.id.clone(),
            size: size.to_string(),
            placement,
            tags: restore_test_tags(test_id),
        }
    }
}

/// Tags that make a resource discoverable by `test_id`.
pub fn restore_test_tags(test_id: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (TAG_PURPOSE.to_string(), PURPOSE_RESTORE_TEST.to_string()),
        (TAG_TEST_ID.to_string(), test_id.to_string()),
        (TAG_AUTO_DELETE.to_string(), "true".to_string()),
    ])
}

/// A cross-region copy of one database snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SnapshotCopy {
    pub source_region: String,
    pub source_snapshot_id: String,
    pub target_region: String,
    pub target_snapshot_id: String,
}

/// Identifier for a copied snapshot, e.g. `dr-copy-20260301-060000`.
pub fn copy_snapshot_id(now: DateTime<Utc>) -> String {
    format!("dr-copy-{}", now.format("%Y%m%d-%H%M%S"))
}

/// A live provider resource carrying the restore-test tags.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TaggedResource {
    pub resource_kind: ResourceKind,
    pub resource_id: String,
    pub test_id: String,
    pub region: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn point(id: &str, age_hours: i64, available: bool) -> RestorePoint {
        RestorePoint {
            id: id.into(),
            name: id.into(),
            created_at: Utc::now() - Duration::hours(age_hours),
            available,
        }
    }

    #[test]
    fn test_selects_latest_available() {
        let points = vec![point("old", 30, true), point("newest", 1, false), point("new", 5, true)];
        assert_eq!(select_restore_point(&points).unwrap().id, "new");
    }

    #[test]
    fn test_empty_is_not_found() {
        assert!(matches!(select_restore_point(&[]), Err(ProvisionError::NotFound(_))));
        let unavailable = vec![point("a", 1, false)];
        assert_eq!(
            select_restore_point(&unavailable).unwrap_err(),
            ProvisionError::NotFound("no available restore points found".into())
        );
    }

    #[test]
    fn test_copy_snapshot_id() {
        let now = chrono::TimeZone::with_ymd_and_hms(&Utc, 2026, 3, 1, 6, 0, 0).unwrap();
        assert_eq!(copy_snapshot_id(now), "dr-copy-20260301-060000");
    }

    #[test]
    fn test_tags() {
        let tags = restore_test_tags("restore-test-1");
        assert_eq!(tags[TAG_PURPOSE], "RestoreTest");
        assert_eq!(tags[TAG_TEST_ID], "restore-test-1");
        assert_eq!(tags[TAG_AUTO_DELETE], "true");
    }
}
