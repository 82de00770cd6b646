//! On-disk shape of the offline inventory.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::restore::launch::{NetworkPlacement, RestorePoint, TAG_PURPOSE, TAG_TEST_ID, PURPOSE_RESTORE_TEST};
use crate::restore::ResourceKind;

/// Everything the offline provider knows, keyed by region.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct InventoryDocument {
    pub primary_region: String,
    pub secondary_region: String,
    #[serde(default)]
    pub regions: BTreeMap<String, RegionInventory>,
}

impl InventoryDocument {
    pub fn region(&self, name: &str) -> Option<&RegionInventory> {
        self.regions.get(name)
    }

    pub fn region_mut(&mut self, name: &str) -> Option<&mut RegionInventory> {
        self.regions.get_mut(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RegionInventory {
    pub database_instances: Vec<DatabaseInstance>,
    pub snapshots: Vec<BackupEntry>,
    pub images: Vec<BackupEntry>,
    pub buckets: Vec<Bucket>,
    pub lifecycle_policies: Vec<LifecyclePolicy>,
    /// Default network placement for launched resources.
    pub network: Option<NetworkPlacement>,
    pub resources: Vec<LaunchedResource>,
}

impl RegionInventory {
    /// Backups of one source: snapshots of a database or images of an instance.
    pub fn backups_of<'a>(entries: &'a [BackupEntry], source_id: &'a str) -> impl Iterator<Item = &'a BackupEntry> {
        entries.iter().filter(move |e| e.source_id == source_id)
    }

    pub fn bucket(&self, name: &str) -> Option<&Bucket> {
        self.buckets.iter().find(|b| b.name == name)
    }

    /// Snapshots or images usable for a resource kind.
    pub fn restore_points(&self, kind: ResourceKind) -> Vec<RestorePoint> {
        let entries = match kind {
            ResourceKind::DatabaseInstance => &self.snapshots,
            ResourceKind::ComputeInstance => &self.images,
        };
        entries.iter().map(BackupEntry::restore_point).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DatabaseInstance {
    pub id: String,
    /// Zero means automated backups are off.
    pub backup_retention_days: u32,
}

/// A database snapshot or machine image.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BackupEntry {
    pub id: String,
    /// Database instance or compute instance the backup was taken from.
    pub source_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl BackupEntry {
    pub fn restore_point(&self) -> RestorePoint {
        RestorePoint {
            id: self.id.clone(),
            name: self.id.clone(),
            created_at: self.created_at,
            available: self.available,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Bucket {
    pub name: String,
    #[serde(default)]
    pub versioning_enabled: bool,
    #[serde(default)]
    pub replication_configured: bool,
    #[serde(default)]
    pub object_count: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LifecyclePolicy {
    pub id: String,
    pub enabled: bool,
}

/// A resource created through the provider.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LaunchedResource {
    pub resource_kind: ResourceKind,
    pub resource_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl LaunchedResource {
    /// The test id when the resource carries the restore-test tags.
    pub fn restore_test_id(&self) -> Option<&str> {
        match self.tags.get(TAG_PURPOSE) {
            Some(purpose) if purpose == PURPOSE_RESTORE_TEST => self.tags.get(TAG_TEST_ID).map(String::as_str),
            _ => None,
        }
    }
}
