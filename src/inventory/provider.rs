//! Offline provider backed by an inventory document.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;

use crate::collaborators::{
    CleanupError, DeleteOutcome, Probe, ProbeError, ProvisionError, Provisioner, TargetDescriptor,
};
use crate::health::{Artifact, Facts, ImageFacts, ReplicationFacts, SnapshotFacts, SubsystemId};
use crate::inventory::document::{BackupEntry, InventoryDocument, LaunchedResource, RegionInventory};
use crate::restore::launch::{LaunchSpec, NetworkPlacement, RestorePoint, SnapshotCopy, TaggedResource};
use crate::restore::ResourceKind;

/// Failure loading or saving the inventory document.
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("inventory I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("inventory document is invalid: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("inventory lock poisoned")]
    Poisoned,
}

/// `Probe` and `Provisioner` over a JSON inventory.
///
/// Creations and deletions are written back to the file when one is set.
#[derive(Clone)]
pub struct InventoryFile {
    document: Arc<RwLock<InventoryDocument>>,
    path: Option<PathBuf>,
}

impl InventoryFile {
    pub fn from_document(document: InventoryDocument) -> Self {
        Self {
            document: Arc::new(RwLock::new(document)),
            path: None,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, InventoryError> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let document: InventoryDocument = serde_json::from_reader(reader)?;
        tracing::info!(
            path = %path.display(),
            regions = document.regions.len(),
            "Loaded inventory"
        );
        Ok(Self {
            document: Arc::new(RwLock::new(document)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Copy of the current document.
    pub fn snapshot(&self) -> Result<InventoryDocument, InventoryError> {
        self.document.read().map(|d| d.clone()).map_err(|_| InventoryError::Poisoned)
    }

    fn save(&self, document: &InventoryDocument) -> Result<(), InventoryError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let tmp = path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer_pretty(&mut writer, document)?;
            writer.flush()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }

    fn read_probe(&self) -> Result<InventoryDocument, ProbeError> {
        self.snapshot().map_err(|e| ProbeError::Unavailable(e.to_string()))
    }

    fn read_provision(&self) -> Result<InventoryDocument, ProvisionError> {
        self.snapshot().map_err(|e| ProvisionError::Create(e.to_string()))
    }
}

fn region<'a>(document: &'a InventoryDocument, name: &str) -> Result<&'a RegionInventory, ProbeError> {
    document
        .region(name)
        .ok_or_else(|| ProbeError::NotFound(format!("region {}", name)))
}

fn artifacts<'a>(entries: impl Iterator<Item = &'a BackupEntry>) -> Vec<Artifact> {
    entries.map(|e| Artifact::new(e.id.clone(), e.created_at)).collect()
}

fn snapshot_facts(document: &InventoryDocument, db_instance_id: &str) -> Result<Facts, ProbeError> {
    let primary = region(document, &document.primary_region)?;
    let secondary = region(document, &document.secondary_region)?;
    let instance = primary
        .database_instances
        .iter()
        .find(|i| i.id == db_instance_id)
        .ok_or_else(|| ProbeError::NotFound(format!("database instance {}", db_instance_id)))?;

    Ok(Facts::Snapshots(SnapshotFacts {
        backup_retention_enabled: instance.backup_retention_days > 0,
        primary: artifacts(RegionInventory::backups_of(&primary.snapshots, db_instance_id)),
        secondary: artifacts(RegionInventory::backups_of(&secondary.snapshots, db_instance_id)),
    }))
}

fn replication_facts(document: &InventoryDocument, primary_bucket: &str, secondary_bucket: &str) -> Result<Facts, ProbeError> {
    let source = region(document, &document.primary_region)?
        .bucket(primary_bucket)
        .ok_or_else(|| ProbeError::NotFound(format!("bucket {}", primary_bucket)))?;
    let replica = region(document, &document.secondary_region)?
        .bucket(secondary_bucket)
        .ok_or_else(|| ProbeError::NotFound(format!("bucket {}", secondary_bucket)))?;

    Ok(Facts::Replication(ReplicationFacts {
        replication_configured: source.replication_configured,
        versioning_enabled: source.versioning_enabled,
        primary_count: source.object_count,
        secondary_count: replica.object_count,
    }))
}

fn image_facts(document: &InventoryDocument, instance_id: &str) -> Result<Facts, ProbeError> {
    let primary = region(document, &document.primary_region)?;
    let secondary = region(document, &document.secondary_region)?;

    Ok(Facts::Images(ImageFacts {
        lifecycle_policy_enabled: primary.lifecycle_policies.iter().any(|p| p.enabled),
        primary: artifacts(RegionInventory::backups_of(&primary.images, instance_id)),
        secondary: artifacts(RegionInventory::backups_of(&secondary.images, instance_id)),
    }))
}

#[async_trait]
impl Probe for InventoryFile {
    async fn fetch(&self, subsystem: SubsystemId, target: &TargetDescriptor) -> Result<Facts, ProbeError> {
        if target.subsystem() != subsystem {
            return Err(ProbeError::NotFound(format!("no {} target configured", subsystem)));
        }
        let document = self.read_probe()?;
        match target {
            TargetDescriptor::Database(t) => snapshot_facts(&document, &t.db_instance_id),
            TargetDescriptor::ObjectStorage(t) => replication_facts(&document, &t.primary_bucket, &t.secondary_bucket),
            TargetDescriptor::MachineImage(t) => image_facts(&document, &t.instance_id),
        }
    }
}

fn generated_id(kind: ResourceKind, spec: &LaunchSpec) -> String {
    match kind {
        ResourceKind::DatabaseInstance => spec.name.clone(),
        ResourceKind::ComputeInstance => {
            let hex = uuid::Uuid::new_v4().simple().to_string();
            format!("i-{}", &hex[..17])
        }
    }
}

#[async_trait]
impl Provisioner for InventoryFile {
    async fn restore_points(&self, kind: ResourceKind, region: &str) -> Result<Vec<RestorePoint>, ProvisionError> {
        let document = self.read_provision()?;
        Ok(document
            .region(region)
            .map(|r| r.restore_points(kind))
            .unwrap_or_default())
    }

    async fn placement(&self, region: &str) -> Result<NetworkPlacement, ProvisionError> {
        let document = self.read_provision()?;
        document
            .region(region)
            .and_then(|r| r.network.clone())
            .ok_or_else(|| ProvisionError::Placement(format!("no default network in {}", region)))
    }

    async fn create(&self, kind: ResourceKind, spec: &LaunchSpec) -> Result<String, ProvisionError> {
        let mut document = self
            .document
            .write()
            .map_err(|_| ProvisionError::Create(InventoryError::Poisoned.to_string()))?;

        let resource_id = generated_id(kind, spec);
        let target = document
            .region_mut(&spec.region)
            .ok_or_else(|| ProvisionError::NotFound(format!("region {}", spec.region)))?;
        target.resources.push(LaunchedResource {
            resource_kind: kind,
            resource_id: resource_id.clone(),
            created_at: Utc::now(),
            tags: spec.tags.clone(),
        });

        if let Err(e) = self.save(&document) {
            if let Some(target) = document.region_mut(&spec.region) {
                target.resources.retain(|r| r.resource_id != resource_id);
            }
            return Err(ProvisionError::Create(e.to_string()));
        }

        tracing::debug!(resource_id = %resource_id, kind = %kind, region = %spec.region, "Inventory resource created");
        Ok(resource_id)
    }

    async fn delete(&self, kind: ResourceKind, region: &str, resource_id: &str) -> Result<DeleteOutcome, CleanupError> {
        let mut document = self
            .document
            .write()
            .map_err(|_| CleanupError::Delete(InventoryError::Poisoned.to_string()))?;

        let Some(target) = document.region_mut(region) else {
            return Ok(DeleteOutcome::NotFound);
        };
        let Some(position) = target
            .resources
            .iter()
            .position(|r| r.resource_kind == kind && r.resource_id == resource_id)
        else {
            return Ok(DeleteOutcome::NotFound);
        };
        let removed = target.resources.remove(position);

        if let Err(e) = self.save(&document) {
            if let Some(target) = document.region_mut(region) {
                target.resources.insert(position, removed);
            }
            return Err(CleanupError::Delete(e.to_string()));
        }
        Ok(DeleteOutcome::Deleted)
    }

    async fn tagged_resources(&self, region: &str) -> Result<Vec<TaggedResource>, ProvisionError> {
        let document = self.read_provision()?;
        let Some(inventory) = document.region(region) else {
            return Ok(Vec::new());
        };
        Ok(inventory
            .resources
            .iter()
            .filter_map(|r| {
                r.restore_test_id().map(|test_id| TaggedResource {
                    resource_kind: r.resource_kind,
                    resource_id: r.resource_id.clone(),
                    test_id: test_id.to_string(),
                    region: region.to_string(),
                    created_at: r.created_at,
                })
            })
            .collect())
    }

    async fn snapshots(&self, region: &str, db_instance_id: &str) -> Result<Vec<RestorePoint>, ProvisionError> {
        let document = self.read_provision()?;
        let Some(inventory) = document.region(region) else {
            return Ok(Vec::new());
        };
        Ok(RegionInventory::backups_of(&inventory.snapshots, db_instance_id)
            .map(BackupEntry::restore_point)
            .collect())
    }

    async fn copy_snapshot(&self, copy: &SnapshotCopy) -> Result<(), ProvisionError> {
        let mut document = self
            .document
            .write()
            .map_err(|_| ProvisionError::Create(InventoryError::Poisoned.to_string()))?;

        let source = document
            .region(&copy.source_region)
            .and_then(|r| r.snapshots.iter().find(|e| e.id == copy.source_snapshot_id))
            .cloned()
            .ok_or_else(|| ProvisionError::NotFound(format!("snapshot {}", copy.source_snapshot_id)))?;

        let target = document
            .region_mut(&copy.target_region)
            .ok_or_else(|| ProvisionError::NotFound(format!("region {}", copy.target_region)))?;
        if target.snapshots.iter().any(|e| e.id == copy.target_snapshot_id) {
            return Err(ProvisionError::Create(format!(
                "snapshot {} already exists in {}",
                copy.target_snapshot_id, copy.target_region
            )));
        }
        target.snapshots.push(BackupEntry {
            id: copy.target_snapshot_id.clone(),
            source_id: source.source_id,
            created_at: Utc::now(),
            available: true,
        });

        if let Err(e) = self.save(&document) {
            if let Some(target) = document.region_mut(&copy.target_region) {
                target.snapshots.retain(|entry| entry.id != copy.target_snapshot_id);
            }
            return Err(ProvisionError::Create(e.to_string()));
        }

        tracing::debug!(
            source = %copy.source_snapshot_id,
            destination = %copy.target_snapshot_id,
            "Inventory snapshot copied"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseTarget, MachineImageTarget, ObjectStorageTarget};
    use crate::inventory::document::{Bucket, DatabaseInstance, LifecyclePolicy};
    use crate::restore::launch::restore_test_tags;
    use chrono::Duration;

    fn entry(id: &str, source: &str, age_hours: i64) -> BackupEntry {
        BackupEntry {
            id: id.into(),
            source_id: source.into(),
            created_at: Utc::now() - Duration::hours(age_hours),
            available: true,
        }
    }

    fn document() -> InventoryDocument {
        let mut primary = RegionInventory::default();
        primary.database_instances.push(DatabaseInstance {
            id: "orders-db".into(),
            backup_retention_days: 7,
        });
        primary.snapshots = vec![entry("snap-1", "orders-db", 3), entry("snap-other", "other-db", 1)];
        primary.images = vec![entry("ami-1", "i-web", 10)];
        primary.buckets.push(Bucket {
            name: "assets".into(),
            versioning_enabled: true,
            replication_configured: true,
            object_count: 120,
        });
        primary.lifecycle_policies.push(LifecyclePolicy {
            id: "policy-1".into(),
            enabled: false,
        });

        let mut secondary = RegionInventory::default();
        secondary.snapshots = vec![entry("snap-1-copy", "orders-db", 2)];
        secondary.images = vec![entry("ami-1-copy", "i-web", 9)];
        secondary.buckets.push(Bucket {
            name: "assets-replica".into(),
            versioning_enabled: true,
            replication_configured: false,
            object_count: 100,
        });
        secondary.network = Some(NetworkPlacement {
            network_id: "vpc-1".into(),
            subnet_id: "subnet-1".into(),
            security_group_id: "sg-default".into(),
        });

        InventoryDocument {
            primary_region: "us-east-1".into(),
            secondary_region: "us-west-2".into(),
            regions: [("us-east-1".to_string(), primary), ("us-west-2".to_string(), secondary)].into(),
        }
    }

    #[tokio::test]
    async fn test_probe_facts() {
        let inventory = InventoryFile::from_document(document());

        let db = TargetDescriptor::Database(DatabaseTarget {
            db_instance_id: "orders-db".into(),
        });
        match inventory.fetch(SubsystemId::Database, &db).await.unwrap() {
            Facts::Snapshots(f) => {
                assert!(f.backup_retention_enabled);
                assert_eq!(f.primary.len(), 1);
                assert_eq!(f.secondary[0].id, "snap-1-copy");
            }
            other => panic!("unexpected facts: {:?}", other),
        }

        let buckets = TargetDescriptor::ObjectStorage(ObjectStorageTarget {
            primary_bucket: "assets".into(),
            secondary_bucket: "assets-replica".into(),
        });
        match inventory.fetch(SubsystemId::ObjectStorage, &buckets).await.unwrap() {
            Facts::Replication(f) => {
                assert!(f.replication_configured);
                assert_eq!((f.primary_count, f.secondary_count), (120, 100));
            }
            other => panic!("unexpected facts: {:?}", other),
        }

        let images = TargetDescriptor::MachineImage(MachineImageTarget {
            instance_id: "i-web".into(),
        });
        match inventory.fetch(SubsystemId::MachineImage, &images).await.unwrap() {
            Facts::Images(f) => {
                assert!(!f.lifecycle_policy_enabled);
                assert_eq!(f.secondary.len(), 1);
            }
            other => panic!("unexpected facts: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_probe_unknown_instance() {
        let inventory = InventoryFile::from_document(document());
        let db = TargetDescriptor::Database(DatabaseTarget {
            db_instance_id: "missing".into(),
        });
        let err = inventory.fetch(SubsystemId::Database, &db).await.unwrap_err();
        assert_eq!(err, ProbeError::NotFound("database instance missing".into()));
    }

    #[tokio::test]
    async fn test_create_and_delete_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        fs::write(&path, serde_json::to_string(&document()).unwrap()).unwrap();

        let inventory = InventoryFile::load(&path).unwrap();
        let point = inventory
            .restore_points(ResourceKind::ComputeInstance, "us-west-2")
            .await
            .unwrap()
            .remove(0);
        let placement = inventory.placement("us-west-2").await.unwrap();
        let spec = LaunchSpec::new("restore-test-1", "us-west-2", &point, "t2.micro", placement);

        let id = inventory.create(ResourceKind::ComputeInstance, &spec).await.unwrap();
        assert!(id.starts_with("i-"));

        let reloaded = InventoryFile::load(&path).unwrap();
        let tagged = reloaded.tagged_resources("us-west-2").await.unwrap();
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].test_id, "restore-test-1");

        let outcome = inventory.delete(ResourceKind::ComputeInstance, "us-west-2", &id).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);
        let again = inventory.delete(ResourceKind::ComputeInstance, "us-west-2", &id).await.unwrap();
        assert_eq!(again, DeleteOutcome::NotFound);
        assert!(InventoryFile::load(&path).unwrap().snapshot().unwrap().regions["us-west-2"].resources.is_empty());
    }

    #[tokio::test]
    async fn test_copy_snapshot_lands_in_target_region() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        fs::write(&path, serde_json::to_string(&document()).unwrap()).unwrap();
        let inventory = InventoryFile::load(&path).unwrap();

        let sources = inventory.snapshots("us-east-1", "orders-db").await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].id, "snap-1");

        let copy = SnapshotCopy {
            source_region: "us-east-1".into(),
            source_snapshot_id: "snap-1".into(),
            target_region: "us-west-2".into(),
            target_snapshot_id: "dr-copy-20260301-060000".into(),
        };
        inventory.copy_snapshot(&copy).await.unwrap();
        assert!(matches!(
            inventory.copy_snapshot(&copy).await,
            Err(ProvisionError::Create(_))
        ));

        let copied = InventoryFile::load(&path)
            .unwrap()
            .snapshots("us-west-2", "orders-db")
            .await
            .unwrap();
        let ids: Vec<_> = copied.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["snap-1-copy", "dr-copy-20260301-060000"]);
    }

    #[tokio::test]
    async fn test_copy_unknown_snapshot_is_not_found() {
        let inventory = InventoryFile::from_document(document());
        let copy = SnapshotCopy {
            source_region: "us-east-1".into(),
            source_snapshot_id: "snap-missing".into(),
            target_region: "us-west-2".into(),
            target_snapshot_id: "dr-copy-1".into(),
        };
        assert_eq!(
            inventory.copy_snapshot(&copy).await,
            Err(ProvisionError::NotFound("snapshot snap-missing".into()))
        );
    }

    #[tokio::test]
    async fn test_untagged_resources_are_ignored() {
        let mut doc = document();
        let region = doc.regions.get_mut("us-west-2").unwrap();
        region.resources.push(LaunchedResource {
            resource_kind: ResourceKind::DatabaseInstance,
            resource_id: "prod-replica".into(),
            created_at: Utc::now(),
            tags: Default::default(),
        });
        region.resources.push(LaunchedResource {
            resource_kind: ResourceKind::DatabaseInstance,
            resource_id: "dr-test-x".into(),
            created_at: Utc::now(),
            tags: restore_test_tags("x"),
        });
        let inventory = InventoryFile::from_document(doc);
        let tagged = inventory.tagged_resources("us-west-2").await.unwrap();
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].resource_id, "dr-test-x");
    }

    #[tokio::test]
    async fn test_missing_network_is_placement_error() {
        let inventory = InventoryFile::from_document(document());
        assert!(matches!(
            inventory.placement("us-east-1").await,
            Err(ProvisionError::Placement(_))
        ));
    }
}
