//! Test resource registry with optional JSON persistence.
//!
//! # Design Decisions
//! - Each change and its file rewrite happen under one lock, so a rolled-back
//!   change is never written by a concurrent caller
//! - File writes are synchronous and block the calling task for one rewrite

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::collaborators::{RecordFilter, Registry, RegistryError};
use crate::restore::TestResourceRecord;

/// A concurrent map of `test_id → record`, written through to a JSON file
/// after every change when a path is configured.
#[derive(Clone, Default)]
pub struct FileRegistry {
    inner: Arc<DashMap<String, TestResourceRecord>>,
    persistence_path: Option<PathBuf>,
    /// Serializes whole-file rewrites.
    write_lock: Arc<Mutex<()>>,
}

impl FileRegistry {
    /// Registry without persistence.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load from file if it exists; later writes go to the same file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let registry = Self {
            persistence_path: Some(path.to_path_buf()),
            ..Self::default()
        };

        if path.exists() {
            let file = File::open(path)?;
            let reader = BufReader::new(file);
            let map: BTreeMap<String, TestResourceRecord> = serde_json::from_reader(reader)?;
            for (k, v) in map {
                registry.inner.insert(k, v);
            }
            tracing::info!(
                path = %path.display(),
                records = registry.inner.len(),
                "Loaded test resource registry"
            );
        }
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn get(&self, test_id: &str) -> Option<TestResourceRecord> {
        self.inner.get(test_id).map(|r| r.value().clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, RegistryError> {
        self.write_lock
            .lock()
            .map_err(|_| RegistryError::Unavailable("registry write lock poisoned".into()))
    }

    /// Rewrite the backing file atomically (temp file + rename).
    /// Callers hold the write lock.
    fn save(&self) -> Result<(), RegistryError> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };

        let map: BTreeMap<_, _> = self
            .inner
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();

        let tmp = path.with_extension("json.tmp");
        {
            let file = File::create(&tmp)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &map)?;
            writer.flush()?;
        }
        fs::rename(&tmp, path)?;
        tracing::debug!(path = %path.display(), records = map.len(), "Saved test resource registry");
        Ok(())
    }
}

#[async_trait]
impl Registry for FileRegistry {
    async fn put(&self, record: &TestResourceRecord) -> Result<(), RegistryError> {
        let _guard = self.lock()?;
        let previous = self.inner.insert(record.test_id.clone(), record.clone());
        if let Err(e) = self.save() {
            // Keep memory and disk in agreement.
            match previous {
                Some(prev) => self.inner.insert(record.test_id.clone(), prev),
                None => self.inner.remove(&record.test_id).map(|(_, v)| v),
            };
            return Err(e);
        }
        Ok(())
    }

    async fn scan(&self, filter: RecordFilter<'_>) -> Result<Vec<TestResourceRecord>, RegistryError> {
        let mut records: Vec<_> = self
            .inner
            .iter()
            .filter(|r| filter(r.value()))
            .map(|r| r.value().clone())
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.test_id.cmp(&b.test_id)));
        Ok(records)
    }

    async fn delete(&self, test_id: &str) -> Result<(), RegistryError> {
        let _guard = self.lock()?;
        let Some((key, previous)) = self.inner.remove(test_id) else {
            return Ok(());
        };
        if let Err(e) = self.save() {
            self.inner.insert(key, previous);
            return Err(e);
        }
        Ok(())
    }
}
