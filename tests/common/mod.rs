//! Shared fakes for integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use dr_sentinel::collaborators::{
    CleanupError, DeleteOutcome, MetricUnit, MetricsEmitter, Notifier, NotifyError, Probe, ProbeError,
    ProvisionError, Provisioner, RecordFilter, Registry, RegistryError, TargetDescriptor,
};
use dr_sentinel::config::{RuleSeverityConfig, ThresholdConfig};
use dr_sentinel::health::{Artifact, Facts, HealthStatus, SubsystemId};
use dr_sentinel::registry::FileRegistry;
use dr_sentinel::restore::{
    LaunchSpec, NetworkPlacement, ResourceKind, RestorePoint, SnapshotCopy, TaggedResource, TestResourceRecord,
};

pub fn thresholds() -> ThresholdConfig {
    ThresholdConfig {
        max_age_hours: 48.0,
        count_threshold: 10,
        severity: RuleSeverityConfig::default(),
    }
}

pub fn artifact(id: &str, created_at: DateTime<Utc>) -> Artifact {
    Artifact::new(id, created_at)
}

/// Probe answering from a fixed table, optionally stalling per subsystem.
#[derive(Default)]
pub struct ScriptedProbe {
    answers: HashMap<SubsystemId, Result<Facts, ProbeError>>,
    stalls: HashMap<SubsystemId, Duration>,
    pub calls: Mutex<Vec<SubsystemId>>,
}

impl ScriptedProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, subsystem: SubsystemId, facts: Result<Facts, ProbeError>) -> Self {
        self.answers.insert(subsystem, facts);
        self
    }

    pub fn stall(mut self, subsystem: SubsystemId, delay: Duration) -> Self {
        self.stalls.insert(subsystem, delay);
        self
    }
}

#[async_trait]
impl Probe for ScriptedProbe {
    async fn fetch(&self, subsystem: SubsystemId, _target: &TargetDescriptor) -> Result<Facts, ProbeError> {
        self.calls.lock().unwrap().push(subsystem);
        if let Some(delay) = self.stalls.get(&subsystem) {
            tokio::time::sleep(*delay).await;
        }
        self.answers
            .get(&subsystem)
            .cloned()
            .unwrap_or_else(|| Err(ProbeError::NotFound(format!("no script for {}", subsystem))))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub status: HealthStatus,
    pub subject: String,
    pub body: String,
}

/// Notifier that records everything it is asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<SentMessage>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.fail.store(true, Ordering::SeqCst);
        notifier
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|m| m.subject.clone()).collect()
    }

    pub fn messages(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, status: HealthStatus, subject: &str, body: &str) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(SentMessage {
            status,
            subject: subject.to_string(),
            body: body.to_string(),
        });
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Transport("connection refused".into()));
        }
        Ok(())
    }
}

/// Emitter that keeps every point.
#[derive(Default)]
pub struct RecordingEmitter {
    pub points: Mutex<Vec<(String, f64, MetricUnit)>>,
}

impl RecordingEmitter {
    pub fn value(&self, name: &str) -> Option<f64> {
        self.points
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(n, _, _)| n == name)
            .map(|(_, v, _)| *v)
    }
}

impl MetricsEmitter for RecordingEmitter {
    fn emit(&self, name: &str, value: f64, unit: MetricUnit, _timestamp: DateTime<Utc>) {
        self.points.lock().unwrap().push((name.to_string(), value, unit));
    }
}

/// Provisioner with scripted creation and deletion results.
pub struct ScriptedProvisioner {
    pub restore_points: Vec<RestorePoint>,
    pub placement: Option<NetworkPlacement>,
    creates: Mutex<VecDeque<Result<String, ProvisionError>>>,
    deletes: Mutex<HashMap<String, VecDeque<Result<DeleteOutcome, CleanupError>>>>,
    pub tagged: Vec<TaggedResource>,
    /// Snapshots of the watched database in the source region.
    pub source_snapshots: Vec<RestorePoint>,
    pub copy_result: Option<ProvisionError>,
    pub launched: Mutex<Vec<LaunchSpec>>,
    pub deleted: Mutex<Vec<String>>,
    pub copies: Mutex<Vec<SnapshotCopy>>,
}

impl ScriptedProvisioner {
    pub fn new(restore_points: Vec<RestorePoint>) -> Self {
        Self {
            restore_points,
            placement: Some(NetworkPlacement {
                network_id: "vpc-default".into(),
                subnet_id: "subnet-a".into(),
                security_group_id: "sg-default".into(),
            }),
            creates: Mutex::new(VecDeque::new()),
            deletes: Mutex::new(HashMap::new()),
            tagged: Vec::new(),
            source_snapshots: Vec::new(),
            copy_result: None,
            launched: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            copies: Mutex::new(Vec::new()),
        }
    }

    pub fn with_create(self, result: Result<String, ProvisionError>) -> Self {
        self.creates.lock().unwrap().push_back(result);
        self
    }

    /// Queue delete results for one resource; unscripted deletes succeed.
    pub fn with_delete(self, resource_id: &str, result: Result<DeleteOutcome, CleanupError>) -> Self {
        self.deletes
            .lock()
            .unwrap()
            .entry(resource_id.to_string())
            .or_default()
            .push_back(result);
        self
    }

    pub fn delete_calls(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provisioner for ScriptedProvisioner {
    async fn restore_points(&self, _kind: ResourceKind, _region: &str) -> Result<Vec<RestorePoint>, ProvisionError> {
        Ok(self.restore_points.clone())
    }

    async fn placement(&self, region: &str) -> Result<NetworkPlacement, ProvisionError> {
        self.placement
            .clone()
            .ok_or_else(|| ProvisionError::Placement(format!("no default network in {}", region)))
    }

    async fn create(&self, _kind: ResourceKind, spec: &LaunchSpec) -> Result<String, ProvisionError> {
        self.launched.lock().unwrap().push(spec.clone());
        self.creates
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(spec.name.clone()))
    }

    async fn delete(&self, _kind: ResourceKind, _region: &str, resource_id: &str) -> Result<DeleteOutcome, CleanupError> {
        self.deleted.lock().unwrap().push(resource_id.to_string());
        self.deletes
            .lock()
            .unwrap()
            .get_mut(resource_id)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(Ok(DeleteOutcome::Deleted))
    }

    async fn tagged_resources(&self, _region: &str) -> Result<Vec<TaggedResource>, ProvisionError> {
        Ok(self.tagged.clone())
    }

    async fn snapshots(&self, _region: &str, _db_instance_id: &str) -> Result<Vec<RestorePoint>, ProvisionError> {
        Ok(self.source_snapshots.clone())
    }

    async fn copy_snapshot(&self, copy: &SnapshotCopy) -> Result<(), ProvisionError> {
        self.copies.lock().unwrap().push(copy.clone());
        match &self.copy_result {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// In-memory registry whose writes can be switched off.
#[derive(Default)]
pub struct FlakyRegistry {
    pub inner: FileRegistry,
    pub fail_puts: AtomicBool,
}

impl FlakyRegistry {
    pub fn failing_puts() -> Self {
        let registry = Self::default();
        registry.fail_puts.store(true, Ordering::SeqCst);
        registry
    }
}

#[async_trait]
impl Registry for FlakyRegistry {
    async fn put(&self, record: &TestResourceRecord) -> Result<(), RegistryError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(RegistryError::Unavailable("throttled".into()));
        }
        self.inner.put(record).await
    }

    async fn scan(&self, filter: RecordFilter<'_>) -> Result<Vec<TestResourceRecord>, RegistryError> {
        self.inner.scan(filter).await
    }

    async fn delete(&self, test_id: &str) -> Result<(), RegistryError> {
        self.inner.delete(test_id).await
    }
}
