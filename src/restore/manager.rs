//! Restore-test resource lifecycle.
//!
//! # Responsibilities
//! - Provision a test resource from the latest restore point and register it
//! - Sweep the registry, reclaiming expired resources one by one
//! - Adopt tagged provider resources the registry lost track of
//! - Copy the latest primary database snapshot into the restore region
//!
//! # Design Decisions
//! - The registry write happens only after the creation call succeeds;
//!   a failed write leaves an orphan that is logged and reported, and that
//!   `reconcile` can later adopt by tag
//! - Each record is cleaned up independently; failures become summary
//!   entries and the record stays `CleanupFailed` for the next sweep
//! - "Not found" on delete counts as success, so repeated sweeps are no-ops

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::collaborators::{
    CleanupError, DeleteOutcome, MetricUnit, MetricsEmitter, Notifier, NotifyError, ProvisionError,
    Provisioner, Registry, RegistryError,
};
use crate::config::{RestoreConfig, TimeoutConfig};
use crate::health::HealthStatus;
use crate::resilience::timeouts::with_deadline;
use crate::restore::launch::{copy_snapshot_id, select_restore_point, LaunchSpec, SnapshotCopy, TaggedResource};
use crate::restore::record::{new_test_id, InvalidTransition, RecordState, ResourceKind, TestResourceRecord};

/// Failures that end a lifecycle workflow.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("restore test {test_id} failed: {source}")]
    Provision {
        test_id: String,
        #[source]
        source: ProvisionError,
    },

    #[error("resource {resource_id} for {test_id} was created but could not be registered: {source}")]
    Orphaned {
        test_id: String,
        resource_id: String,
        #[source]
        source: RegistryError,
    },

    #[error("tagged resource discovery failed: {0}")]
    Discovery(ProvisionError),

    #[error("snapshot copy failed: {0}")]
    SnapshotCopy(ProvisionError),

    #[error("restore ttl of {0} hours is out of range")]
    TtlOutOfRange(u64),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Transition(#[from] InvalidTransition),
}

/// A resource reclaimed by a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanedResource {
    pub test_id: String,
    pub resource_kind: ResourceKind,
    pub resource_id: String,
    /// The provider reported the resource already gone.
    pub already_absent: bool,
}

/// A record whose cleanup failed during a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepFailure {
    pub test_id: String,
    pub resource_id: String,
    pub error: String,
}

/// Outcome of one pass over the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    pub cleaned: Vec<CleanedResource>,
    pub errors: Vec<SweepFailure>,
    /// Registered records that have not reached their ttl.
    pub pending: usize,
}

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileSummary {
    pub adopted: Vec<TestResourceRecord>,
    pub errors: Vec<String>,
}

/// Owns the provision → register → expire → cleanup state machine.
pub struct LifecycleManager {
    provisioner: Arc<dyn Provisioner>,
    registry: Arc<dyn Registry>,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<dyn MetricsEmitter>,
    restore: RestoreConfig,
    timeouts: TimeoutConfig,
}

impl LifecycleManager {
    pub fn new(
        provisioner: Arc<dyn Provisioner>,
        registry: Arc<dyn Registry>,
        notifier: Arc<dyn Notifier>,
        metrics: Arc<dyn MetricsEmitter>,
        restore: RestoreConfig,
        timeouts: TimeoutConfig,
    ) -> Self {
        Self {
            provisioner,
            registry,
            notifier,
            metrics,
            restore,
            timeouts,
        }
    }

    fn ttl(&self) -> Result<Duration, LifecycleError> {
        let hours = self.restore.ttl_hours;
        i64::try_from(hours)
            .ok()
            .and_then(Duration::try_hours)
            .ok_or(LifecycleError::TtlOutOfRange(hours))
    }

    fn instance_size(&self, kind: ResourceKind) -> &str {
        match kind {
            ResourceKind::DatabaseInstance => self.restore.database_instance_class.as_str(),
            ResourceKind::ComputeInstance => self.restore.compute_instance_type.as_str(),
        }
    }

    /// Launch one restore-test resource and register it.
    pub async fn provision(
        &self,
        kind: ResourceKind,
        now: DateTime<Utc>,
    ) -> Result<TestResourceRecord, LifecycleError> {
        let ttl = self.ttl()?;
        let region = self.restore.region.clone();
        let mut record = TestResourceRecord::requested(new_test_id(now), kind, &region, now, ttl);

        tracing::info!(
            test_id = %record.test_id,
            kind = %kind,
            region = %region,
            "Restore test requested"
        );

        let (resource_id, restore_point_id) = match self.launch(&record).await {
            Ok(launched) => launched,
            Err(source) => {
                tracing::error!(test_id = %record.test_id, error = %source, "Restore test provisioning failed");
                self.notify(
                    HealthStatus::Critical,
                    &format!("Restore test failed ({})", kind),
                    &format!(
                        "Restore test failed\n\nTest ID: {}\nKind: {}\nRegion: {}\nTimestamp: {}\n\nError: {}\n",
                        record.test_id,
                        kind,
                        region,
                        now.to_rfc3339(),
                        source
                    ),
                )
                .await;
                return Err(LifecycleError::Provision {
                    test_id: record.test_id,
                    source,
                });
            }
        };

        record.resource_id = resource_id;
        record.advance(RecordState::Provisioned)?;

        let mut registered = record.clone();
        registered.advance(RecordState::Registered)?;
        if let Err(source) = self.registry.put(&registered).await {
            tracing::error!(
                test_id = %record.test_id,
                resource_id = %record.resource_id,
                region = %record.region,
                error = %source,
                "ORPHANED restore resource: created but not registered; sweep cannot reclaim it"
            );
            self.notify(
                HealthStatus::Critical,
                "Orphaned restore resource",
                &format!(
                    "A restore-test resource exists but is not tracked.\n\nTest ID: {}\nResource: {} {}\nRegion: {}\n\nRegistry error: {}\n\nRun reconcile or delete it manually.\n",
                    record.test_id, kind, record.resource_id, record.region, source
                ),
            )
            .await;
            return Err(LifecycleError::Orphaned {
                test_id: record.test_id,
                resource_id: record.resource_id,
                source,
            });
        }
        let record = registered;

        tracing::info!(
            test_id = %record.test_id,
            resource_id = %record.resource_id,
            restore_point = %restore_point_id,
            "Restore test resource registered"
        );
        self.notify(
            HealthStatus::Healthy,
            &format!("Restore test initiated ({})", kind),
            &format!(
                "Restore test started\n\nTest ID: {}\nRestore point: {}\nTest resource: {}\nRegion: {}\nTimestamp: {}\n\nThe resource will be cleaned up after {} hours.\n",
                record.test_id,
                restore_point_id,
                record.resource_id,
                record.region,
                now.to_rfc3339(),
                self.restore.ttl_hours
            ),
        )
        .await;

        Ok(record)
    }

    /// Restore point selection, placement lookup and the creation call.
    async fn launch(&self, record: &TestResourceRecord) -> Result<(String, String), ProvisionError> {
        let kind = record.resource_kind;
        let region = record.region.as_str();
        let secs = self.timeouts.provision_secs;

        let points = with_deadline(secs, self.provisioner.restore_points(kind, region), ProvisionError::Timeout).await?;
        let point = select_restore_point(&points)?;
        tracing::debug!(test_id = %record.test_id, restore_point = %point.id, "Selected restore point");

        let placement = with_deadline(secs, self.provisioner.placement(region), ProvisionError::Timeout).await?;

        let spec = LaunchSpec::new(&record.test_id, region, point, self.instance_size(kind), placement);
        let resource_id = with_deadline(secs, self.provisioner.create(kind, &spec), ProvisionError::Timeout).await?;

        Ok((resource_id, point.id.clone()))
    }

    /// Reclaim every expired or previously failed record.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepSummary, LifecycleError> {
        let records = self
            .registry
            .scan(&|r: &TestResourceRecord| {
                matches!(r.state, RecordState::Registered | RecordState::CleanupFailed)
            })
            .await?;

        tracing::info!(records = records.len(), "Sweep starting");

        let mut summary = SweepSummary::default();
        for record in records {
            match record.classify(now) {
                Ok(RecordState::Expired | RecordState::CleanupFailed) => {
                    self.reclaim(record, &mut summary).await;
                }
                Ok(_) => summary.pending += 1,
                Err(e) => {
                    tracing::warn!(test_id = %record.test_id, error = %e, "Record skipped by sweep");
                    summary.errors.push(SweepFailure {
                        test_id: record.test_id,
                        resource_id: record.resource_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            cleaned = summary.cleaned.len(),
            errors = summary.errors.len(),
            pending = summary.pending,
            "Sweep finished"
        );

        self.metrics.emit("dr_restore_sweep_cleaned", summary.cleaned.len() as f64, MetricUnit::Count, now);
        self.metrics.emit("dr_restore_sweep_errors", summary.errors.len() as f64, MetricUnit::Count, now);

        if !summary.cleaned.is_empty() || !summary.errors.is_empty() {
            let status = if summary.errors.is_empty() {
                HealthStatus::Healthy
            } else {
                HealthStatus::Warning
            };
            self.notify(status, "Restore test cleanup report", &render_sweep(&summary, now)).await;
        }

        Ok(summary)
    }

    /// Delete one record's resource and record the outcome in place.
    async fn reclaim(&self, mut record: TestResourceRecord, summary: &mut SweepSummary) {
        if record.state == RecordState::Registered {
            // Classification only; the store still holds Registered.
            record.state = RecordState::Expired;
        }
        record.cleanup_attempts += 1;

        let deleted = with_deadline(
            self.timeouts.cleanup_secs,
            self.provisioner.delete(record.resource_kind, &record.region, &record.resource_id),
            CleanupError::Timeout,
        )
        .await;

        let outcome = match deleted {
            Ok(outcome) => outcome,
            Err(error) => {
                self.mark_failed(record, error, summary).await;
                return;
            }
        };

        if let Err(e) = self.registry.delete(&record.test_id).await {
            // The resource is gone; the next sweep sees NotFound and retries the removal.
            tracing::warn!(test_id = %record.test_id, error = %e, "Resource deleted but registry entry kept");
            summary.errors.push(SweepFailure {
                test_id: record.test_id,
                resource_id: record.resource_id,
                error: CleanupError::Registry(e.to_string()).to_string(),
            });
            return;
        }

        let already_absent = outcome == DeleteOutcome::NotFound;
        tracing::info!(
            test_id = %record.test_id,
            resource_id = %record.resource_id,
            already_absent,
            "Restore test resource cleaned"
        );
        summary.cleaned.push(CleanedResource {
            test_id: record.test_id,
            resource_kind: record.resource_kind,
            resource_id: record.resource_id,
            already_absent,
        });
    }

    async fn mark_failed(&self, mut record: TestResourceRecord, error: CleanupError, summary: &mut SweepSummary) {
        tracing::warn!(
            test_id = %record.test_id,
            resource_id = %record.resource_id,
            attempts = record.cleanup_attempts,
            error = %error,
            "Cleanup failed; will retry on next sweep"
        );

        if let Err(e) = record.advance(RecordState::CleanupFailed) {
            tracing::error!(error = %e, "Unexpected record state during sweep");
        }
        record.last_error = Some(error.to_string());
        if let Err(e) = self.registry.put(&record).await {
            tracing::warn!(test_id = %record.test_id, error = %e, "Could not persist cleanup failure");
        }

        summary.errors.push(SweepFailure {
            test_id: record.test_id,
            resource_id: record.resource_id,
            error: error.to_string(),
        });
    }

    /// Register tagged provider resources that have no registry record.
    pub async fn reconcile(&self) -> Result<ReconcileSummary, LifecycleError> {
        let ttl = self.ttl()?;
        let region = self.restore.region.as_str();
        let tagged = with_deadline(
            self.timeouts.provision_secs,
            self.provisioner.tagged_resources(region),
            ProvisionError::Timeout,
        )
        .await
        .map_err(LifecycleError::Discovery)?;

        let known: HashSet<String> = self
            .registry
            .scan(&|_: &TestResourceRecord| true)
            .await?
            .into_iter()
            .map(|r| r.test_id)
            .collect();

        let mut summary = ReconcileSummary::default();
        for resource in tagged.into_iter().filter(|t| !known.contains(&t.test_id)) {
            let record = adopt(&resource, ttl)?;
            match self.registry.put(&record).await {
                Ok(()) => {
                    tracing::warn!(
                        test_id = %record.test_id,
                        resource_id = %record.resource_id,
                        "Adopted untracked restore resource"
                    );
                    summary.adopted.push(record);
                }
                Err(e) => summary.errors.push(format!("failed to adopt {}: {}", resource.resource_id, e)),
            }
        }

        Ok(summary)
    }

    /// Copy the latest available snapshot of `db_instance_id` from the
    /// source region into the restore region as `dr-copy-<timestamp>`.
    pub async fn copy_latest_snapshot(
        &self,
        db_instance_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SnapshotCopy, LifecycleError> {
        let source_region = self.restore.source_region.as_str();
        let target_region = self.restore.region.as_str();

        let copy = match self.start_copy(db_instance_id, now).await {
            Ok(copy) => copy,
            Err(source) => {
                tracing::error!(
                    db_instance_id = %db_instance_id,
                    source_region = %source_region,
                    target_region = %target_region,
                    error = %source,
                    "Snapshot copy failed"
                );
                self.notify(
                    HealthStatus::Critical,
                    "Snapshot copy failed",
                    &format!(
                        "Snapshot copy failed\n\nDatabase: {}\nFrom: {}\nTo: {}\nTimestamp: {}\n\nError: {}\n",
                        db_instance_id,
                        source_region,
                        target_region,
                        now.to_rfc3339(),
                        source
                    ),
                )
                .await;
                return Err(LifecycleError::SnapshotCopy(source));
            }
        };

        tracing::info!(
            source = %copy.source_snapshot_id,
            destination = %copy.target_snapshot_id,
            target_region = %copy.target_region,
            "Snapshot copy started"
        );
        self.notify(
            HealthStatus::Healthy,
            "Snapshot copied to restore region",
            &format!(
                "Snapshot copy started\n\nSource: {} ({})\nDestination: {} ({})\nTimestamp: {}\n",
                copy.source_snapshot_id,
                copy.source_region,
                copy.target_snapshot_id,
                copy.target_region,
                now.to_rfc3339()
            ),
        )
        .await;

        Ok(copy)
    }

    async fn start_copy(&self, db_instance_id: &str, now: DateTime<Utc>) -> Result<SnapshotCopy, ProvisionError> {
        let secs = self.timeouts.provision_secs;
        let source_region = self.restore.source_region.as_str();

        let snapshots = with_deadline(
            secs,
            self.provisioner.snapshots(source_region, db_instance_id),
            ProvisionError::Timeout,
        )
        .await?;
        if snapshots.is_empty() {
            return Err(ProvisionError::NotFound(format!("no snapshots found for {}", db_instance_id)));
        }
        let latest = select_restore_point(&snapshots)?;

        let copy = SnapshotCopy {
            source_region: source_region.to_string(),
            source_snapshot_id: latest.id.clone(),
            target_region: self.restore.region.clone(),
            target_snapshot_id: copy_snapshot_id(now),
        };
        with_deadline(secs, self.provisioner.copy_snapshot(&copy), ProvisionError::Timeout).await?;
        Ok(copy)
    }

    /// Best-effort delivery; failures are logged and never escalate.
    async fn notify(&self, status: HealthStatus, subject: &str, body: &str) {
        let secs = self.timeouts.notify_secs;
        let sent = with_deadline(secs, self.notifier.send(status, subject, body), NotifyError::Timeout).await;
        if let Err(e) = sent {
            tracing::warn!(subject = %subject, error = %e, "Notification failed");
        }
    }
}

fn adopt(resource: &TaggedResource, ttl: Duration) -> Result<TestResourceRecord, InvalidTransition> {
    let mut record = TestResourceRecord::requested(
        resource.test_id.clone(),
        resource.resource_kind,
        resource.region.clone(),
        resource.created_at,
        ttl,
    );
    record.resource_id = resource.resource_id.clone();
    record.advance(RecordState::Provisioned)?;
    record.advance(RecordState::Registered)?;
    Ok(record)
}

fn render_sweep(summary: &SweepSummary, now: DateTime<Utc>) -> String {
    let mut body = format!(
        "Restore test cleanup report\n\nTimestamp: {}\nCleaned resources: {}\n\nCLEANED RESOURCES:\n",
        now.to_rfc3339(),
        summary.cleaned.len()
    );
    for cleaned in &summary.cleaned {
        body.push_str(&format!(
            "- {}: {}\n",
            cleaned.resource_kind.as_str().to_uppercase(),
            cleaned.resource_id
        ));
    }
    if !summary.errors.is_empty() {
        body.push_str("\nERRORS:\n");
        for failure in &summary.errors {
            body.push_str(&format!("- {} ({}): {}\n", failure.resource_id, failure.test_id, failure.error));
        }
    }
    body
}
