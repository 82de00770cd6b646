//! Health check invocation.
//!
//! # Data Flow
//! ```text
//! SentinelConfig.targets
//!     → Probe::fetch per subsystem (concurrent, each under a deadline)
//!     → evaluate (pure)
//!     → aggregate → HealthReport
//!     → MetricsEmitter, Notifier (alert / summary)
//!     → InvocationOutcome
//! ```
//!
//! # Design Decisions
//! - A failed or slow probe becomes a critical issue for its subsystem only
//! - Issues found is a completed run; only an aggregation fault is an
//!   internal failure
//! - Notification failures are logged and never change the outcome

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;

use crate::collaborators::{MetricsEmitter, Notifier, NotifyError, Probe, ProbeError, TargetDescriptor};
use crate::config::{SentinelConfig, TargetConfig};
use crate::health::{aggregate, evaluate, render, Dispatch, HealthReport, HealthStatus, SubsystemResult};
use crate::observability::metrics::emit_report;
use crate::resilience::timeouts::with_deadline;

/// Coarse result of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStatus {
    /// Evaluation finished; the report may still carry issues.
    Completed,
    /// Evaluation itself could not finish.
    InternalFailure,
}

impl InvocationStatus {
    pub fn status_code(self) -> u16 {
        match self {
            InvocationStatus::Completed => 200,
            InvocationStatus::InternalFailure => 500,
        }
    }
}

/// What a health check invocation hands back to its caller.
#[derive(Debug, Clone, Serialize)]
pub struct InvocationOutcome {
    pub status: InvocationStatus,
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<HealthReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InvocationOutcome {
    fn completed(report: HealthReport) -> Self {
        Self {
            status: InvocationStatus::Completed,
            status_code: InvocationStatus::Completed.status_code(),
            report: Some(report),
            error: None,
        }
    }

    fn internal_failure(error: String) -> Self {
        Self {
            status: InvocationStatus::InternalFailure,
            status_code: InvocationStatus::InternalFailure.status_code(),
            report: None,
            error: Some(error),
        }
    }
}

/// Configured targets in evaluation order.
pub fn targets(config: &TargetConfig) -> Vec<TargetDescriptor> {
    let mut targets = Vec::new();
    if let Some(t) = &config.database {
        targets.push(TargetDescriptor::Database(t.clone()));
    }
    if let Some(t) = &config.object_storage {
        targets.push(TargetDescriptor::ObjectStorage(t.clone()));
    }
    if let Some(t) = &config.machine_image {
        targets.push(TargetDescriptor::MachineImage(t.clone()));
    }
    targets
}

/// Runs the probe → evaluate → aggregate → notify pipeline.
pub struct BackupMonitor {
    probe: Arc<dyn Probe>,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<dyn MetricsEmitter>,
    config: SentinelConfig,
}

impl BackupMonitor {
    pub fn new(
        probe: Arc<dyn Probe>,
        notifier: Arc<dyn Notifier>,
        metrics: Arc<dyn MetricsEmitter>,
        config: SentinelConfig,
    ) -> Self {
        Self {
            probe,
            notifier,
            metrics,
            config,
        }
    }

    /// Check every configured subsystem as of now.
    pub async fn run(&self, send_summary: bool) -> InvocationOutcome {
        self.run_at(Utc::now(), send_summary).await
    }

    /// Check every configured subsystem, judging ages against `now`.
    pub async fn run_at(&self, now: DateTime<Utc>, send_summary: bool) -> InvocationOutcome {
        let targets = targets(&self.config.targets);
        tracing::info!(subsystems = targets.len(), send_summary, "Backup health check starting");

        let results = join_all(targets.iter().map(|target| self.check(target, now))).await;

        let report = match aggregate(results, now) {
            Ok(report) => report,
            Err(fault) => {
                tracing::error!(error = %fault, "Health aggregation failed");
                let message = render::internal_failure(&fault.to_string());
                self.notify(HealthStatus::Critical, &message).await;
                return InvocationOutcome::internal_failure(fault.to_string());
            }
        };

        tracing::info!(
            status = %report.overall_status,
            issues = report.all_issues.len(),
            "Backup health check finished"
        );

        emit_report(self.metrics.as_ref(), &report);

        let dispatch = Dispatch::plan(&report, send_summary);
        if dispatch.alert {
            self.notify(report.overall_status, &render::alert(&report)).await;
        }
        if dispatch.summary {
            self.notify(report.overall_status, &render::summary(&report)).await;
        }

        InvocationOutcome::completed(report)
    }

    async fn check(&self, target: &TargetDescriptor, now: DateTime<Utc>) -> SubsystemResult {
        let subsystem = target.subsystem();
        let fetched = with_deadline(
            self.config.timeouts.probe_secs,
            self.probe.fetch(subsystem, target),
            ProbeError::Timeout,
        )
        .await;

        if let Err(e) = &fetched {
            tracing::warn!(subsystem = %subsystem, error = %e, "Probe failed");
        }

        let result = evaluate(subsystem, fetched.as_ref(), &self.config.thresholds, now);
        tracing::debug!(subsystem = %subsystem, status = %result.status, issues = result.issues.len(), "Subsystem evaluated");
        result
    }

    async fn notify(&self, status: HealthStatus, message: &render::Message) {
        let secs = self.config.timeouts.notify_secs;
        let sent = with_deadline(
            secs,
            self.notifier.send(status, &message.subject, &message.body),
            NotifyError::Timeout,
        )
        .await;
        if let Err(e) = sent {
            tracing::warn!(subject = %message.subject, error = %e, "Notification failed");
        }
    }
}
