//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Install the Prometheus recorder (optional HTTP listener)
//! - Turn health reports into metric points
//! - Forward points to the `metrics` facade
//!
//! # Metrics
//! - `dr_backup_<subsystem>_<measurement>` (gauge): per-subsystem measurements
//! - `dr_backup_health_score` (gauge): 100=healthy, 50=warning, 0=critical
//! - `dr_backup_issues` (gauge): issues in the latest report
//! - `dr_restore_sweep_cleaned` / `dr_restore_sweep_errors` (gauge): last sweep
//! - `dr_metric_points_total` (counter): points emitted, by unit
//!
//! # Design Decisions
//! - Emission never fails the caller; without a recorder points are dropped
//! - Unit travels as a label since Prometheus has no unit field

use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::collaborators::{MetricUnit, MetricsEmitter};
use crate::health::HealthReport;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// `MetricsEmitter` backed by the global `metrics` recorder.
#[derive(Debug, Clone, Default)]
pub struct PrometheusEmitter;

impl MetricsEmitter for PrometheusEmitter {
    fn emit(&self, name: &str, value: f64, unit: MetricUnit, timestamp: DateTime<Utc>) {
        gauge!(name.to_string(), "unit" => unit.as_str()).set(value);
        counter!("dr_metric_points_total", "unit" => unit.as_str()).increment(1);
        tracing::trace!(metric = %name, value, unit = unit.as_str(), timestamp = %timestamp, "Metric emitted");
    }
}

/// Unit for a measurement name.
fn unit_for(measurement: &str) -> MetricUnit {
    if measurement.ends_with("_hours") {
        MetricUnit::Hours
    } else {
        MetricUnit::Count
    }
}

/// Emit every measurement and the overall score of a report.
pub fn emit_report(emitter: &dyn MetricsEmitter, report: &HealthReport) {
    for result in &report.subsystem_results {
        for (measurement, value) in &result.measurements {
            let name = format!("dr_backup_{}_{}", result.subsystem.key(), measurement);
            emitter.emit(&name, *value, unit_for(measurement), report.timestamp);
        }
    }
    emitter.emit(
        "dr_backup_health_score",
        report.overall_status.score(),
        MetricUnit::Percent,
        report.timestamp,
    );
    emitter.emit(
        "dr_backup_issues",
        report.all_issues.len() as f64,
        MetricUnit::Count,
        report.timestamp,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{aggregate, SubsystemId, SubsystemResult};
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Capture(Mutex<Vec<(String, f64, MetricUnit)>>);

    impl MetricsEmitter for Capture {
        fn emit(&self, name: &str, value: f64, unit: MetricUnit, _timestamp: DateTime<Utc>) {
            self.0.lock().unwrap().push((name.to_string(), value, unit));
        }
    }

    #[test]
    fn test_emit_report_names_and_units() {
        let mut measurements = BTreeMap::new();
        measurements.insert("latest_age_hours".to_string(), 3.5);
        measurements.insert("primary_snapshots".to_string(), 4.0);
        let report = aggregate(
            vec![SubsystemResult::from_issues(SubsystemId::Database, vec![], measurements)],
            Utc::now(),
        )
        .unwrap();

        let capture = Capture::default();
        emit_report(&capture, &report);
        let points = capture.0.into_inner().unwrap();

        assert_eq!(
            points,
            vec![
                ("dr_backup_database_latest_age_hours".to_string(), 3.5, MetricUnit::Hours),
                ("dr_backup_database_primary_snapshots".to_string(), 4.0, MetricUnit::Count),
                ("dr_backup_health_score".to_string(), 100.0, MetricUnit::Percent),
                ("dr_backup_issues".to_string(), 0.0, MetricUnit::Count),
            ]
        );
    }

    #[test]
    fn test_emitter_without_recorder_is_noop() {
        PrometheusEmitter.emit("dr_backup_health_score", 50.0, MetricUnit::Percent, Utc::now());
    }
}
