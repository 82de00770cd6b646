//! Plain-text rendering of health reports for notifications.

use std::fmt::Write;

use crate::health::aggregator::HealthReport;
use crate::health::facts::SubsystemId;
use crate::health::severity::HealthStatus;

const RULE: &str = "==================================================";

/// A rendered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    pub body: String,
}

fn tag(status: HealthStatus) -> String {
    format!("[{}]", status.as_str().to_uppercase())
}

fn measurement(report: &HealthReport, subsystem: SubsystemId, name: &str) -> String {
    report
        .result(subsystem)
        .and_then(|r| r.measurement(name))
        .map(|v| {
            if v.fract() == 0.0 {
                format!("{}", v as i64)
            } else {
                format!("{:.1}", v)
            }
        })
        .unwrap_or_else(|| "N/A".to_string())
}

fn enabled(report: &HealthReport, subsystem: SubsystemId, name: &str) -> &'static str {
    match report.result(subsystem).and_then(|r| r.measurement(name)) {
        Some(v) if v > 0.0 => "enabled",
        Some(_) => "disabled",
        None => "N/A",
    }
}

fn write_status_block(body: &mut String, report: &HealthReport) {
    use SubsystemId::*;
    let _ = writeln!(body, "Database backups:");
    let _ = writeln!(body, "  Primary snapshots: {}", measurement(report, Database, "primary_snapshots"));
    let _ = writeln!(body, "  Secondary snapshots: {}", measurement(report, Database, "secondary_snapshots"));
    let _ = writeln!(body, "  Automated backups: {}", enabled(report, Database, "backup_enabled"));
    let _ = writeln!(body, "  Latest snapshot age: {} hours", measurement(report, Database, "latest_age_hours"));
    let _ = writeln!(body);
    let _ = writeln!(body, "Object storage replication:");
    let _ = writeln!(body, "  Primary objects: {}", measurement(report, ObjectStorage, "primary_objects"));
    let _ = writeln!(body, "  Secondary objects: {}", measurement(report, ObjectStorage, "secondary_objects"));
    let _ = writeln!(body, "  Replication: {}", enabled(report, ObjectStorage, "replication_enabled"));
    let _ = writeln!(body, "  Versioning: {}", enabled(report, ObjectStorage, "versioning_enabled"));
    let _ = writeln!(body);
    let _ = writeln!(body, "Machine image backups:");
    let _ = writeln!(body, "  Primary images: {}", measurement(report, MachineImage, "primary_images"));
    let _ = writeln!(body, "  Secondary images: {}", measurement(report, MachineImage, "secondary_images"));
    let _ = writeln!(body, "  Lifecycle policies: {}", enabled(report, MachineImage, "lifecycle_policy_enabled"));
    let _ = writeln!(body, "  Latest image age: {} hours", measurement(report, MachineImage, "latest_age_hours"));
}

/// Alert listing every issue, in report order.
pub fn alert(report: &HealthReport) -> Message {
    let mut body = String::new();
    let _ = writeln!(body, "{} Disaster recovery backup alert", tag(report.overall_status));
    let _ = writeln!(body);
    let _ = writeln!(body, "Timestamp: {}", report.timestamp.to_rfc3339());
    let _ = writeln!(body, "Overall status: {}", report.overall_status.as_str().to_uppercase());
    let _ = writeln!(body);
    let _ = writeln!(body, "{}\nISSUES DETECTED\n{}", RULE, RULE);
    for issue in &report.all_issues {
        let _ = writeln!(body, "- [{}] {}: {}", issue.severity, issue.subsystem, issue.message);
    }
    let _ = writeln!(body);
    let _ = writeln!(body, "{}\nBACKUP STATUS\n{}", RULE, RULE);
    write_status_block(&mut body, report);
    let _ = writeln!(body);
    let _ = writeln!(body, "Action required: investigate and resolve the issues above.");

    Message {
        subject: format!("{} Backup status alert", tag(report.overall_status)),
        body,
    }
}

/// Full report, sent regardless of verdict.
pub fn summary(report: &HealthReport) -> Message {
    let date = report.timestamp.format("%Y-%m-%d");
    let mut body = String::new();
    let _ = writeln!(body, "{} Daily disaster recovery backup report", tag(report.overall_status));
    let _ = writeln!(body);
    let _ = writeln!(body, "Date: {}", date);
    let _ = writeln!(body, "Overall status: {}", report.overall_status.as_str().to_uppercase());
    let _ = writeln!(body, "Issues: {}", report.all_issues.len());
    let _ = writeln!(body);
    let _ = writeln!(body, "{}", RULE);
    write_status_block(&mut body, report);
    let _ = writeln!(body, "{}", RULE);

    Message {
        subject: format!("{} Daily backup report - {}", tag(report.overall_status), date),
        body,
    }
}

/// Message for an evaluation that could not complete.
pub fn internal_failure(cause: &str) -> Message {
    Message {
        subject: "Backup monitor error".to_string(),
        body: format!("Error in backup monitor: {}", cause),
    }
}
