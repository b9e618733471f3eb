//! Step and run reports.
//!
//! Every pipeline step returns a [`StepReport`]; the orchestrator folds
//! them into a [`MaintenanceReport`] instead of sharing mutable flags.

use crate::reboot::RebootVerdict;
use crate::retention::RetentionPlan;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pipeline steps in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    ConnectivityCheck,
    DependencyCheck,
    Backup,
    Snapshot,
    RepositoryUpdate,
    PackageUpgrade,
    FlatpakUpdate,
    SnapUpdate,
    FirmwareCheck,
    Cleanup,
    RebootCheck,
}

impl StepKind {
    pub const ALL: [StepKind; 11] = [
        StepKind::ConnectivityCheck,
        StepKind::DependencyCheck,
        StepKind::Backup,
        StepKind::Snapshot,
        StepKind::RepositoryUpdate,
        StepKind::PackageUpgrade,
        StepKind::FlatpakUpdate,
        StepKind::SnapUpdate,
        StepKind::FirmwareCheck,
        StepKind::Cleanup,
        StepKind::RebootCheck,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::ConnectivityCheck => "connectivity",
            StepKind::DependencyCheck => "dependencies",
            StepKind::Backup => "backup",
            StepKind::Snapshot => "snapshot",
            StepKind::RepositoryUpdate => "repo-update",
            StepKind::PackageUpgrade => "upgrade",
            StepKind::FlatpakUpdate => "flatpak",
            StepKind::SnapUpdate => "snap",
            StepKind::FirmwareCheck => "firmware",
            StepKind::Cleanup => "cleanup",
            StepKind::RebootCheck => "reboot-check",
        }
    }

    /// Display title
    pub fn title(&self) -> &'static str {
        match self {
            StepKind::ConnectivityCheck => "Checking network connectivity",
            StepKind::DependencyCheck => "Checking required tools",
            StepKind::Backup => "Backing up configuration",
            StepKind::Snapshot => "Creating system snapshot",
            StepKind::RepositoryUpdate => "Refreshing package lists",
            StepKind::PackageUpgrade => "Upgrading packages",
            StepKind::FlatpakUpdate => "Updating Flatpak applications",
            StepKind::SnapUpdate => "Refreshing Snap packages",
            StepKind::FirmwareCheck => "Checking firmware updates",
            StepKind::Cleanup => "Cleaning up",
            StepKind::RebootCheck => "Checking whether a reboot is needed",
        }
    }

    /// Steps that cannot run without network access
    pub fn needs_network(&self) -> bool {
        matches!(
            self,
            StepKind::RepositoryUpdate
                | StepKind::PackageUpgrade
                | StepKind::FlatpakUpdate
                | StepKind::SnapUpdate
                | StepKind::FirmwareCheck
        )
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        StepKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = StepKind::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown step '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

/// Outcome of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Success,
    Skipped,
    Warning,
    Failed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Success => "ok",
            StepStatus::Skipped => "skipped",
            StepStatus::Warning => "warning",
            StepStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: StepKind,
    pub status: StepStatus,
    /// One-line outcome
    pub summary: String,
    /// Extra lines (packages, paths, reasons)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
    pub duration_ms: u64,
}

impl StepReport {
    pub fn new(step: StepKind, status: StepStatus, summary: impl Into<String>) -> Self {
        Self {
            step,
            status,
            summary: summary.into(),
            details: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn success(step: StepKind, summary: impl Into<String>) -> Self {
        Self::new(step, StepStatus::Success, summary)
    }

    pub fn skipped(step: StepKind, summary: impl Into<String>) -> Self {
        Self::new(step, StepStatus::Skipped, summary)
    }

    pub fn warning(step: StepKind, summary: impl Into<String>) -> Self {
        Self::new(step, StepStatus::Warning, summary)
    }

    pub fn failed(step: StepKind, summary: impl Into<String>) -> Self {
        Self::new(step, StepStatus::Failed, summary)
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.details.push(detail.into());
        self
    }
}

/// Aggregated result of one maintenance run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub dry_run: bool,
    pub steps: Vec<StepReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reboot: Option<RebootVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel_plan: Option<RetentionPlan>,
}

impl MaintenanceReport {
    pub fn new(run_id: impl Into<String>, dry_run: bool) -> Self {
        Self {
            run_id: run_id.into(),
            started_at: Utc::now(),
            finished_at: None,
            dry_run,
            steps: Vec::new(),
            reboot: None,
            kernel_plan: None,
        }
    }

    pub fn push(&mut self, report: StepReport) {
        self.steps.push(report);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn step(&self, kind: StepKind) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.step == kind)
    }

    /// Worst status across all steps
    pub fn overall_status(&self) -> StepStatus {
        self.steps
            .iter()
            .map(|s| s.status)
            .filter(|s| *s != StepStatus::Skipped)
            .max()
            .unwrap_or(StepStatus::Success)
    }

    pub fn count(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }

    pub fn has_failures(&self) -> bool {
        self.count(StepStatus::Failed) > 0
    }

    pub fn reboot_required(&self) -> bool {
        self.reboot.as_ref().is_some_and(|v| v.required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_kind_round_trip_names() {
        for kind in StepKind::ALL {
            assert_eq!(kind.as_str().parse::<StepKind>().unwrap(), kind);
        }
        assert!("bogus".parse::<StepKind>().is_err());
    }

    #[test]
    fn test_steps_are_in_pipeline_order() {
        let mut sorted = StepKind::ALL;
        sorted.sort();
        assert_eq!(sorted, StepKind::ALL);
    }

    #[test]
    fn test_overall_status_is_worst_non_skipped() {
        let mut report = MaintenanceReport::new("run", false);
        assert_eq!(report.overall_status(), StepStatus::Success);

        report.push(StepReport::success(StepKind::ConnectivityCheck, "online"));
        report.push(StepReport::skipped(StepKind::Snapshot, "disabled"));
        assert_eq!(report.overall_status(), StepStatus::Success);

        report.push(StepReport::warning(StepKind::FirmwareCheck, "2 updates"));
        assert_eq!(report.overall_status(), StepStatus::Warning);
        assert!(!report.has_failures());

        report.push(StepReport::failed(StepKind::PackageUpgrade, "dpkg error"));
        assert_eq!(report.overall_status(), StepStatus::Failed);
        assert!(report.has_failures());
    }

    #[test]
    fn test_step_lookup() {
        let mut report = MaintenanceReport::new("run", true);
        report.push(StepReport::success(StepKind::Backup, "saved").with_detail("/etc/apt"));
        let backup = report.step(StepKind::Backup).unwrap();
        assert_eq!(backup.details, vec!["/etc/apt"]);
        assert!(report.step(StepKind::Cleanup).is_none());
    }
}
