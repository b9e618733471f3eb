//! Logging for stewardctl
//!
//! Two sinks:
//! - `tracing` to stderr, filtered by `RUST_LOG` (default `info`)
//! - an append-only JSON-lines run log, one entry per step plus one per run

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use steward_common::{MaintenanceReport, StepReport};
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber. `--verbose` forces debug.
pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // A second init in tests is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// One line of the run log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLogEntry {
    /// ISO 8601 timestamp
    pub ts: String,
    pub run_id: String,
    /// "step" or "run"
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    pub status: String,
    pub summary: String,
    pub duration_ms: u64,
    #[serde(default)]
    pub dry_run: bool,
}

impl RunLogEntry {
    pub fn for_step(run_id: &str, dry_run: bool, report: &StepReport) -> Self {
        Self {
            ts: Utc::now().to_rfc3339(),
            run_id: run_id.to_string(),
            event: "step".to_string(),
            step: Some(report.step.as_str().to_string()),
            status: report.status.as_str().to_string(),
            summary: report.summary.clone(),
            duration_ms: report.duration_ms,
            dry_run,
        }
    }

    pub fn for_run(report: &MaintenanceReport) -> Self {
        let duration_ms = report
            .finished_at
            .map(|end| (end - report.started_at).num_milliseconds().max(0) as u64)
            .unwrap_or(0);
        let summary = if report.reboot_required() {
            "reboot required".to_string()
        } else {
            format!(
                "{} steps, {} failed",
                report.steps.len(),
                report.count(steward_common::StepStatus::Failed)
            )
        };
        Self {
            ts: Utc::now().to_rfc3339(),
            run_id: report.run_id.clone(),
            event: "run".to_string(),
            step: None,
            status: report.overall_status().as_str().to_string(),
            summary,
            duration_ms,
            dry_run: report.dry_run,
        }
    }
}

/// JSONL run log at a fixed path
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Discover the log path
    ///
    /// Priority:
    /// 1. $STEWARD_LOG_FILE
    /// 2. `log_file` from config
    /// 3. $XDG_STATE_HOME/steward/runs.jsonl
    /// 4. ~/.local/state/steward/runs.jsonl
    pub fn discover(configured: Option<&Path>) -> Option<Self> {
        if let Ok(path) = std::env::var("STEWARD_LOG_FILE") {
            if !path.is_empty() {
                return Some(Self::new(path));
            }
        }
        if let Some(path) = configured {
            return Some(Self::new(path));
        }
        if let Some(state) = dirs::state_dir() {
            return Some(Self::new(state.join("steward").join("runs.jsonl")));
        }
        dirs::home_dir().map(|home| {
            Self::new(
                home.join(".local")
                    .join("state")
                    .join("steward")
                    .join("runs.jsonl"),
            )
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, entry: &RunLogEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string(entry)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))?;
        writeln!(file, "{}", json)?;
        Ok(())
    }

    /// Last `limit` entries, oldest first. Unparseable lines are skipped.
    pub fn read_recent(&self, limit: usize) -> Result<Vec<RunLogEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let entries: Vec<RunLogEntry> = content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect();
        let skip = entries.len().saturating_sub(limit);
        Ok(entries.into_iter().skip(skip).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use steward_common::{StepKind, StepStatus};
    use tempfile::TempDir;

    #[test]
    fn test_append_and_read_recent() {
        let temp = TempDir::new().unwrap();
        let log = RunLog::new(temp.path().join("state").join("runs.jsonl"));

        for i in 0..5 {
            let mut report = StepReport::success(StepKind::Backup, format!("backup {}", i));
            report.duration_ms = i;
            log.append(&RunLogEntry::for_step("run-1", false, &report)).unwrap();
        }

        let recent = log.read_recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].summary, "backup 3");
        assert_eq!(recent[1].summary, "backup 4");
        assert_eq!(recent[1].step.as_deref(), Some("backup"));
        assert_eq!(recent[1].status, "ok");
    }

    #[test]
    fn test_missing_log_is_empty() {
        let temp = TempDir::new().unwrap();
        let log = RunLog::new(temp.path().join("none.jsonl"));
        assert!(log.read_recent(10).unwrap().is_empty());
    }

    #[test]
    fn test_garbage_lines_skipped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("runs.jsonl");
        let log = RunLog::new(&path);
        log.append(&RunLogEntry::for_step(
            "r",
            true,
            &StepReport::skipped(StepKind::SnapUpdate, "not installed"),
        ))
        .unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{ truncated").unwrap();

        let entries = log.read_recent(10).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].dry_run);
    }

    #[test]
    fn test_run_entry_reflects_report() {
        let mut report = MaintenanceReport::new("run-9", false);
        report.push(StepReport::failed(StepKind::PackageUpgrade, "dpkg error"));
        report.finish();
        let entry = RunLogEntry::for_run(&report);
        assert_eq!(entry.event, "run");
        assert_eq!(entry.status, StepStatus::Failed.as_str());
        assert_eq!(entry.summary, "1 steps, 1 failed");
    }

    #[test]
    fn test_configured_path_used() {
        if std::env::var("STEWARD_LOG_FILE").is_ok() {
            return;
        }
        let log = RunLog::discover(Some(Path::new("/tmp/custom.jsonl"))).unwrap();
        assert_eq!(log.path(), Path::new("/tmp/custom.jsonl"));
    }
}
