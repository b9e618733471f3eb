//! Terminal output - ASCII status tags, colour only on a terminal

use crate::lock::RunLock;
use crate::logging::{RunLog, RunLogEntry};
use crate::orchestrator::StepObserver;
use crate::progress::ProgressIndicator;
use crate::prompt::Confirm;
use owo_colors::OwoColorize;
use std::sync::Mutex;
use steward_common::{
    InstalledKernelSet, MaintenanceReport, RebootVerdict, RetentionPlan, StepKind, StepReport,
    StepStatus,
};
use tracing::warn;

pub const SEPARATOR: &str = "------------------------------------------------------------";

fn color_enabled() -> bool {
    console::colors_enabled() && std::env::var_os("NO_COLOR").is_none()
}

/// `[OK]`, `[WARN]`, ... coloured when the terminal allows it
pub fn status_tag(status: StepStatus) -> String {
    let tag = match status {
        StepStatus::Success => "[OK]  ",
        StepStatus::Skipped => "[SKIP]",
        StepStatus::Warning => "[WARN]",
        StepStatus::Failed => "[FAIL]",
    };
    if !color_enabled() {
        return tag.to_string();
    }
    match status {
        StepStatus::Success => tag.bright_green().to_string(),
        StepStatus::Skipped => tag.dimmed().to_string(),
        StepStatus::Warning => tag.yellow().to_string(),
        StepStatus::Failed => tag.bright_red().to_string(),
    }
}

/// One line per step plus indented details
pub fn format_step(report: &StepReport) -> String {
    let mut out = format!(
        "{} {:<13} {}",
        status_tag(report.status),
        report.step.as_str(),
        report.summary
    );
    for detail in &report.details {
        out.push_str("\n         ");
        out.push_str(detail);
    }
    out
}

pub fn format_verdict(verdict: &RebootVerdict) -> String {
    let mut lines = Vec::new();
    if verdict.required {
        let head = "Reboot required";
        lines.push(if color_enabled() {
            head.yellow().bold().to_string()
        } else {
            head.to_string()
        });
        for reason in verdict.reason_messages() {
            lines.push(format!("  * {}", reason));
        }
    } else {
        lines.push("No reboot needed".to_string());
    }
    for advisory in &verdict.advisories {
        lines.push(format!("  [NOTE] {}", advisory));
    }
    lines.join("\n")
}

pub fn format_plan(plan: &RetentionPlan, kernels: Option<&InstalledKernelSet>) -> String {
    let mut lines = Vec::new();
    if let Some(set) = kernels {
        lines.push(format!("Running kernel: {}", set.running()));
    }
    for id in plan.keep.iter().rev() {
        let marker = match kernels {
            Some(set) if set.running() == id => " (running)",
            _ => "",
        };
        lines.push(format!("  keep    {}{}", id, marker));
    }
    for id in plan.remove.iter().rev() {
        lines.push(format!("  remove  {}", id));
    }
    if plan.is_noop() {
        lines.push("Nothing to remove".to_string());
    }
    lines.join("\n")
}

pub fn format_report(report: &MaintenanceReport) -> String {
    let mut out = String::new();
    out.push_str(SEPARATOR);
    out.push('\n');
    out.push_str(&format!(
        "Run {}{}\n",
        report.run_id,
        if report.dry_run { " (dry run)" } else { "" }
    ));
    out.push_str(&format!(
        "{} ok, {} warning, {} failed, {} skipped\n",
        report.count(StepStatus::Success),
        report.count(StepStatus::Warning),
        report.count(StepStatus::Failed),
        report.count(StepStatus::Skipped)
    ));
    if let Some(plan) = &report.kernel_plan {
        if !plan.is_noop() {
            let removed: Vec<&str> = plan.remove.iter().map(|k| k.as_str()).collect();
            out.push_str(&format!("Old kernels: {}\n", removed.join(", ")));
        }
    }
    if let Some(verdict) = &report.reboot {
        out.push_str(&format_verdict(verdict));
        out.push('\n');
    }
    out.push_str(SEPARATOR);
    out
}

pub fn display_error(message: &str) {
    if color_enabled() {
        eprintln!("[ERROR] {}", message.red());
    } else {
        eprintln!("[ERROR] {}", message);
    }
}

/// Draws a spinner per step, prints step results and appends them to the
/// run log. `quiet` suppresses terminal output (for `--json`).
pub struct ConsoleObserver<'a> {
    progress: Mutex<Option<ProgressIndicator>>,
    run_log: Option<RunLog>,
    lock: Option<&'a RunLock>,
    dry_run: bool,
    quiet: bool,
}

impl<'a> ConsoleObserver<'a> {
    pub fn new(run_log: Option<RunLog>, lock: Option<&'a RunLock>, dry_run: bool, quiet: bool) -> Self {
        Self {
            progress: Mutex::new(None),
            run_log,
            lock,
            dry_run,
            quiet,
        }
    }

    pub fn log_run(&self, report: &MaintenanceReport) {
        if let Some(log) = &self.run_log {
            if let Err(e) = log.append(&RunLogEntry::for_run(report)) {
                warn!("Run log not written: {:#}", e);
            }
        }
    }
}

impl StepObserver for ConsoleObserver<'_> {
    fn step_started(&self, step: StepKind) {
        if let Some(lock) = self.lock {
            if let Err(e) = lock.update_step(step.as_str()) {
                warn!("Could not update lock file: {}", e);
            }
        }
        if self.quiet {
            return;
        }
        if let Ok(mut slot) = self.progress.lock() {
            *slot = Some(ProgressIndicator::new(step.title()));
        }
    }

    fn step_finished(&self, run_id: &str, report: &StepReport) {
        if let Ok(mut slot) = self.progress.lock() {
            if let Some(mut progress) = slot.take() {
                progress.finish();
            }
        }
        if !self.quiet {
            println!("{}", format_step(report));
        }
        if let Some(log) = &self.run_log {
            if let Err(e) = log.append(&RunLogEntry::for_step(run_id, self.dry_run, report)) {
                warn!("Run log not written: {:#}", e);
            }
        }
    }

    fn prompt(&self, question: &str, confirm: &dyn Confirm) -> bool {
        match self.progress.lock() {
            Ok(slot) => match slot.as_ref() {
                Some(progress) => progress.suspend(|| confirm.confirm(question)),
                None => confirm.confirm(question),
            },
            Err(_) => confirm.confirm(question),
        }
    }
}
