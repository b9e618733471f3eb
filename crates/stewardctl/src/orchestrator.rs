//! Maintenance Orchestrator
//!
//! Runs the fixed step pipeline. Steps share a [`Session`] for facts that
//! later steps depend on (network state, whether an upgrade happened) and
//! each returns a `StepReport`; the orchestrator folds those into the
//! `MaintenanceReport`.

use crate::prompt::Confirm;
use crate::runner::{CommandOutput, CommandRunner, CommandSpec};
use crate::steps;
use std::collections::HashMap;
use std::time::Instant;
use steward_common::{
    Config, MaintenanceReport, RebootVerdict, RetentionPlan, StepKind, StepReport, StewardError,
};
use tracing::{debug, info};
use uuid::Uuid;

/// Per-invocation switches from the command line
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Report what would change; run only read-only commands
    pub dry_run: bool,
    /// Never prompt
    pub unattended: bool,
    pub skip: Vec<StepKind>,
}

/// Facts accumulated while the pipeline runs
#[derive(Debug, Default)]
pub struct Session {
    /// `None` until checked, or when it could not be checked
    pub network_ok: Option<bool>,
    /// Tool availability cache
    pub tools: HashMap<String, bool>,
    pub upgrade_occurred: bool,
    pub upgraded_packages: Vec<String>,
    /// A required snapshot failed
    pub upgrade_blocked: bool,
    /// Required tools missing; nothing else runs
    pub aborted: bool,
    pub kernel_plan: Option<RetentionPlan>,
    pub reboot: Option<RebootVerdict>,
}

/// Progress callbacks, e.g. for a spinner or the run log
pub trait StepObserver: Send + Sync {
    fn step_started(&self, _step: StepKind) {}

    fn step_finished(&self, _run_id: &str, _report: &StepReport) {}

    /// Ask `confirm`; observers that draw on the terminal pause first
    fn prompt(&self, question: &str, confirm: &dyn Confirm) -> bool {
        confirm.confirm(question)
    }
}

pub struct NoopObserver;

impl StepObserver for NoopObserver {}

/// Everything a step may use
pub struct Env<'a> {
    pub runner: &'a dyn CommandRunner,
    pub confirm: &'a dyn Confirm,
    pub observer: &'a dyn StepObserver,
    pub config: &'a Config,
    pub options: &'a RunOptions,
}

impl<'a> Env<'a> {
    /// Run a command. Mutating commands are only logged in dry-run mode.
    pub async fn exec(&self, spec: &CommandSpec) -> Result<CommandOutput, StewardError> {
        if spec.mutating && self.options.dry_run {
            info!("[DRY-RUN] Would run: {}", spec.display());
            return Ok(CommandOutput::ok(""));
        }
        self.runner.run(spec).await
    }

    /// Like [`Env::exec`], but a non-zero exit is an error
    pub async fn exec_checked(&self, spec: &CommandSpec) -> Result<CommandOutput, StewardError> {
        self.exec(spec).await?.into_checked(spec)
    }

    /// Unattended and dry runs never prompt
    pub fn confirm(&self, question: &str) -> bool {
        if self.options.unattended || self.options.dry_run {
            debug!("Auto-confirmed: {}", question);
            return true;
        }
        self.observer.prompt(question, self.confirm)
    }

    pub fn dry_run(&self) -> bool {
        self.options.dry_run
    }
}

pub struct Orchestrator<'a> {
    env: Env<'a>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        confirm: &'a dyn Confirm,
        config: &'a Config,
        options: &'a RunOptions,
    ) -> Self {
        Self {
            env: Env {
                runner,
                confirm,
                observer: &NoopObserver,
                config,
                options,
            },
        }
    }

    pub fn with_observer(mut self, observer: &'a dyn StepObserver) -> Self {
        self.env.observer = observer;
        self
    }

    /// Run every step in order and return the aggregated report
    pub async fn run(&self) -> MaintenanceReport {
        let run_id = Uuid::new_v4().to_string();
        let mut report = MaintenanceReport::new(run_id, self.env.options.dry_run);
        let mut session = Session::default();

        info!(
            "Starting maintenance run {}{}",
            report.run_id,
            if self.env.options.dry_run { " (dry run)" } else { "" }
        );

        for step in StepKind::ALL {
            self.env.observer.step_started(step);
            let started = Instant::now();

            let mut step_report = match self.skip_reason(step, &session) {
                Some(reason) => StepReport::skipped(step, reason),
                None => steps::run_step(step, &self.env, &mut session).await,
            };
            step_report.duration_ms = started.elapsed().as_millis() as u64;

            info!(
                "Step {} finished: {} ({})",
                step, step_report.status, step_report.summary
            );
            self.env.observer.step_finished(&report.run_id, &step_report);
            report.push(step_report);
        }

        report.reboot = session.reboot.take();
        report.kernel_plan = session.kernel_plan.take();
        report.finish();
        report
    }

    fn skip_reason(&self, step: StepKind, session: &Session) -> Option<String> {
        if self.env.options.skip.contains(&step) {
            return Some("skipped on request".to_string());
        }
        if !self.env.config.steps.enabled(step) {
            return Some("disabled in configuration".to_string());
        }
        if session.aborted {
            return Some("required tools missing".to_string());
        }
        if step.needs_network() && session.network_ok == Some(false) {
            return Some("no network connectivity".to_string());
        }
        if session.upgrade_blocked && is_upgrade_step(step) {
            return Some("required snapshot was not created".to_string());
        }
        None
    }
}

/// Steps that change installed software
fn is_upgrade_step(step: StepKind) -> bool {
    matches!(
        step,
        StepKind::PackageUpgrade | StepKind::FlatpakUpdate | StepKind::SnapUpdate
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::AutoConfirm;
    use crate::runner::FakeRunner;

    #[tokio::test]
    async fn test_dry_run_suppresses_mutating_commands() {
        let fake = FakeRunner::new();
        let confirm = AutoConfirm::no();
        let config = Config::default();
        let options = RunOptions {
            dry_run: true,
            ..Default::default()
        };
        let env = Env {
            runner: &fake,
            confirm: &confirm,
            observer: &NoopObserver,
            config: &config,
            options: &options,
        };

        let out = env
            .exec(&CommandSpec::new("apt-get").args(["-y", "autoremove"]).mutating())
            .await
            .unwrap();
        assert!(out.success());
        env.exec(&CommandSpec::new("uname").arg("-r")).await.unwrap();

        assert_eq!(fake.calls(), vec!["uname -r"]);
        // Dry runs never prompt
        assert!(env.confirm("Remove kernels?"));
        assert!(confirm.asked().is_empty());
    }

    #[tokio::test]
    async fn test_confirm_goes_to_prompt_when_attended() {
        let fake = FakeRunner::new();
        let confirm = AutoConfirm::no();
        let config = Config::default();
        let options = RunOptions::default();
        let env = Env {
            runner: &fake,
            confirm: &confirm,
            observer: &NoopObserver,
            config: &config,
            options: &options,
        };
        assert!(!env.confirm("Upgrade 3 packages?"));
        assert_eq!(confirm.asked(), vec!["Upgrade 3 packages?"]);
    }

    #[test]
    fn test_upgrade_steps() {
        assert!(is_upgrade_step(StepKind::PackageUpgrade));
        assert!(!is_upgrade_step(StepKind::RepositoryUpdate));
        assert!(!is_upgrade_step(StepKind::RebootCheck));
    }
}
