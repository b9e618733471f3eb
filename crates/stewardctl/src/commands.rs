//! Subcommand handlers. Each returns the process exit code.

use crate::cli::{Cli, Command, ConfigAction};
use crate::display::{display_error, format_plan, format_report, format_verdict, ConsoleObserver};
use crate::errors::{exit_code_for, EXIT_LOCK_HELD, EXIT_NOT_ROOT, EXIT_REBOOT_REQUIRED, EXIT_SUCCESS};
use crate::lock::{LockError, RunLock};
use crate::logging::RunLog;
use crate::orchestrator::{Env, NoopObserver, Orchestrator, RunOptions, Session};
use crate::prompt::TerminalConfirm;
use crate::runner::SystemRunner;
use crate::steps::cleanup::query_kernels;
use crate::steps::reboot::collect_reboot_facts;
use anyhow::{Context, Result};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use steward_common::config::CONFIG_PATH;
use steward_common::{evaluate, Config, KernelRetentionPlanner, StepKind};
use tracing::debug;

pub async fn dispatch(cli: Cli) -> Result<i32> {
    // init must work even when the current file is broken
    if let Command::Config {
        action: ConfigAction::Init { force },
    } = cli.command
    {
        return config_init(cli.config.as_deref(), force);
    }

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Run {
            unattended,
            dry_run,
            skip,
            json,
        } => run(&config, unattended, dry_run, skip, json).await,
        Command::RebootCheck { json } => reboot_check(&config, json).await,
        Command::Kernels { keep, json } => kernels(&config, keep, json).await,
        Command::Config { .. } => config_show(&config),
        Command::Log { limit } => log_show(&config, limit),
    }
}

/// An explicit path must load; otherwise fall back through the search path
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => Config::load_from_path(p)
            .with_context(|| format!("loading config {}", p.display())),
        None => Ok(Config::load()),
    }
}

fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail
    unsafe { libc::geteuid() == 0 }
}

fn system_runner(config: &Config) -> SystemRunner {
    SystemRunner::new(Duration::from_secs(config.command_timeout_secs))
}

pub async fn run(
    config: &Config,
    unattended: bool,
    dry_run: bool,
    skip: Vec<StepKind>,
    json: bool,
) -> Result<i32> {
    if !dry_run && !is_root() {
        display_error("stewardctl run must be run as root (or with --dry-run)");
        return Ok(EXIT_NOT_ROOT);
    }

    // Dry runs change nothing and need no lock
    let lock = if dry_run {
        None
    } else {
        match RunLock::acquire(&config.lock_path, "start") {
            Ok(lock) => Some(lock),
            Err(e @ LockError::AlreadyLocked { .. }) => {
                display_error(&e.to_string());
                return Ok(EXIT_LOCK_HELD);
            }
            Err(e) => return Err(e).context("acquiring run lock"),
        }
    };

    let options = RunOptions {
        dry_run,
        unattended: unattended || config.unattended,
        skip,
    };
    let runner = system_runner(config);
    let confirm = TerminalConfirm;
    let run_log = RunLog::discover(config.log_file.as_deref());
    if let Some(log) = &run_log {
        debug!("Run log: {}", log.path().display());
    }
    let observer = ConsoleObserver::new(run_log, lock.as_ref(), dry_run, json);

    let report = Orchestrator::new(&runner, &confirm, config, &options)
        .with_observer(&observer)
        .run()
        .await;
    observer.log_run(&report);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", format_report(&report));
    }
    Ok(exit_code_for(&report))
}

pub async fn reboot_check(config: &Config, json: bool) -> Result<i32> {
    let runner = system_runner(config);
    let options = RunOptions {
        dry_run: true,
        ..Default::default()
    };
    let env = Env {
        runner: &runner,
        confirm: &TerminalConfirm,
        observer: &NoopObserver,
        config,
        options: &options,
    };
    let mut session = Session::default();

    let facts = collect_reboot_facts(&env, &mut session).await?;
    let signals = facts.to_signals(&config.reboot.critical_units);
    let verdict = evaluate(&signals);

    if json {
        let out = json!({ "signals": signals, "verdict": verdict });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", format_verdict(&verdict));
    }

    Ok(if verdict.required {
        EXIT_REBOOT_REQUIRED
    } else {
        EXIT_SUCCESS
    })
}

pub async fn kernels(config: &Config, keep: Option<usize>, json: bool) -> Result<i32> {
    let planner = KernelRetentionPlanner::new(keep.unwrap_or(config.keep_kernels))?;

    let runner = system_runner(config);
    let options = RunOptions {
        dry_run: true,
        ..Default::default()
    };
    let env = Env {
        runner: &runner,
        confirm: &TerminalConfirm,
        observer: &NoopObserver,
        config,
        options: &options,
    };

    let set = query_kernels(&env).await?;
    let plan = planner.plan(&set);

    if json {
        let out = json!({
            "running": set.running(),
            "installed": set.installed(),
            "keep_count": planner.keep_count(),
            "plan": plan,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", format_plan(&plan, Some(&set)));
    }
    Ok(EXIT_SUCCESS)
}

pub fn config_show(config: &Config) -> Result<i32> {
    print!("{}", config.to_toml()?);
    Ok(EXIT_SUCCESS)
}

pub fn config_init(path: Option<&Path>, force: bool) -> Result<i32> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(CONFIG_PATH));
    Config::save_default(&path, force)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(EXIT_SUCCESS)
}

pub fn log_show(config: &Config, limit: usize) -> Result<i32> {
    let Some(log) = RunLog::discover(config.log_file.as_deref()) else {
        println!("No run log location available");
        return Ok(EXIT_SUCCESS);
    };

    let entries = log.read_recent(limit)?;
    if entries.is_empty() {
        println!("No run log entries in {}", log.path().display());
        return Ok(EXIT_SUCCESS);
    }

    for entry in entries {
        let run_id: String = entry.run_id.chars().take(8).collect();
        println!(
            "{}  {}  {:<12} {:<8} {}{}",
            entry.ts,
            run_id,
            entry.step.as_deref().unwrap_or("(run)"),
            entry.status,
            entry.summary,
            if entry.dry_run { " [dry run]" } else { "" }
        );
    }
    Ok(EXIT_SUCCESS)
}
