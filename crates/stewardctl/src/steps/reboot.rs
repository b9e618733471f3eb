//! Reboot check: gathers facts, then asks the inference engine.

use super::available;
use super::cleanup::query_kernels;
use crate::orchestrator::{Env, Session};
use crate::runner::CommandSpec;
use anyhow::Result;
use steward_common::parsers::{parse_failed_units, parse_needrestart};
use steward_common::{evaluate, RebootFacts, StepKind, StepReport};
use tracing::{debug, warn};

const STEP: StepKind = StepKind::RebootCheck;

/// Collect everything the engine needs. Probes that fail leave their fact
/// unset instead of failing the check.
pub async fn collect_reboot_facts(env: &Env<'_>, session: &mut Session) -> Result<RebootFacts> {
    let marker = &env.config.reboot.marker_path;
    let mut facts = RebootFacts {
        marker_present: marker.exists(),
        upgrade_occurred: session.upgrade_occurred,
        ..Default::default()
    };
    debug!("Reboot marker {}: {}", marker.display(), facts.marker_present);

    if available(env, session, "systemctl").await {
        let spec = CommandSpec::new("systemctl").args(["list-units", "--failed", "--no-legend", "--plain"]);
        match env.exec_checked(&spec).await {
            Ok(out) => facts.failed_units = parse_failed_units(&out.stdout),
            Err(e) => warn!("Could not list failed units: {}", e),
        }
    }

    if available(env, session, "needrestart").await {
        let spec = CommandSpec::new("needrestart").arg("-b");
        match env.exec_checked(&spec).await {
            Ok(out) => match parse_needrestart(&out.stdout) {
                Ok(report) => facts.needrestart = Some(report),
                Err(e) => warn!("Ignoring needrestart output: {}", e),
            },
            Err(e) => warn!("needrestart failed: {}", e),
        }
    }

    match query_kernels(env).await {
        Ok(kernels) => {
            facts.uname_release = Some(kernels.running().to_string());
            facts.newest_installed = kernels.newest().cloned();
        }
        Err(e) => warn!("Could not compare kernels: {:#}", e),
    }

    Ok(facts)
}

pub async fn run(env: &Env<'_>, session: &mut Session) -> Result<StepReport> {
    let facts = collect_reboot_facts(env, session).await?;
    let signals = facts.to_signals(&env.config.reboot.critical_units);
    let verdict = evaluate(&signals);

    let mut details: Vec<String> = verdict
        .reason_messages()
        .into_iter()
        .map(str::to_string)
        .collect();
    details.extend(verdict.advisories.iter().map(|a| a.to_string()));

    let report = if verdict.required {
        StepReport::warning(STEP, "reboot required")
    } else {
        StepReport::success(STEP, "no reboot needed")
    };
    session.reboot = Some(verdict);
    Ok(report.with_details(details))
}
