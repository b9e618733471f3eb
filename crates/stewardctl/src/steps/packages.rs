//! APT repository refresh and distribution upgrade

use crate::orchestrator::{Env, Session};
use crate::runner::CommandSpec;
use anyhow::{Context, Result};
use steward_common::parsers::parse_apt_simulation;
use steward_common::{StepKind, StepReport};
use tracing::info;

/// Details list at most this many package names
const MAX_LISTED_PACKAGES: usize = 25;

pub fn upgrade_command() -> CommandSpec {
    CommandSpec::new("apt-get")
        .args(["-y", "-o", "Dpkg::Options::=--force-confold", "dist-upgrade"])
        .env("DEBIAN_FRONTEND", "noninteractive")
        .mutating()
}

/// `apt-get update`; `W:` and `E:` lines are surfaced
pub async fn update_repositories(env: &Env<'_>) -> Result<StepReport> {
    const STEP: StepKind = StepKind::RepositoryUpdate;

    let spec = CommandSpec::new("apt-get").arg("update").mutating();
    let out = env.exec(&spec).await?;

    let notices: Vec<String> = out
        .stdout
        .lines()
        .chain(out.stderr.lines())
        .map(str::trim)
        .filter(|l| l.starts_with("W:") || l.starts_with("E:"))
        .map(str::to_string)
        .collect();

    if !out.success() {
        return Ok(StepReport::failed(
            STEP,
            format!("apt-get update failed: {}", out.error_line()),
        )
        .with_details(notices));
    }
    if env.dry_run() {
        return Ok(StepReport::success(STEP, "would refresh package lists"));
    }
    if !notices.is_empty() {
        return Ok(StepReport::warning(
            STEP,
            format!("package lists refreshed with {} notice(s)", notices.len()),
        )
        .with_details(notices));
    }
    Ok(StepReport::success(STEP, "package lists refreshed"))
}

/// Simulate, confirm, then `apt-get dist-upgrade`
pub async fn upgrade(env: &Env<'_>, session: &mut Session) -> Result<StepReport> {
    const STEP: StepKind = StepKind::PackageUpgrade;

    let simulate = CommandSpec::new("apt-get").args(["-s", "dist-upgrade"]);
    let out = env
        .exec_checked(&simulate)
        .await
        .context("simulating upgrade")?;
    let sim = parse_apt_simulation(&out.stdout)?;

    if !sim.has_changes() {
        return Ok(StepReport::success(STEP, "system is up to date"));
    }

    let mut details: Vec<String> = sim
        .packages
        .iter()
        .take(MAX_LISTED_PACKAGES)
        .cloned()
        .collect();
    if sim.packages.len() > MAX_LISTED_PACKAGES {
        details.push(format!("... and {} more", sim.packages.len() - MAX_LISTED_PACKAGES));
    }

    let question = format!(
        "Upgrade {} package(s) ({} new, {} to remove)?",
        sim.upgraded, sim.newly_installed, sim.to_remove
    );
    if !env.confirm(&question) {
        return Ok(StepReport::skipped(STEP, "upgrade declined").with_details(details));
    }

    let upgrade = upgrade_command();
    let out = env.exec(&upgrade).await?;
    if !out.success() {
        return Ok(StepReport::failed(
            STEP,
            format!("dist-upgrade failed: {}", out.error_line()),
        )
        .with_details(details));
    }

    session.upgraded_packages = sim.packages.clone();
    if env.dry_run() {
        return Ok(StepReport::success(
            STEP,
            format!("would upgrade {} package(s)", sim.upgraded),
        )
        .with_details(details));
    }

    session.upgrade_occurred = true;
    info!("Upgraded {} packages", sim.upgraded);
    Ok(StepReport::success(
        STEP,
        format!(
            "{} upgraded, {} newly installed, {} removed",
            sim.upgraded, sim.newly_installed, sim.to_remove
        ),
    )
    .with_details(details))
}
