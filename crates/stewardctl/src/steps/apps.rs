//! Flatpak and Snap updates

use super::available;
use crate::orchestrator::{Env, Session};
use crate::runner::CommandSpec;
use anyhow::Result;
use steward_common::{StepKind, StepReport};

pub async fn update_flatpak(env: &Env<'_>, session: &mut Session) -> Result<StepReport> {
    const STEP: StepKind = StepKind::FlatpakUpdate;

    if !available(env, session, "flatpak").await {
        return Ok(StepReport::skipped(STEP, "flatpak is not installed"));
    }

    let spec = CommandSpec::new("flatpak")
        .args(["update", "-y", "--noninteractive"])
        .mutating();
    let out = env.exec(&spec).await?;

    if !out.success() {
        return Ok(StepReport::failed(
            STEP,
            format!("flatpak update failed: {}", out.error_line()),
        ));
    }
    if env.dry_run() {
        return Ok(StepReport::success(STEP, "would update Flatpak applications"));
    }
    if out.stdout.contains("Nothing to do") {
        return Ok(StepReport::success(STEP, "Flatpak applications are up to date"));
    }
    Ok(StepReport::success(STEP, "Flatpak applications updated"))
}

pub async fn refresh_snaps(env: &Env<'_>, session: &mut Session) -> Result<StepReport> {
    const STEP: StepKind = StepKind::SnapUpdate;

    if !available(env, session, "snap").await {
        return Ok(StepReport::skipped(STEP, "snap is not installed"));
    }

    let spec = CommandSpec::new("snap").arg("refresh").mutating();
    let out = env.exec(&spec).await?;

    if !out.success() {
        return Ok(StepReport::failed(
            STEP,
            format!("snap refresh failed: {}", out.error_line()),
        ));
    }
    if env.dry_run() {
        return Ok(StepReport::success(STEP, "would refresh Snap packages"));
    }

    // "All snaps up to date." goes to stderr on most releases
    let combined = format!("{}{}", out.stdout, out.stderr);
    if combined.contains("All snaps up to date") {
        return Ok(StepReport::success(STEP, "Snap packages are up to date"));
    }
    let refreshed: Vec<String> = out
        .stdout
        .lines()
        .map(str::trim)
        .filter(|l| l.contains(" refreshed"))
        .map(str::to_string)
        .collect();
    Ok(StepReport::success(STEP, "Snap packages refreshed").with_details(refreshed))
}
