//! Package cleanup and kernel retention

use crate::orchestrator::{Env, Session};
use crate::runner::CommandSpec;
use anyhow::{Context, Result};
use steward_common::parsers::{parse_installed_kernels, KERNEL_QUERY_FORMAT};
use steward_common::{InstalledKernelSet, KernelRetentionPlanner, StepKind, StepReport, StewardError};
use tracing::{debug, info};

const STEP: StepKind = StepKind::Cleanup;

pub fn kernel_query() -> CommandSpec {
    CommandSpec::new("dpkg-query").args(["-W", "-f", KERNEL_QUERY_FORMAT, "linux-image-[0-9]*"])
}

/// Installed kernel images and the running release
pub async fn query_kernels(env: &Env<'_>) -> Result<InstalledKernelSet> {
    let out = env.exec(&kernel_query()).await?;
    // dpkg-query exits 1 when the pattern matches nothing
    if !out.success() && out.code != Some(1) {
        return Err(StewardError::CommandFailed {
            command: kernel_query().display(),
            code: out.code,
            stderr: out.error_line(),
        }
        .into());
    }
    let installed = parse_installed_kernels(&out.stdout);

    let uname = CommandSpec::new("uname").arg("-r");
    let running = env
        .exec_checked(&uname)
        .await
        .context("reading running kernel")?;
    let running = running.stdout.trim();
    debug!("Running kernel {}, {} images installed", running, installed.len());

    Ok(InstalledKernelSet::new(installed, running))
}

pub async fn run(env: &Env<'_>, session: &mut Session) -> Result<StepReport> {
    let mut details = Vec::new();
    let mut degraded = false;

    let autoremove = CommandSpec::new("apt-get").args(["-y", "autoremove"]).mutating();
    if let Err(e) = env.exec_checked(&autoremove).await {
        details.push(format!("autoremove failed: {}", e));
        degraded = true;
    }
    let autoclean = CommandSpec::new("apt-get").arg("autoclean").mutating();
    if let Err(e) = env.exec_checked(&autoclean).await {
        details.push(format!("autoclean failed: {}", e));
        degraded = true;
    }

    let planner = KernelRetentionPlanner::new(env.config.keep_kernels)?;
    let kernels = query_kernels(env).await?;
    let plan = planner.plan(&kernels);

    let summary = if plan.is_noop() {
        details.push(format!(
            "keeping {} kernel(s): {}",
            plan.keep.len(),
            join_ids(plan.keep.iter())
        ));
        "no old kernels to remove".to_string()
    } else {
        let packages = plan.removal_packages();
        let question = format!(
            "Remove {} old kernel(s): {}?",
            packages.len(),
            join_ids(plan.remove.iter())
        );
        if !env.confirm(&question) {
            details.push("kernel removal declined".to_string());
            session.kernel_plan = Some(plan);
            return Ok(StepReport::success(STEP, "cleanup done; old kernels kept")
                .with_details(details));
        }

        let purge = CommandSpec::new("apt-get")
            .args(["-y", "purge"])
            .args(packages.iter().cloned())
            .env("DEBIAN_FRONTEND", "noninteractive")
            .mutating();
        let out = env.exec(&purge).await?;
        if !out.success() {
            session.kernel_plan = Some(plan);
            return Ok(StepReport::failed(
                STEP,
                format!("kernel purge failed: {}", out.error_line()),
            )
            .with_details(details));
        }

        info!("Removed kernels: {}", packages.join(", "));
        details.extend(packages.iter().map(|p| format!("purged {}", p)));
        if env.dry_run() {
            format!("would remove {} old kernel(s)", packages.len())
        } else {
            format!("removed {} old kernel(s)", packages.len())
        }
    };

    session.kernel_plan = Some(plan);
    let report = if degraded {
        StepReport::warning(STEP, summary)
    } else {
        StepReport::success(STEP, summary)
    };
    Ok(report.with_details(details))
}

fn join_ids<'a, I>(ids: I) -> String
where
    I: Iterator<Item = &'a steward_common::KernelIdentifier>,
{
    ids.map(|k| k.as_str()).collect::<Vec<_>>().join(", ")
}
