use super::available;
use crate::orchestrator::{Env, Session};
use anyhow::Result;
use std::path::Path;
use steward_common::{StepKind, StepReport};
use sysinfo::Disks;
use tracing::debug;

const STEP: StepKind = StepKind::DependencyCheck;

/// Without these nothing else can run
pub const REQUIRED_TOOLS: &[&str] = &["apt-get", "dpkg", "dpkg-query", "uname"];

/// Steps using these are skipped when absent
pub const OPTIONAL_TOOLS: &[&str] = &[
    "timeshift",
    "flatpak",
    "snap",
    "fwupdmgr",
    "needrestart",
    "systemctl",
];

pub async fn run(env: &Env<'_>, session: &mut Session) -> Result<StepReport> {
    let mut missing = Vec::new();
    for tool in REQUIRED_TOOLS {
        if !available(env, session, tool).await {
            missing.push(*tool);
        }
    }
    if !missing.is_empty() {
        session.aborted = true;
        return Ok(StepReport::failed(
            STEP,
            format!("missing required tools: {}", missing.join(", ")),
        )
        .with_detail("remaining steps will be skipped"));
    }

    let mut present = Vec::new();
    let mut absent = Vec::new();
    for tool in OPTIONAL_TOOLS {
        if available(env, session, tool).await {
            present.push(*tool);
        } else {
            absent.push(*tool);
        }
    }

    let mut details = Vec::new();
    if !present.is_empty() {
        details.push(format!("available: {}", present.join(", ")));
    }
    if !absent.is_empty() {
        details.push(format!("not installed: {}", absent.join(", ")));
    }

    let min_free = env.config.min_free_space_mb;
    if min_free > 0 {
        if let Some(free) = free_space_mb(Path::new("/")) {
            debug!("Free space on /: {} MiB", free);
            if free < min_free {
                return Ok(StepReport::warning(
                    STEP,
                    format!("only {} MiB free on / (want {} MiB)", free, min_free),
                )
                .with_details(details));
            }
            details.push(format!("{} MiB free on /", free));
        }
    }

    Ok(StepReport::success(STEP, "required tools present").with_details(details))
}

/// Available space on the filesystem mounted at `mount_point`
pub fn free_space_mb(mount_point: &Path) -> Option<u64> {
    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .find(|d| d.mount_point() == mount_point)
        .map(|d| d.available_space() / (1024 * 1024))
}
