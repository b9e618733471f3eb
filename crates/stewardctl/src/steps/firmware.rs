use super::available;
use crate::orchestrator::{Env, Session};
use crate::runner::CommandSpec;
use anyhow::Result;
use steward_common::{StepKind, StepReport};
use tracing::debug;

const STEP: StepKind = StepKind::FirmwareCheck;

/// fwupdmgr exits 2 when there is nothing to do
const FWUPD_NOTHING_TO_DO: i32 = 2;

/// Refresh LVFS metadata and look for device updates. Updates are only
/// installed when `firmware.apply` is set.
pub async fn run(env: &Env<'_>, session: &mut Session) -> Result<StepReport> {
    if !available(env, session, "fwupdmgr").await {
        return Ok(StepReport::skipped(STEP, "fwupdmgr is not installed"));
    }

    let mut details = Vec::new();

    let refresh = CommandSpec::new("fwupdmgr").args(["refresh", "--force"]);
    let out = env.exec(&refresh).await?;
    if !out.success() && out.code != Some(FWUPD_NOTHING_TO_DO) {
        details.push(format!("metadata refresh failed: {}", out.error_line()));
    }

    let query = CommandSpec::new("fwupdmgr").arg("get-updates");
    let out = env.exec(&query).await?;
    match out.code {
        Some(FWUPD_NOTHING_TO_DO) => {
            return Ok(StepReport::success(STEP, "no firmware updates").with_details(details));
        }
        Some(0) => {}
        _ => {
            return Ok(StepReport::warning(
                STEP,
                format!("could not query firmware updates: {}", out.error_line()),
            )
            .with_details(details));
        }
    }

    let pending = pending_updates(&out.stdout);
    debug!("{} firmware update line(s)", pending.len());
    details.extend(pending);

    if !env.config.firmware.apply {
        return Ok(StepReport::warning(STEP, "firmware updates available").with_details(details));
    }
    if !env.confirm("Install available firmware updates?") {
        return Ok(StepReport::warning(STEP, "firmware update declined").with_details(details));
    }

    let apply = CommandSpec::new("fwupdmgr")
        .args(["update", "-y", "--no-reboot-check"])
        .mutating();
    let out = env.exec(&apply).await?;
    if !out.success() {
        return Ok(StepReport::failed(
            STEP,
            format!("firmware update failed: {}", out.error_line()),
        )
        .with_details(details));
    }

    let summary = if env.dry_run() {
        "would install firmware updates"
    } else {
        "firmware updates installed"
    };
    Ok(StepReport::success(STEP, summary).with_details(details))
}

/// Device and version lines from `fwupdmgr get-updates`
fn pending_updates(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|l| l.trim_start_matches(['│', '├', '└', '─', ' ']).trim())
        .filter(|l| l.starts_with("New version:") || l.contains('→'))
        .map(str::to_string)
        .collect()
}
