use super::available;
use crate::orchestrator::{Env, Session};
use crate::runner::CommandSpec;
use anyhow::Result;
use steward_common::{StepKind, StepReport};
use tracing::warn;

const STEP: StepKind = StepKind::Snapshot;

/// Timeshift snapshot before touching packages. When snapshots are
/// required, any failure blocks the upgrade steps.
pub async fn run(env: &Env<'_>, session: &mut Session) -> Result<StepReport> {
    let cfg = &env.config.snapshot;

    if !available(env, session, "timeshift").await {
        if cfg.required {
            session.upgrade_blocked = true;
            return Ok(StepReport::failed(
                STEP,
                "timeshift is not installed but snapshots are required",
            ));
        }
        return Ok(StepReport::skipped(STEP, "timeshift is not installed"));
    }

    let spec = CommandSpec::new("timeshift")
        .args(["--create", "--scripted", "--comments", cfg.comment.as_str()])
        .mutating();

    match env.exec_checked(&spec).await {
        Ok(_) if env.dry_run() => Ok(StepReport::success(STEP, "would create a snapshot")),
        Ok(_) => Ok(StepReport::success(STEP, "snapshot created")),
        Err(e) if cfg.required => {
            warn!("Required snapshot failed: {}", e);
            session.upgrade_blocked = true;
            Ok(StepReport::failed(STEP, format!("snapshot failed: {}", e))
                .with_detail("upgrades are skipped until a snapshot succeeds"))
        }
        Err(e) => Ok(StepReport::warning(STEP, format!("snapshot failed: {}", e))),
    }
}
