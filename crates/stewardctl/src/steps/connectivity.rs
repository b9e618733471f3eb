use crate::orchestrator::{Env, Session};
use crate::runner::CommandSpec;
use anyhow::Result;
use steward_common::{StepKind, StepReport, StewardError};

const STEP: StepKind = StepKind::ConnectivityCheck;

/// One ping to the configured mirror host
pub async fn run(env: &Env<'_>, session: &mut Session) -> Result<StepReport> {
    let host = &env.config.connectivity_host;
    let spec = CommandSpec::new("ping").args(["-c", "1", "-W", "3", host.as_str()]);

    match env.exec(&spec).await {
        Ok(out) if out.success() => {
            session.network_ok = Some(true);
            Ok(StepReport::success(STEP, format!("{} is reachable", host)))
        }
        Ok(out) => {
            session.network_ok = Some(false);
            Ok(StepReport::failed(STEP, format!("{} is unreachable", host))
                .with_detail(out.error_line())
                .with_detail("network-dependent steps will be skipped"))
        }
        Err(StewardError::Timeout(..)) => {
            session.network_ok = Some(false);
            Ok(StepReport::failed(STEP, format!("ping to {} timed out", host)))
        }
        Err(StewardError::ToolNotFound(_)) => Ok(StepReport::warning(
            STEP,
            "ping is not installed; connectivity unknown",
        )),
        Err(e) => Err(e.into()),
    }
}
