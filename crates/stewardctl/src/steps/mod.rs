//! Pipeline steps.
//!
//! Each step turns expected problems (tool missing, nothing to do) into a
//! report status itself; an `Err` means something unexpected and becomes a
//! Failed report.

pub mod apps;
pub mod backup;
pub mod cleanup;
pub mod connectivity;
pub mod dependencies;
pub mod firmware;
pub mod packages;
pub mod reboot;
pub mod snapshot;

use crate::orchestrator::{Env, Session};
use steward_common::{StepKind, StepReport};
use tracing::warn;

pub async fn run_step(step: StepKind, env: &Env<'_>, session: &mut Session) -> StepReport {
    let result = match step {
        StepKind::ConnectivityCheck => connectivity::run(env, session).await,
        StepKind::DependencyCheck => dependencies::run(env, session).await,
        StepKind::Backup => backup::run(env, session).await,
        StepKind::Snapshot => snapshot::run(env, session).await,
        StepKind::RepositoryUpdate => packages::update_repositories(env).await,
        StepKind::PackageUpgrade => packages::upgrade(env, session).await,
        StepKind::FlatpakUpdate => apps::update_flatpak(env, session).await,
        StepKind::SnapUpdate => apps::refresh_snaps(env, session).await,
        StepKind::FirmwareCheck => firmware::run(env, session).await,
        StepKind::Cleanup => cleanup::run(env, session).await,
        StepKind::RebootCheck => reboot::run(env, session).await,
    };

    result.unwrap_or_else(|e| {
        warn!("Step {} failed: {:#}", step, e);
        StepReport::failed(step, format!("{:#}", e))
    })
}

/// Whether `program` is installed, asking the runner at most once per run
pub(crate) async fn available(env: &Env<'_>, session: &mut Session, program: &str) -> bool {
    if let Some(found) = session.tools.get(program) {
        return *found;
    }
    let found = env.runner.exists(program).await;
    session.tools.insert(program.to_string(), found);
    found
}
