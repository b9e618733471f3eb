//! Builds [`RebootSignals`] from parsed probe results.
//!
//! Kept apart from the inference engine so engine tests never depend on
//! real tool output formats.

use crate::parsers::NeedrestartReport;
use crate::reboot::RebootSignals;
use crate::version::KernelIdentifier;

/// Raw facts collected by the reboot check step.
#[derive(Debug, Clone, Default)]
pub struct RebootFacts {
    pub marker_present: bool,
    pub failed_units: Vec<String>,
    /// Parsed `needrestart -b`, when the tool is installed
    pub needrestart: Option<NeedrestartReport>,
    /// `uname -r`
    pub uname_release: Option<String>,
    /// Newest installed kernel image
    pub newest_installed: Option<KernelIdentifier>,
    pub upgrade_occurred: bool,
}

impl RebootFacts {
    /// Map facts to engine input.
    ///
    /// Kernel versions come from needrestart when it knows them, otherwise
    /// from `uname -r` against the newest installed image. The critical
    /// library flag is set when any of `critical_units` awaits a restart.
    pub fn to_signals(&self, critical_units: &[String]) -> RebootSignals {
        let needrestart_kernels = self
            .needrestart
            .as_ref()
            .filter(|n| n.running_kernel.is_some() && n.expected_kernel.is_some());

        let (running, expected) = match needrestart_kernels {
            Some(n) => (n.running_kernel.clone(), n.expected_kernel.clone()),
            None => (
                self.uname_release.clone(),
                self.newest_installed.as_ref().map(|k| k.to_string()),
            ),
        };

        let services: &[String] = self
            .needrestart
            .as_ref()
            .map(|n| n.services.as_slice())
            .unwrap_or(&[]);

        let critical = services
            .iter()
            .any(|svc| critical_units.iter().any(|c| c == svc));

        RebootSignals {
            pending_reboot_marker_present: self.marker_present,
            failed_service_count: count(self.failed_units.len()),
            running_kernel_version: running,
            expected_kernel_version: expected,
            services_needing_restart: count(services.len()),
            critical_library_flag_set: critical,
            upgrade_occurred_this_session: self.upgrade_occurred,
        }
    }
}

/// Collection size as an engine count, saturating at `u32::MAX`
fn count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}
