//! Reboot-requirement inference.
//!
//! A fixed decision table over [`RebootSignals`]. Rules run in order and
//! can only add reasons; nothing retracts an earlier verdict.
//!
//! Failed units and services awaiting restart are surfaced as advisories
//! and never make a reboot required on their own.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reboot-relevant facts gathered once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebootSignals {
    /// `/run/reboot-required` or equivalent exists
    pub pending_reboot_marker_present: bool,
    /// Units in the failed state
    pub failed_service_count: u32,
    /// Release of the kernel currently booted
    pub running_kernel_version: Option<String>,
    /// Release the system will boot next
    pub expected_kernel_version: Option<String>,
    /// Services still mapping outdated libraries
    pub services_needing_restart: u32,
    /// Core libraries (libc, init) were replaced under running processes
    pub critical_library_flag_set: bool,
    /// This run installed package upgrades
    pub upgrade_occurred_this_session: bool,
}

/// Why a reboot is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebootReason {
    PendingMarker,
    KernelMismatch,
    CriticalLibrariesUpgraded,
}

impl RebootReason {
    pub fn message(&self) -> &'static str {
        match self {
            RebootReason::PendingMarker => "system-flagged reboot pending",
            RebootReason::KernelMismatch => "running kernel differs from installed kernel",
            RebootReason::CriticalLibrariesUpgraded => {
                "critical system libraries upgraded this session"
            }
        }
    }
}

impl fmt::Display for RebootReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Informational findings shown next to the verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "count", rename_all = "snake_case")]
pub enum RebootAdvisory {
    FailedServices(u32),
    ServicesNeedRestart(u32),
    /// Critical library flag seen without an upgrade in this run
    StaleCriticalLibraryFlag,
}

impl fmt::Display for RebootAdvisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebootAdvisory::FailedServices(n) => write!(f, "{} failed service(s)", n),
            RebootAdvisory::ServicesNeedRestart(n) => {
                write!(f, "{} service(s) need a restart", n)
            }
            RebootAdvisory::StaleCriticalLibraryFlag => {
                f.write_str("critical library flag predates this session")
            }
        }
    }
}

/// Outcome of [`evaluate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebootVerdict {
    pub required: bool,
    /// In rule order: pending marker, kernel mismatch, critical libraries
    pub reasons: Vec<RebootReason>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub advisories: Vec<RebootAdvisory>,
}

impl RebootVerdict {
    /// Human-readable reasons in evaluation order
    pub fn reason_messages(&self) -> Vec<&'static str> {
        self.reasons.iter().map(RebootReason::message).collect()
    }
}

fn normalized(version: &Option<String>) -> Option<&str> {
    version.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Decide whether the system needs a reboot.
pub fn evaluate(signals: &RebootSignals) -> RebootVerdict {
    let mut reasons = Vec::new();

    if signals.pending_reboot_marker_present {
        reasons.push(RebootReason::PendingMarker);
    }

    if let (Some(running), Some(expected)) = (
        normalized(&signals.running_kernel_version),
        normalized(&signals.expected_kernel_version),
    ) {
        if running != expected {
            reasons.push(RebootReason::KernelMismatch);
        }
    }

    if signals.critical_library_flag_set && signals.upgrade_occurred_this_session {
        reasons.push(RebootReason::CriticalLibrariesUpgraded);
    }

    let mut advisories = Vec::new();
    if signals.failed_service_count > 0 {
        advisories.push(RebootAdvisory::FailedServices(signals.failed_service_count));
    }
    if signals.services_needing_restart > 0 {
        advisories.push(RebootAdvisory::ServicesNeedRestart(
            signals.services_needing_restart,
        ));
    }
    if signals.critical_library_flag_set && !signals.upgrade_occurred_this_session {
        advisories.push(RebootAdvisory::StaleCriticalLibraryFlag);
    }

    RebootVerdict {
        required: !reasons.is_empty(),
        reasons,
        advisories,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_system() {
        let verdict = evaluate(&RebootSignals::default());
        assert!(!verdict.required);
        assert!(verdict.reasons.is_empty());
        assert!(verdict.advisories.is_empty());
    }

    #[test]
    fn test_pending_marker_alone() {
        let verdict = evaluate(&RebootSignals {
            pending_reboot_marker_present: true,
            ..Default::default()
        });
        assert!(verdict.required);
        assert_eq!(verdict.reasons, vec![RebootReason::PendingMarker]);
        assert_eq!(verdict.reason_messages(), vec!["system-flagged reboot pending"]);
    }

    #[test]
    fn test_stale_critical_flag_suppressed() {
        let verdict = evaluate(&RebootSignals {
            critical_library_flag_set: true,
            upgrade_occurred_this_session: false,
            ..Default::default()
        });
        assert!(!verdict.required);
        assert!(verdict.reasons.is_empty());
        assert_eq!(verdict.advisories, vec![RebootAdvisory::StaleCriticalLibraryFlag]);
    }

    #[test]
    fn test_critical_flag_with_upgrade() {
        let verdict = evaluate(&RebootSignals {
            critical_library_flag_set: true,
            upgrade_occurred_this_session: true,
            ..Default::default()
        });
        assert!(verdict.required);
        assert_eq!(verdict.reasons, vec![RebootReason::CriticalLibrariesUpgraded]);
    }

    #[test]
    fn test_upgrade_without_flag_is_quiet() {
        let verdict = evaluate(&RebootSignals {
            upgrade_occurred_this_session: true,
            ..Default::default()
        });
        assert!(!verdict.required);
    }

    #[test]
    fn test_matching_kernels() {
        let verdict = evaluate(&RebootSignals {
            running_kernel_version: Some("6.1.0-9".into()),
            expected_kernel_version: Some("6.1.0-9".into()),
            ..Default::default()
        });
        assert!(!verdict.reasons.contains(&RebootReason::KernelMismatch));
        assert!(!verdict.required);
    }

    #[test]
    fn test_kernel_mismatch() {
        let verdict = evaluate(&RebootSignals {
            running_kernel_version: Some("6.1.0-9".into()),
            expected_kernel_version: Some("6.1.0-13".into()),
            ..Default::default()
        });
        assert!(verdict.required);
        assert_eq!(verdict.reasons, vec![RebootReason::KernelMismatch]);
        assert_eq!(
            verdict.reason_messages(),
            vec!["running kernel differs from installed kernel"]
        );
    }

    #[test]
    fn test_kernel_whitespace_trimmed() {
        let verdict = evaluate(&RebootSignals {
            running_kernel_version: Some("6.1.0-9\n".into()),
            expected_kernel_version: Some("  6.1.0-9".into()),
            ..Default::default()
        });
        assert!(!verdict.required);
    }

    #[test]
    fn test_missing_kernel_version_abstains() {
        for (running, expected) in [
            (Some("6.1.0-9".to_string()), None),
            (None, Some("6.1.0-13".to_string())),
            (None, None),
            (Some("6.1.0-9".to_string()), Some("   ".to_string())),
        ] {
            let verdict = evaluate(&RebootSignals {
                running_kernel_version: running,
                expected_kernel_version: expected,
                ..Default::default()
            });
            assert!(!verdict.required);
        }
    }

    #[test]
    fn test_service_counts_are_informational() {
        let verdict = evaluate(&RebootSignals {
            failed_service_count: 2,
            services_needing_restart: 5,
            ..Default::default()
        });
        assert!(!verdict.required);
        assert!(verdict.reasons.is_empty());
        assert_eq!(
            verdict.advisories,
            vec![
                RebootAdvisory::FailedServices(2),
                RebootAdvisory::ServicesNeedRestart(5)
            ]
        );
    }

    #[test]
    fn test_reasons_follow_rule_order() {
        let verdict = evaluate(&RebootSignals {
            pending_reboot_marker_present: true,
            running_kernel_version: Some("6.1.0-9".into()),
            expected_kernel_version: Some("6.1.0-13".into()),
            critical_library_flag_set: true,
            upgrade_occurred_this_session: true,
            ..Default::default()
        });
        assert_eq!(
            verdict.reasons,
            vec![
                RebootReason::PendingMarker,
                RebootReason::KernelMismatch,
                RebootReason::CriticalLibrariesUpgraded
            ]
        );
    }

    #[test]
    fn test_deterministic() {
        let signals = RebootSignals {
            pending_reboot_marker_present: true,
            failed_service_count: 1,
            running_kernel_version: Some("6.1.0-9".into()),
            expected_kernel_version: Some("6.1.0-13".into()),
            services_needing_restart: 3,
            critical_library_flag_set: true,
            upgrade_occurred_this_session: false,
        };
        assert_eq!(evaluate(&signals), evaluate(&signals));
    }

    #[test]
    fn test_verdict_serializes_reason_tags() {
        let verdict = evaluate(&RebootSignals {
            pending_reboot_marker_present: true,
            ..Default::default()
        });
        let json = serde_json::to_string(&verdict).unwrap();
        assert!(json.contains("\"pending_marker\""));
        assert!(!json.contains("advisories"));
    }
}
