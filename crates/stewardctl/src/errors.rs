//! Exit codes for stewardctl
//!
//! Scripts and systemd timers rely on these staying stable.

use steward_common::{MaintenanceReport, StewardError};

/// Exit code for success
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code for general errors
pub const EXIT_GENERAL_ERROR: i32 = 1;

/// At least one step failed
pub const EXIT_STEP_FAILED: i32 = 2;

/// Run completed, but the system should be rebooted
pub const EXIT_REBOOT_REQUIRED: i32 = 3;

/// Another run holds the lock (EX_TEMPFAIL)
pub const EXIT_LOCK_HELD: i32 = 75;

/// Root privileges required (EX_NOPERM)
pub const EXIT_NOT_ROOT: i32 = 77;

/// Configuration invalid (EX_CONFIG)
pub const EXIT_CONFIG: i32 = 78;

/// Exit status for a finished run. Failures win over a pending reboot.
pub fn exit_code_for(report: &MaintenanceReport) -> i32 {
    if report.has_failures() {
        EXIT_STEP_FAILED
    } else if report.reboot_required() {
        EXIT_REBOOT_REQUIRED
    } else {
        EXIT_SUCCESS
    }
}

/// Exit status for an error that stopped a command before or outside a run
pub fn exit_code_for_error(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<StewardError>() {
        Some(
            StewardError::InvalidConfiguration(_)
            | StewardError::ConfigLoad { .. }
            | StewardError::ConfigParse(_),
        ) => EXIT_CONFIG,
        _ => EXIT_GENERAL_ERROR,
    }
}
