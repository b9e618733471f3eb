//! Parser for `needrestart -b` batch output.
//!
//! ```text
//! NEEDRESTART-VER: 3.6
//! NEEDRESTART-KCUR: 6.1.0-9-amd64
//! NEEDRESTART-KEXP: 6.1.0-13-amd64
//! NEEDRESTART-KSTA: 3
//! NEEDRESTART-SVC: dbus.service
//! NEEDRESTART-SVC: cron.service
//! ```

use super::{ParseError, ParseErrorReason};
use serde::{Deserialize, Serialize};

const SOURCE: &str = "needrestart -b";

/// Kernel status as reported by `NEEDRESTART-KSTA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelStatus {
    Unknown,
    Current,
    AbiUpgradePending,
    VersionUpgradePending,
}

impl KernelStatus {
    fn from_code(code: u8) -> Self {
        match code {
            1 => KernelStatus::Current,
            2 => KernelStatus::AbiUpgradePending,
            3 => KernelStatus::VersionUpgradePending,
            _ => KernelStatus::Unknown,
        }
    }

    pub fn upgrade_pending(&self) -> bool {
        matches!(
            self,
            KernelStatus::AbiUpgradePending | KernelStatus::VersionUpgradePending
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeedrestartReport {
    pub running_kernel: Option<String>,
    pub expected_kernel: Option<String>,
    pub kernel_status: KernelStatus,
    /// Units with processes mapping replaced libraries
    pub services: Vec<String>,
    /// User sessions with stale processes
    pub sessions: Vec<String>,
}

impl NeedrestartReport {
    pub fn service_count(&self) -> u32 {
        self.services.len() as u32
    }
}

/// Parse batch-mode output. Unknown keys are ignored; the
/// `NEEDRESTART-VER` header must be present.
pub fn parse_needrestart(output: &str) -> Result<NeedrestartReport, ParseError> {
    let mut seen_header = false;
    let mut report = NeedrestartReport {
        running_kernel: None,
        expected_kernel: None,
        kernel_status: KernelStatus::Unknown,
        services: Vec::new(),
        sessions: Vec::new(),
    };

    for (idx, line) in output.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();

        match key.trim() {
            "NEEDRESTART-VER" => seen_header = true,
            "NEEDRESTART-KCUR" => report.running_kernel = non_empty(value),
            "NEEDRESTART-KEXP" => report.expected_kernel = non_empty(value),
            "NEEDRESTART-KSTA" => {
                let code: u8 = value.parse().map_err(|_| {
                    ParseError::new(SOURCE, ParseErrorReason::InvalidNumber, line)
                        .with_line(idx + 1)
                })?;
                report.kernel_status = KernelStatus::from_code(code);
            }
            "NEEDRESTART-SVC" => {
                if let Some(svc) = non_empty(value) {
                    report.services.push(svc);
                }
            }
            "NEEDRESTART-SESS" => {
                if let Some(sess) = non_empty(value) {
                    report.sessions.push(sess);
                }
            }
            _ => {}
        }
    }

    if !seen_header {
        return Err(ParseError::new(
            SOURCE,
            ParseErrorReason::MissingSection("NEEDRESTART-VER".to_string()),
            output,
        ));
    }

    report.services.sort();
    report.services.dedup();
    Ok(report)
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
