//! Parsers for system tool output.
//!
//! Each parser turns the text of one command into a typed struct so the
//! policy engines never see raw tool output.
//!
//! # Supported Tools
//!
//! - `needrestart -b`: kernel and service restart status → `NeedrestartReport`
//! - `dpkg-query -W`: installed kernel images → `Vec<KernelIdentifier>`
//! - `apt-get -s dist-upgrade`: pending upgrade summary → `AptSimulation`
//! - `systemctl list-units --failed`: failed units → `Vec<String>`

pub mod apt;
pub mod dpkg;
pub mod needrestart;
pub mod systemctl;

pub use apt::{parse_apt_simulation, AptSimulation};
pub use dpkg::{kernel_release_from_package, parse_installed_kernels, KERNEL_QUERY_FORMAT};
pub use needrestart::{parse_needrestart, KernelStatus, NeedrestartReport};
pub use systemctl::parse_failed_units;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Parse error with context for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseError {
    /// Which command produced this output
    pub source: String,
    /// Line number where error occurred (1-indexed), if applicable
    pub line_num: Option<usize>,
    /// Raw input that failed to parse
    pub raw: String,
    pub reason: ParseErrorReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseErrorReason {
    /// Non-numeric characters in numeric field
    InvalidNumber,
    /// Required line not found in output
    MissingSection(String),
    /// Row format doesn't match expected structure
    MalformedRow,
}

impl ParseError {
    pub fn new(source: &str, reason: ParseErrorReason, raw: &str) -> Self {
        Self {
            source: source.to_string(),
            line_num: None,
            raw: raw.to_string(),
            reason,
        }
    }

    pub fn with_line(mut self, line_num: usize) -> Self {
        self.line_num = Some(line_num);
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot parse {} output", self.source)?;
        if let Some(line) = self.line_num {
            write!(f, " at line {}", line)?;
        }
        match &self.reason {
            ParseErrorReason::InvalidNumber => write!(f, ": invalid number in '{}'", self.raw),
            ParseErrorReason::MissingSection(s) => write!(f, ": missing '{}'", s),
            ParseErrorReason::MalformedRow => write!(f, ": malformed row '{}'", self.raw),
        }
    }
}

impl std::error::Error for ParseError {}
