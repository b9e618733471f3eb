//! Parser for `apt-get -s dist-upgrade` output.
//!
//! Reads the `Inst` lines and the summary line:
//!
//! ```text
//! Inst libc6 [2.36-9] (2.36-9+deb12u4 Debian:12.5/stable [amd64])
//! Inst openssl [3.0.11-1~deb12u1] (3.0.11-1~deb12u2 Debian-Security:12/stable-security [amd64])
//! 2 upgraded, 0 newly installed, 0 to remove and 1 not upgraded.
//! ```

use super::{ParseError, ParseErrorReason};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

const SOURCE: &str = "apt-get -s dist-upgrade";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AptSimulation {
    pub upgraded: u32,
    pub newly_installed: u32,
    pub to_remove: u32,
    pub not_upgraded: u32,
    /// Packages from `Inst` lines, in output order
    pub packages: Vec<String>,
}

impl AptSimulation {
    /// Whether running the upgrade would change anything
    pub fn has_changes(&self) -> bool {
        self.upgraded > 0 || self.newly_installed > 0 || self.to_remove > 0
    }
}

fn summary_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(\d+) upgraded, (\d+) newly installed, (\d+) to remove and (\d+) not upgraded",
        )
        .expect("static regex compiles")
    })
}

pub fn parse_apt_simulation(output: &str) -> Result<AptSimulation, ParseError> {
    let mut packages = Vec::new();
    let mut summary = None;

    for (idx, line) in output.lines().enumerate() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("Inst ") {
            if let Some(name) = rest.split_whitespace().next() {
                packages.push(name.to_string());
            }
        } else if let Some(caps) = summary_regex().captures(line) {
            let field = |i: usize| -> Result<u32, ParseError> {
                caps[i].parse().map_err(|_| {
                    ParseError::new(SOURCE, ParseErrorReason::InvalidNumber, line)
                        .with_line(idx + 1)
                })
            };
            summary = Some((field(1)?, field(2)?, field(3)?, field(4)?));
        }
    }

    let (upgraded, newly_installed, to_remove, not_upgraded) = summary.ok_or_else(|| {
        ParseError::new(
            SOURCE,
            ParseErrorReason::MissingSection("upgraded, newly installed".to_string()),
            output,
        )
    })?;

    Ok(AptSimulation {
        upgraded,
        newly_installed,
        to_remove,
        not_upgraded,
        packages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pending_upgrades() {
        let output = "\
Reading package lists...
Building dependency tree...
Calculating upgrade...
The following packages will be upgraded:
  libc6 openssl
Inst libc6 [2.36-9] (2.36-9+deb12u4 Debian:12.5/stable [amd64])
Inst openssl [3.0.11-1~deb12u1] (3.0.11-1~deb12u2 Debian-Security:12/stable-security [amd64])
Conf libc6 (2.36-9+deb12u4 Debian:12.5/stable [amd64])
2 upgraded, 0 newly installed, 0 to remove and 1 not upgraded.
";
        let sim = parse_apt_simulation(output).unwrap();
        assert_eq!(sim.upgraded, 2);
        assert_eq!(sim.not_upgraded, 1);
        assert_eq!(sim.packages, vec!["libc6", "openssl"]);
        assert!(sim.has_changes());
    }

    #[test]
    fn test_parse_up_to_date() {
        let output = "Reading package lists...\n0 upgraded, 0 newly installed, 0 to remove and 0 not upgraded.\n";
        let sim = parse_apt_simulation(output).unwrap();
        assert!(!sim.has_changes());
        assert!(sim.packages.is_empty());
    }

    #[test]
    fn test_held_back_only_is_not_a_change() {
        let output = "0 upgraded, 0 newly installed, 0 to remove and 3 not upgraded.\n";
        let sim = parse_apt_simulation(output).unwrap();
        assert_eq!(sim.not_upgraded, 3);
        assert!(!sim.has_changes());
    }

    #[test]
    fn test_missing_summary() {
        let err = parse_apt_simulation("E: Could not get lock /var/lib/dpkg/lock\n").unwrap_err();
        assert!(matches!(err.reason, ParseErrorReason::MissingSection(_)));
    }
}
