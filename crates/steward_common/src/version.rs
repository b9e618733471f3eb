//! Numeric-aware version ordering for kernel release strings.
//!
//! `6.1.0-9-amd64` sorts before `6.1.0-13-amd64`: the string is split on
//! `.` and `-`, digit runs compare as numbers, everything else compares as
//! text. Ordering rules per segment position:
//!
//! - a missing segment sorts before any present segment
//! - a numeric segment sorts before a text segment
//! - numeric segments compare by value (any length, leading zeros ignored)
//! - text segments compare lexicographically
//!
//! Comparison never fails, so malformed strings still get a stable place.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// One component of a split version string.
///
/// Variant order matters: `Numeric` < `Text` via the derived `Ord`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Segment {
    Numeric(Digits),
    Text(String),
}

/// Digit run with leading zeros stripped. Ordered by length, then text,
/// which equals numeric order without overflow.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Digits(String);

impl Ord for Digits {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Digits {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn segments(raw: &str) -> Vec<Segment> {
    raw.split(['.', '-'])
        .filter(|s| !s.is_empty())
        .map(|s| {
            if s.bytes().all(|b| b.is_ascii_digit()) {
                let trimmed = s.trim_start_matches('0');
                Segment::Numeric(Digits(trimmed.to_string()))
            } else {
                Segment::Text(s.to_string())
            }
        })
        .collect()
}

/// Compare two version strings segment by segment.
///
/// Strings with equal segments (e.g. `6.01` and `6.1`) compare as `Equal`;
/// use [`KernelIdentifier`] when a tie-break is needed.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    // Vec ordering is lexicographic and treats a prefix as smaller,
    // which gives "missing segment sorts first".
    segments(a.trim()).cmp(&segments(b.trim()))
}

/// Kernel release identifier, e.g. `6.1.0-13-amd64`.
///
/// Equality is on the trimmed text. Ordering is [`compare_versions`] with
/// the raw text as tie-break, so it is total and agrees with `Eq`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KernelIdentifier(String);

impl KernelIdentifier {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Debian package name for this kernel image.
    pub fn image_package(&self) -> String {
        format!("linux-image-{}", self.0)
    }
}

impl Ord for KernelIdentifier {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_versions(&self.0, &other.0).then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for KernelIdentifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for KernelIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for KernelIdentifier {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for KernelIdentifier {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
