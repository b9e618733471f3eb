//! Parser for installed kernel images from `dpkg-query`.
//!
//! Expected invocation:
//! `dpkg-query -W -f='${Package}\t${Status}\n' 'linux-image-[0-9]*'`

use crate::version::KernelIdentifier;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Format string passed to `dpkg-query -f`
pub const KERNEL_QUERY_FORMAT: &str = r"${Package}\t${Status}\n";

fn image_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^linux-image-(\d[0-9A-Za-z.+~-]*)$").expect("static regex compiles")
    })
}

/// Extract the kernel release from an image package name.
///
/// `linux-image-6.1.0-13-amd64` → `6.1.0-13-amd64`. Meta packages
/// (`linux-image-amd64`) and debug symbols yield `None`; the `-unsigned`
/// suffix is dropped so the release matches `uname -r`.
pub fn kernel_release_from_package(package: &str) -> Option<KernelIdentifier> {
    let caps = image_regex().captures(package.trim())?;
    let release = caps.get(1)?.as_str();
    if release.ends_with("-dbg") || release.ends_with("-dbgsym") {
        return None;
    }
    let release = release.strip_suffix("-unsigned").unwrap_or(release);
    Some(KernelIdentifier::new(release))
}

/// Parse `dpkg-query` rows into the set of fully installed kernel releases.
///
/// Rows whose status is not `install ok installed` (removed packages with
/// leftover config, half-installed, held for removal) are skipped.
pub fn parse_installed_kernels(output: &str) -> BTreeSet<KernelIdentifier> {
    output
        .lines()
        .filter_map(|line| {
            let (package, status) = line.split_once('\t')?;
            if status.trim() != "install ok installed" {
                return None;
            }
            kernel_release_from_package(package)
        })
        .collect()
}
