//! Parser for `systemctl list-units --failed --no-legend --plain`.

/// Names of failed units, one per row.
///
/// Tolerates the `●` marker systemctl prints when `--plain` is missing.
pub fn parse_failed_units(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim().trim_start_matches('●').trim();
            let name = line.split_whitespace().next()?;
            if name.contains('.') {
                Some(name.to_string())
            } else {
                None
            }
        })
        .collect()
}
