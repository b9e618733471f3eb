//! Configuration backup
//!
//! Layout of one generation:
//!
//! ```text
//! <target_dir>/20240312-041500/
//!     etc/apt/sources.list
//!     etc/apt/sources.list.d/...
//!     package-selections.txt
//!     SHA256SUMS
//! ```

use crate::orchestrator::{Env, Session};
use crate::runner::CommandSpec;
use anyhow::{Context, Result};
use chrono::Local;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use steward_common::{StepKind, StepReport};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const STEP: StepKind = StepKind::Backup;
pub const MANIFEST_NAME: &str = "SHA256SUMS";
pub const SELECTIONS_NAME: &str = "package-selections.txt";

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub files: usize,
    /// Configured paths that do not exist
    pub missing: Vec<PathBuf>,
}

pub async fn run(env: &Env<'_>, _session: &mut Session) -> Result<StepReport> {
    let cfg = &env.config.backup;
    let dest = generation_dir(&cfg.target_dir);

    if env.dry_run() {
        let existing: Vec<String> = cfg
            .paths
            .iter()
            .filter(|p| p.exists())
            .map(|p| p.display().to_string())
            .collect();
        return Ok(StepReport::success(
            STEP,
            format!("would back up {} paths to {}", existing.len(), dest.display()),
        )
        .with_details(existing));
    }

    fs::create_dir_all(&dest).with_context(|| format!("creating {}", dest.display()))?;
    let stats = copy_paths(&cfg.paths, &dest)
        .with_context(|| format!("copying into {}", dest.display()))?;

    let mut problems: Vec<String> = stats
        .missing
        .iter()
        .map(|p| format!("not found: {}", p.display()))
        .collect();

    let selections = CommandSpec::new("dpkg").arg("--get-selections");
    match env.exec_checked(&selections).await {
        Ok(out) => fs::write(dest.join(SELECTIONS_NAME), out.stdout)
            .with_context(|| format!("writing {}", SELECTIONS_NAME))?,
        Err(e) => problems.push(format!("package selections not saved: {}", e)),
    }

    let hashed = write_manifest(&dest)?;
    let pruned = prune_backups(&cfg.target_dir, cfg.keep)
        .with_context(|| format!("pruning {}", cfg.target_dir.display()))?;
    info!(
        "Backup {} written ({} files, {} old generations pruned)",
        dest.display(),
        hashed,
        pruned.len()
    );

    let summary = format!("{} files saved to {}", stats.files, dest.display());
    let mut details = problems.clone();
    if !pruned.is_empty() {
        details.push(format!("pruned {} old backup(s)", pruned.len()));
    }

    let report = if problems.is_empty() {
        StepReport::success(STEP, summary)
    } else {
        StepReport::warning(STEP, summary)
    };
    Ok(report.with_details(details))
}

/// `<target>/<YYYYMMDD-HHMMSS>`, with a counter if that already exists
fn generation_dir(target: &Path) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d-%H%M%S").to_string();
    let mut dir = target.join(&stamp);
    let mut n = 1;
    while dir.exists() {
        dir = target.join(format!("{}-{}", stamp, n));
        n += 1;
    }
    dir
}

/// Copy files and directory trees under `dest`, keeping their absolute
/// layout (`/etc/fstab` lands at `dest/etc/fstab`). Symlinks are skipped.
pub fn copy_paths(paths: &[PathBuf], dest: &Path) -> io::Result<CopyStats> {
    let mut stats = CopyStats::default();

    for path in paths {
        if !path.exists() {
            debug!("Backup path missing: {}", path.display());
            stats.missing.push(path.clone());
            continue;
        }

        for entry in WalkDir::new(path).follow_links(false) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let source = entry.path();
            let target = dest.join(source.strip_prefix("/").unwrap_or(source));
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(source, &target)?;
            stats.files += 1;
        }
    }

    Ok(stats)
}

/// Write `SHA256SUMS` (sha256sum format) for every file under `dir`.
/// Returns the number of files hashed.
pub fn write_manifest(dir: &Path) -> Result<usize> {
    let mut lines = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(dir)?;
        if rel == Path::new(MANIFEST_NAME) {
            continue;
        }
        let bytes = fs::read(entry.path())
            .with_context(|| format!("reading {}", entry.path().display()))?;
        let digest = Sha256::digest(&bytes);
        lines.push(format!("{:x}  {}", digest, rel.display()));
    }

    let mut content = lines.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    fs::write(dir.join(MANIFEST_NAME), content)?;
    Ok(lines.len())
}

/// Delete the oldest generations so at most `keep` remain. Only
/// directories named like a generation are touched.
pub fn prune_backups(target: &Path, keep: usize) -> io::Result<Vec<PathBuf>> {
    if !target.exists() {
        return Ok(Vec::new());
    }

    let mut generations: Vec<PathBuf> = fs::read_dir(target)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter(|e| is_generation_name(&e.file_name().to_string_lossy()))
        .map(|e| e.path())
        .collect();
    generations.sort();

    let excess = generations.len().saturating_sub(keep);
    let mut removed = Vec::new();
    for dir in generations.into_iter().take(excess) {
        fs::remove_dir_all(&dir)?;
        removed.push(dir);
    }
    Ok(removed)
}

fn is_generation_name(name: &str) -> bool {
    name.len() >= 15
        && name.as_bytes()[8] == b'-'
        && name.chars().all(|c| c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_paths_files_and_trees() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();

        let file = src.path().join("fstab");
        fs::write(&file, "UUID=abc / ext4 defaults 0 1\n").unwrap();
        let tree = src.path().join("sources.list.d");
        fs::create_dir_all(tree.join("nested")).unwrap();
        fs::write(tree.join("debian.sources"), "Types: deb\n").unwrap();
        fs::write(tree.join("nested").join("extra.list"), "deb x y\n").unwrap();
        let missing = src.path().join("preferences.d");

        let stats = copy_paths(&[file.clone(), tree.clone(), missing.clone()], dest.path()).unwrap();
        assert_eq!(stats.files, 3);
        assert_eq!(stats.missing, vec![missing]);

        let copied = dest.path().join(file.strip_prefix("/").unwrap());
        assert_eq!(
            fs::read_to_string(copied).unwrap(),
            "UUID=abc / ext4 defaults 0 1\n"
        );
        let nested = dest
            .path()
            .join(tree.strip_prefix("/").unwrap())
            .join("nested")
            .join("extra.list");
        assert!(nested.exists());
    }

    #[test]
    fn test_manifest_lists_every_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "hello").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("b.txt"), "").unwrap();

        assert_eq!(write_manifest(dir.path()).unwrap(), 2);
        let manifest = fs::read_to_string(dir.path().join(MANIFEST_NAME)).unwrap();
        let lines: Vec<&str> = manifest.lines().collect();
        assert_eq!(
            lines[0],
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824  a.txt"
        );
        assert!(lines[1].starts_with(
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855  sub"
        ));

        // Re-running does not hash the previous manifest
        assert_eq!(write_manifest(dir.path()).unwrap(), 2);
    }

    #[test]
    fn test_prune_keeps_newest_generations() {
        let dir = TempDir::new().unwrap();
        for name in [
            "20240101-010000",
            "20240201-010000",
            "20240301-010000",
            "20240301-010000-1",
        ] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        fs::create_dir(dir.path().join("keep-me")).unwrap();

        let removed = prune_backups(dir.path(), 2).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(!dir.path().join("20240101-010000").exists());
        assert!(!dir.path().join("20240201-010000").exists());
        assert!(dir.path().join("20240301-010000").exists());
        assert!(dir.path().join("20240301-010000-1").exists());
        assert!(dir.path().join("keep-me").exists());
    }

    #[test]
    fn test_generation_names() {
        assert!(is_generation_name("20240312-041500"));
        assert!(is_generation_name("20240312-041500-2"));
        assert!(!is_generation_name("keep-me"));
        assert!(!is_generation_name("2024-03-12"));
    }
}
