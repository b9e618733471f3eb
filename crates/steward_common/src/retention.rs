//! Kernel retention policy.
//!
//! Decides which installed kernel images survive cleanup: the newest
//! `keep_count` releases plus the running kernel, which is never removed.
//! `keep` and `remove` always partition the installed set. Pure
//! computation; purging packages is left to the caller.

use crate::error::{Result, StewardError};
use crate::version::KernelIdentifier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default number of kernels to keep
pub const DEFAULT_KEEP_KERNELS: usize = 3;

/// Installed kernel images as dpkg sees them, plus the running release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledKernelSet {
    installed: BTreeSet<KernelIdentifier>,
    running: KernelIdentifier,
}

impl InstalledKernelSet {
    /// Build the set; duplicates collapse.
    pub fn new<I, K>(installed: I, running: impl Into<KernelIdentifier>) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<KernelIdentifier>,
    {
        Self {
            installed: installed.into_iter().map(Into::into).collect(),
            running: running.into(),
        }
    }

    pub fn installed(&self) -> &BTreeSet<KernelIdentifier> {
        &self.installed
    }

    pub fn running(&self) -> &KernelIdentifier {
        &self.running
    }

    pub fn is_empty(&self) -> bool {
        self.installed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.installed.len()
    }

    /// Whether dpkg lists the running kernel
    pub fn lists_running(&self) -> bool {
        self.installed.contains(&self.running)
    }

    /// Newest installed release, if any
    pub fn newest(&self) -> Option<&KernelIdentifier> {
        self.installed.iter().next_back()
    }
}

/// Partition of the installed kernels into keep and remove.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPlan {
    pub keep: BTreeSet<KernelIdentifier>,
    pub remove: BTreeSet<KernelIdentifier>,
}

impl RetentionPlan {
    /// Nothing to purge
    pub fn is_noop(&self) -> bool {
        self.remove.is_empty()
    }

    /// Package names to purge, oldest first
    pub fn removal_packages(&self) -> Vec<String> {
        self.remove.iter().map(|k| k.image_package()).collect()
    }
}

/// Computes [`RetentionPlan`]s for a fixed retention count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelRetentionPlanner {
    keep_count: usize,
}

impl KernelRetentionPlanner {
    pub fn new(keep_count: usize) -> Result<Self> {
        if keep_count < 1 {
            return Err(StewardError::InvalidConfiguration(format!(
                "kernel retention count must be at least 1, got {}",
                keep_count
            )));
        }
        Ok(Self { keep_count })
    }

    pub fn keep_count(&self) -> usize {
        self.keep_count
    }

    pub fn plan(&self, kernels: &InstalledKernelSet) -> RetentionPlan {
        if kernels.is_empty() {
            return RetentionPlan::default();
        }

        let mut keep: BTreeSet<KernelIdentifier> = kernels
            .installed
            .iter()
            .rev()
            .take(self.keep_count)
            .cloned()
            .collect();

        // A running kernel dpkg does not list takes no slot.
        if kernels.lists_running() && !keep.contains(&kernels.running) {
            // Give up the oldest kept slot, but never the newest kernel.
            if self.keep_count >= 2 {
                if let Some(oldest) = keep.iter().next().cloned() {
                    keep.remove(&oldest);
                }
            }
            keep.insert(kernels.running.clone());
        }

        let remove = kernels.installed.difference(&keep).cloned().collect();
        RetentionPlan { keep, remove }
    }
}

impl Default for KernelRetentionPlanner {
    fn default() -> Self {
        Self {
            keep_count: DEFAULT_KEEP_KERNELS,
        }
    }
}

/// Plan retention for `kernels` keeping `keep_count` releases.
pub fn plan(kernels: &InstalledKernelSet, keep_count: usize) -> Result<RetentionPlan> {
    Ok(KernelRetentionPlanner::new(keep_count)?.plan(kernels))
}
