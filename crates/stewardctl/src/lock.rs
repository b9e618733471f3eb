//! Run lock
//!
//! Only one maintenance run may touch the package database at a time:
//! - Lock file with PID, host and timestamp
//! - Stale and dead-holder locks are recovered
//! - Released on drop

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, info, warn};

/// A dist-upgrade can legitimately take hours; past this the lock is stale
const MAX_LOCK_AGE_SECS: u64 = 4 * 60 * 60;

/// Lock file contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    pub pid: u32,
    /// Unix epoch seconds
    pub acquired_at: u64,
    pub hostname: String,
    /// Step the holder was in
    pub step: String,
}

impl LockInfo {
    fn new(step: &str) -> Self {
        let hostname = fs::read_to_string("/etc/hostname")
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        Self {
            pid: process::id(),
            acquired_at: now_secs(),
            hostname,
            step: step.to_string(),
        }
    }

    pub fn age_secs(&self) -> u64 {
        now_secs().saturating_sub(self.acquired_at)
    }

    fn is_stale(&self) -> bool {
        self.age_secs() > MAX_LOCK_AGE_SECS
    }

    fn process_exists(&self) -> bool {
        Path::new(&format!("/proc/{}", self.pid)).exists()
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[derive(Debug, Error)]
pub enum LockError {
    #[error(
        "Another steward run holds the lock (PID {} on {}, {}s ago, step: {})",
        holder.pid, holder.hostname, holder.age_secs(), holder.step
    )]
    AlreadyLocked { holder: LockInfo },

    #[error("Lock IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Lock file corrupted: {0}")]
    Corrupted(String),
}

/// Held run lock; the file is removed on drop
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub fn acquire(path: &Path, step: &str) -> Result<Self, LockError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        if path.exists() {
            let content = fs::read_to_string(path)?;
            match serde_json::from_str::<LockInfo>(&content) {
                Ok(holder) if holder.is_stale() => {
                    warn!(
                        "Recovering stale lock (pid={} age={}s)",
                        holder.pid,
                        holder.age_secs()
                    );
                    fs::remove_file(path)?;
                }
                Ok(holder) if !holder.process_exists() => {
                    warn!("Recovering lock of dead process {}", holder.pid);
                    fs::remove_file(path)?;
                }
                Ok(holder) => return Err(LockError::AlreadyLocked { holder }),
                Err(e) => {
                    warn!("Recovering corrupted lock: {}", e);
                    fs::remove_file(path)?;
                }
            }
        }

        let info = LockInfo::new(step);
        let content =
            serde_json::to_string_pretty(&info).map_err(|e| LockError::Corrupted(e.to_string()))?;

        // create_new: lose the race rather than overwrite a concurrent holder
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => match read_holder(path) {
                    Some(holder) => LockError::AlreadyLocked { holder },
                    None => LockError::Io(e),
                },
                _ => LockError::Io(e),
            })?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;

        info!("Lock acquired: {} (pid={})", path.display(), info.pid);
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Record the current step in the lock file
    pub fn update_step(&self, step: &str) -> io::Result<()> {
        if let Some(mut info) = read_holder(&self.path) {
            info.step = step.to_string();
            let content = serde_json::to_string_pretty(&info)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            fs::write(&self.path, content)?;
        }
        Ok(())
    }

    /// Whether the file still names this process
    pub fn is_valid(&self) -> bool {
        read_holder(&self.path).is_some_and(|info| info.pid == process::id())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_holder(path: &Path) -> Option<LockInfo> {
    let content = fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if self.is_valid() {
            match fs::remove_file(&self.path) {
                Ok(()) => debug!("Lock released: {}", self.path.display()),
                Err(e) => warn!("Failed to release lock {}: {}", self.path.display(), e),
            }
        }
    }
}
