//! Configuration management.
//!
//! Loads settings from /etc/steward/config.toml, then the user's XDG
//! config dir, then built-in defaults.

use crate::error::{Result, StewardError};
use crate::report::StepKind;
use crate::retention::DEFAULT_KEEP_KERNELS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// System-wide config file path
pub const CONFIG_PATH: &str = "/etc/steward/config.toml";

/// Debian's reboot marker
pub const DEFAULT_REBOOT_MARKER: &str = "/run/reboot-required";

/// Toggles for optional pipeline steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepsConfig {
    #[serde(default = "default_true")]
    pub backup: bool,
    #[serde(default = "default_true")]
    pub snapshot: bool,
    #[serde(default = "default_true")]
    pub flatpak: bool,
    #[serde(default = "default_true")]
    pub snap: bool,
    #[serde(default = "default_true")]
    pub firmware: bool,
    #[serde(default = "default_true")]
    pub cleanup: bool,
}

impl Default for StepsConfig {
    fn default() -> Self {
        Self {
            backup: true,
            snapshot: true,
            flatpak: true,
            snap: true,
            firmware: true,
            cleanup: true,
        }
    }
}

impl StepsConfig {
    /// Whether the step is enabled; mandatory steps always are
    pub fn enabled(&self, step: StepKind) -> bool {
        match step {
            StepKind::Backup => self.backup,
            StepKind::Snapshot => self.snapshot,
            StepKind::FlatpakUpdate => self.flatpak,
            StepKind::SnapUpdate => self.snap,
            StepKind::FirmwareCheck => self.firmware,
            StepKind::Cleanup => self.cleanup,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupConfig {
    #[serde(default = "default_backup_dir")]
    pub target_dir: PathBuf,

    /// Files and directories copied on every run
    #[serde(default = "default_backup_paths")]
    pub paths: Vec<PathBuf>,

    /// Number of backup generations kept
    #[serde(default = "default_backup_keep")]
    pub keep: usize,
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("/var/backups/steward")
}

fn default_backup_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/etc/apt/sources.list"),
        PathBuf::from("/etc/apt/sources.list.d"),
        PathBuf::from("/etc/apt/preferences.d"),
        PathBuf::from("/etc/fstab"),
    ]
}

fn default_backup_keep() -> usize {
    5
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            target_dir: default_backup_dir(),
            paths: default_backup_paths(),
            keep: default_backup_keep(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Abort upgrades when the snapshot fails
    #[serde(default)]
    pub required: bool,

    #[serde(default = "default_snapshot_comment")]
    pub comment: String,
}

fn default_snapshot_comment() -> String {
    "steward pre-upgrade".to_string()
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            required: false,
            comment: default_snapshot_comment(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebootConfig {
    #[serde(default = "default_marker_path")]
    pub marker_path: PathBuf,

    /// Units whose pending restart means core libraries changed
    #[serde(default = "default_critical_units")]
    pub critical_units: Vec<String>,
}

fn default_marker_path() -> PathBuf {
    PathBuf::from(DEFAULT_REBOOT_MARKER)
}

fn default_critical_units() -> Vec<String> {
    ["dbus.service", "dbus-broker.service", "systemd-logind.service", "systemd-journald.service"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for RebootConfig {
    fn default() -> Self {
        Self {
            marker_path: default_marker_path(),
            critical_units: default_critical_units(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareConfig {
    /// Install firmware updates instead of only reporting them
    #[serde(default)]
    pub apply: bool,
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Kernel images kept besides the running one
    #[serde(default = "default_keep_kernels")]
    pub keep_kernels: usize,

    /// Never prompt; assume yes
    #[serde(default)]
    pub unattended: bool,

    #[serde(default = "default_connectivity_host")]
    pub connectivity_host: String,

    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Warn when / has less free space than this
    #[serde(default = "default_min_free_space")]
    pub min_free_space_mb: u64,

    /// Override for the run log location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    #[serde(default = "default_lock_path")]
    pub lock_path: PathBuf,

    #[serde(default)]
    pub steps: StepsConfig,

    #[serde(default)]
    pub backup: BackupConfig,

    #[serde(default)]
    pub snapshot: SnapshotConfig,

    #[serde(default)]
    pub reboot: RebootConfig,

    #[serde(default)]
    pub firmware: FirmwareConfig,
}

fn default_true() -> bool {
    true
}

fn default_keep_kernels() -> usize {
    DEFAULT_KEEP_KERNELS
}

fn default_connectivity_host() -> String {
    "deb.debian.org".to_string()
}

fn default_command_timeout() -> u64 {
    // apt-get dist-upgrade on a slow mirror
    3600
}

fn default_min_free_space() -> u64 {
    1024
}

fn default_lock_path() -> PathBuf {
    PathBuf::from("/run/steward/steward.lock")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keep_kernels: default_keep_kernels(),
            unattended: false,
            connectivity_host: default_connectivity_host(),
            command_timeout_secs: default_command_timeout(),
            min_free_space_mb: default_min_free_space(),
            log_file: None,
            lock_path: default_lock_path(),
            steps: StepsConfig::default(),
            backup: BackupConfig::default(),
            snapshot: SnapshotConfig::default(),
            reboot: RebootConfig::default(),
            firmware: FirmwareConfig::default(),
        }
    }
}

impl Config {
    /// Load config from the standard locations, or defaults
    pub fn load() -> Self {
        let candidates = Self::search_paths();
        for path in &candidates {
            if !path.exists() {
                continue;
            }
            match Self::load_from_path(path) {
                Ok(config) => {
                    debug!("Loaded config from {}", path.display());
                    return config;
                }
                Err(e) => warn!("Ignoring config {}: {}", path.display(), e),
            }
        }
        debug!("No config file found, using defaults");
        Config::default()
    }

    /// System path first, then $XDG_CONFIG_HOME/steward/config.toml
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_PATH)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("steward").join("config.toml"));
        }
        paths
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| StewardError::ConfigLoad {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config (refuses to overwrite unless `force`)
    pub fn save_default(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            return Err(StewardError::InvalidConfiguration(format!(
                "{} already exists (use --force to overwrite)",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, Config::default().to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.keep_kernels < 1 {
            return Err(StewardError::InvalidConfiguration(
                "keep_kernels must be at least 1".to_string(),
            ));
        }
        if self.command_timeout_secs == 0 {
            return Err(StewardError::InvalidConfiguration(
                "command_timeout_secs must be positive".to_string(),
            ));
        }
        if self.backup.keep < 1 {
            return Err(StewardError::InvalidConfiguration(
                "backup.keep must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
