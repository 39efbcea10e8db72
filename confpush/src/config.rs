//! Run configuration shared by the binary and the library entry points.

use std::path::PathBuf;
use std::time::Duration;

use crate::transport::HostKeyVerification;

/// Default number of devices configured at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

/// Default directory for running-configuration backups.
pub const DEFAULT_BACKUP_DIR: &str = "./backups";

/// What a failed backup means for the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackupPolicy {
    /// Log the failure and keep going.
    #[default]
    BestEffort,
    /// Fail the device before anything is pushed.
    Required,
}

/// SSH connection settings applied to every device.
#[derive(Debug, Clone)]
pub struct SshSettings {
    pub port: u16,
    /// Bound on connecting and on each wait for a prompt.
    pub timeout: Duration,
    pub host_key_verification: HostKeyVerification,
    /// Defaults to `~/.ssh/known_hosts` when unset.
    pub known_hosts_path: Option<PathBuf>,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            port: 22,
            timeout: Duration::from_secs(30),
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }
}

/// Everything a fleet run needs besides the inventory and the template.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub backup_dir: PathBuf,
    pub max_concurrency: usize,
    pub backup_policy: BackupPolicy,
    pub ssh: SshSettings,
    pub discovery_timeout: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            backup_policy: BackupPolicy::default(),
            ssh: SshSettings::default(),
            discovery_timeout: Duration::from_secs(3),
        }
    }
}
