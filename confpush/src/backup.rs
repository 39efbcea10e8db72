//! Running-configuration backups.

use std::path::{Path, PathBuf};

use log::debug;

use crate::error::BackupError;

/// Writes `<dir>/<hostname>_backup.cfg`, replacing any earlier backup.
///
/// The directory must already exist.
#[derive(Debug, Clone)]
pub struct BackupWriter {
    dir: PathBuf,
}

impl BackupWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path the backup for `hostname` is written to.
    pub fn path_for(&self, hostname: &str) -> Result<PathBuf, BackupError> {
        if hostname.is_empty()
            || hostname == "."
            || hostname == ".."
            || hostname.contains(['/', '\\'])
        {
            return Err(BackupError::InvalidHostname {
                hostname: hostname.to_string(),
            });
        }
        Ok(self.dir.join(format!("{hostname}_backup.cfg")))
    }

    pub async fn write(&self, hostname: &str, config: &str) -> Result<PathBuf, BackupError> {
        let path = self.path_for(hostname)?;
        tokio::fs::write(&path, config)
            .await
            .map_err(|source| BackupError::Io {
                path: path.clone(),
                source,
            })?;
        debug!("Wrote {} bytes to {}", config.len(), path.display());
        Ok(path)
    }
}
