//! The push pipeline for one device.
//!
//! connect → fetch running config → backup → render → diff → apply if
//! changed → close. The session is closed on every path once it exists, and
//! no error escapes: everything ends up in an [`Outcome`].

use std::fmt;
use std::sync::Arc;

use log::{error, info, warn};

use crate::backup::BackupWriter;
use crate::config::BackupPolicy;
use crate::diff::{diff_lines, unified_diff};
use crate::error::DeviceError;
use crate::inventory::DeviceRecord;
use crate::session::{DeviceSession, SessionFactory};
use crate::template::TemplateRenderer;

const DIFF_CONTEXT_LINES: usize = 3;

/// Result of orchestrating one device.
#[derive(Debug)]
pub enum Outcome {
    Applied,
    NoChangeNeeded,
    Failed(DeviceError),
}

impl Outcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Applied => write!(f, "applied"),
            Outcome::NoChangeNeeded => write!(f, "no change needed"),
            Outcome::Failed(err) => write!(f, "failed ({}: {})", err.kind(), err),
        }
    }
}

/// Runs the pipeline for one device at a time; shared by all device tasks.
pub struct DeviceOrchestrator<F> {
    factory: Arc<F>,
    renderer: Arc<dyn TemplateRenderer>,
    backups: BackupWriter,
    backup_policy: BackupPolicy,
}

impl<F: SessionFactory> DeviceOrchestrator<F> {
    pub fn new(factory: F, renderer: Arc<dyn TemplateRenderer>, backups: BackupWriter) -> Self {
        Self {
            factory: Arc::new(factory),
            renderer,
            backups,
            backup_policy: BackupPolicy::default(),
        }
    }

    pub fn with_backup_policy(mut self, policy: BackupPolicy) -> Self {
        self.backup_policy = policy;
        self
    }

    pub fn backup_policy(&self) -> BackupPolicy {
        self.backup_policy
    }

    pub async fn run(&self, device: &DeviceRecord) -> Outcome {
        let hostname = device.hostname.as_str();

        let mut session = match self.factory.create(device) {
            Ok(session) => session,
            Err(e) => {
                error!("Failed to set up session for {hostname}: {e}");
                return Outcome::Failed(DeviceError::Connection(e));
            }
        };

        let outcome = self.drive(&mut session, device).await;

        if let Err(e) = session.close().await {
            warn!("Failed to close connection to {hostname}: {e}");
        }
        outcome
    }

    async fn drive(&self, session: &mut F::Session, device: &DeviceRecord) -> Outcome {
        let hostname = device.hostname.as_str();

        if let Err(e) = session.connect().await {
            error!("Failed to connect to {hostname}: {e}");
            return Outcome::Failed(DeviceError::Connection(e));
        }

        let current = match session.get_running_config().await {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to fetch running configuration from {hostname}: {e}");
                return Outcome::Failed(DeviceError::Command(e));
            }
        };

        match self.backups.write(hostname, &current).await {
            Ok(path) => info!("Backup of {hostname} saved to {}", path.display()),
            Err(e) => match self.backup_policy {
                BackupPolicy::BestEffort => {
                    error!("Failed to back up {hostname}: {e}");
                }
                BackupPolicy::Required => {
                    error!("Failed to back up {hostname}, skipping device: {e}");
                    return Outcome::Failed(DeviceError::Backup(e));
                }
            },
        }

        let desired = match self.renderer.render(device) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to render configuration for {hostname}: {e}");
                return Outcome::Failed(DeviceError::Render(e));
            }
        };

        let comparable = session.comparable_config(&current);
        let current_lines: Vec<&str> = comparable.lines().collect();
        let desired_lines: Vec<&str> = desired.lines().collect();
        let diff = diff_lines(&current_lines, &desired_lines);

        if !diff.has_changes {
            info!("No configuration changes for {hostname}");
            return Outcome::NoChangeNeeded;
        }

        info!("Configuration changes for {hostname}:");
        for line in unified_diff(
            &current_lines,
            &desired_lines,
            "Current Config",
            "New Config",
            DIFF_CONTEXT_LINES,
        ) {
            info!("{line}");
        }

        let commands: Vec<String> = desired_lines
            .iter()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.to_string())
            .collect();

        match session.run_config_set(&commands).await {
            Ok(()) => {
                info!("Configuration applied to {hostname}");
                Outcome::Applied
            }
            Err(e) => {
                error!("Failed to apply configuration to {hostname}: {e}");
                Outcome::Failed(DeviceError::Command(e))
            }
        }
    }
}

impl<F> fmt::Debug for DeviceOrchestrator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceOrchestrator")
            .field("backup_dir", &self.backups.dir())
            .field("backup_policy", &self.backup_policy)
            .finish_non_exhaustive()
    }
}
