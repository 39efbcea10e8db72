//! Host key checks against an OpenSSH known_hosts file.

use std::path::PathBuf;

use log::{info, warn};
use russh::keys::PublicKey;

use super::config::HostKeyVerification;
use crate::error::TransportError;

/// Host key policy for one connection.
#[derive(Debug, Clone)]
pub(crate) struct HostKeyCheck {
    pub host: String,
    pub port: u16,
    pub mode: HostKeyVerification,
    pub path: Option<PathBuf>,
}

impl HostKeyCheck {
    /// Accept or refuse `key` according to the mode. Unknown keys are
    /// recorded in `AcceptNew` mode; failing to record one is not fatal.
    pub fn verify(&self, key: &PublicKey) -> Result<(), TransportError> {
        if self.mode == HostKeyVerification::Disabled {
            return Ok(());
        }

        if self.is_known(key)? {
            return Ok(());
        }

        match self.mode {
            HostKeyVerification::Strict => Err(TransportError::HostKeyUnknown {
                host: self.host.clone(),
                port: self.port,
            }),
            _ => {
                match self.learn(key) {
                    Ok(()) => info!("Added host key for {}:{} to known_hosts", self.host, self.port),
                    Err(e) => warn!("Could not record host key for {}: {}", self.host, e),
                }
                Ok(())
            }
        }
    }

    /// `Ok(false)` when the host has no entry; an error when the entry has
    /// a different key.
    fn is_known(&self, key: &PublicKey) -> Result<bool, TransportError> {
        let lookup = match &self.path {
            Some(path) => russh::keys::check_known_hosts_path(&self.host, self.port, key, path),
            None => russh::keys::check_known_hosts(&self.host, self.port, key),
        };

        lookup.map_err(|e| match e {
            russh::keys::Error::KeyChanged { line } => TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            },
            other => TransportError::KnownHosts(other.to_string()),
        })
    }

    fn learn(&self, key: &PublicKey) -> Result<(), TransportError> {
        let saved = match &self.path {
            Some(path) => {
                russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, key, path)
            }
            None => russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, key),
        };
        saved.map_err(|e| TransportError::KnownHosts(e.to_string()))
    }
}
