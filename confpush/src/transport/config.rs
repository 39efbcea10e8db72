//! Connection parameters for one device.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

/// How the server's host key is checked against known_hosts, in the
/// spirit of OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HostKeyVerification {
    /// Only hosts already in known_hosts are accepted.
    Strict,

    /// Unknown hosts are accepted and recorded; a changed key is refused.
    #[default]
    AcceptNew,

    /// Any key is accepted. Lab networks only.
    Disabled,
}

/// Credentials presented to the device.
#[derive(Debug)]
pub enum AuthMethod {
    /// The `none` method; some lab images accept it.
    None,

    Password(SecretString),

    PrivateKey {
        path: PathBuf,
        passphrase: Option<SecretString>,
    },
}

/// Everything needed to reach and log in to one device.
#[derive(Debug)]
pub struct SshConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub auth: AuthMethod,

    /// Bounds the TCP/SSH handshake, idle time on the session and each
    /// wait for a prompt.
    pub timeout: Duration,

    /// PTY size requested for the shell.
    pub terminal_width: u32,
    pub terminal_height: u32,

    pub host_key_verification: HostKeyVerification,

    /// `None` means `~/.ssh/known_hosts`.
    pub known_hosts_path: Option<PathBuf>,
}

impl SshConfig {
    /// `host:port`, for log lines.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
