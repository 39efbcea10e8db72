//! Assembling a [`GenericDriver`] from connection settings and a device type.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use super::generic::GenericDriver;
use crate::error::{DriverError, Result};
use crate::platform::{PlatformDefinition, PlatformRegistry};
use crate::transport::{AuthMethod, HostKeyVerification, SshConfig};

/// Collects connection settings and resolves the platform.
///
/// ```rust,no_run
/// use confpush::DriverBuilder;
///
/// # async fn example() -> Result<(), confpush::Error> {
/// let mut driver = DriverBuilder::new("192.0.2.1")
///     .username("netops")
///     .password("secret")
///     .platform("ios")
///     .build()?;
/// driver.open().await?;
/// # Ok(())
/// # }
/// ```
pub struct DriverBuilder {
    host: String,
    port: u16,
    username: Option<String>,
    auth: AuthMethod,
    platform_name: Option<String>,
    custom_platform: Option<PlatformDefinition>,
    timeout: Duration,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
}

impl DriverBuilder {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: None,
            auth: AuthMethod::None,
            platform_name: None,
            custom_platform: None,
            timeout: Duration::from_secs(30),
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.auth = AuthMethod::Password(SecretString::from(password.into()));
        self
    }

    /// Like [`password`](Self::password), for a secret already wrapped.
    pub fn secret_password(mut self, password: SecretString) -> Self {
        self.auth = AuthMethod::Password(password);
        self
    }

    /// Log in with an OpenSSH private key instead of a password.
    pub fn private_key(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: None,
        };
        self
    }

    /// Device type or platform name, resolved through the global registry.
    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform_name = Some(platform.into());
        self
    }

    /// Use a platform definition that is not in the registry.
    pub fn custom_platform(mut self, platform: PlatformDefinition) -> Self {
        self.custom_platform = Some(platform);
        self
    }

    /// Bound on connecting and on each prompt wait (default 30s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    pub fn known_hosts_path(mut self, path: Option<PathBuf>) -> Self {
        self.known_hosts_path = path;
        self
    }

    /// Does not connect; that is [`GenericDriver::open`].
    pub fn build(self) -> Result<GenericDriver> {
        let username = self.username.ok_or_else(|| DriverError::InvalidConfig {
            message: "username is required".to_string(),
        })?;

        let platform = match (self.custom_platform, self.platform_name) {
            (Some(custom), _) => custom,
            (None, Some(name)) => PlatformRegistry::global().resolve(&name)?.clone(),
            (None, None) => {
                return Err(DriverError::InvalidConfig {
                    message: "platform must be specified".to_string(),
                }
                .into());
            }
        };

        let ssh_config = SshConfig {
            host: self.host,
            port: self.port,
            username,
            auth: self.auth,
            timeout: self.timeout,
            terminal_width: platform.terminal_width,
            terminal_height: platform.terminal_height,
            host_key_verification: self.host_key_verification,
            known_hosts_path: self.known_hosts_path,
        };

        GenericDriver::new(ssh_config, platform)
    }
}
