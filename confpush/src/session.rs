//! Device sessions: the operations the orchestrator needs from a device.
//!
//! [`DeviceSession`] is the seam between the push pipeline and the wire.
//! [`SshSession`] implements it over the SSH driver; tests plug in
//! in-memory sessions through [`SessionFactory`].

use std::future::Future;

use log::info;
use secrecy::ExposeSecret;

use crate::config::SshSettings;
use crate::driver::{DriverBuilder, GenericDriver};
use crate::error::{DriverError, Result};
use crate::inventory::DeviceRecord;

/// Lifecycle of a session. A session is used once: it never reopens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    Closed,
}

/// A live CLI connection to one device.
pub trait DeviceSession: Send {
    fn connect(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Run an exec-mode command and return its output.
    fn run_command(&mut self, command: &str) -> impl Future<Output = Result<String>> + Send;

    /// Enter configuration mode, send `lines` in order and leave it again.
    fn run_config_set(&mut self, lines: &[String]) -> impl Future<Output = Result<()>> + Send;

    /// Fetch the running configuration as the device prints it.
    fn get_running_config(&mut self) -> impl Future<Output = Result<String>> + Send {
        self.run_command("show running-config")
    }

    /// The part of a fetched configuration that is compared with the
    /// rendered one. Banners and timestamps the device adds are dropped.
    fn comparable_config(&self, config: &str) -> String {
        config.to_string()
    }

    /// Release the connection. No-op unless connected.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    fn state(&self) -> SessionState;
}

/// Creates one session per device.
pub trait SessionFactory: Send + Sync + 'static {
    type Session: DeviceSession + 'static;

    fn create(&self, device: &DeviceRecord) -> Result<Self::Session>;
}

/// [`DeviceSession`] over the prompt-driven SSH driver.
pub struct SshSession {
    driver: GenericDriver,
    state: SessionState,
}

impl SshSession {
    pub fn new(driver: GenericDriver) -> Self {
        Self {
            driver,
            state: SessionState::Disconnected,
        }
    }

    pub fn driver(&self) -> &GenericDriver {
        &self.driver
    }
}

impl DeviceSession for SshSession {
    async fn connect(&mut self) -> Result<()> {
        if self.state != SessionState::Disconnected {
            return Err(DriverError::AlreadyConnected.into());
        }
        self.driver.open().await?;
        self.state = SessionState::Connected;
        info!(
            "Connected to {} ({})",
            self.driver.host(),
            self.driver.platform().name
        );
        Ok(())
    }

    async fn run_command(&mut self, command: &str) -> Result<String> {
        let response = self.driver.send_command(command).await?;
        match response.failure_message {
            Some(message) => Err(DriverError::CommandFailed {
                message: format!("'{command}': {message}"),
            }
            .into()),
            None => Ok(response.result),
        }
    }

    async fn run_config_set(&mut self, lines: &[String]) -> Result<()> {
        self.driver.send_config(lines).await?;
        Ok(())
    }

    async fn get_running_config(&mut self) -> Result<String> {
        let command = self.driver.platform().running_config_command.clone();
        self.run_command(&command).await
    }

    fn comparable_config(&self, config: &str) -> String {
        self.driver.platform().strip_volatile_lines(config)
    }

    async fn close(&mut self) -> Result<()> {
        let was_connected = self.state == SessionState::Connected;
        self.state = SessionState::Closed;
        if was_connected {
            self.driver.close().await?;
            info!("Closed connection to {}", self.driver.host());
        }
        Ok(())
    }

    fn state(&self) -> SessionState {
        self.state
    }
}

/// Builds [`SshSession`]s from inventory records.
#[derive(Debug, Clone, Default)]
pub struct SshSessionFactory {
    settings: SshSettings,
}

impl SshSessionFactory {
    pub fn new(settings: SshSettings) -> Self {
        Self { settings }
    }
}

impl SessionFactory for SshSessionFactory {
    type Session = SshSession;

    fn create(&self, device: &DeviceRecord) -> Result<SshSession> {
        let driver = DriverBuilder::new(&device.hostname)
            .port(self.settings.port)
            .username(&device.username)
            .password(device.password.expose_secret())
            .platform(&device.device_type)
            .timeout(self.settings.timeout)
            .host_key_verification(self.settings.host_key_verification)
            .known_hosts_path(self.settings.known_hosts_path.clone())
            .build()?;
        Ok(SshSession::new(driver))
    }
}
