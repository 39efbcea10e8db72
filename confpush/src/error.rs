//! Error types.
//!
//! Each layer has its own enum; [`Error`] wraps them all. Per-device
//! failures of a fleet run are reported as [`DeviceError`] instead.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    #[error("channel: {0}")]
    Channel(#[from] ChannelError),

    #[error("driver: {0}")]
    Driver(#[from] DriverError),

    #[error("platform: {0}")]
    Platform(#[from] PlatformError),

    #[error("inventory: {0}")]
    Inventory(#[from] InventoryError),

    #[error("template: {0}")]
    Template(#[from] TemplateError),

    #[error("backup: {0}")]
    Backup(#[from] BackupError),

    #[error("discovery: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Connecting, authenticating and host key checks.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("cannot connect to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("ssh: {0}")]
    Ssh(#[from] russh::Error),

    #[error("authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    #[error("private key: {0}")]
    Key(String),

    /// Strict checking and no known_hosts entry.
    #[error("host key for {host}:{port} is not in known_hosts")]
    HostKeyUnknown { host: String, port: u16 },

    #[error("host key for {host}:{port} does not match known_hosts line {line}")]
    HostKeyChanged { host: String, port: u16, line: usize },

    #[error("known_hosts: {0}")]
    KnownHosts(String),

    #[error("connection closed by peer")]
    Disconnected,

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Reading from and writing to the shell channel.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("no prompt within {0:?}")]
    PatternTimeout(Duration),

    #[error("shell channel closed")]
    Closed,

    #[error("ssh: {0}")]
    Ssh(russh::Error),
}

/// Running commands and moving between CLI modes.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("not connected")]
    NotConnected,

    #[error("already connected")]
    AlreadyConnected,

    #[error("command failed: {message}")]
    CommandFailed { message: String },

    #[error("could not reach privilege level '{target}'")]
    PrivilegeAcquisitionFailed { target: String },

    #[error("invalid driver configuration: {message}")]
    InvalidConfig { message: String },

    #[error("prompt '{prompt}' matches no privilege level")]
    UnknownPrivilege { prompt: String },

    #[error("no way from privilege level '{from}' to '{to}'")]
    NoPrivilegePath { from: String, to: String },
}

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("invalid platform definition: {message}")]
    InvalidDefinition { message: String },

    /// The device type names no registered platform.
    #[error("unknown device type '{name}'")]
    UnknownPlatform { name: String },
}

/// Inventory file errors.
#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("failed to read inventory {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse inventory {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("device '{device}' is missing required field '{field}'")]
    MissingField { device: String, field: &'static str },

    #[error("inventory must be a list or a mapping of devices, found {found}")]
    UnexpectedShape { found: &'static str },

    #[error("device '{device}': {message}")]
    InvalidDevice { device: String, message: String },

    #[error("hostname '{hostname}' appears more than once in the inventory")]
    DuplicateHostname { hostname: String },

    #[error("unsupported inventory format '{extension}' (expected yaml, yml or json)")]
    UnsupportedFormat { extension: String },
}

/// Template errors.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("failed to read template {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse template: {message}")]
    Parse { message: String },

    #[error("failed to render template for {hostname}: {message}")]
    Render { hostname: String, message: String },
}

/// Backup writer errors.
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("failed to write backup {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("hostname '{hostname}' cannot be used as a backup file name")]
    InvalidHostname { hostname: String },
}

/// Host discovery errors.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("invalid subnet '{input}': {reason}")]
    InvalidSubnet { input: String, reason: String },

    #[error("subnet /{prefix} is too large to sweep (minimum prefix is /{min})")]
    TooLarge { prefix: u8, min: u8 },

    #[error("discovery I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Terminal failure of one device's orchestration.
///
/// Carried in [`Outcome::Failed`](crate::Outcome::Failed); never escalates to
/// a fleet-level error.
#[derive(Error, Debug)]
pub enum DeviceError {
    /// Session could not be created or connected
    #[error("connection error: {0}")]
    Connection(#[source] Error),

    /// A command against a live session failed
    #[error("command error: {0}")]
    Command(#[source] Error),

    /// Backup failed and the backup policy requires it
    #[error("backup error: {0}")]
    Backup(#[from] BackupError),

    /// Desired configuration could not be rendered
    #[error("render error: {0}")]
    Render(#[from] TemplateError),

    /// The device task panicked or was cancelled
    #[error("task aborted: {0}")]
    Aborted(String),
}

impl DeviceError {
    /// Short name of the failure class, for summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            DeviceError::Connection(_) => "ConnectionError",
            DeviceError::Command(_) => "CommandError",
            DeviceError::Backup(_) => "BackupIOError",
            DeviceError::Render(_) => "RenderError",
            DeviceError::Aborted(_) => "Aborted",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
