//! SSH transport on top of russh.
//!
//! Connecting, logging in, checking host keys and opening the interactive
//! shell the driver talks to.

pub mod config;
mod known_hosts;
mod ssh;

pub use config::{AuthMethod, HostKeyVerification, SshConfig};
pub use ssh::SshTransport;
