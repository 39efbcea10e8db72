//! SSH connection to a device over russh.

use std::sync::{Arc, Mutex};

use log::debug;
use russh::Channel;
use russh::client::{self, Handle, Msg};
use russh::keys::{PrivateKeyWithHashAlg, PublicKey, load_secret_key};
use secrecy::ExposeSecret;

use super::config::{AuthMethod, SshConfig};
use super::known_hosts::HostKeyCheck;
use crate::error::{Result, TransportError};

/// Authenticated SSH connection to one device.
pub struct SshTransport {
    handle: Handle<ClientHandler>,
    addr: String,
}

impl SshTransport {
    /// Open the TCP connection, run the handshake and log in, all within
    /// the configured timeout for the handshake part.
    pub async fn connect(config: &SshConfig) -> Result<Self> {
        let mut handle = Self::handshake(config).await?;
        Self::login(&mut handle, config).await?;
        debug!("{}: authenticated as {}", config.socket_addr(), config.username);

        Ok(Self {
            handle,
            addr: config.socket_addr(),
        })
    }

    async fn handshake(config: &SshConfig) -> Result<Handle<ClientHandler>> {
        let client_config = Arc::new(client::Config {
            inactivity_timeout: Some(config.timeout),
            ..Default::default()
        });

        let rejection = Arc::new(Mutex::new(None));
        let handler = ClientHandler {
            host_keys: HostKeyCheck {
                host: config.host.clone(),
                port: config.port,
                mode: config.host_key_verification,
                path: config.known_hosts_path.clone(),
            },
            rejection: Arc::clone(&rejection),
        };

        debug!("{}: connecting", config.socket_addr());
        let connecting = client::connect(client_config, (config.host.as_str(), config.port), handler);

        match tokio::time::timeout(config.timeout, connecting).await {
            Err(_) => Err(TransportError::Timeout(config.timeout).into()),
            Ok(Ok(handle)) => Ok(handle),
            Ok(Err(e)) => {
                // russh only reports UnknownKey; the handler kept the real reason.
                let rejected = rejection.lock().ok().and_then(|mut slot| slot.take());
                let err = match (rejected, e) {
                    (Some(reason), _) => reason,
                    (None, russh::Error::IO(source)) => TransportError::ConnectionFailed {
                        host: config.host.clone(),
                        port: config.port,
                        source,
                    },
                    (None, other) => TransportError::Ssh(other),
                };
                Err(err.into())
            }
        }
    }

    async fn login(handle: &mut Handle<ClientHandler>, config: &SshConfig) -> Result<()> {
        let user = config.username.as_str();
        let outcome = match &config.auth {
            AuthMethod::None => handle.authenticate_none(user).await,
            AuthMethod::Password(password) => {
                handle
                    .authenticate_password(user, password.expose_secret())
                    .await
            }
            AuthMethod::PrivateKey { path, passphrase } => {
                let key = load_secret_key(path, passphrase.as_ref().map(|p| p.expose_secret()))
                    .map_err(|e| TransportError::Key(format!("{}: {}", path.display(), e)))?;
                let rsa_hash = handle
                    .best_supported_rsa_hash()
                    .await
                    .map_err(TransportError::Ssh)?
                    .flatten();
                handle
                    .authenticate_publickey(user, PrivateKeyWithHashAlg::new(Arc::new(key), rsa_hash))
                    .await
            }
        };

        if outcome.map_err(TransportError::Ssh)?.success() {
            Ok(())
        } else {
            Err(TransportError::AuthenticationFailed {
                user: user.to_string(),
            }
            .into())
        }
    }

    /// Open a session channel with a PTY and start the login shell.
    pub async fn open_channel(&self, width: u32, height: u32) -> Result<Channel<Msg>> {
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(TransportError::Ssh)?;
        channel
            .request_pty(true, "xterm", width, height, 0, 0, &[])
            .await
            .map_err(TransportError::Ssh)?;
        channel
            .request_shell(true)
            .await
            .map_err(TransportError::Ssh)?;
        Ok(channel)
    }

    pub async fn close(self) -> Result<()> {
        debug!("{}: disconnecting", self.addr);
        self.handle
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }
}

struct ClientHandler {
    host_keys: HostKeyCheck,
    /// Why the host key was refused, for `handshake` to report.
    rejection: Arc<Mutex<Option<TransportError>>>,
}

impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match self.host_keys.verify(server_public_key) {
            Ok(()) => Ok(true),
            Err(reason) => {
                if let Ok(mut slot) = self.rejection.lock() {
                    *slot = Some(reason);
                }
                Ok(false)
            }
        }
    }
}
