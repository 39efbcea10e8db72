//! Prompt-driven CLI driver that works with any platform definition.

use std::time::{Duration, Instant};

use log::{debug, warn};
use regex::bytes::Regex;
use secrecy::ExposeSecret;

use super::privilege::PrivilegeManager;
use super::response::{Response, detect_failure, normalize_output};
use crate::channel::{DEFAULT_SEARCH_DEPTH, PtyChannel};
use crate::error::{DriverError, PlatformError, Result};
use crate::platform::PlatformDefinition;
use crate::transport::{AuthMethod, SshConfig, SshTransport};

/// Driver for one device: owns the SSH connection, the shell channel and
/// the current privilege level.
pub struct GenericDriver {
    ssh_config: SshConfig,

    platform: PlatformDefinition,

    /// SSH transport (None when disconnected).
    transport: Option<SshTransport>,

    /// Shell channel on the transport (None when disconnected).
    channel: Option<PtyChannel>,

    privilege_manager: PrivilegeManager,

    /// Timeout for each prompt wait.
    timeout: Duration,

    /// Combined prompt pattern for all privilege levels.
    prompt_pattern: Regex,
}

impl GenericDriver {
    pub fn new(ssh_config: SshConfig, platform: PlatformDefinition) -> Result<Self> {
        let timeout = ssh_config.timeout;
        let privilege_manager = PrivilegeManager::new(platform.privilege_levels.clone());
        let prompt_pattern = Self::build_combined_pattern(&platform)?;

        Ok(Self {
            ssh_config,
            platform,
            transport: None,
            channel: None,
            privilege_manager,
            timeout,
            prompt_pattern,
        })
    }

    /// Build a regex that matches the prompt of any privilege level.
    fn build_combined_pattern(platform: &PlatformDefinition) -> Result<Regex> {
        if platform.privilege_levels.is_empty() {
            return Err(PlatformError::InvalidDefinition {
                message: format!("platform '{}' has no privilege levels", platform.name),
            }
            .into());
        }

        let combined = platform
            .privilege_levels
            .values()
            .map(|level| format!("(?:{})", level.pattern.as_str()))
            .collect::<Vec<_>>()
            .join("|");

        Regex::new(&combined).map_err(|e| {
            PlatformError::InvalidDefinition {
                message: e.to_string(),
            }
            .into()
        })
    }

    pub fn platform(&self) -> &PlatformDefinition {
        &self.platform
    }

    pub fn host(&self) -> &str {
        &self.ssh_config.host
    }

    pub fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    pub fn current_privilege(&self) -> Option<&str> {
        self.privilege_manager.current().map(|l| l.name.as_str())
    }

    /// Connect, wait for the first prompt, move to the default privilege
    /// level and run the platform's on-open commands.
    pub async fn open(&mut self) -> Result<()> {
        if self.transport.is_some() {
            return Err(DriverError::AlreadyConnected.into());
        }

        let transport = SshTransport::connect(&self.ssh_config).await?;
        let channel = match transport
            .open_channel(self.platform.terminal_width, self.platform.terminal_height)
            .await
        {
            Ok(channel) => channel,
            Err(e) => {
                let _ = transport.close().await;
                return Err(e);
            }
        };
        self.transport = Some(transport);
        self.channel = Some(PtyChannel::new(channel, DEFAULT_SEARCH_DEPTH));

        if let Err(e) = self.prepare_session().await {
            let _ = self.close().await;
            return Err(e);
        }
        Ok(())
    }

    async fn prepare_session(&mut self) -> Result<()> {
        let (_, prompt) = self.read_until_prompt(&self.prompt_pattern.clone()).await?;
        self.update_privilege(&prompt);
        debug!(
            "{}: initial prompt {:?} ({:?})",
            self.ssh_config.host,
            prompt,
            self.current_privilege()
        );

        let default_privilege = self.platform.default_privilege.clone();
        if !default_privilege.is_empty() {
            self.acquire_privilege(&default_privilege).await?;
        }

        for command in self.platform.on_open_commands.clone() {
            let response = self.send_command(&command).await?;
            if !response.is_success() {
                warn!(
                    "{}: on-open command {:?} failed: {}",
                    self.ssh_config.host,
                    command,
                    response.failure_message.as_deref().unwrap_or_default()
                );
            }
        }
        Ok(())
    }

    /// Close the shell channel and the SSH connection. No-op when closed.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(channel) = self.channel.take() {
            if let Err(e) = channel.close().await {
                debug!("{}: channel close: {}", self.ssh_config.host, e);
            }
        }
        if let Some(transport) = self.transport.take() {
            transport.close().await?;
        }
        Ok(())
    }

    /// Send a command and wait for the prompt.
    pub async fn send_command(&mut self, command: &str) -> Result<Response> {
        let start = Instant::now();
        let channel = self.channel.as_mut().ok_or(DriverError::NotConnected)?;

        channel.send(command).await?;
        let data = channel
            .read_until_pattern(&self.prompt_pattern, self.timeout)
            .await?;

        let raw_result = String::from_utf8_lossy(&data).to_string();
        let prompt = last_line(&raw_result).to_string();
        self.update_privilege(&prompt);

        let result = normalize_output(&raw_result, command);
        let response = Response::new(command, result, raw_result, prompt, start.elapsed());

        match detect_failure(&response.result, &self.platform.failed_when_contains) {
            Some(pattern) => {
                let pattern = pattern.to_string();
                Ok(response.with_failure(pattern))
            }
            None => Ok(response),
        }
    }

    /// Send configuration lines in configuration mode.
    ///
    /// Enters the platform's configuration privilege, sends each line,
    /// commits when the platform has a candidate datastore and returns to
    /// the default privilege. Stops at the first line whose output matches
    /// a failure pattern.
    pub async fn send_config(&mut self, lines: &[String]) -> Result<Vec<Response>> {
        let config_privilege = self.platform.config_privilege.clone();
        if config_privilege.is_empty() {
            return Err(DriverError::InvalidConfig {
                message: format!("platform '{}' has no configuration mode", self.platform.name),
            }
            .into());
        }

        self.acquire_privilege(&config_privilege).await?;

        let mut responses = Vec::with_capacity(lines.len() + 1);
        for line in lines {
            let response = self.send_command(line).await?;
            if let Some(message) = response.failure_message.clone() {
                self.discard_candidate().await;
                return Err(DriverError::CommandFailed {
                    message: format!("'{line}': {message}"),
                }
                .into());
            }
            responses.push(response);
        }

        if let Some(commit) = self.platform.commit_command.clone() {
            let response = self.send_command(&commit).await?;
            if let Some(message) = response.failure_message.clone() {
                self.discard_candidate().await;
                return Err(DriverError::CommandFailed {
                    message: format!("'{commit}': {message}"),
                }
                .into());
            }
            responses.push(response);
        }

        let default_privilege = self.platform.default_privilege.clone();
        self.acquire_privilege(&default_privilege).await?;

        Ok(responses)
    }

    /// Best-effort cleanup after a failed config line.
    async fn discard_candidate(&mut self) {
        if self.platform.commit_command.is_some() {
            if let Err(e) = self.send_command("rollback 0").await {
                warn!("{}: rollback of candidate failed: {}", self.ssh_config.host, e);
            }
        }
        let default_privilege = self.platform.default_privilege.clone();
        if let Err(e) = self.acquire_privilege(&default_privilege).await {
            warn!("{}: could not leave configuration mode: {}", self.ssh_config.host, e);
        }
    }

    /// Walk the privilege graph to `target`, authenticating where a
    /// transition asks for a password.
    pub async fn acquire_privilege(&mut self, target: &str) -> Result<()> {
        let current = self
            .privilege_manager
            .current()
            .map(|l| l.name.clone())
            .unwrap_or_default();

        if current == target {
            return Ok(());
        }

        let path = self.privilege_manager.find_path(&current, target)?;

        for step in path.windows(2) {
            let (from, to) = (&step[0], &step[1]);

            let transition = self
                .privilege_manager
                .get_transition(from, to)
                .ok_or_else(|| DriverError::NoPrivilegePath {
                    from: from.clone(),
                    to: to.clone(),
                })?;

            debug!("{}: {} -> {} via {:?}", self.ssh_config.host, from, to, transition.command);
            self.channel
                .as_mut()
                .ok_or(DriverError::NotConnected)?
                .send(&transition.command)
                .await?;

            let prompt = match transition.auth_prompt {
                Some(auth_prompt) => self.answer_auth_prompt(&auth_prompt).await?,
                None => self.read_until_prompt(&self.prompt_pattern.clone()).await?.1,
            };

            self.update_privilege(&prompt);
            if self.current_privilege() != Some(to.as_str()) {
                return Err(DriverError::PrivilegeAcquisitionFailed { target: to.clone() }.into());
            }
        }

        Ok(())
    }

    /// Wait for either the auth prompt or a device prompt; answer the former
    /// with the login password. Returns the final prompt.
    async fn answer_auth_prompt(&mut self, auth_prompt: &Regex) -> Result<String> {
        let either = Regex::new(&format!(
            "(?:{})|(?:{})",
            auth_prompt.as_str(),
            self.prompt_pattern.as_str()
        ))
        .map_err(|e| PlatformError::InvalidDefinition {
            message: e.to_string(),
        })?;

        let (output, last) = self.read_until_prompt(&either).await?;
        if !auth_prompt.is_match(last.as_bytes()) && !auth_prompt.is_match(output.as_bytes()) {
            return Ok(last);
        }

        let password = match &self.ssh_config.auth {
            AuthMethod::Password(password) => password.expose_secret().to_string(),
            _ => String::new(),
        };
        self.channel
            .as_mut()
            .ok_or(DriverError::NotConnected)?
            .send(&password)
            .await?;

        Ok(self.read_until_prompt(&self.prompt_pattern.clone()).await?.1)
    }

    /// Read until `pattern` matches; returns the output and its last line.
    async fn read_until_prompt(&mut self, pattern: &Regex) -> Result<(String, String)> {
        let channel = self.channel.as_mut().ok_or(DriverError::NotConnected)?;
        let data = channel.read_until_pattern(pattern, self.timeout).await?;
        let output = String::from_utf8_lossy(&data).to_string();
        let prompt = last_line(&output).to_string();
        Ok((output, prompt))
    }

    fn update_privilege(&mut self, prompt: &str) {
        if let Ok(level) = self.privilege_manager.determine_from_prompt(prompt) {
            let name = level.name.clone();
            let _ = self.privilege_manager.set_current(&name);
        }
    }
}

/// Last non-empty line of shell output, which is where the prompt sits.
fn last_line(output: &str) -> &str {
    output
        .trim_end_matches(['\r', '\n'])
        .rsplit(['\r', '\n'])
        .next()
        .unwrap_or_default()
        .trim()
}
