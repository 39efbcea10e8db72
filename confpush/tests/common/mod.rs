//! In-memory devices for exercising the push pipeline without SSH.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use confpush::error::{DriverError, TemplateError, TransportError};
use confpush::{DeviceRecord, DeviceSession, Result, SessionFactory, SessionState, TemplateRenderer};

/// How a fake device behaves.
#[derive(Debug, Clone, Default)]
pub struct FakeDevice {
    pub running_config: String,
    pub unreachable: bool,
    pub fetch_fails: bool,
    pub push_fails: bool,
    /// Panic while the running config is fetched.
    pub crashes: bool,
    /// Time spent fetching the running config, to make sessions overlap.
    pub latency: Duration,
}

impl FakeDevice {
    pub fn with_config(config: &str) -> Self {
        Self {
            running_config: config.to_string(),
            ..Self::default()
        }
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }
}

/// Counters shared by every session a factory hands out.
#[derive(Debug, Default)]
pub struct Stats {
    pub connects: AtomicUsize,
    pub closes: AtomicUsize,
    pub fetches: AtomicUsize,
    pub active: AtomicUsize,
    pub peak_active: AtomicUsize,
    pub pushes: Mutex<Vec<(String, Vec<String>)>>,
    pub events: Mutex<Vec<String>>,
}

impl Stats {
    pub fn config_set_calls(&self) -> usize {
        self.pushes.lock().unwrap().len()
    }

    pub fn pushed_to(&self, hostname: &str) -> Option<Vec<String>> {
        self.pushes
            .lock()
            .unwrap()
            .iter()
            .find(|(h, _)| h == hostname)
            .map(|(_, lines)| lines.clone())
    }

    fn event(&self, hostname: &str, what: &str) {
        self.events.lock().unwrap().push(format!("{hostname}:{what}"));
    }
}

pub struct FakeFactory {
    devices: HashMap<String, FakeDevice>,
    backup_dir: Option<PathBuf>,
    pub stats: Arc<Stats>,
}

impl FakeFactory {
    pub fn new(devices: impl IntoIterator<Item = (&'static str, FakeDevice)>) -> Self {
        Self {
            devices: devices
                .into_iter()
                .map(|(h, d)| (h.to_string(), d))
                .collect(),
            backup_dir: None,
            stats: Arc::new(Stats::default()),
        }
    }

    /// Record a `backup` event when a push finds the device's backup file
    /// already written in `dir`.
    pub fn watching_backups(mut self, dir: &std::path::Path) -> Self {
        self.backup_dir = Some(dir.to_path_buf());
        self
    }
}

impl SessionFactory for FakeFactory {
    type Session = FakeSession;

    fn create(&self, device: &DeviceRecord) -> Result<FakeSession> {
        let behavior = self
            .devices
            .get(&device.hostname)
            .cloned()
            .unwrap_or_else(FakeDevice::unreachable);
        Ok(FakeSession {
            hostname: device.hostname.clone(),
            behavior,
            backup_dir: self.backup_dir.clone(),
            stats: Arc::clone(&self.stats),
            state: SessionState::Disconnected,
        })
    }
}

pub struct FakeSession {
    hostname: String,
    behavior: FakeDevice,
    backup_dir: Option<PathBuf>,
    stats: Arc<Stats>,
    state: SessionState,
}

impl DeviceSession for FakeSession {
    async fn connect(&mut self) -> Result<()> {
        self.stats.connects.fetch_add(1, Ordering::SeqCst);
        if self.behavior.unreachable {
            return Err(TransportError::ConnectionFailed {
                host: self.hostname.clone(),
                port: 22,
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
            }
            .into());
        }
        self.state = SessionState::Connected;
        let now = self.stats.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.peak_active.fetch_max(now, Ordering::SeqCst);
        Ok(())
    }

    async fn run_command(&mut self, command: &str) -> Result<String> {
        if self.state != SessionState::Connected {
            return Err(DriverError::NotConnected.into());
        }
        if command == "show running-config" {
            self.stats.fetches.fetch_add(1, Ordering::SeqCst);
            self.stats.event(&self.hostname, "fetch");
            if !self.behavior.latency.is_zero() {
                tokio::time::sleep(self.behavior.latency).await;
            }
            if self.behavior.crashes {
                panic!("{} dropped the session mid-fetch", self.hostname);
            }
            if self.behavior.fetch_fails {
                return Err(DriverError::CommandFailed {
                    message: format!("'{command}': % Permission denied"),
                }
                .into());
            }
            return Ok(self.behavior.running_config.clone());
        }
        Ok(String::new())
    }

    async fn run_config_set(&mut self, lines: &[String]) -> Result<()> {
        if self.state != SessionState::Connected {
            return Err(DriverError::NotConnected.into());
        }
        if let Some(dir) = &self.backup_dir {
            if dir.join(format!("{}_backup.cfg", self.hostname)).exists() {
                self.stats.event(&self.hostname, "backup");
            }
        }
        self.stats.event(&self.hostname, "push");
        self.stats
            .pushes
            .lock()
            .unwrap()
            .push((self.hostname.clone(), lines.to_vec()));
        if self.behavior.push_fails {
            return Err(DriverError::CommandFailed {
                message: "'ntp server 10.1.1.2': % Invalid input".to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Connected {
            self.stats.active.fetch_sub(1, Ordering::SeqCst);
        }
        self.state = SessionState::Closed;
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
        self.stats.event(&self.hostname, "close");
        Ok(())
    }

    /// Drops the change stamp some devices print at the top.
    fn comparable_config(&self, config: &str) -> String {
        config
            .lines()
            .filter(|line| !line.starts_with("! Last configuration change"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn state(&self) -> SessionState {
        self.state
    }
}

/// Renders `hostname <hostname>` followed by a fixed body.
pub struct StaticRenderer {
    pub body: String,
}

impl StaticRenderer {
    pub fn new(body: &str) -> Arc<Self> {
        Arc::new(Self {
            body: body.to_string(),
        })
    }
}

impl TemplateRenderer for StaticRenderer {
    fn render(&self, device: &DeviceRecord) -> std::result::Result<String, TemplateError> {
        Ok(format!("hostname {}\n{}", device.hostname, self.body))
    }
}

/// Fails every render.
pub struct BrokenRenderer;

impl TemplateRenderer for BrokenRenderer {
    fn render(&self, device: &DeviceRecord) -> std::result::Result<String, TemplateError> {
        Err(TemplateError::Render {
            hostname: device.hostname.clone(),
            message: "Variable `site` not found in context".to_string(),
        })
    }
}

pub fn device(hostname: &str) -> Arc<DeviceRecord> {
    Arc::new(DeviceRecord::new(hostname, "netops", "s3cret", "ios"))
}

pub fn count_backups(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with("_backup.cfg"))
        .count()
}
