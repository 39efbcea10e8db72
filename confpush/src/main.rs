use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use log::{error, info, warn};

use confpush::discovery::{DiscoveryProbe, Ipv4Subnet, TcpProbe};
use confpush::{
    BackupPolicy, BackupWriter, ConfigTemplate, DeviceOrchestrator, FleetCoordinator,
    HostKeyVerification, RunConfig, SshSessionFactory, SshSettings,
};

#[derive(Parser)]
#[command(
    name = "confpush",
    version,
    about = "Push rendered configuration to network devices over SSH"
)]
struct Cli {
    /// Inventory file (.yaml, .yml or .json)
    #[arg(long)]
    devices: PathBuf,

    /// Configuration template (Jinja2 syntax)
    #[arg(long)]
    template: PathBuf,

    /// Directory for running-config backups
    #[arg(long, default_value = confpush::config::DEFAULT_BACKUP_DIR)]
    backup_dir: PathBuf,

    /// Sweep this subnet for SSH hosts first and log them (e.g. 192.168.1.0/24)
    #[arg(long, value_name = "CIDR")]
    discover: Option<String>,

    /// Devices configured at the same time
    #[arg(long, default_value_t = confpush::config::DEFAULT_MAX_CONCURRENCY)]
    max_workers: usize,

    /// SSH port
    #[arg(long, default_value_t = 22)]
    port: u16,

    /// Connect and prompt timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    #[arg(long, value_enum, default_value_t = HostKeyChecking::AcceptNew)]
    host_key_checking: HostKeyChecking,

    /// known_hosts file (default ~/.ssh/known_hosts)
    #[arg(long, env = "CONFPUSH_KNOWN_HOSTS")]
    known_hosts: Option<PathBuf>,

    /// Skip a device when its backup cannot be written
    #[arg(long)]
    require_backup: bool,

    /// Exit with status 1 when any device failed
    #[arg(long)]
    fail_on_error: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum HostKeyChecking {
    Strict,
    AcceptNew,
    Disabled,
}

impl From<HostKeyChecking> for HostKeyVerification {
    fn from(mode: HostKeyChecking) -> Self {
        match mode {
            HostKeyChecking::Strict => HostKeyVerification::Strict,
            HostKeyChecking::AcceptNew => HostKeyVerification::AcceptNew,
            HostKeyChecking::Disabled => HostKeyVerification::Disabled,
        }
    }
}

impl Cli {
    fn run_config(&self) -> RunConfig {
        RunConfig {
            backup_dir: self.backup_dir.clone(),
            max_concurrency: self.max_workers,
            backup_policy: if self.require_backup {
                BackupPolicy::Required
            } else {
                BackupPolicy::BestEffort
            },
            ssh: SshSettings {
                port: self.port,
                timeout: Duration::from_secs(self.timeout),
                host_key_verification: self.host_key_checking.into(),
                known_hosts_path: self.known_hosts.clone(),
            },
            ..RunConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stdout)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                buf.timestamp_millis(),
                record.level(),
                record.args()
            )
        })
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> confpush::Result<ExitCode> {
    let config = cli.run_config();

    if let Some(cidr) = &cli.discover {
        let subnet: Ipv4Subnet = cidr.parse()?;
        let probe = TcpProbe::default()
            .with_port(config.ssh.port)
            .with_timeout(config.discovery_timeout);
        match probe.discover(&subnet).await {
            Ok(found) => {
                let found: Vec<String> = found.iter().map(ToString::to_string).collect();
                info!("Discovered devices: [{}]", found.join(", "));
            }
            Err(e) => warn!("Discovery on {subnet} failed: {e}"),
        }
    }

    let devices = confpush::inventory::load(&cli.devices)?;
    info!("Loaded {} devices from {}", devices.len(), cli.devices.display());

    let template = ConfigTemplate::from_file(&cli.template)?;

    std::fs::create_dir_all(&config.backup_dir).map_err(|source| {
        confpush::error::BackupError::Io {
            path: config.backup_dir.clone(),
            source,
        }
    })?;

    let orchestrator = DeviceOrchestrator::new(
        SshSessionFactory::new(config.ssh.clone()),
        Arc::new(template),
        BackupWriter::new(&config.backup_dir),
    )
    .with_backup_policy(config.backup_policy);
    let coordinator = FleetCoordinator::new(orchestrator, config.max_concurrency)?;

    let report = coordinator.run_all(devices).await;

    if cli.fail_on_error && report.has_failures() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
