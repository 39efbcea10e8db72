//! # confpush
//!
//! Push rendered configuration to a fleet of network devices over SSH.
//!
//! For every device in the inventory confpush connects, backs up the
//! running configuration, renders the desired configuration from a
//! template, diffs the two and applies the desired configuration only when
//! it differs. Devices are processed concurrently with a bound on how many
//! are in flight; each device succeeds or fails on its own.
//!
//! ## Layers
//!
//! - [`transport`], [`channel`], [`platform`], [`driver`]: an async SSH CLI
//!   driver with prompt detection and privilege navigation
//! - [`session`]: the [`DeviceSession`] capability the pipeline runs on
//! - [`orchestrator`] and [`fleet`]: the per-device pipeline and the
//!   bounded fan-out over the inventory
//! - [`diff`], [`backup`], [`template`], [`inventory`], [`discovery`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use confpush::{
//!     BackupWriter, ConfigTemplate, DeviceOrchestrator, FleetCoordinator, SshSessionFactory,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), confpush::Error> {
//!     let devices = confpush::inventory::load(Path::new("devices.yaml"))?;
//!     let template = ConfigTemplate::from_file(Path::new("router.j2"))?;
//!
//!     let orchestrator = DeviceOrchestrator::new(
//!         SshSessionFactory::default(),
//!         Arc::new(template),
//!         BackupWriter::new("./backups"),
//!     );
//!     let report = FleetCoordinator::new(orchestrator, 5)?.run_all(devices).await;
//!     println!("{report}");
//!     Ok(())
//! }
//! ```

pub mod backup;
pub mod channel;
pub mod config;
pub mod diff;
pub mod discovery;
pub mod driver;
pub mod error;
pub mod fleet;
pub mod inventory;
pub mod orchestrator;
pub mod platform;
pub mod session;
pub mod template;
pub mod transport;

pub use backup::BackupWriter;
pub use config::{BackupPolicy, RunConfig, SshSettings};
pub use diff::{DiffLine, DiffResult, diff_lines, unified_diff};
pub use discovery::{DiscoveryProbe, Ipv4Subnet, TcpProbe};
pub use driver::{DriverBuilder, GenericDriver, Response};
pub use error::{DeviceError, Error, Result};
pub use fleet::{DeviceFailure, FleetCoordinator, FleetReport};
pub use inventory::DeviceRecord;
pub use orchestrator::{DeviceOrchestrator, Outcome};
pub use platform::{PlatformDefinition, PlatformRegistry, PrivilegeLevel};
pub use session::{DeviceSession, SessionFactory, SessionState, SshSession, SshSessionFactory};
pub use template::{ConfigTemplate, TemplateRenderer};
pub use transport::{AuthMethod, HostKeyVerification, SshConfig};
