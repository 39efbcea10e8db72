//! Running the push pipeline across the whole inventory.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::{error, info};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::DEFAULT_MAX_CONCURRENCY;
use crate::error::{DeviceError, Error, Result};
use crate::inventory::DeviceRecord;
use crate::orchestrator::{DeviceOrchestrator, Outcome};
use crate::session::SessionFactory;

/// One device that did not make it.
#[derive(Debug)]
pub struct DeviceFailure {
    pub hostname: String,
    pub error: DeviceError,
}

/// Aggregated outcomes of a fleet run.
#[derive(Debug, Default)]
pub struct FleetReport {
    pub applied: usize,
    pub no_change: usize,
    pub failed: Vec<DeviceFailure>,
}

impl FleetReport {
    pub fn record(&mut self, hostname: impl Into<String>, outcome: Outcome) {
        match outcome {
            Outcome::Applied => self.applied += 1,
            Outcome::NoChangeNeeded => self.no_change += 1,
            Outcome::Failed(error) => self.failed.push(DeviceFailure {
                hostname: hostname.into(),
                error,
            }),
        }
    }

    pub fn total(&self) -> usize {
        self.applied + self.no_change + self.failed.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

impl fmt::Display for FleetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} devices: {} applied, {} unchanged, {} failed",
            self.total(),
            self.applied,
            self.no_change,
            self.failed.len()
        )?;
        for failure in &self.failed {
            write!(
                f,
                "\n  {}: {} ({})",
                failure.hostname,
                failure.error.kind(),
                failure.error
            )?;
        }
        Ok(())
    }
}

/// Runs one orchestration per device with at most `max_concurrency` in
/// flight. A failing device never cancels the others.
pub struct FleetCoordinator<F> {
    orchestrator: Arc<DeviceOrchestrator<F>>,
    max_concurrency: usize,
}

impl<F: SessionFactory> FleetCoordinator<F> {
    pub fn new(orchestrator: DeviceOrchestrator<F>, max_concurrency: usize) -> Result<Self> {
        if max_concurrency == 0 {
            return Err(Error::InvalidConfig {
                message: "max concurrency must be at least 1".to_string(),
            });
        }
        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            max_concurrency,
        })
    }

    pub fn with_default_concurrency(orchestrator: DeviceOrchestrator<F>) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Process every device and wait for all of them.
    pub async fn run_all(&self, devices: Vec<Arc<DeviceRecord>>) -> FleetReport {
        let total = devices.len();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();
        let mut hostnames = HashMap::with_capacity(total);

        info!(
            "Configuring {total} devices with up to {} in parallel",
            self.max_concurrency
        );

        for device in devices {
            let orchestrator = Arc::clone(&self.orchestrator);
            let semaphore = Arc::clone(&semaphore);
            let hostname = device.hostname.clone();

            let handle = tasks.spawn(async move {
                // The semaphore is never closed, so acquiring cannot fail.
                let _permit = semaphore.acquire_owned().await.ok();
                orchestrator.run(&device).await
            });
            hostnames.insert(handle.id(), hostname);
        }

        let mut report = FleetReport::default();
        let mut done = 0;
        while let Some(joined) = tasks.join_next_with_id().await {
            let (id, outcome) = match joined {
                Ok((id, outcome)) => (id, outcome),
                Err(e) => {
                    let reason = if e.is_panic() {
                        "device task panicked".to_string()
                    } else {
                        e.to_string()
                    };
                    (e.id(), Outcome::Failed(DeviceError::Aborted(reason)))
                }
            };
            let hostname = hostnames
                .remove(&id)
                .unwrap_or_else(|| format!("<task {id}>"));

            done += 1;
            match &outcome {
                Outcome::Failed(_) => error!("[{done}/{total}] {hostname}: {outcome}"),
                _ => info!("[{done}/{total}] {hostname}: {outcome}"),
            }
            report.record(hostname, outcome);
        }

        info!("Run complete. {report}");
        report
    }
}
