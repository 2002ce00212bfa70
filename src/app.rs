//! Exporter lifecycle
//!
//! ```text
//! STARTING ── no devices ──► exit
//!    │
//!    ▼
//! RUNNING ── cancel ──► STOPPING (disconnect all, stop endpoint) ──► exit
//! ```
//!
//! The matched device set is owned here and lent to both the poll loop and
//! the shutdown routine, so cleanup always sees exactly the devices that were
//! polled.

use crate::config::Config;
use crate::discovery::discover_devices;
use crate::filter::filter_devices;
use crate::kasa::DeviceClient;
use crate::metrics::MetricsCollector;
use crate::poller::{disconnect_all, Poller};
use crate::server;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// How the exporter finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing to poll; the endpoint was never started
    NoDevices,
    /// Cancelled after polling
    Stopped {
        devices: usize,
        sweeps: u64,
        disconnect_failures: usize,
    },
}

pub async fn run<C>(
    config: Config,
    client: C,
    cancel: CancellationToken,
) -> anyhow::Result<RunOutcome>
where
    C: DeviceClient,
{
    // STARTING
    // Built before any device is claimed so a registry failure leaves nothing to release
    let metrics = MetricsCollector::new()?;

    let credentials = config.kasa.credentials();
    let discovered = discover_devices(&client, credentials.as_ref()).await;
    if discovered.is_empty() {
        warn!("No devices found.");
        return Ok(RunOutcome::NoDevices);
    }

    let matched = filter_devices(discovered, &config.kasa.models).await;
    if matched.is_empty() {
        warn!("No devices found matching the specified models.");
        return Ok(RunOutcome::NoDevices);
    }

    metrics.devices_matched.set(matched.len() as i64);

    let listener = match server::bind(&config.server).await {
        Ok(listener) => listener,
        Err(e) => {
            disconnect_all(&matched).await;
            return Err(e);
        }
    };
    let server_task = tokio::spawn(server::serve(listener, metrics.clone(), cancel.clone()));

    // RUNNING
    let poller = Poller::new(
        &matched,
        &metrics,
        Duration::from_secs(config.metrics.poll_interval_seconds),
    );
    let sweeps = poller.run(&cancel).await;

    // STOPPING
    info!("Shutting down, disconnecting {} device(s)", matched.len());
    let disconnect_failures = disconnect_all(&matched).await;

    cancel.cancel();
    match server_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Server error: {}", e),
        Err(e) => error!("Server task failed: {}", e),
    }

    Ok(RunOutcome::Stopped {
        devices: matched.len(),
        sweeps,
        disconnect_failures,
    })
}
