//! Poll Loop
//!
//! Sweeps the matched devices in order, one refresh at a time, writing each
//! reading into the registry, then sleeps for the poll interval. The
//! cancellation token is checked between device reads and raced against the
//! sleep; a refresh already in flight is never interrupted.

use crate::filter::MatchedDevice;
use crate::kasa::Device;
use crate::metrics::MetricsCollector;
use crate::telemetry::read_snapshot;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Outcome of one sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    /// Devices whose gauges were written
    pub updated: usize,
    /// Devices that yielded no reading this sweep
    pub skipped: usize,
    /// Sweep stopped early because cancellation was observed
    pub cancelled: bool,
}

pub struct Poller<'a, D> {
    devices: &'a [MatchedDevice<D>],
    metrics: &'a MetricsCollector,
    interval: Duration,
}

impl<'a, D: Device> Poller<'a, D> {
    pub fn new(
        devices: &'a [MatchedDevice<D>],
        metrics: &'a MetricsCollector,
        interval: Duration,
    ) -> Self {
        Self {
            devices,
            metrics,
            interval,
        }
    }

    /// Refresh every device once and publish what was read
    pub async fn sweep(&self, cancel: &CancellationToken) -> SweepReport {
        let mut report = SweepReport::default();

        for matched in self.devices {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            match read_snapshot(matched).await {
                Some(reading) => {
                    self.metrics.record(&reading.labels, &reading.snapshot);
                    debug!(
                        "{} ({}): {} mW, {} mA, {} mV, {} Wh",
                        reading.labels.alias,
                        reading.labels.model,
                        reading.snapshot.power_mw,
                        reading.snapshot.current_ma,
                        reading.snapshot.voltage_mv,
                        reading.snapshot.energy_wh
                    );
                    report.updated += 1;
                }
                None => report.skipped += 1,
            }
        }

        // A partial sweep says nothing about device health
        if !report.cancelled {
            let up = if report.updated > 0 { 1.0 } else { 0.0 };
            self.metrics.up.set(up);
        }
        report
    }

    /// Sweep until `cancel` fires. Returns the number of completed sweeps.
    pub async fn run(&self, cancel: &CancellationToken) -> u64 {
        info!(
            "Polling {} device(s) every {:?}",
            self.devices.len(),
            self.interval
        );

        let mut sweeps = 0;
        loop {
            let report = self.sweep(cancel).await;
            if report.cancelled {
                break;
            }
            sweeps += 1;
            debug!(
                "Sweep {} complete: {} updated, {} skipped",
                sweeps, report.updated, report.skipped
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("Polling stopped after {} sweep(s)", sweeps);
        sweeps
    }
}

/// Disconnect every matched device once, continuing past failures.
///
/// Returns the number of devices that failed to disconnect cleanly.
pub async fn disconnect_all<D: Device>(devices: &[MatchedDevice<D>]) -> usize {
    let mut failures = 0;

    for matched in devices {
        if let Err(e) = matched.device.disconnect().await {
            error!("Error disconnecting {}: {}", matched.address, e);
            failures += 1;
        }
    }

    info!(
        "All devices disconnected ({} of {} with errors)",
        failures,
        devices.len()
    );
    failures
}
