//! Telemetry Snapshot Reader
//!
//! Turns one refresh of a matched plug into a [`TelemetrySnapshot`]. Every
//! failure is logged and reported as `None`; the poll loop just skips the
//! device for that sweep.

use crate::error::ExporterError;
use crate::filter::{MatchedDevice, Metering};
use crate::kasa::{Device, EmeterStatus};
use tracing::{debug, error};

/// One set of meter readings, passed through as the plug reported them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySnapshot {
    pub power_mw: i64,
    pub current_ma: i64,
    pub voltage_mv: i64,
    pub energy_wh: f64,
}

impl TryFrom<&EmeterStatus> for TelemetrySnapshot {
    type Error = ExporterError;

    fn try_from(status: &EmeterStatus) -> Result<Self, Self::Error> {
        let missing = |field: &str| ExporterError::Device(format!("energy status has no {}", field));

        Ok(Self {
            power_mw: status.power_mw().ok_or_else(|| missing("power"))?,
            current_ma: status.current_ma().ok_or_else(|| missing("current"))?,
            voltage_mv: status.voltage_mv().ok_or_else(|| missing("voltage"))?,
            energy_wh: status.total_wh().ok_or_else(|| missing("total energy"))?,
        })
    }
}

/// Label pair identifying a plug's series
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceLabels {
    pub alias: String,
    pub model: String,
}

impl DeviceLabels {
    pub fn new(alias: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            model: model.into(),
        }
    }

    pub fn as_values(&self) -> [&str; 2] {
        [&self.alias, &self.model]
    }
}

/// A snapshot together with the labels current at the time it was taken
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub labels: DeviceLabels,
    pub snapshot: TelemetrySnapshot,
}

/// Refresh `matched` and extract its meter readings.
///
/// Plugs without metering always yield `None` without touching the network.
pub async fn read_snapshot<D: Device>(matched: &MatchedDevice<D>) -> Option<Reading> {
    if matched.metering == Metering::NonMeterable {
        debug!("{} ({}) has no energy meter", matched.alias, matched.model);
        return None;
    }

    let state = match matched.device.refresh().await {
        Ok(state) => state,
        Err(e) => {
            error!("Error getting power statistics for {}: {}", matched.address, e);
            return None;
        }
    };

    let Some(status) = state.emeter.as_ref() else {
        error!(
            "Error getting power statistics for {}: no energy status returned",
            matched.address
        );
        return None;
    };

    match TelemetrySnapshot::try_from(status) {
        Ok(snapshot) => Some(Reading {
            labels: DeviceLabels::new(state.alias, state.model),
            snapshot,
        }),
        Err(e) => {
            error!("Error getting power statistics for {}: {}", matched.address, e);
            None
        }
    }
}
