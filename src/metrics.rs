//! Prometheus Metrics Definitions
//!
//! This module defines all Prometheus metrics exposed by the Kasa exporter.
//!
//! # Device Metrics
//!
//! All labelled by `device_alias` and `device_model`, values passed through
//! exactly as the plug reports them:
//!
//! - `kasa_device_power_milliwatts`
//! - `kasa_device_current_milliamperes`
//! - `kasa_device_voltage_millivolts`
//! - `kasa_device_energy_watt_hours` - cumulative total reported by the plug
//!
//! # Exporter Metrics
//!
//! - `kasa_up` - 1 if the last sweep produced at least one reading
//! - `kasa_devices_matched` - size of the matched device set
//!
//! Series are only ever overwritten, never pruned: a plug that misses a sweep
//! keeps its last values, and a renamed plug leaves its old series behind.

use crate::telemetry::{DeviceLabels, TelemetrySnapshot};
use prometheus::{Encoder, Gauge, GaugeVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

const DEVICE_LABELS: &[&str] = &["device_alias", "device_model"];

/// Metrics collector for Kasa plugs
#[derive(Clone)]
pub struct MetricsCollector {
    registry: Arc<Registry>,

    pub device_power_milliwatts: Arc<GaugeVec>,
    pub device_current_milliamperes: Arc<GaugeVec>,
    pub device_voltage_millivolts: Arc<GaugeVec>,
    pub device_energy_watt_hours: Arc<GaugeVec>,

    pub devices_matched: Arc<IntGauge>,
    pub up: Arc<Gauge>,
}

impl MetricsCollector {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let device_power_milliwatts = GaugeVec::new(
            Opts::new(
                "device_power_milliwatts",
                "Instantaneous power draw in milliwatts",
            )
            .namespace("kasa"),
            DEVICE_LABELS,
        )?;

        let device_current_milliamperes = GaugeVec::new(
            Opts::new(
                "device_current_milliamperes",
                "Instantaneous current in milliamperes",
            )
            .namespace("kasa"),
            DEVICE_LABELS,
        )?;

        let device_voltage_millivolts = GaugeVec::new(
            Opts::new("device_voltage_millivolts", "Line voltage in millivolts")
                .namespace("kasa"),
            DEVICE_LABELS,
        )?;

        let device_energy_watt_hours = GaugeVec::new(
            Opts::new(
                "device_energy_watt_hours",
                "Cumulative energy reported by the device in watt-hours",
            )
            .namespace("kasa"),
            DEVICE_LABELS,
        )?;

        let devices_matched = IntGauge::new(
            "kasa_devices_matched",
            "Number of devices that passed the model filter",
        )?;

        let up = Gauge::new(
            "kasa_up",
            "Whether the last sweep produced at least one reading (1=up, 0=down)",
        )?;

        registry.register(Box::new(device_power_milliwatts.clone()))?;
        registry.register(Box::new(device_current_milliamperes.clone()))?;
        registry.register(Box::new(device_voltage_millivolts.clone()))?;
        registry.register(Box::new(device_energy_watt_hours.clone()))?;
        registry.register(Box::new(devices_matched.clone()))?;
        registry.register(Box::new(up.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            device_power_milliwatts: Arc::new(device_power_milliwatts),
            device_current_milliamperes: Arc::new(device_current_milliamperes),
            device_voltage_millivolts: Arc::new(device_voltage_millivolts),
            device_energy_watt_hours: Arc::new(device_energy_watt_hours),
            devices_matched: Arc::new(devices_matched),
            up: Arc::new(up),
        })
    }

    /// Overwrite one labelled gauge value
    pub fn set_gauge(&self, gauge: &GaugeVec, labels: &[&str], value: f64) {
        gauge.with_label_values(labels).set(value);
    }

    /// Write all four device gauges for `labels`
    pub fn record(&self, labels: &DeviceLabels, snapshot: &TelemetrySnapshot) {
        let values = labels.as_values();

        self.set_gauge(
            &self.device_power_milliwatts,
            &values,
            snapshot.power_mw as f64,
        );
        self.set_gauge(
            &self.device_current_milliamperes,
            &values,
            snapshot.current_ma as f64,
        );
        self.set_gauge(
            &self.device_voltage_millivolts,
            &values,
            snapshot.voltage_mv as f64,
        );
        self.set_gauge(&self.device_energy_watt_hours, &values, snapshot.energy_wh);
    }

    /// Render metrics in Prometheus text format
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
