//! In-memory device client doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use kasa_exporter::error::{ExporterError, Result};
use kasa_exporter::kasa::{Credentials, Device, DeviceClient, DeviceState, EmeterStatus};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Call counters that outlive the device handle
#[derive(Debug, Default)]
pub struct CallLog {
    refreshes: AtomicUsize,
    disconnects: AtomicUsize,
}

impl CallLog {
    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

/// Scripted device: queued refresh results first, then `fallback` forever.
pub struct MockDevice {
    host: String,
    calls: Arc<CallLog>,
    scripted: Mutex<VecDeque<std::result::Result<DeviceState, String>>>,
    fallback: std::result::Result<DeviceState, String>,
    fail_disconnect: bool,
}

impl MockDevice {
    pub fn new(host: &str, state: DeviceState) -> (Self, Arc<CallLog>) {
        Self::build(host, Ok(state))
    }

    /// A device whose every refresh fails
    pub fn unreachable(host: &str) -> (Self, Arc<CallLog>) {
        Self::build(host, Err("connection refused".to_string()))
    }

    fn build(host: &str, fallback: std::result::Result<DeviceState, String>) -> (Self, Arc<CallLog>) {
        let calls = Arc::new(CallLog::default());
        let device = Self {
            host: host.to_string(),
            calls: calls.clone(),
            scripted: Mutex::new(VecDeque::new()),
            fallback,
            fail_disconnect: false,
        };
        (device, calls)
    }

    /// Queue a refresh result ahead of the fallback
    pub fn then(self, result: std::result::Result<DeviceState, &str>) -> Self {
        self.scripted
            .lock()
            .unwrap()
            .push_back(result.map_err(str::to_string));
        self
    }

    pub fn failing_disconnect(mut self) -> Self {
        self.fail_disconnect = true;
        self
    }
}

#[async_trait]
impl Device for MockDevice {
    fn host(&self) -> &str {
        &self.host
    }

    async fn refresh(&self) -> Result<DeviceState> {
        self.calls.refreshes.fetch_add(1, Ordering::SeqCst);
        let next = self.scripted.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
            .map_err(ExporterError::Device)
    }

    async fn disconnect(&self) -> Result<()> {
        self.calls.disconnects.fetch_add(1, Ordering::SeqCst);
        if self.fail_disconnect {
            return Err(ExporterError::Device(format!("{} already gone", self.host)));
        }
        Ok(())
    }
}

/// Client handing out a fixed device map on the first discovery
pub struct MockClient {
    devices: Mutex<Option<BTreeMap<String, MockDevice>>>,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl MockClient {
    pub fn with_devices(devices: Vec<MockDevice>) -> Self {
        let devices = devices
            .into_iter()
            .map(|d| (d.host().to_string(), d))
            .collect();
        Self {
            devices: Mutex::new(Some(devices)),
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            devices: Mutex::new(None),
            fail: true,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl DeviceClient for MockClient {
    type Device = MockDevice;

    async fn discover(&self, _credentials: &Credentials) -> Result<BTreeMap<String, MockDevice>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ExporterError::Discovery("cloud login rejected".to_string()));
        }
        Ok(self.devices.lock().unwrap().take().unwrap_or_default())
    }
}

/// State of a metering plug reporting v2 firmware units
pub fn metered(alias: &str, model: &str, power_mw: i64, current_ma: i64, voltage_mv: i64, total_wh: f64) -> DeviceState {
    DeviceState {
        alias: alias.to_string(),
        model: model.to_string(),
        has_emeter: true,
        emeter: Some(EmeterStatus {
            power_mw: Some(power_mw),
            current_ma: Some(current_ma),
            voltage_mv: Some(voltage_mv),
            total_wh: Some(total_wh),
            ..Default::default()
        }),
    }
}

/// State of a plug without an energy meter
pub fn unmetered(alias: &str, model: &str) -> DeviceState {
    DeviceState {
        alias: alias.to_string(),
        model: model.to_string(),
        has_emeter: false,
        emeter: None,
    }
}

pub fn credentials() -> Credentials {
    Credentials::new("me@example.com", secrecy::SecretString::from("hunter2"))
}
