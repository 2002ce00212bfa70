//! Kasa local API type definitions
//!
//! Responses arrive as nested JSON objects keyed by module and method, e.g.
//! `{"system":{"get_sysinfo":{...}}}`. Fields are optional wherever firmware
//! revisions disagree about them.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Cloud account credentials handed to discovery.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

/// Request sent on refresh: system info plus the realtime meter in one round trip.
pub fn refresh_request() -> serde_json::Value {
    serde_json::json!({
        "system": {"get_sysinfo": {}},
        "emeter": {"get_realtime": {}},
    })
}

/// Request broadcast during discovery.
pub fn discovery_request() -> serde_json::Value {
    serde_json::json!({"system": {"get_sysinfo": {}}})
}

/// `system.get_sysinfo` payload
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SysInfo {
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub model: String,
    /// Feature string such as `TIM:ENE`; `ENE` marks energy metering.
    #[serde(default)]
    pub feature: Option<String>,
    #[serde(default, rename = "deviceId")]
    pub device_id: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub sw_ver: Option<String>,
    #[serde(default)]
    pub hw_ver: Option<String>,
    #[serde(default)]
    pub relay_state: Option<u8>,
    #[serde(default)]
    pub err_code: i64,
}

impl SysInfo {
    pub fn has_emeter(&self) -> bool {
        self.feature
            .as_deref()
            .map(|f| f.split(':').any(|part| part == "ENE"))
            .unwrap_or(false)
    }
}

/// `emeter.get_realtime` payload
///
/// Hardware v2+ reports integer milli-units and Wh; v1 reports floats in
/// W, A, V and kWh. Accessors normalise to the v2 units.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct EmeterStatus {
    #[serde(default)]
    pub power_mw: Option<i64>,
    #[serde(default)]
    pub current_ma: Option<i64>,
    #[serde(default)]
    pub voltage_mv: Option<i64>,
    #[serde(default)]
    pub total_wh: Option<f64>,
    #[serde(default)]
    pub power: Option<f64>,
    #[serde(default)]
    pub current: Option<f64>,
    #[serde(default)]
    pub voltage: Option<f64>,
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default)]
    pub err_code: i64,
}

fn milli(value: Option<f64>) -> Option<i64> {
    value.map(|v| (v * 1000.0).round() as i64)
}

impl EmeterStatus {
    pub fn power_mw(&self) -> Option<i64> {
        self.power_mw.or_else(|| milli(self.power))
    }

    pub fn current_ma(&self) -> Option<i64> {
        self.current_ma.or_else(|| milli(self.current))
    }

    pub fn voltage_mv(&self) -> Option<i64> {
        self.voltage_mv.or_else(|| milli(self.voltage))
    }

    pub fn total_wh(&self) -> Option<f64> {
        self.total_wh.or_else(|| self.total.map(|kwh| kwh * 1000.0))
    }
}

#[derive(Debug, Deserialize)]
pub struct SystemModule {
    pub get_sysinfo: SysInfo,
}

/// The emeter module answers with `get_realtime` or, on plugs without a
/// meter, a bare error code.
#[derive(Debug, Deserialize, Default)]
pub struct EmeterModule {
    #[serde(default)]
    pub get_realtime: Option<EmeterStatus>,
    #[serde(default)]
    pub err_code: Option<i64>,
    #[serde(default)]
    pub err_msg: Option<String>,
}

/// Combined refresh/discovery response
#[derive(Debug, Deserialize)]
pub struct DeviceResponse {
    pub system: SystemModule,
    #[serde(default)]
    pub emeter: Option<EmeterModule>,
}

impl DeviceResponse {
    /// Realtime meter reading, if the plug returned one without an error code.
    pub fn emeter_status(&self) -> Option<EmeterStatus> {
        let module = self.emeter.as_ref()?;
        if module.err_code.unwrap_or(0) != 0 {
            return None;
        }
        module
            .get_realtime
            .as_ref()
            .filter(|status| status.err_code == 0)
            .cloned()
    }
}
