//! Kasa Device Client
//!
//! [`DeviceClient`] discovers plugs and hands back [`Device`] handles. The
//! exporter never looks past these traits, so any transport can stand behind
//! them.
//!
//! # Example
//!
//! ```no_run
//! use kasa_exporter::kasa::{Credentials, Device, DeviceClient, LocalClient};
//! use secrecy::SecretString;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = LocalClient::new(Duration::from_secs(5), Duration::from_secs(5));
//! let credentials = Credentials::new("me@example.com", SecretString::from("secret"));
//! for (host, device) in client.discover(&credentials).await? {
//!     let state = device.refresh().await?;
//!     println!("{} {} {}", host, state.alias, state.model);
//!     device.disconnect().await?;
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::{ExporterError, Result};
use crate::kasa::connection::ConnectionManager;
use crate::kasa::protocol;
use crate::kasa::types::{
    discovery_request, refresh_request, Credentials, DeviceResponse, EmeterStatus,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, warn};

/// Device state captured by a refresh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceState {
    pub alias: String,
    pub model: String,
    /// Energy-metering capability flag
    pub has_emeter: bool,
    /// Energy module status, absent when the plug has no meter or returned an error
    pub emeter: Option<EmeterStatus>,
}

/// Handle to a single plug
#[async_trait]
pub trait Device: Send + Sync {
    /// Network address the handle talks to
    fn host(&self) -> &str;

    /// Fetch current state from the plug
    async fn refresh(&self) -> Result<DeviceState>;

    /// Release the connection owned by this handle
    async fn disconnect(&self) -> Result<()>;
}

/// Discovery capability
#[async_trait]
pub trait DeviceClient: Send + Sync {
    type Device: Device;

    /// Find reachable plugs, keyed by network address
    async fn discover(&self, credentials: &Credentials)
        -> Result<BTreeMap<String, Self::Device>>;
}

/// Number of discovery datagrams sent per discovery, to ride out packet loss
const DISCOVERY_PACKETS: usize = 3;

/// Client for plugs reachable on the local broadcast domain
pub struct LocalClient {
    target: String,
    /// How long to collect discovery replies
    discovery_timeout: Duration,
    /// Per-query timeout handed to every discovered device
    request_timeout: Duration,
}

impl LocalClient {
    pub fn new(discovery_timeout: Duration, request_timeout: Duration) -> Self {
        Self::with_target(
            format!("255.255.255.255:{}", protocol::PORT),
            discovery_timeout,
            request_timeout,
        )
    }

    /// Send discovery to a specific address (unicast or directed broadcast) instead of the limited broadcast.
    pub fn with_target(
        target: impl Into<String>,
        discovery_timeout: Duration,
        request_timeout: Duration,
    ) -> Self {
        Self {
            target: target.into(),
            discovery_timeout,
            request_timeout,
        }
    }

    fn parse_announcement(payload: &[u8]) -> Result<DeviceResponse> {
        let plain = protocol::decrypt(payload);
        serde_json::from_slice(&plain).map_err(ExporterError::Json)
    }
}

#[async_trait]
impl DeviceClient for LocalClient {
    type Device = LocalDevice;

    async fn discover(&self, credentials: &Credentials) -> Result<BTreeMap<String, LocalDevice>> {
        debug!(
            "Local discovery for account {} (local transport needs no cloud handshake)",
            credentials.username
        );

        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.set_broadcast(true)?;

        let request = protocol::encrypt(&serde_json::to_vec(&discovery_request())?);
        for _ in 0..DISCOVERY_PACKETS {
            socket
                .send_to(&request, &self.target)
                .await
                .map_err(|e| ExporterError::Discovery(format!("broadcast to {}: {}", self.target, e)))?;
        }

        let deadline = tokio::time::Instant::now() + self.discovery_timeout;
        let mut devices = BTreeMap::new();
        let mut buf = vec![0u8; protocol::MAX_FRAME_LEN];

        loop {
            let (len, from): (usize, SocketAddr) =
                match tokio::time::timeout_at(deadline, socket.recv_from(&mut buf)).await {
                    Err(_) => break,
                    Ok(received) => received?,
                };

            let host = from.ip().to_string();
            if devices.contains_key(&host) {
                continue;
            }

            match Self::parse_announcement(&buf[..len]) {
                Ok(response) => {
                    debug!(
                        "Discovered {} at {}",
                        response.system.get_sysinfo.model, host
                    );
                    let device = LocalDevice::new(host.clone(), self.request_timeout);
                    devices.insert(host, device);
                }
                Err(e) => warn!("Ignoring malformed discovery reply from {}: {}", host, e),
            }
        }

        Ok(devices)
    }
}

/// Plug reached over the local TCP command port
pub struct LocalDevice {
    host: String,
    connection: ConnectionManager,
}

impl LocalDevice {
    pub fn new(host: impl Into<String>, timeout: Duration) -> Self {
        Self::with_port(host, protocol::PORT, timeout)
    }

    pub fn with_port(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        let host = host.into();
        let connection = ConnectionManager::new(format!("{}:{}", host, port), timeout);
        Self { host, connection }
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.is_connected().await
    }
}

#[async_trait]
impl Device for LocalDevice {
    fn host(&self) -> &str {
        &self.host
    }

    async fn refresh(&self) -> Result<DeviceState> {
        let response: DeviceResponse = self.connection.execute_query(&refresh_request()).await?;
        let sysinfo = &response.system.get_sysinfo;

        if sysinfo.err_code != 0 {
            return Err(ExporterError::Device(format!(
                "{} returned err_code {} for get_sysinfo",
                self.host, sysinfo.err_code
            )));
        }

        let has_emeter = sysinfo.has_emeter();
        Ok(DeviceState {
            alias: sysinfo.alias.clone(),
            model: sysinfo.model.clone(),
            has_emeter,
            emeter: if has_emeter {
                response.emeter_status()
            } else {
                None
            },
        })
    }

    async fn disconnect(&self) -> Result<()> {
        self.connection.close().await
    }
}
