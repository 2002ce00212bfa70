//! Kasa Smart Plug Prometheus Exporter
//!
//! Discovers Kasa smart plugs, keeps those whose model is on an allow-list,
//! and republishes their energy meter readings as Prometheus gauges.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐    local / cloud     ┌──────────────┐
//! │ Smart Plugs │ ◄─────────────────►  │   Exporter   │
//! └─────────────┘                      │  ┌────────┐  │      HTTP      ┌────────────┐
//!                                      │  │ Poller │  │ ◄────────────► │ Prometheus │
//!                                      │  └────────┘  │   /metrics     └────────────┘
//!                                      │  ┌────────┐  │
//!                                      │  │Metrics │  │
//!                                      │  └────────┘  │
//!                                      └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`kasa`] - Device client traits and the local-network client
//! - [`discovery`] - Credential-gated discovery
//! - [`filter`] - Model allow-list filtering
//! - [`telemetry`] - Per-device meter snapshots
//! - [`metrics`] - Prometheus metric definitions
//! - [`poller`] - Sweep loop and shutdown
//! - [`server`] - HTTP endpoint
//! - [`app`] - Lifecycle orchestration
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//!
//! # Quick Start
//!
//! ```no_run
//! use kasa_exporter::{app, config::Config, kasa::LocalClient};
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/Default.toml")?;
//!     let client = LocalClient::new(
//!         Duration::from_secs(config.kasa.discovery_timeout_seconds),
//!         Duration::from_secs(config.kasa.request_timeout_seconds),
//!     );
//!     app::run(config, client, CancellationToken::new()).await?;
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod config;
pub mod discovery;
pub mod error;
pub mod filter;
pub mod kasa;
pub mod metrics;
pub mod poller;
pub mod server;
pub mod telemetry;
