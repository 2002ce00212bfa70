//! Kasa device client
//!
//! The exporter talks to plugs only through the [`DeviceClient`] and
//! [`Device`] traits. [`LocalClient`] is the bundled implementation for plugs
//! that answer the plaintext local command set on port 9999.

pub mod client;
pub mod connection;
pub mod protocol;
pub mod types;

pub use client::{Device, DeviceClient, DeviceState, LocalClient, LocalDevice};
pub use connection::ConnectionManager;
pub use types::{Credentials, EmeterStatus, SysInfo};
