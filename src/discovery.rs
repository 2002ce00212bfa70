//! Device discovery
//!
//! Discovery never fails the process: missing credentials and client errors
//! are logged and normalised to an empty device map.

use crate::kasa::{Credentials, DeviceClient};
use std::collections::BTreeMap;
use tracing::{error, info, warn};

/// Discover plugs with the given credentials.
///
/// Returns an empty map when credentials are missing or the discovery call
/// fails; the client is not contacted at all in the former case.
pub async fn discover_devices<C>(
    client: &C,
    credentials: Option<&Credentials>,
) -> BTreeMap<String, C::Device>
where
    C: DeviceClient,
{
    let Some(credentials) = credentials else {
        warn!("KASA_USERNAME and KASA_PASSWORD must be set to discover cloud-authenticated devices");
        return BTreeMap::new();
    };

    match client.discover(credentials).await {
        Ok(devices) => {
            info!("Discovery found {} device(s)", devices.len());
            devices
        }
        Err(e) => {
            error!("Discovery with credentials failed: {}", e);
            BTreeMap::new()
        }
    }
}
