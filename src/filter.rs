//! Device Filter
//!
//! Refreshes every discovered plug once, keeps those whose model is on the
//! allow-list, and disconnects the rest straight away. The energy-metering
//! capability is decided here, once, and carried on [`MatchedDevice`].

use crate::kasa::Device;
use std::collections::BTreeMap;
use tracing::{error, info, warn};

/// Energy-metering capability of a matched plug
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metering {
    Meterable,
    NonMeterable,
}

impl From<bool> for Metering {
    fn from(has_emeter: bool) -> Self {
        if has_emeter {
            Metering::Meterable
        } else {
            Metering::NonMeterable
        }
    }
}

/// A plug that passed the model filter
pub struct MatchedDevice<D> {
    pub address: String,
    pub device: D,
    pub metering: Metering,
    /// Alias reported when the device was matched
    pub alias: String,
    /// Model reported when the device was matched
    pub model: String,
}

impl<D> std::fmt::Debug for MatchedDevice<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchedDevice")
            .field("address", &self.address)
            .field("alias", &self.alias)
            .field("model", &self.model)
            .field("metering", &self.metering)
            .finish()
    }
}

/// Whether `model` passes the allow-list. An empty list accepts everything.
pub fn model_allowed(models: &[String], model: &str) -> bool {
    models.is_empty() || models.iter().any(|m| m == model)
}

async fn disconnect_quietly<D: Device>(address: &str, device: &D) {
    if let Err(e) = device.disconnect().await {
        error!("Error disconnecting device at {}: {}", address, e);
    }
}

/// Partition discovered devices into the Matched Device Set.
///
/// Devices that fail to refresh or whose model is not allowed are
/// disconnected exactly once and dropped.
pub async fn filter_devices<D>(
    discovered: BTreeMap<String, D>,
    models: &[String],
) -> Vec<MatchedDevice<D>>
where
    D: Device,
{
    let mut matched = Vec::new();

    for (address, device) in discovered {
        let state = match device.refresh().await {
            Ok(state) => state,
            Err(e) => {
                error!("Error getting device info for {}: {}", address, e);
                warn!("Device at {} may require cloud authentication", address);
                disconnect_quietly(&address, &device).await;
                continue;
            }
        };

        info!(
            "Device at {}: alias={} model={}",
            address, state.alias, state.model
        );

        if !model_allowed(models, &state.model) {
            info!(
                "Skipping {} and disconnecting, looking for {:?}",
                state.model, models
            );
            disconnect_quietly(&address, &device).await;
            continue;
        }

        matched.push(MatchedDevice {
            address,
            device,
            metering: Metering::from(state.has_emeter),
            alias: state.alias,
            model: state.model,
        });
    }

    info!("Found {} device(s) matching {:?}", matched.len(), models);
    matched
}
