//! Lifecycle tests: startup short-circuits and clean shutdown

mod common;

use common::{metered, MockClient, MockDevice};
use kasa_exporter::app::{run, RunOutcome};
use kasa_exporter::config::Config;
use secrecy::SecretString;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn config_with_credentials(models: &[&str]) -> Config {
    let mut config = Config::default();
    config.kasa.username = Some("me@example.com".to_string());
    config.kasa.password = Some(SecretString::from("hunter2"));
    config.kasa.set_models(models);
    config.server.addr = "127.0.0.1".to_string();
    config.server.port = 0;
    config
}

#[tokio::test]
async fn test_missing_credentials_exit_without_discovery() {
    // Given: No credentials configured
    let (plug, plug_calls) = MockDevice::new("10.0.0.2", metered("Desk", "KP125M", 1, 1, 1, 1.0));
    let client = MockClient::with_devices(vec![plug]);
    let discoveries = client.calls();

    // When: Running the exporter
    let outcome = run(Config::default(), client, CancellationToken::new())
        .await
        .expect("run");

    // Then: It returns early without touching any device
    assert_eq!(outcome, RunOutcome::NoDevices);
    assert_eq!(discoveries.load(Ordering::SeqCst), 0);
    assert_eq!(plug_calls.refreshes(), 0);
}

#[tokio::test]
async fn test_discovery_failure_is_a_clean_exit() {
    let outcome = run(
        config_with_credentials(&[]),
        MockClient::failing(),
        CancellationToken::new(),
    )
    .await
    .expect("run");

    assert_eq!(outcome, RunOutcome::NoDevices);
}

#[tokio::test]
async fn test_no_matching_models_exit_after_disconnecting() {
    // Given: Only an HS110 on the network while looking for KP125M
    let (plug, calls) = MockDevice::new("10.0.0.3", metered("Heater", "HS110", 1, 1, 1, 1.0));
    let client = MockClient::with_devices(vec![plug]);

    // When: Running the exporter
    let outcome = run(
        config_with_credentials(&["KP125M"]),
        client,
        CancellationToken::new(),
    )
    .await
    .expect("run");

    // Then: No polling happens and the rejected device was released
    assert_eq!(outcome, RunOutcome::NoDevices);
    assert_eq!(calls.disconnects(), 1);
}

#[tokio::test]
async fn test_cancellation_disconnects_each_matched_device_once() {
    // Given: Two matching plugs
    let (a, a_calls) = MockDevice::new("10.0.0.2", metered("A", "KP125M", 2500, 120, 120000, 1.0));
    let (b, b_calls) = MockDevice::new("10.0.0.3", metered("B", "KP125M", 10, 1, 120000, 2.0));
    let client = MockClient::with_devices(vec![a, b]);
    let cancel = CancellationToken::new();

    // When: Cancelling while the exporter sleeps between sweeps
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });
    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        run(config_with_credentials(&["KP125M"]), client, cancel),
    )
    .await
    .expect("exporter should stop promptly")
    .expect("run");

    // Then: Both devices were polled once and disconnected exactly once
    assert_eq!(
        outcome,
        RunOutcome::Stopped {
            devices: 2,
            sweeps: 1,
            disconnect_failures: 0,
        }
    );
    assert_eq!(a_calls.refreshes(), 2); // filter + first sweep
    assert_eq!(a_calls.disconnects(), 1);
    assert_eq!(b_calls.disconnects(), 1);
}
