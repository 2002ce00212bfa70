//! Configuration validation tests
//!
//! Tests that verify configuration defaults, credential gating and model parsing.

use kasa_exporter::config::{parse_models, Config, KasaConfig, MetricsConfig, ServerConfig};
use secrecy::{ExposeSecret, SecretString};

#[test]
fn test_default_server_config() {
    // Given: ServerConfig built from its defaults
    let config = ServerConfig::default();

    // Then: Should bind all interfaces on the exporter port
    assert_eq!(config.addr, "0.0.0.0");
    assert_eq!(config.port, 4467);
}

#[test]
fn test_default_metrics_config() {
    let config = MetricsConfig::default();
    assert_eq!(config.poll_interval_seconds, 10);
}

#[test]
fn test_default_kasa_config_accepts_all_models() {
    // Given: KasaConfig built from its defaults
    let config = KasaConfig::default();

    // Then: No credentials, empty allow-list, sensible discovery timeout
    assert!(config.username.is_none());
    assert!(config.password.is_none());
    assert!(config.models.is_empty());
    assert_eq!(config.discovery_timeout_seconds, 5);
    assert_eq!(config.request_timeout_seconds, 5);
}

#[test]
fn test_credentials_require_both_fields() {
    // Given: Only a username
    let mut config = KasaConfig {
        username: Some("me@example.com".to_string()),
        ..Default::default()
    };

    // Then: No credentials are produced
    assert!(config.credentials().is_none());

    // When: The password is added
    config.password = Some(SecretString::from("hunter2"));

    // Then: Credentials are available
    let credentials = config.credentials().expect("credentials");
    assert_eq!(credentials.username, "me@example.com");
}

#[test]
fn test_blank_credentials_count_as_missing() {
    // Given: Whitespace username and empty password
    let config = KasaConfig {
        username: Some("   ".to_string()),
        password: Some(SecretString::from("")),
        ..Default::default()
    };

    // Then: Treated the same as absent
    assert!(config.credentials().is_none());
}

#[test]
fn test_credentials_debug_redacts_password() {
    let config = KasaConfig {
        username: Some("me@example.com".to_string()),
        password: Some(SecretString::from("hunter2")),
        ..Default::default()
    };

    let rendered = format!("{:?}", config.credentials().unwrap());
    assert!(!rendered.contains("hunter2"));
}

#[test]
fn test_parse_models_trims_and_drops_blanks() {
    // Given: A comma-split list with stray whitespace and empty entries
    let models = parse_models([" KP125M", "", "HS110 ", "  "]);

    // Then: Only the real identifiers survive, in order
    assert_eq!(models, vec!["KP125M".to_string(), "HS110".to_string()]);
}

#[test]
fn test_set_models_replaces_allow_list() {
    let mut config = KasaConfig::default();
    config.set_models(["KP125M"]);
    config.set_models(["HS110", "KP115"]);
    assert_eq!(config.models, vec!["HS110", "KP115"]);
}

#[test]
fn test_validate_rejects_zero_poll_interval() {
    // Given: A poll interval of zero
    let mut config = Config::default();
    config.metrics.poll_interval_seconds = 0;

    // Then: Validation fails with a configuration error
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("Configuration error"));
    assert!(err.to_string().contains("poll interval"));
}

#[test]
fn test_validate_rejects_zero_discovery_timeout() {
    let mut config = Config::default();
    config.kasa.discovery_timeout_seconds = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_zero_request_timeout() {
    let mut config = Config::default();
    config.kasa.request_timeout_seconds = 0;

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("request timeout"));
}

#[test]
fn test_environment_layer_sets_model_list_and_numbers() {
    // Given: Settings supplied only through the environment
    let vars = [
        ("KASA_EXPORTER__KASA__MODELS", "KP125M, HS110"),
        ("KASA_EXPORTER__KASA__REQUEST_TIMEOUT_SECONDS", "7"),
        ("KASA_EXPORTER__KASA__USERNAME", "me@example.com"),
        ("KASA_EXPORTER__KASA__PASSWORD", "0123"),
    ];
    for (key, value) in vars {
        std::env::set_var(key, value);
    }

    // When: Loading with no config file present
    let loaded = Config::load("config/does-not-exist");

    for (key, _) in vars {
        std::env::remove_var(key);
    }

    // Then: The comma-separated value becomes a trimmed list
    let config = loaded.expect("config loads from environment");
    assert_eq!(config.kasa.models, vec!["KP125M", "HS110"]);
    assert_eq!(config.kasa.request_timeout_seconds, 7);
    assert_eq!(config.kasa.discovery_timeout_seconds, 5);

    // And: Numeric-looking secrets are kept verbatim
    let credentials = config.kasa.credentials().expect("credentials");
    assert_eq!(credentials.password.expose_secret(), "0123");
}

#[test]
fn test_default_config_is_valid() {
    assert!(Config::default().validate().is_ok());
}
