//! Exporter configuration
//!
//! Values are layered: an optional TOML file, then `KASA_EXPORTER__*`
//! environment variables, then CLI flags (see `main.rs`). Every field has a
//! default so the exporter runs with no file at all.

use crate::kasa::Credentials;
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub kasa: KasaConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KasaConfig {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<SecretString>,
    /// Model allow-list. Empty accepts every device.
    #[serde(default, deserialize_with = "deserialize_models")]
    pub models: Vec<String>,
    #[serde(default = "default_discovery_timeout")]
    pub discovery_timeout_seconds: u64,
    /// Timeout for each connect and query against a discovered plug
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
}

/// Accept either a TOML array or a comma-separated string (environment layer).
fn deserialize_models<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Models {
        List(Vec<String>),
        Csv(String),
    }

    Ok(match Models::deserialize(deserializer)? {
        Models::List(models) => models,
        Models::Csv(models) => models.split(',').map(str::to_string).collect(),
    })
}

fn default_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4467
}

fn default_poll_interval() -> u64 {
    10
}

fn default_discovery_timeout() -> u64 {
    5
}

fn default_request_timeout() -> u64 {
    5
}

impl Default for KasaConfig {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            models: Vec::new(),
            discovery_timeout_seconds: default_discovery_timeout(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            port: default_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_poll_interval(),
        }
    }
}

impl KasaConfig {
    /// Returns credentials only when both username and password are non-empty.
    pub fn credentials(&self) -> Option<Credentials> {
        let username = self.username.as_deref().map(str::trim).unwrap_or_default();
        let password = self.password.as_ref()?;

        if username.is_empty() || password.expose_secret().is_empty() {
            return None;
        }

        Some(Credentials::new(username, password.clone()))
    }

    /// Replace the allow-list, trimming entries and dropping blanks.
    pub fn set_models<I, S>(&mut self, models: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.models = parse_models(models);
    }
}

/// Normalize a model allow-list: trim each entry and drop empty ones.
pub fn parse_models<I, S>(models: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    models
        .into_iter()
        .map(|m| m.as_ref().trim().to_string())
        .filter(|m| !m.is_empty())
        .collect()
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("KASA_EXPORTER").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let mut config: Config = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.kasa.models = parse_models(&config.kasa.models);
        Ok(config)
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::ExporterError;

        if self.metrics.poll_interval_seconds == 0 {
            return Err(ExporterError::Config(
                "poll interval must be at least 1 second".to_string(),
            ));
        }
        if self.kasa.discovery_timeout_seconds == 0 {
            return Err(ExporterError::Config(
                "discovery timeout must be at least 1 second".to_string(),
            ));
        }
        if self.kasa.request_timeout_seconds == 0 {
            return Err(ExporterError::Config(
                "request timeout must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }
}
