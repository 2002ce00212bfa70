use anyhow::Result;
use clap::Parser;
use kasa_exporter::{
    app::{self, RunOutcome},
    config::Config,
    kasa::LocalClient,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/Default.toml")]
    config: String,

    /// Cloud account username
    #[arg(long, env = "KASA_USERNAME")]
    username: Option<String>,

    /// Cloud account password
    #[arg(long, env = "KASA_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Comma-separated model allow-list (empty accepts all)
    #[arg(long, env = "KASA_MODELS", value_delimiter = ',')]
    models: Option<Vec<String>>,

    /// Port to listen on for metrics
    #[arg(short, long, env = "KASA_EXPORTER_PORT")]
    port: Option<u16>,

    /// Address to bind to
    #[arg(short, long, env = "KASA_EXPORTER_ADDR")]
    addr: Option<String>,

    /// Seconds between sweeps
    #[arg(long, env = "KASA_POLL_INTERVAL")]
    poll_interval: Option<u64>,

    /// Seconds to wait for discovery replies
    #[arg(long, env = "KASA_DISCOVERY_TIMEOUT")]
    discovery_timeout: Option<u64>,

    /// Seconds allowed for each connect and query to a plug
    #[arg(long, env = "KASA_REQUEST_TIMEOUT")]
    request_timeout: Option<u64>,

    /// Minimum log level (RUST_LOG takes precedence)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.to_lowercase().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Exporter kasa-exporter v{} online",
        env!("CARGO_PKG_VERSION")
    );

    let mut config = Config::load(&args.config)?;

    // Override with CLI arguments if provided
    if let Some(username) = args.username {
        config.kasa.username = Some(username);
    }
    if let Some(password) = args.password {
        config.kasa.password = Some(secrecy::SecretString::new(password.into()));
    }
    if let Some(models) = args.models {
        config.kasa.set_models(models);
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(addr) = args.addr {
        config.server.addr = addr;
    }
    if let Some(interval) = args.poll_interval {
        config.metrics.poll_interval_seconds = interval;
    }
    if let Some(timeout) = args.discovery_timeout {
        config.kasa.discovery_timeout_seconds = timeout;
    }
    if let Some(timeout) = args.request_timeout {
        config.kasa.request_timeout_seconds = timeout;
    }

    if let Err(e) = config.validate() {
        error!("{}", e);
        std::process::exit(1);
    }

    info!("Configuration loaded successfully");
    if config.kasa.models.is_empty() {
        info!("Model filter: none (accepting all devices)");
    } else {
        info!("Model filter: {:?}", config.kasa.models);
    }

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    let client = LocalClient::new(
        Duration::from_secs(config.kasa.discovery_timeout_seconds),
        Duration::from_secs(config.kasa.request_timeout_seconds),
    );

    match app::run(config, client, cancel).await {
        Ok(RunOutcome::NoDevices) => info!("Nothing to export, exiting"),
        Ok(RunOutcome::Stopped { devices, sweeps, .. }) => {
            info!("Stopped after {} sweep(s) over {} device(s)", sweeps, devices)
        }
        Err(e) => {
            error!("Exporter error: {:#}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        tokio::select! {
            _ = ctrl_c() => {},
            _ = terminate() => {},
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c().await;
    }

    info!("Shutdown signal received");
    cancel.cancel();
}

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(?err, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            term.recv().await;
        }
        Err(err) => {
            warn!(?err, "failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}
