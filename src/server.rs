//! HTTP Metrics Endpoint
//!
//! # Endpoints
//!
//! - `GET /` - HTML landing page with links to metrics and health
//! - `GET /metrics` - Prometheus metrics in text format
//! - `GET /health` - 200 if the last sweep produced a reading, 503 otherwise
//!
//! The server only reads the registry; the poll loop is the sole writer.

use crate::config::ServerConfig;
use crate::error::ExporterError;
use crate::metrics::MetricsCollector;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Clone)]
struct AppState {
    metrics: MetricsCollector,
}

pub fn router(metrics: MetricsCollector) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(AppState { metrics })
}

/// Bind the metrics listener
pub async fn bind(config: &ServerConfig) -> anyhow::Result<TcpListener> {
    let addr = format!("{}:{}", config.addr, config.port);
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        ExporterError::Server(format!("failed to bind metrics endpoint on {}: {}", addr, e))
    })?;

    let local = listener.local_addr()?;
    info!("Metrics server listening on {}", local);
    info!("Metrics available at http://{}/metrics", local);

    Ok(listener)
}

/// Serve until `cancel` fires
pub async fn serve(
    listener: TcpListener,
    metrics: MetricsCollector,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    axum::serve(listener, router(metrics))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    info!("Metrics server stopped");
    Ok(())
}

async fn root_handler() -> impl IntoResponse {
    axum::response::Html(
        r#"<html>
<head><title>Kasa Exporter</title></head>
<body>
<h1>Kasa Smart Plug Exporter</h1>
<p><a href="/metrics">Metrics</a></p>
<p><a href="/health">Health</a></p>
</body>
</html>"#,
    )
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(metrics) => metrics.into_response(),
        Err(e) => {
            error!("Failed to render metrics: {}", e);
            (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error rendering metrics: {}", e),
            )
                .into_response()
        }
    }
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let up_value = state.metrics.up.get();

    if up_value > 0.0 {
        (axum::http::StatusCode::OK, "OK")
    } else {
        (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            "No device readings",
        )
    }
}
