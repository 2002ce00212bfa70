use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("Device error: {0}")]
    Device(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Discovery failed: {0}")]
    Discovery(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP server error: {0}")]
    Server(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExporterError>;
