//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server error: {0}")]
    Server(#[from] stockmarket_server::ServerError),

    #[error("Client error: {0}")]
    Client(#[from] stockmarket_client::ClientError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] stockmarket_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
