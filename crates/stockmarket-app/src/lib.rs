//! STOCKMARKET 1982 application.
//!
//! Wires the crates together for the two binaries:
//! - `stockmarket-server`: loads configuration, initialises logging and
//!   serves one game session until Ctrl-C
//! - `stockmarket-client`: plays in the terminal (HUD or log view) or
//!   manages the quote watchlist

pub mod app;
pub mod client;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::{AppConfig, ConfigSource, TelemetryConfig, CONFIG_ENV_VAR, DEFAULT_CONFIG_PATH};
pub use error::{AppError, AppResult};
