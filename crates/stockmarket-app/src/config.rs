//! Application configuration.
//!
//! Resolution order: `--config` path, then `STOCKMARKET_CONFIG`, then
//! `config/default.toml` if present, then built-in defaults. An explicitly
//! named file must exist; the default file is optional.

use std::path::Path;

use serde::{Deserialize, Serialize};
use stockmarket_server::{GameConfig, ServerConfig};

use crate::error::{AppError, AppResult};

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "STOCKMARKET_CONFIG";

/// Config file used when nothing else is named.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default)]
    pub log_level: Option<String>,
}

/// Where the configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(String),
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => f.write_str(path),
            Self::Defaults => f.write_str("built-in defaults"),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config {path}: {e}")))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve and load following the documented order.
    ///
    /// `env_path` is the value of [`CONFIG_ENV_VAR`], passed in so callers
    /// and tests control the environment.
    pub fn resolve(
        cli_path: Option<&str>,
        env_path: Option<&str>,
        default_path: &str,
    ) -> AppResult<(Self, ConfigSource)> {
        if let Some(path) = cli_path.or(env_path) {
            return Ok((Self::from_file(path)?, ConfigSource::File(path.to_string())));
        }
        if Path::new(default_path).exists() {
            return Ok((
                Self::from_file(default_path)?,
                ConfigSource::File(default_path.to_string()),
            ));
        }
        Ok((Self::default(), ConfigSource::Defaults))
    }

    /// [`resolve`](Self::resolve) against the process environment.
    pub fn load(cli_path: Option<&str>) -> AppResult<(Self, ConfigSource)> {
        let env_path = std::env::var(CONFIG_ENV_VAR).ok();
        Self::resolve(cli_path, env_path.as_deref(), DEFAULT_CONFIG_PATH)
    }

    pub fn validate(&self) -> AppResult<()> {
        self.game
            .settings()
            .map_err(|e| AppError::Config(format!("[game] {e}")))?;
        if self.server.max_connections == 0 {
            return Err(AppError::Config(
                "[server] max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
