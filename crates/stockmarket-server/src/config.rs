//! Server and game configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use stockmarket_core::{CoreError, Difficulty, GameSettings, DEFAULT_TARGET_VALUE};

/// HTTP/WebSocket server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum concurrent WebSocket connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Minimum time between flash news bulletins in milliseconds.
    #[serde(default = "default_flash_news_cooldown_ms")]
    pub flash_news_cooldown_ms: u64,
    /// Capacity of the broadcast channel shared by all clients.
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

fn default_port() -> u16 {
    5000
}

fn default_max_connections() -> usize {
    32
}

fn default_flash_news_cooldown_ms() -> u64 {
    5_000
}

fn default_broadcast_capacity() -> usize {
    256
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            max_connections: default_max_connections(),
            flash_news_cooldown_ms: default_flash_news_cooldown_ms(),
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

impl ServerConfig {
    pub fn flash_news_cooldown(&self) -> Duration {
        Duration::from_millis(self.flash_news_cooldown_ms)
    }
}

/// Lobby defaults and RNG seeding for new games.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Difficulty until the host picks one (1-4).
    #[serde(default = "default_difficulty")]
    pub difficulty: i64,
    /// Net worth needed to win until the host picks a goal.
    #[serde(default = "default_target_value")]
    pub target_value: i64,
    /// Fixed RNG seed for reproducible games. Entropy when unset.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_difficulty() -> i64 {
    1
}

fn default_target_value() -> i64 {
    DEFAULT_TARGET_VALUE
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            target_value: default_target_value(),
            seed: None,
        }
    }
}

impl GameConfig {
    /// Validated lobby settings.
    pub fn settings(&self) -> Result<GameSettings, CoreError> {
        GameSettings::new(Difficulty::new(self.difficulty)?, self.target_value)
    }
}
