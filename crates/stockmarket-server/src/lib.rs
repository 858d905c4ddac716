//! stockmarket-server - authoritative multiplayer server for the stockmarket game.
//!
//! One process hosts one game session. Clients talk to it over a WebSocket
//! carrying JSON event frames; a small REST API serves quotes for the
//! watchlist and the current snapshot.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     stockmarket process                       │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │   GameSession (Arc<Mutex<>>): engine, host, lobby      │  │
//! │  └──────────────┬───────────────────────────┬─────────────┘  │
//! │                 │ handle(event)             │ snapshot/quote │
//! │  ┌──────────────▼──────────────┐            │                │
//! │  │ Broadcaster (broadcast ch.) │            │                │
//! │  └──────────────┬──────────────┘            │                │
//! │  ┌──────────────▼───────────────────────────▼─────────────┐  │
//! │  │       axum HTTP Server (port 5000)                     │  │
//! │  │  GET /ws                 → WebSocket game channel      │  │
//! │  │  GET /api/snapshot       → JSON game state             │  │
//! │  │  GET /api/stock/{symbol} → quote                       │  │
//! │  │  GET /api/search/{query} → matching quotes             │  │
//! │  │  GET /health, /metrics                                 │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use stockmarket_server::{run_server, GameConfig, ServerConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let shutdown = CancellationToken::new();
//! run_server(ServerConfig::default(), GameConfig::default(), shutdown).await?;
//! ```

mod broadcast;
mod config;
mod error;
mod server;
mod session;

pub use broadcast::Broadcaster;
pub use config::{GameConfig, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use server::{create_router, dispatch, run_server, serve, AppState, ConnectionLimiter};
pub use session::{
    Connection, GameSession, Outbound, SharedSession, ALL_BANKRUPT_BANNER, GAME_STARTED_NEWS,
};
