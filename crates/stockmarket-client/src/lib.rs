//! Terminal client for STOCKMARKET 1982.
//!
//! Provides:
//! - Two front-ends over the same event protocol: a two-column HUD
//!   ([`Hud`]) and a scrolling log ([`LogView`])
//! - A bounded activity log and a cache of the last server snapshot
//! - A WebSocket connection that forwards outbound events and decodes
//!   inbound frames
//! - A locally saved watchlist backed by the REST quote endpoints

pub mod activity;
pub mod connection;
pub mod error;
pub mod frontend;
pub mod hud;
pub mod log_view;
pub mod snapshot;
pub mod terminal;
pub mod watchlist;

pub use activity::{ActivityEntry, ActivityLog, ACTIVITY_LOG_CAPACITY};
pub use connection::{
    ConnectionConfig, ConnectionEvent, ConnectionState, GameConnection, GameSender,
};
pub use error::{ClientError, ClientResult};
pub use frontend::{Effect, FrontEnd, ScreenUpdate};
pub use hud::{Hud, HudMode};
pub use log_view::{LogState, LogView};
pub use snapshot::SnapshotCache;
pub use terminal::run_terminal;
pub use watchlist::{
    market_symbols, render_card, render_search_results, render_watchlist_line, QuoteClient,
    Watchlist, DEFAULT_WATCHLIST_FILE,
};
