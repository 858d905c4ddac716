//! Core domain types for the STOCKMARKET 1982 game.
//!
//! This crate provides the vocabulary shared by the engine, the server and
//! the terminal clients:
//! - `Share`: the four tradeable commodities and their price bands
//! - `PlayerData`: a player's cash, holdings, loan and bankruptcy flag
//! - `GameSettings`, `Difficulty`, `PlayerName`: validated lobby settings
//! - `ClientEvent`, `ServerEvent`: the JSON event protocol spoken over WebSocket
//! - `StockQuote`: REST quote payload used by the watchlist

pub mod error;
pub mod player;
pub mod protocol;
pub mod quote;
pub mod settings;
pub mod share;

pub use error::{CoreError, Result};
pub use player::{Holdings, Money, PlayerData, SharePrices, INITIAL_BALANCE};
pub use protocol::{
    ActivityKind, ActivityPayload, ClientEvent, FinalScore, GameOverPayload, GameSnapshot,
    LobbyPayload, ServerEvent, TradeRequest,
};
pub use quote::StockQuote;
pub use settings::{Difficulty, GameSettings, PlayerName, DEFAULT_TARGET_VALUE, MAX_NAME_LEN};
pub use share::Share;
