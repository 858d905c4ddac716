//! Game rules for STOCKMARKET 1982.
//!
//! The engine is the single source of truth for a game session:
//! - `GameEngine`: players, turn order, trading, loans and bankruptcy
//! - `MarketState`: share prices, price bands, volumes and suspensions
//! - flash news (after trades) and market news (at round end)
//! - final scoring
//!
//! All randomness flows through a seedable RNG owned by the engine, so a game
//! replays identically from the same seed and sequence of actions.

pub mod engine;
pub mod error;
pub mod market;
mod news;
mod scoring;

pub use engine::{Bankruptcy, GameEngine, TradeOutcome, TurnOutcome, DEFAULT_FLASH_NEWS_COOLDOWN};
pub use error::{TradeError, TradeResult};
pub use market::MarketState;
pub use news::NEWSFLASH_HEADER;
