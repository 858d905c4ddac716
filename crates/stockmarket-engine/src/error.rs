//! Trade rejection reasons.
//!
//! The `Display` text of each variant is what the player sees.

use stockmarket_core::{Money, Share};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TradeError {
    #[error("Cannot trade - you are bankrupt!")]
    Bankrupt,

    #[error("{0} trading is suspended!")]
    Suspended(Share),

    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("Not enough shares")]
    NotEnoughShares,

    #[error("No loan to repay")]
    NoLoan,

    #[error("Insufficient funds to repay that amount")]
    InsufficientFundsToRepay,

    #[error("Invalid amount: {0}")]
    InvalidAmount(Money),

    #[error("Unknown player: {0}")]
    UnknownPlayer(String),
}

pub type TradeResult<T> = Result<T, TradeError>;
