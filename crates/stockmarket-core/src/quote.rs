//! Quote payload returned by `GET /api/stock/{symbol}` and `GET /api/search/{query}`.

use serde::{Deserialize, Serialize};

use crate::player::Money;

/// Price card for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockQuote {
    pub symbol: String,
    pub name: String,
    pub price: Money,
    /// Price change since the previous round.
    pub change: Money,
    pub change_percent: f64,
    /// Shares traded this round.
    pub volume: u64,
}

impl StockQuote {
    /// Build a quote, deriving the percentage change from the previous price.
    pub fn new(
        symbol: impl Into<String>,
        name: impl Into<String>,
        price: Money,
        previous: Money,
        volume: u64,
    ) -> Self {
        let change = price - previous;
        let change_percent = if previous == 0 {
            0.0
        } else {
            change as f64 / previous as f64 * 100.0
        };
        Self {
            symbol: symbol.into(),
            name: name.into(),
            price,
            change,
            change_percent,
            volume,
        }
    }

    /// Whether the price rose since the previous round.
    pub fn is_up(&self) -> bool {
        self.change > 0
    }
}
