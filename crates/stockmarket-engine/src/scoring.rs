//! Final standings.

use stockmarket_core::{FinalScore, Money, INITIAL_BALANCE};

use crate::engine::GameEngine;

impl GameEngine {
    /// Net worth, profit and a score that rewards finishing quickly on a hard setting.
    ///
    /// Sorted by net worth, richest first.
    pub fn final_scores(&self) -> Vec<FinalScore> {
        let prices = self.market.prices();
        let divisor = (self.round as Money + self.settings.difficulty.level() * 5).max(1);

        let mut scores: Vec<FinalScore> = self
            .players
            .iter()
            .filter_map(|name| {
                let pdata = self.accounts.get(name)?;
                let total_value = pdata.net_worth(prices);
                Some(FinalScore {
                    name: name.clone(),
                    total_value,
                    profit_made: total_value - INITIAL_BALANCE,
                    score: total_value / divisor,
                })
            })
            .collect();

        scores.sort_by(|a, b| b.total_value.cmp(&a.total_value));
        scores
    }
}
