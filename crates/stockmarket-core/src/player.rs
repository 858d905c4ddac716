//! Per-player account state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::share::Share;

/// Whole pounds. The board never deals in fractions.
pub type Money = i64;

/// Share counts keyed by share.
pub type Holdings = BTreeMap<Share, u64>;

/// Prices keyed by share.
pub type SharePrices = BTreeMap<Share, Money>;

/// Cash every player starts with.
pub const INITIAL_BALANCE: Money = 1000;

/// A player's account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerData {
    pub balance: Money,
    pub shares: Holdings,
    pub loan: Money,
    pub bankrupt: bool,
}

impl Default for PlayerData {
    fn default() -> Self {
        Self {
            balance: INITIAL_BALANCE,
            shares: Share::ALL.into_iter().map(|s| (s, 0)).collect(),
            loan: 0,
            bankrupt: false,
        }
    }
}

impl PlayerData {
    /// Number of `share` held.
    pub fn holding(&self, share: Share) -> u64 {
        self.shares.get(&share).copied().unwrap_or(0)
    }

    /// Mutable holding, created at zero if missing.
    pub fn holding_mut(&mut self, share: Share) -> &mut u64 {
        self.shares.entry(share).or_insert(0)
    }

    /// Market value of all held shares.
    pub fn share_value(&self, prices: &SharePrices) -> Money {
        self.shares
            .iter()
            .map(|(share, &count)| count as Money * prices.get(share).copied().unwrap_or(0))
            .sum()
    }

    /// Balance plus share value, ignoring the loan.
    pub fn gross_assets(&self, prices: &SharePrices) -> Money {
        self.balance + self.share_value(prices)
    }

    /// Balance plus share value minus the loan.
    pub fn net_worth(&self, prices: &SharePrices) -> Money {
        self.gross_assets(prices) - self.loan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prices() -> SharePrices {
        Share::ALL.into_iter().map(|s| (s, s.initial_price())).collect()
    }

    #[test]
    fn test_default_account() {
        let p = PlayerData::default();
        assert_eq!(p.balance, 1000);
        assert_eq!(p.loan, 0);
        assert!(!p.bankrupt);
        assert_eq!(p.shares.len(), 4);
        assert!(p.shares.values().all(|&c| c == 0));
    }

    #[test]
    fn test_valuation() {
        let mut p = PlayerData::default();
        *p.holding_mut(Share::Zinc) = 4; // 4 * 50
        *p.holding_mut(Share::Gold) = 1; // 1 * 1250
        p.loan = 300;

        assert_eq!(p.share_value(&prices()), 1450);
        assert_eq!(p.gross_assets(&prices()), 2450);
        assert_eq!(p.net_worth(&prices()), 2150);
    }
}
