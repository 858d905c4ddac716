//! Share prices and market bookkeeping.
//!
//! Prices move once per round. The move for each share is a small random
//! number of base steps, nudged in the direction of net buying or selling
//! since the previous move and clamped to the share's price band.

use std::collections::BTreeMap;

use rand::Rng;
use stockmarket_core::{Difficulty, Holdings, Money, Share, SharePrices, StockQuote};
use tracing::trace;

/// Probability that net buying (selling) pushes the move one step up (down).
const VOLUME_PUSH_PROB: f64 = 0.7;
/// Probability that the random component is dropped entirely.
const FLAT_ROLL_PROB: f64 = 0.3;
/// Probability that a large move is multiplied by the difficulty (difficulty >= 2).
const AMPLIFY_PROB: f64 = 0.3;
/// Probability that the price does not move at all this round.
const FREEZE_PROB: f64 = 0.1;
/// Probability that an unchanged price drifts one step anyway.
const UNSTICK_PROB: f64 = 0.2;

fn per_share<T: Copy>(f: impl Fn(Share) -> T) -> BTreeMap<Share, T> {
    Share::ALL.into_iter().map(|s| (s, f(s))).collect()
}

/// Market side of the game state.
#[derive(Debug, Clone)]
pub struct MarketState {
    prices: SharePrices,
    max_prices: SharePrices,
    /// Prices at the end of the previous round.
    last_prices: SharePrices,
    buy_volumes: Holdings,
    sell_volumes: Holdings,
    /// Total holdings across all players at the previous price move.
    last_totals: Holdings,
    /// Suspended shares with the number of round ends left before dealings resume.
    suspended: BTreeMap<Share, u32>,
}

impl Default for MarketState {
    fn default() -> Self {
        let prices = per_share(|s| s.initial_price());
        Self {
            last_prices: prices.clone(),
            prices,
            max_prices: per_share(|s| s.max_price()),
            buy_volumes: per_share(|_| 0),
            sell_volumes: per_share(|_| 0),
            last_totals: per_share(|_| 0),
            suspended: BTreeMap::new(),
        }
    }
}

impl MarketState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current price of `share`.
    pub fn price(&self, share: Share) -> Money {
        self.prices
            .get(&share)
            .copied()
            .unwrap_or_else(|| share.initial_price())
    }

    /// All current prices.
    pub fn prices(&self) -> &SharePrices {
        &self.prices
    }

    /// Price at the end of the previous round.
    pub fn previous_price(&self, share: Share) -> Money {
        self.last_prices
            .get(&share)
            .copied()
            .unwrap_or_else(|| share.initial_price())
    }

    /// Shares bought plus sold this round.
    pub fn volume(&self, share: Share) -> u64 {
        self.buy_volumes.get(&share).copied().unwrap_or(0)
            + self.sell_volumes.get(&share).copied().unwrap_or(0)
    }

    pub fn record_buy(&mut self, share: Share, amount: u64) {
        *self.buy_volumes.entry(share).or_insert(0) += amount;
    }

    pub fn record_sell(&mut self, share: Share, amount: u64) {
        *self.sell_volumes.entry(share).or_insert(0) += amount;
    }

    pub(crate) fn reset_volumes(&mut self) {
        self.buy_volumes = per_share(|_| 0);
        self.sell_volumes = per_share(|_| 0);
    }

    pub(crate) fn snapshot_last_prices(&mut self) {
        self.last_prices = self.prices.clone();
    }

    /// Set a price directly, clamped to the share's band.
    pub fn set_price(&mut self, share: Share, price: Money) {
        let clamped = self.clamp(share, price);
        self.prices.insert(share, clamped);
    }

    fn clamp(&self, share: Share, price: Money) -> Money {
        let max = self
            .max_prices
            .get(&share)
            .copied()
            .unwrap_or_else(|| share.max_price());
        price.clamp(share.min_price(), max)
    }

    pub fn is_suspended(&self, share: Share) -> bool {
        self.suspended.contains_key(&share)
    }

    /// Suspended shares in board order.
    pub fn suspended_shares(&self) -> Vec<Share> {
        self.suspended.keys().copied().collect()
    }

    pub fn any_suspended(&self) -> bool {
        !self.suspended.is_empty()
    }

    /// Suspend dealings in `share` for `rounds` round ends.
    ///
    /// An existing suspension is only ever extended.
    pub fn suspend(&mut self, share: Share, rounds: u32) {
        let remaining = self.suspended.entry(share).or_insert(0);
        *remaining = (*remaining).max(rounds);
    }

    /// Count down suspensions at a round end, returning the shares that resume.
    pub(crate) fn tick_suspensions(&mut self) -> Vec<Share> {
        let mut resumed = Vec::new();
        self.suspended.retain(|share, remaining| {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                resumed.push(*share);
                false
            } else {
                true
            }
        });
        resumed
    }

    /// Halve the price of `share` after a two-for-one split.
    pub(crate) fn split(&mut self, share: Share) {
        let halved = (self.price(share) / 2).max(share.min_price());
        self.prices.insert(share, halved);
    }

    /// Move every price once.
    ///
    /// `totals_now` is the number of each share held across all players; the
    /// difference from the previous call indicates net buying or selling.
    pub fn update_prices<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        difficulty: Difficulty,
        totals_now: &Holdings,
    ) {
        for share in Share::ALL {
            let step = share.base_step();
            let old = self.price(share);
            let previous_total = self.last_totals.get(&share).copied().unwrap_or(0) as i64;
            let current_total = totals_now.get(&share).copied().unwrap_or(0) as i64;
            let volume_change = current_total - previous_total;

            let mut r: i64 = rng.gen_range(-2..=2);
            if volume_change > 0 {
                if rng.gen::<f64>() < VOLUME_PUSH_PROB {
                    r += 1;
                }
            } else if volume_change < 0 && rng.gen::<f64>() < VOLUME_PUSH_PROB {
                r -= 1;
            }

            if rng.gen::<f64>() < FLAT_ROLL_PROB {
                r = 0;
            }

            let mut change = r * step;
            if difficulty.level() >= 2 && rng.gen::<f64>() < AMPLIFY_PROB {
                change *= difficulty.level();
            }
            if rng.gen::<f64>() < FREEZE_PROB {
                change = 0;
            }

            let mut new_price = self.clamp(share, old + change);
            if new_price == old && rng.gen::<f64>() < UNSTICK_PROB {
                let nudge = if rng.gen::<f64>() < 0.5 { step } else { -step };
                new_price = self.clamp(share, new_price + nudge);
            }

            trace!(share = %share, old, new = new_price, volume_change, "Price moved");
            self.prices.insert(share, new_price);
        }

        self.last_totals = totals_now.clone();
    }

    /// Quote card for the REST API.
    pub fn quote(&self, share: Share) -> StockQuote {
        StockQuote::new(
            share.symbol(),
            share.company_name(),
            self.price(share),
            self.previous_price(share),
            self.volume(share),
        )
    }
}
