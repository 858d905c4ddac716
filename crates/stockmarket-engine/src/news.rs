//! Flash news during a turn and market news at each round end.

use std::time::Instant;

use rand::seq::SliceRandom;
use rand::Rng;
use stockmarket_core::{Money, Share};
use tracing::{debug, warn};

use crate::engine::GameEngine;

/// First line of every flash news bulletin.
pub const NEWSFLASH_HEADER: &str = "!! NEWSFLASH !!";

/// `ch` above this triggers a tax investigation.
const TAX_INVESTIGATION_CH: u32 = 12;
/// `ch` above this puts trading practices under suspicion.
const SUSPICION_CH: u32 = 10;

impl GameEngine {
    /// Roll for a flash news bulletin after a trade attempt.
    ///
    /// Returns an empty list when the cooldown has not elapsed or the roll fails.
    pub fn generate_flash_news(&mut self) -> Vec<String> {
        self.generate_flash_news_at(Instant::now())
    }

    pub fn generate_flash_news_at(&mut self, now: Instant) -> Vec<String> {
        if let Some(last) = self.news.last_flash_at {
            if now.saturating_duration_since(last) < self.news.flash_cooldown {
                return Vec::new();
            }
        }
        self.news.last_flash_at = Some(now);

        if self.rng.gen::<f64>() < 0.2 * self.news.flash_count as f64 {
            return Vec::new();
        }
        self.news.flash_count += 1;

        let mut events = vec![NEWSFLASH_HEADER.to_string()];

        if self.ch > TAX_INVESTIGATION_CH {
            self.tax_investigation(&mut events);
        } else if self.ch > SUSPICION_CH {
            events.push("TRADING PRACTICES UNDER SUSPICION".to_string());
            events.push("TAX OFFICIALS INVESTIGATE".to_string());
            self.ch = 100;
        } else if self.rng.gen_range(0..=9) > 4 + self.settings.difficulty.level() {
            match self.rng.gen_range(0..=9) {
                0 => events.push("MARKET VERY WEAK".to_string()),
                1..=4 => self.tax_investigation(&mut events),
                _ => self.bonus_issue(&mut events),
            }
        } else {
            match self.rng.gen_range(0..=9) {
                0 => {
                    events.push("ALL MARKET DEALINGS SUSPENDED".to_string());
                    for share in Share::ALL {
                        self.market.suspend(share, 1);
                    }
                }
                5..=9 => self.tax_refund(&mut events),
                _ => self.flash_bonus_payment(&mut events),
            }
        }

        debug!(ch = self.ch, lines = events.len(), "Flash news");
        events
    }

    fn current_balance_mut(&mut self) -> Option<&mut Money> {
        let name = self.players.get(self.current_index)?;
        self.accounts.get_mut(name).map(|p| &mut p.balance)
    }

    fn tax_investigation(&mut self, events: &mut Vec<String>) {
        events.push("CAPITAL GAINS TAX INVESTIGATIONS".to_string());
        let r: Money = self.rng.gen_range(0..=9);
        if r == 0 {
            events.push("TAX OFFICE RELENTS !...NO TAX DEMAND".to_string());
            return;
        }
        events.push(format!("DEMAND OF {}% OF BANK BALANCE", r * 10));
        if let Some(balance) = self.current_balance_mut() {
            let tax = *balance * r / 10;
            *balance = (*balance - tax).max(0);
        }
    }

    fn tax_refund(&mut self, events: &mut Vec<String>) {
        events.push("TAX .. REFUND".to_string());
        let r: Money = self.rng.gen_range(0..=9);
        if r == 0 {
            events.push("ERROR IN TAX OFFICE ! NO REFUND".to_string());
            return;
        }
        events.push(format!("REFUND = {}% OF BANK BALANCE", r * 10));
        if let Some(balance) = self.current_balance_mut() {
            *balance += *balance * r / 10;
        }
    }

    fn random_share(&mut self) -> Share {
        Share::ALL[self.rng.gen_range(0..Share::ALL.len())]
    }

    fn bonus_issue(&mut self, events: &mut Vec<String>) {
        let share = self.random_share();
        events.push(format!("{share} SHARES BONUS ISSUE OF 1 SHARE"));
        events.push("FOR EVERY TWO SHARES HELD".to_string());
        for pdata in self.accounts.values_mut() {
            let held = pdata.holding_mut(share);
            *held += *held / 2;
        }
    }

    fn flash_bonus_payment(&mut self, events: &mut Vec<String>) {
        let share = self.random_share();
        events.push(format!("BONUS PAYMENT TO ALL {share} SHAREHOLDERS"));
        let r: Money = self.rng.gen_range(0..=9);
        if r == 0 {
            events.push("PAYMENT SUSPENDED BECAUSE OF STRIKE".to_string());
            return;
        }
        events.push(format!("PAYMENT = {}% OF SHARE VALUE", r * 10));
        self.pay_dividend(share, r * 10, false);
    }

    /// Pay `percent` of share value to every holder of `share`.
    fn pay_dividend(&mut self, share: Share, percent: Money, skip_bankrupt: bool) {
        let price = self.market.price(share);
        for pdata in self.accounts.values_mut() {
            if skip_bankrupt && pdata.bankrupt {
                continue;
            }
            let held = pdata.holding(share);
            if held == 0 {
                continue;
            }
            let payment = Money::try_from(held)
                .ok()
                .and_then(|held| held.checked_mul(price))
                .and_then(|value| value.checked_mul(percent))
                .map(|value| value / 100);
            match payment {
                Some(payment) => pdata.balance = pdata.balance.saturating_add(payment),
                None => warn!(share = %share, held, "Dividend overflow, payment skipped"),
            }
        }
    }

    /// Two-for-one split: solvent holders double up, the price halves down to its floor.
    fn split_shares(&mut self, share: Share) {
        for pdata in self.accounts.values_mut().filter(|p| !p.bankrupt) {
            let held = pdata.holding_mut(share);
            *held = held.saturating_mul(2);
        }
        self.market.split(share);
    }

    /// Events at a round end, followed by the price move.
    ///
    /// Lines come in a fixed order: new suspension, bonus, split, resumed
    /// shares, then price moves. A share suspended here is not counted down
    /// until the next round end.
    pub(crate) fn generate_market_news(&mut self) -> Vec<String> {
        let mut events = Vec::new();

        let mut newly_suspended = false;
        if self.rng.gen_range(0..=9) < 2 && !self.market.any_suspended() {
            let share = self.random_share();
            let rounds = self.rng.gen_range(1..=3);
            self.market.suspend(share, rounds);
            events.push(format!("{share} MARKET DEALINGS SUSPENDED"));
            newly_suspended = true;
        }

        if self.rng.gen_range(0..=9) < 3 {
            let last = self.news.last_bonus_share;
            let candidates: Vec<Share> =
                Share::ALL.into_iter().filter(|s| Some(*s) != last).collect();
            if let Some(&share) = candidates.choose(&mut self.rng) {
                self.news.last_bonus_share = Some(share);
                let percent = self.rng.gen_range(1..=5) * 10;
                events.push(format!("BONUS PAYMENT TO ALL {share} SHAREHOLDERS"));
                events.push(format!("PAYMENT = {percent}% OF SHARE VALUE"));
                self.pay_dividend(share, percent, true);
            }
        }

        if self.rng.gen_range(0..=9) < 2 {
            let last = self.news.last_split_share;
            let candidates: Vec<Share> =
                Share::ALL.into_iter().filter(|s| Some(*s) != last).collect();
            if let Some(&share) = candidates.choose(&mut self.rng) {
                self.news.last_split_share = Some(share);
                events.push(format!("{share} SHARES SPLIT"));
                events.push("TWO FOR EVERY ONE HELD".to_string());
                self.split_shares(share);
            }
        }

        // a new suspension implies nothing else was suspended
        if !newly_suspended {
            for share in self.market.tick_suspensions() {
                events.push(format!("{share} MARKET DEALINGS RESUMED"));
            }
        }

        let totals = self.total_holdings();
        let difficulty = self.settings.difficulty;
        self.market.update_prices(&mut self.rng, difficulty, &totals);

        for share in Share::ALL {
            if self.market.is_suspended(share) {
                continue;
            }
            let old = self.market.previous_price(share);
            let new = self.market.price(share);
            if new > old {
                events.push(format!("{share} UP BY £{}", new - old));
            } else if new < old && new > share.min_price() {
                events.push(format!("{share} DOWN BY £{}", old - new));
            }
        }

        events
    }
}
