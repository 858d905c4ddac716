//! Game engine: players, turns, trading and loans.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use stockmarket_core::{
    GameSettings, GameSnapshot, Holdings, Money, PlayerData, Share, SharePrices, StockQuote,
};
use tracing::{debug, info};

use crate::error::{TradeError, TradeResult};
use crate::market::MarketState;

/// Minimum time between two flash news bulletins.
pub const DEFAULT_FLASH_NEWS_COOLDOWN: Duration = Duration::from_secs(5);

/// Interest added to outstanding loans at every round end, in percent.
const LOAN_INTEREST_PERCENT: Money = 10;

/// Result of a successful trade or repayment. `Display` is the player-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeOutcome {
    Bought {
        share: Share,
        amount: u64,
        /// Shortfall covered by a bank loan.
        borrowed: Money,
    },
    Sold {
        share: Share,
        amount: u64,
        /// Loan cleared automatically from the proceeds.
        loan_repaid: Option<Money>,
        /// A loan is still outstanding after the sale.
        loan_outstanding: bool,
    },
    LoanRepaid {
        amount: Money,
        remaining: Money,
    },
}

impl fmt::Display for TradeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bought { borrowed: 0, .. } => write!(f, "Bought successfully"),
            Self::Bought { .. } => write!(f, "Bought with loan"),
            Self::Sold {
                loan_repaid: Some(amount),
                ..
            } => write!(f, "Sold successfully. Bank loan of £{amount} repaid"),
            Self::Sold {
                loan_outstanding: true,
                ..
            } => write!(f, "Sold successfully. You need more cash to repay the bank"),
            Self::Sold { .. } => write!(f, "Sold successfully"),
            Self::LoanRepaid {
                amount,
                remaining: 0,
            } => write!(f, "Loan fully repaid (£{amount})"),
            Self::LoanRepaid { amount, remaining } => write!(
                f,
                "Partial loan repayment (£{amount}). Remaining: £{remaining}"
            ),
        }
    }
}

/// Result of a solvency check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bankruptcy {
    /// Assets cover the loan.
    Solvent,
    /// Shares were sold off and the loan repaid.
    Liquidated,
    /// Even after selling everything the loan could not be repaid.
    Bankrupt,
}

impl fmt::Display for Bankruptcy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Solvent => Ok(()),
            Self::Liquidated => write!(f, "Forced liquidation completed. Loan repaid."),
            Self::Bankrupt => write!(f, "YOU ARE BANKRUPT SIR!"),
        }
    }
}

/// What happened when a turn ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Players whose net worth reached the target.
    pub winners: Vec<String>,
    /// Market news lines (round end) and bankruptcy notices.
    pub news: Vec<String>,
    /// The turn wrapped around and a new round started.
    pub round_ended: bool,
    /// No solvent player is left.
    pub all_bankrupt: bool,
    /// Players declared bankrupt during this turn change.
    pub newly_bankrupt: Vec<String>,
    /// The only solvent player in a multi-player game.
    pub last_standing: Option<String>,
}

impl TurnOutcome {
    pub fn is_game_over(&self) -> bool {
        self.all_bankrupt || !self.winners.is_empty() || self.last_standing.is_some()
    }
}

/// Flash/market news bookkeeping.
#[derive(Debug, Clone)]
pub(crate) struct NewsState {
    pub(crate) last_bonus_share: Option<Share>,
    pub(crate) last_split_share: Option<Share>,
    pub(crate) flash_count: u32,
    pub(crate) last_flash_at: Option<Instant>,
    pub(crate) flash_cooldown: Duration,
}

impl NewsState {
    fn new(flash_cooldown: Duration) -> Self {
        Self {
            last_bonus_share: None,
            last_split_share: None,
            flash_count: 0,
            last_flash_at: None,
            flash_cooldown,
        }
    }
}

/// Authoritative state of one game.
#[derive(Debug)]
pub struct GameEngine {
    /// Players in turn order.
    pub(crate) players: Vec<String>,
    pub(crate) accounts: BTreeMap<String, PlayerData>,
    pub(crate) current_index: usize,
    pub(crate) market: MarketState,
    /// Turns ended so far (0-based).
    pub(crate) turn: u32,
    /// Rounds completed so far (0-based).
    pub(crate) round: u32,
    pub(crate) settings: GameSettings,
    /// Trade attempts this round. High values attract the tax office.
    pub(crate) ch: u32,
    pub(crate) news: NewsState,
    pub(crate) rng: StdRng,
}

impl GameEngine {
    /// New game with an entropy-seeded RNG.
    pub fn new(settings: GameSettings) -> Self {
        Self::with_rng(settings, StdRng::from_entropy())
    }

    /// New game with a fixed seed, for reproducible play.
    pub fn with_seed(settings: GameSettings, seed: u64) -> Self {
        Self::with_rng(settings, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(settings: GameSettings, rng: StdRng) -> Self {
        Self {
            players: Vec::new(),
            accounts: BTreeMap::new(),
            current_index: 0,
            market: MarketState::new(),
            turn: 0,
            round: 0,
            settings,
            ch: 0,
            news: NewsState::new(DEFAULT_FLASH_NEWS_COOLDOWN),
            rng,
        }
    }

    /// Override the minimum time between flash news bulletins.
    pub fn with_flash_news_cooldown(mut self, cooldown: Duration) -> Self {
        self.news.flash_cooldown = cooldown;
        self
    }

    /// Start over with the same settings, RNG and cooldown.
    pub fn reset(&mut self) {
        let settings = self.settings;
        let cooldown = self.news.flash_cooldown;
        let rng = self.rng.clone();
        *self = Self::with_rng(settings, rng).with_flash_news_cooldown(cooldown);
        info!("Game reset");
    }

    pub fn settings(&self) -> GameSettings {
        self.settings
    }

    pub fn set_settings(&mut self, settings: GameSettings) {
        self.settings = settings;
    }

    pub fn market(&self) -> &MarketState {
        &self.market
    }

    pub fn share_prices(&self) -> &SharePrices {
        self.market.prices()
    }

    /// Rounds completed so far (0-based).
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Players in turn order.
    pub fn players(&self) -> &[String] {
        &self.players
    }

    pub fn player(&self, name: &str) -> Option<&PlayerData> {
        self.accounts.get(name)
    }

    pub fn has_player(&self, name: &str) -> bool {
        self.accounts.contains_key(name)
    }

    /// Add a player. Joining twice is a no-op; returns whether the player is new.
    pub fn add_player(&mut self, name: &str) -> bool {
        if self.accounts.contains_key(name) {
            return false;
        }
        self.players.push(name.to_string());
        self.accounts.insert(name.to_string(), PlayerData::default());
        debug!(player = name, count = self.players.len(), "Player joined");
        true
    }

    pub fn current_player(&self) -> Option<&str> {
        self.players.get(self.current_index).map(String::as_str)
    }

    pub fn is_current_player(&self, name: &str) -> bool {
        self.current_player() == Some(name)
    }

    fn account(&self, name: &str) -> TradeResult<&PlayerData> {
        self.accounts
            .get(name)
            .ok_or_else(|| TradeError::UnknownPlayer(name.to_string()))
    }

    /// Largest additional loan the bank would still extend:
    /// half of cash plus share value, minus the current loan.
    pub fn max_loan(&self, name: &str) -> TradeResult<Money> {
        let pdata = self.account(name)?;
        Ok(pdata.gross_assets(self.market.prices()) / 2 - pdata.loan)
    }

    fn check_tradeable(&self, name: &str, share: Share, amount: Money) -> TradeResult<u64> {
        if amount <= 0 {
            return Err(TradeError::InvalidAmount(amount));
        }
        if self.account(name)?.bankrupt {
            return Err(TradeError::Bankrupt);
        }
        if self.market.is_suspended(share) {
            return Err(TradeError::Suspended(share));
        }
        Ok(amount as u64)
    }

    /// Buy `amount` of `share`, borrowing the shortfall if the bank allows it.
    pub fn buy(&mut self, name: &str, share: Share, amount: Money) -> TradeResult<TradeOutcome> {
        let count = self.check_tradeable(name, share, amount)?;
        let cost = self
            .market
            .price(share)
            .checked_mul(amount)
            .ok_or(TradeError::InsufficientFunds)?;
        self.ch += 1;

        let max_loan = self.max_loan(name)?;
        let pdata = self
            .accounts
            .get_mut(name)
            .ok_or_else(|| TradeError::UnknownPlayer(name.to_string()))?;

        let borrowed = if pdata.balance >= cost {
            0
        } else {
            let shortfall = cost - pdata.balance;
            if pdata.loan.saturating_add(shortfall) > max_loan {
                return Err(TradeError::InsufficientFunds);
            }
            pdata.loan += shortfall;
            pdata.balance += shortfall;
            shortfall
        };

        pdata.balance -= cost;
        *pdata.holding_mut(share) += count;
        self.market.record_buy(share, count);

        debug!(player = name, share = %share, amount, cost, borrowed, "Bought");
        Ok(TradeOutcome::Bought {
            share,
            amount: count,
            borrowed,
        })
    }

    /// Sell `amount` of `share`; the proceeds clear an outstanding loan when they can.
    pub fn sell(&mut self, name: &str, share: Share, amount: Money) -> TradeResult<TradeOutcome> {
        let count = self.check_tradeable(name, share, amount)?;
        let price = self.market.price(share);
        let proceeds = price
            .checked_mul(amount)
            .ok_or(TradeError::InvalidAmount(amount))?;
        self.ch += 1;

        let pdata = self
            .accounts
            .get_mut(name)
            .ok_or_else(|| TradeError::UnknownPlayer(name.to_string()))?;

        if pdata.holding(share) < count {
            return Err(TradeError::NotEnoughShares);
        }

        *pdata.holding_mut(share) -= count;
        pdata.balance = pdata.balance.saturating_add(proceeds);
        self.market.record_sell(share, count);

        let mut loan_repaid = None;
        if pdata.loan > 0 && pdata.loan <= pdata.balance {
            pdata.balance -= pdata.loan;
            loan_repaid = Some(pdata.loan);
            pdata.loan = 0;
        }
        let loan_outstanding = pdata.loan > 0;

        debug!(player = name, share = %share, amount, price, ?loan_repaid, "Sold");
        Ok(TradeOutcome::Sold {
            share,
            amount: count,
            loan_repaid,
            loan_outstanding,
        })
    }

    /// Repay part or all of the loan. `None` repays as much as the balance allows.
    pub fn repay_loan(&mut self, name: &str, amount: Option<Money>) -> TradeResult<TradeOutcome> {
        let pdata = self
            .accounts
            .get_mut(name)
            .ok_or_else(|| TradeError::UnknownPlayer(name.to_string()))?;

        if pdata.loan <= 0 {
            return Err(TradeError::NoLoan);
        }

        let requested = match amount {
            Some(a) if a <= 0 => return Err(TradeError::InvalidAmount(a)),
            Some(a) => a,
            None => pdata.loan.min(pdata.balance),
        };
        if requested == 0 || requested > pdata.balance {
            return Err(TradeError::InsufficientFundsToRepay);
        }

        let paid = requested.min(pdata.loan);
        pdata.balance -= paid;
        pdata.loan -= paid;

        debug!(player = name, paid, remaining = pdata.loan, "Loan repayment");
        Ok(TradeOutcome::LoanRepaid {
            amount: paid,
            remaining: pdata.loan,
        })
    }

    /// Force-liquidate a player whose loan exceeds everything they own.
    ///
    /// A player who still cannot repay after liquidation is marked bankrupt
    /// with zero cash and zero loan.
    pub fn check_bankruptcy(&mut self, name: &str) -> TradeResult<Bankruptcy> {
        let prices = self.market.prices().clone();
        let pdata = self
            .accounts
            .get_mut(name)
            .ok_or_else(|| TradeError::UnknownPlayer(name.to_string()))?;

        if pdata.bankrupt || pdata.loan <= pdata.gross_assets(&prices) {
            return Ok(Bankruptcy::Solvent);
        }

        for share in Share::ALL {
            let count = pdata.holding(share);
            if count > 0 {
                pdata.balance += count as Money * prices.get(&share).copied().unwrap_or(0);
                *pdata.holding_mut(share) = 0;
                self.market.record_sell(share, count);
            }
        }

        if pdata.balance >= pdata.loan {
            pdata.balance -= pdata.loan;
            pdata.loan = 0;
            info!(player = name, "Forced liquidation repaid loan");
            return Ok(Bankruptcy::Liquidated);
        }

        pdata.balance = 0;
        pdata.loan = 0;
        pdata.bankrupt = true;
        info!(player = name, "Player bankrupt");
        Ok(Bankruptcy::Bankrupt)
    }

    /// Mark every solvent player whose loan exceeds cash plus share value.
    ///
    /// Holdings, cash and loan are left as they are, so the final score
    /// shows the real (negative) net worth. Returns the newly bankrupt names.
    pub fn check_end_of_turn_bankruptcy(&mut self) -> Vec<String> {
        let prices = self.market.prices();
        let mut bankrupt = Vec::new();
        for name in &self.players {
            let Some(pdata) = self.accounts.get_mut(name) else {
                continue;
            };
            if !pdata.bankrupt && pdata.loan > pdata.gross_assets(prices) {
                pdata.bankrupt = true;
                info!(player = %name, loan = pdata.loan, "Player bankrupt at end of turn");
                bankrupt.push(name.clone());
            }
        }
        bankrupt
    }

    /// Solvent players whose net worth reached the target.
    pub fn check_millionaires(&self) -> Vec<String> {
        let prices = self.market.prices();
        self.players
            .iter()
            .filter(|name| {
                self.accounts.get(name.as_str()).is_some_and(|p| {
                    !p.bankrupt && p.net_worth(prices) >= self.settings.target_value
                })
            })
            .cloned()
            .collect()
    }

    /// Add loan interest to every outstanding loan.
    pub fn collect_loan_interest(&mut self) {
        for pdata in self.accounts.values_mut() {
            if pdata.loan > 0 {
                pdata.loan += pdata.loan * LOAN_INTEREST_PERCENT / 100;
            }
        }
    }

    /// The single solvent player, if exactly one remains.
    pub fn check_last_player_standing(&self) -> Option<&str> {
        let mut solvent = self
            .players
            .iter()
            .filter(|name| self.accounts.get(name.as_str()).is_some_and(|p| !p.bankrupt));
        match (solvent.next(), solvent.next()) {
            (Some(only), None) => Some(only.as_str()),
            _ => None,
        }
    }

    /// Shares held across all players.
    pub(crate) fn total_holdings(&self) -> Holdings {
        let mut totals: Holdings = Share::ALL.into_iter().map(|s| (s, 0)).collect();
        for pdata in self.accounts.values() {
            for (share, count) in &pdata.shares {
                *totals.entry(*share).or_insert(0) += count;
            }
        }
        totals
    }

    /// End the current player's turn.
    ///
    /// Play passes to the next solvent player. When play wraps past the last
    /// player the round ends: interest is charged, volumes reset and market
    /// news (including the price move) is generated.
    pub fn end_turn(&mut self) -> TurnOutcome {
        self.news.flash_count = 0;

        let mut outcome = TurnOutcome::default();
        let count = self.players.len();
        if count == 0 {
            return outcome;
        }

        let previous_index = self.current_index;
        let mut next = None;
        for step in 1..=count {
            let candidate = (previous_index + step) % count;
            let solvent = self
                .accounts
                .get(&self.players[candidate])
                .is_some_and(|p| !p.bankrupt);
            if solvent {
                next = Some(candidate);
                break;
            }
        }

        let Some(next_index) = next else {
            info!("All players bankrupt");
            outcome.all_bankrupt = true;
            return outcome;
        };

        self.current_index = next_index;
        self.turn += 1;

        if next_index <= previous_index {
            outcome.round_ended = true;
            self.round += 1;
            self.market.snapshot_last_prices();
            self.collect_loan_interest();
            self.market.reset_volumes();
            self.ch = 0;
            outcome.news = self.generate_market_news();
            info!(round = self.round + 1, news = outcome.news.len(), "New round");
        }

        let bankrupt = self.check_end_of_turn_bankruptcy();
        if !bankrupt.is_empty() {
            outcome.news.push(String::new());
            outcome
                .news
                .extend(bankrupt.iter().map(|name| format!("{name} IS BANKRUPT!")));
            outcome.newly_bankrupt = bankrupt;

            // The player whose turn it now is may just have gone bust.
            if let Some(current) = self.current_player() {
                if self.accounts.get(current).is_some_and(|p| p.bankrupt) {
                    let extra = self.end_turn_skip_bankrupt();
                    outcome.all_bankrupt = extra;
                }
            }
        }

        outcome.winners = self.check_millionaires();
        if count > 1 {
            outcome.last_standing = self.check_last_player_standing().map(str::to_string);
        }
        outcome
    }

    /// Move the turn off a bankrupt player without triggering round processing.
    /// Returns true when nobody solvent is left.
    fn end_turn_skip_bankrupt(&mut self) -> bool {
        let count = self.players.len();
        for step in 1..=count {
            let candidate = (self.current_index + step) % count;
            if self
                .accounts
                .get(&self.players[candidate])
                .is_some_and(|p| !p.bankrupt)
            {
                self.current_index = candidate;
                return false;
            }
        }
        true
    }

    /// Quote card for one share.
    pub fn quote(&self, share: Share) -> StockQuote {
        self.market.quote(share)
    }

    /// Full state for clients.
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            players: self.accounts.clone(),
            share_prices: self.market.prices().clone(),
            current_player: self.current_player().map(str::to_string),
            players_list: self.players.clone(),
            round: self.round + 1,
            turn: self.turn + 1,
            suspended_shares: self.market.suspended_shares(),
            difficulty: self.settings.difficulty,
            goal: self.settings.target_value,
        }
    }
}
