//! Two-column trading HUD in the style of the 1982 home-computer original.
//!
//! Input walks a fixed grammar of modes:
//!
//! ```text
//! Intro -> AskName -> Waiting | HostLobby -> Action
//! Action -> BuySelect -> BuyAmount -> Action
//! Action -> SellSelect -> SellAmount | RepayLoan -> Action
//! Action -> HelpWait | NewsWait | ConfirmEndGame -> Action
//! ```

use std::time::{Duration, Instant};

use stockmarket_core::{
    ActivityKind, ClientEvent, FinalScore, GameOverPayload, GameSnapshot, LobbyPayload, Money,
    ServerEvent, Share, TradeRequest, DEFAULT_TARGET_VALUE, MAX_NAME_LEN,
};
use tracing::debug;

use crate::activity::ActivityLog;
use crate::frontend::{normalise, parse_leading_int, Effect, FrontEnd, ScreenUpdate};
use crate::snapshot::SnapshotCache;

/// Refresh requested after a trade typed through the buy/sell menus.
pub const TRADE_REFRESH_DELAY: Duration = Duration::from_millis(100);
/// Refresh requested when the server echoes one of our own trades.
pub const OWN_TRADE_REFRESH_DELAY: Duration = Duration::from_millis(50);
/// A news screen stops swallowing input after this long.
pub const NEWS_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

const RULE_WIDTH: usize = 50;
const LEFT_COLUMN_WIDTH: usize = 25;
const ERROR_MARKERS: [&str; 3] = ["Error", "Invalid", "Cannot"];

/// Where the HUD is in its command grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HudMode {
    Intro,
    AskName,
    Waiting,
    HostLobby,
    ErrorWait,
    Action,
    BuySelect,
    SellSelect,
    BuyAmount,
    SellAmount,
    RepayLoan,
    HelpWait,
    NewsWait,
    ConfirmEndGame,
    GameOver,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Buy,
    Sell,
}

/// The HUD front-end.
#[derive(Debug)]
pub struct Hud {
    mode: HudMode,
    username: Option<String>,
    joined: bool,
    is_host: bool,
    difficulty: i64,
    goal: Money,
    current_share: Option<Share>,
    snapshot: SnapshotCache,
    activity: ActivityLog,
    final_scores: Vec<FinalScore>,
    last_game_over: Option<GameOverPayload>,
    content: String,
    printed: Vec<String>,
    two_column: bool,
    news_deadline: Option<Instant>,
    dirty: bool,
}

impl Default for Hud {
    fn default() -> Self {
        Self::new()
    }
}

impl Hud {
    pub fn new() -> Self {
        let mut hud = Self {
            mode: HudMode::Intro,
            username: None,
            joined: false,
            is_host: false,
            difficulty: 1,
            goal: DEFAULT_TARGET_VALUE,
            current_share: None,
            snapshot: SnapshotCache::default(),
            activity: ActivityLog::default(),
            final_scores: Vec::new(),
            last_game_over: None,
            content: String::new(),
            printed: Vec::new(),
            two_column: false,
            news_deadline: None,
            dirty: true,
        };
        hud.show_intro();
        hud
    }

    pub fn mode(&self) -> HudMode {
        self.mode
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn is_host(&self) -> bool {
        self.is_host
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    pub fn snapshot(&self) -> &SnapshotCache {
        &self.snapshot
    }

    /// Lobby settings the host will send with `START`.
    pub fn selected_settings(&self) -> (i64, Money) {
        (self.difficulty, self.goal)
    }

    /// Full screen text as it would be drawn now.
    pub fn render(&self) -> String {
        let mut out = self.content.clone();
        for line in &self.printed {
            out.push_str(line);
            out.push('\n');
        }
        if self.two_column {
            out.push('\n');
            out.push_str("RECENT ACTIVITY\n");
            out.push_str(&"-".repeat(RULE_WIDTH));
            out.push('\n');
            for line in self.activity.render(self.username.as_deref()) {
                out.push_str(&line);
                out.push('\n');
            }
        }
        out
    }

    fn header() -> String {
        let mut s = String::new();
        s.push_str("                 COMMODORE 64\n");
        s.push_str("                 64K RAM SYSTEM\n");
        s.push_str("                 READY.\n\n");
        s.push_str("****************************************\n");
        s.push_str("*           STOCKMARKET 1982           *\n");
        s.push_str("*              C64 EDITION             *\n");
        s.push_str("****************************************\n\n");
        s
    }

    fn set_content(&mut self, content: String) {
        self.content = content;
        self.printed.clear();
        self.dirty = true;
    }

    fn single_column(&mut self, body: &str) {
        self.two_column = false;
        self.set_content(format!("{}{body}", Self::header()));
    }

    fn print(&mut self, line: impl Into<String>) {
        self.printed.push(line.into());
        self.dirty = true;
    }

    fn log(&mut self, kind: ActivityKind, message: impl Into<String>, player: Option<&str>) {
        self.activity.add(kind, message, player);
        self.dirty = true;
    }

    fn show_intro(&mut self) {
        self.single_column(
            "Welcome to the original C64 Stock Market game!\n\n\
             In this game you buy and sell shares in four\n\
             different companies: LEAD, ZINC, TIN, and GOLD.\n\n\
             Your goal is to become rich by buying low and\n\
             selling high, while watching the market news\n\
             for events that affect share prices.\n\n\
             Press Enter to start...",
        );
        self.mode = HudMode::Intro;
    }

    fn ask_for_name(&mut self, notice: Option<&str>) {
        let body = match notice {
            Some(notice) => format!("Enter your name:\n{notice}"),
            None => "Enter your name:".to_string(),
        };
        self.single_column(&body);
        self.mode = HudMode::AskName;
    }

    fn show_lobby(&mut self, lobby: &LobbyPayload) {
        let mut body = String::from("Waiting for players to join...\n\nConnected players:\n");
        for player in &lobby.players {
            body.push_str(&format!("- {player}\n"));
        }

        if self.is_host {
            body.push_str(&format!(
                "\nCurrent settings: Difficulty={}, Goal=${}\n",
                self.difficulty, self.goal
            ));
            body.push_str("Set difficulty (1-4) and goal (e.g. 1000000 or 5000000):\n");
            body.push_str("Type: DIFF [1-4] or GOAL [amount] or START");
            self.mode = HudMode::HostLobby;
        } else {
            body.push_str("\nWaiting for the host to start the game...");
            self.mode = HudMode::Waiting;
        }
        self.single_column(&body);
    }

    fn show_error(&mut self, body: &str) {
        self.single_column(&format!("{body}\nPress Enter to continue..."));
        self.mode = HudMode::ErrorWait;
    }

    fn show_help(&mut self) {
        let body = format!(
            "*** HELP ***\n\n\
             Commands:\n\
             B = Buy shares (interactive)\n\
             S = Sell shares (interactive)\n\
             BL10 = Buy 10 LEAD shares (quick)\n\
             SG5 = Sell 5 GOLD shares (quick)\n\
             P = Pay back loan (in sell menu)\n\
             Q = Quit turn\n\
             END = Propose ending the game\n\
             H or HELP = Show this help\n\n\
             Goal: Reach ${} to win!\n\n\
             Press Enter to continue...",
            group_thousands(self.goal)
        );
        self.single_column(&body);
        self.mode = HudMode::HelpWait;
    }

    fn draw_status(&mut self, me: &str) {
        let Some(content) = self.status_screen(me) else {
            return;
        };
        self.two_column = true;
        self.set_content(content);
    }

    /// Portfolio versus market prices, from the cached snapshot.
    fn status_screen(&self, me: &str) -> Option<String> {
        let data = self.snapshot.get()?;
        let p = self.snapshot.player(me)?;

        let mut content = String::new();
        if p.bankrupt {
            content.push_str(&format!("PLAYER: {me} - BANKRUPT\n"));
        } else {
            content.push_str(&format!("PLAYER: {me}\n"));
        }
        content.push_str(&format!("ROUND {}  TURN {}\n", data.round, data.turn));
        content.push_str(&"=".repeat(RULE_WIDTH));
        content.push_str("\n\n");

        let mut left = vec!["YOUR PORTFOLIO:".to_string(), String::new()];
        for share in Share::ALL {
            left.push(format!("{:<6} = {:>4}", share.symbol(), p.holding(share)));
        }
        left.push(String::new());
        left.push(format!("BALANCE = ${}", p.balance));
        if p.loan > 0 {
            left.push(format!("LOAN    = ${}", p.loan));
        }
        left.push(format!("TOTAL   = ${}", self.snapshot.net_worth(me)?));

        let mut right = vec!["MARKET PRICES:".to_string(), String::new()];
        for share in Share::ALL {
            if let Some(price) = self.snapshot.price(share) {
                let suspended = if data.suspended_shares.contains(&share) {
                    " SUSPENDED"
                } else {
                    ""
                };
                right.push(format!("{:<6} = ${price}{suspended}", share.symbol()));
            }
        }

        for i in 0..left.len().max(right.len()) {
            let l = left.get(i).map(String::as_str).unwrap_or("");
            let r = right.get(i).map(String::as_str).unwrap_or("");
            let row = format!("{l:<width$} {r}", width = LEFT_COLUMN_WIDTH);
            content.push_str(row.trim_end());
            content.push('\n');
        }

        content.push('\n');
        content.push_str(&"=".repeat(RULE_WIDTH));
        content.push_str("\n\n");
        content.push_str("Commands: B=Buy S=Sell Q=Quit H=Help\n");
        content.push_str("Quick: BL10 SG5 etc.\n");
        content.push_str(">\n\n");

        match data.current_player.as_deref() {
            Some(current) if current == me => content.push_str(">>> IT'S YOUR TURN <<<\n"),
            Some(current) => content.push_str(&format!("Waiting for {current}...\n")),
            None => {}
        }
        Some(content)
    }

    fn show_game_over(&mut self) {
        let mut body = String::from("\n*** GAME OVER ***\n\n");
        if let Some(payload) = &self.last_game_over {
            if payload.ended_early {
                body.push_str("The market was closed early.\n\n");
            }
            if payload.winners.is_empty() {
                body.push_str("NO WINNERS\n");
            } else {
                body.push_str("WINNERS:\n");
                for winner in &payload.winners {
                    body.push_str(&format!(">>> {winner} <<<\n"));
                }
            }
        }

        if !self.final_scores.is_empty() {
            body.push_str("\nFINAL SCORES:\n");
            for (rank, score) in self.final_scores.iter().enumerate() {
                body.push_str(&format!(
                    "{:>2}. {:<15} ${:>10}  SCORE {}\n",
                    rank + 1,
                    score.name,
                    score.total_value,
                    score.score
                ));
            }
        }

        body.push_str("\nCongratulations!\nThe market is now closed.\n\n");
        body.push_str("Type AGAIN to play again.");
        self.single_column(&body);
        self.mode = HudMode::GameOver;
    }

    fn trade(&self, side: Side, share: Share, amount: i64) -> ClientEvent {
        let request = TradeRequest {
            username: self.username.clone(),
            share: share.symbol().to_string(),
            amount,
        };
        match side {
            Side::Buy => ClientEvent::Buy(request),
            Side::Sell => ClientEvent::Sell(request),
        }
    }

    fn delayed_refresh(delay: Duration) -> Effect {
        Effect::SendAfter {
            event: ClientEvent::RequestUpdate,
            delay,
        }
    }

    fn handle_host_lobby(&mut self, cmd: &str) -> Vec<Effect> {
        if cmd == "START" {
            self.single_column("Starting market session...\nLoading share prices...");
            return vec![Effect::Send(ClientEvent::StartGame {
                username: self.username.clone(),
                difficulty: Some(self.difficulty),
                goal: Some(self.goal),
            })];
        }

        if let Some(arg) = cmd.strip_prefix("DIFF ") {
            return match parse_leading_int(arg) {
                Some(level @ 1..=4) => {
                    self.difficulty = level;
                    vec![Effect::Send(ClientEvent::RefreshLobby)]
                }
                _ => {
                    self.show_error("Invalid difficulty. Choose 1-4.");
                    Vec::new()
                }
            };
        }

        if let Some(arg) = cmd.strip_prefix("GOAL ") {
            return match parse_leading_int(arg) {
                Some(goal) if goal > 0 => {
                    self.goal = goal;
                    vec![Effect::Send(ClientEvent::RefreshLobby)]
                }
                _ => {
                    self.show_error("Invalid goal amount.");
                    Vec::new()
                }
            };
        }

        self.show_error(&format!(
            "Unknown command: {cmd}\nValid commands: DIFF [1-4], GOAL [amount], START"
        ));
        Vec::new()
    }

    fn handle_action(&mut self, cmd: &str) -> Vec<Effect> {
        if let Some((side, share, amount)) = parse_quick_trade(cmd) {
            return vec![Effect::Send(self.trade(side, share, amount))];
        }

        match cmd {
            "B" => {
                self.print("Which shares will you buy, Sir?");
                self.print("L = LEAD, Z = ZINC, T = TIN, G = GOLD, Q = cancel");
                self.mode = HudMode::BuySelect;
            }
            "S" => {
                self.print("Which shares will you sell, Sir?");
                self.print("L = LEAD, Z = ZINC, T = TIN, G = GOLD");
                self.print("P = Pay loan, Q = cancel");
                self.mode = HudMode::SellSelect;
            }
            "Q" => {
                return vec![Effect::Send(ClientEvent::EndTurn {
                    username: self.username.clone(),
                })];
            }
            "END" => return vec![Effect::Send(ClientEvent::AskEndGame)],
            "H" | "HELP" => self.show_help(),
            _ => debug!(cmd, "Ignoring unknown command"),
        }
        Vec::new()
    }

    fn handle_select(&mut self, cmd: &str, side: Side) -> Vec<Effect> {
        if cmd == "Q" {
            self.mode = HudMode::Action;
            return vec![Effect::Send(ClientEvent::RequestUpdate)];
        }
        if cmd == "P" && side == Side::Sell {
            self.print("How much do you want to repay? (0 for all)");
            self.mode = HudMode::RepayLoan;
            return Vec::new();
        }

        let mut chars = cmd.chars();
        if let (Some(letter), None) = (chars.next(), chars.next()) {
            if let Some(share) = Share::from_letter(letter) {
                self.current_share = Some(share);
                let verb = match side {
                    Side::Buy => "buy",
                    Side::Sell => "sell",
                };
                self.print(format!("How many {share} shares will you {verb}, Sir?"));
                self.mode = match side {
                    Side::Buy => HudMode::BuyAmount,
                    Side::Sell => HudMode::SellAmount,
                };
            }
        }
        Vec::new()
    }

    fn handle_amount(&mut self, cmd: &str, side: Side) -> Vec<Effect> {
        self.mode = HudMode::Action;
        let (Some(amount), Some(share)) = (parse_leading_int(cmd), self.current_share) else {
            return Vec::new();
        };
        vec![
            Effect::Send(self.trade(side, share, amount)),
            Self::delayed_refresh(TRADE_REFRESH_DELAY),
        ]
    }

    fn handle_repay(&mut self, cmd: &str) -> Vec<Effect> {
        self.mode = HudMode::Action;
        match parse_leading_int(cmd) {
            Some(amount) => vec![Effect::Send(ClientEvent::RepayLoan {
                username: self.username.clone(),
                amount: (amount != 0).then_some(amount),
            })],
            None => Vec::new(),
        }
    }

    fn handle_update(&mut self, data: GameSnapshot) {
        let Some(me) = self.username.clone() else {
            return;
        };
        let playing = data.players.contains_key(&me);
        let current = data.current_player.clone();
        let previous = self.snapshot.store(data);
        if !playing || self.mode == HudMode::GameOver {
            return;
        }

        if let Some(current) = current.as_deref() {
            if current != me && previous.as_deref() != Some(current) {
                self.log(
                    ActivityKind::Turn,
                    format!("{current} is taking their turn"),
                    Some(current),
                );
            }
        }

        self.draw_status(&me);
        if self.mode != HudMode::ConfirmEndGame {
            self.mode = HudMode::Action;
        }
    }

    fn reset_to_name_prompt(&mut self) {
        self.username = None;
        self.joined = false;
        self.is_host = false;
        self.snapshot.clear();
        self.activity.clear();
        self.final_scores.clear();
        self.last_game_over = None;
        self.news_deadline = None;
        self.ask_for_name(Some("A new market is open."));
    }
}

impl FrontEnd for Hud {
    fn on_input(&mut self, line: &str) -> Vec<Effect> {
        let cmd = normalise(line);

        match self.mode {
            HudMode::Intro => {
                self.ask_for_name(None);
                Vec::new()
            }
            HudMode::AskName => {
                if cmd.chars().count() > MAX_NAME_LEN {
                    self.ask_for_name(Some(&format!(
                        "Name too long. Max {MAX_NAME_LEN} characters:"
                    )));
                    return Vec::new();
                }
                if cmd.is_empty() {
                    self.ask_for_name(None);
                    return Vec::new();
                }
                self.single_column(&format!("Welcome, {cmd}!\nConnecting to market..."));
                self.username = Some(cmd.clone());
                self.mode = HudMode::Waiting;
                vec![Effect::Send(ClientEvent::Join { username: cmd })]
            }
            HudMode::HostLobby => self.handle_host_lobby(&cmd),
            HudMode::ErrorWait => vec![Effect::Send(ClientEvent::RefreshLobby)],
            HudMode::Action => self.handle_action(&cmd),
            HudMode::BuySelect => self.handle_select(&cmd, Side::Buy),
            HudMode::SellSelect => self.handle_select(&cmd, Side::Sell),
            HudMode::BuyAmount => self.handle_amount(&cmd, Side::Buy),
            HudMode::SellAmount => self.handle_amount(&cmd, Side::Sell),
            HudMode::RepayLoan => self.handle_repay(&cmd),
            HudMode::HelpWait => vec![Effect::Send(ClientEvent::RequestUpdate)],
            HudMode::NewsWait => {
                let expired = self
                    .news_deadline
                    .map_or(true, |deadline| Instant::now() >= deadline);
                self.news_deadline = None;
                if expired {
                    self.mode = HudMode::Action;
                    self.handle_action(&cmd)
                } else {
                    vec![Effect::Send(ClientEvent::RequestUpdate)]
                }
            }
            HudMode::ConfirmEndGame => match cmd.as_str() {
                "Y" | "YES" => {
                    self.mode = HudMode::Action;
                    vec![Effect::Send(ClientEvent::EndGameResponse { end_game: true })]
                }
                "N" | "NO" => {
                    self.mode = HudMode::Action;
                    vec![Effect::Send(ClientEvent::EndGameResponse { end_game: false })]
                }
                _ => {
                    self.print("End the game now? (Y/N)");
                    Vec::new()
                }
            },
            HudMode::GameOver => match cmd.as_str() {
                "AGAIN" => vec![Effect::Send(ClientEvent::PlayAgain)],
                "SCORES" => vec![Effect::Send(ClientEvent::GetFinalScores)],
                _ => Vec::new(),
            },
            HudMode::Waiting | HudMode::Disconnected => Vec::new(),
        }
    }

    fn on_event(&mut self, event: ServerEvent) -> Vec<Effect> {
        match event {
            ServerEvent::Lobby(lobby) => {
                let Some(me) = self.username.clone() else {
                    return Vec::new();
                };
                if self.snapshot.get().is_some() {
                    return Vec::new();
                }
                self.joined |= lobby.players.iter().any(|p| *p == me);
                self.is_host = lobby.host_player.as_deref() == Some(me.as_str());
                self.show_lobby(&lobby);
            }
            ServerEvent::Update(data) => self.handle_update(data),
            ServerEvent::Activity(activity) => {
                // news and flash lines are logged from their own events
                if matches!(activity.kind, ActivityKind::News | ActivityKind::Flash) {
                    return Vec::new();
                }
                let me = self.username.as_deref();
                let own = me.is_some() && activity.player_name.as_deref() == me;
                let always = matches!(activity.kind, ActivityKind::System | ActivityKind::Turn);
                let own_trade = own && activity.kind == ActivityKind::Trade;
                if !own || always {
                    self.activity.push(activity.into());
                    self.dirty = true;
                }
                if own_trade {
                    return vec![Self::delayed_refresh(OWN_TRADE_REFRESH_DELAY)];
                }
            }
            ServerEvent::Message { msg } => {
                if ERROR_MARKERS.iter().any(|marker| msg.contains(marker)) {
                    let me = self.username.clone();
                    self.log(ActivityKind::System, msg, me.as_deref());
                }
            }
            ServerEvent::Error { message } => {
                if self.mode == HudMode::Waiting && !self.joined {
                    self.username = None;
                    self.ask_for_name(Some(&message));
                } else {
                    let me = self.username.clone();
                    self.log(ActivityKind::System, message, me.as_deref());
                }
            }
            ServerEvent::News { events } => {
                for line in events {
                    self.log(ActivityKind::News, line, None);
                }
                if self.snapshot.get().is_some() && self.mode != HudMode::GameOver {
                    self.mode = HudMode::NewsWait;
                    self.news_deadline = Some(Instant::now() + NEWS_WAIT_TIMEOUT);
                }
            }
            ServerEvent::FlashNews { events } => {
                for line in events {
                    self.log(ActivityKind::Flash, line, None);
                }
            }
            ServerEvent::Millionaire { name } => {
                self.log(
                    ActivityKind::System,
                    format!("{name} IS A MILLIONAIRE!"),
                    Some(&name),
                );
            }
            ServerEvent::GameOver(payload) => {
                self.final_scores = payload.final_scores.clone();
                self.last_game_over = Some(payload);
                self.show_game_over();
            }
            ServerEvent::FinalScores { scores } => {
                self.final_scores = scores;
                if self.mode == HudMode::GameOver {
                    self.show_game_over();
                }
            }
            ServerEvent::AskEndGamePrompt => {
                if self.snapshot.get().is_some() && self.mode != HudMode::GameOver {
                    self.print("A player proposes ending the game. End it now? (Y/N)");
                    self.mode = HudMode::ConfirmEndGame;
                }
            }
            ServerEvent::GameReset => self.reset_to_name_prompt(),
        }
        Vec::new()
    }

    fn on_disconnected(&mut self, reason: &str) {
        self.single_column(&format!("*** CONNECTION LOST ***\n{reason}"));
        self.mode = HudMode::Disconnected;
    }

    fn take_screen(&mut self) -> ScreenUpdate {
        if !self.dirty {
            return ScreenUpdate::Unchanged;
        }
        self.dirty = false;
        ScreenUpdate::Redraw(self.render())
    }
}

/// `BL10` style shortcut: side letter, share letter, amount.
fn parse_quick_trade(cmd: &str) -> Option<(Side, Share, i64)> {
    let mut chars = cmd.chars();
    let side = match chars.next()? {
        'B' => Side::Buy,
        'S' => Side::Sell,
        _ => return None,
    };
    let share = Share::from_letter(chars.next()?)?;
    let amount = parse_leading_int(chars.as_str())?;
    Some((side, share, amount))
}

/// `1000000` -> `1,000,000`.
fn group_thousands(value: Money) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::tests::snapshot;
    use stockmarket_core::{ActivityPayload, Difficulty};

    fn lobby(players: &[&str], host: &str) -> ServerEvent {
        ServerEvent::Lobby(LobbyPayload {
            players: players.iter().map(|p| p.to_string()).collect(),
            host_player: Some(host.to_string()),
            difficulty: Difficulty::EASY,
            goal: DEFAULT_TARGET_VALUE,
        })
    }

    /// HUD joined as `name` and sitting in the lobby.
    fn joined(name: &str, host: &str) -> Hud {
        let mut hud = Hud::new();
        hud.on_input("");
        hud.on_input(name);
        hud.on_event(lobby(&[host, name], host));
        hud
    }

    /// HUD on the trading screen with `current` to move.
    fn in_game(name: &str, current: &str) -> Hud {
        let mut hud = joined(name, "ANN");
        hud.on_event(ServerEvent::Update(snapshot(&["ANN", "BOB"], current)));
        hud
    }

    #[test]
    fn test_intro_then_name_prompt() {
        let mut hud = Hud::new();
        assert_eq!(hud.mode(), HudMode::Intro);
        assert!(hud.on_input("x").is_empty());
        assert_eq!(hud.mode(), HudMode::AskName);
        assert!(hud.render().contains("Enter your name:"));
    }

    #[test]
    fn test_long_name_reprompts() {
        let mut hud = Hud::new();
        hud.on_input("");
        let effects = hud.on_input("abcdefghijklmnop");

        assert!(effects.is_empty());
        assert_eq!(hud.mode(), HudMode::AskName);
        assert!(hud.render().contains("Name too long. Max 15 characters:"));
    }

    #[test]
    fn test_join_sends_uppercased_name() {
        let mut hud = Hud::new();
        hud.on_input("");
        let effects = hud.on_input("ann");

        assert_eq!(
            effects,
            vec![Effect::Send(ClientEvent::Join {
                username: "ANN".to_string()
            })]
        );
        assert_eq!(hud.mode(), HudMode::Waiting);
    }

    #[test]
    fn test_greeting_lobby_ignored_before_join() {
        let mut hud = Hud::new();
        hud.on_event(lobby(&[], "ANN"));
        assert_eq!(hud.mode(), HudMode::Intro);
    }

    #[test]
    fn test_host_lobby_settings() {
        let mut hud = joined("ANN", "ANN");
        assert_eq!(hud.mode(), HudMode::HostLobby);
        assert!(hud.is_host());

        assert_eq!(
            hud.on_input("DIFF 3"),
            vec![Effect::Send(ClientEvent::RefreshLobby)]
        );
        hud.on_input("GOAL 5000000");
        assert_eq!(hud.selected_settings(), (3, 5_000_000));

        let effects = hud.on_input("start");
        assert_eq!(
            effects,
            vec![Effect::Send(ClientEvent::StartGame {
                username: Some("ANN".to_string()),
                difficulty: Some(3),
                goal: Some(5_000_000),
            })]
        );
    }

    #[test]
    fn test_invalid_difficulty_enters_error_wait() {
        let mut hud = joined("ANN", "ANN");
        assert!(hud.on_input("DIFF 9").is_empty());
        assert_eq!(hud.mode(), HudMode::ErrorWait);
        assert!(hud.render().contains("Invalid difficulty. Choose 1-4."));

        assert_eq!(
            hud.on_input(""),
            vec![Effect::Send(ClientEvent::RefreshLobby)]
        );
    }

    #[test]
    fn test_unknown_host_command() {
        let mut hud = joined("ANN", "ANN");
        hud.on_input("HELLO");
        assert_eq!(hud.mode(), HudMode::ErrorWait);
        assert!(hud.render().contains("Unknown command: HELLO"));
    }

    #[test]
    fn test_guest_waits_for_host() {
        let hud = joined("BOB", "ANN");
        assert_eq!(hud.mode(), HudMode::Waiting);
        assert!(hud.render().contains("Waiting for the host to start the game..."));
    }

    #[test]
    fn test_update_draws_status() {
        let mut hud = in_game("ANN", "ANN");
        assert_eq!(hud.mode(), HudMode::Action);

        let screen = match hud.take_screen() {
            ScreenUpdate::Redraw(screen) => screen,
            other => panic!("unexpected {other:?}"),
        };
        assert!(screen.contains("PLAYER: ANN"));
        assert!(screen.contains("YOUR PORTFOLIO:"));
        assert!(screen.contains("MARKET PRICES:"));
        assert!(screen.contains("BALANCE = $1000"));
        assert!(screen.contains("TOTAL   = $1000"));
        assert!(screen.contains("GOLD   = $1250"));
        assert!(screen.contains(">>> IT'S YOUR TURN <<<"));
        assert!(screen.contains("RECENT ACTIVITY"));
        assert_eq!(hud.take_screen(), ScreenUpdate::Unchanged);
    }

    #[test]
    fn test_turn_entry_logged_once_per_change() {
        let mut hud = in_game("ANN", "BOB");
        hud.on_event(ServerEvent::Update(snapshot(&["ANN", "BOB"], "BOB")));

        let turns: Vec<_> = hud
            .activity()
            .iter()
            .filter(|e| e.kind == ActivityKind::Turn)
            .collect();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].message, "BOB is taking their turn");
    }

    #[test]
    fn test_quick_trades() {
        let mut hud = in_game("ANN", "ANN");
        assert_eq!(
            hud.on_input("bl10"),
            vec![Effect::Send(ClientEvent::buy("ANN", Share::Lead, 10))]
        );
        assert_eq!(
            hud.on_input("SG5"),
            vec![Effect::Send(ClientEvent::sell("ANN", Share::Gold, 5))]
        );
        // no amount: not a quick trade, and not a known command either
        assert!(hud.on_input("BL").is_empty());
        assert_eq!(hud.mode(), HudMode::Action);
    }

    #[test]
    fn test_interactive_buy() {
        let mut hud = in_game("ANN", "ANN");
        hud.on_input("B");
        assert_eq!(hud.mode(), HudMode::BuySelect);
        hud.on_input("Z");
        assert_eq!(hud.mode(), HudMode::BuyAmount);
        assert!(hud.render().contains("How many ZINC shares will you buy, Sir?"));

        let effects = hud.on_input("7");
        assert_eq!(
            effects,
            vec![
                Effect::Send(ClientEvent::buy("ANN", Share::Zinc, 7)),
                Effect::SendAfter {
                    event: ClientEvent::RequestUpdate,
                    delay: TRADE_REFRESH_DELAY,
                },
            ]
        );
        assert_eq!(hud.mode(), HudMode::Action);
    }

    #[test]
    fn test_non_numeric_amount_returns_to_action() {
        let mut hud = in_game("ANN", "ANN");
        hud.on_input("S");
        hud.on_input("T");
        assert_eq!(hud.mode(), HudMode::SellAmount);
        assert!(hud.on_input("lots").is_empty());
        assert_eq!(hud.mode(), HudMode::Action);
    }

    #[test]
    fn test_select_cancel_requests_update() {
        let mut hud = in_game("ANN", "ANN");
        hud.on_input("B");
        assert_eq!(
            hud.on_input("Q"),
            vec![Effect::Send(ClientEvent::RequestUpdate)]
        );
        assert_eq!(hud.mode(), HudMode::Action);
    }

    #[test]
    fn test_repay_loan_zero_means_all() {
        let mut hud = in_game("ANN", "ANN");
        hud.on_input("S");
        hud.on_input("P");
        assert_eq!(hud.mode(), HudMode::RepayLoan);
        assert_eq!(
            hud.on_input("0"),
            vec![Effect::Send(ClientEvent::RepayLoan {
                username: Some("ANN".to_string()),
                amount: None,
            })]
        );

        hud.on_input("S");
        hud.on_input("P");
        assert_eq!(
            hud.on_input("250"),
            vec![Effect::Send(ClientEvent::RepayLoan {
                username: Some("ANN".to_string()),
                amount: Some(250),
            })]
        );
    }

    #[test]
    fn test_pay_loan_only_from_sell_menu() {
        let mut hud = in_game("ANN", "ANN");
        hud.on_input("B");
        hud.on_input("P");
        assert_eq!(hud.mode(), HudMode::BuySelect);
    }

    #[test]
    fn test_quit_ends_turn() {
        let mut hud = in_game("ANN", "ANN");
        assert_eq!(
            hud.on_input("q"),
            vec![Effect::Send(ClientEvent::EndTurn {
                username: Some("ANN".to_string())
            })]
        );
    }

    #[test]
    fn test_help_screen() {
        let mut hud = in_game("ANN", "ANN");
        hud.on_input("H");
        assert_eq!(hud.mode(), HudMode::HelpWait);
        assert!(hud.render().contains("Goal: Reach $1,000,000 to win!"));
        assert_eq!(
            hud.on_input(""),
            vec![Effect::Send(ClientEvent::RequestUpdate)]
        );
    }

    #[test]
    fn test_own_trades_not_logged() {
        let mut hud = in_game("ANN", "ANN");
        let effects = hud.on_event(ServerEvent::Activity(ActivityPayload::new(
            ActivityKind::Trade,
            "bought 2 TIN shares",
            Some("ANN"),
        )));
        assert!(hud
            .activity()
            .iter()
            .all(|e| e.message != "bought 2 TIN shares"));
        assert_eq!(
            effects,
            vec![Effect::SendAfter {
                event: ClientEvent::RequestUpdate,
                delay: OWN_TRADE_REFRESH_DELAY,
            }]
        );

        hud.on_event(ServerEvent::Activity(ActivityPayload::new(
            ActivityKind::Trade,
            "sold 1 LEAD shares",
            Some("BOB"),
        )));
        assert_eq!(hud.activity().last().unwrap().message, "sold 1 LEAD shares");
    }

    #[test]
    fn test_flash_and_news_lines_logged_once() {
        let mut hud = in_game("ANN", "ANN");
        let before = hud.activity().len();
        let flash = ["!! NEWSFLASH !!", "MARKET VERY WEAK"];

        // server order after a trade: per-line activity, then the bulletin
        for line in flash {
            hud.on_event(ServerEvent::activity(ActivityKind::Flash, line, None));
        }
        hud.on_event(ServerEvent::FlashNews {
            events: flash.iter().map(|l| l.to_string()).collect(),
        });

        hud.on_event(ServerEvent::activity(ActivityKind::News, "TIN UP BY £25", None));
        hud.on_event(ServerEvent::News {
            events: vec!["TIN UP BY £25".to_string()],
        });

        let logged: Vec<&str> = hud
            .activity()
            .iter()
            .skip(before)
            .map(|e| e.message.as_str())
            .collect();
        assert_eq!(logged, ["!! NEWSFLASH !!", "MARKET VERY WEAK", "TIN UP BY £25"]);
    }

    #[test]
    fn test_error_like_messages_logged() {
        let mut hud = in_game("ANN", "ANN");
        let before = hud.activity().len();
        hud.on_event(ServerEvent::message("Bought successfully"));
        assert_eq!(hud.activity().len(), before);

        hud.on_event(ServerEvent::message("Cannot sell more shares than you own"));
        let last = hud.activity().last().unwrap();
        assert_eq!(last.kind, ActivityKind::System);
        assert_eq!(last.player_name.as_deref(), Some("ANN"));
    }

    #[test]
    fn test_news_wait_swallows_input_until_timeout() {
        let mut hud = in_game("ANN", "ANN");
        hud.on_event(ServerEvent::News {
            events: vec!["LEAD UP 5".to_string(), "GOLD DOWN 10".to_string()],
        });
        assert_eq!(hud.mode(), HudMode::NewsWait);
        assert_eq!(hud.activity().last().unwrap().message, "GOLD DOWN 10");

        assert_eq!(
            hud.on_input("BL1"),
            vec![Effect::Send(ClientEvent::RequestUpdate)]
        );

        hud.mode = HudMode::NewsWait;
        hud.news_deadline = Some(Instant::now() - Duration::from_secs(1));
        assert_eq!(
            hud.on_input("BL1"),
            vec![Effect::Send(ClientEvent::buy("ANN", Share::Lead, 1))]
        );
    }

    #[test]
    fn test_join_error_reprompts_name() {
        let mut hud = Hud::new();
        hud.on_input("");
        hud.on_input("ANN");
        hud.on_event(ServerEvent::error("Invalid name: name is empty"));
        assert_eq!(hud.mode(), HudMode::AskName);
        assert_eq!(hud.username(), None);
    }

    #[test]
    fn test_game_over_and_play_again() {
        let mut hud = in_game("ANN", "ANN");
        hud.on_event(ServerEvent::GameOver(GameOverPayload {
            winners: vec!["ANN".to_string()],
            final_scores: vec![FinalScore {
                name: "ANN".to_string(),
                total_value: 1_200_000,
                profit_made: 1_199_000,
                score: 199_833,
            }],
            ended_early: false,
        }));
        assert_eq!(hud.mode(), HudMode::GameOver);
        let screen = hud.render();
        assert!(screen.contains(">>> ANN <<<"));
        assert!(screen.contains("FINAL SCORES:"));

        // late updates do not leave the game-over screen
        hud.on_event(ServerEvent::Update(snapshot(&["ANN", "BOB"], "BOB")));
        assert_eq!(hud.mode(), HudMode::GameOver);

        assert_eq!(
            hud.on_input("again"),
            vec![Effect::Send(ClientEvent::PlayAgain)]
        );
        hud.on_event(ServerEvent::GameReset);
        assert_eq!(hud.mode(), HudMode::AskName);
        assert!(hud.activity().is_empty());
        assert_eq!(hud.username(), None);
    }

    #[test]
    fn test_end_game_vote() {
        let mut hud = in_game("ANN", "BOB");
        hud.on_event(ServerEvent::AskEndGamePrompt);
        assert_eq!(hud.mode(), HudMode::ConfirmEndGame);

        // an update while the prompt is open keeps the prompt
        hud.on_event(ServerEvent::Update(snapshot(&["ANN", "BOB"], "BOB")));
        assert_eq!(hud.mode(), HudMode::ConfirmEndGame);

        assert_eq!(
            hud.on_input("y"),
            vec![Effect::Send(ClientEvent::EndGameResponse { end_game: true })]
        );
    }

    #[test]
    fn test_disconnect_screen() {
        let mut hud = in_game("ANN", "ANN");
        hud.on_disconnected("server went away");
        assert_eq!(hud.mode(), HudMode::Disconnected);
        assert!(hud.render().contains("*** CONNECTION LOST ***"));
        assert!(hud.on_input("B").is_empty());
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(5_000_000), "5,000,000");
        assert_eq!(group_thousands(-12_345), "-12,345");
    }
}
