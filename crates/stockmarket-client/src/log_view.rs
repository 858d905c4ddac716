//! Scrolling log front-end.
//!
//! Everything is appended; nothing is redrawn. Commands are whole words
//! (`BUY GOLD 5`) instead of the HUD's single-letter grammar.

use stockmarket_core::{ClientEvent, GameOverPayload, GameSnapshot, ServerEvent, TradeRequest};

use crate::frontend::{normalise, Effect, FrontEnd, ScreenUpdate};
use crate::snapshot::SnapshotCache;

/// Accepted name length, in characters.
pub const LOG_NAME_LEN: std::ops::RangeInclusive<usize> = 2..=12;

const PROMPT: &str = "> ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogState {
    Boot,
    Login,
    Connecting,
    Lobby,
    Game,
    GameOver,
    Disconnected,
}

/// The log front-end.
#[derive(Debug)]
pub struct LogView {
    state: LogState,
    username: Option<String>,
    snapshot: SnapshotCache,
    pending: Vec<String>,
}

impl Default for LogView {
    fn default() -> Self {
        Self::new()
    }
}

impl LogView {
    pub fn new() -> Self {
        Self {
            state: LogState::Boot,
            username: None,
            snapshot: SnapshotCache::default(),
            pending: Vec::new(),
        }
    }

    pub fn state(&self) -> LogState {
        self.state
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    fn append(&mut self, line: impl Into<String>) {
        self.pending.push(line.into());
    }

    fn prompt(&mut self) {
        self.append(PROMPT);
    }

    fn help(&mut self) {
        match self.state {
            LogState::Lobby => {
                self.append("Commands:");
                self.append("  START - Begin the game (host only)");
            }
            LogState::Game => {
                self.append("Commands:");
                self.append("  BUY <share> <amount> - Buy shares");
                self.append("  SELL <share> <amount> - Sell shares");
                self.append("  END - End your turn");
                self.append("Available shares: LEAD, ZINC, TIN, GOLD");
            }
            LogState::GameOver => {
                self.append("Commands:");
                self.append("  AGAIN - Start a new market");
            }
            _ => {}
        }
    }

    fn welcome(&mut self) {
        self.state = LogState::Login;
        self.append("Welcome to STOCKMARKET 1982!");
        self.append(format!(
            "Please enter your name ({}-{} characters):",
            LOG_NAME_LEN.start(),
            LOG_NAME_LEN.end()
        ));
        self.prompt();
    }

    fn trade(&mut self, parts: &[&str]) -> Vec<Effect> {
        let verb = parts[0];
        let amount = match parts {
            [_, _, amount] => amount.parse::<i64>().ok(),
            _ => None,
        };
        let Some(amount) = amount else {
            self.append(format!("Usage: {verb} <share> <amount>"));
            self.prompt();
            return Vec::new();
        };

        let request = TradeRequest {
            username: self.username.clone(),
            share: parts[1].to_string(),
            amount,
        };
        let event = if verb == "BUY" {
            ClientEvent::Buy(request)
        } else {
            ClientEvent::Sell(request)
        };
        vec![Effect::Send(event)]
    }

    fn game_command(&mut self, command: &str) -> Vec<Effect> {
        let me = self.username.as_deref().unwrap_or_default();
        if !self.snapshot.is_turn_of(me) {
            let current = self
                .snapshot
                .current_player()
                .unwrap_or("another player")
                .to_string();
            self.append("It's not your turn!");
            self.append(format!("Waiting for {current} to play..."));
            return Vec::new();
        }

        let parts: Vec<&str> = command.split_whitespace().collect();
        match parts[0] {
            "BUY" | "SELL" => self.trade(&parts),
            "END" => vec![Effect::Send(ClientEvent::EndTurn {
                username: self.username.clone(),
            })],
            _ => {
                self.append("Invalid command. Type HELP for commands.");
                self.prompt();
                Vec::new()
            }
        }
    }

    fn show_update(&mut self, data: &GameSnapshot) {
        if self.state != LogState::Game {
            self.state = LogState::Game;
            self.append("STOCKMARKET 1982 - GAME IN PROGRESS");
        }

        let current = data.current_player.clone().unwrap_or_default();
        let mine = self.username.as_deref() == Some(current.as_str());

        self.append(format!("Round {}, Turn {}", data.round, data.turn));
        self.append(format!("Current player: {current}"));

        self.append("Share prices:");
        for (share, price) in &data.share_prices {
            let suspended = if data.suspended_shares.contains(share) {
                " (suspended)"
            } else {
                ""
            };
            self.append(format!("  {share}: ${price}{suspended}"));
        }

        self.append("Players:");
        for name in &data.players_list {
            let Some(info) = data.players.get(name) else {
                continue;
            };
            let shares = info
                .shares
                .iter()
                .map(|(s, n)| format!("{s}:{n}"))
                .collect::<Vec<_>>()
                .join(", ");
            let mut line = format!("  {name}: ${} ({shares})", info.balance);
            if info.loan > 0 {
                line.push_str(&format!(" loan ${}", info.loan));
            }
            if info.bankrupt {
                line.push_str(" BANKRUPT");
            }
            self.append(line);
        }

        if mine {
            self.append("It's your turn! Type HELP for commands");
            self.prompt();
        } else {
            self.append(format!("Waiting for {current} to play..."));
        }
    }

    fn show_game_over(&mut self, payload: &GameOverPayload) {
        self.state = LogState::GameOver;
        self.append("*** GAME OVER ***");
        match payload.winners.as_slice() {
            [] => self.append("Nobody reached the goal."),
            [winner] => self.append(format!("{winner} WINS THE GAME!")),
            winners => self.append(format!("{} WIN THE GAME!", winners.join(" AND "))),
        }
        if payload.ended_early {
            self.append("The market was closed early.");
        }
        for (rank, score) in payload.final_scores.iter().enumerate() {
            self.append(format!(
                "  {}. {} ${} (score {})",
                rank + 1,
                score.name,
                score.total_value,
                score.score
            ));
        }
        self.append("Type AGAIN to play again.");
        self.prompt();
    }
}

impl FrontEnd for LogView {
    fn on_connected(&mut self) -> Vec<Effect> {
        self.append("CONNECTING TO MARKET...");
        Vec::new()
    }

    fn on_input(&mut self, line: &str) -> Vec<Effect> {
        let command = normalise(line);
        if self.state == LogState::Disconnected {
            return Vec::new();
        }
        self.append(command.clone());

        if command.is_empty() {
            self.prompt();
            return Vec::new();
        }
        if command == "HELP" {
            self.help();
            self.prompt();
            return Vec::new();
        }

        match self.state {
            LogState::Login => {
                if !LOG_NAME_LEN.contains(&command.chars().count()) {
                    self.append(format!(
                        "Name must be {}-{} characters long",
                        LOG_NAME_LEN.start(),
                        LOG_NAME_LEN.end()
                    ));
                    self.prompt();
                    return Vec::new();
                }
                self.username = Some(command.clone());
                self.append(format!("Welcome {command}! Connecting to market..."));
                self.state = LogState::Connecting;
                vec![Effect::Send(ClientEvent::Join { username: command })]
            }
            LogState::Lobby => {
                if command == "START" {
                    vec![Effect::Send(ClientEvent::StartGame {
                        username: self.username.clone(),
                        difficulty: Some(1),
                        goal: Some(stockmarket_core::DEFAULT_TARGET_VALUE),
                    })]
                } else {
                    self.append("Invalid command. Type HELP for commands.");
                    self.prompt();
                    Vec::new()
                }
            }
            LogState::Game => self.game_command(&command),
            LogState::GameOver => {
                if command == "AGAIN" {
                    vec![Effect::Send(ClientEvent::PlayAgain)]
                } else {
                    self.append("Invalid command. Type HELP for commands.");
                    self.prompt();
                    Vec::new()
                }
            }
            LogState::Boot | LogState::Connecting | LogState::Disconnected => Vec::new(),
        }
    }

    fn on_event(&mut self, event: ServerEvent) -> Vec<Effect> {
        match event {
            ServerEvent::Lobby(lobby) => {
                match self.state {
                    LogState::Boot => {
                        self.welcome();
                        return Vec::new();
                    }
                    LogState::Login | LogState::Game | LogState::GameOver => return Vec::new(),
                    LogState::Connecting => self.append("STOCKMARKET 1982 - LOBBY"),
                    LogState::Lobby | LogState::Disconnected => {}
                }

                self.append("Players connected:");
                for player in &lobby.players {
                    let host = if lobby.host_player.as_deref() == Some(player.as_str()) {
                        " (Host)"
                    } else {
                        ""
                    };
                    self.append(format!("  {player}{host}"));
                }
                if lobby.host_player.is_some() && lobby.host_player == self.username {
                    self.append("You are the host! Type START to begin the game");
                } else {
                    self.append("Waiting for host to start the game...");
                }
                self.state = LogState::Lobby;
                self.append("Type HELP for commands");
                self.prompt();
            }
            ServerEvent::Update(data) => {
                if self.username.is_none() || self.state == LogState::GameOver {
                    return Vec::new();
                }
                self.show_update(&data);
                self.snapshot.store(data);
            }
            ServerEvent::Message { msg } => {
                self.append(msg);
                if self.state == LogState::Game {
                    self.prompt();
                }
            }
            ServerEvent::Error { message } => {
                self.append(format!("ERROR: {message}"));
                if self.state == LogState::Connecting {
                    self.username = None;
                    self.state = LogState::Login;
                }
                self.prompt();
            }
            ServerEvent::News { events } => {
                for line in events.into_iter().filter(|l| !l.is_empty()) {
                    self.append(format!("NEWS: {line}"));
                }
            }
            ServerEvent::FlashNews { events } => {
                for line in events {
                    self.append(format!("FLASH NEWS: {line}"));
                }
                if self.state == LogState::Game {
                    self.prompt();
                }
            }
            ServerEvent::Millionaire { name } => {
                self.append(format!("{name} IS A MILLIONAIRE!"));
            }
            ServerEvent::GameOver(payload) => self.show_game_over(&payload),
            ServerEvent::GameReset => {
                self.username = None;
                self.snapshot.clear();
                self.append("A new market is open.");
                self.welcome();
            }
            ServerEvent::Activity(_)
            | ServerEvent::FinalScores { .. }
            | ServerEvent::AskEndGamePrompt => {}
        }
        Vec::new()
    }

    fn on_disconnected(&mut self, reason: &str) {
        self.append("*** CONNECTION LOST ***");
        self.append(reason.to_string());
        self.state = LogState::Disconnected;
    }

    fn take_screen(&mut self) -> ScreenUpdate {
        if self.pending.is_empty() {
            ScreenUpdate::Unchanged
        } else {
            ScreenUpdate::Append(std::mem::take(&mut self.pending))
        }
    }
}
