//! WebSocket event protocol.
//!
//! Every frame is a JSON text frame of the form
//! `{"event": "<name>", "data": {...}}`. Events without a payload may omit
//! `data`. Field names follow the browser clients that first spoke this
//! protocol (`playerName`, `msg`, `host_player`), so they are not uniformly
//! snake_case.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::player::{Money, PlayerData, SharePrices};
use crate::settings::Difficulty;
use crate::share::Share;

/// Trade request payload shared by `buy` and `sell`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRequest {
    #[serde(default)]
    pub username: Option<String>,
    pub share: String,
    pub amount: i64,
}

/// Events sent by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    Join {
        username: String,
    },
    StartGame {
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        difficulty: Option<i64>,
        #[serde(default)]
        goal: Option<i64>,
    },
    Buy(TradeRequest),
    Sell(TradeRequest),
    RepayLoan {
        #[serde(default)]
        username: Option<String>,
        /// `None` repays as much as the balance allows.
        #[serde(default)]
        amount: Option<i64>,
    },
    EndTurn {
        #[serde(default)]
        username: Option<String>,
    },
    RequestUpdate,
    RefreshLobby,
    GetFinalScores,
    PlayAgain,
    AskEndGame,
    EndGameResponse {
        #[serde(default)]
        end_game: bool,
    },
}

impl ClientEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::StartGame { .. } => "start_game",
            Self::Buy(_) => "buy",
            Self::Sell(_) => "sell",
            Self::RepayLoan { .. } => "repay_loan",
            Self::EndTurn { .. } => "end_turn",
            Self::RequestUpdate => "request_update",
            Self::RefreshLobby => "refresh_lobby",
            Self::GetFinalScores => "get_final_scores",
            Self::PlayAgain => "play_again",
            Self::AskEndGame => "ask_end_game",
            Self::EndGameResponse { .. } => "end_game_response",
        }
    }

    pub fn buy(username: &str, share: Share, amount: i64) -> Self {
        Self::Buy(TradeRequest {
            username: Some(username.to_string()),
            share: share.symbol().to_string(),
            amount,
        })
    }

    pub fn sell(username: &str, share: Share, amount: i64) -> Self {
        Self::Sell(TradeRequest {
            username: Some(username.to_string()),
            share: share.symbol().to_string(),
            amount,
        })
    }
}

/// Lobby state broadcast whenever the player list or settings change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyPayload {
    pub players: Vec<String>,
    pub host_player: Option<String>,
    pub difficulty: Difficulty,
    pub goal: Money,
}

/// Full game state as seen by every client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub players: BTreeMap<String, PlayerData>,
    pub share_prices: SharePrices,
    pub current_player: Option<String>,
    /// Players in turn order.
    pub players_list: Vec<String>,
    /// 1-based round number.
    pub round: u32,
    /// 1-based turn number.
    pub turn: u32,
    #[serde(default)]
    pub suspended_shares: Vec<Share>,
    pub difficulty: Difficulty,
    pub goal: Money,
}

/// Category of an activity-log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Trade,
    Turn,
    News,
    Flash,
    System,
}

/// One line for the shared activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityPayload {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub message: String,
    #[serde(rename = "playerName")]
    pub player_name: Option<String>,
}

impl ActivityPayload {
    pub fn new(kind: ActivityKind, message: impl Into<String>, player: Option<&str>) -> Self {
        Self {
            kind,
            message: message.into(),
            player_name: player.map(str::to_string),
        }
    }
}

/// Final standing of one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalScore {
    pub name: String,
    pub total_value: Money,
    pub profit_made: Money,
    pub score: Money,
}

/// End-of-game announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOverPayload {
    pub winners: Vec<String>,
    pub final_scores: Vec<FinalScore>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ended_early: bool,
}

/// Events sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    Lobby(LobbyPayload),
    Update(GameSnapshot),
    Message { msg: String },
    Activity(ActivityPayload),
    News { events: Vec<String> },
    FlashNews { events: Vec<String> },
    GameOver(GameOverPayload),
    Millionaire { name: String },
    FinalScores { scores: Vec<FinalScore> },
    Error { message: String },
    GameReset,
    AskEndGamePrompt,
}

impl ServerEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Lobby(_) => "lobby",
            Self::Update(_) => "update",
            Self::Message { .. } => "message",
            Self::Activity(_) => "activity",
            Self::News { .. } => "news",
            Self::FlashNews { .. } => "flash_news",
            Self::GameOver(_) => "game_over",
            Self::Millionaire { .. } => "millionaire",
            Self::FinalScores { .. } => "final_scores",
            Self::Error { .. } => "error",
            Self::GameReset => "game_reset",
            Self::AskEndGamePrompt => "ask_end_game_prompt",
        }
    }

    pub fn message(msg: impl Into<String>) -> Self {
        Self::Message { msg: msg.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn activity(kind: ActivityKind, message: impl Into<String>, player: Option<&str>) -> Self {
        Self::Activity(ActivityPayload::new(kind, message, player))
    }
}
