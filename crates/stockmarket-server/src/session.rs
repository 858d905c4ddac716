//! The single game session shared by every connection.
//!
//! `GameSession::handle` turns one inbound event into the events to send
//! back: replies for the sender only and broadcasts for everyone. It does no
//! I/O, so the whole event contract can be tested without sockets.

use std::sync::Arc;

use parking_lot::Mutex;
use stockmarket_core::{
    ActivityKind, ClientEvent, Difficulty, GameOverPayload, GameSettings, GameSnapshot,
    LobbyPayload, Money, PlayerName, ServerEvent, Share, StockQuote, TradeRequest,
};
use stockmarket_engine::{GameEngine, TradeError, TradeOutcome, TurnOutcome};
use stockmarket_telemetry::Metrics;
use tracing::{debug, info, warn};

use crate::config::{GameConfig, ServerConfig};
use crate::error::ServerResult;

/// Session handle shared by all connections and REST handlers.
pub type SharedSession = Arc<Mutex<GameSession>>;

/// First news line of every game.
pub const GAME_STARTED_NEWS: &str = "GAME STARTED - GOOD LUCK TRADERS!";
/// Winner entry when nobody is left solvent.
pub const ALL_BANKRUPT_BANNER: &str = "GAME OVER - ALL BANKRUPT";

/// Where an outgoing event goes.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Only the connection that sent the event.
    Reply(ServerEvent),
    /// Every connected client, the sender included.
    Broadcast(ServerEvent),
}

impl Outbound {
    pub fn event(&self) -> &ServerEvent {
        match self {
            Self::Reply(e) | Self::Broadcast(e) => e,
        }
    }
}

/// Per-connection state.
#[derive(Debug, Default, Clone)]
pub struct Connection {
    /// Player this connection joined as.
    pub player: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Buy,
    Sell,
}

impl Side {
    fn label(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }

    fn past_tense(self) -> &'static str {
        match self {
            Self::Buy => "bought",
            Self::Sell => "sold",
        }
    }
}

/// Host, lobby and engine for the one game this server runs.
#[derive(Debug)]
pub struct GameSession {
    engine: GameEngine,
    host: Option<String>,
    started: bool,
    finished: bool,
    /// Settings a fresh game starts with.
    default_settings: GameSettings,
}

impl GameSession {
    pub fn new(engine: GameEngine) -> Self {
        let default_settings = engine.settings();
        Self {
            engine,
            host: None,
            started: false,
            finished: false,
            default_settings,
        }
    }

    /// Build a session from configuration.
    pub fn from_config(game: &GameConfig, server: &ServerConfig) -> ServerResult<Self> {
        let settings = game.settings()?;
        let engine = match game.seed {
            Some(seed) => GameEngine::with_seed(settings, seed),
            None => GameEngine::new(settings),
        }
        .with_flash_news_cooldown(server.flash_news_cooldown());
        Ok(Self::new(engine))
    }

    pub fn shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    pub fn engine(&self) -> &GameEngine {
        &self.engine
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn snapshot(&self) -> GameSnapshot {
        self.engine.snapshot()
    }

    pub fn lobby(&self) -> LobbyPayload {
        let settings = self.engine.settings();
        LobbyPayload {
            players: self.engine.players().to_vec(),
            host_player: self.host.clone(),
            difficulty: settings.difficulty,
            goal: settings.target_value,
        }
    }

    /// Quote for a ticker symbol, if it names a share.
    pub fn quote(&self, symbol: &str) -> Option<StockQuote> {
        symbol.parse::<Share>().ok().map(|s| self.engine.quote(s))
    }

    /// Quotes whose symbol or company name contains `query`, ignoring case.
    pub fn search(&self, query: &str) -> Vec<StockQuote> {
        let needle = query.trim().to_lowercase();
        Share::ALL
            .into_iter()
            .filter(|s| {
                s.symbol().to_lowercase().contains(&needle)
                    || s.company_name().to_lowercase().contains(&needle)
            })
            .map(|s| self.engine.quote(s))
            .collect()
    }

    /// Handle one inbound event.
    pub fn handle(&mut self, conn: &mut Connection, event: ClientEvent) -> Vec<Outbound> {
        Metrics::event_received(event.name());
        debug!(event = event.name(), player = ?conn.player, "Handling event");

        match event {
            ClientEvent::Join { username } => self.on_join(conn, &username),
            ClientEvent::StartGame {
                difficulty, goal, ..
            } => self.on_start_game(conn, difficulty, goal),
            ClientEvent::Buy(req) => self.on_trade(conn, Side::Buy, req),
            ClientEvent::Sell(req) => self.on_trade(conn, Side::Sell, req),
            ClientEvent::RepayLoan { amount, .. } => self.on_repay_loan(conn, amount),
            ClientEvent::EndTurn { .. } => self.on_end_turn(conn),
            ClientEvent::RequestUpdate => vec![Outbound::Reply(self.update())],
            ClientEvent::RefreshLobby => {
                vec![Outbound::Broadcast(ServerEvent::Lobby(self.lobby()))]
            }
            ClientEvent::GetFinalScores => {
                if self.engine.players().is_empty() {
                    vec![Outbound::Reply(ServerEvent::error("No game in progress"))]
                } else {
                    vec![Outbound::Broadcast(ServerEvent::FinalScores {
                        scores: self.engine.final_scores(),
                    })]
                }
            }
            ClientEvent::PlayAgain => self.on_play_again(conn),
            ClientEvent::AskEndGame => vec![Outbound::Broadcast(ServerEvent::AskEndGamePrompt)],
            ClientEvent::EndGameResponse { end_game } => {
                if end_game {
                    info!("Game ended early");
                    self.finish("ended_early");
                    vec![Outbound::Broadcast(ServerEvent::GameOver(GameOverPayload {
                        winners: Vec::new(),
                        final_scores: self.engine.final_scores(),
                        ended_early: true,
                    }))]
                } else {
                    vec![Outbound::Broadcast(self.update())]
                }
            }
        }
    }

    /// `update` event for the current state; refreshes the price gauges.
    fn update(&self) -> ServerEvent {
        for (share, price) in self.engine.share_prices() {
            Metrics::share_price(share.symbol(), *price as f64);
        }
        ServerEvent::Update(self.engine.snapshot())
    }

    /// The acting player is always the name this connection joined as;
    /// `username` fields in payloads are not trusted.
    fn acting(conn: &Connection) -> Option<&str> {
        conn.player.as_deref()
    }

    fn finish(&mut self, outcome: &str) {
        self.finished = true;
        Metrics::game_finished(outcome);
    }

    fn on_join(&mut self, conn: &mut Connection, username: &str) -> Vec<Outbound> {
        let name = match PlayerName::new(username) {
            Ok(name) => String::from(name),
            Err(e) => return vec![Outbound::Reply(ServerEvent::error(e.to_string()))],
        };

        let is_new = self.engine.add_player(&name);
        if self.host.is_none() {
            self.host = Some(name.clone());
        }
        conn.player = Some(name.clone());
        info!(player = %name, is_new, host = ?self.host, "Player joined");

        let mut out = vec![Outbound::Broadcast(ServerEvent::Lobby(self.lobby()))];
        if self.started {
            out.push(Outbound::Broadcast(self.update()));
        }
        out
    }

    fn on_start_game(
        &mut self,
        conn: &Connection,
        difficulty: Option<i64>,
        goal: Option<i64>,
    ) -> Vec<Outbound> {
        let acting = Self::acting(conn);
        if acting.is_none() || acting != self.host.as_deref() {
            return vec![Outbound::Reply(ServerEvent::error(
                "Only the host can start the game",
            ))];
        }

        let current = self.engine.settings();
        let settings = difficulty
            .map(Difficulty::new)
            .unwrap_or(Ok(current.difficulty))
            .and_then(|d| GameSettings::new(d, goal.unwrap_or(current.target_value)));
        let settings = match settings {
            Ok(s) => s,
            Err(e) => return vec![Outbound::Reply(ServerEvent::error(e.to_string()))],
        };

        self.engine.set_settings(settings);
        self.started = true;
        self.finished = false;
        info!(
            difficulty = %settings.difficulty,
            goal = settings.target_value,
            players = self.engine.players().len(),
            "Game started"
        );

        vec![
            Outbound::Broadcast(self.update()),
            Outbound::Broadcast(ServerEvent::News {
                events: vec![GAME_STARTED_NEWS.to_string()],
            }),
        ]
    }

    /// Common gate for in-game actions: joined, started, not over, on turn.
    fn check_turn(&self, name: Option<&str>) -> Result<String, ServerEvent> {
        let Some(name) = name else {
            return Err(ServerEvent::error("Join the game first"));
        };
        if !self.started {
            return Err(ServerEvent::error("The game has not started yet"));
        }
        if self.finished {
            return Err(ServerEvent::error("The game is over"));
        }
        if !self.engine.is_current_player(name) {
            return Err(ServerEvent::error("It's not your turn!"));
        }
        Ok(name.to_string())
    }

    fn on_trade(&mut self, conn: &Connection, side: Side, req: TradeRequest) -> Vec<Outbound> {
        let name = match self.check_turn(Self::acting(conn)) {
            Ok(name) => name,
            Err(e) => return vec![Outbound::Reply(e)],
        };
        let share: Share = match req.share.parse() {
            Ok(share) => share,
            Err(e) => return vec![Outbound::Reply(ServerEvent::error(format!("{e}")))],
        };

        let result = match side {
            Side::Buy => self.engine.buy(&name, share, req.amount),
            Side::Sell => self.engine.sell(&name, share, req.amount),
        };

        let mut out = Vec::new();
        match result {
            Ok(outcome) => {
                Metrics::trade(side.label(), share.symbol());
                debug!(
                    player = %name,
                    side = side.label(),
                    share = %share,
                    amount = req.amount,
                    "Trade completed"
                );
                out.push(Outbound::Reply(ServerEvent::message(outcome.to_string())));
                out.push(Outbound::Broadcast(ServerEvent::activity(
                    ActivityKind::Trade,
                    format!("{} {} {} shares", side.past_tense(), req.amount, share),
                    Some(&name),
                )));
            }
            Err(e) => {
                Metrics::trade_rejected(rejection_reason(&e));
                debug!(player = %name, side = side.label(), error = %e, "Trade rejected");
                out.push(Outbound::Reply(ServerEvent::message(e.to_string())));
            }
        }
        out.push(Outbound::Broadcast(self.update()));

        let flash = self.engine.generate_flash_news();
        if !flash.is_empty() {
            Metrics::flash_news();
            for line in &flash {
                out.push(Outbound::Broadcast(ServerEvent::activity(
                    ActivityKind::Flash,
                    line.clone(),
                    None,
                )));
            }
            out.push(Outbound::Broadcast(ServerEvent::FlashNews { events: flash }));
            out.push(Outbound::Broadcast(self.update()));
        }
        out
    }

    fn on_repay_loan(&mut self, conn: &Connection, amount: Option<Money>) -> Vec<Outbound> {
        let name = match self.check_turn(Self::acting(conn)) {
            Ok(name) => name,
            Err(e) => return vec![Outbound::Reply(e)],
        };

        let mut out = Vec::new();
        match self.engine.repay_loan(&name, amount) {
            Ok(outcome) => {
                out.push(Outbound::Reply(ServerEvent::message(outcome.to_string())));
                let message = match outcome {
                    TradeOutcome::LoanRepaid {
                        amount,
                        remaining,
                    } if remaining > 0 => format!("repaid £{amount} loan"),
                    _ => "repaid entire loan".to_string(),
                };
                out.push(Outbound::Broadcast(ServerEvent::activity(
                    ActivityKind::Trade,
                    message,
                    Some(&name),
                )));
            }
            Err(e) => out.push(Outbound::Reply(ServerEvent::message(e.to_string()))),
        }
        out.push(Outbound::Broadcast(self.update()));
        out
    }

    fn on_end_turn(&mut self, conn: &Connection) -> Vec<Outbound> {
        let acting = Self::acting(conn);
        let name = match self.check_turn(acting) {
            Ok(name) => name,
            Err(_) => {
                debug!(player = ?acting, "Ignoring end_turn out of turn");
                return Vec::new();
            }
        };

        let outcome = self.engine.end_turn();
        info!(
            player = %name,
            next = ?self.engine.current_player(),
            round_ended = outcome.round_ended,
            "Turn ended"
        );

        let mut out = vec![
            Outbound::Broadcast(ServerEvent::activity(
                ActivityKind::Turn,
                "ended their turn",
                Some(&name),
            )),
            Outbound::Broadcast(self.update()),
        ];

        if outcome.round_ended {
            Metrics::round_completed();
        }
        if !outcome.newly_bankrupt.is_empty() {
            Metrics::bankruptcies(outcome.newly_bankrupt.len());
            warn!(players = ?outcome.newly_bankrupt, "Players went bankrupt");
        }
        if !outcome.news.is_empty() {
            out.push(Outbound::Broadcast(ServerEvent::News {
                events: outcome.news.clone(),
            }));
            out.extend(outcome.news.iter().filter(|l| !l.is_empty()).map(|line| {
                Outbound::Broadcast(ServerEvent::activity(ActivityKind::News, line.clone(), None))
            }));
        }

        out.extend(self.game_over(&outcome));
        out
    }

    fn game_over(&mut self, outcome: &TurnOutcome) -> Vec<Outbound> {
        let (winners, label) = if outcome.all_bankrupt {
            (vec![ALL_BANKRUPT_BANNER.to_string()], "all_bankrupt")
        } else if !outcome.winners.is_empty() {
            (outcome.winners.clone(), "millionaire")
        } else if let Some(last) = &outcome.last_standing {
            (vec![last.clone()], "last_standing")
        } else {
            return Vec::new();
        };

        info!(winners = ?winners, outcome = label, "Game over");
        self.finish(label);

        let mut out: Vec<Outbound> = outcome
            .winners
            .iter()
            .map(|name| Outbound::Broadcast(ServerEvent::Millionaire { name: name.clone() }))
            .collect();
        out.push(Outbound::Broadcast(ServerEvent::GameOver(GameOverPayload {
            winners,
            final_scores: self.engine.final_scores(),
            ended_early: false,
        })));
        out
    }

    fn on_play_again(&mut self, conn: &mut Connection) -> Vec<Outbound> {
        self.engine.reset();
        self.engine.set_settings(self.default_settings);
        self.host = None;
        self.started = false;
        self.finished = false;
        conn.player = None;
        info!("Session reset for a new game");
        vec![Outbound::Broadcast(ServerEvent::GameReset)]
    }
}

fn rejection_reason(err: &TradeError) -> &'static str {
    match err {
        TradeError::Bankrupt => "bankrupt",
        TradeError::Suspended(_) => "suspended",
        TradeError::InsufficientFunds => "insufficient_funds",
        TradeError::NotEnoughShares => "not_enough_shares",
        TradeError::NoLoan | TradeError::InsufficientFundsToRepay => "loan",
        TradeError::InvalidAmount(_) => "invalid_amount",
        TradeError::UnknownPlayer(_) => "unknown_player",
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn session() -> GameSession {
        GameSession::new(
            GameEngine::with_seed(GameSettings::default(), 17)
                .with_flash_news_cooldown(Duration::from_secs(3600)),
        )
    }

    fn join(s: &mut GameSession, name: &str) -> Connection {
        let mut conn = Connection::default();
        s.handle(
            &mut conn,
            ClientEvent::Join {
                username: name.to_string(),
            },
        );
        conn
    }

    fn start(s: &mut GameSession, host: &mut Connection) -> Vec<Outbound> {
        s.handle(
            host,
            ClientEvent::StartGame {
                username: None,
                difficulty: Some(2),
                goal: Some(50_000),
            },
        )
    }

    fn replies(out: &[Outbound]) -> Vec<&ServerEvent> {
        out.iter()
            .filter_map(|o| match o {
                Outbound::Reply(e) => Some(e),
                Outbound::Broadcast(_) => None,
            })
            .collect()
    }

    fn has_event(out: &[Outbound], name: &str) -> bool {
        out.iter().any(|o| o.event().name() == name)
    }

    #[test]
    fn test_first_player_becomes_host() {
        let mut s = session();
        let mut conn = Connection::default();
        let out = s.handle(
            &mut conn,
            ClientEvent::Join {
                username: "alice".to_string(),
            },
        );
        assert_eq!(conn.player.as_deref(), Some("ALICE"));
        match out[0].event() {
            ServerEvent::Lobby(lobby) => {
                assert_eq!(lobby.players, ["ALICE"]);
                assert_eq!(lobby.host_player.as_deref(), Some("ALICE"));
            }
            other => panic!("expected lobby, got {other:?}"),
        }

        join(&mut s, "bob");
        assert_eq!(s.host(), Some("ALICE"));
        assert_eq!(s.engine().players(), ["ALICE", "BOB"]);
    }

    #[test]
    fn test_join_rejects_bad_names() {
        let mut s = session();
        let mut conn = Connection::default();
        let out = s.handle(
            &mut conn,
            ClientEvent::Join {
                username: "A_VERY_LONG_PLAYER_NAME".to_string(),
            },
        );
        assert!(matches!(out[0], Outbound::Reply(ServerEvent::Error { .. })));
        assert!(conn.player.is_none());
        assert!(s.host().is_none());
    }

    #[test]
    fn test_only_host_can_start() {
        let mut s = session();
        let mut host = join(&mut s, "ANN");
        let mut guest = join(&mut s, "BOB");

        let out = start(&mut s, &mut guest);
        assert_eq!(
            replies(&out),
            [&ServerEvent::error("Only the host can start the game")]
        );
        assert!(!s.is_started());

        let out = start(&mut s, &mut host);
        assert!(s.is_started());
        assert!(has_event(&out, "update"));
        assert!(out.contains(&Outbound::Broadcast(ServerEvent::News {
            events: vec![GAME_STARTED_NEWS.to_string()]
        })));
        assert_eq!(s.engine().settings().target_value, 50_000);
    }

    #[test]
    fn test_start_rejects_invalid_settings() {
        let mut s = session();
        let mut host = join(&mut s, "ANN");
        let out = s.handle(
            &mut host,
            ClientEvent::StartGame {
                username: None,
                difficulty: Some(9),
                goal: None,
            },
        );
        assert!(matches!(out[0], Outbound::Reply(ServerEvent::Error { .. })));
        assert!(!s.is_started());
    }

    #[test]
    fn test_trade_out_of_turn() {
        let mut s = session();
        let mut host = join(&mut s, "ANN");
        let mut guest = join(&mut s, "BOB");
        start(&mut s, &mut host);

        let out = s.handle(&mut guest, ClientEvent::buy("BOB", Share::Lead, 5));
        assert_eq!(out, [Outbound::Reply(ServerEvent::error("It's not your turn!"))]);
    }

    #[test]
    fn test_trade_before_start() {
        let mut s = session();
        let mut host = join(&mut s, "ANN");
        let out = s.handle(&mut host, ClientEvent::buy("ANN", Share::Lead, 5));
        assert_eq!(
            out,
            [Outbound::Reply(ServerEvent::error("The game has not started yet"))]
        );
    }

    #[test]
    fn test_successful_buy() {
        let mut s = session();
        let mut host = join(&mut s, "ANN");
        start(&mut s, &mut host);

        let out = s.handle(&mut host, ClientEvent::buy("ANN", Share::Zinc, 4));
        assert_eq!(out[0], Outbound::Reply(ServerEvent::message("Bought successfully")));
        assert_eq!(
            out[1],
            Outbound::Broadcast(ServerEvent::activity(
                ActivityKind::Trade,
                "bought 4 ZINC shares",
                Some("ANN")
            ))
        );
        assert!(has_event(&out, "update"));
        // a flash bonus issue may add to the holding
        assert!(s.engine().player("ANN").unwrap().holding(Share::Zinc) >= 4);
    }

    #[test]
    fn test_rejected_trade_is_a_message() {
        let mut s = session();
        let mut host = join(&mut s, "ANN");
        start(&mut s, &mut host);

        let out = s.handle(&mut host, ClientEvent::sell("ANN", Share::Gold, 1));
        assert_eq!(out[0], Outbound::Reply(ServerEvent::message("Not enough shares")));
        assert!(!out.iter().any(|o| matches!(
            o.event(),
            ServerEvent::Activity(a) if a.kind == ActivityKind::Trade
        )));
    }

    #[test]
    fn test_unknown_share() {
        let mut s = session();
        let mut host = join(&mut s, "ANN");
        start(&mut s, &mut host);

        let out = s.handle(
            &mut host,
            ClientEvent::Buy(TradeRequest {
                username: None,
                share: "COPPER".to_string(),
                amount: 1,
            }),
        );
        assert!(matches!(out[0], Outbound::Reply(ServerEvent::Error { .. })));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_end_turn_passes_play() {
        let mut s = session();
        let mut host = join(&mut s, "ANN");
        let mut guest = join(&mut s, "BOB");
        start(&mut s, &mut host);

        // out of turn is silently ignored
        assert!(s
            .handle(&mut guest, ClientEvent::EndTurn { username: None })
            .is_empty());

        let out = s.handle(&mut host, ClientEvent::EndTurn { username: None });
        assert_eq!(
            out[0],
            Outbound::Broadcast(ServerEvent::activity(
                ActivityKind::Turn,
                "ended their turn",
                Some("ANN")
            ))
        );
        assert_eq!(s.engine().current_player(), Some("BOB"));

        // BOB ends the round
        let out = s.handle(&mut guest, ClientEvent::EndTurn { username: None });
        assert_eq!(s.engine().round(), 1);
        assert!(has_event(&out, "update"));
    }

    #[test]
    fn test_repay_loan_activity() {
        let mut s = session();
        let mut host = join(&mut s, "ANN");
        start(&mut s, &mut host);

        let out = s.handle(
            &mut host,
            ClientEvent::RepayLoan {
                username: None,
                amount: None,
            },
        );
        assert_eq!(out[0], Outbound::Reply(ServerEvent::message("No loan to repay")));
        assert!(has_event(&out, "update"));
    }

    fn repay(s: &mut GameSession, conn: &mut Connection, username: Option<&str>) -> Vec<Outbound> {
        s.handle(
            conn,
            ClientEvent::RepayLoan {
                username: username.map(str::to_string),
                amount: None,
            },
        )
    }

    #[test]
    fn test_repay_loan_is_gated_like_trades() {
        let mut s = session();
        let mut host = join(&mut s, "ANN");
        let mut guest = join(&mut s, "BOB");

        let out = repay(&mut s, &mut host, None);
        assert_eq!(
            out,
            [Outbound::Reply(ServerEvent::error("The game has not started yet"))]
        );

        start(&mut s, &mut host);
        let out = repay(&mut s, &mut guest, None);
        assert_eq!(out, [Outbound::Reply(ServerEvent::error("It's not your turn!"))]);
    }

    #[test]
    fn test_payload_username_is_not_trusted() {
        let mut s = session();
        let mut host = join(&mut s, "ANN");
        start(&mut s, &mut host);

        let mut stranger = Connection::default();
        let out = repay(&mut s, &mut stranger, Some("ANN"));
        assert_eq!(out, [Outbound::Reply(ServerEvent::error("Join the game first"))]);

        let out = s.handle(
            &mut stranger,
            ClientEvent::Buy(TradeRequest {
                username: Some("ANN".to_string()),
                share: "LEAD".to_string(),
                amount: 1,
            }),
        );
        assert_eq!(out, [Outbound::Reply(ServerEvent::error("Join the game first"))]);
        assert_eq!(s.engine().player("ANN").unwrap().balance, 1000);
    }

    #[test]
    fn test_request_update_is_private() {
        let mut s = session();
        let mut conn = Connection::default();
        let out = s.handle(&mut conn, ClientEvent::RequestUpdate);
        assert!(matches!(out[..], [Outbound::Reply(ServerEvent::Update(_))]));
    }

    #[test]
    fn test_final_scores_need_players() {
        let mut s = session();
        let mut conn = Connection::default();
        let out = s.handle(&mut conn, ClientEvent::GetFinalScores);
        assert_eq!(out, [Outbound::Reply(ServerEvent::error("No game in progress"))]);

        let mut host = join(&mut s, "ANN");
        let out = s.handle(&mut host, ClientEvent::GetFinalScores);
        assert!(matches!(
            &out[..],
            [Outbound::Broadcast(ServerEvent::FinalScores { scores })] if scores.len() == 1
        ));
    }

    #[test]
    fn test_end_game_early() {
        let mut s = session();
        let mut host = join(&mut s, "ANN");
        start(&mut s, &mut host);

        let out = s.handle(&mut host, ClientEvent::AskEndGame);
        assert_eq!(out, [Outbound::Broadcast(ServerEvent::AskEndGamePrompt)]);

        let out = s.handle(&mut host, ClientEvent::EndGameResponse { end_game: false });
        assert!(has_event(&out, "update"));

        let out = s.handle(&mut host, ClientEvent::EndGameResponse { end_game: true });
        match out[0].event() {
            ServerEvent::GameOver(over) => {
                assert!(over.ended_early);
                assert!(over.winners.is_empty());
                assert_eq!(over.final_scores.len(), 1);
            }
            other => panic!("expected game_over, got {other:?}"),
        }

        let out = s.handle(&mut host, ClientEvent::buy("ANN", Share::Lead, 1));
        assert_eq!(out, [Outbound::Reply(ServerEvent::error("The game is over"))]);
    }

    #[test]
    fn test_play_again_resets_session() {
        let mut s = session();
        let mut host = join(&mut s, "ANN");
        start(&mut s, &mut host);

        let out = s.handle(&mut host, ClientEvent::PlayAgain);
        assert_eq!(out, [Outbound::Broadcast(ServerEvent::GameReset)]);
        assert!(s.host().is_none());
        assert!(!s.is_started());
        assert!(s.engine().players().is_empty());
        assert_eq!(s.engine().settings(), GameSettings::default());

        join(&mut s, "BOB");
        assert_eq!(s.host(), Some("BOB"));
    }

    #[test]
    fn test_millionaire_ends_game() {
        let mut s = session();
        let mut host = join(&mut s, "ANN");
        let mut guest = join(&mut s, "BOB");
        s.handle(
            &mut host,
            ClientEvent::StartGame {
                username: None,
                difficulty: None,
                goal: Some(1_000),
            },
        );

        // both players already hold the goal in cash
        let out = s.handle(&mut host, ClientEvent::EndTurn { username: None });
        for name in ["ANN", "BOB"] {
            assert!(out.contains(&Outbound::Broadcast(ServerEvent::Millionaire {
                name: name.to_string()
            })));
        }
        match out.last().map(Outbound::event) {
            Some(ServerEvent::GameOver(over)) => {
                assert_eq!(over.winners, ["ANN", "BOB"]);
                assert!(!over.ended_early);
            }
            other => panic!("expected game_over, got {other:?}"),
        }

        let out = s.handle(&mut guest, ClientEvent::EndTurn { username: None });
        assert!(out.is_empty());
    }

    #[test]
    fn test_quote_and_search() {
        let s = session();
        let q = s.quote("gold").unwrap();
        assert_eq!(q.symbol, "GOLD");
        assert_eq!(q.price, 1250);
        assert!(s.quote("COPPER").is_none());

        let found: Vec<_> = s.search("hold").into_iter().map(|q| q.symbol).collect();
        assert_eq!(found, ["TIN"]);
        assert_eq!(s.search("").len(), 4);
        assert!(s.search("xyz").is_empty());
    }
}
