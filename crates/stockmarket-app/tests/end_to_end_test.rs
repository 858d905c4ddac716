//! End-to-end: the server application with real terminal front-ends.
//!
//! Boots `Application` on an ephemeral port, drives a HUD player and a
//! log-view player through joining, starting and trading, and reads a
//! quote back through the watchlist client.

use std::sync::Arc;
use std::time::Duration;

use stockmarket_app::{AppConfig, Application};
use stockmarket_client::terminal::apply_effects;
use stockmarket_client::{
    ConnectionConfig, ConnectionEvent, FrontEnd, GameConnection, GameSender, Hud, HudMode,
    LogState, LogView, QuoteClient,
};
use stockmarket_core::ServerEvent;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

struct Player {
    connection: Arc<GameConnection>,
    sender: GameSender,
    events: mpsc::Receiver<ConnectionEvent>,
}

impl Player {
    async fn connect(url: String) -> Self {
        let (event_tx, events) = mpsc::channel(256);
        let connection = Arc::new(GameConnection::new(
            ConnectionConfig {
                url,
                ..ConnectionConfig::default()
            },
            event_tx,
        ));
        let runner = connection.clone();
        tokio::spawn(async move { runner.run().await });
        let sender = connection.sender();

        let mut player = Self {
            connection,
            sender,
            events,
        };
        let first = player.next().await;
        assert_eq!(first, ConnectionEvent::Connected);
        player
    }

    async fn next(&mut self) -> ConnectionEvent {
        timeout(Duration::from_secs(3), self.events.recv())
            .await
            .expect("timed out waiting for server")
            .expect("connection closed")
    }

    async fn input<F: FrontEnd>(&self, frontend: &mut F, line: &str) {
        apply_effects(&self.sender, frontend.on_input(line)).await;
    }

    /// Feed server events to `frontend` until one satisfies `pred`.
    async fn pump_until<F, P>(&mut self, frontend: &mut F, mut pred: P) -> ServerEvent
    where
        F: FrontEnd,
        P: FnMut(&ServerEvent) -> bool,
    {
        loop {
            if let ConnectionEvent::Server(event) = self.next().await {
                let matched = pred(&event);
                let effects = frontend.on_event(event.clone());
                apply_effects(&self.sender, effects).await;
                if matched {
                    return event;
                }
            }
        }
    }
}

async fn start_server() -> (std::net::SocketAddr, CancellationToken) {
    let mut config = AppConfig::default();
    config.game.seed = Some(7);
    config.server.flash_news_cooldown_ms = 3_600_000;

    let app = Application::new(config).unwrap();
    let shutdown = app.shutdown_token();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(app.serve(listener));
    (addr, shutdown)
}

#[tokio::test]
async fn test_hud_and_log_players_share_a_game() {
    let (addr, shutdown) = start_server().await;
    let ws_url = format!("ws://{addr}/ws");

    // ANN plays on the HUD and becomes host
    let mut ann = Player::connect(ws_url.clone()).await;
    let mut hud = Hud::new();
    ann.input(&mut hud, "").await;
    ann.input(&mut hud, "ann").await;
    ann.pump_until(&mut hud, |e| {
        matches!(e, ServerEvent::Lobby(l) if l.players.iter().any(|p| p == "ANN"))
    })
    .await;
    assert_eq!(hud.mode(), HudMode::HostLobby);

    // BOB plays on the log view
    let mut bob = Player::connect(ws_url).await;
    let mut log = LogView::new();
    bob.pump_until(&mut log, |e| matches!(e, ServerEvent::Lobby(_)))
        .await;
    assert_eq!(log.state(), LogState::Login);
    bob.input(&mut log, "bob").await;
    bob.pump_until(&mut log, |e| {
        matches!(e, ServerEvent::Lobby(l) if l.players.len() == 2)
    })
    .await;
    assert_eq!(log.state(), LogState::Lobby);

    ann.input(&mut hud, "START").await;
    ann.pump_until(&mut hud, |e| matches!(e, ServerEvent::Update(_)))
        .await;
    assert_eq!(hud.mode(), HudMode::Action);
    assert!(hud.snapshot().is_turn_of("ANN"));

    bob.pump_until(&mut log, |e| matches!(e, ServerEvent::Update(_)))
        .await;
    assert_eq!(log.state(), LogState::Game);

    // out of turn: rejected before anything is sent
    assert!(log.on_input("BUY GOLD 1").is_empty());

    ann.input(&mut hud, "BT2").await;
    let reply = ann
        .pump_until(&mut hud, |e| matches!(e, ServerEvent::Message { .. }))
        .await;
    assert_eq!(reply, ServerEvent::message("Bought successfully"));

    let quotes = QuoteClient::new(format!("http://{addr}")).unwrap();
    let tin = quotes.fetch_quote("tin").await.unwrap();
    assert_eq!(tin.symbol, "TIN");
    assert_eq!(tin.volume, 2);

    ann.input(&mut hud, "Q").await;
    bob.pump_until(&mut log, |e| {
        matches!(e, ServerEvent::Update(s) if s.current_player.as_deref() == Some("BOB"))
    })
    .await;
    assert_eq!(log.on_input("BUY LEAD 1").len(), 1);

    ann.connection.shutdown();
    bob.connection.shutdown();
    shutdown.cancel();
}

#[tokio::test]
async fn test_unknown_quote_is_not_found() {
    let (addr, shutdown) = start_server().await;
    let quotes = QuoteClient::new(format!("http://{addr}")).unwrap();

    let err = quotes.fetch_quote("AAPL").await.unwrap_err();
    assert!(matches!(err, stockmarket_client::ClientError::NotFound(_)));

    let hits = quotes.search("ld").await.unwrap();
    let symbols: Vec<_> = hits.iter().map(|q| q.symbol.as_str()).collect();
    assert_eq!(symbols, ["TIN", "GOLD"]);
    shutdown.cancel();
}
