//! WebSocket session integration tests.
//!
//! Boots the server on an ephemeral port and plays through:
//! - Lobby greeting and joining
//! - Host-only game start
//! - Trading and turn rotation across two clients
//! - Connection limit

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use stockmarket_core::{ClientEvent, GameSettings, ServerEvent, Share};
use stockmarket_engine::GameEngine;
use stockmarket_server::{serve, AppState, GameSession, ServerConfig};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestServer {
    addr: std::net::SocketAddr,
    shutdown: CancellationToken,
}

impl TestServer {
    async fn start(config: ServerConfig) -> Self {
        let engine = GameEngine::with_seed(GameSettings::default(), 99)
            .with_flash_news_cooldown(Duration::from_secs(3600));
        let state = AppState::new(GameSession::new(engine).shared(), &config);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        tokio::spawn(async move {
            let _ = serve(listener, state, token).await;
        });

        Self { addr, shutdown }
    }

    fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    async fn connect(&self) -> Client {
        let (ws, _) = connect_async(self.ws_url()).await.unwrap();
        ws
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn send(ws: &mut Client, event: ClientEvent) {
    let json = serde_json::to_string(&event).unwrap();
    ws.send(Message::Text(json.into())).await.unwrap();
}

/// Read events until one matches `pred`, failing after two seconds.
async fn expect<F>(ws: &mut Client, mut pred: F) -> ServerEvent
where
    F: FnMut(&ServerEvent) -> bool,
{
    timeout(Duration::from_secs(2), async {
        loop {
            let msg = ws.next().await.expect("stream ended").expect("ws error");
            if let Message::Text(text) = msg {
                let event: ServerEvent = serde_json::from_str(text.as_str()).unwrap();
                if pred(&event) {
                    return event;
                }
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

fn join(name: &str) -> ClientEvent {
    ClientEvent::Join {
        username: name.to_string(),
    }
}

#[tokio::test]
async fn test_lobby_greeting_and_join() {
    let server = TestServer::start(ServerConfig::default()).await;
    let mut ann = server.connect().await;

    let greeting = expect(&mut ann, |e| matches!(e, ServerEvent::Lobby(_))).await;
    assert!(matches!(greeting, ServerEvent::Lobby(ref l) if l.players.is_empty()));

    send(&mut ann, join("ann")).await;
    let lobby = expect(&mut ann, |e| {
        matches!(e, ServerEvent::Lobby(l) if !l.players.is_empty())
    })
    .await;
    match lobby {
        ServerEvent::Lobby(l) => {
            assert_eq!(l.players, ["ANN"]);
            assert_eq!(l.host_player.as_deref(), Some("ANN"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_two_player_game_flow() {
    let server = TestServer::start(ServerConfig::default()).await;
    let mut ann = server.connect().await;
    let mut bob = server.connect().await;

    send(&mut ann, join("ANN")).await;
    expect(&mut ann, |e| matches!(e, ServerEvent::Lobby(l) if l.players.len() == 1)).await;
    send(&mut bob, join("BOB")).await;
    expect(&mut ann, |e| matches!(e, ServerEvent::Lobby(l) if l.players.len() == 2)).await;

    // guest cannot start
    send(
        &mut bob,
        ClientEvent::StartGame {
            username: None,
            difficulty: None,
            goal: None,
        },
    )
    .await;
    let err = expect(&mut bob, |e| matches!(e, ServerEvent::Error { .. })).await;
    assert_eq!(err, ServerEvent::error("Only the host can start the game"));

    send(
        &mut ann,
        ClientEvent::StartGame {
            username: None,
            difficulty: Some(1),
            goal: Some(20_000),
        },
    )
    .await;
    let news = expect(&mut bob, |e| matches!(e, ServerEvent::News { .. })).await;
    assert_eq!(
        news,
        ServerEvent::News {
            events: vec!["GAME STARTED - GOOD LUCK TRADERS!".to_string()]
        }
    );

    // BOB is not on turn
    send(&mut bob, ClientEvent::buy("BOB", Share::Lead, 1)).await;
    let err = expect(&mut bob, |e| matches!(e, ServerEvent::Error { .. })).await;
    assert_eq!(err, ServerEvent::error("It's not your turn!"));

    // ANN buys; BOB sees the activity
    send(&mut ann, ClientEvent::buy("ANN", Share::Tin, 2)).await;
    let msg = expect(&mut ann, |e| matches!(e, ServerEvent::Message { .. })).await;
    assert_eq!(msg, ServerEvent::message("Bought successfully"));
    let activity = expect(&mut bob, |e| matches!(e, ServerEvent::Activity(_))).await;
    match activity {
        ServerEvent::Activity(a) => {
            assert_eq!(a.message, "bought 2 TIN shares");
            assert_eq!(a.player_name.as_deref(), Some("ANN"));
        }
        other => panic!("unexpected {other:?}"),
    }

    send(&mut ann, ClientEvent::EndTurn { username: None }).await;
    let update = expect(&mut bob, |e| {
        matches!(e, ServerEvent::Update(s) if s.current_player.as_deref() == Some("BOB"))
    })
    .await;
    match update {
        ServerEvent::Update(snapshot) => {
            assert_eq!(snapshot.turn, 2);
            assert_eq!(snapshot.players_list, ["ANN", "BOB"]);
        }
        other => panic!("unexpected {other:?}"),
    }

    // private refresh
    send(&mut bob, ClientEvent::RequestUpdate).await;
    expect(&mut bob, |e| matches!(e, ServerEvent::Update(_))).await;
}

#[tokio::test]
async fn test_malformed_frame_keeps_connection_open() {
    let server = TestServer::start(ServerConfig::default()).await;
    let mut ws = server.connect().await;

    ws.send(Message::Text("{\"event\":\"nope\"}".into()))
        .await
        .unwrap();
    let err = expect(&mut ws, |e| matches!(e, ServerEvent::Error { .. })).await;
    assert!(matches!(err, ServerEvent::Error { message } if message.starts_with("Invalid message")));

    send(&mut ws, ClientEvent::RefreshLobby).await;
    expect(&mut ws, |e| matches!(e, ServerEvent::Lobby(_))).await;
}

#[tokio::test]
async fn test_connection_limit() {
    let config = ServerConfig {
        max_connections: 1,
        ..ServerConfig::default()
    };
    let server = TestServer::start(config).await;
    let mut first = server.connect().await;
    expect(&mut first, |e| matches!(e, ServerEvent::Lobby(_))).await;

    let second = connect_async(server.ws_url()).await;
    assert!(second.is_err(), "second connection should be refused");
}

#[tokio::test]
async fn test_rest_quote() {
    let server = TestServer::start(ServerConfig::default()).await;
    let mut stream = TcpStream::connect(server.addr).await.unwrap();

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    stream
        .write_all(b"GET /api/stock/GOLD HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains(r#""symbol":"GOLD""#));
    assert!(response.contains(r#""name":"Gold Fields""#));
}
