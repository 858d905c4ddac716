//! HTTP and WebSocket server implementation using axum.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use futures_util::stream::StreamExt;
use futures_util::SinkExt;
use serde_json::json;
use stockmarket_core::{ClientEvent, GameSnapshot, ServerEvent, StockQuote};
use stockmarket_telemetry::{gather_metrics, Metrics};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::broadcast::Broadcaster;
use crate::config::{GameConfig, ServerConfig};
use crate::error::ServerResult;
use crate::session::{Connection, GameSession, Outbound, SharedSession};

/// Connection limiter to prevent too many concurrent WebSocket connections.
pub struct ConnectionLimiter {
    current: AtomicUsize,
    max: usize,
}

impl ConnectionLimiter {
    pub fn new(max: usize) -> Self {
        Self {
            current: AtomicUsize::new(0),
            max,
        }
    }

    /// Take a slot; the slot is released when the guard drops.
    pub fn try_acquire(self: &Arc<Self>) -> Option<ConnectionGuard> {
        loop {
            let current = self.current.load(Ordering::Acquire);
            if current >= self.max {
                return None;
            }
            if self
                .current
                .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Some(ConnectionGuard {
                    limiter: Arc::clone(self),
                });
            }
        }
    }

    pub fn current_count(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }
}

pub struct ConnectionGuard {
    limiter: Arc<ConnectionLimiter>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.limiter.current.fetch_sub(1, Ordering::Release);
    }
}

/// Shared application state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    session: SharedSession,
    broadcaster: Broadcaster,
    connection_limiter: Arc<ConnectionLimiter>,
    max_connections: usize,
}

impl AppState {
    pub fn new(session: SharedSession, config: &ServerConfig) -> Self {
        Self {
            session,
            broadcaster: Broadcaster::new(config.broadcast_capacity),
            connection_limiter: Arc::new(ConnectionLimiter::new(config.max_connections)),
            max_connections: config.max_connections,
        }
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }
}

/// Create the axum router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/snapshot", get(get_snapshot))
        .route("/api/stock/{symbol}", get(get_stock))
        .route("/api/search/{query}", get(search_stocks))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Current game state as JSON.
async fn get_snapshot(State(state): State<AppState>) -> Json<GameSnapshot> {
    Json(state.session.lock().snapshot())
}

/// Quote for one share.
async fn get_stock(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<StockQuote>, Response> {
    let quote = state.session.lock().quote(&symbol);
    quote.map(Json).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("Unknown symbol: {symbol}") })),
        )
            .into_response()
    })
}

/// Quotes matching a symbol or company-name fragment.
async fn search_stocks(
    State(state): State<AppState>,
    Path(query): Path<String>,
) -> Json<Vec<StockQuote>> {
    Json(state.session.lock().search(&query))
}

async fn health() -> &'static str {
    "OK"
}

async fn metrics() -> Response {
    match gather_metrics() {
        Ok(text) => text.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// WebSocket upgrade handler.
async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let guard = match state.connection_limiter.try_acquire() {
        Some(guard) => guard,
        None => {
            warn!(
                current = state.connection_limiter.current_count(),
                max = state.max_connections,
                "WebSocket connection limit reached"
            );
            Metrics::connection_rejected();
            return (StatusCode::SERVICE_UNAVAILABLE, "Too many connections").into_response();
        }
    };

    info!(
        connections = state.connection_limiter.current_count(),
        "New WebSocket connection"
    );

    ws.on_upgrade(move |socket| handle_ws_connection(socket, state, guard))
}

fn encode(event: &ServerEvent) -> Option<String> {
    match serde_json::to_string(event) {
        Ok(json) => Some(json),
        Err(e) => {
            debug!(error = %e, event = event.name(), "Failed to serialize event");
            None
        }
    }
}

/// Decode one text frame, apply it to the session and fan out the results.
///
/// Broadcasts are sent while the session lock is held so every client sees
/// events in the order the session produced them. Returns the serialized
/// replies for the sending connection.
pub fn dispatch(
    session: &SharedSession,
    broadcaster: &Broadcaster,
    conn: &mut Connection,
    text: &str,
) -> Vec<String> {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "Invalid client message");
            return encode(&ServerEvent::error(format!("Invalid message: {e}")))
                .into_iter()
                .collect();
        }
    };

    let outbound = {
        let mut session = session.lock();
        let outbound = session.handle(conn, event);
        for out in &outbound {
            if let Outbound::Broadcast(event) = out {
                broadcaster.send(event);
            }
        }
        outbound
    };

    outbound
        .iter()
        .filter_map(|out| match out {
            Outbound::Reply(event) => encode(event),
            Outbound::Broadcast(_) => None,
        })
        .collect()
}

/// Handle a WebSocket connection.
async fn handle_ws_connection(socket: WebSocket, state: AppState, _guard: ConnectionGuard) {
    Metrics::client_connected();

    let (mut sender, mut receiver) = socket.split();
    let mut broadcast_rx = state.broadcaster.subscribe();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<String>();

    // Greet with the lobby so a fresh client can render immediately
    let lobby = ServerEvent::Lobby(state.session.lock().lobby());
    if let Some(json) = encode(&lobby) {
        if sender.send(Message::Text(json.into())).await.is_err() {
            debug!("Failed to send lobby, client disconnected");
            Metrics::client_disconnected();
            return;
        }
    }

    let session = state.session.clone();
    let broadcaster = state.broadcaster.clone();
    let mut incoming_task = tokio::spawn(async move {
        let mut conn = Connection::default();
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    for reply in dispatch(&session, &broadcaster, &mut conn, text.as_str()) {
                        if reply_tx.send(reply).is_err() {
                            return;
                        }
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("Client sent close frame");
                    break;
                }
                Err(e) => {
                    debug!(error = %e, "WebSocket receive error");
                    break;
                }
                _ => {}
            }
        }
        debug!(player = ?conn.player, "Client stream ended");
    });

    loop {
        tokio::select! {
            result = broadcast_rx.recv() => {
                match result {
                    Ok(msg) => {
                        if sender.send(Message::Text(msg.into())).await.is_err() {
                            debug!("Failed to send broadcast, client disconnected");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "WebSocket client lagged, catching up");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Broadcast channel closed");
                        break;
                    }
                }
            }
            Some(reply) = reply_rx.recv() => {
                if sender.send(Message::Text(reply.into())).await.is_err() {
                    debug!("Failed to send reply, client disconnected");
                    break;
                }
            }
            _ = &mut incoming_task => {
                debug!("Incoming task completed, closing connection");
                break;
            }
        }
    }

    incoming_task.abort();
    Metrics::client_disconnected();
    info!(
        connections = state.connection_limiter.current_count().saturating_sub(1),
        "WebSocket connection closed"
    );
}

/// Serve on an already bound listener until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> ServerResult<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "Stockmarket server listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Stockmarket server stopped");
    Ok(())
}

/// Build the session from configuration, bind and serve.
pub async fn run_server(
    server: ServerConfig,
    game: GameConfig,
    shutdown: CancellationToken,
) -> ServerResult<()> {
    let session = GameSession::from_config(&game, &server)?.shared();
    let state = AppState::new(session, &server);

    let addr = SocketAddr::from(([0, 0, 0, 0], server.port));
    let listener = TcpListener::bind(addr).await?;
    serve(listener, state, shutdown).await
}
