//! WebSocket connection to the game server.
//!
//! One connection per session: outbound [`ClientEvent`]s are queued through
//! a cloneable [`GameSender`], inbound frames are decoded into
//! [`ServerEvent`]s and forwarded as [`ConnectionEvent`]s. A dropped
//! connection is reported once as [`ConnectionEvent::Lost`] and is not
//! retried, since the server binds the player name to the socket.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use stockmarket_core::{ClientEvent, ServerEvent};
use tokio::sync::{mpsc, Mutex as TokioMutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{ClientError, ClientResult};

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// WebSocket URL, e.g. `ws://127.0.0.1:5000/ws`.
    pub url: String,
    /// Queued outbound events before `send` waits.
    pub outbound_capacity: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:5000/ws".to_string(),
            outbound_capacity: 64,
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// What the connection reports to the front-end.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    Connected,
    Server(ServerEvent),
    Lost { reason: String },
}

/// Cloneable handle for queueing outbound events.
#[derive(Debug, Clone)]
pub struct GameSender {
    tx: mpsc::Sender<ClientEvent>,
    state: Arc<RwLock<ConnectionState>>,
}

impl GameSender {
    /// Queue an event for sending.
    pub async fn send(&self, event: ClientEvent) -> ClientResult<()> {
        let name = event.name();
        self.tx
            .send(event)
            .await
            .map_err(|_| ClientError::SendFailed(format!("connection closed, dropped {name}")))?;
        debug!(event = name, "Event queued");
        Ok(())
    }

    /// Queue an event once `delay` has elapsed.
    pub fn send_after(&self, event: ClientEvent, delay: Duration) -> JoinHandle<()> {
        let sender = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = sender.send(event).await {
                debug!(error = %e, "Delayed send dropped");
            }
        })
    }

    pub fn is_connected(&self) -> bool {
        *self.state.read() == ConnectionState::Connected
    }
}

/// WebSocket connection to a game server.
pub struct GameConnection {
    config: ConnectionConfig,
    state: Arc<RwLock<ConnectionState>>,
    event_tx: mpsc::Sender<ConnectionEvent>,
    outbound_tx: mpsc::Sender<ClientEvent>,
    outbound_rx: TokioMutex<mpsc::Receiver<ClientEvent>>,
    shutdown_token: CancellationToken,
}

impl GameConnection {
    pub fn new(config: ConnectionConfig, event_tx: mpsc::Sender<ConnectionEvent>) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_capacity.max(1));
        Self {
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            event_tx,
            outbound_tx,
            outbound_rx: TokioMutex::new(outbound_rx),
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn sender(&self) -> GameSender {
        GameSender {
            tx: self.outbound_tx.clone(),
            state: self.state.clone(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Close the socket and end [`run`](Self::run) without reporting a loss.
    pub fn shutdown(&self) {
        info!("Connection shutdown requested");
        self.shutdown_token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Connect and pump messages until the socket closes or shutdown.
    pub async fn run(&self) -> ClientResult<()> {
        *self.state.write() = ConnectionState::Connecting;
        let result = self.try_connect().await;
        *self.state.write() = ConnectionState::Disconnected;

        if self.is_shutdown() {
            return Ok(());
        }

        let reason = match &result {
            Ok(()) => "Connection closed by server".to_string(),
            Err(e) => e.to_string(),
        };
        if let Err(e) = &result {
            error!(error = %e, "Game connection failed");
        }
        self.emit(ConnectionEvent::Lost { reason }).await;
        result
    }

    async fn emit(&self, event: ConnectionEvent) {
        if self.event_tx.send(event).await.is_err() {
            warn!("Connection event receiver dropped");
        }
    }

    async fn try_connect(&self) -> ClientResult<()> {
        info!(url = %self.config.url, "Connecting to game server");

        let (ws_stream, _response) = connect_async(self.config.url.as_str())
            .await
            .map_err(|e| ClientError::ConnectionFailed(e.to_string()))?;
        let (mut write, mut read) = ws_stream.split();

        *self.state.write() = ConnectionState::Connected;
        info!("Game server connected");
        self.emit(ConnectionEvent::Connected).await;

        let mut outbound = self.outbound_rx.lock().await;

        loop {
            tokio::select! {
                biased;

                () = self.shutdown_token.cancelled() => {
                    if let Err(e) = write.send(Message::Close(None)).await {
                        warn!(?e, "Failed to send Close frame during shutdown");
                    }
                    return Ok(());
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_text_message(&text).await;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1000, "Normal close".to_string()));
                            warn!(code, %reason, "Game server closed the connection");
                            return Err(ClientError::ConnectionClosed { code, reason });
                        }
                        Some(Err(e)) => {
                            error!(?e, "WebSocket read error");
                            return Err(e.into());
                        }
                        None => {
                            warn!("WebSocket stream ended");
                            return Ok(());
                        }
                        _ => {}
                    }
                }

                event = outbound.recv() => {
                    let Some(event) = event else {
                        debug!("All senders dropped, closing");
                        if let Err(e) = write.send(Message::Close(None)).await {
                            debug!(?e, "Failed to send Close frame");
                        }
                        return Ok(());
                    };
                    let json = serde_json::to_string(&event)?;
                    write.send(Message::Text(json)).await?;
                    debug!(event = event.name(), "Event sent");
                }
            }
        }
    }

    async fn handle_text_message(&self, text: &str) {
        match serde_json::from_str::<ServerEvent>(text) {
            Ok(event) => {
                debug!(event = event.name(), "Event received");
                self.emit(ConnectionEvent::Server(event)).await;
            }
            Err(e) => {
                warn!(error = %e, "Ignoring undecodable server frame");
            }
        }
    }
}
