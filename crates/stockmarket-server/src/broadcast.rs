//! Fan-out of server events to every connected WebSocket client.
//!
//! Events are serialized once and pushed into a `tokio::sync::broadcast`
//! channel; each connection task forwards what it receives to its socket.

use stockmarket_core::ServerEvent;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Serialized-event broadcaster shared by all connections.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<String>,
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Send one event to every subscriber.
    pub fn send(&self, event: &ServerEvent) {
        let json = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                debug!(error = %e, event = event.name(), "Failed to serialize event");
                return;
            }
        };

        match self.tx.send(json) {
            Ok(n) => {
                trace!(receivers = n, event = event.name(), "Broadcast sent");
            }
            Err(_) => {
                // No receivers - normal when nobody is connected
                trace!(event = event.name(), "No WebSocket receivers connected");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_reaches_all_subscribers() {
        let broadcaster = Broadcaster::new(16);
        let mut rx1 = broadcaster.subscribe();
        let mut rx2 = broadcaster.subscribe();
        assert_eq!(broadcaster.receiver_count(), 2);

        broadcaster.send(&ServerEvent::GameReset);

        let expected = r#"{"event":"game_reset"}"#;
        assert_eq!(rx1.recv().await.unwrap(), expected);
        assert_eq!(rx2.recv().await.unwrap(), expected);
    }

    #[test]
    fn test_send_without_receivers_is_harmless() {
        let broadcaster = Broadcaster::new(4);
        broadcaster.send(&ServerEvent::message("nobody listening"));
        assert_eq!(broadcaster.receiver_count(), 0);
    }
}
