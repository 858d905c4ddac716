//! Prometheus metrics for the game server.
//!
//! Covers:
//! - Connected clients and rejected connections
//! - Inbound events by name
//! - Trades by side and share, rejected trades by reason
//! - Rounds, bankruptcies and flash news
//! - Current share prices
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration failure
//! means duplicate metric names, which is a programming error that should
//! crash at startup. These panics only happen during static initialization.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_gauge_vec, register_int_gauge, Counter,
    CounterVec, Encoder, GaugeVec, IntGauge, TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Currently connected WebSocket clients.
pub static CONNECTED_CLIENTS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "stockmarket_connected_clients",
        "Currently connected WebSocket clients"
    )
    .unwrap()
});

/// Connections refused because the server was full.
pub static CONNECTIONS_REJECTED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "stockmarket_connections_rejected_total",
        "Connections refused at the connection limit"
    )
    .unwrap()
});

/// Inbound client events.
/// Labels: event (join/buy/sell/end_turn/...)
pub static EVENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "stockmarket_events_total",
        "Inbound client events by name",
        &["event"]
    )
    .unwrap()
});

/// Completed trades.
pub static TRADES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "stockmarket_trades_total",
        "Completed trades",
        &["side", "share"]
    )
    .unwrap()
});

/// Rejected trade attempts.
pub static TRADES_REJECTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "stockmarket_trades_rejected_total",
        "Rejected trade attempts",
        &["reason"]
    )
    .unwrap()
});

/// Rounds completed across all games.
pub static ROUNDS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!("stockmarket_rounds_total", "Rounds completed").unwrap()
});

pub static BANKRUPTCIES_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!("stockmarket_bankruptcies_total", "Players declared bankrupt").unwrap()
});

pub static FLASH_NEWS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "stockmarket_flash_news_total",
        "Flash news bulletins broadcast"
    )
    .unwrap()
});

/// Games finished.
/// Labels: outcome (millionaire/last_standing/all_bankrupt/ended_early)
pub static GAMES_FINISHED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "stockmarket_games_finished_total",
        "Games finished by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Current share price in pounds.
pub static SHARE_PRICE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "stockmarket_share_price",
        "Current share price in pounds",
        &["share"]
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    pub fn client_connected() {
        CONNECTED_CLIENTS.inc();
    }

    pub fn client_disconnected() {
        CONNECTED_CLIENTS.dec();
    }

    pub fn connection_rejected() {
        CONNECTIONS_REJECTED_TOTAL.inc();
    }

    /// Record an inbound client event.
    pub fn event_received(event: &str) {
        EVENTS_TOTAL.with_label_values(&[event]).inc();
    }

    /// Record a completed trade.
    pub fn trade(side: &str, share: &str) {
        TRADES_TOTAL.with_label_values(&[side, share]).inc();
    }

    pub fn trade_rejected(reason: &str) {
        TRADES_REJECTED_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn round_completed() {
        ROUNDS_TOTAL.inc();
    }

    pub fn bankruptcies(count: usize) {
        BANKRUPTCIES_TOTAL.inc_by(count as f64);
    }

    pub fn flash_news() {
        FLASH_NEWS_TOTAL.inc();
    }

    pub fn game_finished(outcome: &str) {
        GAMES_FINISHED_TOTAL.with_label_values(&[outcome]).inc();
    }

    /// Update the price gauge for one share.
    pub fn share_price(share: &str, price: f64) {
        SHARE_PRICE.with_label_values(&[share]).set(price);
    }
}

/// Encode every registered metric in the Prometheus text format.
pub fn gather_metrics() -> TelemetryResult<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
}
