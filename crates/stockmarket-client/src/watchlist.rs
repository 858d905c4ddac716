//! Locally saved watchlist and the REST quote client behind it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::future::join_all;
use reqwest::{Client, StatusCode, Url};
use stockmarket_core::{Share, StockQuote};
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};

/// Default file name for the saved watchlist.
pub const DEFAULT_WATCHLIST_FILE: &str = "watchlist.json";

/// Default timeout for quote requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Ticker symbols the user tracks, persisted as a JSON array.
#[derive(Debug, Clone)]
pub struct Watchlist {
    path: PathBuf,
    symbols: Vec<String>,
}

impl Watchlist {
    /// Load from `path`. A missing file is an empty watchlist.
    pub fn load(path: impl Into<PathBuf>) -> ClientResult<Self> {
        let path = path.into();
        let symbols = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            debug!(path = %path.display(), "No saved watchlist, starting empty");
            Vec::new()
        };
        Ok(Self { path, symbols })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        let symbol = normalise_symbol(symbol);
        self.symbols.iter().any(|s| *s == symbol)
    }

    /// Add `symbol` and save. Returns `false` if it was already present.
    pub fn add(&mut self, symbol: &str) -> ClientResult<bool> {
        let symbol = normalise_symbol(symbol);
        if symbol.is_empty() || self.symbols.contains(&symbol) {
            return Ok(false);
        }
        info!(%symbol, "Adding to watchlist");
        self.symbols.push(symbol);
        self.save()?;
        Ok(true)
    }

    /// Remove `symbol` and save. Returns `false` if it was not present.
    pub fn remove(&mut self, symbol: &str) -> ClientResult<bool> {
        let symbol = normalise_symbol(symbol);
        let before = self.symbols.len();
        self.symbols.retain(|s| *s != symbol);
        if self.symbols.len() == before {
            return Ok(false);
        }
        info!(%symbol, "Removed from watchlist");
        self.save()?;
        Ok(true)
    }

    pub fn save(&self) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.symbols)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

fn normalise_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Symbols shown when nothing has been saved yet: the four board shares.
pub fn market_symbols() -> Vec<String> {
    Share::ALL.iter().map(|s| s.symbol().to_string()).collect()
}

/// Client for the quote endpoints.
pub struct QuoteClient {
    client: Client,
    base_url: String,
}

impl QuoteClient {
    /// # Arguments
    /// * `base_url` - server root, e.g. `http://127.0.0.1:5000`
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Http(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::Http(format!("Invalid base URL {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| ClientError::Http(format!("Base URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Fetch one quote.
    pub async fn fetch_quote(&self, symbol: &str) -> ClientResult<StockQuote> {
        let url = self.endpoint(&["api", "stock", symbol])?;
        debug!(%url, "Fetching quote");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ClientError::Http(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(symbol.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Http(format!("HTTP {status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Http(format!("Failed to parse quote for {symbol}: {e}")))
    }

    /// Fetch all `symbols` concurrently. Failures are logged and skipped;
    /// the rest keep their input order.
    pub async fn fetch_all(&self, symbols: &[String]) -> Vec<StockQuote> {
        let results = join_all(symbols.iter().map(|s| self.fetch_quote(s))).await;

        symbols
            .iter()
            .zip(results)
            .filter_map(|(symbol, result)| match result {
                Ok(quote) => Some(quote),
                Err(e) => {
                    warn!(%symbol, error = %e, "Failed to load quote");
                    None
                }
            })
            .collect()
    }

    /// Quotes whose symbol or company name contains `query`.
    pub async fn search(&self, query: &str) -> ClientResult<Vec<StockQuote>> {
        let url = self.endpoint(&["api", "search", query.trim()])?;
        debug!(%url, "Searching quotes");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ClientError::Http(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Http(format!("HTTP {status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Http(format!("Failed to parse search results: {e}")))
    }
}

/// `1234` -> `1.2K`, `5_600_000` -> `5.6M`.
pub fn format_volume(volume: u64) -> String {
    let v = volume as f64;
    if volume >= 1_000_000_000 {
        format!("{:.1}B", v / 1_000_000_000.0)
    } else if volume >= 1_000_000 {
        format!("{:.1}M", v / 1_000_000.0)
    } else if volume >= 1_000 {
        format!("{:.1}K", v / 1_000.0)
    } else {
        volume.to_string()
    }
}

fn change_icon(quote: &StockQuote) -> char {
    match quote.change {
        c if c > 0 => '▲',
        c if c < 0 => '▼',
        _ => '▬',
    }
}

fn signed_percent(percent: f64) -> String {
    if percent >= 0.0 {
        format!("+{percent:.2}%")
    } else {
        format!("{percent:.2}%")
    }
}

/// Multi-line card for one quote.
pub fn render_card(quote: &StockQuote) -> String {
    let sign = if quote.change >= 0 { "+" } else { "" };
    format!(
        "{} - {}\n  ${}  {} {sign}{} ({})  Vol: {}",
        quote.symbol,
        quote.name,
        quote.price,
        change_icon(quote),
        quote.change,
        signed_percent(quote.change_percent),
        format_volume(quote.volume)
    )
}

/// Compact one-line entry for the saved watchlist.
pub fn render_watchlist_line(quote: &StockQuote) -> String {
    format!(
        "{:<6} ${} ({})",
        quote.symbol,
        quote.price,
        signed_percent(quote.change_percent)
    )
}

/// One line per search hit, or a placeholder when nothing matched.
pub fn render_search_results(results: &[StockQuote]) -> Vec<String> {
    if results.is_empty() {
        return vec!["No results found".to_string()];
    }
    results
        .iter()
        .map(|q| format!("{} - {}", q.symbol, q.name))
        .collect()
}
