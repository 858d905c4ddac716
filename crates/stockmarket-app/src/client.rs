//! `stockmarket-client` subcommands.

use std::sync::Arc;

use clap::{Args, Subcommand, ValueEnum};
use stockmarket_client::{
    market_symbols, render_card, render_search_results, render_watchlist_line, run_terminal,
    ConnectionConfig, FrontEnd, GameConnection, Hud, LogView, QuoteClient, Watchlist,
    DEFAULT_WATCHLIST_FILE,
};
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::info;

use crate::error::AppResult;

/// Which terminal front-end to play with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum View {
    /// Two-column trading screen with an activity log.
    Hud,
    /// Scrolling command log.
    Log,
}

#[derive(Debug, Args)]
pub struct PlayArgs {
    /// Game server WebSocket URL.
    #[arg(long, default_value = "ws://127.0.0.1:5000/ws")]
    pub url: String,

    #[arg(long, value_enum, default_value_t = View::Hud)]
    pub view: View,
}

#[derive(Debug, Args)]
pub struct WatchlistArgs {
    /// Game server HTTP root.
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    pub server: String,

    /// Watchlist file.
    #[arg(long, default_value = DEFAULT_WATCHLIST_FILE)]
    pub file: String,

    #[command(subcommand)]
    pub command: WatchlistCommand,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum WatchlistCommand {
    /// Show saved symbols with current prices.
    List,
    /// Save a symbol.
    Add { symbol: String },
    /// Forget a symbol.
    Remove { symbol: String },
    /// Find symbols by ticker or company name.
    Search { query: String },
    /// Price cards for every share on the board.
    Market,
}

/// Play one game in the terminal on stdin/stdout.
pub async fn play(args: PlayArgs) -> AppResult<()> {
    info!(url = %args.url, view = ?args.view, "Joining market");
    match args.view {
        View::Hud => play_with(Hud::new(), args.url).await,
        View::Log => play_with(LogView::new(), args.url).await,
    }
}

async fn play_with<F: FrontEnd>(mut frontend: F, url: String) -> AppResult<()> {
    let (event_tx, event_rx) = mpsc::channel(256);
    let connection = Arc::new(GameConnection::new(
        ConnectionConfig {
            url,
            ..ConnectionConfig::default()
        },
        event_tx,
    ));

    let stdin = BufReader::new(tokio::io::stdin());
    run_terminal(&mut frontend, connection, event_rx, stdin, tokio::io::stdout()).await?;
    Ok(())
}

/// Run a watchlist command and return the lines to print.
pub async fn watchlist(args: WatchlistArgs) -> AppResult<Vec<String>> {
    let mut list = Watchlist::load(&args.file)?;

    let lines = match args.command {
        WatchlistCommand::Add { symbol } => {
            if list.add(&symbol)? {
                vec![format!("Added {} to the watchlist", symbol.to_uppercase())]
            } else {
                vec![format!("{} is already on the watchlist", symbol.to_uppercase())]
            }
        }
        WatchlistCommand::Remove { symbol } => {
            if list.remove(&symbol)? {
                vec![format!("Removed {}", symbol.to_uppercase())]
            } else {
                vec![format!("{} is not on the watchlist", symbol.to_uppercase())]
            }
        }
        WatchlistCommand::List => {
            if list.is_empty() {
                vec!["Add stocks to your watchlist".to_string()]
            } else {
                let client = QuoteClient::new(&args.server)?;
                client
                    .fetch_all(list.symbols())
                    .await
                    .iter()
                    .map(render_watchlist_line)
                    .collect()
            }
        }
        WatchlistCommand::Search { query } => {
            let client = QuoteClient::new(&args.server)?;
            render_search_results(&client.search(&query).await?)
        }
        WatchlistCommand::Market => {
            let client = QuoteClient::new(&args.server)?;
            client
                .fetch_all(&market_symbols())
                .await
                .iter()
                .map(render_card)
                .collect()
        }
    };
    Ok(lines)
}
