//! STOCKMARKET 1982 terminal client - Entry Point

use anyhow::Result;
use clap::{Parser, Subcommand};
use stockmarket_app::client::{self, PlayArgs, WatchlistArgs};

/// STOCKMARKET 1982 terminal client
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log filter for stderr output (RUST_LOG wins)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Join a game
    Play(PlayArgs),
    /// Manage the quote watchlist
    Watchlist(WatchlistArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    stockmarket_telemetry::init_client_logging(cli.log_level.as_deref())?;

    match cli.command {
        Command::Play(args) => client::play(args).await?,
        Command::Watchlist(args) => {
            for line in client::watchlist(args).await? {
                println!("{line}");
            }
        }
    }

    Ok(())
}
