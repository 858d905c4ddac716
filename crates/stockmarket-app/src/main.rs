//! STOCKMARKET 1982 game server - Entry Point

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// STOCKMARKET 1982 multiplayer game server
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via STOCKMARKET_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Listen port, overriding the configuration file
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config first: it may carry the log level
    let (mut config, source) = stockmarket_app::AppConfig::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    stockmarket_telemetry::init_logging(config.telemetry.log_level.as_deref())?;

    info!("Starting STOCKMARKET 1982 server v{}", env!("CARGO_PKG_VERSION"));
    info!(%source, port = config.server.port, "Configuration loaded");

    let app = stockmarket_app::Application::new(config)?;
    app.run().await?;

    Ok(())
}
