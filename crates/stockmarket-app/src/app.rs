//! Server application: owns the configuration and the shutdown signal.

use std::net::SocketAddr;

use stockmarket_server::{serve, AppState, GameSession};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::AppResult;

/// The game server process.
pub struct Application {
    config: AppConfig,
    shutdown: CancellationToken,
}

impl Application {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Token that stops the server when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Bind the configured port and serve until Ctrl-C.
    pub async fn run(self) -> AppResult<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.server.port));
        let listener = TcpListener::bind(addr).await?;

        let token = self.shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutdown signal received"),
                Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
            }
            token.cancel();
        });

        self.serve(listener).await
    }

    /// Serve on an already bound listener until the shutdown token fires.
    pub async fn serve(self, listener: TcpListener) -> AppResult<()> {
        let session = GameSession::from_config(&self.config.game, &self.config.server)?;
        info!(
            difficulty = self.config.game.difficulty,
            target_value = self.config.game.target_value,
            seeded = self.config.game.seed.is_some(),
            "Game session created"
        );

        let state = AppState::new(session.shared(), &self.config.server);
        serve(listener, state, self.shutdown).await?;

        info!("Shutting down");
        Ok(())
    }
}
