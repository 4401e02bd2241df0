//! Application wiring and lifecycle.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};

use cryptorg_engine::{OrderService, TradeEngine};
use cryptorg_exchange::BybitClient;
use cryptorg_server::{create_router, AppState};

use crate::config::Config;
use crate::error::AppResult;

/// The assembled application: exchange client, order service, trade
/// engine and HTTP router, built from one loaded config.
pub struct Application {
    config: Config,
    state: AppState,
}

impl Application {
    pub fn new(config: Config) -> AppResult<Self> {
        let client = BybitClient::new(
            config.bybit.api_key.clone(),
            config.bybit.api_secret.clone(),
            config.bybit.testnet,
        )?;

        let orders = Arc::new(OrderService::new(Arc::new(client)));
        let trades = Arc::new(TradeEngine::new(orders.clone()));
        let state = AppState::new(orders, trades);

        Ok(Self { config, state })
    }

    /// Serve the HTTP API until a shutdown signal arrives.
    pub async fn run(self) -> AppResult<()> {
        let addr = format!("0.0.0.0:{}", self.config.server.port);
        let listener = TcpListener::bind(&addr).await?;

        info!(
            addr = %addr,
            environment = %self.config.base.environment,
            testnet = self.config.bybit.testnet,
            symbol = %self.config.bybit.symbol,
            read_timeout_secs = self.config.server.read_timeout_secs,
            write_timeout_secs = self.config.server.write_timeout_secs,
            idle_timeout_secs = self.config.server.idle_timeout_secs,
            "Cryptorg bot started"
        );

        let router = create_router(self.state);
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Cryptorg bot shut down");
        Ok(())
    }
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install SIGINT handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => error!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
