//! Cryptorg DCA bot - entry point.

mod app;
mod config;
mod error;
mod logging;

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Bybit V5 DCA trading bot.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to an env file loaded before configuration.
    #[arg(short, long)]
    env_file: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(path) = &args.env_file {
        dotenvy::from_path(path)?;
    }

    let config = config::Config::load()?;
    logging::init_logging(&config.base);

    info!("Starting cryptorg-bot v{}", env!("CARGO_PKG_VERSION"));

    let application = app::Application::new(config)?;
    application.run().await?;

    Ok(())
}
