use anyhow::Result;
use clap::Parser;
use tracing::info;

mod analytics;
mod config;
mod db;

use analytics::predictor::Predictor;
use config::Config;
use db::Database;

fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);

    let predictor = Predictor::load(&config.model_path)?;
    info!("Predictor artifact loaded: {}", config.model_path);

    analytics::run(&db, &config, &predictor)?;
    info!("Pipeline finished");

    Ok(())
}
