//! # Praxis Sim
//!
//! Daily-routine simulation binary. Usage: `praxis-sim [config.json]`.

use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod domain;
mod engine;

use config::SimConfig;
use engine::Engine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = std::env::args().nth(1).map(PathBuf::from);
    let config = SimConfig::load(path.as_deref())?;
    info!("Loaded configuration: {} agents, {} days", config.agents, config.days);

    let engine = Engine::new(config)?;
    let summaries = engine.run().await?;

    println!("{}", serde_json::to_string_pretty(&summaries)?);
    Ok(())
}
