use anyhow::Context;
use tracing_subscriber::EnvFilter;

use devcamper_api::config::AppConfig;
use devcamper_api::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let store = server::postgres_store(&config).await?;
    let state = server::build_state(config, store)?;

    server::run(state).await
}
