//! Process wiring shared by both binaries: store selection, state assembly, serving.

use std::sync::Arc;

use anyhow::Context;

use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::mail::SmtpMailer;
use crate::state::AppState;
use crate::store::{MemoryStore, PgStore, Store};

/// Connects to PostgreSQL and makes sure the schema exists.
pub async fn postgres_store(config: &AppConfig) -> anyhow::Result<Arc<dyn Store>> {
    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    DatabaseManager::ensure_schema(&pool)
        .await
        .context("failed to apply database schema")?;
    Ok(Arc::new(PgStore::new(pool)))
}

/// Process-local store; contents are lost on exit.
pub fn memory_store() -> Arc<dyn Store> {
    tracing::warn!("Using in-memory store, data will not persist");
    Arc::new(MemoryStore::new())
}

pub fn build_state(config: AppConfig, store: Arc<dyn Store>) -> anyhow::Result<AppState> {
    let geocoder = crate::geo::from_config(&config.geocoder).context("failed to configure geocoder")?;
    let mailer = Arc::new(SmtpMailer::new(config.smtp.clone()));
    Ok(AppState::new(config, store, geocoder, mailer))
}

/// Binds the configured port and serves until the process is stopped.
pub async fn run(state: AppState) -> anyhow::Result<()> {
    let bind_addr = format!("0.0.0.0:{}", state.config.server.port);
    let environment = state.config.environment;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("DevCamper API running in {:?} mode on http://{}", environment, bind_addr);

    axum::serve(listener, crate::app(state)).await.context("server error")?;
    Ok(())
}
