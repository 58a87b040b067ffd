use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, Executor, PgPool};
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

/// Errors from DatabaseManager
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Owns connection setup and schema bootstrap for the PostgreSQL store.
pub struct DatabaseManager;

impl DatabaseManager {
    /// Opens a pool using the configured URL and limits.
    pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let url = config.url.as_deref().ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;
        let parsed = url::Url::parse(url).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!(
            "Connected to database {} on {}",
            parsed.path().trim_start_matches('/'),
            parsed.host_str().unwrap_or("localhost")
        );
        Ok(pool)
    }

    /// Creates tables and indexes if they do not exist yet.
    pub async fn ensure_schema(pool: &PgPool) -> Result<(), DatabaseError> {
        // Multi-statement script, so it goes through the simple query protocol
        pool.execute(SCHEMA_SQL).await?;
        info!("Database schema verified");
        Ok(())
    }

    pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_requires_a_url() {
        let config = DatabaseConfig { url: None, max_connections: 1, connection_timeout: 1 };
        let err = DatabaseManager::connect(&config).await.unwrap_err();
        assert!(matches!(err, DatabaseError::ConfigMissing("DATABASE_URL")));
    }

    #[tokio::test]
    async fn connect_rejects_malformed_url() {
        let config = DatabaseConfig { url: Some("not a url".into()), max_connections: 1, connection_timeout: 1 };
        let err = DatabaseManager::connect(&config).await.unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidDatabaseUrl));
    }

    #[test]
    fn schema_declares_owner_limit_index() {
        assert!(SCHEMA_SQL.contains("bootcamps_one_per_publisher"));
        assert!(SCHEMA_SQL.contains("ON DELETE CASCADE"));
    }
}
