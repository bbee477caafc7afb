//! Database connection and schema setup

pub mod sqlite_helpers;

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{info, warn};

use crate::config::Config;
use crate::entity::Entity;

/// Database wrapper providing connection pool access
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database wrapper from an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn pool_options(max_connections: u32) -> SqlitePoolOptions {
        SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
    }

    /// Options for `url`. Every connection registers `REGEXP`, which
    /// search predicates rely on.
    pub fn connect_options(url: &str) -> Result<SqliteConnectOptions> {
        Ok(SqliteConnectOptions::from_str(url)
            .with_context(|| format!("Invalid DATABASE_URL '{}'", url))?
            .create_if_missing(true)
            .foreign_keys(true)
            .with_regexp())
    }

    /// Create a new database connection pool
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = Self::pool_options(max_connections)
            .connect_with(Self::connect_options(url)?)
            .await
            .context("Failed to connect to database")?;

        info!(url = %url, max_connections, "Connected to database");
        Ok(Self { pool })
    }

    /// Connect using the database settings from [`Config`].
    pub async fn from_config(config: &Config) -> Result<Self> {
        Self::connect(&config.database_url, config.database_max_connections).await
    }

    /// Create a new database connection pool with retry logic
    /// Retries every `retry_interval` until successful
    pub async fn connect_with_retry(
        url: &str,
        max_connections: u32,
        retry_interval: Duration,
    ) -> Result<Self> {
        let options = Self::connect_options(url)?;
        loop {
            match Self::pool_options(max_connections)
                .connect_with(options.clone())
                .await
            {
                Ok(pool) => {
                    info!(url = %url, "Connected to database");
                    return Ok(Self { pool });
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        retry_in_secs = retry_interval.as_secs(),
                        "Database connection failed, retrying"
                    );
                    tokio::time::sleep(retry_interval).await;
                }
            }
        }
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the entity's table if it does not exist yet.
    pub async fn ensure_schema<E: Entity>(&self) -> Result<()> {
        ensure_schema::<E>(&self.pool).await
    }
}

/// Create the table for `E` if it does not exist yet.
pub async fn ensure_schema<E: Entity>(pool: &SqlitePool) -> Result<()> {
    let sql = E::create_table_sql();
    tracing::debug!(table = E::TABLE_NAME, sql = %sql, "Ensuring table");

    sqlx::query(&sql)
        .execute(pool)
        .await
        .with_context(|| format!("Failed to create table {}", E::TABLE_NAME))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crudbase.db");
        let url = format!("sqlite://{}", path.display());

        let db = Database::connect(&url, 2).await.unwrap();
        let one: i64 = sqlx::query_scalar("SELECT 1").fetch_one(db.pool()).await.unwrap();

        assert_eq!(one, 1);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_connect_fails_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("missing/crudbase.db").display());

        let err = Database::connect(&url, 1).await.unwrap_err();
        assert!(err.to_string().contains("Failed to connect"));
    }
}
