pub mod config;
pub mod operations;
pub mod schema;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use thiserror::Error;

use crate::db::config::DbConfig;

#[derive(Clone)]
pub struct DatabaseProxy {
    pool: SqlitePool,
}

impl DatabaseProxy {
    pub async fn from_env() -> Result<Self, DbInitError> {
        Self::connect(&DbConfig::from_env()).await
    }

    pub async fn connect(config: &DbConfig) -> Result<Self, DbInitError> {
        let options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(DbInitError::Sqlx)?
            .create_if_missing(true)
            .journal_mode(config.journal_mode.to_sqlx())
            .foreign_keys(config.foreign_keys)
            .busy_timeout(config.busy_timeout);

        // An in-memory database lives and dies with its single connection.
        let pool_options = if config.is_in_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(config.max_connections)
        };

        let pool = pool_options
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await?;

        schema::run_migrations(&pool).await?;

        tracing::info!(url = %config.database_url, "database ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// One unit of work. Every core operation runs against a transaction
    /// begun here and is committed by the caller.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        self.pool.begin().await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[derive(Debug, Error)]
pub enum DbInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}
