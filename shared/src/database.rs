//! PostgreSQL pool setup for the row store

use crate::{config::DatabaseConfig, error::AppError, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::info;

/// Table holding every sheet row as a JSON array of cells.
pub const SHEET_ROWS_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS sheet_rows (
    id          BIGSERIAL PRIMARY KEY,
    table_name  TEXT NOT NULL,
    cells       JSONB NOT NULL
);
CREATE INDEX IF NOT EXISTS sheet_rows_table_idx ON sheet_rows (table_name, id);
"#;

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pool: PgPool,
}

impl DatabaseService {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| AppError::configuration("DATABASE_URL is not set"))?;

        info!("Initializing database connection pool");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect(url)
            .await
            .map_err(|e| {
                AppError::configuration(format!("Failed to connect to database: {}", e))
            })?;

        // Test the connection
        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(|e| AppError::service_unavailable(format!("database health check: {}", e)))?;

        sqlx::raw_sql(SHEET_ROWS_DDL).execute(&pool).await?;

        info!("Database connection pool initialized successfully");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
