//! Database layer for the dreams manager service.
//!
//! Provides SQLite connection pooling and a schema-less document store:
//! named collections of JSON records with per-collection integer ids.

mod counters;
mod documents;
mod filter;
mod pool;
mod store;

pub use counters::*;
pub use documents::*;
pub use pool::*;
pub use store::RecordStore;

use crate::Result;
use tracing::info;

/// Type alias for the SQLite connection pool.
pub type DbPool = sqlx::SqlitePool;

/// Initialize the database connection pool with default settings.
pub async fn init_pool(path: &str) -> Result<DbPool> {
    let config = PoolConfig {
        max_connections: crate::config().database.max_connections,
        ..PoolConfig::default()
    };
    let pool = create_pool_with_config(path, config).await?;

    info!("Database pool initialized: {}", path);

    Ok(pool)
}

/// Initialize the database schema.
///
/// Applies the complete schema from schema.sql. Uses IF NOT EXISTS
/// clauses so it's safe to run multiple times.
pub async fn initialize_schema(pool: &DbPool) -> Result<()> {
    let schema = include_str!("../../schema.sql");

    info!("Initializing database schema");

    // Split by semicolons and execute each statement
    for statement in schema.split(';') {
        // Strip comment lines, keeping only actual SQL
        let clean_stmt: String = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let clean_stmt = clean_stmt.trim();
        if clean_stmt.is_empty() {
            continue;
        }
        sqlx::query(clean_stmt).execute(pool).await?;
    }

    info!("Database schema initialized successfully");

    Ok(())
}
