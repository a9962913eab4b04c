//! Database connection and initialization.

use anyhow::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Path that selects a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// Database connection wrapper.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Initialize the SQLite database.
///
/// Creates the database file if it doesn't exist, runs migrations,
/// and returns a connection pool. `":memory:"` opens a single-connection
/// in-memory database.
pub async fn init_database(db_path: &str, max_connections: u32) -> Result<Database> {
    let (db_url, max_connections) = if db_path == IN_MEMORY {
        ("sqlite::memory:".to_string(), 1)
    } else {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        (format!("sqlite:{}?mode=rwc", db_path), max_connections)
    };

    info!("Connecting to database: {}", db_path);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(&db_url)
        .await?;

    run_migrations(&pool).await?;

    Ok(Database { pool })
}

/// Create the graph cache table if it is missing.
async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(include_str!("../../migrations/001_init.sql"))
        .execute(pool)
        .await?;
    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    #[tokio::test]
    async fn migrations_create_graph_table() {
        let db = init_database(IN_MEMORY, 1).await.expect("init db");
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM sqlite_master WHERE type = 'table' AND name = 'road_graph_cache'",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();
        let count: i64 = row.try_get("n").unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let db = init_database(IN_MEMORY, 1).await.expect("init db");
        run_migrations(db.pool()).await.expect("second run");
    }
}
