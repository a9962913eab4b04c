//! Persistence for the serialized road graph.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use route_core::{CoreResult, GraphStore, RouteError, StoredGraph};
use sqlx::SqlitePool;

#[derive(sqlx::FromRow)]
struct GraphRow {
    data: String,
    built_at: i64,
}

pub async fn load_graph(pool: &SqlitePool, id: &str) -> Result<Option<StoredGraph>> {
    let row = sqlx::query_as::<_, GraphRow>(
        "SELECT data, built_at FROM road_graph_cache WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let built_at = DateTime::<Utc>::from_timestamp_millis(row.built_at)
        .with_context(|| format!("Invalid build timestamp for road graph {}", id))?;
    Ok(Some(StoredGraph {
        data: row.data,
        built_at,
    }))
}

pub async fn upsert_graph(pool: &SqlitePool, id: &str, graph: &StoredGraph) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO road_graph_cache (id, data, built_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(id) DO UPDATE SET data = excluded.data, built_at = excluded.built_at
        "#,
    )
    .bind(id)
    .bind(&graph.data)
    .bind(graph.built_at.timestamp_millis())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_graph(pool: &SqlitePool, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM road_graph_cache WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// [`GraphStore`] over the `road_graph_cache` table.
#[derive(Clone)]
pub struct SqliteGraphStore {
    pool: SqlitePool,
}

impl SqliteGraphStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn store_error(err: anyhow::Error) -> RouteError {
    RouteError::Store(format!("{:#}", err))
}

impl GraphStore for SqliteGraphStore {
    async fn get(&self, key: &str) -> CoreResult<Option<StoredGraph>> {
        load_graph(&self.pool, key).await.map_err(store_error)
    }

    async fn put(&self, key: &str, graph: StoredGraph) -> CoreResult<()> {
        upsert_graph(&self.pool, key, &graph).await.map_err(store_error)
    }

    async fn delete(&self, key: &str) -> CoreResult<()> {
        delete_graph(&self.pool, key).await.map_err(store_error)
    }
}
