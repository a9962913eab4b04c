//! Key-value storage for serialized road graphs.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::future::Future;

use crate::error::CoreResult;

/// A persisted graph snapshot and the moment it was built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredGraph {
    pub data: String,
    pub built_at: DateTime<Utc>,
}

impl StoredGraph {
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.built_at)
    }
}

pub trait GraphStore: Send + Sync {
    fn get(&self, key: &str) -> impl Future<Output = CoreResult<Option<StoredGraph>>> + Send;

    /// Insert or replace the record under `key`.
    fn put(&self, key: &str, graph: StoredGraph) -> impl Future<Output = CoreResult<()>> + Send;

    fn delete(&self, key: &str) -> impl Future<Output = CoreResult<()>> + Send;
}

/// Process-local store, used in tests and when no database is configured.
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    records: DashMap<String, StoredGraph>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl GraphStore for MemoryGraphStore {
    async fn get(&self, key: &str) -> CoreResult<Option<StoredGraph>> {
        Ok(self.records.get(key).map(|record| record.value().clone()))
    }

    async fn put(&self, key: &str, graph: StoredGraph) -> CoreResult<()> {
        self.records.insert(key.to_string(), graph);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CoreResult<()> {
        self.records.remove(key);
        Ok(())
    }
}
