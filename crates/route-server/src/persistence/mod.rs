//! Persistence layer for the route server.
//!
//! Provides SQLite-backed storage for the serialized road graph.

pub mod db;
pub mod graph_cache;

pub use db::{init_database, Database};
pub use graph_cache::SqliteGraphStore;
