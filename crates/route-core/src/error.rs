//! Error type shared by the routing core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid coordinate ({lon}, {lat})")]
    InvalidCoordinate { lon: f64, lat: f64 },

    #[error("map is not ready for queries")]
    MapUnavailable,

    #[error("map query failed: {0}")]
    Query(String),

    #[error("node {0} not found in road graph")]
    NodeNotFound(String),

    #[error("graph store error: {0}")]
    Store(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type CoreResult<T> = Result<T, RouteError>;
