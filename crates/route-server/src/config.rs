//! Server configuration from environment.

use route_core::road_network::RoadNetworkConfig;
use route_core::{PathfinderConfig, TerrainCacheConfig};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    /// GeoJSON FeatureCollection backing terrain and road queries.
    pub dataset_path: String,
    pub database_path: String,
    pub database_max_connections: u32,
    /// Web Mercator zoom used to project coordinates to pixels.
    pub map_zoom: f64,
    pub sample_interval_km: f64,
    pub terrain_cache_ttl_s: u64,
    pub terrain_cache_max_entries: usize,
    pub ready_timeout_ms: u64,
    pub settle_delay_ms: u64,
    pub road_cache_retention_days: u64,
    pub road_snap_km: f64,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server_port: env_or("ROUTE_PORT", 3000),
            dataset_path: env::var("ROUTE_DATASET")
                .unwrap_or_else(|_| "data/world.geojson".to_string()),
            database_path: env::var("ROUTE_DB_PATH")
                .unwrap_or_else(|_| "data/route.db".to_string()),
            database_max_connections: env_or("ROUTE_DB_MAX_CONNECTIONS", 5),
            map_zoom: env_or("ROUTE_MAP_ZOOM", 6.0),
            sample_interval_km: env_or("ROUTE_SAMPLE_INTERVAL_KM", 0.5),
            terrain_cache_ttl_s: env_or("ROUTE_TERRAIN_CACHE_TTL_S", 60),
            terrain_cache_max_entries: env_or("ROUTE_TERRAIN_CACHE_MAX", 1000),
            ready_timeout_ms: env_or("ROUTE_READY_TIMEOUT_MS", 15_000),
            settle_delay_ms: env_or("ROUTE_SETTLE_DELAY_MS", 500),
            road_cache_retention_days: env_or("ROUTE_ROAD_CACHE_DAYS", 7),
            road_snap_km: env_or("ROUTE_ROAD_SNAP_KM", 1.0),
        }
    }

    pub fn pathfinder_config(&self) -> PathfinderConfig {
        PathfinderConfig {
            sample_interval_km: self.sample_interval_km,
            ready_timeout_ms: self.ready_timeout_ms,
            settle_delay_ms: self.settle_delay_ms,
            terrain_cache: TerrainCacheConfig {
                ttl_secs: self.terrain_cache_ttl_s,
                max_entries: self.terrain_cache_max_entries,
                ..TerrainCacheConfig::default()
            },
            ..PathfinderConfig::default()
        }
    }

    pub fn road_network_config(&self) -> RoadNetworkConfig {
        RoadNetworkConfig {
            retention_secs: self.road_cache_retention_days.saturating_mul(24 * 60 * 60),
            ready_timeout_ms: self.ready_timeout_ms,
            ..RoadNetworkConfig::default()
        }
    }
}
