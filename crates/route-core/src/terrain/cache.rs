//! Bounded, TTL-based cache of terrain classifications.
//!
//! Entries are keyed by coordinates rounded to four decimals (~11 m). An
//! insertion-ordered index doubles as the age order, so expiry and size
//! eviction both pop from its front.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use crate::models::{Coordinate, TerrainCategory};

const KEY_SCALE: f64 = 10_000.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainCacheConfig {
    pub ttl_secs: u64,
    pub max_entries: usize,
    /// Fraction of `max_entries` above which a lookup miss triggers a purge.
    pub soft_limit_ratio: f64,
}

impl Default for TerrainCacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 60,
            max_entries: 1000,
            soft_limit_ratio: 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    lon_e4: i64,
    lat_e4: i64,
}

impl CacheKey {
    pub fn for_coordinate(coordinate: Coordinate) -> Self {
        Self {
            lon_e4: (coordinate.lon * KEY_SCALE).round() as i64,
            lat_e4: (coordinate.lat * KEY_SCALE).round() as i64,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TerrainCacheEntry {
    pub coordinate: Coordinate,
    pub category: TerrainCategory,
    pub cached_at: Instant,
}

#[derive(Debug)]
pub struct TerrainCache {
    entries: HashMap<CacheKey, TerrainCacheEntry>,
    order: VecDeque<(Instant, CacheKey)>,
    ttl: Duration,
    max_entries: usize,
    soft_limit: usize,
}

impl TerrainCache {
    pub fn new(config: &TerrainCacheConfig) -> Self {
        let max_entries = config.max_entries.max(1);
        let soft_limit = ((max_entries as f64) * config.soft_limit_ratio.clamp(0.0, 1.0)) as usize;
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            ttl: Duration::from_secs(config.ttl_secs),
            max_entries,
            soft_limit,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn is_over_soft_limit(&self) -> bool {
        self.entries.len() > self.soft_limit
    }

    /// Fresh category for `key`, if any.
    pub fn get(&self, key: &CacheKey, now: Instant) -> Option<TerrainCategory> {
        let entry = self.entries.get(key)?;
        if now.saturating_duration_since(entry.cached_at) < self.ttl {
            Some(entry.category)
        } else {
            None
        }
    }

    pub fn insert(&mut self, coordinate: Coordinate, category: TerrainCategory, now: Instant) {
        let key = CacheKey::for_coordinate(coordinate);
        self.entries.insert(
            key,
            TerrainCacheEntry {
                coordinate,
                category,
                cached_at: now,
            },
        );
        self.order.push_back((now, key));
        if self.entries.len() > self.max_entries {
            self.prune(now);
        }
        if self.order.len() > 2 * self.max_entries {
            self.compact();
        }
    }

    /// Drop index slots left behind by re-inserted keys.
    fn compact(&mut self) {
        let entries = &self.entries;
        self.order.retain(|(cached_at, key)| {
            entries
                .get(key)
                .is_some_and(|entry| entry.cached_at == *cached_at)
        });
    }

    /// Drop expired entries, then the oldest ones until within `max_entries`.
    pub fn prune(&mut self, now: Instant) {
        while let Some(&(cached_at, key)) = self.order.front() {
            let expired = now.saturating_duration_since(cached_at) >= self.ttl;
            let over_limit = self.entries.len() > self.max_entries;
            if !expired && !over_limit {
                break;
            }
            self.order.pop_front();
            // A re-inserted key leaves a stale index slot behind; only the
            // slot matching the live entry may evict it.
            let is_current = self
                .entries
                .get(&key)
                .is_some_and(|entry| entry.cached_at == cached_at);
            if is_current {
                self.entries.remove(&key);
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}
