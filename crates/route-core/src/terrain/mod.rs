//! Per-coordinate terrain classification with caching and fallbacks.
//!
//! Lookup order for a coordinate:
//! 1. fresh cache entry,
//! 2. rendered features under the projected point,
//! 3. source features of the terrain layer (then of every layer) whose
//!    bounding box contains the coordinate,
//! 4. the coordinate-only fallback heuristic.
//!
//! Every resolved answer is cached, fallback answers included.

pub mod cache;
pub mod fallback;
pub mod strategies;

use serde::Serialize;
use std::time::Instant;

use crate::error::CoreResult;
use crate::map::{MapFeature, MapQuery};
use crate::models::{Coordinate, TerrainCategory};

pub use cache::{CacheKey, TerrainCache, TerrainCacheConfig};
pub use fallback::{FallbackClassifier, Region, RegionFallback};
pub use strategies::{default_strategies, FeatureStrategy};

/// Source layer holding the terrain polygons.
pub const TERRAIN_SOURCE_LAYER: &str = "geometry";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassifierStats {
    pub cache_hits: u64,
    pub live_queries: u64,
    pub fallbacks: u64,
}

pub struct TerrainClassifier {
    cache: TerrainCache,
    strategies: Vec<Box<dyn FeatureStrategy>>,
    fallback: Box<dyn FallbackClassifier>,
    terrain_source_layer: String,
    stats: ClassifierStats,
}

impl Default for TerrainClassifier {
    fn default() -> Self {
        Self::new(&TerrainCacheConfig::default())
    }
}

impl TerrainClassifier {
    pub fn new(config: &TerrainCacheConfig) -> Self {
        Self {
            cache: TerrainCache::new(config),
            strategies: default_strategies(),
            fallback: Box::new(RegionFallback::default()),
            terrain_source_layer: TERRAIN_SOURCE_LAYER.to_string(),
            stats: ClassifierStats::default(),
        }
    }

    pub fn with_strategies(mut self, strategies: Vec<Box<dyn FeatureStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn with_fallback(mut self, fallback: Box<dyn FallbackClassifier>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_terrain_source_layer(mut self, layer: impl Into<String>) -> Self {
        self.terrain_source_layer = layer.into();
        self
    }

    pub fn stats(&self) -> ClassifierStats {
        self.stats
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Classify `coordinate`. Never fails; degrades to the fallback heuristic.
    pub fn classify<M: MapQuery + ?Sized>(
        &mut self,
        map: &M,
        coordinate: Coordinate,
    ) -> TerrainCategory {
        self.classify_at(map, coordinate, Instant::now())
    }

    pub fn classify_at<M: MapQuery + ?Sized>(
        &mut self,
        map: &M,
        coordinate: Coordinate,
        now: Instant,
    ) -> TerrainCategory {
        let key = CacheKey::for_coordinate(coordinate);
        if let Some(category) = self.cache.get(&key, now) {
            self.stats.cache_hits += 1;
            return category;
        }

        if self.cache.is_over_soft_limit() {
            self.cache.prune(now);
        }

        let category = if map.is_ready() {
            self.stats.live_queries += 1;
            match self.query_live(map, coordinate) {
                Ok(category) if category.is_known() => category,
                Ok(_) => {
                    tracing::debug!("No informative features at {}, using fallback", coordinate);
                    self.fallback_category(coordinate)
                }
                Err(err) => {
                    tracing::warn!("Terrain query failed at {}: {}", coordinate, err);
                    self.fallback_category(coordinate)
                }
            }
        } else {
            tracing::warn!("Map not ready during terrain query at {}, using fallback", coordinate);
            self.fallback_category(coordinate)
        };

        self.cache.insert(coordinate, category, now);
        category
    }

    /// Heuristic answer without touching the map or the cache.
    pub fn classify_fallback(&self, coordinate: Coordinate) -> TerrainCategory {
        self.fallback.classify(coordinate)
    }

    /// Run the strategy chain over candidate features, in order.
    pub fn classify_features(&self, features: &[MapFeature]) -> TerrainCategory {
        for feature in features {
            for strategy in &self.strategies {
                let category = strategy.classify(feature);
                if category.is_known() {
                    tracing::trace!("Terrain {} from {} strategy", category, strategy.name());
                    return category;
                }
            }
        }
        TerrainCategory::Unknown
    }

    fn fallback_category(&mut self, coordinate: Coordinate) -> TerrainCategory {
        self.stats.fallbacks += 1;
        self.fallback.classify(coordinate)
    }

    fn query_live<M: MapQuery + ?Sized>(
        &self,
        map: &M,
        coordinate: Coordinate,
    ) -> CoreResult<TerrainCategory> {
        let point = map.project(coordinate)?;
        let rendered = map.query_features_at(point)?;
        let category = self.classify_features(&rendered);
        if category.is_known() {
            return Ok(category);
        }

        // Source features are unfiltered; keep the ones around the coordinate.
        for layer in [Some(self.terrain_source_layer.as_str()), None] {
            let features = match map.query_all_features(layer) {
                Ok(features) => features,
                Err(err) => {
                    tracing::warn!("Source feature query ({:?}) failed: {}", layer, err);
                    continue;
                }
            };
            let candidates: Vec<MapFeature> = features
                .into_iter()
                .filter(|feature| {
                    feature
                        .geometry
                        .as_ref()
                        .is_some_and(|geometry| geometry.bbox_contains(coordinate))
                })
                .collect();
            if candidates.is_empty() {
                continue;
            }
            let category = self.classify_features(&candidates);
            if category.is_known() {
                return Ok(category);
            }
        }

        Ok(TerrainCategory::Unknown)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory map used by the classifier and pathfinder tests.

    use super::*;
    use crate::error::RouteError;
    use crate::map::{BoundingBox, ScreenPoint};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    type TerrainFn = Box<dyn Fn(Coordinate) -> Option<MapFeature> + Send + Sync>;

    pub struct FakeMap {
        pub ready: AtomicBool,
        pub fail_queries: AtomicBool,
        pub rendered_queries: AtomicUsize,
        pub fits: AtomicUsize,
        pub source_features: Vec<MapFeature>,
        terrain: TerrainFn,
    }

    impl FakeMap {
        pub fn new(terrain: impl Fn(Coordinate) -> Option<MapFeature> + Send + Sync + 'static) -> Self {
            Self {
                ready: AtomicBool::new(true),
                fail_queries: AtomicBool::new(false),
                rendered_queries: AtomicUsize::new(0),
                fits: AtomicUsize::new(0),
                source_features: Vec::new(),
                terrain: Box::new(terrain),
            }
        }

        pub fn queries(&self) -> usize {
            self.rendered_queries.load(Ordering::SeqCst)
        }
    }

    pub fn feature_with(key: &str, value: &str) -> MapFeature {
        let mut feature = MapFeature::default();
        feature
            .properties
            .insert(key.to_string(), serde_json::Value::String(value.to_string()));
        feature
    }

    impl MapQuery for FakeMap {
        fn is_ready(&self) -> bool {
            self.ready.load(Ordering::SeqCst)
        }

        // Identity projection keeps the fake trivial.
        fn project(&self, coordinate: Coordinate) -> CoreResult<ScreenPoint> {
            Ok(ScreenPoint {
                x: coordinate.lon,
                y: coordinate.lat,
            })
        }

        fn unproject(&self, point: ScreenPoint) -> CoreResult<Coordinate> {
            Ok(Coordinate::new(point.x, point.y))
        }

        fn query_features_at(&self, point: ScreenPoint) -> CoreResult<Vec<MapFeature>> {
            self.rendered_queries.fetch_add(1, Ordering::SeqCst);
            if self.fail_queries.load(Ordering::SeqCst) {
                return Err(RouteError::Query("renderer crashed".into()));
            }
            Ok((self.terrain)(Coordinate::new(point.x, point.y))
                .into_iter()
                .collect())
        }

        fn query_all_features(&self, _source_layer: Option<&str>) -> CoreResult<Vec<MapFeature>> {
            Ok(self.source_features.clone())
        }

        fn bounds(&self) -> Option<BoundingBox> {
            None
        }

        fn fit_to(&self, _bbox: BoundingBox, _padding_px: f64) -> CoreResult<()> {
            self.fits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
