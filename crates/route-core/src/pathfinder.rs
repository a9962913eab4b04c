//! Route computation: sample, classify, group, merge.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::geodesic::GeodesicPathBuilder;
use crate::map::{wait_until, BoundingBox, MapQuery};
use crate::models::{Coordinate, RouteResult, TerrainCategory, TravelTimeResult};
use crate::segments::{build_segments, merge_water};
use crate::terrain::{TerrainCacheConfig, TerrainClassifier};
use crate::travel::TravelTimeEstimator;

const FALLBACK_MESSAGE: &str =
    "Route calculated using fallback terrain detection (map queries unavailable)";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathfinderConfig {
    pub sample_interval_km: f64,
    pub ready_timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// Move the viewport over the path before sampling so its tiles load.
    pub fit_viewport: bool,
    pub fit_padding_px: f64,
    pub idle_timeout_ms: u64,
    pub settle_delay_ms: u64,
    pub terrain_cache: TerrainCacheConfig,
}

impl Default for PathfinderConfig {
    fn default() -> Self {
        Self {
            sample_interval_km: 0.5,
            ready_timeout_ms: 15_000,
            poll_interval_ms: 500,
            fit_viewport: true,
            fit_padding_px: 50.0,
            idle_timeout_ms: 5_000,
            settle_delay_ms: 500,
            terrain_cache: TerrainCacheConfig::default(),
        }
    }
}

/// Terrain-aware router over a map collaborator.
///
/// Owns the classifier and its cache; one route is computed at a time and its
/// samples are classified sequentially in path order.
pub struct Pathfinder<M> {
    map: M,
    config: PathfinderConfig,
    geodesic: GeodesicPathBuilder,
    classifier: TerrainClassifier,
    estimator: TravelTimeEstimator,
}

impl<M: MapQuery> Pathfinder<M> {
    pub fn new(map: M, config: PathfinderConfig) -> Self {
        Self {
            geodesic: GeodesicPathBuilder::new(config.sample_interval_km),
            classifier: TerrainClassifier::new(&config.terrain_cache),
            estimator: TravelTimeEstimator::default(),
            map,
            config,
        }
    }

    pub fn with_classifier(mut self, classifier: TerrainClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_estimator(mut self, estimator: TravelTimeEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn config(&self) -> &PathfinderConfig {
        &self.config
    }

    pub fn classifier(&self) -> &TerrainClassifier {
        &self.classifier
    }

    pub fn estimator(&self) -> &TravelTimeEstimator {
        &self.estimator
    }

    /// Compute the terrain breakdown of the great-circle route.
    ///
    /// Never fails: invalid input yields `success = false`, an unavailable map
    /// yields a heuristic route with an explanatory message.
    pub async fn find_route(&mut self, start: Coordinate, end: Coordinate) -> RouteResult {
        if let Err(err) = start.validate().and_then(|_| end.validate()) {
            tracing::warn!("Rejecting route request: {}", err);
            return RouteResult::failure(err.to_string());
        }
        tracing::info!("Route calculation started: {} -> {}", start, end);

        let ready = wait_until(
            || self.map.is_ready(),
            Duration::from_millis(self.config.poll_interval_ms),
            Duration::from_millis(self.config.ready_timeout_ms),
        )
        .await;
        if !ready {
            tracing::error!(
                "Map readiness timeout after {} ms, using fallback route",
                self.config.ready_timeout_ms
            );
            return self.fallback_route(start, end);
        }

        let path = self.geodesic.build_path(start, end);
        tracing::debug!("Generated path with {} points", path.len());

        if self.config.fit_viewport {
            self.settle_viewport(&path).await;
        }

        let classifier = &mut self.classifier;
        let map = &self.map;
        let segments = merge_water(build_segments(&path, |coordinate| {
            classifier.classify(map, coordinate)
        }));
        let result = RouteResult::from_segments(path, segments);
        log_summary(&result);
        result
    }

    /// The great-circle route classified by the coordinate heuristic only.
    pub fn fallback_route(&self, start: Coordinate, end: Coordinate) -> RouteResult {
        let path = self.geodesic.build_path(start, end);
        let segments = merge_water(build_segments(&path, |coordinate| {
            self.classifier.classify_fallback(coordinate)
        }));
        let result = RouteResult::from_segments(path, segments).with_message(FALLBACK_MESSAGE);
        tracing::info!(
            "Fallback route: {:.2} km total, {:.2} km land, {:.2} km water",
            result.total_distance_km,
            result.land_distance_km,
            result.water_distance_km
        );
        result
    }

    pub fn estimate_all(&self, route: &RouteResult) -> Vec<TravelTimeResult> {
        self.estimator.estimate_all(route)
    }

    /// Classify one coordinate, as used by the terrain probe.
    pub fn classify_point(&mut self, coordinate: Coordinate) -> TerrainCategory {
        self.classifier.classify(&self.map, coordinate)
    }

    async fn settle_viewport(&self, path: &[Coordinate]) {
        let Some(bbox) = BoundingBox::from_points(path) else {
            return;
        };
        if let Err(err) = self.map.fit_to(bbox.expand(0.1), self.config.fit_padding_px) {
            tracing::warn!("Could not fit viewport to route: {}", err);
            return;
        }

        let idle = wait_until(
            || self.map.is_idle(),
            Duration::from_millis(self.config.poll_interval_ms),
            Duration::from_millis(self.config.idle_timeout_ms),
        )
        .await;
        if !idle {
            tracing::warn!("Viewport did not settle, sampling anyway");
        }
        tokio::time::sleep(Duration::from_millis(self.config.settle_delay_ms)).await;
    }
}

fn log_summary(result: &RouteResult) {
    let share = |part: f64| {
        if result.total_distance_km > 0.0 {
            part / result.total_distance_km * 100.0
        } else {
            0.0
        }
    };
    tracing::info!(
        "Route calculation complete: {:.2} km total, {:.2} km land ({:.1}%), {:.2} km water ({:.1}%), {} segments",
        result.total_distance_km,
        result.land_distance_km,
        share(result.land_distance_km),
        result.water_distance_km,
        share(result.water_distance_km),
        result.segments.len()
    );
    for (index, segment) in result.segments.iter().enumerate() {
        tracing::debug!(
            "Segment {}: {} - {:.2} km ({} points)",
            index + 1,
            segment.category,
            segment.distance_km,
            segment.coordinates.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::haversine_km;
    use crate::terrain::testing::{feature_with, FakeMap};
    use std::sync::atomic::Ordering;

    #[tokio::test(start_paused = true)]
    async fn land_only_route_is_one_segment() {
        let map = FakeMap::new(|_| Some(feature_with("terrain", "land")));
        let mut pathfinder = Pathfinder::new(map, PathfinderConfig::default());
        let start = Coordinate::new(-2.0, 10.0);
        let end = Coordinate::new(-1.0, 10.0);

        let result = pathfinder.find_route(start, end).await;
        assert!(result.success);
        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.segments[0].category, TerrainCategory::Land);
        assert_eq!(result.water_distance_km, 0.0);

        let expected = haversine_km(start, end);
        assert!((result.total_distance_km - expected).abs() < 1e-6);
        assert!((expected - 109.6).abs() < 1.0, "got {expected}");
        assert_eq!(result.full_path.first(), Some(&start));
        assert_eq!(result.full_path.last(), Some(&end));
        assert_eq!(pathfinder.map().fits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sea_crossing_splits_into_three_parts() {
        let map = FakeMap::new(|c| {
            let kind = if c.lon > 0.0 && c.lon < 1.0 { "ocean" } else { "land" };
            Some(feature_with("terrain", kind))
        });
        let mut pathfinder = Pathfinder::new(map, PathfinderConfig::default());
        let result = pathfinder
            .find_route(Coordinate::new(-1.0, 0.0), Coordinate::new(2.0, 0.0))
            .await;

        let categories: Vec<_> = result.segments.iter().map(|s| s.category).collect();
        assert_eq!(
            categories,
            vec![TerrainCategory::Land, TerrainCategory::Water, TerrainCategory::Land]
        );
        let sum: f64 = result.segments.iter().map(|s| s.distance_km).sum();
        assert!((sum - result.total_distance_km).abs() < 1e-9);
        assert!(
            (result.land_distance_km + result.water_distance_km - result.total_distance_km).abs()
                < 1e-9
        );
        let water_share = result.water_distance_km / result.total_distance_km;
        assert!((water_share - 1.0 / 3.0).abs() < 0.02);

        let options = pathfinder.estimate_all(&result);
        assert_eq!(
            options.iter().map(|o| o.mode.as_str()).collect::<Vec<_>>(),
            vec!["mixed"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unready_map_yields_fallback_route() {
        let map = FakeMap::new(|_| Some(feature_with("terrain", "ocean")));
        map.ready.store(false, Ordering::SeqCst);
        let mut pathfinder = Pathfinder::new(map, PathfinderConfig::default());

        let result = pathfinder
            .find_route(Coordinate::new(-2.0, 10.0), Coordinate::new(-1.0, 10.0))
            .await;
        assert!(result.success);
        assert_eq!(result.message.as_deref(), Some(FALLBACK_MESSAGE));
        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.segments[0].category, TerrainCategory::Land);
        assert_eq!(pathfinder.map().queries(), 0);
    }

    #[tokio::test]
    async fn invalid_input_is_reported_not_raised() {
        let map = FakeMap::new(|_| None);
        let mut pathfinder = Pathfinder::new(map, PathfinderConfig::default());
        let result = pathfinder
            .find_route(Coordinate::new(0.0, 95.0), Coordinate::new(1.0, 0.0))
            .await;
        assert!(!result.success);
        assert!(result.message.is_some());
        assert!(result.segments.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_route_is_served_from_cache() {
        let map = FakeMap::new(|_| Some(feature_with("terrain", "land")));
        let mut pathfinder = Pathfinder::new(map, PathfinderConfig::default());
        let start = Coordinate::new(3.0, 3.0);
        let end = Coordinate::new(3.05, 3.0);

        pathfinder.find_route(start, end).await;
        let after_first = pathfinder.map().queries();
        pathfinder.find_route(start, end).await;
        assert_eq!(pathfinder.map().queries(), after_first);
        assert!(pathfinder.classifier().stats().cache_hits > 0);
    }
}
