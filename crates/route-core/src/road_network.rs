//! Road network extraction from map features, with a persisted cache.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{CoreResult, RouteError};
use crate::graph::{GraphStats, RoadClass, RoadGraph};
use crate::map::{wait_until, MapFeature, MapQuery};
use crate::models::Coordinate;
use crate::store::{GraphStore, StoredGraph};

/// Key of the single persisted graph record.
pub const GRAPH_CACHE_KEY: &str = "main";

/// Source layers that may carry road lines.
pub const ROAD_LAYERS: &[&str] = &["line-labels", "geometry"];

const ROAD_WORDS: &[&str] = &["road", "path", "trail", "highway", "street"];
const ROAD_TYPE_FIELDS: &[&str] = &["type", "class", "fclass"];

/// One polyline of a road feature.
#[derive(Debug, Clone, PartialEq)]
pub struct LineFeature {
    pub coordinates: Vec<Coordinate>,
    pub road_class: Option<RoadClass>,
}

impl LineFeature {
    /// Road lines of `feature`; empty when it is not a road.
    pub fn from_map_feature(feature: &MapFeature) -> Vec<LineFeature> {
        let Some(geometry) = feature.geometry.as_ref().filter(|g| g.is_line()) else {
            return Vec::new();
        };
        let kind = feature
            .first_property_str(ROAD_TYPE_FIELDS)
            .unwrap_or_default()
            .to_lowercase();
        if !ROAD_WORDS.iter().any(|word| kind.contains(word)) {
            return Vec::new();
        }
        let road_class = RoadClass::from_property(&kind);
        geometry
            .line_parts()
            .into_iter()
            .map(|part| LineFeature {
                coordinates: part.to_vec(),
                road_class,
            })
            .collect()
    }
}

/// Build a graph with one undirected edge per consecutive coordinate pair.
pub fn build_graph<'a, I>(lines: I) -> RoadGraph
where
    I: IntoIterator<Item = &'a LineFeature>,
{
    let mut graph = RoadGraph::new();
    for line in lines {
        for pair in line.coordinates.windows(2) {
            graph.add_road_segment(pair[0], pair[1], line.road_class, Some(pair.to_vec()));
        }
    }
    graph
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadNetworkConfig {
    /// Stored graphs older than this are rebuilt.
    pub retention_secs: u64,
    pub ready_timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl RoadNetworkConfig {
    /// Retention as a chrono duration, saturating at the largest one.
    pub fn retention(&self) -> chrono::Duration {
        i64::try_from(self.retention_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }
}

impl Default for RoadNetworkConfig {
    fn default() -> Self {
        Self {
            retention_secs: 7 * 24 * 60 * 60,
            ready_timeout_ms: 15_000,
            poll_interval_ms: 500,
        }
    }
}

/// Owns the road graph and its persisted copy.
pub struct RoadGraphBuilder<S> {
    store: S,
    config: RoadNetworkConfig,
    graph: RoadGraph,
    loaded: bool,
}

impl<S: GraphStore> RoadGraphBuilder<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, RoadNetworkConfig::default())
    }

    pub fn with_config(store: S, config: RoadNetworkConfig) -> Self {
        Self {
            store,
            config,
            graph: RoadGraph::new(),
            loaded: false,
        }
    }

    pub fn graph(&self) -> &RoadGraph {
        &self.graph
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Extract roads from `map` and build the graph. No-op once loaded.
    ///
    /// Only a map that never becomes ready is an error; a failed cache write
    /// is logged and the freshly built graph is kept.
    pub async fn load<M: MapQuery + ?Sized>(&mut self, map: &M) -> CoreResult<GraphStats> {
        if self.loaded {
            return Ok(self.graph.stats());
        }

        let ready = wait_until(
            || map.is_ready(),
            Duration::from_millis(self.config.poll_interval_ms),
            Duration::from_millis(self.config.ready_timeout_ms),
        )
        .await;
        if !ready {
            return Err(RouteError::MapUnavailable);
        }

        tracing::info!("Starting road network extraction");
        let mut total_features = 0usize;
        let mut lines = Vec::new();
        for layer in ROAD_LAYERS {
            match map.query_all_features(Some(layer)) {
                Ok(features) => {
                    total_features += features.len();
                    lines.extend(features.iter().flat_map(LineFeature::from_map_feature));
                }
                Err(err) => tracing::warn!("Error querying layer {}: {}", layer, err),
            }
        }

        self.graph = build_graph(&lines);
        self.loaded = true;

        let stats = self.graph.stats();
        tracing::info!(
            total_features,
            road_lines = lines.len(),
            nodes = stats.nodes,
            edges = stats.edges,
            avg_degree = stats.avg_degree,
            "Road network extraction complete"
        );

        if let Err(err) = self.persist().await {
            tracing::warn!("Failed to cache road graph: {}", err);
        }
        Ok(stats)
    }

    /// Adopt the stored graph if it exists and is within retention.
    pub async fn load_from_cache(&mut self) -> bool {
        let record = match self.store.get(GRAPH_CACHE_KEY).await {
            Ok(Some(record)) => record,
            Ok(None) => return false,
            Err(err) => {
                tracing::warn!("Failed to load road graph from cache: {}", err);
                return false;
            }
        };

        let age = record.age(Utc::now());
        let retention = self.config.retention();
        if age >= retention {
            tracing::info!("Cached road graph is {} hours old, will rebuild", age.num_hours());
            return false;
        }

        match RoadGraph::from_json(&record.data) {
            Ok(graph) => {
                self.graph = graph;
                self.loaded = true;
                tracing::info!("Road graph loaded from cache ({} nodes)", self.graph.node_count());
                true
            }
            Err(err) => {
                tracing::warn!("Cached road graph is unreadable, will rebuild: {}", err);
                false
            }
        }
    }

    /// Delete the stored record. The in-memory graph is untouched.
    pub async fn clear_cache(&self) -> CoreResult<()> {
        self.store.delete(GRAPH_CACHE_KEY).await?;
        tracing::info!("Road graph cache cleared");
        Ok(())
    }

    /// Drop both copies and extract again.
    pub async fn reload<M: MapQuery + ?Sized>(&mut self, map: &M) -> CoreResult<GraphStats> {
        if let Err(err) = self.clear_cache().await {
            tracing::warn!("Failed to clear road graph cache: {}", err);
        }
        self.graph.clear();
        self.loaded = false;
        self.load(map).await
    }

    async fn persist(&self) -> CoreResult<()> {
        let record = StoredGraph {
            data: self.graph.to_json()?,
            built_at: Utc::now(),
        };
        self.store.put(GRAPH_CACHE_KEY, record).await?;
        tracing::debug!("Road graph cached");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RouteError;
    use crate::map::{BoundingBox, FeatureGeometry, ScreenPoint};
    use crate::store::MemoryGraphStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct RoadMap {
        ready: AtomicBool,
        features: Vec<MapFeature>,
    }

    impl MapQuery for RoadMap {
        fn is_ready(&self) -> bool {
            self.ready.load(Ordering::SeqCst)
        }

        fn project(&self, coordinate: Coordinate) -> CoreResult<ScreenPoint> {
            Ok(ScreenPoint {
                x: coordinate.lon,
                y: coordinate.lat,
            })
        }

        fn unproject(&self, point: ScreenPoint) -> CoreResult<Coordinate> {
            Ok(Coordinate::new(point.x, point.y))
        }

        fn query_features_at(&self, _point: ScreenPoint) -> CoreResult<Vec<MapFeature>> {
            Ok(Vec::new())
        }

        fn query_all_features(&self, source_layer: Option<&str>) -> CoreResult<Vec<MapFeature>> {
            match source_layer {
                Some("line-labels") => Ok(self.features.clone()),
                Some(_) => Err(RouteError::Query("no such layer".into())),
                None => Ok(Vec::new()),
            }
        }

        fn bounds(&self) -> Option<BoundingBox> {
            None
        }

        fn fit_to(&self, _bbox: BoundingBox, _padding_px: f64) -> CoreResult<()> {
            Ok(())
        }
    }

    fn road(kind: &str, geometry: FeatureGeometry) -> MapFeature {
        MapFeature {
            source_layer: Some("line-labels".into()),
            properties: json!({ "type": kind }).as_object().cloned().unwrap_or_default(),
            geometry: Some(geometry),
            ..MapFeature::default()
        }
    }

    fn road_map() -> RoadMap {
        let line = |points: &[(f64, f64)]| {
            points.iter().map(|&(lon, lat)| Coordinate::new(lon, lat)).collect::<Vec<_>>()
        };
        RoadMap {
            ready: AtomicBool::new(true),
            features: vec![
                road("highway", FeatureGeometry::LineString(line(&[(0.0, 0.0), (0.01, 0.0), (0.02, 0.0)]))),
                road(
                    "minor_road",
                    FeatureGeometry::MultiLineString(vec![
                        line(&[(0.02, 0.0), (0.02, 0.01)]),
                        line(&[(0.0, 0.0), (0.0, 0.01)]),
                    ]),
                ),
                road("river", FeatureGeometry::LineString(line(&[(1.0, 1.0), (1.1, 1.1)]))),
            ],
        }
    }

    #[test]
    fn only_road_lines_are_extracted() {
        let map = road_map();
        let lines: Vec<LineFeature> = map.features.iter().flat_map(LineFeature::from_map_feature).collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].road_class, Some(RoadClass::Highway));
        assert_eq!(lines[1].road_class, Some(RoadClass::MinorRoad));

        let graph = build_graph(&lines);
        assert_eq!(graph.node_count(), 5);
        assert_eq!(graph.edge_count(), 4);
    }

    #[tokio::test]
    async fn load_builds_and_caches_graph() {
        let map = road_map();
        let mut builder = RoadGraphBuilder::new(MemoryGraphStore::new());
        let stats = builder.load(&map).await.unwrap();
        assert!(builder.is_loaded());
        assert_eq!(stats.edges, 4);

        let stored = builder.store().get(GRAPH_CACHE_KEY).await.unwrap().unwrap();
        let restored = RoadGraph::from_json(&stored.data).unwrap();
        assert_eq!(restored.stats(), stats);
    }

    #[tokio::test(start_paused = true)]
    async fn load_fails_when_map_never_ready() {
        let map = road_map();
        map.ready.store(false, Ordering::SeqCst);
        let mut builder = RoadGraphBuilder::new(MemoryGraphStore::new());
        let err = builder.load(&map).await.unwrap_err();
        assert!(matches!(err, RouteError::MapUnavailable));
        assert!(!builder.is_loaded());
    }

    #[tokio::test]
    async fn fresh_cache_is_adopted() {
        let map = road_map();
        let store = MemoryGraphStore::new();
        let mut first = RoadGraphBuilder::new(store);
        first.load(&map).await.unwrap();
        let expected = first.graph().stats();

        let mut second = RoadGraphBuilder::new(MemoryGraphStore::new());
        let record = first.store().get(GRAPH_CACHE_KEY).await.unwrap().unwrap();
        second.store().put(GRAPH_CACHE_KEY, record).await.unwrap();
        assert!(second.load_from_cache().await);
        assert_eq!(second.graph().stats(), expected);
    }

    #[test]
    fn huge_retention_saturates() {
        let config = RoadNetworkConfig {
            retention_secs: u64::MAX,
            ..RoadNetworkConfig::default()
        };
        assert_eq!(config.retention(), chrono::Duration::MAX);
        assert_eq!(
            RoadNetworkConfig::default().retention(),
            chrono::Duration::days(7)
        );
    }

    #[tokio::test]
    async fn huge_retention_keeps_old_cache() {
        let store = MemoryGraphStore::new();
        store
            .put(
                GRAPH_CACHE_KEY,
                StoredGraph {
                    data: "{\"nodes\":[]}".into(),
                    built_at: Utc::now() - chrono::Duration::days(3650),
                },
            )
            .await
            .unwrap();
        let config = RoadNetworkConfig {
            retention_secs: u64::MAX,
            ..RoadNetworkConfig::default()
        };
        let mut builder = RoadGraphBuilder::with_config(store, config);
        assert!(builder.load_from_cache().await);
    }

    #[tokio::test]
    async fn stale_or_corrupt_cache_is_ignored() {
        let builder_store = MemoryGraphStore::new();
        builder_store
            .put(
                GRAPH_CACHE_KEY,
                StoredGraph {
                    data: "{\"nodes\":[]}".into(),
                    built_at: Utc::now() - chrono::Duration::days(8),
                },
            )
            .await
            .unwrap();
        let mut builder = RoadGraphBuilder::new(builder_store);
        assert!(!builder.load_from_cache().await);

        builder
            .store()
            .put(
                GRAPH_CACHE_KEY,
                StoredGraph {
                    data: "not json".into(),
                    built_at: Utc::now(),
                },
            )
            .await
            .unwrap();
        assert!(!builder.load_from_cache().await);
        assert!(!builder.is_loaded());
    }

    #[tokio::test]
    async fn clear_cache_removes_record_and_reload_rebuilds() {
        let map = road_map();
        let mut builder = RoadGraphBuilder::new(MemoryGraphStore::new());
        builder.load(&map).await.unwrap();
        builder.clear_cache().await.unwrap();
        assert!(builder.store().is_empty());
        assert!(builder.is_loaded());

        let stats = builder.reload(&map).await.unwrap();
        assert_eq!(stats.edges, 4);
        assert_eq!(builder.store().len(), 1);
    }
}
