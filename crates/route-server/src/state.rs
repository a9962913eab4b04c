//! Shared application state.

use route_core::{Pathfinder, RoadGraphBuilder, TravelMode, TravelTimeEstimator};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::config::Config;
use crate::dataset::GeoJsonMap;
use crate::persistence::{Database, SqliteGraphStore};

pub type RoadNetwork = RoadGraphBuilder<SqliteGraphStore>;

/// One pathfinder and one road network per process. Route requests are
/// serialized on the pathfinder lock so the terrain cache has a single owner.
pub struct AppState {
    config: Config,
    map: Arc<GeoJsonMap>,
    pathfinder: Mutex<Pathfinder<Arc<GeoJsonMap>>>,
    roads: RwLock<RoadNetwork>,
    estimator: TravelTimeEstimator,
}

impl AppState {
    pub fn new(config: Config, map: GeoJsonMap, db: Database) -> Self {
        let map = Arc::new(map);
        let pathfinder = Pathfinder::new(map.clone(), config.pathfinder_config());
        let roads = RoadGraphBuilder::with_config(
            SqliteGraphStore::new(db.pool().clone()),
            config.road_network_config(),
        );
        Self {
            config,
            map,
            pathfinder: Mutex::new(pathfinder),
            roads: RwLock::new(roads),
            estimator: TravelTimeEstimator::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn map(&self) -> &Arc<GeoJsonMap> {
        &self.map
    }

    pub fn pathfinder(&self) -> &Mutex<Pathfinder<Arc<GeoJsonMap>>> {
        &self.pathfinder
    }

    pub fn roads(&self) -> &RwLock<RoadNetwork> {
        &self.roads
    }

    pub fn estimator(&self) -> &TravelTimeEstimator {
        &self.estimator
    }

    pub fn travel_modes(&self) -> &[TravelMode] {
        self.estimator.modes()
    }

    /// Adopt the persisted road graph, or extract it from the dataset.
    pub async fn init_roads(&self) {
        let mut roads = self.roads.write().await;
        if roads.load_from_cache().await {
            return;
        }
        if let Err(err) = roads.load(self.map.as_ref()).await {
            tracing::warn!("Road network unavailable: {}", err);
        }
    }
}
