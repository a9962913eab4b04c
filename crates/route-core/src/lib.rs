pub mod error;
pub mod geodesic;
pub mod graph;
pub mod map;
pub mod models;
pub mod pathfinder;
pub mod queue;
pub mod road_network;
pub mod search;
pub mod segments;
pub mod spatial;
pub mod store;
pub mod terrain;
pub mod travel;

pub use error::{CoreResult, RouteError};
pub use geodesic::GeodesicPathBuilder;
pub use graph::{GraphEdge, GraphNode, GraphStats, NodeId, RoadClass, RoadGraph};
pub use map::{BoundingBox, FeatureGeometry, MapFeature, MapQuery, ScreenPoint};
pub use models::{
    Coordinate, PathSegment, RouteResult, TerrainCategory, TravelMode, TravelTimeResult,
};
pub use pathfinder::{Pathfinder, PathfinderConfig};
pub use queue::PriorityQueue;
pub use road_network::{
    build_graph, LineFeature, RoadGraphBuilder, RoadNetworkConfig, GRAPH_CACHE_KEY,
};
pub use search::{route_between, shortest_path, GraphPath};
pub use segments::{build_segments, merge_water, SegmentBuilder};
pub use spatial::haversine_km;
pub use store::{GraphStore, MemoryGraphStore, StoredGraph};
pub use terrain::{ClassifierStats, TerrainCacheConfig, TerrainClassifier};
pub use travel::TravelTimeEstimator;
