//! Weighted undirected road graph over snapped coordinates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::CoreResult;
use crate::models::Coordinate;
use crate::spatial::haversine_km;

/// Snapping grid in degrees (~11 m at the equator).
pub const SNAP_DEGREES: f64 = 1e-4;

/// Default radius for [`RoadGraph::nearest_node`] lookups.
pub const DEFAULT_NEAREST_KM: f64 = 1.0;

/// Node identity: the coordinate quantized to the snapping grid.
///
/// Serialized as `"lon,lat"` with six decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct NodeId {
    lon_q: i64,
    lat_q: i64,
}

impl NodeId {
    pub fn snap(coordinate: Coordinate) -> Self {
        Self {
            lon_q: (coordinate.lon / SNAP_DEGREES).round() as i64,
            lat_q: (coordinate.lat / SNAP_DEGREES).round() as i64,
        }
    }

    /// The grid coordinate this id stands for.
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(
            self.lon_q as f64 * SNAP_DEGREES,
            self.lat_q as f64 * SNAP_DEGREES,
        )
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let coordinate = self.coordinate();
        write!(f, "{:.6},{:.6}", coordinate.lon, coordinate.lat)
    }
}

impl FromStr for NodeId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lon, lat) = s
            .split_once(',')
            .ok_or_else(|| format!("node id '{s}' is not 'lon,lat'"))?;
        let lon: f64 = lon.trim().parse().map_err(|_| format!("bad longitude in '{s}'"))?;
        let lat: f64 = lat.trim().parse().map_err(|_| format!("bad latitude in '{s}'"))?;
        Ok(Self::snap(Coordinate::new(lon, lat)))
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for NodeId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Road category affecting edge cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoadClass {
    Highway,
    MajorRoad,
    MinorRoad,
    Path,
    Trail,
}

impl RoadClass {
    /// Substring match on a `type`/`class` property value.
    pub fn from_property(value: &str) -> Option<Self> {
        let value = value.to_lowercase();
        if value.contains("highway") {
            Some(Self::Highway)
        } else if value.contains("major") {
            Some(Self::MajorRoad)
        } else if value.contains("minor") {
            Some(Self::MinorRoad)
        } else if value.contains("path") {
            Some(Self::Path)
        } else if value.contains("trail") {
            Some(Self::Trail)
        } else {
            None
        }
    }

    /// Cost multiplier; below 1 is preferred.
    pub fn multiplier(class: Option<Self>) -> f64 {
        match class {
            Some(Self::Highway | Self::MajorRoad) => 0.8,
            Some(Self::MinorRoad | Self::Path) => 1.2,
            Some(Self::Trail) => 1.5,
            None => 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub target: NodeId,
    /// Great-circle length scaled by the road class multiplier.
    pub weight_km: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub road_class: Option<RoadClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Vec<Coordinate>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub coordinate: Coordinate,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub avg_degree: f64,
}

#[derive(Serialize, Deserialize)]
struct GraphSnapshot {
    nodes: Vec<GraphNode>,
}

#[derive(Debug, Clone, Default)]
pub struct RoadGraph {
    nodes: BTreeMap<NodeId, GraphNode>,
}

impl RoadGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node for the snapped `coordinate`, created on first use.
    pub fn add_node(&mut self, coordinate: Coordinate) -> NodeId {
        let id = NodeId::snap(coordinate);
        self.nodes.entry(id).or_insert_with(|| GraphNode {
            id,
            coordinate: id.coordinate(),
            edges: Vec::new(),
        });
        id
    }

    /// Add both directions of a road segment. Returns `false` when both ends
    /// snap to the same node.
    pub fn add_road_segment(
        &mut self,
        from: Coordinate,
        to: Coordinate,
        road_class: Option<RoadClass>,
        geometry: Option<Vec<Coordinate>>,
    ) -> bool {
        let from_id = self.add_node(from);
        let to_id = self.add_node(to);
        if from_id == to_id {
            return false;
        }

        let weight_km = haversine_km(from, to) * RoadClass::multiplier(road_class);
        let reversed = geometry.as_ref().map(|points| {
            let mut points = points.clone();
            points.reverse();
            points
        });

        if let Some(node) = self.nodes.get_mut(&from_id) {
            node.edges.push(GraphEdge {
                target: to_id,
                weight_km,
                road_class,
                geometry,
            });
        }
        if let Some(node) = self.nodes.get_mut(&to_id) {
            node.edges.push(GraphEdge {
                target: from_id,
                weight_km,
                road_class,
                geometry: reversed,
            });
        }
        true
    }

    /// Node at the snapped position of `coordinate`.
    pub fn node(&self, coordinate: Coordinate) -> Option<&GraphNode> {
        self.nodes.get(&NodeId::snap(coordinate))
    }

    pub fn node_by_id(&self, id: &NodeId) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    /// Closest node strictly within `max_km`, by linear scan.
    pub fn nearest_node(&self, coordinate: Coordinate, max_km: f64) -> Option<&GraphNode> {
        let mut best = None;
        let mut best_km = max_km;
        for node in self.nodes.values() {
            let distance = haversine_km(coordinate, node.coordinate);
            if distance < best_km {
                best_km = distance;
                best = Some(node);
            }
        }
        best
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.total_degree() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn stats(&self) -> GraphStats {
        let nodes = self.node_count();
        GraphStats {
            nodes,
            edges: self.edge_count(),
            avg_degree: if nodes > 0 {
                self.total_degree() as f64 / nodes as f64
            } else {
                0.0
            },
        }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn to_json(&self) -> CoreResult<String> {
        let snapshot = GraphSnapshot {
            nodes: self.nodes.values().cloned().collect(),
        };
        Ok(serde_json::to_string(&snapshot)?)
    }

    pub fn from_json(json: &str) -> CoreResult<Self> {
        let snapshot: GraphSnapshot = serde_json::from_str(json)?;
        let nodes = snapshot
            .nodes
            .into_iter()
            .map(|node| (node.id, node))
            .collect();
        Ok(Self { nodes })
    }

    fn total_degree(&self) -> usize {
        self.nodes.values().map(|node| node.edges.len()).sum()
    }
}
