//! Dijkstra shortest path over a [`RoadGraph`].

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::graph::{NodeId, RoadGraph};
use crate::models::Coordinate;
use crate::queue::PriorityQueue;
use crate::spatial::polyline_km;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphPath {
    pub nodes: Vec<NodeId>,
    /// Sum of class-weighted edge costs.
    pub cost_km: f64,
    /// Plain great-circle length of `geometry`.
    pub distance_km: f64,
    pub geometry: Vec<Coordinate>,
}

/// Cheapest path between two nodes, or `None` if unreachable.
pub fn shortest_path(graph: &RoadGraph, from: NodeId, to: NodeId) -> Option<GraphPath> {
    let start = graph.node_by_id(&from)?;
    graph.node_by_id(&to)?;

    if from == to {
        return Some(GraphPath {
            nodes: vec![from],
            cost_km: 0.0,
            distance_km: 0.0,
            geometry: vec![start.coordinate],
        });
    }

    let mut best: HashMap<NodeId, f64> = HashMap::new();
    let mut came_from: HashMap<NodeId, (NodeId, usize)> = HashMap::new();
    let mut settled: HashSet<NodeId> = HashSet::new();
    let mut open = PriorityQueue::new();

    best.insert(from, 0.0);
    open.enqueue(from, 0.0);

    while let Some((current, cost)) = open.dequeue_with_priority() {
        // Stale entry left behind by a later improvement.
        if !settled.insert(current) {
            continue;
        }
        if current == to {
            return Some(reconstruct(graph, &came_from, from, to, cost));
        }
        let Some(node) = graph.node_by_id(&current) else {
            continue;
        };
        for (index, edge) in node.edges.iter().enumerate() {
            if settled.contains(&edge.target) {
                continue;
            }
            let candidate = cost + edge.weight_km;
            let improves = best
                .get(&edge.target)
                .map_or(true, |known| candidate < *known);
            if improves {
                best.insert(edge.target, candidate);
                came_from.insert(edge.target, (current, index));
                open.enqueue(edge.target, candidate);
            }
        }
    }

    None
}

/// Snap both ends to the nearest node within `max_snap_km` and search.
pub fn route_between(
    graph: &RoadGraph,
    start: Coordinate,
    end: Coordinate,
    max_snap_km: f64,
) -> Option<GraphPath> {
    let from = graph.nearest_node(start, max_snap_km)?.id;
    let to = graph.nearest_node(end, max_snap_km)?.id;
    shortest_path(graph, from, to)
}

fn reconstruct(
    graph: &RoadGraph,
    came_from: &HashMap<NodeId, (NodeId, usize)>,
    from: NodeId,
    to: NodeId,
    cost_km: f64,
) -> GraphPath {
    let mut hops = Vec::new();
    let mut cursor = to;
    while cursor != from {
        match came_from.get(&cursor) {
            Some(&(previous, edge_index)) => {
                hops.push((previous, edge_index, cursor));
                cursor = previous;
            }
            None => break,
        }
    }
    hops.reverse();

    let mut nodes = vec![from];
    let mut geometry: Vec<Coordinate> = graph
        .node_by_id(&from)
        .map(|node| vec![node.coordinate])
        .unwrap_or_default();

    for (previous, edge_index, next) in hops {
        nodes.push(next);
        let edge = graph
            .node_by_id(&previous)
            .and_then(|node| node.edges.get(edge_index));
        let points = match edge.and_then(|edge| edge.geometry.as_ref()) {
            Some(points) if !points.is_empty() => points.clone(),
            _ => graph
                .node_by_id(&next)
                .map(|node| vec![node.coordinate])
                .unwrap_or_default(),
        };
        // Edge geometry starts at the raw position of the shared node.
        let skip = usize::from(!geometry.is_empty() && points.len() > 1);
        geometry.extend(points.into_iter().skip(skip));
    }

    let distance_km = polyline_km(&geometry);
    GraphPath {
        nodes,
        cost_km,
        distance_km,
        geometry,
    }
}
