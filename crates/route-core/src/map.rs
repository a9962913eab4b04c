//! Contract for the spatial/rendering engine the router queries.
//!
//! The engine is external: it projects coordinates to screen space, reports
//! which features lie under a screen point, and exposes viewport state. The
//! core never assumes a particular renderer; the server backs this trait with
//! a GeoJSON dataset and tests use small in-memory fakes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::error::CoreResult;
use crate::models::Coordinate;
use crate::spatial::polygon_contains;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub fn from_points(points: &[Coordinate]) -> Option<Self> {
        let mut west = f64::INFINITY;
        let mut south = f64::INFINITY;
        let mut east = f64::NEG_INFINITY;
        let mut north = f64::NEG_INFINITY;
        for point in points {
            if !point.lon.is_finite() || !point.lat.is_finite() {
                continue;
            }
            west = west.min(point.lon);
            east = east.max(point.lon);
            south = south.min(point.lat);
            north = north.max(point.lat);
        }
        if !west.is_finite() || !south.is_finite() {
            return None;
        }
        Some(Self {
            west,
            south,
            east,
            north,
        })
    }

    pub fn contains(&self, point: Coordinate) -> bool {
        point.lon >= self.west
            && point.lon <= self.east
            && point.lat >= self.south
            && point.lat <= self.north
    }

    /// Grow each side by `pad_ratio` of the span, with a small minimum pad.
    pub fn expand(&self, pad_ratio: f64) -> Self {
        let pad_lon = ((self.east - self.west) * pad_ratio).max(0.0015);
        let pad_lat = ((self.north - self.south) * pad_ratio).max(0.0015);
        Self {
            west: self.west - pad_lon,
            south: self.south - pad_lat,
            east: self.east + pad_lon,
            north: self.north + pad_lat,
        }
    }
}

/// GeoJSON-shaped geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum FeatureGeometry {
    Point(Coordinate),
    LineString(Vec<Coordinate>),
    MultiLineString(Vec<Vec<Coordinate>>),
    Polygon(Vec<Vec<Coordinate>>),
    MultiPolygon(Vec<Vec<Vec<Coordinate>>>),
}

impl FeatureGeometry {
    /// Bounding-box test against the outer ring of each polygon.
    pub fn bbox_contains(&self, point: Coordinate) -> bool {
        let outer_contains = |rings: &Vec<Vec<Coordinate>>| {
            rings
                .first()
                .and_then(|outer| BoundingBox::from_points(outer))
                .is_some_and(|bbox| bbox.contains(point))
        };
        match self {
            Self::Polygon(rings) => outer_contains(rings),
            Self::MultiPolygon(polygons) => polygons.iter().any(outer_contains),
            _ => false,
        }
    }

    /// Exact containment for polygonal geometry.
    pub fn contains(&self, point: Coordinate) -> bool {
        match self {
            Self::Polygon(rings) => polygon_contains(rings, point),
            Self::MultiPolygon(polygons) => {
                polygons.iter().any(|rings| polygon_contains(rings, point))
            }
            _ => false,
        }
    }

    /// Line parts of a line-shaped geometry; empty for anything else.
    pub fn line_parts(&self) -> Vec<&[Coordinate]> {
        match self {
            Self::LineString(line) => vec![line.as_slice()],
            Self::MultiLineString(lines) => lines.iter().map(Vec::as_slice).collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_line(&self) -> bool {
        matches!(self, Self::LineString(_) | Self::MultiLineString(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapFeature {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_layer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_id: Option<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<FeatureGeometry>,
}

impl MapFeature {
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    /// First string value among `keys`.
    pub fn first_property_str(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.property_str(key))
    }
}

/// Spatial/rendering engine consumed by the router.
pub trait MapQuery: Send + Sync {
    /// Loaded and able to answer queries.
    fn is_ready(&self) -> bool;

    /// Viewport has settled after a programmatic move.
    fn is_idle(&self) -> bool {
        true
    }

    fn project(&self, coordinate: Coordinate) -> CoreResult<ScreenPoint>;

    fn unproject(&self, point: ScreenPoint) -> CoreResult<Coordinate>;

    /// Rendered features under a screen point, top-most first.
    fn query_features_at(&self, point: ScreenPoint) -> CoreResult<Vec<MapFeature>>;

    /// Unfiltered features, optionally restricted to one source layer.
    fn query_all_features(&self, source_layer: Option<&str>) -> CoreResult<Vec<MapFeature>>;

    fn bounds(&self) -> Option<BoundingBox>;

    fn fit_to(&self, bbox: BoundingBox, padding_px: f64) -> CoreResult<()>;
}

impl<T: MapQuery + ?Sized> MapQuery for Arc<T> {
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn is_idle(&self) -> bool {
        (**self).is_idle()
    }

    fn project(&self, coordinate: Coordinate) -> CoreResult<ScreenPoint> {
        (**self).project(coordinate)
    }

    fn unproject(&self, point: ScreenPoint) -> CoreResult<Coordinate> {
        (**self).unproject(point)
    }

    fn query_features_at(&self, point: ScreenPoint) -> CoreResult<Vec<MapFeature>> {
        (**self).query_features_at(point)
    }

    fn query_all_features(&self, source_layer: Option<&str>) -> CoreResult<Vec<MapFeature>> {
        (**self).query_all_features(source_layer)
    }

    fn bounds(&self) -> Option<BoundingBox> {
        (**self).bounds()
    }

    fn fit_to(&self, bbox: BoundingBox, padding_px: f64) -> CoreResult<()> {
        (**self).fit_to(bbox, padding_px)
    }
}

/// Poll `check` every `interval` until it holds or `timeout` elapses.
pub async fn wait_until<F>(check: F, interval: Duration, timeout: Duration) -> bool
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        let now = tokio::time::Instant::now();
        if now >= deadline {
            return false;
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn square(west: f64, south: f64, size: f64) -> Vec<Vec<Coordinate>> {
        vec![vec![
            Coordinate::new(west, south),
            Coordinate::new(west + size, south),
            Coordinate::new(west + size, south + size),
            Coordinate::new(west, south + size),
            Coordinate::new(west, south),
        ]]
    }

    #[test]
    fn geometry_parses_geojson_shape() {
        let json = r#"{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]}"#;
        let geometry: FeatureGeometry = serde_json::from_str(json).unwrap();
        assert!(geometry.contains(Coordinate::new(0.5, 0.5)));
        assert!(!geometry.is_line());
    }

    #[test]
    fn multipolygon_bbox_checks_every_part() {
        let geometry = FeatureGeometry::MultiPolygon(vec![square(0.0, 0.0, 1.0), square(5.0, 5.0, 1.0)]);
        assert!(geometry.bbox_contains(Coordinate::new(5.5, 5.5)));
        assert!(!geometry.bbox_contains(Coordinate::new(3.0, 3.0)));
    }

    #[test]
    fn bounding_box_expand_pads_each_side() {
        let bbox = BoundingBox::from_points(&[Coordinate::new(0.0, 0.0), Coordinate::new(10.0, 4.0)])
            .unwrap();
        let padded = bbox.expand(0.1);
        assert!((padded.west + 1.0).abs() < 1e-9);
        assert!((padded.north - 4.4).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_until_times_out() {
        let calls = AtomicUsize::new(0);
        let ready = wait_until(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                false
            },
            Duration::from_millis(500),
            Duration::from_secs(2),
        )
        .await;
        assert!(!ready);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_until_returns_once_check_holds() {
        let calls = AtomicUsize::new(0);
        let ready = wait_until(
            || calls.fetch_add(1, Ordering::SeqCst) >= 2,
            Duration::from_millis(100),
            Duration::from_secs(5),
        )
        .await;
        assert!(ready);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
