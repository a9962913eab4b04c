//! GeoJSON-backed map used as the terrain and road data source.
//!
//! Features are loaded once from a FeatureCollection. Screen space is a Web
//! Mercator pixel grid at a fixed zoom, so projection is pure arithmetic and
//! rendered-feature queries become point-in-polygon tests.

use anyhow::{Context, Result};
use route_core::{
    BoundingBox, Coordinate, CoreResult, FeatureGeometry, MapFeature, MapQuery, RouteError,
    ScreenPoint,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::f64::consts::PI;
use std::path::Path;
use std::sync::RwLock;

const TILE_SIZE: f64 = 512.0;
const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

#[derive(Deserialize)]
struct RawCollection {
    #[serde(default)]
    features: Vec<RawFeature>,
}

#[derive(Deserialize)]
struct RawFeature {
    #[serde(default, alias = "sourceLayer", alias = "source-layer")]
    source_layer: Option<String>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    geometry: Option<Value>,
}

pub struct GeoJsonMap {
    features: Vec<MapFeature>,
    extent: Option<BoundingBox>,
    viewport: RwLock<Option<BoundingBox>>,
    world_size: f64,
    ready: bool,
}

impl GeoJsonMap {
    pub fn from_path(path: impl AsRef<Path>, zoom: f64) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading dataset {}", path.display()))?;
        Self::from_geojson_str(&text, zoom)
    }

    pub fn from_geojson_str(text: &str, zoom: f64) -> Result<Self> {
        let collection: RawCollection =
            serde_json::from_str(text).context("dataset is not a GeoJSON FeatureCollection")?;

        let mut skipped = 0usize;
        let mut features = Vec::with_capacity(collection.features.len());
        for raw in collection.features {
            let properties = raw.properties.unwrap_or_default();
            let source_layer = raw.source_layer.or_else(|| {
                properties
                    .get("source_layer")
                    .or_else(|| properties.get("layer"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            });
            let geometry = match raw.geometry {
                None | Some(Value::Null) => None,
                Some(value) => match serde_json::from_value::<FeatureGeometry>(value) {
                    Ok(geometry) => Some(geometry),
                    Err(err) => {
                        tracing::debug!("Skipping feature with unsupported geometry: {}", err);
                        skipped += 1;
                        continue;
                    }
                },
            };
            features.push(MapFeature {
                layer_id: source_layer.clone(),
                source_layer,
                properties,
                geometry,
            });
        }

        let points: Vec<Coordinate> = features
            .iter()
            .filter_map(|feature| feature.geometry.as_ref())
            .flat_map(geometry_points)
            .collect();
        let extent = BoundingBox::from_points(&points);

        tracing::info!(
            "Loaded dataset with {} features ({} skipped)",
            features.len(),
            skipped
        );
        Ok(Self {
            features,
            extent,
            viewport: RwLock::new(None),
            world_size: TILE_SIZE * 2f64.powf(zoom),
            ready: true,
        })
    }

    /// A map that never becomes ready; every query degrades to fallbacks.
    pub fn unavailable(zoom: f64) -> Self {
        Self {
            features: Vec::new(),
            extent: None,
            viewport: RwLock::new(None),
            world_size: TILE_SIZE * 2f64.powf(zoom),
            ready: false,
        }
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    pub fn viewport(&self) -> Option<BoundingBox> {
        self.viewport.read().ok().and_then(|guard| *guard)
    }
}

fn geometry_points(geometry: &FeatureGeometry) -> Vec<Coordinate> {
    match geometry {
        FeatureGeometry::Point(point) => vec![*point],
        FeatureGeometry::LineString(line) => line.clone(),
        FeatureGeometry::MultiLineString(lines) | FeatureGeometry::Polygon(lines) => {
            lines.iter().flatten().copied().collect()
        }
        FeatureGeometry::MultiPolygon(polygons) => {
            polygons.iter().flatten().flatten().copied().collect()
        }
    }
}

impl MapQuery for GeoJsonMap {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn project(&self, coordinate: Coordinate) -> CoreResult<ScreenPoint> {
        coordinate.validate()?;
        let lat = coordinate.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
        let x = (coordinate.lon + 180.0) / 360.0 * self.world_size;
        let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * self.world_size;
        Ok(ScreenPoint { x, y })
    }

    fn unproject(&self, point: ScreenPoint) -> CoreResult<Coordinate> {
        if !point.x.is_finite() || !point.y.is_finite() {
            return Err(RouteError::InvalidCoordinate {
                lon: point.x,
                lat: point.y,
            });
        }
        let lon = point.x / self.world_size * 360.0 - 180.0;
        let n = PI * (1.0 - 2.0 * point.y / self.world_size);
        let lat = n.sinh().atan().to_degrees();
        Ok(Coordinate::new(lon, lat))
    }

    /// Polygons under the point, last-drawn first.
    fn query_features_at(&self, point: ScreenPoint) -> CoreResult<Vec<MapFeature>> {
        if !self.ready {
            return Err(RouteError::MapUnavailable);
        }
        let coordinate = self.unproject(point)?;
        Ok(self
            .features
            .iter()
            .rev()
            .filter(|feature| {
                feature
                    .geometry
                    .as_ref()
                    .is_some_and(|geometry| geometry.contains(coordinate))
            })
            .cloned()
            .collect())
    }

    fn query_all_features(&self, source_layer: Option<&str>) -> CoreResult<Vec<MapFeature>> {
        if !self.ready {
            return Err(RouteError::MapUnavailable);
        }
        Ok(self
            .features
            .iter()
            .filter(|feature| {
                source_layer.map_or(true, |layer| feature.source_layer.as_deref() == Some(layer))
            })
            .cloned()
            .collect())
    }

    fn bounds(&self) -> Option<BoundingBox> {
        self.viewport().or(self.extent)
    }

    fn fit_to(&self, bbox: BoundingBox, _padding_px: f64) -> CoreResult<()> {
        let mut viewport = self
            .viewport
            .write()
            .map_err(|_| RouteError::Query("viewport lock poisoned".into()))?;
        *viewport = Some(bbox);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "source_layer": "geometry",
                "properties": {"terrain": "land"},
                "geometry": {"type": "Polygon", "coordinates": [[[0,0],[10,0],[10,10],[0,10],[0,0]]]}
            },
            {
                "type": "Feature",
                "properties": {"layer": "geometry", "color": "#8AB4F8"},
                "geometry": {"type": "Polygon", "coordinates": [[[4,4],[6,4],[6,6],[4,6],[4,4]]]}
            },
            {
                "type": "Feature",
                "properties": {"layer": "line-labels", "type": "road"},
                "geometry": {"type": "LineString", "coordinates": [[1,1],[2,2]]}
            },
            {
                "type": "Feature",
                "properties": {},
                "geometry": {"type": "GeometryCollection", "geometries": []}
            }
        ]
    }"##;

    #[test]
    fn projection_round_trips() {
        let map = GeoJsonMap::from_geojson_str(SAMPLE, 6.0).unwrap();
        let coordinate = Coordinate::new(12.5, -33.25);
        let point = map.project(coordinate).unwrap();
        let back = map.unproject(point).unwrap();
        assert!((back.lon - coordinate.lon).abs() < 1e-9);
        assert!((back.lat - coordinate.lat).abs() < 1e-9);
    }

    #[test]
    fn rendered_query_returns_topmost_first() {
        let map = GeoJsonMap::from_geojson_str(SAMPLE, 6.0).unwrap();
        assert_eq!(map.feature_count(), 3);

        let point = map.project(Coordinate::new(5.0, 5.0)).unwrap();
        let features = map.query_features_at(point).unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].property_str("color"), Some("#8AB4F8"));

        let outside = map.project(Coordinate::new(20.0, 20.0)).unwrap();
        assert!(map.query_features_at(outside).unwrap().is_empty());
    }

    #[test]
    fn source_layer_filter_uses_property_fallback() {
        let map = GeoJsonMap::from_geojson_str(SAMPLE, 6.0).unwrap();
        assert_eq!(map.query_all_features(Some("geometry")).unwrap().len(), 2);
        assert_eq!(map.query_all_features(Some("line-labels")).unwrap().len(), 1);
        assert_eq!(map.query_all_features(None).unwrap().len(), 3);
    }

    #[test]
    fn fit_to_moves_the_viewport() {
        let map = GeoJsonMap::from_geojson_str(SAMPLE, 6.0).unwrap();
        assert_eq!(map.bounds().map(|b| b.east), Some(10.0));
        let bbox = BoundingBox {
            west: 1.0,
            south: 1.0,
            east: 2.0,
            north: 2.0,
        };
        map.fit_to(bbox, 50.0).unwrap();
        assert_eq!(map.bounds(), Some(bbox));
    }

    #[test]
    fn unavailable_map_is_never_ready() {
        let map = GeoJsonMap::unavailable(6.0);
        assert!(!map.is_ready());
        assert!(map.query_all_features(None).is_err());
    }
}
