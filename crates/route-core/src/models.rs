//! Core data models for route computation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreResult, RouteError};

/// A geographic position in degrees.
///
/// Serialized as a `[lon, lat]` pair. Extra ordinates (altitude) are accepted
/// on input and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "[f64; 2]")]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Reject non-finite values and latitudes outside [-90, 90].
    pub fn validate(&self) -> CoreResult<()> {
        if !self.lon.is_finite() || !self.lat.is_finite() || self.lat.abs() > 90.0 {
            return Err(RouteError::InvalidCoordinate {
                lon: self.lon,
                lat: self.lat,
            });
        }
        Ok(())
    }
}

impl TryFrom<Vec<f64>> for Coordinate {
    type Error = String;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        match values.as_slice() {
            [lon, lat, ..] => Ok(Self::new(*lon, *lat)),
            _ => Err(format!(
                "position needs at least 2 ordinates, got {}",
                values.len()
            )),
        }
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(coordinate: Coordinate) -> Self {
        [coordinate.lon, coordinate.lat]
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lon, lat): (f64, f64)) -> Self {
        Self::new(lon, lat)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.4}, {:.4}]", self.lon, self.lat)
    }
}

/// Terrain classification of a single sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerrainCategory {
    Land,
    River,
    ShallowWater,
    LowSea,
    DeepSea,
    /// Produced only by merging adjacent water segments.
    Water,
    Unknown,
}

impl TerrainCategory {
    pub fn is_water(self) -> bool {
        matches!(
            self,
            Self::River | Self::ShallowWater | Self::LowSea | Self::DeepSea | Self::Water
        )
    }

    pub fn is_known(self) -> bool {
        self != Self::Unknown
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Land => "land",
            Self::River => "river",
            Self::ShallowWater => "shallow-water",
            Self::LowSea => "low-sea",
            Self::DeepSea => "deep-sea",
            Self::Water => "water",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TerrainCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A contiguous run of samples sharing one terrain category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSegment {
    pub category: TerrainCategory,
    pub coordinates: Vec<Coordinate>,
    pub distance_km: f64,
}

/// Outcome of a route computation. Always well-formed, even on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    pub full_path: Vec<Coordinate>,
    pub segments: Vec<PathSegment>,
    pub total_distance_km: f64,
    pub land_distance_km: f64,
    pub water_distance_km: f64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RouteResult {
    /// Build a successful result; totals are derived from the segments.
    pub fn from_segments(full_path: Vec<Coordinate>, segments: Vec<PathSegment>) -> Self {
        let mut total = 0.0;
        let mut land = 0.0;
        let mut water = 0.0;
        for segment in &segments {
            total += segment.distance_km;
            if segment.category == TerrainCategory::Land {
                land += segment.distance_km;
            } else {
                water += segment.distance_km;
            }
        }

        Self {
            full_path,
            segments,
            total_distance_km: total,
            land_distance_km: land,
            water_distance_km: water,
            success: true,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            full_path: Vec::new(),
            segments: Vec::new(),
            total_distance_km: 0.0,
            land_distance_km: 0.0,
            water_distance_km: 0.0,
            success: false,
            message: Some(message.into()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// A way of travelling with land/water speed capabilities (km/day, 0 = incapable).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelMode {
    pub id: String,
    pub name: String,
    pub land_speed_km_per_day: f64,
    pub water_speed_km_per_day: f64,
    #[serde(default)]
    pub requires_ferry_for_water: bool,
}

impl TravelMode {
    pub fn new(
        id: &str,
        name: &str,
        land_speed_km_per_day: f64,
        water_speed_km_per_day: f64,
        requires_ferry_for_water: bool,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            land_speed_km_per_day,
            water_speed_km_per_day,
            requires_ferry_for_water,
        }
    }

    /// Built-in modes, in presentation order.
    pub fn builtin() -> Vec<TravelMode> {
        vec![
            TravelMode::new("foot", "On Foot", 30.0, 0.0, true),
            TravelMode::new("horse", "Horseback", 60.0, 0.0, true),
            TravelMode::new("wagon", "Wagon/Cart", 40.0, 0.0, true),
            TravelMode::new("ship", "Ship/Boat", 0.0, 150.0, false),
            TravelMode::new("mixed", "Mixed (Walk + Ferry)", 30.0, 150.0, false),
        ]
    }
}

/// Travel-time breakdown for one mode. `total_days` is infinite when the mode
/// cannot traverse the route; it serializes as `null` in that case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelTimeResult {
    pub total_days: f64,
    pub land_days: f64,
    pub water_days: f64,
    pub mode: String,
    pub description: String,
}

impl TravelTimeResult {
    pub fn is_feasible(&self) -> bool {
        self.total_days.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(category: TerrainCategory, distance_km: f64) -> PathSegment {
        PathSegment {
            category,
            coordinates: vec![Coordinate::new(0.0, 0.0)],
            distance_km,
        }
    }

    #[test]
    fn coordinate_round_trips_as_pair() {
        let coordinate = Coordinate::new(-2.5, 10.25);
        let json = serde_json::to_string(&coordinate).unwrap();
        assert_eq!(json, "[-2.5,10.25]");

        let parsed: Coordinate = serde_json::from_str("[-2.5, 10.25, 120.0]").unwrap();
        assert_eq!(parsed, coordinate);
        assert!(serde_json::from_str::<Coordinate>("[1.0]").is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_latitude() {
        assert!(Coordinate::new(10.0, 91.0).validate().is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).validate().is_err());
        assert!(Coordinate::new(200.0, 45.0).validate().is_ok());
    }

    #[test]
    fn totals_split_land_and_everything_else() {
        let result = RouteResult::from_segments(
            Vec::new(),
            vec![
                segment(TerrainCategory::Land, 10.0),
                segment(TerrainCategory::DeepSea, 4.0),
                segment(TerrainCategory::Unknown, 1.0),
            ],
        );
        assert!(result.success);
        assert!((result.total_distance_km - 15.0).abs() < 1e-9);
        assert!((result.land_distance_km - 10.0).abs() < 1e-9);
        assert!((result.water_distance_km - 5.0).abs() < 1e-9);
    }

    #[test]
    fn terrain_category_uses_kebab_case() {
        let json = serde_json::to_string(&TerrainCategory::ShallowWater).unwrap();
        assert_eq!(json, "\"shallow-water\"");
        assert!(TerrainCategory::River.is_water());
        assert!(!TerrainCategory::Land.is_water());
        assert!(!TerrainCategory::Unknown.is_water());
    }
}
