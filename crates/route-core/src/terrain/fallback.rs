//! Coordinate-only terrain heuristic used when the map cannot answer.
//!
//! The regions are hand-drawn boxes around the named seas and oceans of the
//! world map. They are data, not logic: swap in polygon data by implementing
//! [`FallbackClassifier`].

use serde::{Deserialize, Serialize};

use crate::models::{Coordinate, TerrainCategory};

pub trait FallbackClassifier: Send + Sync {
    fn classify(&self, coordinate: Coordinate) -> TerrainCategory;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
    pub category: TerrainCategory,
}

impl Region {
    fn new(
        name: &str,
        (min_lon, max_lon): (f64, f64),
        (min_lat, max_lat): (f64, f64),
        category: TerrainCategory,
    ) -> Self {
        Self {
            name: name.to_string(),
            min_lon,
            max_lon,
            min_lat,
            max_lat,
            category,
        }
    }

    /// Open-interval test, matching the hand-drawn boundaries.
    pub fn contains(&self, coordinate: Coordinate) -> bool {
        coordinate.lon > self.min_lon
            && coordinate.lon < self.max_lon
            && coordinate.lat > self.min_lat
            && coordinate.lat < self.max_lat
    }
}

/// Ordered region list; the first match wins, unmatched points are land.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionFallback {
    pub regions: Vec<Region>,
}

impl RegionFallback {
    pub fn new(regions: Vec<Region>) -> Self {
        Self { regions }
    }

    pub fn matching_region(&self, coordinate: Coordinate) -> Option<&Region> {
        self.regions.iter().find(|region| region.contains(coordinate))
    }
}

impl Default for RegionFallback {
    fn default() -> Self {
        use TerrainCategory::{DeepSea, Land, LowSea, ShallowWater};
        const INF: f64 = f64::INFINITY;

        Self::new(vec![
            // Land exclusions go first so they override the seas around them.
            Region::new("Escadar island", (-2.0, 0.5), (31.5, 32.5), Land),
            Region::new("Absalom channel", (18.0, 25.0), (40.0, 45.0), ShallowWater),
            Region::new("Escadar approach", (-1.5, -0.5), (31.0, 32.5), ShallowWater),
            Region::new("Inner Sea", (3.0, 38.0), (33.0, 52.0), LowSea),
            Region::new("Steaming Sea", (15.0, 45.0), (20.0, 35.0), LowSea),
            Region::new("Fever Sea", (-5.0, 10.0), (38.0, 48.0), LowSea),
            Region::new("Obari Ocean", (60.0, 100.0), (-20.0, 40.0), DeepSea),
            // Unwrapped longitudes past the antimeridian.
            Region::new("Arcadian Ocean east", (180.0, INF), (-INF, INF), DeepSea),
            Region::new("Arcadian Ocean west", (-INF, -180.0), (-INF, INF), DeepSea),
            Region::new("Embaral Ocean east", (140.0, INF), (-INF, INF), DeepSea),
            Region::new("Embaral Ocean west", (-INF, -140.0), (-INF, INF), DeepSea),
            Region::new("Antarkos Ocean", (-INF, INF), (-INF, -60.0), DeepSea),
        ])
    }
}

impl FallbackClassifier for RegionFallback {
    fn classify(&self, coordinate: Coordinate) -> TerrainCategory {
        self.matching_region(coordinate)
            .map(|region| region.category)
            .unwrap_or(TerrainCategory::Land)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_land_defaults_to_land() {
        let fallback = RegionFallback::default();
        assert_eq!(fallback.classify(Coordinate::new(-2.0, 10.0)), TerrainCategory::Land);
    }

    #[test]
    fn named_seas_are_water() {
        let fallback = RegionFallback::default();
        assert_eq!(fallback.classify(Coordinate::new(20.0, 42.0)), TerrainCategory::ShallowWater);
        assert_eq!(fallback.classify(Coordinate::new(30.0, 36.0)), TerrainCategory::LowSea);
        assert_eq!(fallback.classify(Coordinate::new(80.0, 0.0)), TerrainCategory::DeepSea);
        assert_eq!(fallback.classify(Coordinate::new(0.0, -75.0)), TerrainCategory::DeepSea);
        assert_eq!(fallback.classify(Coordinate::new(-170.0, 0.0)), TerrainCategory::DeepSea);
    }

    #[test]
    fn escadar_island_overrides_surrounding_water() {
        let fallback = RegionFallback::default();
        let escadar = Coordinate::new(-0.9841, 31.9528);
        assert_eq!(fallback.classify(escadar), TerrainCategory::Land);
        assert_eq!(
            fallback.matching_region(escadar).map(|r| r.name.as_str()),
            Some("Escadar island")
        );
    }

    #[test]
    fn unwrapped_longitudes_report_arcadian_ocean() {
        let fallback = RegionFallback::default();
        let name = |lon: f64| {
            fallback
                .matching_region(Coordinate::new(lon, 0.0))
                .map(|region| region.name.as_str())
        };
        assert_eq!(name(190.0), Some("Arcadian Ocean east"));
        assert_eq!(name(-200.0), Some("Arcadian Ocean west"));
        assert_eq!(name(150.0), Some("Embaral Ocean east"));
    }
}
