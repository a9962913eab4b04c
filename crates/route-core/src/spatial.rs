//! Spherical geometry helpers. Distances are in kilometres.

use crate::models::Coordinate;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6_371.008_8;

/// Great-circle distance between two coordinates using the Haversine formula.
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let dphi = (b.lat - a.lat).to_radians();
    let dlambda = (b.lon - a.lon).to_radians();
    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Sum of great-circle distances between consecutive coordinates.
pub fn polyline_km(coordinates: &[Coordinate]) -> f64 {
    coordinates
        .windows(2)
        .map(|pair| haversine_km(pair[0], pair[1]))
        .sum()
}

/// Initial bearing from `a` to `b` in radians, 0 = north, π/2 = east.
pub fn bearing(a: Coordinate, b: Coordinate) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let delta_lambda = (b.lon - a.lon).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    x.atan2(y)
}

/// Destination reached by travelling `distance_km` from `origin` along `bearing_rad`.
pub fn offset_by_bearing(origin: Coordinate, distance_km: f64, bearing_rad: f64) -> Coordinate {
    if distance_km.abs() <= f64::EPSILON {
        return origin;
    }

    let lat1 = origin.lat.to_radians();
    let lon1 = origin.lon.to_radians();
    let angular_distance = distance_km / EARTH_RADIUS_KM;

    let sin_lat1 = lat1.sin();
    let cos_lat1 = lat1.cos();
    let sin_ad = angular_distance.sin();
    let cos_ad = angular_distance.cos();

    let sin_lat2 = sin_lat1 * cos_ad + cos_lat1 * sin_ad * bearing_rad.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();

    let y = bearing_rad.sin() * sin_ad * cos_lat1;
    let x = cos_ad - sin_lat1 * sin_lat2;
    let mut lon2 = lon1 + y.atan2(x);
    lon2 =
        (lon2 + std::f64::consts::PI).rem_euclid(2.0 * std::f64::consts::PI) - std::f64::consts::PI;

    Coordinate::new(lon2.to_degrees(), lat2.to_degrees())
}

/// Point halfway along the great circle from `a` to `b`.
pub fn midpoint(a: Coordinate, b: Coordinate) -> Coordinate {
    let distance = haversine_km(a, b);
    offset_by_bearing(a, distance / 2.0, bearing(a, b))
}

/// Ray-casting point-in-ring test on raw lon/lat.
pub fn ring_contains(ring: &[Coordinate], point: Coordinate) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let yi = ring[i].lat;
        let xi = ring[i].lon;
        let yj = ring[j].lat;
        let xj = ring[j].lon;

        if ((yi > point.lat) != (yj > point.lat))
            && (point.lon < (xj - xi) * (point.lat - yi) / (yj - yi) + xi)
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Polygon test: inside the outer ring and outside every hole.
pub fn polygon_contains(rings: &[Vec<Coordinate>], point: Coordinate) -> bool {
    let Some((outer, holes)) = rings.split_first() else {
        return false;
    };
    ring_contains(outer, point) && !holes.iter().any(|hole| ring_contains(hole, point))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // ~111km between these points (1 degree latitude)
        let dist = haversine_km(Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 1.0));
        assert!((dist - 111.19).abs() < 0.1);
    }

    #[test]
    fn test_haversine_same_point() {
        let point = Coordinate::new(-117.8265, 33.6846);
        assert!(haversine_km(point, point) < 1e-9);
    }

    #[test]
    fn midpoint_is_equidistant() {
        let a = Coordinate::new(-2.0, 10.0);
        let b = Coordinate::new(-1.0, 10.0);
        let mid = midpoint(a, b);
        let da = haversine_km(a, mid);
        let db = haversine_km(mid, b);
        assert!((da - db).abs() < 1e-6, "{da} vs {db}");
        assert!((da + db - haversine_km(a, b)).abs() < 1e-6);
    }

    #[test]
    fn polygon_with_hole_excludes_hole() {
        let outer = vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(10.0, 0.0),
            Coordinate::new(10.0, 10.0),
            Coordinate::new(0.0, 10.0),
            Coordinate::new(0.0, 0.0),
        ];
        let hole = vec![
            Coordinate::new(4.0, 4.0),
            Coordinate::new(6.0, 4.0),
            Coordinate::new(6.0, 6.0),
            Coordinate::new(4.0, 6.0),
            Coordinate::new(4.0, 4.0),
        ];
        let rings = vec![outer, hole];
        assert!(polygon_contains(&rings, Coordinate::new(2.0, 2.0)));
        assert!(!polygon_contains(&rings, Coordinate::new(5.0, 5.0)));
        assert!(!polygon_contains(&rings, Coordinate::new(12.0, 5.0)));
    }
}
