//! Client library for the route server.

pub mod client;

pub use client::RouteClient;

use anyhow::{bail, Context, Result};
use route_core::Coordinate;

/// Parse a `lon,lat` argument into a validated coordinate.
pub fn parse_coordinate(text: &str) -> Result<Coordinate> {
    let Some((lon, lat)) = text.split_once(',') else {
        bail!("expected LON,LAT but got '{}'", text);
    };
    let lon: f64 = lon
        .trim()
        .parse()
        .with_context(|| format!("invalid longitude '{}'", lon.trim()))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .with_context(|| format!("invalid latitude '{}'", lat.trim()))?;
    let coordinate = Coordinate::new(lon, lat);
    coordinate.validate()?;
    Ok(coordinate)
}

/// Render a day count that may be `null` for infeasible modes.
pub fn format_days(value: &serde_json::Value) -> String {
    match value.as_f64() {
        Some(days) => format!("{:.1}", days),
        None => "n/a".to_string(),
    }
}
