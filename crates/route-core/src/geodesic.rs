//! Adaptive great-circle sampling between two coordinates.

use serde::{Deserialize, Serialize};

use crate::models::Coordinate;
use crate::spatial::{haversine_km, midpoint};

pub const DEFAULT_SAMPLE_INTERVAL_KM: f64 = 0.5;
pub const DEFAULT_MAX_DEPTH: u32 = 32;

/// Distances at or below this are treated as a single point.
const MIN_SPLIT_KM: f64 = 1e-9;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeodesicPathBuilder {
    pub sample_interval_km: f64,
    pub max_depth: u32,
}

impl Default for GeodesicPathBuilder {
    fn default() -> Self {
        Self {
            sample_interval_km: DEFAULT_SAMPLE_INTERVAL_KM,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

enum Frame {
    Split { a: Coordinate, b: Coordinate, depth: u32 },
    Emit(Coordinate),
}

impl GeodesicPathBuilder {
    pub fn new(sample_interval_km: f64) -> Self {
        Self {
            sample_interval_km,
            ..Self::default()
        }
    }

    /// Dense polyline from `start` to `end`, both included.
    ///
    /// Halves every span longer than the sample interval, emitting midpoints in
    /// path order. An explicit stack replaces recursion; `max_depth` bounds the
    /// subdivision for degenerate input.
    pub fn build_path(&self, start: Coordinate, end: Coordinate) -> Vec<Coordinate> {
        let interval = if self.sample_interval_km.is_finite() && self.sample_interval_km > 0.0 {
            self.sample_interval_km
        } else {
            DEFAULT_SAMPLE_INTERVAL_KM
        };

        let mut path = vec![start];
        let mut stack = vec![Frame::Split {
            a: start,
            b: end,
            depth: 0,
        }];

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Emit(point) => path.push(point),
                Frame::Split { a, b, depth } => {
                    let distance = haversine_km(a, b);
                    if !distance.is_finite()
                        || distance <= MIN_SPLIT_KM
                        || distance < interval
                        || depth >= self.max_depth
                    {
                        continue;
                    }
                    let mid = midpoint(a, b);
                    stack.push(Frame::Split {
                        a: mid,
                        b,
                        depth: depth + 1,
                    });
                    stack.push(Frame::Emit(mid));
                    stack.push(Frame::Split {
                        a,
                        b: mid,
                        depth: depth + 1,
                    });
                }
            }
        }

        path.push(end);
        path
    }
}
