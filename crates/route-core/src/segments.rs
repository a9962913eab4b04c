//! Grouping of classified samples into terrain segments.

use crate::models::{Coordinate, PathSegment, TerrainCategory};
use crate::spatial::haversine_km;

/// Accumulates samples in path order, cutting a new segment whenever the
/// category changes. Distance is summed as points are appended, so it only
/// covers spans inside a segment.
#[derive(Debug, Default)]
pub struct SegmentBuilder {
    finished: Vec<PathSegment>,
    current: Option<PathSegment>,
}

impl SegmentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, coordinate: Coordinate, category: TerrainCategory) {
        match self.current.as_mut() {
            Some(segment) if segment.category == category => {
                if let Some(&last) = segment.coordinates.last() {
                    segment.distance_km += haversine_km(last, coordinate);
                }
                segment.coordinates.push(coordinate);
            }
            _ => {
                let next = PathSegment {
                    category,
                    coordinates: vec![coordinate],
                    distance_km: 0.0,
                };
                if let Some(done) = self.current.replace(next) {
                    self.finished.push(done);
                }
            }
        }
    }

    pub fn finish(mut self) -> Vec<PathSegment> {
        if let Some(last) = self.current.take() {
            self.finished.push(last);
        }
        self.finished
    }
}

/// Classify every sample of `path` in order and group the results.
pub fn build_segments<F>(path: &[Coordinate], mut classify: F) -> Vec<PathSegment>
where
    F: FnMut(Coordinate) -> TerrainCategory,
{
    let mut builder = SegmentBuilder::new();
    for &coordinate in path {
        builder.push(coordinate, classify(coordinate));
    }
    builder.finish()
}

/// Collapse each run of water-family segments into one `Water` segment.
///
/// Land and unknown segments pass through untouched and separate runs.
/// Applying this twice gives the same result as applying it once.
pub fn merge_water(segments: Vec<PathSegment>) -> Vec<PathSegment> {
    let mut merged: Vec<PathSegment> = Vec::with_capacity(segments.len());
    for segment in segments {
        if !segment.category.is_water() {
            merged.push(segment);
            continue;
        }
        match merged.last_mut() {
            Some(previous) if previous.category == TerrainCategory::Water => {
                previous.coordinates.extend(segment.coordinates);
                previous.distance_km += segment.distance_km;
            }
            _ => merged.push(PathSegment {
                category: TerrainCategory::Water,
                ..segment
            }),
        }
    }
    merged
}
