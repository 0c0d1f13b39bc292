//! Landmark and classification value types shared across the pipeline

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// A single tracked landmark point.
///
/// `x`/`y`/`z` are normalized image coordinates for screen-space streams
/// and meters for world-space streams; consumers know which flavor they
/// subscribed to. `visibility` is the graph's confidence that the point
/// is actually visible in frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    #[serde(default)]
    pub visibility: f32,
}

impl LandmarkPoint {
    pub fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self {
            x,
            y,
            z,
            visibility,
        }
    }

    /// Position as a vector, dropping visibility.
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

/// An ordered set of landmarks for one stream on one frame.
///
/// The index is the anatomical id assigned by the graph; it is preserved
/// through distribution so consumers can address points positionally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkSet {
    points: Vec<LandmarkPoint>,
}

impl LandmarkSet {
    pub fn new(points: Vec<LandmarkPoint>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LandmarkPoint> {
        self.points.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LandmarkPoint> {
        self.points.iter()
    }

    pub fn points(&self) -> &[LandmarkPoint] {
        &self.points
    }
}

impl FromIterator<LandmarkPoint> for LandmarkSet {
    fn from_iter<T: IntoIterator<Item = LandmarkPoint>>(iter: T) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

/// A single classification result (label plus confidence).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub score: f32,
}

impl Classification {
    pub fn new(label: &str, score: f32) -> Self {
        Self {
            label: label.to_string(),
            score,
        }
    }
}

/// Classification results for one frame (e.g. facial emotions).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationSet {
    pub entries: Vec<Classification>,
}

impl ClassificationSet {
    pub fn new(entries: Vec<Classification>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest-scoring entry, if any.
    pub fn top(&self) -> Option<&Classification> {
        self.entries
            .iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
    }
}
