//! Landmark points, landmark sets, and subject classes.
//!
//! Coordinates are normalized to `[0.0, 1.0]` relative to the detector's
//! input image. Values slightly outside that range are valid (a fingertip
//! at the frame edge) and are never clamped here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use posetrace_common::error::PosetraceError;

/// Detector category a landmark set belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectClass {
    Hand,
    Face,
    Body,
}

impl SubjectClass {
    pub const ALL: [SubjectClass; 3] = [Self::Hand, Self::Face, Self::Body];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hand => "hand",
            Self::Face => "face",
            Self::Body => "body",
        }
    }

    /// Landmark count produced by the standard detector for this class.
    pub fn default_landmark_count(&self) -> usize {
        match self {
            Self::Hand => 21,
            // Face mesh with iris refinement.
            Self::Face => 478,
            Self::Body => 33,
        }
    }
}

impl fmt::Display for SubjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubjectClass {
    type Err = PosetraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hand" | "hands" => Ok(Self::Hand),
            "face" | "faces" => Ok(Self::Face),
            "body" | "pose" => Ok(Self::Body),
            other => Err(PosetraceError::invalid_config(format!(
                "unknown subject class '{other}'"
            ))),
        }
    }
}

/// A single normalized landmark. `z` is depth-relative and optional.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

impl LandmarkPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    pub fn with_z(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z: Some(z) }
    }

    /// Whether every present coordinate is a finite number.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.map_or(true, f64::is_finite)
    }
}

/// One detected instance of a subject class: an ordered, fixed-length
/// sequence of landmarks.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    points: Vec<LandmarkPoint>,
}

impl LandmarkSet {
    pub fn new(points: Vec<LandmarkPoint>) -> Self {
        Self { points }
    }

    /// A set of `count` copies of the same point.
    pub fn filled(count: usize, point: LandmarkPoint) -> Self {
        Self {
            points: vec![point; count],
        }
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

    pub fn points(&self) -> &[LandmarkPoint] {
        &self.points
    }

    pub fn iter(&self) -> impl Iterator<Item = &LandmarkPoint> {
        self.points.iter()
    }

    pub fn into_points(self) -> Vec<LandmarkPoint> {
        self.points
    }

    /// Replace a single landmark, returning the set for chaining.
    pub fn with_point(mut self, index: usize, point: LandmarkPoint) -> Self {
        if let Some(slot) = self.points.get_mut(index) {
            *slot = point;
        }
        self
    }
}

impl From<Vec<LandmarkPoint>> for LandmarkSet {
    fn from(points: Vec<LandmarkPoint>) -> Self {
        Self::new(points)
    }
}
