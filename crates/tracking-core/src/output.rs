//! Per-frame pipeline output handed to the renderer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use posetrace_landmark_model::frame::TimestampNs;
use posetrace_landmark_model::landmark::SubjectClass;
use posetrace_landmark_model::viewport::{DestRect, PixelPoint};

use crate::fallback::TrackingState;
use crate::relation::{LandmarkSelector, PointLookup, PointRef, RelationOutput, RelationValue};

/// A value that may be unavailable this frame.
///
/// `Unavailable` is a normal outcome (class never detected, instance
/// missing), not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reading<T> {
    Available { value: T },
    Unavailable,
}

impl<T> Reading<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Available { value } => Some(value),
            Self::Unavailable => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Available { value } => Some(value),
            Self::Unavailable => None,
        }
    }
}

impl<T> From<Option<T>> for Reading<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Available { value },
            None => Self::Unavailable,
        }
    }
}

/// Output of one subject class for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassOutput {
    pub state: TrackingState,

    /// Mapped landmarks per instance. Empty in NO_DATA.
    pub instances: Vec<Vec<PixelPoint>>,

    /// Consecutive frames spent STALE.
    pub stale_frames: u64,

    /// Timestamp of the last LIVE frame.
    pub last_live_ns: Option<TimestampNs>,

    /// Whether this frame's data for the class was rejected as malformed.
    #[serde(default)]
    pub rejected: bool,
}

impl ClassOutput {
    pub fn point(&self, instance: usize, index: usize) -> Option<PixelPoint> {
        self.instances.get(instance)?.get(index).copied()
    }
}

/// A requested named point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOutput {
    pub selector: LandmarkSelector,
    #[serde(flatten)]
    pub reading: Reading<PixelPoint>,
}

/// Unified result for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameOutput {
    pub timestamp_ns: TimestampNs,
    pub dest_rect: DestRect,
    pub classes: BTreeMap<SubjectClass, ClassOutput>,
    pub points: Vec<PointOutput>,
    pub relations: Vec<RelationOutput>,
}

impl FrameOutput {
    pub fn class(&self, class: SubjectClass) -> Option<&ClassOutput> {
        self.classes.get(&class)
    }

    /// State of a class; classes the pipeline has never seen are NO_DATA.
    pub fn state(&self, class: SubjectClass) -> TrackingState {
        self.classes
            .get(&class)
            .map(|c| c.state)
            .unwrap_or(TrackingState::NoData)
    }

    /// Reading of a requested point by selector.
    pub fn point(&self, selector: &LandmarkSelector) -> Option<&Reading<PixelPoint>> {
        self.points
            .iter()
            .find(|p| &p.selector == selector)
            .map(|p| &p.reading)
    }

    /// Reading of a relation by name.
    pub fn relation(&self, name: &str) -> Option<&Reading<RelationValue>> {
        self.relations
            .iter()
            .find(|r| r.name == name)
            .map(|r| &r.reading)
    }

    /// Names of relations whose event fired this frame.
    pub fn active_relations(&self) -> impl Iterator<Item = &str> {
        self.relations
            .iter()
            .filter(|r| r.reading.value().is_some_and(RelationValue::active))
            .map(|r| r.name.as_str())
    }
}

impl PointLookup for FrameOutput {
    fn pixel(&self, point: &PointRef) -> Option<PixelPoint> {
        self.classes
            .get(&point.class)?
            .point(point.instance, point.index)
    }
}
