//! Relations between mapped landmarks: distances and contact events.
//!
//! Relations are evaluated in pixel space so that thresholds scale with the
//! rendered size. A relation whose endpoints are not available this frame
//! reads as `Unavailable`; missing points are never treated as the origin.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use posetrace_common::error::{PosetraceError, PosetraceResult};
use posetrace_landmark_model::landmark::SubjectClass;
use posetrace_landmark_model::names::LandmarkNames;
use posetrace_landmark_model::viewport::{DestRect, PixelPoint, Region};

use crate::output::Reading;

/// Euclidean distance between two pixel points.
pub fn distance(a: &PixelPoint, b: &PixelPoint) -> f64 {
    a.distance_to(b)
}

/// Contact fires strictly below the threshold.
pub fn contact_event(a: &PixelPoint, b: &PixelPoint, threshold_px: f64) -> bool {
    distance(a, b) < threshold_px
}

/// A named landmark reference, written `class:instance:name`
/// (e.g. `hand:0:index_finger_tip`). `class:name` means instance 0.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LandmarkSelector {
    pub class: SubjectClass,
    pub instance: usize,
    pub landmark: String,
}

impl LandmarkSelector {
    pub fn new(class: SubjectClass, instance: usize, landmark: impl Into<String>) -> Self {
        Self {
            class,
            instance,
            landmark: landmark.into(),
        }
    }
}

impl fmt::Display for LandmarkSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.class, self.instance, self.landmark)
    }
}

impl FromStr for LandmarkSelector {
    type Err = PosetraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        let (class, instance, landmark) = match parts.as_slice() {
            [class, landmark] => (*class, "0", *landmark),
            [class, instance, landmark] => (*class, *instance, *landmark),
            _ => {
                return Err(PosetraceError::invalid_config(format!(
                    "landmark selector '{s}' must look like class:instance:name"
                )))
            }
        };

        let instance = instance.parse::<usize>().map_err(|_| {
            PosetraceError::invalid_config(format!(
                "landmark selector '{s}' has a non-numeric instance '{instance}'"
            ))
        })?;
        if landmark.is_empty() {
            return Err(PosetraceError::invalid_config(format!(
                "landmark selector '{s}' has an empty landmark name"
            )));
        }

        Ok(Self {
            class: class.parse()?,
            instance,
            landmark: landmark.to_string(),
        })
    }
}

impl TryFrom<String> for LandmarkSelector {
    type Error = PosetraceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LandmarkSelector> for String {
    fn from(selector: LandmarkSelector) -> Self {
        selector.to_string()
    }
}

/// A resolved landmark reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointRef {
    pub class: SubjectClass,
    pub instance: usize,
    pub index: usize,
}

/// Name tables for every class, used to resolve selectors.
#[derive(Debug, Clone, Default)]
pub struct LandmarkCatalog {
    tables: BTreeMap<SubjectClass, LandmarkNames>,
}

impl LandmarkCatalog {
    pub fn new(tables: BTreeMap<SubjectClass, LandmarkNames>) -> Self {
        Self { tables }
    }

    /// Resolve a selector. Classes without a configured table use the
    /// standard one.
    pub fn resolve(&self, selector: &LandmarkSelector) -> PosetraceResult<PointRef> {
        let index = match self.tables.get(&selector.class) {
            Some(names) => names.resolve(selector.class, &selector.landmark)?,
            None => LandmarkNames::standard(selector.class)
                .resolve(selector.class, &selector.landmark)?,
        };
        Ok(PointRef {
            class: selector.class,
            instance: selector.instance,
            index,
        })
    }
}

/// Configured relation between landmarks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelationSpec {
    /// Two points closer than `threshold_px`.
    Contact {
        a: LandmarkSelector,
        b: LandmarkSelector,
        threshold_px: f64,
    },
    /// Any of `points` closer than `threshold_px` to `target`.
    AnyContact {
        points: Vec<LandmarkSelector>,
        target: LandmarkSelector,
        threshold_px: f64,
    },
    /// A point inside a region of the destination rect.
    Within {
        point: LandmarkSelector,
        region: Region,
    },
}

impl RelationSpec {
    pub fn contact(a: LandmarkSelector, b: LandmarkSelector, threshold_px: f64) -> Self {
        Self::Contact { a, b, threshold_px }
    }

    fn resolve(&self, name: &str, catalog: &LandmarkCatalog) -> PosetraceResult<ResolvedRelation> {
        match self {
            Self::Contact { a, b, threshold_px } => Ok(ResolvedRelation::Contact {
                a: catalog.resolve(a)?,
                b: catalog.resolve(b)?,
                threshold_px: check_threshold(name, *threshold_px)?,
            }),
            Self::AnyContact {
                points,
                target,
                threshold_px,
            } => {
                if points.is_empty() {
                    return Err(PosetraceError::invalid_config(format!(
                        "relation '{name}' needs at least one point"
                    )));
                }
                Ok(ResolvedRelation::AnyContact {
                    points: points
                        .iter()
                        .map(|p| catalog.resolve(p))
                        .collect::<PosetraceResult<Vec<_>>>()?,
                    target: catalog.resolve(target)?,
                    threshold_px: check_threshold(name, *threshold_px)?,
                })
            }
            Self::Within { point, region } => Ok(ResolvedRelation::Within {
                point: catalog.resolve(point)?,
                region: check_region(name, region)?,
            }),
        }
    }
}

fn check_threshold(name: &str, threshold_px: f64) -> PosetraceResult<f64> {
    if threshold_px.is_finite() && threshold_px >= 0.0 {
        Ok(threshold_px)
    } else {
        Err(PosetraceError::invalid_config(format!(
            "relation '{name}' has invalid threshold {threshold_px} (must be a non-negative pixel distance)"
        )))
    }
}

fn check_region(name: &str, region: &Region) -> PosetraceResult<Region> {
    region.validate().map_err(|e| {
        PosetraceError::invalid_config(format!("relation '{name}' has an invalid region: {e}"))
    })?;
    Ok(*region)
}

#[derive(Debug, Clone, PartialEq)]
enum ResolvedRelation {
    Contact {
        a: PointRef,
        b: PointRef,
        threshold_px: f64,
    },
    AnyContact {
        points: Vec<PointRef>,
        target: PointRef,
        threshold_px: f64,
    },
    Within {
        point: PointRef,
        region: Region,
    },
}

/// Value of a relation for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelationValue {
    Contact {
        distance_px: f64,
        midpoint: PixelPoint,
        active: bool,
    },
    AnyContact {
        /// Distance of the closest available point to the target.
        nearest_px: f64,
        /// Position of that point in the configured list.
        nearest: usize,
        active: bool,
    },
    Within {
        point: PixelPoint,
        inside: bool,
    },
}

impl RelationValue {
    /// The boolean event.
    pub fn active(&self) -> bool {
        match self {
            Self::Contact { active, .. } | Self::AnyContact { active, .. } => *active,
            Self::Within { inside, .. } => *inside,
        }
    }

    /// Underlying distance, for distance-based relations.
    pub fn distance_px(&self) -> Option<f64> {
        match self {
            Self::Contact { distance_px, .. } => Some(*distance_px),
            Self::AnyContact { nearest_px, .. } => Some(*nearest_px),
            Self::Within { .. } => None,
        }
    }
}

/// A relation's reading for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationOutput {
    pub name: String,
    #[serde(flatten)]
    pub reading: Reading<RelationValue>,
}

/// Source of mapped points for relation evaluation.
pub trait PointLookup {
    /// Pixel position of a landmark, or `None` when unavailable this frame.
    fn pixel(&self, point: &PointRef) -> Option<PixelPoint>;
}

/// Evaluates every configured relation against one frame's mapped points.
#[derive(Debug, Clone, Default)]
pub struct RelationEvaluator {
    relations: Vec<(String, ResolvedRelation)>,
}

impl RelationEvaluator {
    /// Resolve every relation up front; unknown names and bad thresholds fail here.
    pub fn new(
        relations: &BTreeMap<String, RelationSpec>,
        catalog: &LandmarkCatalog,
    ) -> PosetraceResult<Self> {
        let relations = relations
            .iter()
            .map(|(name, spec)| Ok((name.clone(), spec.resolve(name, catalog)?)))
            .collect::<PosetraceResult<Vec<_>>>()?;
        Ok(Self { relations })
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    pub fn evaluate(&self, lookup: &impl PointLookup, dest: &DestRect) -> Vec<RelationOutput> {
        self.relations
            .iter()
            .map(|(name, relation)| RelationOutput {
                name: name.clone(),
                reading: evaluate_one(relation, lookup, dest).into(),
            })
            .collect()
    }
}

fn evaluate_one(
    relation: &ResolvedRelation,
    lookup: &impl PointLookup,
    dest: &DestRect,
) -> Option<RelationValue> {
    match relation {
        ResolvedRelation::Contact { a, b, threshold_px } => {
            let a = lookup.pixel(a)?;
            let b = lookup.pixel(b)?;
            Some(RelationValue::Contact {
                distance_px: distance(&a, &b),
                midpoint: PixelPoint::midpoint(&a, &b),
                active: contact_event(&a, &b, *threshold_px),
            })
        }
        ResolvedRelation::AnyContact {
            points,
            target,
            threshold_px,
        } => {
            let target = lookup.pixel(target)?;
            let (nearest, nearest_px) = points
                .iter()
                .enumerate()
                .filter_map(|(i, p)| lookup.pixel(p).map(|p| (i, distance(&p, &target))))
                .min_by(|a, b| a.1.total_cmp(&b.1))?;
            Some(RelationValue::AnyContact {
                nearest_px,
                nearest,
                active: nearest_px < *threshold_px,
            })
        }
        ResolvedRelation::Within { point, region } => {
            let point = lookup.pixel(point)?;
            Some(RelationValue::Within {
                point,
                inside: region.to_pixel_rect(dest).contains(&point),
            })
        }
    }
}
