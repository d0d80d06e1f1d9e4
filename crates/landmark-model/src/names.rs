//! Landmark name tables.
//!
//! Relation queries refer to landmarks by name ("index_finger_tip") rather
//! than by raw index. Each subject class has a name → index table; the
//! standard tables follow the common hand (21), pose (33) and face mesh
//! (478) layouts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use posetrace_common::error::{PosetraceError, PosetraceResult};

use crate::landmark::SubjectClass;

/// Hand landmarks in detector order.
pub const HAND_LANDMARKS: [&str; 21] = [
    "wrist",
    "thumb_cmc",
    "thumb_mcp",
    "thumb_ip",
    "thumb_tip",
    "index_finger_mcp",
    "index_finger_pip",
    "index_finger_dip",
    "index_finger_tip",
    "middle_finger_mcp",
    "middle_finger_pip",
    "middle_finger_dip",
    "middle_finger_tip",
    "ring_finger_mcp",
    "ring_finger_pip",
    "ring_finger_dip",
    "ring_finger_tip",
    "pinky_mcp",
    "pinky_pip",
    "pinky_dip",
    "pinky_tip",
];

/// Body (pose) landmarks in detector order.
///
/// Left/right are the subject's own sides; on a mirrored feed they appear
/// swapped on screen.
pub const BODY_LANDMARKS: [&str; 33] = [
    "nose",
    "left_eye_inner",
    "left_eye",
    "left_eye_outer",
    "right_eye_inner",
    "right_eye",
    "right_eye_outer",
    "left_ear",
    "right_ear",
    "mouth_left",
    "mouth_right",
    "left_shoulder",
    "right_shoulder",
    "left_elbow",
    "right_elbow",
    "left_wrist",
    "right_wrist",
    "left_pinky",
    "right_pinky",
    "left_index",
    "right_index",
    "left_thumb",
    "right_thumb",
    "left_hip",
    "right_hip",
    "left_knee",
    "right_knee",
    "left_ankle",
    "right_ankle",
    "left_heel",
    "right_heel",
    "left_foot_index",
    "right_foot_index",
];

/// Named subset of the face mesh.
pub const FACE_LANDMARKS: [(&str, usize); 7] = [
    ("nose_tip", 4),
    ("upper_lip", 13),
    ("lower_lip", 14),
    ("mouth_left", 310),
    ("mouth_right", 78),
    ("left_iris", 473),
    ("right_iris", 468),
];

/// Name → index table for one subject class.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkNames {
    names: BTreeMap<String, usize>,
}

impl LandmarkNames {
    /// The standard table for a class.
    pub fn standard(class: SubjectClass) -> Self {
        match class {
            SubjectClass::Hand => Self::from_ordered(&HAND_LANDMARKS),
            SubjectClass::Body => Self::from_ordered(&BODY_LANDMARKS),
            SubjectClass::Face => Self::from_pairs(FACE_LANDMARKS),
        }
    }

    /// Build a table where each name's index is its position.
    pub fn from_ordered(names: &[&str]) -> Self {
        Self {
            names: names
                .iter()
                .enumerate()
                .map(|(index, name)| (name.to_string(), index))
                .collect(),
        }
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, usize)>) -> Self {
        Self {
            names: pairs
                .into_iter()
                .map(|(name, index)| (name.to_string(), index))
                .collect(),
        }
    }

    /// Add or replace a name.
    pub fn insert(&mut self, name: impl Into<String>, index: usize) {
        self.names.insert(name.into(), index);
    }

    /// Look up a name. Unknown names are a configuration error.
    pub fn resolve(&self, class: SubjectClass, name: &str) -> PosetraceResult<usize> {
        self.names.get(name).copied().ok_or_else(|| {
            PosetraceError::invalid_config(format!("unknown {class} landmark name '{name}'"))
        })
    }

    /// First name mapped to `index`, if any.
    pub fn name_of(&self, index: usize) -> Option<&str> {
        self.names
            .iter()
            .find(|&(_, &i)| i == index)
            .map(|(name, _)| name.as_str())
    }

    /// Check that every index fits a set of `landmark_count` points.
    pub fn validate(&self, class: SubjectClass, landmark_count: usize) -> PosetraceResult<()> {
        match self.names.iter().find(|&(_, &index)| index >= landmark_count) {
            Some((name, index)) => Err(PosetraceError::invalid_config(format!(
                "{class} landmark '{name}' maps to index {index}, but {class} sets have {landmark_count} points"
            ))),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.names.iter().map(|(name, &index)| (name.as_str(), index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_hand_table() {
        let names = LandmarkNames::standard(SubjectClass::Hand);
        assert_eq!(names.len(), 21);
        assert_eq!(names.resolve(SubjectClass::Hand, "wrist").unwrap(), 0);
        assert_eq!(names.resolve(SubjectClass::Hand, "thumb_tip").unwrap(), 4);
        assert_eq!(names.resolve(SubjectClass::Hand, "index_finger_tip").unwrap(), 8);
        assert_eq!(names.resolve(SubjectClass::Hand, "pinky_tip").unwrap(), 20);
    }

    #[test]
    fn test_standard_body_table() {
        let names = LandmarkNames::standard(SubjectClass::Body);
        assert_eq!(names.len(), 33);
        assert_eq!(names.resolve(SubjectClass::Body, "left_shoulder").unwrap(), 11);
        assert_eq!(names.resolve(SubjectClass::Body, "right_shoulder").unwrap(), 12);
        assert_eq!(names.resolve(SubjectClass::Body, "left_index").unwrap(), 19);
        assert_eq!(names.resolve(SubjectClass::Body, "right_foot_index").unwrap(), 32);
    }

    #[test]
    fn test_unknown_name_is_invalid_config() {
        let names = LandmarkNames::standard(SubjectClass::Face);
        let err = names.resolve(SubjectClass::Face, "chin").unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("chin"));
    }

    #[test]
    fn test_standard_tables_fit_default_counts() {
        for class in SubjectClass::ALL {
            LandmarkNames::standard(class)
                .validate(class, class.default_landmark_count())
                .unwrap();
        }
    }

    #[test]
    fn test_validate_rejects_index_past_count() {
        let names = LandmarkNames::standard(SubjectClass::Face);
        // A face model without iris refinement has 468 points.
        assert!(names.validate(SubjectClass::Face, 468).is_err());
    }

    #[test]
    fn test_name_of() {
        let names = LandmarkNames::standard(SubjectClass::Face);
        assert_eq!(names.name_of(4), Some("nose_tip"));
        assert_eq!(names.name_of(5), None);
    }

    #[test]
    fn test_table_is_a_json_object() {
        let mut names = LandmarkNames::default();
        names.insert("chin", 152);
        let json = serde_json::to_string(&names).unwrap();
        assert_eq!(json, r#"{"chin":152}"#);
    }
}
