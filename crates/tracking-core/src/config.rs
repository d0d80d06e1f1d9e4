//! Pipeline configuration.
//!
//! Everything here is checked once, when a pipeline is built; per-frame
//! processing never fails on configuration.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use posetrace_common::error::{PosetraceError, PosetraceResult};
use posetrace_landmark_model::landmark::SubjectClass;
use posetrace_landmark_model::names::LandmarkNames;
use posetrace_landmark_model::viewport::DestRect;

use crate::relation::{LandmarkCatalog, LandmarkSelector, RelationEvaluator, RelationSpec};
use crate::smoothing::SmoothingRate;

/// Settings of one subject class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassConfig {
    /// Smoothing rate in (0, 1].
    pub smoothing_rate: f64,

    /// Expected landmark count of every set of this class.
    pub landmark_count: usize,

    /// Name → index table for relation queries.
    #[serde(default)]
    pub landmark_names: LandmarkNames,
}

impl ClassConfig {
    /// Standard detector layout with a class-appropriate smoothing rate.
    pub fn standard(class: SubjectClass) -> Self {
        let smoothing_rate = match class {
            SubjectClass::Hand => 0.5,
            SubjectClass::Face => 0.4,
            SubjectClass::Body => 0.2,
        };
        Self {
            smoothing_rate,
            landmark_count: class.default_landmark_count(),
            landmark_names: LandmarkNames::standard(class),
        }
    }

    pub fn rate(&self) -> PosetraceResult<SmoothingRate> {
        SmoothingRate::new(self.smoothing_rate)
    }

    pub fn validate(&self, class: SubjectClass) -> PosetraceResult<()> {
        self.rate().map_err(|e| {
            PosetraceError::invalid_config(format!("{class}: {e}"))
        })?;
        if self.landmark_count == 0 {
            return Err(PosetraceError::invalid_config(format!(
                "{class}: landmark_count must be positive"
            )));
        }
        self.landmark_names.validate(class, self.landmark_count)
    }
}

/// Full configuration surface of a tracking pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Flip horizontally before mapping (front-facing cameras).
    pub mirror: bool,

    /// Where the feed is drawn, in pixels.
    pub dest_rect: DestRect,

    /// Per-class settings. Classes not listed use their standard settings
    /// when they first appear in a frame.
    pub classes: BTreeMap<SubjectClass, ClassConfig>,

    /// Points reported in every frame output.
    #[serde(default)]
    pub tracked_points: Vec<LandmarkSelector>,

    /// Named relations evaluated every frame.
    #[serde(default)]
    pub relations: BTreeMap<String, RelationSpec>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let index_0 = LandmarkSelector::new(SubjectClass::Hand, 0, "index_finger_tip");
        let index_1 = LandmarkSelector::new(SubjectClass::Hand, 1, "index_finger_tip");
        let nose_tip = LandmarkSelector::new(SubjectClass::Face, 0, "nose_tip");
        let body = |name: &str| LandmarkSelector::new(SubjectClass::Body, 0, name);

        Self {
            mirror: true,
            dest_rect: DestRect {
                offset_x: 0.0,
                offset_y: 0.0,
                width: 640.0,
                height: 480.0,
            },
            classes: SubjectClass::ALL
                .into_iter()
                .map(|class| (class, ClassConfig::standard(class)))
                .collect(),
            tracked_points: vec![
                index_0.clone(),
                index_1.clone(),
                nose_tip.clone(),
                body("nose"),
                body("left_wrist"),
                body("right_wrist"),
            ],
            relations: BTreeMap::from([
                (
                    "index_fingers_touch".to_string(),
                    RelationSpec::contact(index_0.clone(), index_1.clone(), 100.0),
                ),
                (
                    "nose_tickle".to_string(),
                    RelationSpec::AnyContact {
                        points: vec![index_0, index_1],
                        target: nose_tip,
                        threshold_px: 100.0,
                    },
                ),
            ]),
        }
    }
}

impl PipelineConfig {
    /// Load a JSON config file and validate it.
    pub fn load(path: &Path) -> PosetraceResult<Self> {
        if !path.exists() {
            return Err(PosetraceError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty JSON.
    pub fn save(&self, path: &Path) -> PosetraceResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Settings for `class`: configured, or the standard ones.
    pub fn class_config(&self, class: SubjectClass) -> ClassConfig {
        self.classes
            .get(&class)
            .cloned()
            .unwrap_or_else(|| ClassConfig::standard(class))
    }

    /// Name tables of every configured class.
    pub fn catalog(&self) -> LandmarkCatalog {
        LandmarkCatalog::new(
            self.classes
                .iter()
                .map(|(class, config)| (*class, config.landmark_names.clone()))
                .collect(),
        )
    }

    /// Check every rule: rect size, rates, counts, names, thresholds.
    pub fn validate(&self) -> PosetraceResult<()> {
        self.dest_rect.validate()?;
        for (class, config) in &self.classes {
            config.validate(*class)?;
        }

        let catalog = self.catalog();
        for selector in &self.tracked_points {
            catalog.resolve(selector)?;
        }
        RelationEvaluator::new(&self.relations, &catalog)?;
        Ok(())
    }
}
