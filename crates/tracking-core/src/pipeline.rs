//! Multi-subject composition.
//!
//! A `TrackingPipeline` owns one `ClassPipeline` per subject class. Each class
//! pipeline has its own filter and fallback state; the mapper is shared
//! because every class is drawn into the same destination rect.

use std::collections::BTreeMap;

use posetrace_common::error::{PosetraceError, PosetraceResult};
use posetrace_landmark_model::frame::{Frame, TimestampNs};
use posetrace_landmark_model::landmark::{LandmarkSet, SubjectClass};
use posetrace_landmark_model::viewport::DestRect;

use crate::config::{ClassConfig, PipelineConfig};
use crate::fallback::{ClassSnapshot, FallbackCache, TrackingState};
use crate::handoff::FrameReader;
use crate::mapper::CoordinateMapper;
use crate::output::{ClassOutput, FrameOutput, PointOutput};
use crate::relation::{LandmarkSelector, PointLookup, PointRef, RelationEvaluator};
use crate::smoothing::{SmoothingRate, TemporalFilter};

/// Filter and fallback state of one subject class.
#[derive(Debug, Clone)]
pub struct ClassPipeline {
    class: SubjectClass,
    landmark_count: usize,
    filter: TemporalFilter,
    fallback: FallbackCache,
    rejected_frames: u64,
    last_rejected: bool,
}

impl ClassPipeline {
    pub fn new(class: SubjectClass, rate: SmoothingRate, landmark_count: usize) -> Self {
        Self {
            class,
            landmark_count,
            filter: TemporalFilter::new(rate),
            fallback: FallbackCache::new(),
            rejected_frames: 0,
            last_rejected: false,
        }
    }

    pub fn from_config(class: SubjectClass, config: &ClassConfig) -> PosetraceResult<Self> {
        config.validate(class)?;
        Ok(Self::new(class, config.rate()?, config.landmark_count))
    }

    /// Check this frame's instances against the class layout.
    pub fn check_frame(&self, instances: &[LandmarkSet]) -> PosetraceResult<()> {
        for (instance, set) in instances.iter().enumerate() {
            if set.len() != self.landmark_count {
                return Err(PosetraceError::malformed_frame(
                    self.class.as_str(),
                    instance,
                    self.landmark_count,
                    set.len(),
                ));
            }
            if let Some(landmark) = set.iter().position(|p| !p.is_finite()) {
                return Err(PosetraceError::NonFiniteLandmark {
                    class: self.class.to_string(),
                    instance,
                    landmark,
                });
            }
        }
        Ok(())
    }

    /// Advance by one frame.
    ///
    /// Malformed data is rejected for this frame only and counts as no
    /// detections; it never reaches the filter.
    pub fn process(&mut self, timestamp_ns: TimestampNs, instances: &[LandmarkSet]) -> TrackingState {
        self.last_rejected = false;

        let previous = match self.check_frame(instances) {
            Err(e) => {
                tracing::warn!(
                    class = %self.class,
                    timestamp_ns,
                    error = %e,
                    "Rejecting malformed class data for this frame"
                );
                self.rejected_frames += 1;
                self.last_rejected = true;
                self.fallback.record_missing()
            }
            Ok(()) if instances.is_empty() => self.fallback.record_missing(),
            Ok(()) => {
                let smoothed = instances
                    .iter()
                    .enumerate()
                    .map(|(instance, set)| self.filter.update(instance, set).to_vec())
                    .collect();
                self.fallback.record_live(ClassSnapshot {
                    timestamp_ns,
                    instances: smoothed,
                })
            }
        };

        let current = self.fallback.state();
        if previous != current {
            tracing::debug!(
                class = %self.class,
                from = ?previous,
                to = ?current,
                timestamp_ns,
                "Tracking state changed"
            );
        }
        current
    }

    /// Map the current (live or frozen) snapshot into pixel space.
    pub fn output(&self, mapper: &CoordinateMapper) -> ClassOutput {
        ClassOutput {
            state: self.fallback.state(),
            instances: self
                .fallback
                .snapshot()
                .map(|s| s.instances.iter().map(|points| mapper.map_set(points)).collect())
                .unwrap_or_default(),
            stale_frames: self.fallback.stale_frames(),
            last_live_ns: self.fallback.last_live_ns(),
            rejected: self.last_rejected,
        }
    }

    pub fn class(&self) -> SubjectClass {
        self.class
    }

    pub fn state(&self) -> TrackingState {
        self.fallback.state()
    }

    pub fn filter(&self) -> &TemporalFilter {
        &self.filter
    }

    pub fn fallback(&self) -> &FallbackCache {
        &self.fallback
    }

    /// Frames whose data for this class was rejected as malformed.
    pub fn rejected_frames(&self) -> u64 {
        self.rejected_frames
    }
}

/// The full per-tick pipeline: composition, mapping, smoothing, fallback
/// and relation evaluation.
///
/// Owns all of its state; callers hold it by value and drive it one frame at
/// a time.
#[derive(Debug, Clone)]
pub struct TrackingPipeline {
    config: PipelineConfig,
    mapper: CoordinateMapper,
    classes: BTreeMap<SubjectClass, ClassPipeline>,
    tracked_points: Vec<(LandmarkSelector, PointRef)>,
    evaluator: RelationEvaluator,
    frames_processed: u64,
}

impl TrackingPipeline {
    /// Validate `config` and build a pipeline. Configured classes start in
    /// NO_DATA; other classes are added when they first appear in a frame.
    pub fn new(config: &PipelineConfig) -> PosetraceResult<Self> {
        let mapper = CoordinateMapper::new(config.dest_rect, config.mirror)?;

        let classes = config
            .classes
            .iter()
            .map(|(class, class_config)| {
                Ok((*class, ClassPipeline::from_config(*class, class_config)?))
            })
            .collect::<PosetraceResult<BTreeMap<_, _>>>()?;

        let catalog = config.catalog();
        let tracked_points = config
            .tracked_points
            .iter()
            .map(|selector| Ok((selector.clone(), catalog.resolve(selector)?)))
            .collect::<PosetraceResult<Vec<_>>>()?;
        let evaluator = RelationEvaluator::new(&config.relations, &catalog)?;

        tracing::info!(
            classes = classes.len(),
            tracked_points = tracked_points.len(),
            relations = evaluator.len(),
            mirror = config.mirror,
            "Tracking pipeline configured"
        );

        Ok(Self {
            config: config.clone(),
            mapper,
            classes,
            tracked_points,
            evaluator,
            frames_processed: 0,
        })
    }

    /// Run one frame through every class pipeline and evaluate relations.
    ///
    /// Classes absent from the frame count as "nothing detected".
    pub fn process(&mut self, frame: &Frame) -> FrameOutput {
        for class in frame.classes() {
            if self.classes.contains_key(&class) {
                continue;
            }
            match ClassPipeline::from_config(class, &self.config.class_config(class)) {
                Ok(pipeline) => {
                    tracing::info!(class = %class, "Adding pipeline for newly seen class");
                    self.classes.insert(class, pipeline);
                }
                Err(e) => {
                    tracing::warn!(class = %class, error = %e, "Cannot track class");
                }
            }
        }

        for (class, pipeline) in &mut self.classes {
            pipeline.process(frame.timestamp_ns, frame.instances(*class));
        }

        let mut output = FrameOutput {
            timestamp_ns: frame.timestamp_ns,
            dest_rect: self.mapper.dest_rect(),
            classes: self
                .classes
                .iter()
                .map(|(class, pipeline)| (*class, pipeline.output(&self.mapper)))
                .collect(),
            points: Vec::new(),
            relations: Vec::new(),
        };
        output.points = self
            .tracked_points
            .iter()
            .map(|(selector, point)| PointOutput {
                selector: selector.clone(),
                reading: output.pixel(point).into(),
            })
            .collect();
        output.relations = self.evaluator.evaluate(&output, &output.dest_rect);

        self.frames_processed += 1;
        output
    }

    /// Process whatever frame is currently published. `None` until the
    /// detector has published at least once.
    pub fn tick(&mut self, reader: &mut FrameReader) -> Option<FrameOutput> {
        let frame = reader.latest()?;
        Some(self.process(&frame))
    }

    /// Apply a new destination rect (e.g. after a resize). Takes effect on
    /// the next processed frame; smoothing state is kept in normalized space.
    pub fn set_dest_rect(&mut self, dest: DestRect) -> PosetraceResult<()> {
        self.mapper.set_dest_rect(dest)?;
        self.config.dest_rect = dest;
        tracing::debug!(
            width = dest.width,
            height = dest.height,
            offset_x = dest.offset_x,
            offset_y = dest.offset_y,
            "Destination rect updated"
        );
        Ok(())
    }

    pub fn set_mirrored(&mut self, mirrored: bool) {
        self.mapper.set_mirrored(mirrored);
        self.config.mirror = mirrored;
    }

    /// Fallback state of a class; unknown classes are NO_DATA.
    pub fn state(&self, class: SubjectClass) -> TrackingState {
        self.classes
            .get(&class)
            .map(ClassPipeline::state)
            .unwrap_or_default()
    }

    pub fn class(&self, class: SubjectClass) -> Option<&ClassPipeline> {
        self.classes.get(&class)
    }

    pub fn mapper(&self) -> &CoordinateMapper {
        &self.mapper
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posetrace_landmark_model::landmark::LandmarkPoint;

    fn set(count: usize, x: f64, y: f64) -> LandmarkSet {
        LandmarkSet::filled(count, LandmarkPoint::new(x, y))
    }

    fn hand_pipeline(rate: f64) -> ClassPipeline {
        ClassPipeline::new(SubjectClass::Hand, SmoothingRate::new(rate).unwrap(), 21)
    }

    #[test]
    fn test_class_pipeline_rejects_wrong_length() {
        let mut pipeline = hand_pipeline(0.5);
        let state = pipeline.process(0, &[set(20, 0.1, 0.1)]);
        assert_eq!(state, TrackingState::NoData);
        assert_eq!(pipeline.rejected_frames(), 1);
        assert_eq!(pipeline.filter().instance_count(), 0);
    }

    #[test]
    fn test_class_pipeline_rejects_non_finite() {
        let mut pipeline = hand_pipeline(0.5);
        pipeline.process(0, &[set(21, 0.2, 0.2)]);

        let poisoned = set(21, 0.4, 0.4).with_point(3, LandmarkPoint::new(f64::NAN, 0.4));
        let err = pipeline.check_frame(&[poisoned.clone()]).unwrap_err();
        assert!(err.is_frame_error());

        assert_eq!(pipeline.process(1, &[poisoned]), TrackingState::Stale);
        assert_eq!(
            pipeline.filter().smoothed(0).unwrap()[3],
            LandmarkPoint::new(0.2, 0.2)
        );
    }

    #[test]
    fn test_one_bad_instance_rejects_the_whole_class() {
        let mut pipeline = hand_pipeline(1.0);
        pipeline.process(0, &[set(21, 0.2, 0.2), set(21, 0.8, 0.8)]);
        pipeline.process(1, &[set(21, 0.3, 0.3), set(5, 0.7, 0.7)]);

        let snapshot = pipeline.fallback().snapshot().unwrap();
        assert_eq!(snapshot.timestamp_ns, 0);
        assert_eq!(snapshot.instances.len(), 2);
    }

    #[test]
    fn test_output_is_empty_in_no_data() {
        let pipeline = hand_pipeline(0.5);
        let mapper = CoordinateMapper::new(DestRect::new(0.0, 0.0, 100.0, 100.0).unwrap(), false)
            .unwrap();
        let out = pipeline.output(&mapper);
        assert_eq!(out.state, TrackingState::NoData);
        assert!(out.instances.is_empty());
        assert_eq!(out.last_live_ns, None);
    }

    #[test]
    fn test_tracking_pipeline_starts_in_no_data() {
        let pipeline = TrackingPipeline::new(&PipelineConfig::default()).unwrap();
        for class in SubjectClass::ALL {
            assert_eq!(pipeline.state(class), TrackingState::NoData);
        }
        assert_eq!(pipeline.frames_processed(), 0);
    }

    #[test]
    fn test_invalid_config_fails_construction() {
        let mut config = PipelineConfig::default();
        config.dest_rect.width = -1.0;
        assert!(TrackingPipeline::new(&config).unwrap_err().is_config_error());
    }

    #[test]
    fn test_unconfigured_class_is_added_on_first_sight() {
        let mut config = PipelineConfig::default();
        config.classes.remove(&SubjectClass::Body);
        config.tracked_points.clear();
        config.relations.clear();
        let mut pipeline = TrackingPipeline::new(&config).unwrap();
        assert!(pipeline.class(SubjectClass::Body).is_none());

        let frame = Frame::empty(0).with_class(SubjectClass::Body, vec![set(33, 0.5, 0.5)]);
        let out = pipeline.process(&frame);
        assert_eq!(out.state(SubjectClass::Body), TrackingState::Live);
        assert!(pipeline.class(SubjectClass::Body).is_some());
    }

    #[test]
    fn test_dest_rect_change_applies_to_frozen_snapshot() {
        let mut config = PipelineConfig::default();
        config.mirror = false;
        let mut pipeline = TrackingPipeline::new(&config).unwrap();

        pipeline.process(&Frame::empty(0).with_class(SubjectClass::Hand, vec![set(21, 0.5, 0.5)]));
        pipeline
            .set_dest_rect(DestRect::new(10.0, 20.0, 200.0, 100.0).unwrap())
            .unwrap();
        let out = pipeline.process(&Frame::empty(1));

        let hand = out.class(SubjectClass::Hand).unwrap();
        assert_eq!(hand.state, TrackingState::Stale);
        assert_eq!(hand.point(0, 0).unwrap().x, 110.0);
        assert_eq!(hand.point(0, 0).unwrap().y, 70.0);
    }

    #[test]
    fn test_rejected_dest_rect_keeps_previous() {
        let mut pipeline = TrackingPipeline::new(&PipelineConfig::default()).unwrap();
        let before = pipeline.mapper().dest_rect();
        let bad = DestRect {
            offset_x: 0.0,
            offset_y: 0.0,
            width: 0.0,
            height: 10.0,
        };
        assert!(pipeline.set_dest_rect(bad).is_err());
        assert_eq!(pipeline.mapper().dest_rect(), before);
    }
}
