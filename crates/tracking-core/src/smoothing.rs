//! Exponential smoothing of landmark positions.
//!
//! Each subject class owns one `TemporalFilter`. State is keyed by
//! (instance index, landmark index), created lazily on first observation,
//! and only ever updated afterwards: a subject that disappears keeps its
//! last smoothed value so that re-appearance resumes from there.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use posetrace_common::error::{PosetraceError, PosetraceResult};
use posetrace_landmark_model::landmark::{LandmarkPoint, LandmarkSet};

/// Smoothing rate `α ∈ (0, 1]`. Lower is smoother but slower to react;
/// `1.0` passes raw values through.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct SmoothingRate(f64);

impl SmoothingRate {
    /// No smoothing.
    pub const PASSTHROUGH: SmoothingRate = SmoothingRate(1.0);

    pub fn new(rate: f64) -> PosetraceResult<Self> {
        if rate.is_finite() && rate > 0.0 && rate <= 1.0 {
            Ok(Self(rate))
        } else {
            Err(PosetraceError::invalid_config(format!(
                "smoothing rate must be in (0, 1], got {rate}"
            )))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Frames of constant input needed to close all but `epsilon` of the
    /// initial gap: `⌈ln ε / ln(1 - α)⌉`. Passthrough converges in one frame.
    pub fn frames_to_converge(self, epsilon: f64) -> u64 {
        if self.0 >= 1.0 || epsilon >= 1.0 {
            return 1;
        }
        let epsilon = epsilon.max(f64::MIN_POSITIVE);
        (epsilon.ln() / (-self.0).ln_1p()).ceil().max(1.0) as u64
    }
}

impl TryFrom<f64> for SmoothingRate {
    type Error = PosetraceError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SmoothingRate> for f64 {
    fn from(rate: SmoothingRate) -> Self {
        rate.0
    }
}

/// Move `previous` a fraction `rate` of the way toward `raw`.
pub fn smooth_toward(previous: f64, raw: f64, rate: f64) -> f64 {
    previous + rate * (raw - previous)
}

/// Smooth every coordinate of a point independently.
///
/// Depth is smoothed only when both sides carry it; otherwise the raw depth
/// (or its absence) is taken as is.
pub fn smooth_point(previous: &LandmarkPoint, raw: &LandmarkPoint, rate: f64) -> LandmarkPoint {
    LandmarkPoint {
        x: smooth_toward(previous.x, raw.x, rate),
        y: smooth_toward(previous.y, raw.y, rate),
        z: match (previous.z, raw.z) {
            (Some(prev), Some(z)) => Some(smooth_toward(prev, z, rate)),
            (_, z) => z,
        },
    }
}

/// Per-class smoothing state.
#[derive(Debug, Clone)]
pub struct TemporalFilter {
    rate: SmoothingRate,
    state: BTreeMap<usize, Vec<LandmarkPoint>>,
}

impl TemporalFilter {
    pub fn new(rate: SmoothingRate) -> Self {
        Self {
            rate,
            state: BTreeMap::new(),
        }
    }

    /// Feed one raw observation of `instance` and return its smoothed points.
    ///
    /// The first observation of an instance is returned unchanged.
    pub fn update(&mut self, instance: usize, raw: &LandmarkSet) -> &[LandmarkPoint] {
        let rate = self.rate.value();
        let smoothed = self
            .state
            .entry(instance)
            .or_insert_with(|| raw.points().to_vec());

        if smoothed.len() != raw.len() {
            // Callers validate set lengths per class; a change here means the
            // class was reconfigured, so start this instance over.
            tracing::debug!(
                instance,
                previous = smoothed.len(),
                current = raw.len(),
                "Landmark count changed, reseeding smoothing state"
            );
            *smoothed = raw.points().to_vec();
        } else {
            for (prev, point) in smoothed.iter_mut().zip(raw.iter()) {
                *prev = smooth_point(prev, point, rate);
            }
        }

        smoothed
    }

    /// Current smoothed points of `instance`, if it was ever observed.
    pub fn smoothed(&self, instance: usize) -> Option<&[LandmarkPoint]> {
        self.state.get(&instance).map(Vec::as_slice)
    }

    /// Number of instances that have smoothing state.
    pub fn instance_count(&self) -> usize {
        self.state.len()
    }

    pub fn rate(&self) -> SmoothingRate {
        self.rate
    }

    /// Change the rate; existing state is kept.
    pub fn set_rate(&mut self, rate: SmoothingRate) {
        self.rate = rate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn single(x: f64, y: f64) -> LandmarkSet {
        LandmarkSet::new(vec![LandmarkPoint::new(x, y)])
    }

    #[test]
    fn test_rate_bounds() {
        assert!(SmoothingRate::new(0.0).is_err());
        assert!(SmoothingRate::new(-0.5).is_err());
        assert!(SmoothingRate::new(1.0001).is_err());
        assert!(SmoothingRate::new(f64::NAN).is_err());
        assert_eq!(SmoothingRate::new(1.0).unwrap(), SmoothingRate::PASSTHROUGH);
        assert!(SmoothingRate::new(1e-6).is_ok());
    }

    #[test]
    fn test_rate_deserialization_validates() {
        assert!(serde_json::from_str::<SmoothingRate>("0.5").is_ok());
        assert!(serde_json::from_str::<SmoothingRate>("0").is_err());
        assert!(serde_json::from_str::<SmoothingRate>("1.5").is_err());
    }

    #[test]
    fn test_first_observation_has_no_lag() {
        let mut filter = TemporalFilter::new(SmoothingRate::new(0.1).unwrap());
        let out = filter.update(0, &single(0.7, 0.3));
        assert_eq!(out[0], LandmarkPoint::new(0.7, 0.3));
    }

    #[test]
    fn test_half_rate_sequence() {
        let mut filter = TemporalFilter::new(SmoothingRate::new(0.5).unwrap());
        assert_eq!(filter.update(0, &single(0.0, 0.0))[0], LandmarkPoint::new(0.0, 0.0));
        assert_eq!(filter.update(0, &single(10.0, 10.0))[0], LandmarkPoint::new(5.0, 5.0));
        assert_eq!(filter.update(0, &single(10.0, 10.0))[0], LandmarkPoint::new(7.5, 7.5));
    }

    #[test]
    fn test_passthrough_follows_raw() {
        let mut filter = TemporalFilter::new(SmoothingRate::PASSTHROUGH);
        filter.update(0, &single(0.125, 0.125));
        assert_eq!(filter.update(0, &single(0.875, 0.375))[0], LandmarkPoint::new(0.875, 0.375));
    }

    #[test]
    fn test_instances_are_independent() {
        let mut filter = TemporalFilter::new(SmoothingRate::new(0.5).unwrap());
        filter.update(0, &single(0.0, 0.0));
        filter.update(1, &single(1.0, 1.0));
        filter.update(0, &single(1.0, 1.0));
        assert_eq!(filter.smoothed(0).unwrap()[0], LandmarkPoint::new(0.5, 0.5));
        assert_eq!(filter.smoothed(1).unwrap()[0], LandmarkPoint::new(1.0, 1.0));
        assert_eq!(filter.instance_count(), 2);
        assert!(filter.smoothed(2).is_none());
    }

    #[test]
    fn test_depth_smoothing() {
        let prev = LandmarkPoint::with_z(0.0, 0.0, -1.0);
        let out = smooth_point(&prev, &LandmarkPoint::with_z(0.0, 0.0, 1.0), 0.5);
        assert_eq!(out.z, Some(0.0));

        let out = smooth_point(&LandmarkPoint::new(0.0, 0.0), &LandmarkPoint::with_z(0.0, 0.0, 0.4), 0.5);
        assert_eq!(out.z, Some(0.4));

        let out = smooth_point(&prev, &LandmarkPoint::new(0.0, 0.0), 0.5);
        assert_eq!(out.z, None);
    }

    #[test]
    fn test_set_rate_keeps_state() {
        let mut filter = TemporalFilter::new(SmoothingRate::new(0.5).unwrap());
        filter.update(0, &single(0.0, 0.0));
        filter.set_rate(SmoothingRate::PASSTHROUGH);
        assert_eq!(filter.update(0, &single(0.8, 0.8))[0], LandmarkPoint::new(0.8, 0.8));
    }

    #[test]
    fn test_frames_to_converge() {
        let rate = SmoothingRate::new(0.5).unwrap();
        // 0.5^7 = 0.0078 < 0.01 <= 0.5^6
        assert_eq!(rate.frames_to_converge(0.01), 7);
        assert_eq!(SmoothingRate::PASSTHROUGH.frames_to_converge(0.01), 1);
    }

    #[test]
    fn test_tiny_rate_needs_many_frames() {
        // ln(0.01) / -1e-17 is about 4.6e17 frames.
        let frames = SmoothingRate::new(1e-17).unwrap().frames_to_converge(0.01);
        assert!(frames > 400_000_000_000_000_000);
        assert!(frames < 500_000_000_000_000_000);
    }

    proptest! {
        #[test]
        fn constant_input_converges_monotonically(
            rate in 0.01f64..0.99,
            start in -1.0f64..1.0,
            target in -1.0f64..1.0,
            epsilon in 0.001f64..0.5,
        ) {
            let rate = SmoothingRate::new(rate).unwrap();
            let mut filter = TemporalFilter::new(rate);
            filter.update(0, &single(start, start));

            let gap = (target - start).abs();
            let mut last_error = gap;
            let frames = rate.frames_to_converge(epsilon);
            for _ in 0..frames {
                let x = filter.update(0, &single(target, target))[0].x;
                let error = (target - x).abs();
                prop_assert!(error <= last_error + 1e-12);
                last_error = error;
            }
            prop_assert!(last_error <= epsilon * gap + 1e-12);
        }
    }
}
