//! Tracking-loss fallback per subject class.
//!
//! ```text
//! NO_DATA ──detections──▶ LIVE ──none──▶ STALE
//!                          ▲  │            │
//!                          └──┘◀─detections┘
//! ```
//!
//! While STALE the last LIVE snapshot is reported unchanged. There is no
//! timeout: a class stays STALE until detections resume.

use serde::{Deserialize, Serialize};

use posetrace_landmark_model::frame::TimestampNs;
use posetrace_landmark_model::landmark::LandmarkPoint;

/// Fallback state of one subject class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
    /// Nothing has ever been detected; there is no renderable output.
    #[default]
    NoData,
    /// Detected this frame; output is freshly smoothed.
    Live,
    /// Not detected this frame; output is the frozen last LIVE snapshot.
    Stale,
}

impl TrackingState {
    /// Whether the class has renderable output in this state.
    pub fn has_output(&self) -> bool {
        !matches!(self, Self::NoData)
    }
}

/// Smoothed, normalized landmarks of every instance detected in one LIVE frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassSnapshot {
    pub timestamp_ns: TimestampNs,
    pub instances: Vec<Vec<LandmarkPoint>>,
}

/// Holds the last LIVE snapshot and decides between live and frozen output.
#[derive(Debug, Clone, Default)]
pub struct FallbackCache {
    state: TrackingState,
    snapshot: Option<ClassSnapshot>,
    stale_frames: u64,
}

impl FallbackCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a frame with detections. Replaces the snapshot wholesale.
    ///
    /// Returns the previous state.
    pub fn record_live(&mut self, snapshot: ClassSnapshot) -> TrackingState {
        let previous = self.state;
        self.snapshot = Some(snapshot);
        self.state = TrackingState::Live;
        self.stale_frames = 0;
        previous
    }

    /// Record a frame without (usable) detections. The snapshot is not touched.
    ///
    /// Returns the previous state.
    pub fn record_missing(&mut self) -> TrackingState {
        let previous = self.state;
        match previous {
            TrackingState::NoData => {}
            TrackingState::Live | TrackingState::Stale => {
                self.state = TrackingState::Stale;
                self.stale_frames += 1;
            }
        }
        previous
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    /// The snapshot to render: live or frozen. `None` only in NO_DATA.
    pub fn snapshot(&self) -> Option<&ClassSnapshot> {
        self.snapshot.as_ref()
    }

    /// Consecutive frames spent in STALE (0 unless STALE).
    pub fn stale_frames(&self) -> u64 {
        self.stale_frames
    }

    /// Timestamp of the last LIVE frame.
    pub fn last_live_ns(&self) -> Option<TimestampNs> {
        self.snapshot.as_ref().map(|s| s.timestamp_ns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(t: TimestampNs, x: f64) -> ClassSnapshot {
        ClassSnapshot {
            timestamp_ns: t,
            instances: vec![vec![LandmarkPoint::new(x, x)]],
        }
    }

    #[test]
    fn test_starts_without_output() {
        let mut cache = FallbackCache::new();
        assert_eq!(cache.state(), TrackingState::NoData);
        assert!(cache.snapshot().is_none());

        // Missing detections before any LIVE frame keep NO_DATA.
        cache.record_missing();
        assert_eq!(cache.state(), TrackingState::NoData);
        assert_eq!(cache.stale_frames(), 0);
        assert!(!cache.state().has_output());
    }

    #[test]
    fn test_live_then_stale_freezes_snapshot() {
        let mut cache = FallbackCache::new();
        assert_eq!(cache.record_live(snapshot(0, 2.0)), TrackingState::NoData);
        assert_eq!(cache.record_missing(), TrackingState::Live);
        assert_eq!(cache.state(), TrackingState::Stale);
        assert_eq!(cache.snapshot(), Some(&snapshot(0, 2.0)));

        cache.record_missing();
        cache.record_missing();
        assert_eq!(cache.state(), TrackingState::Stale);
        assert_eq!(cache.stale_frames(), 3);
        assert_eq!(cache.snapshot(), Some(&snapshot(0, 2.0)));
        assert_eq!(cache.last_live_ns(), Some(0));
    }

    #[test]
    fn test_resume_replaces_snapshot_and_resets_counter() {
        let mut cache = FallbackCache::new();
        cache.record_live(snapshot(0, 2.0));
        cache.record_missing();
        assert_eq!(cache.record_live(snapshot(99, 5.0)), TrackingState::Stale);
        assert_eq!(cache.state(), TrackingState::Live);
        assert_eq!(cache.stale_frames(), 0);
        assert_eq!(cache.last_live_ns(), Some(99));
    }
}
