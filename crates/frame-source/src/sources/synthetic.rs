//! Deterministic synthetic detector.
//!
//! Produces two hands that swing toward each other and cross, a face that
//! bobs above them, and a swaying body, all from closed-form motion. Classes
//! can be switched off for scheduled frame ranges to exercise tracking loss.

use std::f64::consts::TAU;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use posetrace_common::error::{PosetraceError, PosetraceResult};
use posetrace_landmark_model::frame::Frame;
use posetrace_landmark_model::landmark::{LandmarkPoint, LandmarkSet, SubjectClass};
use posetrace_landmark_model::names::FACE_LANDMARKS;

use crate::LandmarkSource;

/// A scheduled detection gap for one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dropout {
    pub class: SubjectClass,
    pub start_frame: u64,
    pub frames: u64,
}

impl Dropout {
    pub fn covers(&self, class: SubjectClass, frame: u64) -> bool {
        self.class == class && frame >= self.start_frame && frame - self.start_frame < self.frames
    }
}

/// Parses `class:start_frame:frames`, e.g. `hand:60:45`.
impl FromStr for Dropout {
    type Err = PosetraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        let [class, start, frames] = parts.as_slice() else {
            return Err(PosetraceError::invalid_config(format!(
                "dropout '{s}' must look like class:start_frame:frames"
            )));
        };
        let number = |value: &str| {
            value.parse::<u64>().map_err(|_| {
                PosetraceError::invalid_config(format!("dropout '{s}' has a bad number '{value}'"))
            })
        };
        Ok(Self {
            class: class.parse()?,
            start_frame: number(*start)?,
            frames: number(*frames)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    /// Detector rate.
    pub fps: u32,
    /// Number of hands (0..=2).
    pub hands: usize,
    pub face: bool,
    pub body: bool,
    /// Frames per full swing of the motion.
    pub period_frames: u64,
    /// Peak per-coordinate detector noise, normalized.
    pub jitter: f64,
    /// Stop after this many frames; `None` runs forever.
    pub max_frames: Option<u64>,
    pub dropouts: Vec<Dropout>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            hands: 2,
            face: true,
            body: true,
            period_frames: 120,
            jitter: 0.004,
            max_frames: None,
            dropouts: Vec::new(),
        }
    }
}

impl SyntheticConfig {
    pub fn validate(&self) -> PosetraceResult<()> {
        if self.fps == 0 {
            return Err(PosetraceError::invalid_config("synthetic fps must be positive"));
        }
        if self.hands > 2 {
            return Err(PosetraceError::invalid_config(format!(
                "synthetic source supports at most 2 hands, got {}",
                self.hands
            )));
        }
        if self.period_frames == 0 {
            return Err(PosetraceError::invalid_config(
                "synthetic period_frames must be positive",
            ));
        }
        if !(self.jitter.is_finite() && self.jitter >= 0.0) {
            return Err(PosetraceError::invalid_config(format!(
                "synthetic jitter must be a non-negative number, got {}",
                self.jitter
            )));
        }
        Ok(())
    }
}

/// Generates frames from `SyntheticConfig`.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    config: SyntheticConfig,
    frame_index: u64,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> PosetraceResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            frame_index: 0,
        })
    }

    pub fn config(&self) -> &SyntheticConfig {
        &self.config
    }

    fn interval_ns(&self) -> u64 {
        1_000_000_000 / self.config.fps as u64
    }

    fn active(&self, class: SubjectClass, frame: u64) -> bool {
        !self.config.dropouts.iter().any(|d| d.covers(class, frame))
    }

    /// Frame `n` of the stream. Pure: the same index always yields the same frame.
    pub fn frame_at(&self, n: u64) -> Frame {
        let phase = TAU * (n % self.config.period_frames) as f64 / self.config.period_frames as f64;
        let mut frame = Frame::empty(n * self.interval_ns());

        if self.config.hands > 0 {
            let hands = if self.active(SubjectClass::Hand, n) {
                (0..self.config.hands)
                    .map(|i| self.hand(n, i, phase))
                    .collect()
            } else {
                Vec::new()
            };
            frame = frame.with_class(SubjectClass::Hand, hands);
        }
        if self.config.face {
            let faces = if self.active(SubjectClass::Face, n) {
                vec![self.face(n, phase)]
            } else {
                Vec::new()
            };
            frame = frame.with_class(SubjectClass::Face, faces);
        }
        if self.config.body {
            let bodies = if self.active(SubjectClass::Body, n) {
                vec![self.body(n, phase)]
            } else {
                Vec::new()
            };
            frame = frame.with_class(SubjectClass::Body, bodies);
        }
        frame
    }

    /// Hands start 0.4 apart and meet (then cross) at the middle of the swing.
    fn hand(&self, n: u64, instance: usize, phase: f64) -> LandmarkSet {
        let side = if instance == 0 { -1.0 } else { 1.0 };
        let cx = 0.5 + side * 0.2 * phase.cos();
        let cy = 0.55 + 0.08 * phase.sin();
        let salt = instance as u64 * 1_000;

        let points = (0..SubjectClass::Hand.default_landmark_count())
            .map(|k| {
                // Wrist at the centre, five fingers of four joints fanning upwards.
                let (dx, dy) = if k == 0 {
                    (0.0, 0.0)
                } else {
                    let finger = (k - 1) / 4;
                    let joint = (k - 1) % 4 + 1;
                    (
                        (finger as f64 - 2.0) * 0.012 * side,
                        -0.02 - joint as f64 * 0.015,
                    )
                };
                self.point(cx + dx, cy + dy, n, salt + k as u64)
            })
            .collect();
        LandmarkSet::new(points)
    }

    fn face(&self, n: u64, phase: f64) -> LandmarkSet {
        let cx = 0.5 + 0.03 * phase.sin();
        let cy = 0.3 + 0.02 * (2.0 * phase).sin();
        let count = SubjectClass::Face.default_landmark_count();

        let mut points: Vec<LandmarkPoint> = (0..count)
            .map(|k| {
                let a = TAU * k as f64 / count as f64;
                self.point(cx + 0.07 * a.cos(), cy + 0.09 * a.sin(), n, 5_000 + k as u64)
            })
            .collect();

        // Named features sit at fixed offsets from the face centre.
        for (name, index) in FACE_LANDMARKS {
            let (dx, dy) = match name {
                "nose_tip" => (0.0, 0.0),
                "upper_lip" => (0.0, 0.035),
                "lower_lip" => (0.0, 0.05),
                "mouth_left" => (0.02, 0.042),
                "mouth_right" => (-0.02, 0.042),
                "left_iris" => (0.025, -0.03),
                "right_iris" => (-0.025, -0.03),
                _ => continue,
            };
            if let Some(slot) = points.get_mut(index) {
                *slot = self.point(cx + dx, cy + dy, n, 9_000 + index as u64);
            }
        }
        LandmarkSet::new(points)
    }

    fn body(&self, n: u64, phase: f64) -> LandmarkSet {
        let sway = 0.02 * phase.sin();
        let points = (0..SubjectClass::Body.default_landmark_count())
            .map(|k| {
                // Head points first, then pairs running down the body.
                let row = if k <= 10 { 0 } else { (k - 11) / 2 + 1 };
                let side = match k {
                    0 => 0.0,
                    k if k <= 10 => (k as f64 - 5.0) * 0.006,
                    k if k % 2 == 1 => 0.08,
                    _ => -0.08,
                };
                self.point(0.5 + sway + side, 0.28 + row as f64 * 0.055, n, 20_000 + k as u64)
            })
            .collect();
        LandmarkSet::new(points)
    }

    fn point(&self, x: f64, y: f64, n: u64, salt: u64) -> LandmarkPoint {
        if self.config.jitter == 0.0 {
            return LandmarkPoint::new(x, y);
        }
        LandmarkPoint::new(
            x + self.config.jitter * noise(n, salt),
            y + self.config.jitter * noise(n, salt.wrapping_add(7_919)),
        )
    }
}

/// Deterministic value in `[-1, 1]` for a (frame, salt) pair.
fn noise(n: u64, salt: u64) -> f64 {
    let mut h = n
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add(salt.wrapping_mul(0xBF58_476D_1CE4_E5B9));
    h ^= h >> 31;
    h = h.wrapping_mul(0x94D0_49BB_1331_11EB);
    h ^= h >> 29;
    (h >> 11) as f64 / (1u64 << 53) as f64 * 2.0 - 1.0
}

impl LandmarkSource for SyntheticSource {
    fn next_frame(&mut self) -> PosetraceResult<Option<Frame>> {
        if let Some(max) = self.config.max_frames {
            if self.frame_index >= max {
                return Ok(None);
            }
        }
        let frame = self.frame_at(self.frame_index);
        self.frame_index += 1;
        Ok(Some(frame))
    }

    fn name(&self) -> &str {
        "synthetic"
    }

    fn frame_interval(&self) -> Duration {
        Duration::from_nanos(self.interval_ns())
    }
}
