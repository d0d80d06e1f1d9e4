//! Timing for the detector and render cadences.
//!
//! Detector frames are stamped in nanoseconds since the feed started. The
//! render side uses `FrameClock` on the same origin, `FrameAge` to tell how
//! late a frame reached the screen, and `RateController` to pace periodic work.

use std::time::Instant;

/// Shared time origin of one detector feed.
#[derive(Debug, Clone)]
pub struct FrameClock {
    started: Instant,
    /// RFC 3339, written into recorded stream headers.
    started_wall: String,
}

impl FrameClock {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            started_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Nanoseconds on the frame timestamp scale.
    pub fn elapsed_ns(&self) -> u64 {
        self.started.elapsed().as_nanos() as u64
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Wall-clock time at which the feed started.
    pub fn epoch_wall(&self) -> &str {
        &self.started_wall
    }

    /// Frame timestamp as seconds.
    pub fn ns_to_secs(ns: u64) -> f64 {
        ns as f64 / 1_000_000_000.0
    }
}

/// Age of a consumed frame relative to the render tick that read it.
#[derive(Debug, Clone, Copy)]
pub struct FrameAge {
    /// Timestamp carried by the frame (ns).
    pub frame_ns: u64,
    /// Time at which the render tick consumed it (ns).
    pub consumed_ns: u64,
}

impl FrameAge {
    /// Age in nanoseconds. Frames stamped in the future count as zero age.
    pub fn age_ns(&self) -> u64 {
        self.consumed_ns.saturating_sub(self.frame_ns)
    }

    /// Age in milliseconds.
    pub fn age_ms(&self) -> f64 {
        self.age_ns() as f64 / 1_000_000.0
    }

    /// Whether the frame is older than the given threshold.
    pub fn exceeds_threshold_ms(&self, threshold_ms: f64) -> bool {
        self.age_ms() > threshold_ms
    }
}

/// Tick pacing for the render/update loop.
#[derive(Debug)]
pub struct RateController {
    target_interval_ns: u64,
    last_tick_ns: Option<u64>,
}

impl RateController {
    /// Create a controller targeting the given Hz rate.
    pub fn new(target_hz: u32) -> Self {
        Self {
            target_interval_ns: 1_000_000_000 / target_hz.max(1) as u64,
            last_tick_ns: None,
        }
    }

    /// Check if enough time has passed for the next tick.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, current_ns: u64) -> bool {
        match self.last_tick_ns {
            None => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            Some(last) if current_ns >= last + self.target_interval_ns => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            _ => false,
        }
    }

    /// Target interval in nanoseconds.
    pub fn interval_ns(&self) -> u64 {
        self.target_interval_ns
    }
}
