//! Posetrace Frame Source
//!
//! The detector side of the pipeline. A `LandmarkSource` produces one
//! `Frame` per inference cycle; a `DetectorFeed` drives a source on its own
//! task and publishes every frame into the single-slot handoff, optionally
//! recording the stream to JSONL.
//!
//! Sources:
//! - **Replay:** a recorded JSONL frame stream, optionally looped
//! - **Synthetic:** deterministic moving hands, face and body with scheduled dropouts

pub mod feed;
pub mod recorder;
pub mod sources;

use std::time::Duration;

use posetrace_common::error::PosetraceResult;
use posetrace_landmark_model::frame::Frame;

pub use feed::{DetectorFeed, FeedStats};
pub use recorder::FrameRecorder;

/// Trait for landmark producers.
pub trait LandmarkSource: Send {
    /// Run one inference cycle. Returns `None` once the source is exhausted.
    fn next_frame(&mut self) -> PosetraceResult<Option<Frame>>;

    /// Source name for logging and stream headers.
    fn name(&self) -> &str;

    /// Time between inference cycles.
    fn frame_interval(&self) -> Duration;

    /// Dimensions of the video the landmarks were detected on.
    fn source_size(&self) -> (u32, u32) {
        (640, 480)
    }
}
