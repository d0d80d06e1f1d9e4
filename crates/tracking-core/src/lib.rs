//! Posetrace Tracking Core
//!
//! Turns a stream of detector frames into stable, renderable output:
//! - **Mapper:** normalized → pixel coordinates, with optional mirroring
//! - **Smoothing:** per-landmark exponential filter, no lag on first sight
//! - **Fallback:** NO_DATA / LIVE / STALE per class, frozen output on loss
//! - **Relations:** distances, contact and containment events between points
//! - **Pipeline:** per-class composition into one result per frame
//! - **Handoff:** single-slot, last-write-wins frame exchange with the detector
//!
//! Apart from the handoff slot this crate is pure computation: every tick is
//! synchronous and no operation blocks.

pub mod config;
pub mod fallback;
pub mod handoff;
pub mod mapper;
pub mod output;
pub mod pipeline;
pub mod relation;
pub mod smoothing;

pub use config::{ClassConfig, PipelineConfig};
pub use fallback::{FallbackCache, TrackingState};
pub use handoff::{frame_slot, FramePublisher, FrameReader};
pub use mapper::CoordinateMapper;
pub use output::{ClassOutput, FrameOutput, PointOutput, Reading};
pub use pipeline::{ClassPipeline, TrackingPipeline};
pub use relation::{LandmarkSelector, RelationEvaluator, RelationSpec, RelationValue};
pub use smoothing::{SmoothingRate, TemporalFilter};
