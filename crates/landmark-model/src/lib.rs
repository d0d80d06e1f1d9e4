//! Posetrace Landmark Model
//!
//! Defines the core data contracts shared by the detector side and the
//! tracking pipeline:
//! - **Landmarks:** normalized points, fixed-length landmark sets, subject classes
//! - **Frames:** one detector result per inference cycle, JSONL frame streams
//! - **Viewport:** destination rects, aspect fitting, pixel-space geometry
//! - **Names:** per-class landmark name tables for relation queries
//!
//! Landmark coordinates are normalized to `[0.0, 1.0]` relative to the
//! detector input; pixel coordinates only appear after mapping.

pub mod frame;
pub mod landmark;
pub mod names;
pub mod viewport;

pub use frame::*;
pub use landmark::*;
pub use names::*;
pub use viewport::*;
