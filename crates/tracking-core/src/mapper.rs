//! Normalized → pixel coordinate mapping.

use posetrace_common::error::PosetraceResult;
use posetrace_landmark_model::landmark::LandmarkPoint;
use posetrace_landmark_model::viewport::{DestRect, PixelPoint};

/// Map a normalized point into `dest`, flipping horizontally when `mirrored`.
///
/// Points outside `[0, 1]` map outside the rect; they are not clamped.
pub fn map_point(point: &LandmarkPoint, dest: &DestRect, mirrored: bool) -> PixelPoint {
    let x = if mirrored { 1.0 - point.x } else { point.x };
    PixelPoint::new(
        dest.offset_x + x * dest.width,
        dest.offset_y + point.y * dest.height,
    )
}

/// Mapper configuration for one render surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    dest: DestRect,
    mirrored: bool,
}

impl CoordinateMapper {
    pub fn new(dest: DestRect, mirrored: bool) -> PosetraceResult<Self> {
        dest.validate()?;
        Ok(Self { dest, mirrored })
    }

    pub fn map(&self, point: &LandmarkPoint) -> PixelPoint {
        map_point(point, &self.dest, self.mirrored)
    }

    pub fn map_set(&self, points: &[LandmarkPoint]) -> Vec<PixelPoint> {
        points.iter().map(|p| self.map(p)).collect()
    }

    /// Swap in a new destination rect after a resize. Invalid rects are
    /// rejected and the previous one is kept.
    pub fn set_dest_rect(&mut self, dest: DestRect) -> PosetraceResult<()> {
        dest.validate()?;
        self.dest = dest;
        Ok(())
    }

    pub fn set_mirrored(&mut self, mirrored: bool) {
        self.mirrored = mirrored;
    }

    pub fn dest_rect(&self) -> DestRect {
        self.dest
    }

    pub fn is_mirrored(&self) -> bool {
        self.mirrored
    }
}
