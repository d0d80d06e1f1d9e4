//! Destination rectangles, aspect fitting, and pixel-space geometry.
//!
//! The detector works in normalized coordinates; the renderer draws the
//! video feed into a destination rectangle on the canvas. `Viewport` owns
//! that rectangle and recomputes it whenever the canvas resizes.

use serde::{Deserialize, Serialize};

use posetrace_common::error::{PosetraceError, PosetraceResult};

/// Where the video feed is drawn on the canvas, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DestRect {
    pub offset_x: f64,
    pub offset_y: f64,
    pub width: f64,
    pub height: f64,
}

impl DestRect {
    /// Create a destination rect. Width and height must be positive.
    pub fn new(offset_x: f64, offset_y: f64, width: f64, height: f64) -> PosetraceResult<Self> {
        let rect = Self {
            offset_x,
            offset_y,
            width,
            height,
        };
        rect.validate()?;
        Ok(rect)
    }

    /// Check a rect that was built field-by-field (e.g. deserialized).
    pub fn validate(&self) -> PosetraceResult<()> {
        let finite = self.offset_x.is_finite()
            && self.offset_y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite();
        if !finite {
            return Err(PosetraceError::invalid_config(format!(
                "destination rect has non-finite values: {self:?}"
            )));
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(PosetraceError::invalid_config(format!(
                "destination rect must have positive size, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    /// Fit a source of `source_w x source_h` into a canvas, centered.
    pub fn fit(
        source_w: f64,
        source_h: f64,
        canvas_w: f64,
        canvas_h: f64,
        mode: FitMode,
    ) -> PosetraceResult<Self> {
        for (label, value) in [
            ("source width", source_w),
            ("source height", source_h),
            ("canvas width", canvas_w),
            ("canvas height", canvas_h),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(PosetraceError::invalid_config(format!(
                    "{label} must be positive, got {value}"
                )));
            }
        }

        let scale_x = canvas_w / source_w;
        let scale_y = canvas_h / source_h;
        let scale = match mode {
            FitMode::Contain => scale_x.min(scale_y),
            FitMode::Cover => scale_x.max(scale_y),
        };

        let width = source_w * scale;
        let height = source_h * scale;
        Self::new(
            (canvas_w - width) / 2.0,
            (canvas_h - height) / 2.0,
            width,
            height,
        )
    }

    /// Right edge in pixels.
    pub fn right(&self) -> f64 {
        self.offset_x + self.width
    }

    /// Bottom edge in pixels.
    pub fn bottom(&self) -> f64 {
        self.offset_y + self.height
    }
}

/// How a source is scaled into a canvas of a different aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    /// Letterbox or pillarbox: the whole source is visible.
    #[default]
    Contain,
    /// Scale to fill the canvas; the overflowing axis is cropped.
    Cover,
}

/// Owns the destination rect for one render surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    source_w: f64,
    source_h: f64,
    canvas_w: f64,
    canvas_h: f64,
    mode: FitMode,
    dest: DestRect,
}

impl Viewport {
    pub fn new(
        source_w: f64,
        source_h: f64,
        canvas_w: f64,
        canvas_h: f64,
        mode: FitMode,
    ) -> PosetraceResult<Self> {
        let dest = DestRect::fit(source_w, source_h, canvas_w, canvas_h, mode)?;
        Ok(Self {
            source_w,
            source_h,
            canvas_w,
            canvas_h,
            mode,
            dest,
        })
    }

    /// Recompute the destination rect for a new canvas size.
    ///
    /// On error the previous rect is kept.
    pub fn resize(&mut self, canvas_w: f64, canvas_h: f64) -> PosetraceResult<DestRect> {
        self.dest = DestRect::fit(self.source_w, self.source_h, canvas_w, canvas_h, self.mode)?;
        self.canvas_w = canvas_w;
        self.canvas_h = canvas_h;
        Ok(self.dest)
    }

    /// Update the source dimensions (e.g. once the camera reports its real size).
    pub fn set_source(&mut self, source_w: f64, source_h: f64) -> PosetraceResult<DestRect> {
        self.dest = DestRect::fit(source_w, source_h, self.canvas_w, self.canvas_h, self.mode)?;
        self.source_w = source_w;
        self.source_h = source_h;
        Ok(self.dest)
    }

    pub fn dest_rect(&self) -> DestRect {
        self.dest
    }

    pub fn canvas_size(&self) -> (f64, f64) {
        (self.canvas_w, self.canvas_h)
    }

    pub fn mode(&self) -> FitMode {
        self.mode
    }
}

/// A point in destination pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &PixelPoint) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Point halfway between two points.
    pub fn midpoint(a: &PixelPoint, b: &PixelPoint) -> PixelPoint {
        PixelPoint {
            x: (a.x + b.x) * 0.5,
            y: (a.y + b.y) * 0.5,
        }
    }
}

/// An axis-aligned rectangle in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    pub fn contains(&self, point: &PixelPoint) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }
}

/// A rectangular region of the destination rect, in normalized units.
///
/// `(0.0, 0.0)` is the top-left and `(1.0, 1.0)` the bottom-right of the
/// rendered feed, so the region scales with the render size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Left edge (normalized).
    pub x: f64,
    /// Top edge (normalized).
    pub y: f64,
    /// Width (normalized).
    pub w: f64,
    /// Height (normalized).
    pub h: f64,
}

impl Region {
    /// Build a region in code. Values are clamped into the unit square with
    /// a minimum size of 1%. Regions read from config are not clamped; they
    /// are checked by `validate` instead.
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        let w = w.clamp(0.01, 1.0);
        let h = h.clamp(0.01, 1.0);
        Self {
            x: x.max(0.0).min(1.0 - w),
            y: y.max(0.0).min(1.0 - h),
            w,
            h,
        }
    }

    /// Require finite values, a positive size, and the whole region inside
    /// the destination rect.
    pub fn validate(&self) -> PosetraceResult<()> {
        let finite =
            self.x.is_finite() && self.y.is_finite() && self.w.is_finite() && self.h.is_finite();
        if !finite {
            return Err(PosetraceError::invalid_config(format!(
                "region has non-finite values: {self:?}"
            )));
        }
        if self.w <= 0.0 || self.h <= 0.0 {
            return Err(PosetraceError::invalid_config(format!(
                "region must have positive size, got {}x{}",
                self.w, self.h
            )));
        }
        if self.x < 0.0 || self.y < 0.0 || self.x + self.w > 1.0 || self.y + self.h > 1.0 {
            return Err(PosetraceError::invalid_config(format!(
                "region {self:?} extends outside the unit square"
            )));
        }
        Ok(())
    }

    /// Project the region onto a destination rect.
    pub fn to_pixel_rect(&self, dest: &DestRect) -> PixelRect {
        PixelRect {
            x: dest.offset_x + self.x * dest.width,
            y: dest.offset_y + self.y * dest.height,
            width: self.w * dest.width,
            height: self.h * dest.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_dest_rect_rejects_non_positive_size() {
        assert!(DestRect::new(0.0, 0.0, 0.0, 100.0).is_err());
        assert!(DestRect::new(0.0, 0.0, 100.0, -1.0).is_err());
        assert!(DestRect::new(0.0, 0.0, f64::NAN, 1.0).is_err());
        assert!(DestRect::new(-10.0, -10.0, 100.0, 100.0).is_ok());
    }

    #[test]
    fn test_contain_pillarboxes_narrow_source() {
        // 4:3 source in a 16:9 canvas: full height, bars left and right.
        let rect = DestRect::fit(640.0, 480.0, 1280.0, 720.0, FitMode::Contain).unwrap();
        assert!((rect.height - 720.0).abs() < 1e-9);
        assert!((rect.width - 960.0).abs() < 1e-9);
        assert!((rect.offset_x - 160.0).abs() < 1e-9);
        assert_eq!(rect.offset_y, 0.0);
    }

    #[test]
    fn test_contain_letterboxes_wide_source() {
        let rect = DestRect::fit(1920.0, 1080.0, 800.0, 800.0, FitMode::Contain).unwrap();
        assert!((rect.width - 800.0).abs() < 1e-9);
        assert!((rect.height - 450.0).abs() < 1e-9);
        assert!((rect.offset_y - 175.0).abs() < 1e-9);
    }

    #[test]
    fn test_cover_fills_and_crops() {
        // 4:3 source covering a 16:9 canvas: full width, vertical overflow.
        let rect = DestRect::fit(640.0, 480.0, 1280.0, 720.0, FitMode::Cover).unwrap();
        assert!((rect.width - 1280.0).abs() < 1e-9);
        assert!((rect.height - 960.0).abs() < 1e-9);
        assert!((rect.offset_y + 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_rejects_zero_canvas() {
        assert!(DestRect::fit(640.0, 480.0, 0.0, 720.0, FitMode::Contain).is_err());
    }

    #[test]
    fn test_viewport_resize_recomputes_and_keeps_rect_on_error() {
        let mut vp = Viewport::new(640.0, 480.0, 640.0, 480.0, FitMode::Contain).unwrap();
        assert_eq!(vp.dest_rect(), DestRect::new(0.0, 0.0, 640.0, 480.0).unwrap());

        let resized = vp.resize(1280.0, 960.0).unwrap();
        assert!((resized.width - 1280.0).abs() < 1e-9);

        assert!(vp.resize(0.0, 960.0).is_err());
        assert_eq!(vp.dest_rect(), resized);
        assert_eq!(vp.canvas_size(), (1280.0, 960.0));
    }

    #[test]
    fn test_viewport_set_source() {
        let mut vp = Viewport::new(640.0, 480.0, 1000.0, 1000.0, FitMode::Contain).unwrap();
        let rect = vp.set_source(1000.0, 500.0).unwrap();
        assert!((rect.height - 500.0).abs() < 1e-9);
        assert!((rect.offset_y - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_pixel_distance_and_midpoint() {
        let a = PixelPoint::new(0.0, 0.0);
        let b = PixelPoint::new(30.0, 40.0);
        assert!((a.distance_to(&b) - 50.0).abs() < 1e-9);
        assert_eq!(PixelPoint::midpoint(&a, &b), PixelPoint::new(15.0, 20.0));
    }

    #[test]
    fn test_region_projects_onto_dest_rect() {
        let dest = DestRect::new(100.0, 50.0, 200.0, 100.0).unwrap();
        let rect = Region::new(0.5, 0.0, 0.5, 0.5).to_pixel_rect(&dest);
        assert_eq!(rect.x, 200.0);
        assert_eq!(rect.y, 50.0);
        assert!(rect.contains(&PixelPoint::new(250.0, 75.0)));
        assert!(!rect.contains(&PixelPoint::new(150.0, 75.0)));
    }

    #[test]
    fn test_new_region_is_always_valid() {
        let region = Region::new(0.9, -0.5, 0.5, 0.0);
        assert!(region.validate().is_ok());
        assert_eq!(region.x, 0.5);
        assert_eq!(region.y, 0.0);
        assert_eq!(region.h, 0.01);
    }

    #[test]
    fn test_deserialized_region_is_validated() {
        let bad: Region =
            serde_json::from_str(r#"{"x":0.5,"y":-3.0,"w":-1.0,"h":0.0}"#).unwrap();
        assert!(bad.validate().is_err());

        let outside = Region {
            x: 0.75,
            y: 0.0,
            w: 0.5,
            h: 0.5,
        };
        assert!(outside.validate().is_err());

        let nan = Region {
            x: f64::NAN,
            y: 0.0,
            w: 0.5,
            h: 0.5,
        };
        assert!(nan.validate().is_err());

        let whole = Region {
            x: 0.0,
            y: 0.0,
            w: 1.0,
            h: 1.0,
        };
        assert!(whole.validate().is_ok());
    }

    proptest! {
        #[test]
        fn contain_stays_inside_canvas_and_keeps_aspect(
            source_w in 1.0f64..4000.0,
            source_h in 1.0f64..4000.0,
            canvas_w in 1.0f64..4000.0,
            canvas_h in 1.0f64..4000.0,
        ) {
            let rect = DestRect::fit(source_w, source_h, canvas_w, canvas_h, FitMode::Contain).unwrap();
            prop_assert!(rect.offset_x >= -1e-9 && rect.offset_y >= -1e-9);
            prop_assert!(rect.right() <= canvas_w + 1e-6);
            prop_assert!(rect.bottom() <= canvas_h + 1e-6);
            let aspect = source_w / source_h;
            prop_assert!((rect.width / rect.height - aspect).abs() <= aspect * 1e-9);
        }

        #[test]
        fn cover_spans_the_canvas(
            source_w in 1.0f64..4000.0,
            source_h in 1.0f64..4000.0,
            canvas_w in 1.0f64..4000.0,
            canvas_h in 1.0f64..4000.0,
        ) {
            let rect = DestRect::fit(source_w, source_h, canvas_w, canvas_h, FitMode::Cover).unwrap();
            prop_assert!(rect.offset_x <= 1e-9 && rect.offset_y <= 1e-9);
            prop_assert!(rect.right() >= canvas_w - 1e-6);
            prop_assert!(rect.bottom() >= canvas_h - 1e-6);
        }
    }
}
