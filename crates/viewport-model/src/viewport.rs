//! Viewport state and crop-window geometry.
//!
//! The crop window for a source of `W x H` pixels at zoom `z` is
//! `W/z x H/z` pixels, centered at `(cx*W, cy*H)`. Clamping keeps that
//! window fully inside `[0, W] x [0, H]`.

use serde::{Deserialize, Serialize};

/// Current pixel dimensions of a source frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceSize {
    pub width: u32,
    pub height: u32,
}

impl SourceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A zero dimension means metadata is not available yet.
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Allowed zoom range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomBounds {
    pub min: f64,
    pub max: f64,
}

impl ZoomBounds {
    /// Create bounds. The minimum is floored at 1.0 (a crop window larger
    /// than the source cannot stay inside it) and the maximum is raised to
    /// the minimum if needed.
    pub fn new(min: f64, max: f64) -> Self {
        let min = if min.is_finite() { min.max(1.0) } else { 1.0 };
        let max = if max.is_finite() { max.max(min) } else { min };
        Self { min, max }
    }

    /// Clamp a zoom factor into range. NaN maps to the minimum.
    pub fn clamp(&self, zoom: f64) -> f64 {
        if zoom.is_nan() {
            return self.min;
        }
        zoom.clamp(self.min, self.max)
    }
}

impl Default for ZoomBounds {
    fn default() -> Self {
        Self { min: 1.0, max: 4.0 }
    }
}

/// Normalized crop center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Center {
    pub cx: f64,
    pub cy: f64,
}

impl Center {
    pub const MIDDLE: Center = Center { cx: 0.5, cy: 0.5 };

    pub fn new(cx: f64, cy: f64) -> Self {
        Self { cx, cy }
    }

    /// Clamp both coordinates into the unit square. NaN maps to 0.5.
    pub fn to_unit_square(self) -> Self {
        let unit = |v: f64| if v.is_nan() { 0.5 } else { v.clamp(0.0, 1.0) };
        Self {
            cx: unit(self.cx),
            cy: unit(self.cy),
        }
    }
}

impl Default for Center {
    fn default() -> Self {
        Self::MIDDLE
    }
}

/// Crop rectangle in source pixel space. Never rounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRect {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Center of the rectangle in source pixels.
    pub fn center(&self) -> (f64, f64) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// Whether the rectangle lies inside `[0, W] x [0, H]`, allowing for
    /// floating-point slack of `eps` pixels.
    pub fn is_within(&self, source: SourceSize, eps: f64) -> bool {
        self.left >= -eps
            && self.top >= -eps
            && self.right() <= f64::from(source.width) + eps
            && self.bottom() <= f64::from(source.height) + eps
    }
}

/// Clamp a zoom/center pair against the bounds and the source dimensions.
///
/// Zoom is clamped into `bounds`; the center is clamped so that
/// `cx*W` lies in `[winW/2, W - winW/2]` with `winW = W/zoom` (same for y).
/// With a degenerate source the input is returned unchanged. The function
/// is deterministic and idempotent.
pub fn clamp(bounds: ZoomBounds, zoom: f64, center: Center, source: SourceSize) -> (f64, Center) {
    if source.is_degenerate() {
        return (zoom, center);
    }

    let zoom = bounds.clamp(zoom);
    // winW / (2W) == 1 / (2 zoom); working in normalized units keeps the
    // result independent of W and H and exactly idempotent.
    let half = 0.5 / zoom;
    let axis = |v: f64| {
        if v.is_nan() {
            0.5
        } else {
            v.clamp(half, 1.0 - half)
        }
    };

    (
        zoom,
        Center {
            cx: axis(center.cx),
            cy: axis(center.cy),
        },
    )
}

/// Compute the crop rectangle for a viewport on a source frame.
///
/// Returns `None` for a degenerate source.
pub fn crop_rect(zoom: f64, center: Center, source: SourceSize) -> Option<CropRect> {
    if source.is_degenerate() || !(zoom > 0.0) {
        return None;
    }

    let sw = f64::from(source.width);
    let sh = f64::from(source.height);
    let width = sw / zoom;
    let height = sh / zoom;
    let left = (center.cx * sw - width / 2.0).clamp(0.0, (sw - width).max(0.0));
    let top = (center.cy * sh - height / 2.0).clamp(0.0, (sh - height).max(0.0));

    Some(CropRect {
        left,
        top,
        width,
        height,
    })
}

/// The single source of truth for current crop parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    zoom: f64,
    center: Center,
    bounds: ZoomBounds,
}

impl ViewportState {
    /// Create a viewport at the given zoom (clamped) and centered.
    pub fn new(bounds: ZoomBounds, initial_zoom: f64) -> Self {
        Self {
            zoom: bounds.clamp(initial_zoom),
            center: Center::MIDDLE,
            bounds,
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn center(&self) -> Center {
        self.center
    }

    pub fn bounds(&self) -> ZoomBounds {
        self.bounds
    }

    /// Set the zoom, then re-project the center for `source`.
    pub fn set_zoom(&mut self, zoom: f64, source: Option<SourceSize>) {
        self.apply(zoom, self.center, source);
    }

    /// Set the center, then re-project it for `source`.
    pub fn set_center(&mut self, center: Center, source: Option<SourceSize>) {
        self.apply(self.zoom, center, source);
    }

    /// Set zoom and center together with a single re-projection.
    pub fn set(&mut self, zoom: f64, center: Center, source: Option<SourceSize>) {
        self.apply(zoom, center, source);
    }

    /// Re-clamp after a source dimension change.
    pub fn reclamp(&mut self, source: SourceSize) {
        self.apply(self.zoom, self.center, Some(source));
    }

    /// Crop rectangle for the current state, if the source is usable.
    pub fn crop_rect(&self, source: SourceSize) -> Option<CropRect> {
        crop_rect(self.zoom, self.center, source)
    }

    fn apply(&mut self, zoom: f64, center: Center, source: Option<SourceSize>) {
        // Zoom bounds and the unit square hold even before metadata exists.
        let zoom = self.bounds.clamp(zoom);
        let center = center.to_unit_square();
        let source = source.unwrap_or(SourceSize::new(0, 0));
        let (zoom, center) = clamp(self.bounds, zoom, center, source);
        self.zoom = zoom;
        self.center = center;
    }
}

impl Default for ViewportState {
    fn default() -> Self {
        Self::new(ZoomBounds::default(), 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const HD: SourceSize = SourceSize {
        width: 1920,
        height: 1080,
    };

    #[test]
    fn full_frame_at_zoom_one() {
        let vp = ViewportState::default();
        let rect = vp.crop_rect(HD).unwrap();
        assert_eq!(rect.left, 0.0);
        assert_eq!(rect.top, 0.0);
        assert_eq!(rect.width, 1920.0);
        assert_eq!(rect.height, 1080.0);
    }

    #[test]
    fn zoom_two_is_centered_half_window() {
        let mut vp = ViewportState::default();
        vp.set_zoom(2.0, Some(HD));
        let rect = vp.crop_rect(HD).unwrap();
        assert_eq!((rect.width, rect.height), (960.0, 540.0));
        assert_eq!(rect.center(), (960.0, 540.0));
    }

    #[test]
    fn center_clamps_at_left_edge() {
        let mut vp = ViewportState::default();
        vp.set_zoom(2.0, Some(HD));
        vp.set_center(Center::new(0.0, 0.5), Some(HD));
        assert_eq!(vp.center().cx, 0.25);
        let rect = vp.crop_rect(HD).unwrap();
        assert_eq!(rect.left, 0.0);
        assert_eq!(rect.top, 270.0);
    }

    #[test]
    fn degenerate_source_returns_input_unchanged() {
        let bounds = ZoomBounds::default();
        let input = (9.0, Center::new(-3.0, 2.0));
        let out = clamp(bounds, input.0, input.1, SourceSize::new(0, 720));
        assert_eq!(out, input);
    }

    #[test]
    fn setters_bound_zoom_without_metadata() {
        let mut vp = ViewportState::default();
        vp.set_zoom(12.0, None);
        assert_eq!(vp.zoom(), 4.0);
        vp.set_center(Center::new(1.5, -0.2), None);
        assert_eq!(vp.center(), Center::new(1.0, 0.0));

        // Metadata arrives: center is re-projected into the crop-safe range.
        vp.reclamp(HD);
        assert_eq!(vp.center(), Center::new(0.875, 0.125));
    }

    #[test]
    fn zoom_out_recenters() {
        let mut vp = ViewportState::default();
        vp.set(4.0, Center::new(0.9, 0.9), Some(HD));
        assert_eq!(vp.center(), Center::new(0.875, 0.875));
        vp.set_zoom(1.0, Some(HD));
        assert_eq!(vp.center(), Center::MIDDLE);
    }

    #[test]
    fn bounds_floor_minimum_at_one() {
        let bounds = ZoomBounds::new(0.25, 0.5);
        assert_eq!(bounds.min, 1.0);
        assert_eq!(bounds.max, 1.0);
        assert_eq!(bounds.clamp(f64::NAN), 1.0);
    }

    #[test]
    fn nan_center_maps_to_middle() {
        let (_, c) = clamp(
            ZoomBounds::default(),
            2.0,
            Center::new(f64::NAN, 0.5),
            HD,
        );
        assert_eq!(c.cx, 0.5);
    }

    fn source_size() -> impl Strategy<Value = SourceSize> {
        (1u32..8192, 1u32..8192).prop_map(|(w, h)| SourceSize::new(w, h))
    }

    proptest! {
        #[test]
        fn clamped_crop_is_inside_source(
            zoom in 1.0f64..4.0,
            cx in 0.0f64..=1.0,
            cy in 0.0f64..=1.0,
            source in source_size(),
        ) {
            let bounds = ZoomBounds::new(1.0, 4.0);
            let (z, c) = clamp(bounds, zoom, Center::new(cx, cy), source);
            let rect = crop_rect(z, c, source).unwrap();
            prop_assert!(rect.is_within(source, 1e-6));

            // The clamped center needs no further correction by the renderer.
            let sw = f64::from(source.width);
            let unclamped_left = c.cx * sw - rect.width / 2.0;
            prop_assert!((unclamped_left - rect.left).abs() < 1e-6);
        }

        #[test]
        fn clamp_is_idempotent(
            zoom in -2.0f64..10.0,
            cx in -1.0f64..2.0,
            cy in -1.0f64..2.0,
            source in source_size(),
        ) {
            let bounds = ZoomBounds::new(1.0, 4.0);
            let once = clamp(bounds, zoom, Center::new(cx, cy), source);
            let twice = clamp(bounds, once.0, once.1, source);
            prop_assert_eq!(once, twice);
        }
    }
}
