//! Input samples delivered by the interaction surface.
//!
//! Pointer coordinates are in presentation pixels of the interaction
//! surface; the gesture controller normalizes them against the surface's
//! current presentation size.

use serde::{Deserialize, Serialize};

/// Identifier of an active pointer or touch point.
pub type PointerId = u64;

/// Presentation size of the interaction surface in CSS-like pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PresentationSize {
    pub width: f64,
    pub height: f64,
}

impl PresentationSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Size with each dimension raised to at least one pixel.
    pub fn non_degenerate(self) -> Self {
        let fix = |v: f64| if v.is_finite() && v >= 1.0 { v } else { 1.0 };
        Self {
            width: fix(self.width),
            height: fix(self.height),
        }
    }

    /// Normalize a presentation-space point to `[0, 1]`-ish coordinates.
    pub fn normalize(&self, x: f64, y: f64) -> (f64, f64) {
        let size = self.non_degenerate();
        (x / size.width, y / size.height)
    }
}

/// A single pointer/touch sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerSample {
    pub id: PointerId,
    pub x: f64,
    pub y: f64,
    /// Milliseconds on the host's monotonic clock.
    #[serde(rename = "t")]
    pub timestamp_ms: f64,
}

impl PointerSample {
    pub fn new(id: PointerId, x: f64, y: f64, timestamp_ms: f64) -> Self {
        Self {
            id,
            x,
            y,
            timestamp_ms,
        }
    }

    /// Euclidean distance to another sample, in presentation pixels.
    pub fn distance_to(&self, other: &PointerSample) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Midpoint between two samples.
    pub fn midpoint(&self, other: &PointerSample) -> (f64, f64) {
        ((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// A wheel event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelSample {
    /// Vertical scroll delta; negative scrolls up (zoom in).
    pub delta_y: f64,
    pub ctrl_key: bool,
    #[serde(default)]
    pub meta_key: bool,
    /// Pointer position at wheel time, in presentation pixels.
    pub x: f64,
    pub y: f64,
}

impl WheelSample {
    /// Only modified wheel events zoom; plain scrolling is left to the host.
    pub fn is_zoom(&self) -> bool {
        self.ctrl_key || self.meta_key
    }
}

/// Discriminated union of input samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputSample {
    PointerDown(PointerSample),
    PointerMove(PointerSample),
    PointerUp(PointerSample),
    /// Pointer lost without a release (e.g. capture stolen by the OS).
    PointerCancel(PointerSample),
    Wheel(WheelSample),
}

impl InputSample {
    /// Short label for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            InputSample::PointerDown(_) => "pointer_down",
            InputSample::PointerMove(_) => "pointer_move",
            InputSample::PointerUp(_) => "pointer_up",
            InputSample::PointerCancel(_) => "pointer_cancel",
            InputSample::Wheel(_) => "wheel",
        }
    }
}
