//! Lenscast Viewport Model
//!
//! Defines the data contracts shared by gestures, the renderer and the
//! public pipeline handle:
//! - **Viewport:** zoom factor, normalized crop center, and the clamp that
//!   keeps the crop window inside the source frame
//! - **Input:** pointer and wheel samples fed to the gesture controller
//!
//! Centers are normalized to `[0.0, 1.0]` relative to the source frame so
//! they survive source resolution changes.

pub mod input;
pub mod viewport;

pub use input::*;
pub use viewport::*;
