//! Lenscast Render Engine
//!
//! Per-tick renderer that copies the current crop window of a live source
//! frame onto a fixed-resolution output surface.
//!
//! # Tick Pipeline
//!
//! ```text
//! display refresh ──┐
//!                   ├── Throttle (every Nth tick)
//! viewport ─────────┘         │
//!                             ├── Crop rect (source pixel space)
//! source frame ───────────────┘         │
//!                                       ├── Background fill
//!                                       │
//!                                       ├── Scale-blit to surface
//!                                       ▼
//!                                 output surface ──► output track
//! ```

pub mod renderer;
pub mod source;
pub mod surface;

pub use renderer::*;
pub use source::*;
pub use surface::*;
