//! Lenscast Publish Engine
//!
//! Takes a live camera feed, renders a zoomed/panned crop of it onto a
//! fixed-size output surface every display refresh, and binds the
//! surface's stream to the "camera" publication slot of a transport.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                   PipelineHandle                      │
//! │  ┌────────────┐  ┌──────────────┐  ┌───────────────┐ │
//! │  │ Gesture    │─▶│ ViewportState│◀─│ setZoom /     │ │
//! │  │ Controller │  │              │  │ setCenter     │ │
//! │  └────────────┘  └──────┬───────┘  └───────────────┘ │
//! │                         ▼                             │
//! │  SourceFeed ──▶ FrameRenderer ──▶ OutputSurface       │
//! │                                        │              │
//! │                                        ▼              │
//! │                                   OutputTrack ──▶ slot│
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Lifecycle: `Created → Acquiring → MetadataReady → Bound → Running →
//! Disposed`, with `AcquisitionFailed` and `BindFailed` as terminal errors.

pub mod acquisition;
pub mod output;
pub mod pipeline;
pub mod slot;
pub mod stub;
pub mod surfaces;
pub mod transport;

pub use acquisition::{EndedCallback, SourceFeed, VideoAcquirer, VideoHints};
pub use output::{bind_output, BindOutcome, LocalVideoTrack, OutputTrack};
pub use pipeline::*;
pub use slot::{CameraSlot, SlotClaim};
pub use surfaces::{DisplayLink, FrameRequest, InteractionSurface, MountSurface};
pub use transport::{Publication, PublishOptions, TrackSource, Transport};
