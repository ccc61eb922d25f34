//! Host-environment collaborators: interaction surface, mount surface,
//! and the display-refresh scheduler.

use lenscast_common::error::LenscastResult;
use lenscast_viewport::PresentationSize;
use serde::{Deserialize, Serialize};

/// The element gestures are read from.
///
/// While listeners are attached the host forwards pointer and wheel
/// samples to `PipelineHandle::handle_input`.
pub trait InteractionSurface: Send {
    /// Current on-screen size, or `None` if not laid out.
    fn presentation_size(&self) -> Option<PresentationSize>;

    fn attach_listeners(&mut self) -> LenscastResult<()>;

    fn detach_listeners(&mut self) -> LenscastResult<()>;
}

/// Optional local preview target for the output surface.
pub trait MountSurface: Send {
    fn mount(&mut self, width: u32, height: u32) -> LenscastResult<()>;

    fn unmount(&mut self) -> LenscastResult<()>;
}

/// Token for one requested display-refresh callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRequest(pub u64);

/// Per-display-refresh scheduler (the host's animation-frame facility).
///
/// When a requested frame fires, the host calls
/// `PipelineHandle::on_display_refresh` with its token.
pub trait DisplayLink: Send {
    fn request_frame(&mut self) -> FrameRequest;

    fn cancel_frame(&mut self, request: FrameRequest);
}
