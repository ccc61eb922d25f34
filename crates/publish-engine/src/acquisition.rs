//! Contract with the camera acquisition collaborator.

use lenscast_common::error::LenscastResult;
use lenscast_render_engine::FrameSource;
use serde::{Deserialize, Serialize};

/// Callback fired once when the source feed ends (device revoked, unplugged).
pub type EndedCallback = Box<dyn FnOnce() + Send + 'static>;

/// Capture hints passed to the acquisition collaborator. Devices may ignore them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoHints {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

/// A live camera feed owned by the acquisition collaborator.
///
/// The pipeline only references the feed; it stops it exactly once at
/// teardown.
pub trait SourceFeed: FrameSource + Send {
    /// Stop the underlying device track.
    fn stop(&mut self) -> LenscastResult<()>;

    /// Register the callback fired when the feed ends on its own.
    fn on_ended(&mut self, callback: EndedCallback);
}

/// Opens camera feeds.
#[async_trait::async_trait]
pub trait VideoAcquirer: Send + Sync {
    /// Request a live video feed. Failure means the device is busy,
    /// denied or absent.
    async fn acquire_video_feed(&self, hints: VideoHints) -> LenscastResult<Box<dyn SourceFeed>>;
}
