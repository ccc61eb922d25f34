//! Source frames as seen by the renderer.

use std::sync::Arc;

use image::RgbaImage;
use lenscast_common::error::LenscastResult;
use lenscast_viewport::SourceSize;

/// One decoded source frame.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    image: Arc<RgbaImage>,
}

impl VideoFrame {
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    pub fn from_shared(image: Arc<RgbaImage>) -> Self {
        Self { image }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn size(&self) -> SourceSize {
        SourceSize::new(self.image.width(), self.image.height())
    }
}

/// A live stream of frames the renderer can sample.
pub trait FrameSource {
    /// Current pixel dimensions, or `None` while metadata is unavailable.
    fn current_pixel_size(&self) -> Option<SourceSize>;

    /// Read the most recent frame. May fail transiently.
    fn read_frame(&mut self) -> LenscastResult<VideoFrame>;
}
