//! The per-tick frame renderer.
//!
//! Each scheduled tick advances a frame counter; only ticks where
//! `counter % render_every_n_frames == 0` draw. A draw that cannot happen
//! (no metadata yet, unreadable frame) skips that tick and never surfaces
//! an error.

use lenscast_viewport::{CropRect, ViewportState};
use serde::Serialize;

use crate::source::FrameSource;
use crate::surface::{Background, OutputSurface};

/// Why a tick produced no frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The source has not reported usable dimensions yet.
    MissingMetadata,
    /// Reading or drawing the frame failed.
    DrawFailed,
}

/// Result of one render tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Not a render tick under the throttling policy.
    Throttled,
    /// A render tick that produced nothing.
    Skipped(SkipReason),
    /// A frame was drawn from this crop window.
    Rendered(CropRect),
}

impl TickOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, TickOutcome::Rendered(_))
    }
}

/// Counters kept across ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenderStats {
    /// Ticks seen, including throttled ones.
    pub ticks: u64,
    /// Frames actually drawn.
    pub rendered: u64,
    pub skipped_metadata: u64,
    pub skipped_draw: u64,
}

/// Crop-and-scale renderer with frame-skip throttling.
#[derive(Debug, Clone)]
pub struct FrameRenderer {
    render_every_n_frames: u64,
    background: Background,
    stats: RenderStats,
    last_crop: Option<CropRect>,
}

impl FrameRenderer {
    /// `render_every_n_frames` below 1 is treated as 1.
    pub fn new(render_every_n_frames: u32, background: Background) -> Self {
        Self {
            render_every_n_frames: u64::from(render_every_n_frames.max(1)),
            background,
            stats: RenderStats::default(),
            last_crop: None,
        }
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /// Crop window of the most recent successful draw.
    pub fn last_crop(&self) -> Option<CropRect> {
        self.last_crop
    }

    /// Run one scheduled tick.
    ///
    /// Reads the viewport but never writes it.
    pub fn tick<S: FrameSource + ?Sized>(
        &mut self,
        viewport: &ViewportState,
        source: &mut S,
        surface: &mut OutputSurface,
    ) -> TickOutcome {
        self.stats.ticks += 1;
        if self.stats.ticks % self.render_every_n_frames != 0 {
            return TickOutcome::Throttled;
        }

        let crop = source
            .current_pixel_size()
            .and_then(|size| viewport.crop_rect(size));
        let Some(crop) = crop else {
            self.stats.skipped_metadata += 1;
            tracing::trace!(tick = self.stats.ticks, "Source metadata unavailable, skipping tick");
            return TickOutcome::Skipped(SkipReason::MissingMetadata);
        };

        surface.paint(self.background);

        let drawn = source
            .read_frame()
            .and_then(|frame| surface.blit_scaled(&frame, crop));
        match drawn {
            Ok(()) => {
                self.stats.rendered += 1;
                self.last_crop = Some(crop);
                TickOutcome::Rendered(crop)
            }
            Err(e) => {
                self.stats.skipped_draw += 1;
                tracing::debug!(tick = self.stats.ticks, error = %e, "Frame draw failed, skipping tick");
                TickOutcome::Skipped(SkipReason::DrawFailed)
            }
        }
    }
}
