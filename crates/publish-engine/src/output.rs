//! Output track manager.
//!
//! Owns the stream continuously sampled from the output surface and binds
//! it to the publication slot: replace the track of an existing
//! publication, or publish a new one.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::RgbaImage;
use lenscast_common::error::{LenscastError, LenscastResult};
use lenscast_render_engine::OutputSurface;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::slot::CameraSlot;
use crate::transport::{PublishOptions, Transport};

type FrameSlot = Option<Arc<RgbaImage>>;

/// How the output ended up in the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindOutcome {
    /// An existing publication had its track swapped.
    Replaced,
    /// A new publication was created.
    Published,
}

/// Producer side of the output stream. Owned by the pipeline.
#[derive(Debug)]
pub struct OutputTrack {
    name: String,
    fps: u32,
    width: u32,
    height: u32,
    sender: Option<watch::Sender<FrameSlot>>,
    receiver: watch::Receiver<FrameSlot>,
    live: Arc<AtomicBool>,
    frames_sent: u64,
}

impl OutputTrack {
    /// Start sampling `surface` at `fps`.
    pub fn capture(surface: &OutputSurface, name: impl Into<String>, fps: u32) -> Self {
        let (sender, receiver) = watch::channel(None);
        Self {
            name: name.into(),
            fps,
            width: surface.width(),
            height: surface.height(),
            sender: Some(sender),
            receiver,
            live: Arc::new(AtomicBool::new(true)),
            frames_sent: 0,
        }
    }

    /// Consumer handle for the transport.
    pub fn local_track(&self) -> LocalVideoTrack {
        LocalVideoTrack {
            name: self.name.clone(),
            fps: self.fps,
            width: self.width,
            height: self.height,
            receiver: self.receiver.clone(),
            live: Arc::clone(&self.live),
        }
    }

    /// Hand a freshly drawn surface frame to consumers. Ignored once stopped.
    pub fn push_frame(&mut self, frame: Arc<RgbaImage>) {
        if let Some(sender) = &self.sender {
            sender.send_replace(Some(frame));
            self.frames_sent += 1;
        }
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// End the stream. Consumers observe `is_live() == false` and a closed
    /// channel. Stopping twice is a no-op.
    pub fn stop(&mut self) -> LenscastResult<()> {
        self.live.store(false, Ordering::SeqCst);
        self.sender.take();
        Ok(())
    }
}

/// Consumer side of the output stream, handed to the transport.
#[derive(Clone)]
pub struct LocalVideoTrack {
    name: String,
    fps: u32,
    width: u32,
    height: u32,
    receiver: watch::Receiver<FrameSlot>,
    live: Arc<AtomicBool>,
}

impl LocalVideoTrack {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Most recent frame, if any has been rendered yet.
    pub fn latest_frame(&self) -> Option<Arc<RgbaImage>> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next frame. Returns `false` once the track has stopped.
    pub async fn next_frame(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }
}

impl fmt::Debug for LocalVideoTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalVideoTrack")
            .field("name", &self.name)
            .field("fps", &self.fps)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("live", &self.is_live())
            .finish()
    }
}

/// Bind `track` to `slot`.
///
/// An existing publication gets its track replaced and is un-muted; a
/// failed un-mute is only logged. Without one, a new publication is
/// created with `options`. Any transport failure becomes a bind error.
pub async fn bind_output(
    transport: &dyn Transport,
    slot: &CameraSlot,
    track: &OutputTrack,
    options: &PublishOptions,
) -> LenscastResult<BindOutcome> {
    match transport.existing_publication(slot.name()) {
        Some(publication) => {
            tracing::info!(%slot, "Replacing track of existing publication");
            publication
                .replace_track(track.local_track())
                .await
                .map_err(|e| {
                    LenscastError::bind(format!("Replacing track in slot '{slot}' failed: {e}"))
                })?;
            if let Err(e) = publication.set_muted(false).await {
                tracing::warn!(%slot, error = %e, "Failed to un-mute replaced publication");
            }
            Ok(BindOutcome::Replaced)
        }
        None => {
            tracing::info!(%slot, name = %options.name, simulcast = options.simulcast, "Publishing new track");
            transport
                .publish_new_track(track.local_track(), options.clone())
                .await
                .map_err(|e| {
                    LenscastError::bind(format!("Publishing track to slot '{slot}' failed: {e}"))
                })?;
            Ok(BindOutcome::Published)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_reach_consumers_until_stop() {
        let surface = OutputSurface::new(4, 2).unwrap();
        let mut track = OutputTrack::capture(&surface, "camera-upscaled", 30);
        let mut consumer = track.local_track();

        assert!(consumer.latest_frame().is_none());
        assert_eq!(consumer.dimensions(), (4, 2));

        track.push_frame(surface.snapshot());
        assert!(consumer.next_frame().await);
        assert_eq!(consumer.latest_frame().unwrap().width(), 4);
        assert_eq!(track.frames_sent(), 1);

        track.stop().unwrap();
        track.stop().unwrap();
        assert!(!consumer.is_live());
        assert!(!consumer.next_frame().await);

        track.push_frame(surface.snapshot());
        assert_eq!(track.frames_sent(), 1);
    }
}
