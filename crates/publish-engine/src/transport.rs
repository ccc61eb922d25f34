//! Contract with the transport/session collaborator.

use std::sync::Arc;

use lenscast_common::error::LenscastResult;
use serde::{Deserialize, Serialize};

use crate::output::LocalVideoTrack;

/// Logical source a publication represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackSource {
    Camera,
}

/// Options for publishing a brand-new track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOptions {
    pub name: String,
    pub simulcast: bool,
    pub source: TrackSource,
}

/// An existing outgoing publication occupying a slot.
#[async_trait::async_trait]
pub trait Publication: Send + Sync {
    /// Atomically swap the published track, with no unpublish gap.
    async fn replace_track(&self, track: LocalVideoTrack) -> LenscastResult<()>;

    async fn set_muted(&self, muted: bool) -> LenscastResult<()>;
}

/// The real-time session that carries outgoing tracks.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// The publication currently occupying `slot`, if any.
    fn existing_publication(&self, slot: &str) -> Option<Arc<dyn Publication>>;

    /// Publish a new track. Encoding and simulcast layering are the
    /// transport's business.
    async fn publish_new_track(
        &self,
        track: LocalVideoTrack,
        options: PublishOptions,
    ) -> LenscastResult<()>;
}
