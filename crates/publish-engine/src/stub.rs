//! In-memory collaborators for tests, demos, and the `lenscast simulate`
//! command.
//!
//! Each stub is paired with a cloneable probe that stays with the caller
//! after the stub itself has been moved into [`PipelineDeps`](crate::PipelineDeps).

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use lenscast_common::error::{LenscastError, LenscastResult};
use lenscast_render_engine::{FrameSource, TickOutcome, VideoFrame};
use lenscast_viewport::{PresentationSize, SourceSize};
use tokio::sync::Notify;

use crate::acquisition::{EndedCallback, SourceFeed, VideoAcquirer, VideoHints};
use crate::output::LocalVideoTrack;
use crate::pipeline::PipelineHandle;
use crate::surfaces::{DisplayLink, FrameRequest, InteractionSurface, MountSurface};
use crate::transport::{Publication, PublishOptions, Transport};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Synthetic test pattern: red ramps left to right, green top to bottom.
pub fn test_pattern(width: u32, height: u32) -> RgbaImage {
    let w = width.max(1);
    let h = height.max(1);
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 255 / w) as u8, (y * 255 / h) as u8, 128, 255])
    })
}

// ---------------------------------------------------------------------------
// Source feed
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FeedState {
    size: Option<SourceSize>,
    hidden_queries: u32,
    failing_reads: u32,
    reads: u64,
    stop_calls: u32,
    ended: Option<EndedCallback>,
    pattern: Option<Arc<RgbaImage>>,
}

/// Observes and steers a [`StubFeed`].
#[derive(Clone, Default)]
pub struct FeedProbe {
    state: Arc<Mutex<FeedState>>,
}

impl FeedProbe {
    /// A feed that reports `size` as soon as it is queried.
    pub fn new(size: SourceSize) -> Self {
        let probe = Self::default();
        lock(&probe.state).size = Some(size);
        probe
    }

    /// Report no dimensions for the first `queries` size queries.
    pub fn delay_metadata(&self, queries: u32) {
        lock(&self.state).hidden_queries = queries;
    }

    /// Change the reported dimensions (e.g. a camera rotation).
    pub fn set_size(&self, size: Option<SourceSize>) {
        let mut state = lock(&self.state);
        state.size = size;
        state.pattern = None;
    }

    /// Make the next `count` frame reads fail.
    pub fn fail_reads(&self, count: u32) {
        lock(&self.state).failing_reads = count;
    }

    pub fn reads(&self) -> u64 {
        lock(&self.state).reads
    }

    pub fn stop_calls(&self) -> u32 {
        lock(&self.state).stop_calls
    }

    /// Simulate the device going away. Returns false if nobody listened.
    pub fn fire_ended(&self) -> bool {
        let callback = lock(&self.state).ended.take();
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for FeedProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("FeedProbe")
            .field("size", &state.size)
            .field("reads", &state.reads)
            .field("stop_calls", &state.stop_calls)
            .finish()
    }
}

/// A feed producing a synthetic test pattern at the probe's current size.
#[derive(Debug)]
pub struct StubFeed {
    probe: FeedProbe,
}

impl StubFeed {
    pub fn new(probe: FeedProbe) -> Self {
        Self { probe }
    }
}

impl FrameSource for StubFeed {
    fn current_pixel_size(&self) -> Option<SourceSize> {
        let mut state = lock(&self.probe.state);
        if state.hidden_queries > 0 {
            state.hidden_queries -= 1;
            return None;
        }
        state.size
    }

    fn read_frame(&mut self) -> LenscastResult<VideoFrame> {
        let mut state = lock(&self.probe.state);
        state.reads += 1;
        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(LenscastError::render("stub feed read failure"));
        }
        let size = state
            .size
            .ok_or_else(|| LenscastError::render("stub feed has no dimensions"))?;
        let pattern = state
            .pattern
            .get_or_insert_with(|| Arc::new(test_pattern(size.width, size.height)));
        Ok(VideoFrame::from_shared(Arc::clone(pattern)))
    }
}

impl SourceFeed for StubFeed {
    fn stop(&mut self) -> LenscastResult<()> {
        lock(&self.probe.state).stop_calls += 1;
        Ok(())
    }

    fn on_ended(&mut self, callback: EndedCallback) {
        lock(&self.probe.state).ended = Some(callback);
    }
}

/// Hands out [`StubFeed`]s, or fails every request.
#[derive(Debug)]
pub struct StubAcquirer {
    feed: Option<FeedProbe>,
    failure: Option<String>,
    calls: AtomicU32,
    last_hints: Mutex<Option<VideoHints>>,
}

impl StubAcquirer {
    pub fn new(probe: FeedProbe) -> Self {
        Self {
            feed: Some(probe),
            failure: None,
            calls: AtomicU32::new(0),
            last_hints: Mutex::new(None),
        }
    }

    /// An acquirer whose device is busy or denied.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            feed: None,
            failure: Some(message.into()),
            calls: AtomicU32::new(0),
            last_hints: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_hints(&self) -> Option<VideoHints> {
        *lock(&self.last_hints)
    }
}

#[async_trait]
impl VideoAcquirer for StubAcquirer {
    async fn acquire_video_feed(&self, hints: VideoHints) -> LenscastResult<Box<dyn SourceFeed>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.last_hints) = Some(hints);
        match (&self.feed, &self.failure) {
            (_, Some(message)) => Err(LenscastError::acquisition(message.clone())),
            (Some(probe), None) => Ok(Box::new(StubFeed::new(probe.clone()))),
            (None, None) => Err(LenscastError::acquisition("no stub feed configured")),
        }
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// An existing publication occupying a slot.
#[derive(Debug)]
pub struct StubPublication {
    muted: Mutex<bool>,
    fail_replace: bool,
    fail_unmute: bool,
    tracks: Mutex<Vec<LocalVideoTrack>>,
}

impl StubPublication {
    pub fn new(muted: bool) -> Self {
        Self {
            muted: Mutex::new(muted),
            fail_replace: false,
            fail_unmute: false,
            tracks: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_replace(mut self) -> Self {
        self.fail_replace = true;
        self
    }

    pub fn failing_unmute(mut self) -> Self {
        self.fail_unmute = true;
        self
    }

    pub fn is_muted(&self) -> bool {
        *lock(&self.muted)
    }

    pub fn replace_count(&self) -> usize {
        lock(&self.tracks).len()
    }

    /// Track currently carried by this publication.
    pub fn current_track(&self) -> Option<LocalVideoTrack> {
        lock(&self.tracks).last().cloned()
    }
}

#[async_trait]
impl Publication for StubPublication {
    async fn replace_track(&self, track: LocalVideoTrack) -> LenscastResult<()> {
        if self.fail_replace {
            return Err(LenscastError::transport("replace rejected by stub"));
        }
        lock(&self.tracks).push(track);
        Ok(())
    }

    async fn set_muted(&self, muted: bool) -> LenscastResult<()> {
        if self.fail_unmute {
            return Err(LenscastError::transport("mute change rejected by stub"));
        }
        *lock(&self.muted) = muted;
        Ok(())
    }
}

/// In-memory transport with at most one existing publication.
#[derive(Debug, Default)]
pub struct StubTransport {
    existing: Option<(String, Arc<StubPublication>)>,
    fail_publish: bool,
    gate: Option<Arc<Notify>>,
    published: Mutex<Vec<(LocalVideoTrack, PublishOptions)>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate `slot` with an existing publication.
    pub fn with_existing(mut self, slot: impl Into<String>, publication: Arc<StubPublication>) -> Self {
        self.existing = Some((slot.into(), publication));
        self
    }

    pub fn failing_publish(mut self) -> Self {
        self.fail_publish = true;
        self
    }

    /// Hold every publish until `gate` is notified.
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn published_count(&self) -> usize {
        lock(&self.published).len()
    }

    pub fn last_published(&self) -> Option<(LocalVideoTrack, PublishOptions)> {
        lock(&self.published).last().cloned()
    }
}

#[async_trait]
impl Transport for StubTransport {
    fn existing_publication(&self, slot: &str) -> Option<Arc<dyn Publication>> {
        match &self.existing {
            Some((name, publication)) if name == slot => {
                Some(Arc::clone(publication) as Arc<dyn Publication>)
            }
            _ => None,
        }
    }

    async fn publish_new_track(
        &self,
        track: LocalVideoTrack,
        options: PublishOptions,
    ) -> LenscastResult<()> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail_publish {
            return Err(LenscastError::transport("publish rejected by stub"));
        }
        lock(&self.published).push((track, options));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Host surfaces
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct InteractionState {
    size: Option<PresentationSize>,
    attached: bool,
    attach_calls: u32,
    detach_calls: u32,
    fail_attach: bool,
    fail_detach: bool,
}

/// Observes and steers a [`StubInteractionSurface`].
#[derive(Debug, Clone, Default)]
pub struct InteractionProbe {
    state: Arc<Mutex<InteractionState>>,
}

impl InteractionProbe {
    pub fn new(size: PresentationSize) -> Self {
        let probe = Self::default();
        lock(&probe.state).size = Some(size);
        probe
    }

    pub fn set_size(&self, size: Option<PresentationSize>) {
        lock(&self.state).size = size;
    }

    pub fn fail_attach(&self) {
        lock(&self.state).fail_attach = true;
    }

    pub fn fail_detach(&self) {
        lock(&self.state).fail_detach = true;
    }

    pub fn is_attached(&self) -> bool {
        lock(&self.state).attached
    }

    pub fn attach_calls(&self) -> u32 {
        lock(&self.state).attach_calls
    }

    pub fn detach_calls(&self) -> u32 {
        lock(&self.state).detach_calls
    }
}

#[derive(Debug)]
pub struct StubInteractionSurface {
    probe: InteractionProbe,
}

impl StubInteractionSurface {
    pub fn new(probe: InteractionProbe) -> Self {
        Self { probe }
    }
}

impl InteractionSurface for StubInteractionSurface {
    fn presentation_size(&self) -> Option<PresentationSize> {
        lock(&self.probe.state).size
    }

    fn attach_listeners(&mut self) -> LenscastResult<()> {
        let mut state = lock(&self.probe.state);
        state.attach_calls += 1;
        if state.fail_attach {
            return Err(LenscastError::surface("interaction surface detached"));
        }
        state.attached = true;
        Ok(())
    }

    fn detach_listeners(&mut self) -> LenscastResult<()> {
        let mut state = lock(&self.probe.state);
        state.detach_calls += 1;
        state.attached = false;
        if state.fail_detach {
            return Err(LenscastError::surface("listener removal failed"));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MountState {
    mounted: Option<(u32, u32)>,
    mount_calls: u32,
    unmount_calls: u32,
    fail_mount: bool,
    fail_unmount: bool,
}

/// Observes and steers a [`StubMountSurface`].
#[derive(Debug, Clone, Default)]
pub struct MountProbe {
    state: Arc<Mutex<MountState>>,
}

impl MountProbe {
    pub fn fail_mount(&self) {
        lock(&self.state).fail_mount = true;
    }

    pub fn fail_unmount(&self) {
        lock(&self.state).fail_unmount = true;
    }

    /// Dimensions of the currently mounted surface.
    pub fn mounted(&self) -> Option<(u32, u32)> {
        lock(&self.state).mounted
    }

    pub fn mount_calls(&self) -> u32 {
        lock(&self.state).mount_calls
    }

    pub fn unmount_calls(&self) -> u32 {
        lock(&self.state).unmount_calls
    }
}

#[derive(Debug)]
pub struct StubMountSurface {
    probe: MountProbe,
}

impl StubMountSurface {
    pub fn new(probe: MountProbe) -> Self {
        Self { probe }
    }
}

impl MountSurface for StubMountSurface {
    fn mount(&mut self, width: u32, height: u32) -> LenscastResult<()> {
        let mut state = lock(&self.probe.state);
        state.mount_calls += 1;
        if state.fail_mount {
            return Err(LenscastError::surface("mount target missing"));
        }
        state.mounted = Some((width, height));
        Ok(())
    }

    fn unmount(&mut self) -> LenscastResult<()> {
        let mut state = lock(&self.probe.state);
        state.unmount_calls += 1;
        state.mounted = None;
        if state.fail_unmount {
            return Err(LenscastError::surface("unmount failed"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Display link
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct LinkState {
    next_id: u64,
    pending: Vec<FrameRequest>,
    cancelled: Vec<FrameRequest>,
}

/// Observes a [`ManualDisplayLink`] and fires its requests.
#[derive(Debug, Clone, Default)]
pub struct DisplayProbe {
    state: Arc<Mutex<LinkState>>,
}

impl DisplayProbe {
    /// Oldest outstanding request, if any.
    pub fn pending(&self) -> Option<FrameRequest> {
        lock(&self.state).pending.first().copied()
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.state).pending.len()
    }

    /// Total requests ever made.
    pub fn requested(&self) -> u64 {
        lock(&self.state).next_id
    }

    pub fn cancelled(&self) -> Vec<FrameRequest> {
        lock(&self.state).cancelled.clone()
    }

    /// Remove the oldest outstanding request, as if its refresh fired.
    pub fn fire(&self) -> Option<FrameRequest> {
        let mut state = lock(&self.state);
        if state.pending.is_empty() {
            None
        } else {
            Some(state.pending.remove(0))
        }
    }
}

/// A display link that only advances when told to.
#[derive(Debug)]
pub struct ManualDisplayLink {
    probe: DisplayProbe,
}

impl ManualDisplayLink {
    pub fn new(probe: DisplayProbe) -> Self {
        Self { probe }
    }
}

impl DisplayLink for ManualDisplayLink {
    fn request_frame(&mut self) -> FrameRequest {
        let mut state = lock(&self.probe.state);
        state.next_id += 1;
        let request = FrameRequest(state.next_id);
        state.pending.push(request);
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        let mut state = lock(&self.probe.state);
        state.pending.retain(|r| *r != request);
        state.cancelled.push(request);
    }
}

/// Fire up to `ticks` display refreshes into `handle`.
///
/// Stops early once the pipeline no longer requests frames.
pub fn run_refreshes(
    handle: &mut PipelineHandle,
    link: &DisplayProbe,
    ticks: usize,
) -> Vec<Option<TickOutcome>> {
    let mut outcomes = Vec::with_capacity(ticks);
    for _ in 0..ticks {
        let Some(request) = link.fire() else {
            break;
        };
        outcomes.push(handle.on_display_refresh(request));
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_hides_metadata_then_reports_size() {
        let probe = FeedProbe::new(SourceSize::new(64, 48));
        probe.delay_metadata(2);
        let feed = StubFeed::new(probe.clone());
        assert_eq!(feed.current_pixel_size(), None);
        assert_eq!(feed.current_pixel_size(), None);
        assert_eq!(feed.current_pixel_size(), Some(SourceSize::new(64, 48)));
    }

    #[test]
    fn feed_pattern_matches_size_and_fails_on_demand() {
        let probe = FeedProbe::new(SourceSize::new(10, 4));
        let mut feed = StubFeed::new(probe.clone());
        probe.fail_reads(1);
        assert!(feed.read_frame().is_err());
        let frame = feed.read_frame().unwrap();
        assert_eq!(frame.size(), SourceSize::new(10, 4));
        assert_eq!(frame.image().get_pixel(0, 0), &Rgba([0, 0, 128, 255]));
        assert_eq!(probe.reads(), 2);
    }

    #[test]
    fn ended_callback_fires_once() {
        let probe = FeedProbe::new(SourceSize::new(2, 2));
        let mut feed = StubFeed::new(probe.clone());
        let hits = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&hits);
        feed.on_ended(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(probe.fire_ended());
        assert!(!probe.fire_ended());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn display_link_tracks_pending_and_cancelled() {
        let probe = DisplayProbe::default();
        let mut link = ManualDisplayLink::new(probe.clone());
        let first = link.request_frame();
        let second = link.request_frame();
        assert_eq!(probe.pending_count(), 2);
        link.cancel_frame(second);
        assert_eq!(probe.fire(), Some(first));
        assert_eq!(probe.fire(), None);
        assert_eq!(probe.cancelled(), vec![second]);
        assert_eq!(probe.requested(), 2);
    }

    #[tokio::test]
    async fn failing_acquirer_reports_acquisition_error() {
        let acquirer = StubAcquirer::failing("device busy");
        let hints = VideoHints {
            width: 1280,
            height: 720,
            fps: 30,
        };
        let err = acquirer.acquire_video_feed(hints).await.err().unwrap();
        assert!(matches!(err, LenscastError::Acquisition { .. }));
        assert_eq!(acquirer.calls(), 1);
        assert_eq!(acquirer.last_hints(), Some(hints));
    }
}
