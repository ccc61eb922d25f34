//! Pipeline lifecycle controller.
//!
//! `start` walks `Created → Acquiring → MetadataReady → Bound → Running`
//! and hands back a [`PipelineHandle`] that owns every resource it
//! allocated. All mutable state lives in the handle; the host drives it
//! from one logical thread by forwarding display-refresh callbacks and
//! input samples.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lenscast_common::clock::RefreshClock;
use lenscast_common::config::PipelineConfig;
use lenscast_common::error::{LenscastError, LenscastResult};
use lenscast_gesture::{GestureConfig, GestureContext, GestureController, GestureEffect};
use lenscast_render_engine::{Background, FrameRenderer, OutputSurface, RenderStats, TickOutcome};
use lenscast_viewport::{Center, InputSample, PresentationSize, SourceSize, ViewportState, ZoomBounds};
use serde::Serialize;

use crate::acquisition::{SourceFeed, VideoAcquirer, VideoHints};
use crate::output::{bind_output, BindOutcome, OutputTrack};
use crate::slot::{CameraSlot, SlotClaim};
use crate::surfaces::{DisplayLink, FrameRequest, InteractionSurface, MountSurface};
use crate::transport::{PublishOptions, TrackSource, Transport};

/// Lifecycle state of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Created,
    Acquiring,
    MetadataReady,
    Bound,
    Running,
    Disposed,
    AcquisitionFailed,
    BindFailed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineState::Disposed | PipelineState::AcquisitionFailed | PipelineState::BindFailed
        )
    }
}

/// Cooperative disposal request, usable before and after `start` returns.
///
/// Clones share the flag. `start` checks it whenever it regains control
/// (after acquisition, while waiting for metadata, after the bind settles)
/// and a started pipeline checks it on every host callback (display refresh,
/// input, presentation resize), including after the feed has ended.
#[derive(Debug, Clone, Default)]
pub struct DisposeSignal {
    requested: Arc<AtomicBool>,
}

impl DisposeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Collaborators handed to [`start`].
pub struct PipelineDeps {
    pub acquirer: Arc<dyn VideoAcquirer>,
    pub transport: Arc<dyn Transport>,
    pub interaction: Box<dyn InteractionSurface>,
    /// Optional local preview target for the output surface.
    pub mount: Option<Box<dyn MountSurface>>,
    pub display_link: Box<dyn DisplayLink>,
    pub slot: CameraSlot,
    pub dispose_signal: DisposeSignal,
}

/// One release step performed by [`PipelineHandle::dispose`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseStep {
    CancelRenderLoop,
    DetachListeners,
    StopOutputTrack,
    StopSourceFeed,
    ReleaseSurface,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepResult {
    pub step: ReleaseStep,
    /// Error message if the step failed.
    pub error: Option<String>,
}

/// What a dispose call did. Empty when the pipeline was already torn down.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisposeReport {
    pub steps: Vec<StepResult>,
}

impl DisposeReport {
    pub fn is_noop(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepResult> {
        self.steps.iter().filter(|s| s.error.is_some())
    }

    pub fn all_ok(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Serializable view of a pipeline for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSnapshot {
    pub state: PipelineState,
    pub zoom: f64,
    pub center: Center,
    pub output_width: u32,
    pub output_height: u32,
    pub source_size: Option<SourceSize>,
    pub running: bool,
    pub feed_ended: bool,
    pub bind_outcome: Option<BindOutcome>,
    pub frames_published: u64,
    pub render: RenderStats,
    /// Wall-clock start time (RFC 3339).
    pub started_at: String,
    pub uptime_ms: f64,
}

/// Control object for a started pipeline.
pub struct PipelineHandle {
    config: PipelineConfig,
    state: PipelineState,
    viewport: ViewportState,
    gestures: GestureController,
    renderer: FrameRenderer,
    feed: Option<Box<dyn SourceFeed>>,
    feed_ended: Arc<AtomicBool>,
    source_size: Option<SourceSize>,
    surface: Option<OutputSurface>,
    mount: Option<Box<dyn MountSurface>>,
    mounted: bool,
    track: Option<OutputTrack>,
    frames_published: u64,
    bind_outcome: Option<BindOutcome>,
    interaction: Box<dyn InteractionSurface>,
    listeners_attached: bool,
    display_link: Box<dyn DisplayLink>,
    pending_frame: Option<FrameRequest>,
    running: bool,
    claim: Option<SlotClaim>,
    dispose_signal: DisposeSignal,
    clock: RefreshClock,
}

/// Start a pipeline.
///
/// Fails with an acquisition error if no feed can be obtained, with a bind
/// error if neither replace nor publish succeeds, with `SlotBusy` if the
/// slot is owned by another pipeline, and with `Disposed` if disposal was
/// requested before the pipeline reached `Running`. Every failure releases
/// whatever had been allocated.
pub async fn start(config: &PipelineConfig, deps: PipelineDeps) -> LenscastResult<PipelineHandle> {
    let config = config.normalized();
    let background = Background::from_config(config.background.as_deref())?;

    let PipelineDeps {
        acquirer,
        transport,
        interaction,
        mount,
        display_link,
        slot,
        dispose_signal,
    } = deps;

    let claim = slot.claim()?;
    let mut state = PipelineState::Created;
    transition(&mut state, PipelineState::Acquiring);

    let hints = VideoHints {
        width: config.width,
        height: config.height,
        fps: config.fps,
    };
    let mut feed = match acquirer.acquire_video_feed(hints).await {
        Ok(feed) => feed,
        Err(e) => {
            transition(&mut state, PipelineState::AcquisitionFailed);
            tracing::error!(%slot, error = %e, "Video acquisition failed");
            return Err(match e {
                LenscastError::Acquisition { .. } => e,
                other => LenscastError::acquisition(other.to_string()),
            });
        }
    };

    let feed_ended = Arc::new(AtomicBool::new(false));
    let ended_flag = Arc::clone(&feed_ended);
    feed.on_ended(Box::new(move || ended_flag.store(true, Ordering::SeqCst)));

    let bounds = ZoomBounds::new(config.min_zoom, config.max_zoom);
    let mut handle = PipelineHandle {
        viewport: ViewportState::new(bounds, config.effective_initial_zoom()),
        gestures: GestureController::new(GestureConfig {
            wheel_step: config.wheel_step,
            ..GestureConfig::default()
        }),
        renderer: FrameRenderer::new(config.render_every_n_frames, background),
        feed: Some(feed),
        feed_ended,
        source_size: None,
        surface: None,
        mount,
        mounted: false,
        track: None,
        frames_published: 0,
        bind_outcome: None,
        interaction,
        listeners_attached: false,
        display_link,
        pending_frame: None,
        running: false,
        claim: Some(claim),
        dispose_signal,
        clock: RefreshClock::start(),
        state,
        config,
    };

    let source = match handle.wait_for_metadata().await {
        Ok(source) => source,
        Err(e) => {
            let terminal = match e {
                LenscastError::Disposed => PipelineState::Disposed,
                _ => PipelineState::AcquisitionFailed,
            };
            handle.teardown(terminal);
            return Err(e);
        }
    };
    handle.source_size = Some(source);
    handle.viewport.reclamp(source);
    handle.transition(PipelineState::MetadataReady);
    tracing::info!(
        source_width = source.width,
        source_height = source.height,
        "Source metadata ready"
    );

    let surface = match OutputSurface::new(handle.config.width, handle.config.height) {
        Ok(surface) => surface,
        Err(e) => {
            handle.teardown(PipelineState::BindFailed);
            return Err(LenscastError::bind(format!("Output surface unavailable: {e}")));
        }
    };
    if let Some(mount) = handle.mount.as_mut() {
        match mount.mount(surface.width(), surface.height()) {
            Ok(()) => handle.mounted = true,
            Err(e) => tracing::warn!(error = %e, "Failed to mount output surface for preview"),
        }
    }
    let track = OutputTrack::capture(&surface, handle.config.track_name.clone(), handle.config.fps);
    handle.surface = Some(surface);

    let options = PublishOptions {
        name: handle.config.track_name.clone(),
        simulcast: handle.config.simulcast,
        source: TrackSource::Camera,
    };
    let bound = bind_output(&*transport, &slot, &track, &options).await;
    handle.track = Some(track);
    match bound {
        Ok(outcome) => {
            handle.bind_outcome = Some(outcome);
            handle.transition(PipelineState::Bound);
        }
        Err(e) => {
            tracing::error!(%slot, error = %e, "Binding output failed, rolling back");
            handle.teardown(PipelineState::BindFailed);
            return Err(e);
        }
    }

    if handle.dispose_signal.is_requested() {
        tracing::info!(%slot, "Dispose requested during bind, tearing down");
        handle.teardown(PipelineState::Disposed);
        return Err(LenscastError::Disposed);
    }

    match handle.interaction.attach_listeners() {
        Ok(()) => handle.listeners_attached = true,
        Err(e) => tracing::warn!(error = %e, "Failed to attach gesture listeners"),
    }
    handle.pending_frame = Some(handle.display_link.request_frame());
    handle.running = true;
    handle.transition(PipelineState::Running);

    tracing::info!(
        %slot,
        width = handle.config.width,
        height = handle.config.height,
        fps = handle.config.fps,
        zoom = handle.viewport.zoom(),
        "Pipeline running"
    );
    Ok(handle)
}

fn transition(state: &mut PipelineState, next: PipelineState) {
    tracing::debug!(from = ?state, to = ?next, "Pipeline state transition");
    *state = next;
}

impl PipelineHandle {
    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn zoom(&self) -> f64 {
        self.viewport.zoom()
    }

    pub fn center(&self) -> Center {
        self.viewport.center()
    }

    pub fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn bind_outcome(&self) -> Option<BindOutcome> {
        self.bind_outcome
    }

    /// Whether the render loop is still scheduled.
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn feed_ended(&self) -> bool {
        self.feed_ended.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> RenderStats {
        self.renderer.stats()
    }

    pub fn dispose_signal(&self) -> DisposeSignal {
        self.dispose_signal.clone()
    }

    /// Set the zoom factor, clamped to the configured bounds.
    pub fn set_zoom(&mut self, zoom: f64) {
        let source = self.current_source_size();
        self.viewport.set_zoom(zoom, source);
    }

    /// Set the normalized crop center, clamped so the crop stays in the source.
    pub fn set_center(&mut self, cx: f64, cy: f64) {
        let source = self.current_source_size();
        self.viewport.set_center(Center::new(cx, cy), source);
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            state: self.state,
            zoom: self.viewport.zoom(),
            center: self.viewport.center(),
            output_width: self.config.width,
            output_height: self.config.height,
            source_size: self.source_size,
            running: self.running,
            feed_ended: self.feed_ended(),
            bind_outcome: self.bind_outcome,
            frames_published: self.frames_published,
            render: self.renderer.stats(),
            started_at: self.clock.epoch_wall().to_string(),
            uptime_ms: self.clock.elapsed_ms(),
        }
    }

    /// Feed one input sample from the interaction surface.
    ///
    /// Samples are ignored unless gesture listeners are attached.
    pub fn handle_input(&mut self, sample: &InputSample) -> GestureEffect {
        if self.honor_dispose_signal() || !self.listeners_attached {
            return GestureEffect::None;
        }

        let presentation = self.interaction.presentation_size().unwrap_or_else(|| {
            PresentationSize::new(f64::from(self.config.width), f64::from(self.config.height))
        });
        let ctx = GestureContext {
            presentation,
            source: self.current_source_size(),
        };
        let effect = self.gestures.handle(&mut self.viewport, sample, &ctx);

        if self.config.debug && effect != GestureEffect::None {
            tracing::debug!(
                sample = sample.kind(),
                ?effect,
                zoom = self.viewport.zoom(),
                cx = self.viewport.center().cx,
                cy = self.viewport.center().cy,
                "Gesture applied"
            );
        }
        effect
    }

    /// Display-refresh callback for a previously requested frame.
    ///
    /// Returns `None` when the callback was a no-op: the loop is stopped,
    /// the request is stale, or the feed has ended.
    pub fn on_display_refresh(&mut self, request: FrameRequest) -> Option<TickOutcome> {
        if self.honor_dispose_signal() || !self.running {
            return None;
        }
        if self.pending_frame != Some(request) {
            tracing::trace!(request = request.0, "Ignoring stale frame callback");
            return None;
        }
        self.pending_frame = None;

        if self.feed_ended() {
            self.running = false;
            tracing::info!("Source feed ended, render loop stopped until dispose");
            return None;
        }
        self.pending_frame = Some(self.display_link.request_frame());

        let (Some(feed), Some(surface)) = (self.feed.as_mut(), self.surface.as_mut()) else {
            return None;
        };

        let size = feed.current_pixel_size().filter(|s| !s.is_degenerate());
        if let Some(size) = size {
            if self.source_size != Some(size) {
                tracing::info!(
                    width = size.width,
                    height = size.height,
                    "Source dimensions changed, re-clamping viewport"
                );
                self.source_size = Some(size);
                self.viewport.reclamp(size);
            }
        }

        let outcome = self.renderer.tick(&self.viewport, &mut **feed, surface);
        match outcome {
            TickOutcome::Rendered(_) => {
                if let Some(track) = self.track.as_mut() {
                    track.push_frame(surface.snapshot());
                    self.frames_published += 1;
                }
            }
            TickOutcome::Skipped(reason) if self.config.debug => {
                tracing::debug!(?reason, tick = self.renderer.stats().ticks, "Render tick skipped");
            }
            _ => {}
        }
        Some(outcome)
    }

    /// The interaction surface was resized or rotated.
    ///
    /// Output resolution and the render loop are unaffected; gestures read
    /// the new presentation size on the next sample.
    pub fn on_presentation_resize(&mut self) {
        if self.honor_dispose_signal() {
            return;
        }
        tracing::debug!(
            presentation = ?self.interaction.presentation_size(),
            output_width = self.config.width,
            output_height = self.config.height,
            "Presentation size changed"
        );
    }

    /// Tear the pipeline down. Calling it again is a no-op.
    pub fn dispose(&mut self) -> DisposeReport {
        if self.state.is_terminal() {
            return DisposeReport::default();
        }
        self.dispose_signal.request();
        let report = self.teardown(PipelineState::Disposed);
        tracing::info!(failures = report.failures().count(), "Pipeline disposed");
        report
    }

    /// Dispose if the signal was raised from outside. Returns true when the
    /// pipeline is torn down by this call.
    fn honor_dispose_signal(&mut self) -> bool {
        if self.state.is_terminal() || !self.dispose_signal.is_requested() {
            return false;
        }
        tracing::debug!("Dispose signal raised, tearing down");
        self.dispose();
        true
    }

    fn transition(&mut self, next: PipelineState) {
        transition(&mut self.state, next);
    }

    fn current_source_size(&self) -> Option<SourceSize> {
        self.feed
            .as_ref()
            .and_then(|feed| feed.current_pixel_size())
            .filter(|s| !s.is_degenerate())
            .or(self.source_size)
    }

    /// Poll the feed until it reports usable dimensions. No timeout.
    async fn wait_for_metadata(&mut self) -> LenscastResult<SourceSize> {
        let poll = Duration::from_millis(self.config.metadata_poll_ms);
        loop {
            if self.dispose_signal.is_requested() {
                return Err(LenscastError::Disposed);
            }
            if self.feed_ended() {
                return Err(LenscastError::acquisition(
                    "Source feed ended before reporting its dimensions",
                ));
            }
            let size = self
                .feed
                .as_ref()
                .and_then(|feed| feed.current_pixel_size())
                .filter(|s| !s.is_degenerate());
            if let Some(size) = size {
                return Ok(size);
            }
            tokio::time::sleep(poll).await;
        }
    }

    /// Run every release step, each independently of the others.
    fn teardown(&mut self, terminal: PipelineState) -> DisposeReport {
        let mut report = DisposeReport::default();

        // The flag goes down before the cancel so a callback already in
        // flight sees a stopped loop.
        self.running = false;
        let pending = self.pending_frame.take();
        let result = match pending {
            Some(request) => {
                self.display_link.cancel_frame(request);
                Ok(())
            }
            None => Ok(()),
        };
        record(&mut report, ReleaseStep::CancelRenderLoop, result);

        let result = if std::mem::take(&mut self.listeners_attached) {
            self.gestures.reset();
            self.interaction.detach_listeners()
        } else {
            Ok(())
        };
        record(&mut report, ReleaseStep::DetachListeners, result);

        let result = match self.track.as_mut() {
            Some(track) => track.stop(),
            None => Ok(()),
        };
        record(&mut report, ReleaseStep::StopOutputTrack, result);

        let result = match self.feed.take() {
            Some(mut feed) => feed.stop(),
            None => Ok(()),
        };
        record(&mut report, ReleaseStep::StopSourceFeed, result);

        let result = match (std::mem::take(&mut self.mounted), self.mount.as_mut()) {
            (true, Some(mount)) => mount.unmount(),
            _ => Ok(()),
        };
        self.surface = None;
        record(&mut report, ReleaseStep::ReleaseSurface, result);

        if let Some(mut claim) = self.claim.take() {
            claim.release();
        }
        self.transition(terminal);
        report
    }
}

fn record(report: &mut DisposeReport, step: ReleaseStep, result: LenscastResult<()>) {
    let error = match result {
        Ok(()) => {
            tracing::debug!(?step, "Release step complete");
            None
        }
        Err(e) => {
            tracing::warn!(?step, error = %e, "Release step failed");
            Some(e.to_string())
        }
    };
    report.steps.push(StepResult { step, error });
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            self.dispose();
        }
    }
}

impl std::fmt::Debug for PipelineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineHandle")
            .field("state", &self.state)
            .field("viewport", &self.viewport)
            .field("running", &self.running)
            .field("listeners_attached", &self.listeners_attached)
            .finish_non_exhaustive()
    }
}
