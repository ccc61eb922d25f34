//! Run a pipeline end to end against in-memory collaborators.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use lenscast_common::clock::{RateController, RefreshClock};
use lenscast_common::config::PipelineConfig;
use lenscast_publish_engine::stub::{
    DisplayProbe, FeedProbe, InteractionProbe, ManualDisplayLink, MountProbe, StubAcquirer,
    StubInteractionSurface, StubMountSurface, StubTransport,
};
use lenscast_publish_engine::{start, CameraSlot, DisposeSignal, PipelineDeps, PipelineSnapshot};
use lenscast_render_engine::TickOutcome;
use lenscast_viewport::{InputSample, PresentationSize, SourceSize};

pub struct SimulateOptions {
    pub pipeline: PipelineConfig,
    pub source: (u32, u32),
    pub ticks: usize,
    pub zoom: Option<f64>,
    pub center: Option<(f64, f64)>,
    pub metadata_delay: u32,
    pub end_after: Option<usize>,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub json: bool,
    pub realtime: bool,
}

pub async fn run(options: SimulateOptions) -> anyhow::Result<()> {
    let samples = match &options.input {
        Some(path) => load_samples(path)?,
        None => Vec::new(),
    };

    let (source_width, source_height) = options.source;
    let feed = FeedProbe::new(SourceSize::new(source_width, source_height));
    feed.delay_metadata(options.metadata_delay);
    let transport = Arc::new(StubTransport::new());
    let link = DisplayProbe::default();
    let interaction = InteractionProbe::new(PresentationSize::new(
        f64::from(options.pipeline.width),
        f64::from(options.pipeline.height),
    ));

    let deps = PipelineDeps {
        acquirer: Arc::new(StubAcquirer::new(feed.clone())),
        transport: transport.clone(),
        interaction: Box::new(StubInteractionSurface::new(interaction)),
        mount: Some(Box::new(StubMountSurface::new(MountProbe::default()))),
        display_link: Box::new(ManualDisplayLink::new(link.clone())),
        slot: CameraSlot::new(options.pipeline.slot_name.clone()),
        dispose_signal: DisposeSignal::new(),
    };

    let mut handle = start(&options.pipeline, deps)
        .await
        .map_err(|e| anyhow::anyhow!("Pipeline failed to start: {e}"))?;

    if let Some(zoom) = options.zoom {
        handle.set_zoom(zoom);
    }
    if let Some((cx, cy)) = options.center {
        handle.set_center(cx, cy);
    }
    for sample in &samples {
        handle.handle_input(sample);
    }

    let clock = RefreshClock::start();
    let mut pacer = RateController::new(options.pipeline.fps);
    if options.realtime {
        tracing::info!(
            fps = options.pipeline.fps,
            interval_ns = pacer.interval_ns(),
            "Pacing refreshes in real time"
        );
    }
    let mut rendered = 0usize;
    let mut skipped = 0usize;
    for tick in 0..options.ticks {
        if options.realtime {
            while !pacer.should_tick(clock.elapsed_ns()) {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        }
        if options.end_after == Some(tick) {
            feed.fire_ended();
        }
        let Some(request) = link.fire() else {
            tracing::info!(tick, "Render loop stopped");
            break;
        };
        match handle.on_display_refresh(request) {
            Some(TickOutcome::Rendered(_)) => rendered += 1,
            Some(TickOutcome::Skipped(_)) => skipped += 1,
            _ => {}
        }
    }

    let snapshot = handle.snapshot();
    let report = handle.dispose();

    if let Some(path) = &options.output {
        let (track, _) = transport.last_published().context("No track was published")?;
        let frame = track.latest_frame().context("No frame was rendered")?;
        frame
            .save(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Wrote last frame to {}", path.display());
    }

    if options.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_snapshot(&snapshot, rendered, skipped, samples.len());
    }

    for failure in report.failures() {
        println!(
            "  [WARN] {:?} failed: {}",
            failure.step,
            failure.error.as_deref().unwrap_or("unknown")
        );
    }

    Ok(())
}

fn load_samples(path: &Path) -> anyhow::Result<Vec<InputSample>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input samples from {}", path.display()))?;
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .map(|(i, line)| {
            serde_json::from_str::<InputSample>(line).with_context(|| format!("Invalid sample on line {}", i + 1))
        })
        .collect()
}

fn print_snapshot(snapshot: &PipelineSnapshot, rendered: usize, skipped: usize, samples: usize) {
    println!("Pipeline simulation");
    println!("{}", "=".repeat(50));
    println!("  Output: {}x{}", snapshot.output_width, snapshot.output_height);
    if let Some(source) = snapshot.source_size {
        println!("  Source: {}x{}", source.width, source.height);
    }
    println!("  Bind: {:?}", snapshot.bind_outcome);
    println!(
        "  Viewport: zoom {:.3} center ({:.4}, {:.4})",
        snapshot.zoom, snapshot.center.cx, snapshot.center.cy
    );
    if samples > 0 {
        println!("  Input samples replayed: {samples}");
    }
    println!();
    println!("Render loop:");
    println!("  Ticks: {}", snapshot.render.ticks);
    println!("  Rendered: {rendered}");
    println!("  Skipped: {skipped}");
    println!("  Frames published: {}", snapshot.frames_published);
    println!("  Started: {}", snapshot.started_at);
    if snapshot.feed_ended {
        println!("  Source feed ended before the run finished");
    }
}
