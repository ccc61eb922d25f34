//! Show the clamped viewport and crop window for a source size.

use lenscast_viewport::{Center, SourceSize, ViewportState, ZoomBounds};

pub fn run(
    source: (u32, u32),
    zoom: f64,
    center: (f64, f64),
    min: f64,
    max: f64,
) -> anyhow::Result<()> {
    let source = SourceSize::new(source.0, source.1);
    if source.is_degenerate() {
        anyhow::bail!("Source size must be non-zero, got {}x{}", source.width, source.height);
    }

    let bounds = ZoomBounds::new(min, max);
    let mut viewport = ViewportState::new(bounds, zoom);
    viewport.set(zoom, Center::new(center.0, center.1), Some(source));

    let rect = viewport
        .crop_rect(source)
        .ok_or_else(|| anyhow::anyhow!("No crop window for {}x{}", source.width, source.height))?;

    println!("Source: {}x{}", source.width, source.height);
    println!("Zoom bounds: [{}, {}]", bounds.min, bounds.max);
    println!(
        "Viewport: zoom {:.4} center ({:.4}, {:.4})",
        viewport.zoom(),
        viewport.center().cx,
        viewport.center().cy
    );
    println!(
        "Crop: left {:.2} top {:.2} width {:.2} height {:.2}",
        rect.left, rect.top, rect.width, rect.height
    );

    Ok(())
}
