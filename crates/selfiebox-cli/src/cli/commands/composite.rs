//! One-shot local composite.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use selfiebox_core::config::Config;
use selfiebox_core::{Compositor, HttpSegmenter};

pub struct CompositeOptions<'a> {
    pub subject: &'a Path,
    pub backdrop: &'a Path,
    pub output: &'a Path,
    pub config: &'a Config,
}

pub async fn run(options: CompositeOptions<'_>) -> Result<()> {
    let subject = fs::read(options.subject)
        .with_context(|| format!("read subject {}", options.subject.display()))?;
    let backdrop = fs::read(options.backdrop)
        .with_context(|| format!("read backdrop {}", options.backdrop.display()))?;

    let segmenter = HttpSegmenter::from_config(&options.config.segmentation)?;
    tracing::debug!(endpoint = segmenter.endpoint(), "segmenting subject");
    let compositor = Compositor::from_config(Arc::new(segmenter), &options.config.compositor);

    let rendered = compositor
        .composite_detailed(subject, backdrop)
        .await
        .context("composite failed")?;

    fs::write(options.output, &rendered.png_bytes)
        .with_context(|| format!("write {}", options.output.display()))?;

    let placement = rendered.placement;
    println!(
        "Wrote {} ({}x{}, subject {}x{} at {},{})",
        options.output.display(),
        rendered.canvas.width,
        rendered.canvas.height,
        placement.size.width,
        placement.size.height,
        placement.x,
        placement.y,
    );
    Ok(())
}
