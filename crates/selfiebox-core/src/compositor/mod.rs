//! Background removal + fit + center + alpha composite.
//!
//! [`Compositor::composite`] keeps no state between calls. The
//! segmentation call is awaited on the caller's task; the CPU-bound steps
//! run on tokio's blocking pool.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;

use crate::config::CompositorConfig;
use crate::error::{CompositeError, CompositeResult};
use crate::segment::Segmenter;

mod layout;
mod render;

pub use layout::{Placement, Size, center_offset, fit_within, place};
pub use render::{RenderedComposite, compose_layers, paste_with_alpha, to_png};

pub struct Compositor {
    segmenter: Arc<dyn Segmenter>,
    permits: Arc<Semaphore>,
    timeout: Option<Duration>,
}

impl Compositor {
    pub fn new(segmenter: Arc<dyn Segmenter>) -> Self {
        Self::from_config(segmenter, &CompositorConfig::default())
    }

    pub fn from_config(segmenter: Arc<dyn Segmenter>, config: &CompositorConfig) -> Self {
        Self {
            segmenter,
            permits: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            timeout: config.timeout(),
        }
    }

    /// Overall wall-clock budget; `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Cuts the subject out of `subject` and centers it on `backdrop`.
    ///
    /// Returns PNG bytes. Never returns a partial image.
    pub async fn composite(&self, subject: Vec<u8>, backdrop: Vec<u8>) -> CompositeResult<Vec<u8>> {
        self.composite_detailed(subject, backdrop)
            .await
            .map(|rendered| rendered.png_bytes)
    }

    /// Like [`Compositor::composite`] but also reports the placement.
    pub async fn composite_detailed(
        &self,
        subject: Vec<u8>,
        backdrop: Vec<u8>,
    ) -> CompositeResult<RenderedComposite> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.run(subject, backdrop))
                .await
                .unwrap_or_else(|_| Err(CompositeError::timeout(limit.as_secs()))),
            None => self.run(subject, backdrop).await,
        }
    }

    async fn run(&self, subject: Vec<u8>, backdrop: Vec<u8>) -> CompositeResult<RenderedComposite> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(CompositeError::internal)?;

        let started = Instant::now();
        let subject_len = subject.len();
        let segmented = self
            .segmenter
            .segment(subject)
            .await
            .map_err(|err| CompositeError::segmentation(format!("{err:#}")))?;
        tracing::debug!(
            subject_bytes = subject_len,
            segmented_bytes = segmented.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "segmentation finished"
        );

        // Held until the pixels are done, even if the timeout drops this future.
        let rendered = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            compose_layers(&segmented, &backdrop)
        })
        .await
        .map_err(CompositeError::internal)??;

        tracing::debug!(
            width = rendered.canvas.width,
            height = rendered.canvas.height,
            subject_width = rendered.placement.size.width,
            subject_height = rendered.placement.size.height,
            x = rendered.placement.x,
            y = rendered.placement.y,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "composite rendered"
        );
        Ok(rendered)
    }
}
