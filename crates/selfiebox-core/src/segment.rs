//! Background-removal collaborator.
//!
//! The compositor only needs "image bytes in, image-with-alpha bytes out".
//! [`HttpSegmenter`] delegates that to a rembg-compatible HTTP service.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};

use crate::config::SegmentationConfig;

pub type SegmentFuture = Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send>>;

/// Removes the background of a photo.
///
/// Implementations are shared across sessions and must tolerate concurrent
/// calls.
pub trait Segmenter: Send + Sync {
    /// Returns encoded image bytes with an alpha channel isolating the subject.
    fn segment(&self, image: Vec<u8>) -> SegmentFuture;
}

/// Posts the photo to a background-removal server as multipart field `file`.
#[derive(Clone)]
pub struct HttpSegmenter {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpSegmenter {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build segmentation HTTP client")?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_config(config: &SegmentationConfig) -> Result<Self> {
        Self::new(config.endpoint.clone(), config.request_timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Segmenter for HttpSegmenter {
    fn segment(&self, image: Vec<u8>) -> SegmentFuture {
        let http = self.http.clone();
        let endpoint = self.endpoint.clone();
        Box::pin(async move {
            let size = image.len();
            let part = reqwest::multipart::Part::bytes(image).file_name("subject");
            let form = reqwest::multipart::Form::new().part("file", part);

            tracing::debug!(%endpoint, bytes = size, "requesting background removal");
            let response = http
                .post(&endpoint)
                .multipart(form)
                .send()
                .await
                .with_context(|| format!("segmentation request to {endpoint} failed"))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(anyhow!("segmentation service returned {} {}", status, body));
            }

            let bytes = response
                .bytes()
                .await
                .context("read segmentation response body")?;
            if bytes.is_empty() {
                return Err(anyhow!("segmentation service returned an empty body"));
            }
            Ok(bytes.to_vec())
        })
    }
}
