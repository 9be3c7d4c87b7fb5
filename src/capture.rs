//! Capturing one fragment of rendered markup as a bitmap.

use std::sync::Arc;
use std::time::Duration;

use crate::error::CaptureError;
use crate::host::{HostDocument, OffscreenContainer};
use crate::images::{self, ImagePolicy};
use crate::layout::MarkupNode;
use crate::raster::{Bitmap, Rasterizer, SkiaRasterizer};

pub const DEFAULT_SETTLE: Duration = Duration::from_millis(300);
pub const DEFAULT_IMAGE_TIMEOUT: Duration = Duration::from_millis(15_000);
pub const DEFAULT_SCALE: f32 = 2.0;

/// Attaches markup offscreen, waits for it to settle and rasterizes one element of it.
#[derive(Clone)]
pub struct CaptureEngine {
    settle: Duration,
    image_timeout: Duration,
    scale: f32,
    image_policy: ImagePolicy,
    rasterizer: Arc<dyn Rasterizer>,
}

impl std::fmt::Debug for CaptureEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureEngine")
            .field("settle", &self.settle)
            .field("image_timeout", &self.image_timeout)
            .field("scale", &self.scale)
            .field("image_policy", &self.image_policy)
            .finish_non_exhaustive()
    }
}

impl Default for CaptureEngine {
    fn default() -> Self {
        CaptureEngine::new(Arc::new(SkiaRasterizer))
    }
}

impl CaptureEngine {
    pub fn new(rasterizer: Arc<dyn Rasterizer>) -> Self {
        CaptureEngine {
            settle: DEFAULT_SETTLE,
            image_timeout: DEFAULT_IMAGE_TIMEOUT,
            scale: DEFAULT_SCALE,
            image_policy: ImagePolicy::default(),
            rasterizer,
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_image_timeout(mut self, timeout: Duration) -> Self {
        self.image_timeout = timeout;
        self
    }

    pub fn with_image_policy(mut self, policy: ImagePolicy) -> Self {
        self.image_policy = policy;
        self
    }

    /// Oversampling factor; non-positive or non-finite values keep the current scale.
    pub fn with_scale(mut self, scale: f32) -> Self {
        if scale.is_finite() && scale > 0.0 {
            self.scale = scale;
        }
        self
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn image_policy(&self) -> &ImagePolicy {
        &self.image_policy
    }

    /// Capture the element matching `selector` inside `markup`.
    ///
    /// The markup lives in an offscreen container for the duration of the
    /// call and is removed from `host` before this returns, on success and
    /// on every error.
    pub async fn capture(
        &self,
        host: &mut HostDocument,
        markup: &str,
        selector: &str,
    ) -> Result<Bitmap, CaptureError> {
        let id = parse_selector(selector)?;
        let tree = MarkupNode::parse(markup)?;
        let started = tokio::time::Instant::now();

        let container = OffscreenContainer::attach(host, tree);

        // Give late content a chance to land before measuring
        tokio::time::sleep(self.settle).await;

        let target = container
            .query(id)
            .cloned()
            .ok_or_else(|| CaptureError::TargetNotFound(selector.to_string()))?;

        let images = images::load_all(target.image_sources(), self.image_timeout, &self.image_policy).await?;

        let rasterizer = Arc::clone(&self.rasterizer);
        let scale = self.scale;
        let bitmap = tokio::task::spawn_blocking(move || rasterizer.rasterize(&target, &images, scale))
            .await
            .map_err(|e| CaptureError::Raster(format!("rasterizer task failed: {e}")))??;

        drop(container);

        tracing::debug!(
            selector,
            width = bitmap.width,
            height = bitmap.height,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fragment captured"
        );
        Ok(bitmap)
    }
}

/// Only `#id` selectors are supported.
fn parse_selector(selector: &str) -> Result<&str, CaptureError> {
    selector
        .strip_prefix('#')
        .filter(|id| {
            !id.is_empty()
                && id.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        })
        .ok_or_else(|| CaptureError::UnsupportedSelector(selector.to_string()))
}
