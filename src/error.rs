use thiserror::Error;

/// Message shown to the user for any failed export.
pub const RETRY_MESSAGE: &str = "PDFの生成に失敗しました。もう一度お試しください。";

/// Capturing a rendered subtree failed. The offscreen container is already gone.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("markup could not be parsed: {0}")]
    Markup(#[from] serde_json::Error),
    #[error("unsupported selector `{0}` (only `#id` selectors are supported)")]
    UnsupportedSelector(String),
    #[error("capture target `{0}` not found after settle")]
    TargetNotFound(String),
    #[error("image did not load within {timeout_ms} ms")]
    ImageTimeout { timeout_ms: u64 },
    #[error("rasterization failed: {0}")]
    Raster(String),
}

/// Building the PDF from captured bitmaps failed. Nothing was written.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("no fragments to assemble")]
    NoFragments,
    #[error("fragment {index} could not be decoded: {source}")]
    Decode {
        index: usize,
        #[source]
        source: image::ImageError,
    },
    #[error("PDF encoding failed: {0}")]
    Encoding(String),
}

/// The host cannot deliver the file.
#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("download target unavailable: {0}")]
    DownloadUnavailable(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
    #[error(transparent)]
    Environment(#[from] EnvironmentError),
}

impl ExportError {
    /// Capture and assembly failures may succeed on retry; environment failures will not.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ExportError::Environment(_))
    }

    pub fn user_message(&self) -> &'static str {
        RETRY_MESSAGE
    }
}
