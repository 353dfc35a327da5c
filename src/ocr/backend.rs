//! Capabilities the OCR stage orchestrates: page rasterization and text
//! recognition.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from rasterizers and OCR engines.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("Rasterization failed: {0}")]
    RenderFailed(String),

    #[error("no pages rendered")]
    NoPagesRendered,

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    /// The engine cannot continue; remaining pages are abandoned.
    #[error("OCR engine failed: {0}")]
    EngineFailed(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OcrError {
    /// Whether the error ends the whole OCR run rather than a single page.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            OcrError::BackendNotAvailable(_) | OcrError::EngineFailed(_)
        )
    }

    /// Whether the rasterizer could not open the document at all.
    pub fn rejects_document(&self) -> bool {
        matches!(self, OcrError::RenderFailed(_) | OcrError::NoPagesRendered)
    }
}

/// Renders document pages to image files.
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Render every page into `output_dir`, returning image paths in page order.
    async fn render(
        &self,
        pdf_path: &Path,
        output_dir: &Path,
        dpi: u32,
    ) -> Result<Vec<PathBuf>, OcrError>;
}

/// An OCR engine that can be started for one document.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Check if this engine is available (dependencies installed).
    fn is_available(&self) -> bool;

    /// Get a description of what's needed to make this engine available.
    fn availability_hint(&self) -> String;

    /// Acquire engine resources for one document.
    async fn start(&self) -> Result<Box<dyn OcrSession>, OcrError>;
}

/// A running OCR engine instance, scoped to one document.
#[async_trait]
pub trait OcrSession: Send {
    /// Recognize the text in one image.
    async fn recognize(&mut self, image_path: &Path) -> Result<String, OcrError>;

    /// Release engine resources.
    async fn terminate(self: Box<Self>);
}

/// Configuration for the OCR stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Language for OCR (e.g., "eng", "deu").
    pub language: String,
    /// Rasterization resolution in DPI.
    pub dpi: u32,
    /// Upper bound for recognizing a single page, in seconds.
    pub page_timeout_secs: u64,
    /// Upper bound for rasterizing the whole document, in seconds.
    pub render_timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            dpi: 300,
            page_timeout_secs: 120,
            render_timeout_secs: 300,
        }
    }
}

impl OcrConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }
}
