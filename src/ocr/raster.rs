//! OCR extraction stage: rasterize every page, then recognize page by page.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::backend::{OcrConfig, OcrEngine, OcrError, PageRasterizer};
use super::pdftoppm::PdftoppmRasterizer;
use super::tesseract::TesseractEngine;
use crate::document::StagedDocument;
use crate::extraction::{truncate_detail, ExtractionAttempt, Strategy, TextExtractor};

/// A rendered page image, deleted when dropped.
struct ScratchImage(PathBuf);

impl ScratchImage {
    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for ScratchImage {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.0) {
            if e.kind() != ErrorKind::NotFound {
                warn!("Failed to remove page image {}: {}", self.0.display(), e);
            }
        }
    }
}

/// The most expensive strategy: rasterization plus OCR.
pub struct RasterOcrExtractor {
    rasterizer: Arc<dyn PageRasterizer>,
    engine: Arc<dyn OcrEngine>,
    dpi: u32,
    page_timeout: Duration,
}

impl RasterOcrExtractor {
    /// pdftoppm and Tesseract, configured from `config`.
    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(
            Arc::new(PdftoppmRasterizer::new(config.render_timeout())),
            Arc::new(TesseractEngine::with_config(config)),
        )
        .with_dpi(config.dpi)
        .with_page_timeout(config.page_timeout())
    }

    pub fn new(rasterizer: Arc<dyn PageRasterizer>, engine: Arc<dyn OcrEngine>) -> Self {
        let defaults = OcrConfig::default();
        Self {
            rasterizer,
            engine,
            dpi: defaults.dpi,
            page_timeout: defaults.page_timeout(),
        }
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn with_page_timeout(mut self, timeout: Duration) -> Self {
        self.page_timeout = timeout;
        self
    }

    async fn run(&self, document: &StagedDocument) -> Result<(String, u32), OcrError> {
        // Unique per call, inside the request's own directory
        let scratch = tempfile::Builder::new()
            .prefix("pages-")
            .tempdir_in(document.workspace())?;

        debug!(
            "Rasterizing {} with {} at {} DPI",
            document.path().display(),
            self.rasterizer.name(),
            self.dpi
        );
        let images: Vec<ScratchImage> = self
            .rasterizer
            .render(document.path(), scratch.path(), self.dpi)
            .await?
            .into_iter()
            .map(ScratchImage)
            .collect();

        if images.is_empty() {
            return Err(OcrError::NoPagesRendered);
        }
        let page_count = images.len() as u32;

        let mut session = self.engine.start().await?;
        let mut page_texts: Vec<String> = Vec::with_capacity(images.len());
        let mut fatal: Option<OcrError> = None;

        for (i, image) in images.into_iter().enumerate() {
            let page = i + 1;
            debug!("OCR on page {}: {}", page, image.path().display());

            let result = tokio::time::timeout(self.page_timeout, session.recognize(image.path()))
                .await
                .unwrap_or(Err(OcrError::Timeout(self.page_timeout)));
            drop(image);

            match result {
                Ok(text) => page_texts.push(text),
                Err(e) if e.is_fatal() => {
                    fatal = Some(e);
                    break;
                }
                Err(e) => {
                    warn!("OCR failed for page {}: {}", page, e);
                    page_texts.push(String::new());
                }
            }
        }

        session.terminate().await;

        match fatal {
            Some(e) => Err(e),
            None => Ok((page_texts.join("\n"), page_count)),
        }
    }
}

#[async_trait]
impl TextExtractor for RasterOcrExtractor {
    fn strategy(&self) -> Strategy {
        Strategy::Ocr
    }

    async fn attempt(&self, document: &StagedDocument) -> ExtractionAttempt {
        match self.run(document).await {
            Ok((text, pages)) => ExtractionAttempt::succeeded(Strategy::Ocr, text, Some(pages)),
            Err(e) => {
                debug!("OCR stage failed: {}", truncate_detail(&e.to_string(), 200));
                if e.rejects_document() {
                    ExtractionAttempt::rejected(Strategy::Ocr, e.to_string())
                } else {
                    ExtractionAttempt::failed(Strategy::Ocr, e.to_string())
                }
            }
        }
    }
}
