//! Tesseract OCR engine.
//!
//! Uses Tesseract via command-line. Each recognition spawns a child process
//! that is killed if the caller stops waiting for it.

use std::path::Path;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::backend::{OcrConfig, OcrEngine, OcrError, OcrSession};
use crate::extraction::tools::check_binary;

/// Tesseract OCR engine.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    language: String,
}

impl TesseractEngine {
    /// Create a new Tesseract engine with default configuration.
    pub fn new() -> Self {
        Self::with_config(&OcrConfig::default())
    }

    /// Create a new Tesseract engine with custom configuration.
    pub fn with_config(config: &OcrConfig) -> Self {
        Self {
            language: config.language.clone(),
        }
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn is_available(&self) -> bool {
        check_binary("tesseract")
    }

    fn availability_hint(&self) -> String {
        if self.is_available() {
            "Tesseract is available".to_string()
        } else {
            "Tesseract not installed. Install with: apt install tesseract-ocr".to_string()
        }
    }

    async fn start(&self) -> Result<Box<dyn OcrSession>, OcrError> {
        if !self.is_available() {
            return Err(OcrError::BackendNotAvailable(self.availability_hint()));
        }
        Ok(Box::new(TesseractSession {
            language: self.language.clone(),
            pages: 0,
            started: Instant::now(),
        }))
    }
}

/// One document's worth of Tesseract runs.
struct TesseractSession {
    language: String,
    pages: usize,
    started: Instant,
}

#[async_trait]
impl OcrSession for TesseractSession {
    async fn recognize(&mut self, image_path: &Path) -> Result<String, OcrError> {
        self.pages += 1;
        let output = Command::new("tesseract")
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &self.language])
            .kill_on_drop(true)
            .output()
            .await;

        match output {
            Ok(output) => {
                if output.status.success() {
                    Ok(String::from_utf8_lossy(&output.stdout).to_string())
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    Err(OcrError::OcrFailed(format!(
                        "tesseract failed: {}",
                        stderr.trim()
                    )))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(OcrError::BackendNotAvailable(
                    "tesseract not found (install tesseract-ocr)".to_string(),
                ))
            }
            Err(e) => Err(OcrError::Io(e)),
        }
    }

    async fn terminate(self: Box<Self>) {
        debug!(
            "Tesseract session finished: {} pages in {}ms",
            self.pages,
            self.started.elapsed().as_millis()
        );
    }
}
