//! Page rasterization with Poppler's `pdftoppm`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::backend::{OcrError, PageRasterizer};

/// Renders pages to PNG files named `page-01.png`, `page-02.png`, ...
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    timeout: Duration,
}

impl PdftoppmRasterizer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

#[async_trait]
impl PageRasterizer for PdftoppmRasterizer {
    fn name(&self) -> &'static str {
        "pdftoppm"
    }

    async fn render(
        &self,
        pdf_path: &Path,
        output_dir: &Path,
        dpi: u32,
    ) -> Result<Vec<PathBuf>, OcrError> {
        let dpi_str = dpi.to_string();
        let child = Command::new("pdftoppm")
            .args(["-png", "-r", &dpi_str])
            .arg(pdf_path)
            .arg(output_dir.join("page"))
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| OcrError::Timeout(self.timeout))?;

        match output {
            Ok(o) if o.status.success() => {}
            Ok(o) => {
                let stderr = String::from_utf8_lossy(&o.stderr);
                return Err(OcrError::RenderFailed(format!(
                    "pdftoppm failed to convert PDF: {}",
                    stderr.trim()
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(OcrError::BackendNotAvailable(
                    "pdftoppm not found (install poppler-utils)".to_string(),
                ));
            }
            Err(e) => return Err(OcrError::Io(e)),
        }

        list_page_images(output_dir)
    }
}

/// Collect rendered PNGs in page order.
///
/// pdftoppm zero-pads page numbers to the same width within one document,
/// so lexical order is page order.
pub(crate) fn list_page_images(dir: &Path) -> Result<Vec<PathBuf>, OcrError> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|ext| ext == "png").unwrap_or(false))
        .collect();
    images.sort();
    Ok(images)
}
