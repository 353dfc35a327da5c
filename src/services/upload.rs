//! Upload coordination: extraction cascade followed by route structuring.
//!
//! This is the boundary between transport (CLI, HTTP handlers) and the
//! core. Every failure leaves here as an [`ErrorEnvelope`].

use std::fmt;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::document::{detect_content_type, RawDocument};
use crate::extraction::{ExtractionPipeline, PipelineError};
use crate::llm::{LlmClient, LlmError};
use crate::route::{RouteCandidate, RouteStructurer, StructuringError};

/// Failure categories visible to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    UnreadableDocument,
    ServiceUnavailable,
    InvalidModelOutput,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::UnreadableDocument => "UnreadableDocument",
            ErrorKind::ServiceUnavailable => "ServiceUnavailable",
            ErrorKind::InvalidModelOutput => "InvalidModelOutput",
        };
        f.write_str(s)
    }
}

/// User-facing error: a kind plus a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEnvelope {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ErrorEnvelope {}

impl From<PipelineError> for ErrorEnvelope {
    fn from(e: PipelineError) -> Self {
        ErrorEnvelope::new(ErrorKind::UnreadableDocument, e.to_string())
    }
}

impl From<StructuringError> for ErrorEnvelope {
    fn from(e: StructuringError) -> Self {
        match e {
            StructuringError::ServiceUnavailable(_) => {
                ErrorEnvelope::new(ErrorKind::ServiceUnavailable, e.to_string())
            }
            StructuringError::InvalidModelOutput { ref raw, .. } => {
                warn!("Rejected model output: {:?}", raw);
                ErrorEnvelope::new(ErrorKind::InvalidModelOutput, e.to_string())
            }
        }
    }
}

/// Removes a stored upload when dropped, whatever happened to it.
struct StoredUpload(PathBuf);

impl Drop for StoredUpload {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.0) {
            Ok(()) => debug!("Removed upload {}", self.0.display()),
            Err(e) if e.kind() == IoErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove upload {}: {}", self.0.display(), e),
        }
    }
}

/// Runs one uploaded document through extraction and structuring.
pub struct UploadCoordinator {
    pipeline: ExtractionPipeline,
    structurer: RouteStructurer,
}

impl UploadCoordinator {
    pub fn new(pipeline: ExtractionPipeline, structurer: RouteStructurer) -> Self {
        Self {
            pipeline,
            structurer,
        }
    }

    /// Production wiring: the three-stage cascade and an HTTP LLM client.
    ///
    /// The structurer shares the pipeline's quality gate.
    pub fn from_settings(settings: &Settings) -> Result<Self, LlmError> {
        let pipeline = ExtractionPipeline::from_config(&settings.extraction);
        let client = LlmClient::new(settings.llm.clone())?;
        let structurer = RouteStructurer::new(Arc::new(client), pipeline.gate(), &settings.llm);
        Ok(Self::new(pipeline, structurer))
    }

    /// Extract a route from an uploaded document.
    ///
    /// A document with no usable text yields the sentinel route rather than
    /// an error.
    pub async fn process(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<RouteCandidate, ErrorEnvelope> {
        let document = RawDocument::new(bytes, content_type);
        info!(
            "Processing {} byte {} upload",
            document.len(),
            document.content_type()
        );

        let extracted = self.pipeline.extract(document).await?;
        if extracted.empty {
            info!(
                "No usable text recovered (last strategy: {}), returning sentinel route",
                extracted.strategy_used
            );
            return Ok(RouteCandidate::sentinel());
        }

        let route = self.structurer.structure(&extracted.text).await?;
        info!(
            "Route extracted from {} text: {} -> {} ({} waypoints)",
            extracted.strategy_used,
            route.origin,
            route.destination,
            route.waypoints.len()
        );
        Ok(route)
    }

    /// Process an upload held in the document store, then delete it.
    ///
    /// The file is removed on every path, including read failures.
    pub async fn process_stored(&self, path: &Path) -> Result<RouteCandidate, ErrorEnvelope> {
        let _upload = StoredUpload(path.to_path_buf());

        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ErrorEnvelope::new(
                ErrorKind::UnreadableDocument,
                format!("Failed to read {}: {}", path.display(), e),
            )
        })?;

        let content_type = guess_content_type(path, &bytes);
        self.process(bytes, content_type).await
    }
}

/// Content type of a stored file: sniffed from its bytes, else from its
/// extension.
pub fn guess_content_type(path: &Path, bytes: &[u8]) -> &'static str {
    detect_content_type(bytes)
        .or_else(|| content_type_from_extension(path))
        .unwrap_or("application/octet-stream")
}

fn content_type_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some("application/pdf"),
        "txt" => Some("text/plain"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_serializes_kind_and_message() {
        let envelope = ErrorEnvelope::new(ErrorKind::ServiceUnavailable, "timed out");
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kind": "ServiceUnavailable", "message": "timed out"})
        );
        assert_eq!(envelope.to_string(), "ServiceUnavailable: timed out");
    }

    #[test]
    fn test_structuring_errors_map_to_kinds() {
        let unavailable: ErrorEnvelope =
            StructuringError::ServiceUnavailable("connection refused".to_string()).into();
        assert_eq!(unavailable.kind, ErrorKind::ServiceUnavailable);

        let invalid: ErrorEnvelope = StructuringError::InvalidModelOutput {
            reason: "expected value".to_string(),
            raw: "nope".to_string(),
        }
        .into();
        assert_eq!(invalid.kind, ErrorKind::InvalidModelOutput);
    }

    #[test]
    fn test_content_type_from_extension() {
        assert_eq!(
            content_type_from_extension(Path::new("permit.PDF")),
            Some("application/pdf")
        );
        assert_eq!(content_type_from_extension(Path::new("permit")), None);
    }

    #[test]
    fn test_sniffed_type_wins_over_extension() {
        let png = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
        assert_eq!(guess_content_type(Path::new("scan.pdf"), png), "image/png");
        assert_eq!(
            guess_content_type(Path::new("scan.bin"), b"no magic here"),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_stored_upload_guard_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        drop(StoredUpload(path.clone()));
        assert!(!path.exists());

        // Already gone is fine.
        drop(StoredUpload(path));
    }
}
