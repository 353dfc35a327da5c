//! Raw uploaded documents and their per-request staging area.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use thiserror::Error;

/// Content types the pipeline can work with (page-oriented formats).
const PAGE_ORIENTED_TYPES: &[&str] = &["application/pdf"];

/// Reasons a document cannot be read at all.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("Document is empty")]
    Empty,

    #[error("Content does not look like {expected} (detected {detected})")]
    ContentMismatch {
        expected: String,
        detected: String,
    },

    #[error("Failed to stage document: {0}")]
    Staging(#[from] std::io::Error),
}

/// An uploaded document: opaque bytes plus the content type it was sent with.
#[derive(Debug, Clone)]
pub struct RawDocument {
    bytes: Arc<Vec<u8>>,
    content_type: String,
}

impl RawDocument {
    pub fn new(bytes: Vec<u8>, content_type: &str) -> Self {
        Self {
            bytes: Arc::new(bytes),
            content_type: normalize_content_type(content_type),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Check that the document is something the cascade can open.
    pub fn validate(&self) -> Result<(), DocumentError> {
        if !PAGE_ORIENTED_TYPES.contains(&self.content_type.as_str()) {
            return Err(DocumentError::UnsupportedContentType(
                self.content_type.clone(),
            ));
        }
        if self.bytes.is_empty() {
            return Err(DocumentError::Empty);
        }
        if let Some(detected) = detect_content_type(&self.bytes) {
            if detected != self.content_type {
                return Err(DocumentError::ContentMismatch {
                    expected: self.content_type.clone(),
                    detected: detected.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Detect a MIME type from file content.
pub fn detect_content_type(bytes: &[u8]) -> Option<&'static str> {
    infer::get(bytes).map(|kind| kind.mime_type())
}

/// Strip parameters and case from a content-type header value.
fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// A document written into its own temporary directory for the duration of
/// one request.
///
/// Tools that need a file path read it from here. Dropping the value removes
/// the directory and everything inside it.
#[derive(Debug)]
pub struct StagedDocument {
    raw: RawDocument,
    path: PathBuf,
    dir: TempDir,
}

impl StagedDocument {
    /// Validate and write the document into a fresh, uniquely named directory.
    pub fn stage(raw: RawDocument) -> Result<Self, DocumentError> {
        raw.validate()?;

        let dir = tempfile::Builder::new().prefix("routeai-").tempdir()?;
        let path = dir.path().join("upload.pdf");
        fs::write(&path, raw.bytes())?;

        tracing::debug!(
            "Staged {} byte document at {}",
            raw.len(),
            path.display()
        );

        Ok(Self { raw, path, dir })
    }

    pub fn bytes(&self) -> &[u8] {
        self.raw.bytes()
    }

    /// Shared handle to the bytes, for work moved onto another thread.
    pub fn shared_bytes(&self) -> Arc<Vec<u8>> {
        Arc::clone(&self.raw.bytes)
    }

    /// Path of the staged copy.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The request's private directory, for stage scratch space.
    pub fn workspace(&self) -> &Path {
        self.dir.path()
    }
}
