//! Text extraction cascade.
//!
//! Turns a staged document into plain text by trying strategies of
//! increasing cost:
//! - Direct: in-process decoding of the embedded text layer (pdf-extract)
//! - Secondary: Poppler's `pdftotext`, a different parsing engine
//! - OCR: `pdftoppm` rasterization followed by Tesseract, page by page
//!
//! Each strategy reports an [`ExtractionAttempt`] instead of failing, and the
//! [`ExtractionPipeline`] decides via the [`QualityGate`] whether to escalate.

mod direct;
mod pipeline;
mod poppler;
mod quality;
pub mod tools;

use async_trait::async_trait;
use thiserror::Error;

use crate::document::StagedDocument;

pub use direct::DirectTextExtractor;
pub use pipeline::{ExtractionPipeline, PipelineError};
pub use poppler::SecondaryTextExtractor;
pub use quality::{QualityGate, DEFAULT_MIN_CHARS};

/// Errors raised inside a single extraction stage.
///
/// These never leave the pipeline: a stage converts them into a failed
/// [`ExtractionAttempt`].
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Document has no pages")]
    NoPages,

    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractionError {
    /// Whether the failure says something about the document itself, as
    /// opposed to the environment (missing tool, timeout, IO).
    pub fn rejects_document(&self) -> bool {
        matches!(
            self,
            ExtractionError::ExtractionFailed(_) | ExtractionError::NoPages
        )
    }
}

/// Extraction strategy, ordered by cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Embedded text layer via the primary decoder.
    Direct,
    /// Embedded text layer via the alternate decoder.
    Secondary,
    /// Rasterization plus optical character recognition.
    Ocr,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Direct => "direct",
            Strategy::Secondary => "secondary",
            Strategy::Ocr => "ocr",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of running one strategy.
#[derive(Debug, Clone)]
pub struct ExtractionAttempt {
    pub strategy: Strategy,
    pub text: String,
    pub success: bool,
    pub error_detail: Option<String>,
    pub page_count: Option<u32>,
    /// The stage could run but could not open the document.
    pub document_rejected: bool,
}

impl ExtractionAttempt {
    pub fn succeeded(strategy: Strategy, text: String, page_count: Option<u32>) -> Self {
        Self {
            strategy,
            text,
            success: true,
            error_detail: None,
            page_count,
            document_rejected: false,
        }
    }

    /// The stage could not do its work (tool missing, timeout, ...).
    pub fn failed(strategy: Strategy, detail: impl Into<String>) -> Self {
        Self {
            strategy,
            text: String::new(),
            success: false,
            error_detail: Some(detail.into()),
            page_count: None,
            document_rejected: false,
        }
    }

    /// The stage ran and found the document undecodable.
    pub fn rejected(strategy: Strategy, detail: impl Into<String>) -> Self {
        Self {
            document_rejected: true,
            ..Self::failed(strategy, detail)
        }
    }

    /// Build an attempt from a stage result, folding the error into the attempt.
    pub fn from_result(
        strategy: Strategy,
        result: Result<(String, Option<u32>), ExtractionError>,
    ) -> Self {
        match result {
            Ok((text, page_count)) => Self::succeeded(strategy, text, page_count),
            Err(e) if e.rejects_document() => Self::rejected(strategy, e.to_string()),
            Err(e) => Self::failed(strategy, e.to_string()),
        }
    }
}

/// Terminal output of the cascade.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExtractionResult {
    /// Best text found.
    pub text: String,
    /// Strategy that produced `text`.
    pub strategy_used: Strategy,
    /// Number of pages, when the producing strategy knows it.
    pub page_count: Option<u32>,
    /// Set when no strategy produced text that passed the quality gate.
    pub empty: bool,
}

/// A text extraction capability taking part in the cascade.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Which strategy this extractor implements.
    fn strategy(&self) -> Strategy;

    /// Try to extract text. Must not fail or panic past this boundary.
    async fn attempt(&self, document: &StagedDocument) -> ExtractionAttempt;
}

/// Longest prefix of `text` holding at most `max_chars` characters.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Shorten an error message for logging (UTF-8 safe).
pub(crate) fn truncate_detail(detail: &str, max_chars: usize) -> String {
    let head = truncate_chars(detail, max_chars);
    if head.len() < detail.len() {
        format!("{}...", head)
    } else {
        detail.to_string()
    }
}
