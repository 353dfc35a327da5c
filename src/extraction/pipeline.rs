//! The ordered extraction cascade.

use thiserror::Error;
use tracing::{debug, info, warn};

use super::{
    truncate_detail, DirectTextExtractor, ExtractionAttempt, ExtractionResult,
    QualityGate, SecondaryTextExtractor, Strategy, TextExtractor,
};
use crate::config::ExtractionConfig;
use crate::document::{DocumentError, RawDocument, StagedDocument};
use crate::ocr::RasterOcrExtractor;

/// Maximum length of a stage error in log output.
const LOG_DETAIL_CHARS: usize = 200;

/// Failures that end a request without a usable extraction result.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unreadable document: {0}")]
    UnreadableDocument(#[from] DocumentError),

    /// Every strategy ran and every one failed to open the document.
    #[error("Unreadable document: no strategy could open it ({0})")]
    Undecodable(String),
}

/// Runs extractors from cheapest to most expensive until one passes the gate.
pub struct ExtractionPipeline {
    stages: Vec<Box<dyn TextExtractor>>,
    gate: QualityGate,
}

impl ExtractionPipeline {
    /// Direct, Secondary and OCR extractors built from configuration.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        let stages: Vec<Box<dyn TextExtractor>> = vec![
            Box::new(DirectTextExtractor::new()),
            Box::new(SecondaryTextExtractor::new().with_timeout(config.decode_timeout())),
            Box::new(RasterOcrExtractor::from_config(&config.ocr)),
        ];
        Self::new(stages, QualityGate::new(config.quality_threshold))
    }

    /// Build a pipeline from arbitrary stages.
    ///
    /// Stages are always run in strategy cost order, whatever order they are
    /// given in.
    pub fn new(mut stages: Vec<Box<dyn TextExtractor>>, gate: QualityGate) -> Self {
        stages.sort_by_key(|stage| stage.strategy());
        Self { stages, gate }
    }

    pub fn gate(&self) -> QualityGate {
        self.gate
    }

    /// Strategies in the order they will be tried.
    pub fn strategies(&self) -> Vec<Strategy> {
        self.stages.iter().map(|s| s.strategy()).collect()
    }

    /// Stage `document` into its own directory and run the cascade on it.
    ///
    /// The staged copy is removed before this returns.
    pub async fn extract(&self, document: RawDocument) -> Result<ExtractionResult, PipelineError> {
        let staged = StagedDocument::stage(document)?;
        self.extract_staged(&staged).await
    }

    /// Run the cascade on an already staged document.
    ///
    /// When nothing passes the gate, the last attempt is returned with
    /// `empty` set. It is an error only if every stage rejected the document
    /// itself; a stage that could not run at all (missing tool, timeout)
    /// leaves the outcome at `empty`.
    pub async fn extract_staged(
        &self,
        document: &StagedDocument,
    ) -> Result<ExtractionResult, PipelineError> {
        let mut last: Option<ExtractionAttempt> = None;
        let mut rejections: Vec<String> = Vec::new();

        for stage in &self.stages {
            let strategy = stage.strategy();
            debug!("Trying {} extraction", strategy);

            let attempt = stage.attempt(document).await;

            if attempt.success && self.gate.accept(&attempt.text) {
                info!(
                    "{} extraction accepted ({} chars)",
                    strategy,
                    attempt.text.trim().chars().count()
                );
                return Ok(Self::finish(attempt, false));
            }

            if attempt.document_rejected {
                rejections.push(format!(
                    "{}: {}",
                    strategy,
                    truncate_detail(
                        attempt.error_detail.as_deref().unwrap_or_default(),
                        LOG_DETAIL_CHARS
                    )
                ));
            }

            match &attempt.error_detail {
                Some(detail) if !attempt.success => warn!(
                    "{} extraction failed: {}",
                    strategy,
                    truncate_detail(detail, LOG_DETAIL_CHARS)
                ),
                _ => info!(
                    "{} extraction below quality threshold ({} < {} chars)",
                    strategy,
                    attempt.text.trim().chars().count(),
                    self.gate.min_chars()
                ),
            }
            last = Some(attempt);
        }

        if !self.stages.is_empty() && rejections.len() == self.stages.len() {
            warn!("Every strategy rejected the document");
            return Err(PipelineError::Undecodable(rejections.join("; ")));
        }

        let last = last.unwrap_or_else(|| {
            ExtractionAttempt::failed(Strategy::Ocr, "no extraction strategies configured")
        });
        Ok(Self::finish(last, true))
    }

    fn finish(attempt: ExtractionAttempt, empty: bool) -> ExtractionResult {
        let text = attempt.text.trim().to_string();
        debug!(
            "Final extracted text length: {}, preview: {:?}",
            text.len(),
            truncate_detail(&text, 200)
        );
        ExtractionResult {
            text,
            strategy_used: attempt.strategy,
            page_count: attempt.page_count,
            empty,
        }
    }
}
