//! Secondary decoder: Poppler's `pdftotext`.
//!
//! Poppler tolerates broken page trees and some encrypted-but-readable
//! content streams that trip up the in-process decoder.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::tools::handle_cmd_output;
use super::{ExtractionAttempt, ExtractionError, Strategy, TextExtractor};
use crate::document::StagedDocument;

/// Form feed emitted by pdftotext after every page.
const PAGE_BREAK: char = '\x0C';

/// Runs `pdftotext` against the staged document.
#[derive(Debug, Clone)]
pub struct SecondaryTextExtractor {
    timeout: Duration,
}

impl Default for SecondaryTextExtractor {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
        }
    }
}

impl SecondaryTextExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run_pdftotext(
        &self,
        document: &StagedDocument,
    ) -> Result<(String, Option<u32>), ExtractionError> {
        let child = Command::new("pdftotext")
            .args(["-layout", "-enc", "UTF-8"])
            .arg(document.path())
            .arg("-") // Output to stdout
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| ExtractionError::Timeout(self.timeout))?;

        let raw = handle_cmd_output(output, "pdftotext", "pdftotext failed")?;
        let (text, pages) = split_pages(&raw);
        if pages == 0 {
            return Err(ExtractionError::NoPages);
        }
        Ok((text, Some(pages)))
    }
}

/// Join pdftotext's form-feed separated pages with newlines and count them.
fn split_pages(raw: &str) -> (String, u32) {
    let mut pages: Vec<&str> = raw.split(PAGE_BREAK).collect();
    // Every page is terminated by a form feed, leaving a trailing fragment
    if pages.len() > 1 && pages.last().map(|p| p.trim().is_empty()).unwrap_or(false) {
        pages.pop();
    }
    if pages.len() == 1 && pages[0].trim().is_empty() && !raw.contains(PAGE_BREAK) {
        return (String::new(), 0);
    }
    let count = pages.len() as u32;
    (pages.join("\n"), count)
}

#[async_trait]
impl TextExtractor for SecondaryTextExtractor {
    fn strategy(&self) -> Strategy {
        Strategy::Secondary
    }

    async fn attempt(&self, document: &StagedDocument) -> ExtractionAttempt {
        ExtractionAttempt::from_result(Strategy::Secondary, self.run_pdftotext(document).await)
    }
}
