//! Primary decoder: embedded text layer via pdf-extract.

use std::panic::{self, AssertUnwindSafe};

use async_trait::async_trait;

use super::{ExtractionAttempt, ExtractionError, Strategy, TextExtractor};
use crate::document::StagedDocument;

/// Extracts the embedded text layer in-process.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectTextExtractor;

impl DirectTextExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Decode every page and join them in page order.
    ///
    /// pdf-extract panics on some malformed inputs, so the decoder runs
    /// under `catch_unwind`.
    pub fn decode(bytes: &[u8]) -> Result<(String, Option<u32>), ExtractionError> {
        let pages = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(bytes)
        }))
        .map_err(|payload| {
            ExtractionError::ExtractionFailed(format!(
                "pdf-extract panicked: {}",
                panic_message(payload.as_ref())
            ))
        })?
        .map_err(|e| ExtractionError::ExtractionFailed(format!("pdf-extract failed: {}", e)))?;

        if pages.is_empty() {
            return Err(ExtractionError::NoPages);
        }

        let page_count = pages.len() as u32;
        Ok((pages.join("\n"), Some(page_count)))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[async_trait]
impl TextExtractor for DirectTextExtractor {
    fn strategy(&self) -> Strategy {
        Strategy::Direct
    }

    async fn attempt(&self, document: &StagedDocument) -> ExtractionAttempt {
        let bytes = document.shared_bytes();
        let result = tokio::task::spawn_blocking(move || Self::decode(&bytes))
            .await
            .unwrap_or_else(|e| {
                Err(ExtractionError::ExtractionFailed(format!(
                    "decoder task failed: {}",
                    e
                )))
            });

        ExtractionAttempt::from_result(Strategy::Direct, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::RawDocument;
    use lopdf::dictionary;
    use lopdf::{Document, Object, Stream};

    /// Build a PDF with one page per entry in `pages`.
    fn make_test_pdf(pages: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.4");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids = Vec::new();
        for text in pages {
            let content = format!("BT /F1 12 Tf 72 700 Td ({}) Tj ET", text);
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(Object::from(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_decode_joins_pages_in_order() {
        let pdf = make_test_pdf(&["Origin Rotterdam", "Destination Antwerp"]);
        let (text, pages) = DirectTextExtractor::decode(&pdf).unwrap();

        assert_eq!(pages, Some(2));
        let origin = text.find("Origin Rotterdam").unwrap();
        let destination = text.find("Destination Antwerp").unwrap();
        assert!(origin < destination);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = DirectTextExtractor::decode(b"%PDF-1.4 this is not really a pdf");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_attempt_reports_failure_instead_of_erroring() {
        let doc = RawDocument::new(b"%PDF-1.7 truncated".to_vec(), "application/pdf");
        let staged = StagedDocument::stage(doc).unwrap();

        let attempt = DirectTextExtractor::new().attempt(&staged).await;
        assert_eq!(attempt.strategy, Strategy::Direct);
        assert!(!attempt.success);
        assert!(attempt.error_detail.is_some());
        assert!(attempt.text.is_empty());
    }

    #[tokio::test]
    async fn test_attempt_success() {
        let pdf = make_test_pdf(&["Oversize load permit"]);
        let staged = StagedDocument::stage(RawDocument::new(pdf, "application/pdf")).unwrap();

        let attempt = DirectTextExtractor::new().attempt(&staged).await;
        assert!(attempt.success);
        assert!(attempt.text.contains("Oversize load permit"));
        assert_eq!(attempt.page_count, Some(1));
    }
}
