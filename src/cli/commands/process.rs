//! Process and extract commands.

use std::path::Path;

use anyhow::Context;
use console::style;

use crate::config::Settings;
use crate::document::RawDocument;
use crate::extraction::ExtractionPipeline;
use crate::services::{guess_content_type, UploadCoordinator};

/// Extract a route from a document and print it as JSON.
pub async fn cmd_process(settings: &Settings, file: &Path, consume: bool) -> anyhow::Result<()> {
    let coordinator = UploadCoordinator::from_settings(settings)?;

    let outcome = if consume {
        coordinator.process_stored(file).await
    } else {
        let bytes = tokio::fs::read(file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let content_type = guess_content_type(file, &bytes);
        coordinator.process(bytes, content_type).await
    };

    match outcome {
        Ok(route) => {
            if route.is_sentinel() {
                eprintln!(
                    "{} No usable text found in {}",
                    style("!").yellow(),
                    file.display()
                );
            }
            println!("{}", serde_json::to_string_pretty(&route)?);
            Ok(())
        }
        Err(envelope) => {
            println!("{}", serde_json::to_string_pretty(&envelope)?);
            Err(envelope.into())
        }
    }
}

/// Run the extraction cascade only and print text plus provenance.
pub async fn cmd_extract(settings: &Settings, file: &Path) -> anyhow::Result<()> {
    let pipeline = ExtractionPipeline::from_config(&settings.extraction);

    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let content_type = guess_content_type(file, &bytes);

    let result = pipeline
        .extract(RawDocument::new(bytes, content_type))
        .await?;

    eprintln!(
        "{} {} extraction, {} chars{}",
        if result.empty {
            style("!").yellow()
        } else {
            style("✓").green()
        },
        result.strategy_used,
        result.text.chars().count(),
        if result.empty { " (below threshold)" } else { "" }
    );
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
