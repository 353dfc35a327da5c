//! Helpers for the external command-line tools used by the cascade.

use std::process::Output;

use super::ExtractionError;

/// External tools the cascade shells out to, with install hints.
pub const REQUIRED_TOOLS: &[(&str, &str)] = &[
    ("pdftotext", "poppler-utils"),
    ("pdftoppm", "poppler-utils"),
    ("tesseract", "tesseract-ocr"),
];

/// Check if a binary is available in PATH.
pub fn check_binary(name: &str) -> bool {
    which::which(name).is_ok()
}

/// Report availability of every external tool.
pub fn check_tools() -> Vec<(String, bool)> {
    REQUIRED_TOOLS
        .iter()
        .map(|(tool, _)| (tool.to_string(), check_binary(tool)))
        .collect()
}

/// Install hint for a tool, e.g. "pdftotext (install poppler-utils)".
pub fn tool_hint(name: &str) -> String {
    match REQUIRED_TOOLS.iter().find(|(tool, _)| *tool == name) {
        Some((tool, package)) => format!("{} (install {})", tool, package),
        None => name.to_string(),
    }
}

/// Handle command output, extracting stdout on success or returning appropriate error.
pub fn handle_cmd_output(
    result: std::io::Result<Output>,
    tool_name: &str,
    error_prefix: &str,
) -> Result<String, ExtractionError> {
    match result {
        Ok(output) => {
            if output.status.success() {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(ExtractionError::ExtractionFailed(format!(
                    "{}: {}",
                    error_prefix,
                    stderr.trim()
                )))
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ExtractionError::ToolNotFound(tool_hint(tool_name)))
        }
        Err(e) => Err(ExtractionError::Io(e)),
    }
}
