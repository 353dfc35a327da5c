//! Configuration management for RouteAI.
//!
//! Settings come from, in increasing priority:
//! 1. Built-in defaults
//! 2. A TOML config file (`--config`, or `<config dir>/routeai/config.toml`)
//! 3. Environment variables (`ROUTEAI_*`, `LLM_*`, provider API keys)

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::extraction::DEFAULT_MIN_CHARS;
use crate::llm::LlmConfig;
use crate::ocr::OcrConfig;

/// Config filename looked up under the user config directory.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Application directory name under the user config directory.
const APP_DIR: &str = "routeai";

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Extraction cascade configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Minimum trimmed character count for text to stop the cascade.
    pub quality_threshold: usize,
    /// Upper bound for the secondary decoder, in seconds.
    pub decode_timeout_secs: u64,
    /// Rasterization and OCR settings.
    pub ocr: OcrConfig,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            quality_threshold: DEFAULT_MIN_CHARS,
            decode_timeout_secs: 60,
            ocr: OcrConfig::default(),
        }
    }
}

impl ExtractionConfig {
    pub fn decode_timeout(&self) -> Duration {
        Duration::from_secs(self.decode_timeout_secs)
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `ROUTEAI_QUALITY_THRESHOLD`: minimum characters of usable text
    /// - `ROUTEAI_DECODE_TIMEOUT_SECS`: pdftotext timeout
    /// - `ROUTEAI_OCR_LANGUAGE`: Tesseract language (e.g. "eng")
    /// - `ROUTEAI_OCR_DPI`: rasterization resolution
    /// - `ROUTEAI_OCR_PAGE_TIMEOUT_SECS`: per-page OCR timeout
    /// - `ROUTEAI_OCR_RENDER_TIMEOUT_SECS`: rasterization timeout
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(n) = env_parse("ROUTEAI_QUALITY_THRESHOLD") {
            self.quality_threshold = n;
        }
        if let Some(n) = env_parse("ROUTEAI_DECODE_TIMEOUT_SECS") {
            self.decode_timeout_secs = n;
        }
        if let Ok(val) = std::env::var("ROUTEAI_OCR_LANGUAGE") {
            self.ocr.language = val;
        }
        if let Some(n) = env_parse("ROUTEAI_OCR_DPI") {
            self.ocr.dpi = n;
        }
        if let Some(n) = env_parse("ROUTEAI_OCR_PAGE_TIMEOUT_SECS") {
            self.ocr.page_timeout_secs = n;
        }
        if let Some(n) = env_parse("ROUTEAI_OCR_RENDER_TIMEOUT_SECS") {
            self.ocr.render_timeout_secs = n;
        }
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let val = std::env::var(key).ok()?;
    match val.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring invalid value for {}: {:?}", key, val);
            None
        }
    }
}

/// Application settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Text extraction cascade.
    #[serde(default)]
    pub extraction: ExtractionConfig,
    /// Structured-extraction service.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file; must exist when given.
    pub config_path: Option<PathBuf>,
    /// Skip environment overrides (tests).
    pub ignore_env: bool,
}

impl Settings {
    /// Default config file location, e.g. `~/.config/routeai/config.toml`.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILENAME))
    }

    /// Load settings from file and environment.
    pub fn load(options: &LoadOptions) -> Result<Self, ConfigError> {
        let mut settings = match &options.config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.clone()));
                }
                Self::from_file(path)?
            }
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        if !options.ignore_env {
            settings.extraction = settings.extraction.with_env_overrides();
            settings.llm = settings.llm.with_env_overrides();
        }

        Ok(settings)
    }

    /// Parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings: Settings =
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        settings.source_path = Some(path.to_path_buf());
        tracing::debug!("Loaded config from {}", path.display());
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmProvider;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.extraction.quality_threshold, 50);
        assert_eq!(settings.extraction.ocr.dpi, 300);
        assert_eq!(settings.extraction.ocr.language, "eng");
        assert_eq!(settings.llm.max_retries, 0);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[extraction]
quality_threshold = 80

[extraction.ocr]
dpi = 200

[llm]
provider = "openai"
model = "gpt-4o-mini"
"#,
        )
        .unwrap();

        let settings = Settings::load(&LoadOptions {
            config_path: Some(path.clone()),
            ignore_env: true,
        })
        .unwrap();

        assert_eq!(settings.extraction.quality_threshold, 80);
        assert_eq!(settings.extraction.ocr.dpi, 200);
        assert_eq!(settings.extraction.ocr.language, "eng");
        assert_eq!(settings.llm.provider, LlmProvider::OpenAI);
        assert_eq!(settings.llm.model, "gpt-4o-mini");
        assert_eq!(settings.source_path, Some(path));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = Settings::load(&LoadOptions {
            config_path: Some(PathBuf::from("/nonexistent/routeai.toml")),
            ignore_env: true,
        });
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[extraction]\nquality_threshold = \"lots\"\n").unwrap();

        let result = Settings::from_file(&path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}
