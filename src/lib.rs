//! RouteAI - transport permit route extraction.
//!
//! Recovers text from uploaded permit documents through a cascade of
//! extraction strategies (embedded text, alternate decoder, raster OCR) and
//! asks a language model to structure it into an origin, a destination and
//! ordered waypoints.

pub mod cli;
pub mod config;
pub mod document;
pub mod extraction;
pub mod llm;
pub mod ocr;
pub mod route;
pub mod services;

pub use document::RawDocument;
pub use extraction::{ExtractionPipeline, ExtractionResult, Strategy};
pub use route::{RouteCandidate, RouteStructurer};
pub use services::{ErrorEnvelope, ErrorKind, UploadCoordinator};
