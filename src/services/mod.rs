//! Service layer for RouteAI.
//!
//! Domain orchestration separated from transport concerns, so the CLI or an
//! HTTP handler can drive it the same way.

pub mod upload;

pub use upload::{guess_content_type, ErrorEnvelope, ErrorKind, UploadCoordinator};
