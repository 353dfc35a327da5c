//! Route candidates and the LLM-backed structurer that produces them.

mod structurer;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use structurer::RouteStructurer;

/// Origin used when no usable text was recovered.
pub const UNKNOWN_START: &str = "Unknown Start";
/// Destination used when no usable text was recovered.
pub const UNKNOWN_END: &str = "Unknown End";

/// A structured route read out of a permit.
///
/// Waypoints keep the order in which the document mentions them, duplicates
/// included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteCandidate {
    pub origin: String,
    pub destination: String,
    pub waypoints: Vec<String>,
}

impl RouteCandidate {
    /// The fallback route for documents without usable text.
    pub fn sentinel() -> Self {
        Self {
            origin: UNKNOWN_START.to_string(),
            destination: UNKNOWN_END.to_string(),
            waypoints: Vec::new(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.origin == UNKNOWN_START && self.destination == UNKNOWN_END && self.waypoints.is_empty()
    }
}

/// Errors surfaced by [`RouteStructurer::structure`].
#[derive(Debug, Error)]
pub enum StructuringError {
    /// The service could not be reached, timed out or answered non-2xx.
    #[error("Route service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The service answered, but not with a valid route object.
    #[error("Invalid model output: {reason}")]
    InvalidModelOutput { reason: String, raw: String },
}

impl StructuringError {
    /// Raw model output, when the service answered at all.
    pub fn raw(&self) -> Option<&str> {
        match self {
            StructuringError::InvalidModelOutput { raw, .. } => Some(raw),
            StructuringError::ServiceUnavailable(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel() {
        let route = RouteCandidate::sentinel();
        assert_eq!(route.origin, "Unknown Start");
        assert_eq!(route.destination, "Unknown End");
        assert!(route.waypoints.is_empty());
        assert!(route.is_sentinel());
    }

    #[test]
    fn test_serialized_shape() {
        let route = RouteCandidate {
            origin: "A".to_string(),
            destination: "B".to_string(),
            waypoints: vec!["C".to_string(), "C".to_string()],
        };
        let json = serde_json::to_value(&route).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"origin": "A", "destination": "B", "waypoints": ["C", "C"]})
        );
        assert!(!route.is_sentinel());
    }
}
