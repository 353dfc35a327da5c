//! Turns extracted permit text into a [`RouteCandidate`] via an LLM.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{RouteCandidate, StructuringError};
use crate::extraction::{truncate_chars, QualityGate};
use crate::llm::{CompletionRequest, CompletionService, LlmConfig, LlmError};

/// Decoding temperature for route requests. Kept at zero so repeated calls
/// on the same text are reproducible, which also makes retries safe.
const ROUTE_TEMPERATURE: f32 = 0.0;

/// Structured route extraction over an injected completion service.
pub struct RouteStructurer {
    service: Arc<dyn CompletionService>,
    gate: QualityGate,
    prompt: String,
    max_tokens: u32,
    max_content_chars: usize,
}

impl RouteStructurer {
    pub fn new(service: Arc<dyn CompletionService>, gate: QualityGate, config: &LlmConfig) -> Self {
        Self {
            service,
            gate,
            prompt: config.get_route_prompt().to_string(),
            max_tokens: config.max_tokens,
            max_content_chars: config.max_content_chars,
        }
    }

    /// Extract origin, destination and waypoints from `text`.
    ///
    /// Text the quality gate rejects yields the sentinel route without
    /// contacting the service.
    pub async fn structure(&self, text: &str) -> Result<RouteCandidate, StructuringError> {
        if !self.gate.accept(text) {
            info!(
                "Text below quality threshold ({} chars), returning sentinel route",
                text.trim().chars().count()
            );
            return Ok(RouteCandidate::sentinel());
        }

        let request = CompletionRequest {
            prompt: self.build_prompt(text),
            temperature: ROUTE_TEMPERATURE,
            max_tokens: self.max_tokens,
            json_output: true,
        };

        let raw = self.service.complete(&request).await.map_err(|e| match e {
            LlmError::MalformedResponse { detail, body } => {
                StructuringError::InvalidModelOutput {
                    reason: detail,
                    raw: body,
                }
            }
            other => StructuringError::ServiceUnavailable(other.to_string()),
        })?;

        debug!("Route service returned {} chars", raw.len());
        parse_route(&raw)
    }

    fn build_prompt(&self, text: &str) -> String {
        let content = truncate_chars(text.trim(), self.max_content_chars);
        if content.len() < text.trim().len() {
            warn!(
                "Document text truncated to {} chars for route extraction",
                self.max_content_chars
            );
        }
        self.prompt.replace("{content}", content)
    }
}

/// Parse a completion strictly as a route object.
///
/// Surrounding whitespace is the only leniency; fences, commentary, missing
/// or extra keys and wrong types are all rejected.
pub(crate) fn parse_route(raw: &str) -> Result<RouteCandidate, StructuringError> {
    let invalid = |reason: String| StructuringError::InvalidModelOutput {
        reason,
        raw: raw.to_string(),
    };

    let route: RouteCandidate =
        serde_json::from_str(raw.trim()).map_err(|e| invalid(e.to_string()))?;

    if route.origin.trim().is_empty() {
        return Err(invalid("origin is empty".to_string()));
    }
    if route.destination.trim().is_empty() {
        return Err(invalid("destination is empty".to_string()));
    }
    Ok(route)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const PERMIT: &str = "Oversize load permit 2291. Depart Depot North, travel via Elm Street \
                          and Route 9, arrive Harbor Gate terminal.";

    /// Replays one canned reply and records every request.
    struct MockService {
        reply: fn() -> Result<String, LlmError>,
        calls: AtomicUsize,
        last: Mutex<Option<CompletionRequest>>,
    }

    impl MockService {
        fn new(reply: fn() -> Result<String, LlmError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
                last: Mutex::new(None),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionService for MockService {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(request.clone());
            (self.reply)()
        }
    }

    fn structurer(service: Arc<MockService>) -> RouteStructurer {
        RouteStructurer::new(service, QualityGate::new(50), &LlmConfig::default())
    }

    fn ok_route() -> Result<String, LlmError> {
        Ok(r#"{"origin":"A","destination":"B","waypoints":["C","D"]}"#.to_string())
    }

    #[tokio::test]
    async fn test_empty_text_returns_sentinel_without_call() {
        let service = MockService::new(ok_route);
        let route = structurer(service.clone()).structure("").await.unwrap();

        assert!(route.is_sentinel());
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn test_short_text_returns_sentinel_without_call() {
        let service = MockService::new(ok_route);
        let route = structurer(service.clone())
            .structure("   page 1   ")
            .await
            .unwrap();

        assert!(route.is_sentinel());
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn test_valid_reply_keeps_waypoint_order() {
        let service = MockService::new(ok_route);
        let route = structurer(service.clone()).structure(PERMIT).await.unwrap();

        assert_eq!(route.origin, "A");
        assert_eq!(route.destination, "B");
        assert_eq!(route.waypoints, vec!["C", "D"]);
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test]
    async fn test_request_is_deterministic_json() {
        let service = MockService::new(ok_route);
        structurer(service.clone()).structure(PERMIT).await.unwrap();

        let request = service.last.lock().unwrap().clone().unwrap();
        assert_eq!(request.temperature, 0.0);
        assert!(request.json_output);
        assert!(request.prompt.contains("Harbor Gate terminal"));
        assert!(request.prompt.contains("\"waypoints\""));
        assert!(!request.prompt.contains("{content}"));
    }

    #[tokio::test]
    async fn test_non_json_reply_is_invalid_output() {
        let service = MockService::new(|| Ok("The route goes from A to B.".to_string()));
        let err = structurer(service).structure(PERMIT).await.unwrap_err();

        match err {
            StructuringError::InvalidModelOutput { raw, .. } => {
                assert_eq!(raw, "The route goes from A to B.")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_key_is_invalid_output() {
        let service = MockService::new(|| Ok(r#"{"origin":"A","destination":"B"}"#.to_string()));
        let err = structurer(service).structure(PERMIT).await.unwrap_err();
        assert!(matches!(err, StructuringError::InvalidModelOutput { .. }));
    }

    #[tokio::test]
    async fn test_wrong_type_is_invalid_output() {
        let service = MockService::new(|| {
            Ok(r#"{"origin":"A","destination":"B","waypoints":"C, D"}"#.to_string())
        });
        let err = structurer(service).structure(PERMIT).await.unwrap_err();
        assert_eq!(
            err.raw(),
            Some(r#"{"origin":"A","destination":"B","waypoints":"C, D"}"#)
        );
    }

    #[test]
    fn test_extra_key_and_empty_origin_rejected() {
        assert!(parse_route(r#"{"origin":"A","destination":"B","waypoints":[],"notes":"x"}"#).is_err());
        assert!(parse_route(r#"{"origin":" ","destination":"B","waypoints":[]}"#).is_err());
        assert!(parse_route("```json\n{\"origin\":\"A\",\"destination\":\"B\",\"waypoints\":[]}\n```").is_err());
    }

    #[test]
    fn test_surrounding_whitespace_accepted() {
        let route = parse_route("\n  {\"origin\":\"A\",\"destination\":\"B\",\"waypoints\":[]}\n").unwrap();
        assert_eq!(route.origin, "A");
    }

    #[tokio::test]
    async fn test_service_error_is_unavailable() {
        let service = MockService::new(|| Err(LlmError::Connection("refused".to_string())));
        let err = structurer(service).structure(PERMIT).await.unwrap_err();
        assert!(matches!(err, StructuringError::ServiceUnavailable(_)));

        let service = MockService::new(|| {
            Err(LlmError::Api {
                status: 502,
                body: "bad gateway".to_string(),
            })
        });
        let err = structurer(service).structure(PERMIT).await.unwrap_err();
        assert!(matches!(err, StructuringError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_malformed_envelope_is_invalid_output() {
        let service = MockService::new(|| {
            Err(LlmError::MalformedResponse {
                detail: "missing field `response`".to_string(),
                body: "{}".to_string(),
            })
        });
        let err = structurer(service).structure(PERMIT).await.unwrap_err();
        assert_eq!(err.raw(), Some("{}"));
    }

    #[test]
    fn test_prompt_content_cut_on_char_boundary() {
        let config = LlmConfig {
            route_prompt: Some("<{content}>".to_string()),
            max_content_chars: 4,
            ..LlmConfig::default()
        };
        let structurer =
            RouteStructurer::new(MockService::new(ok_route), QualityGate::new(50), &config);

        assert_eq!(structurer.build_prompt("  Düsseldorf  "), "<Düss>");
        assert_eq!(structurer.build_prompt("Kö"), "<Kö>");
    }
}
