//! LLM client for structured route extraction.
//!
//! Supports Ollama for local inference and OpenAI-compatible chat
//! completion APIs (OpenAI, Groq, Together.ai).

mod config;
mod prompts;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub use config::{LlmConfig, LlmProvider};
pub use prompts::DEFAULT_ROUTE_PROMPT;

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Failed to connect to LLM service
    #[error("Connection error: {0}")]
    Connection(String),
    /// Request did not complete in time
    #[error("Request timed out: {0}")]
    Timeout(String),
    /// API returned a non-success status
    #[error("API error: HTTP {status}: {body}")]
    Api { status: u16, body: String },
    /// The service answered, but not with the expected envelope
    #[error("Malformed response: {detail}")]
    MalformedResponse { detail: String, body: String },
    /// Client could not be configured
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LlmError {
    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Connection(_) | LlmError::Timeout(_) => true,
            LlmError::Api { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
            }
            LlmError::MalformedResponse { .. } | LlmError::Config(_) => false,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout(e.to_string())
        } else {
            LlmError::Connection(e.to_string())
        }
    }
}

/// A single prompt for the completion service.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the backend to constrain output to JSON where supported.
    pub json_output: bool,
}

/// "Prompt in, completion out." Implemented by [`LlmClient`] and by test
/// doubles.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

/// LLM client for document processing.
pub struct LlmClient {
    config: LlmConfig,
    client: Client,
}

/// Ollama API request format.
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Ollama API response format.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

/// OpenAI chat completions request format.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// OpenAI chat completions response format.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl LlmClient {
    /// Create a new LLM client with the given configuration.
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Call Ollama API with a prompt.
    async fn call_ollama(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let body = OllamaRequest {
            model: self.config.model.clone(),
            prompt: request.prompt.clone(),
            stream: false,
            format: request.json_output.then_some("json"),
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        let url = format!("{}/api/generate", self.config.endpoint.trim_end_matches('/'));
        let text = self.post(&url, &body).await?;

        let resp: OllamaResponse =
            serde_json::from_str(&text).map_err(|e| LlmError::MalformedResponse {
                detail: e.to_string(),
                body: text.clone(),
            })?;
        Ok(resp.response)
    }

    /// Call an OpenAI-compatible chat completions API.
    async fn call_openai(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let url = format!(
            "{}/v1/chat/completions",
            self.config.endpoint.trim_end_matches('/')
        );
        let text = self.post(&url, &body).await?;

        let resp: ChatResponse =
            serde_json::from_str(&text).map_err(|e| LlmError::MalformedResponse {
                detail: e.to_string(),
                body: text.clone(),
            })?;
        resp.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::MalformedResponse {
                detail: "response has no choices".to_string(),
                body: text,
            })
    }

    /// POST a JSON body and return the response text of a 2xx reply.
    async fn post<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<String, LlmError> {
        let mut req = self.client.post(url).json(body);
        if let Some(ref key) = self.config.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(LlmError::Api {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }

    async fn call_once(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        match self.config.provider {
            LlmProvider::Ollama => self.call_ollama(request).await,
            LlmProvider::OpenAI => self.call_openai(request).await,
        }
    }
}

/// Exponential backoff starting at `base_ms`.
fn backoff_delay(attempt: u32, base_ms: u64) -> Duration {
    Duration::from_millis(base_ms.saturating_mul(1 << attempt.min(6)))
}

#[async_trait]
impl CompletionService for LlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        debug!(
            "Sending {} char prompt to {:?} model {}",
            request.prompt.len(),
            self.config.provider,
            self.config.model
        );

        let mut attempt = 0;
        loop {
            match self.call_once(request).await {
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let wait = backoff_delay(attempt, 500);
                    warn!(
                        "LLM request failed (attempt {}): {}, retrying in {:?}",
                        attempt + 1,
                        e,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(LlmError::Connection("refused".to_string()).is_retryable());
        assert!(LlmError::Timeout("slow".to_string()).is_retryable());
        assert!(LlmError::Api {
            status: 429,
            body: String::new()
        }
        .is_retryable());
        assert!(LlmError::Api {
            status: 503,
            body: String::new()
        }
        .is_retryable());
        assert!(!LlmError::Api {
            status: 401,
            body: String::new()
        }
        .is_retryable());
        assert!(!LlmError::MalformedResponse {
            detail: "eof".to_string(),
            body: String::new()
        }
        .is_retryable());
    }

    #[test]
    fn test_backoff_grows() {
        assert_eq!(backoff_delay(0, 500), Duration::from_millis(500));
        assert_eq!(backoff_delay(1, 500), Duration::from_millis(1000));
        assert_eq!(backoff_delay(3, 500), Duration::from_millis(4000));
    }

    #[test]
    fn test_openai_request_shape() {
        let body = ChatRequest {
            model: "gpt-4".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "hi".to_string(),
            }],
            temperature: 0.0,
            max_tokens: 16,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-4");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["temperature"], 0.0);
    }

    #[test]
    fn test_ollama_request_omits_format_unless_json() {
        let body = OllamaRequest {
            model: "llama3.1:8b".to_string(),
            prompt: "hi".to_string(),
            stream: false,
            format: None,
            options: OllamaOptions {
                temperature: 0.0,
                num_predict: 16,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("format").is_none());
        assert_eq!(json["stream"], false);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_connection_error() {
        let config = LlmConfig::default().with_endpoint("http://127.0.0.1:9");
        let client = LlmClient::new(config).unwrap();
        let request = CompletionRequest {
            prompt: "hi".to_string(),
            temperature: 0.0,
            max_tokens: 16,
            json_output: true,
        };

        let err = client.complete(&request).await.unwrap_err();
        assert!(err.is_retryable(), "unexpected error: {:?}", err);
    }
}
