use async_trait::async_trait;
use log::{debug, error, warn};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::errors::ProviderError;
use crate::llm::CompletionService;

/// Client for any OpenAI-compatible chat-completions endpoint
#[derive(Debug)]
pub struct OpenAiCompatible {
    /// Backend name used in logs
    name: String,
    /// Model identifier
    model: String,
    /// Bearer token; empty for local servers that need none
    api_key: String,
    /// Full `.../chat/completions` URL
    url: Url,
    /// HTTP client for making requests
    client: Client,
    /// Request timeout in seconds
    timeout_secs: u64,
    /// Whether `response_format` may be sent
    supports_json: bool,
    /// Maximum number of transport retry attempts
    max_retries: u32,
    /// Base backoff time in milliseconds for exponential backoff
    backoff_base_ms: u64,
}

/// Chat message object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: String,
    /// Content of the message
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Chat-completions request body
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Chat-completions response body
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

/// Resolve a base URL or a full endpoint URL to the chat-completions URL
pub fn chat_completions_url(endpoint: &str) -> Result<Url, ProviderError> {
    let trimmed = endpoint.trim();
    let parsed = Url::parse(trimmed)
        .map_err(|e| ProviderError::ConnectionError(format!("Invalid endpoint '{}': {}", trimmed, e)))?;
    if parsed.path().trim_end_matches('/').ends_with("/chat/completions") {
        return Ok(parsed);
    }

    let base = if trimmed.ends_with('/') {
        parsed
    } else {
        Url::parse(&format!("{}/", trimmed))
            .map_err(|e| ProviderError::ConnectionError(format!("Invalid endpoint '{}': {}", trimmed, e)))?
    };
    base.join("chat/completions")
        .map_err(|e| ProviderError::ConnectionError(format!("Invalid endpoint '{}': {}", trimmed, e)))
}

impl OpenAiCompatible {
    /// Create a new client
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        endpoint: &str,
        timeout_secs: u64,
        supports_json: bool,
    ) -> Result<Self, ProviderError> {
        let url = chat_completions_url(endpoint)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| ProviderError::ConnectionError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            name: name.into(),
            model: model.into(),
            api_key: api_key.into(),
            url,
            client,
            timeout_secs,
            supports_json,
            max_retries: 2,
            backoff_base_ms: 1000,
        })
    }

    /// Override transport retry settings
    pub fn with_retries(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn send_once(&self, body: &ChatCompletionRequest<'_>) -> Result<String, ProviderError> {
        let mut request = self.client.post(self.url.clone()).json(body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                ProviderError::ConnectionError(e.to_string())
            } else {
                ProviderError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!("{} API error ({}): {}", self.name, status, message);
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthenticationError(message),
                _ => ProviderError::ApiError {
                    status_code: status.as_u16(),
                    message,
                },
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::ParseError("response contains no choices".to_string()))
    }
}

fn is_retryable(error: &ProviderError) -> bool {
    match error {
        ProviderError::ApiError { status_code, .. } => *status_code == 429 || *status_code >= 500,
        ProviderError::ConnectionError(_) | ProviderError::Timeout(_) => true,
        _ => false,
    }
}

/// Longest single wait between HTTP retries
const MAX_BACKOFF_MS: u64 = 60_000;

/// Exponential backoff for the given retry attempt, capped at a minute
fn backoff_delay_ms(base_ms: u64, attempt: u32) -> u64 {
    base_ms
        .saturating_mul(2u64.saturating_pow(attempt))
        .min(MAX_BACKOFF_MS)
}

#[async_trait]
impl CompletionService for OpenAiCompatible {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn supports_json(&self) -> bool {
        self.supports_json
    }

    async fn complete(&self, prompt: &str, want_json: bool) -> Result<String, ProviderError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            response_format: (want_json && self.supports_json).then_some(ResponseFormat { kind: "json_object" }),
        };

        let mut attempt = 0;
        loop {
            match self.send_once(&body).await {
                Ok(text) => {
                    debug!("{} answered with {} chars", self.name, text.len());
                    return Ok(text);
                }
                Err(e) if attempt < self.max_retries && is_retryable(&e) => {
                    let delay = backoff_delay_ms(self.backoff_base_ms, attempt);
                    warn!("{} request failed ({}), retrying in {}ms", self.name, e, delay);
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
