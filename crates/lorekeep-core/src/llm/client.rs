//! HTTP client for OpenAI-compatible chat-completions endpoints
//!
//! Works against Ollama's `/v1` endpoint as well as hosted providers.
//! Handles rate limiting with exponential backoff.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use tracing::{debug, warn};

use crate::config::LlmConfig;
use crate::error::{Error, Result};

use super::types::{ChatRequest, ChatResponse, LlmResponse, Message};
use super::TextGenerator;

/// Maximum number of retry attempts for rate-limited requests
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff (in milliseconds)
const BACKOFF_BASE_MS: u64 = 1000;

/// Chat-completions client
///
/// Thread-safe client for making completion requests. Cheap to clone.
#[derive(Clone)]
pub struct LlmClient {
    http_client: HttpClient,
    config: LlmConfig,
    api_key: Option<String>,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .field("api_key", &self.api_key.is_some())
            .finish()
    }
}

impl LlmClient {
    /// Create a new client from configuration.
    ///
    /// The API key is resolved from the environment and may be absent
    /// (local Ollama endpoints do not require one).
    pub fn new(config: LlmConfig) -> Result<Self> {
        let api_key = config
            .resolved_api_key()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(Error::NetworkError)?;

        Ok(Self {
            http_client,
            config,
            api_key,
        })
    }

    /// Get the configured model name
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Make a chat completion request, retrying on rate limits
    pub async fn complete(&self, messages: Vec<Message>) -> Result<LlmResponse> {
        let request = ChatRequest::new(&self.config.model, messages)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.send_request(&request).await {
                Ok(response) => return Ok(response),
                Err(Error::RateLimited(wait_secs)) if attempts < MAX_RETRY_ATTEMPTS => {
                    let backoff = calculate_backoff(attempts, wait_secs);
                    warn!(
                        attempt = attempts,
                        wait_ms = backoff,
                        "Rate limited, retrying after backoff"
                    );
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Send a single request to the API
    async fn send_request(&self, request: &ChatRequest) -> Result<LlmResponse> {
        let url = format!("{}/chat/completions", self.config.base_url);

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Sending chat completion request"
        );

        let mut builder = self.http_client.post(&url).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(Error::NetworkError)?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 => Error::GenerationError(
                    "Unauthorized: set LOREKEEP_API_KEY or OPENAI_API_KEY".to_string(),
                ),
                429 => Error::RateLimited(extract_retry_after(&body).unwrap_or(60)),
                404 => Error::GenerationError(format!(
                    "Model or endpoint not found: {}",
                    body
                )),
                500..=599 => Error::GenerationError(format!("Server error ({}): {}", status, body)),
                _ => Error::GenerationError(format!("HTTP error {}: {}", status, body)),
            });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::GenerationError(format!("Failed to parse response: {}", e)))?;

        LlmResponse::from_chat_response(chat_response)
            .ok_or_else(|| Error::GenerationError("Empty response from API".to_string()))
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, system: &str, user: &str) -> Result<String> {
        let messages = vec![Message::system(system), Message::user(user)];
        let response = self.complete(messages).await?;
        Ok(response.content)
    }
}

/// Calculate backoff delay with jitter
fn calculate_backoff(attempt: u32, suggested_wait: u64) -> u64 {
    let base = BACKOFF_BASE_MS * 2u64.pow(attempt - 1);
    let delay = base.max(suggested_wait * 1000);

    let jitter = delay / 10;
    delay + (rand_jitter() % jitter.max(1))
}

/// Generate a pseudo-random jitter value
fn rand_jitter() -> u64 {
    use std::time::SystemTime;
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64 % 1000)
        .unwrap_or(0)
}

/// Extract retry-after value from a 429 error body
fn extract_retry_after(body: &str) -> Option<u64> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    if let Some(retry_after) = json.get("retry_after").and_then(|v| v.as_u64()) {
        return Some(retry_after);
    }
    json.get("error")
        .and_then(|e| e.get("retry_after"))
        .and_then(|v| v.as_u64())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> LlmConfig {
        LlmConfig {
            api_key: None,
            base_url: "http://localhost:11434/v1".to_string(),
            model: "test-model".to_string(),
            temperature: 0.0,
            max_tokens: 512,
            timeout_secs: 30,
        }
    }

    #[test]
    fn test_client_new() {
        let client = LlmClient::new(test_config()).unwrap();
        assert_eq!(client.model(), "test-model");
    }

    #[test]
    fn test_client_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LlmClient>();
    }

    #[test]
    fn test_client_debug_redacts_key() {
        let client = LlmClient::new(test_config()).unwrap();
        let debug = format!("{:?}", client);
        assert!(debug.contains("LlmClient"));
        assert!(debug.contains("test-model"));
    }

    #[test]
    fn test_calculate_backoff() {
        let backoff1 = calculate_backoff(1, 0);
        assert!(backoff1 >= BACKOFF_BASE_MS);

        let backoff2 = calculate_backoff(2, 0);
        assert!(backoff2 >= BACKOFF_BASE_MS * 2);

        let backoff_with_wait = calculate_backoff(1, 5);
        assert!(backoff_with_wait >= 5000);
    }

    #[test]
    fn test_extract_retry_after() {
        assert_eq!(extract_retry_after(r#"{"retry_after": 30}"#), Some(30));
        assert_eq!(
            extract_retry_after(r#"{"error": {"retry_after": 60}}"#),
            Some(60)
        );
        assert_eq!(extract_retry_after(r#"{"message": "rate limited"}"#), None);
    }
}
