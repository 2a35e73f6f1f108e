//! HTTP client for OpenAI-compatible Chat Completions endpoints.
//!
//! Works with OpenAI itself and with local or hosted servers that mirror its
//! API (Ollama, LM Studio, vLLM, Groq, Together, ...), in both buffered and
//! streaming SSE modes.

use std::time::Duration;

use futures::StreamExt;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::debug;

use crate::error::{ClientError, Result, parse_error_message};
use crate::request::{GenerationParams, build_request};
use crate::streaming::SseDecoder;
use crate::types::{ChatCompletionResponse, Message, ModelInfo, ModelsResponse};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default base URL (a local Ollama server).
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434/v1";

/// Default wall-clock timeout for a whole request, streamed body included.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

// ---------------------------------------------------------------------------
// Client configuration
// ---------------------------------------------------------------------------

/// Connection settings for a single endpoint.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Bearer token.  Empty means no `Authorization` header is sent.
    pub api_key: String,
    /// Timeout covering connect, request and the complete response body.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            api_key: String::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// A chat-completion client bound to one endpoint.
///
/// Holds no per-request state; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct LlmClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl LlmClient {
    /// Create a new client.  A trailing `/` on the base URL is dropped.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Config {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        let base_url = config
            .base_url
            .strip_suffix('/')
            .unwrap_or(&config.base_url)
            .to_owned();

        Ok(Self {
            base_url,
            api_key: config.api_key,
            http,
        })
    }

    /// The effective base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -----------------------------------------------------------------------
    // Public API
    // -----------------------------------------------------------------------

    /// Send a chat request and wait for the complete response.
    pub async fn chat_complete(
        &self,
        params: &GenerationParams,
        messages: &[Message],
    ) -> Result<ChatCompletionResponse> {
        let body = build_request(params, messages, false);
        let resp = self
            .send(self.http.post(self.endpoint("chat/completions")).json(&body), body.model)
            .await?;

        let text = resp.text().await.map_err(|e| ClientError::Transport {
            reason: format!("failed to read response body: {e}"),
        })?;

        serde_json::from_str(&text).map_err(|e| ClientError::Decode {
            reason: format!("invalid chat completion response: {e}"),
        })
    }

    /// Send a chat request in streaming mode, invoking `on_fragment` for each
    /// content fragment as it arrives.
    ///
    /// Returns once the server sends `[DONE]` or closes the stream.
    pub async fn chat_complete_streaming<F>(
        &self,
        params: &GenerationParams,
        messages: &[Message],
        mut on_fragment: F,
    ) -> Result<()>
    where
        F: FnMut(&str),
    {
        let body = build_request(params, messages, true);
        let resp = self
            .send(self.http.post(self.endpoint("chat/completions")).json(&body), body.model)
            .await?;

        let mut decoder = SseDecoder::new();
        let mut byte_stream = resp.bytes_stream();
        let mut fragments = 0usize;

        while let Some(chunk_result) = byte_stream.next().await {
            let chunk = chunk_result.map_err(|e| ClientError::StreamRead {
                reason: e.to_string(),
            })?;

            let done = decoder.feed(&chunk, &mut |text: &str| {
                fragments += 1;
                on_fragment(text);
            });
            if done {
                debug!(fragments, "stream finished with [DONE]");
                return Ok(());
            }
        }

        decoder.finish();
        debug!(fragments, "stream closed by server");
        Ok(())
    }

    /// List the models the endpoint serves, in server order.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let resp = self.send(self.http.get(self.endpoint("models")), "").await?;

        let text = resp.text().await.map_err(|e| ClientError::Transport {
            reason: format!("failed to read response body: {e}"),
        })?;

        let models: ModelsResponse = serde_json::from_str(&text).map_err(|e| ClientError::Decode {
            reason: format!("invalid models response: {e}"),
        })?;

        Ok(models.data)
    }

    // -----------------------------------------------------------------------
    // Transport
    // -----------------------------------------------------------------------

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if !self.api_key.is_empty() {
            let auth_value = format!("Bearer {}", self.api_key);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value).map_err(|e| ClientError::Config {
                    reason: format!("invalid authorization header: {e}"),
                })?,
            );
        }

        Ok(headers)
    }

    /// Send `request` and turn non-2xx statuses into [`ClientError::Api`].
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        model: &str,
    ) -> Result<reqwest::Response> {
        let request = request.headers(self.headers()?).build()?;
        debug!(method = %request.method(), url = %request.url(), model, "sending request");

        let resp = self
            .http
            .execute(request)
            .await
            .map_err(|e| ClientError::Transport {
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let message = parse_error_message(&body);
        debug!(status = status.as_u16(), %message, "request rejected");

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = LlmClient::new(ClientConfig::new("http://localhost:11434/v1/", "")).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434/v1");
        assert_eq!(
            client.endpoint("chat/completions"),
            "http://localhost:11434/v1/chat/completions"
        );
    }

    #[test]
    fn empty_api_key_is_accepted_and_sends_no_auth() {
        let client = LlmClient::new(ClientConfig::default()).unwrap();
        let headers = client.headers().unwrap();
        assert!(headers.get(AUTHORIZATION).is_none());
        assert_eq!(headers[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn api_key_becomes_bearer_header() {
        let client = LlmClient::new(ClientConfig::new(DEFAULT_BASE_URL, "sk-test")).unwrap();
        let headers = client.headers().unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer sk-test");
    }

    #[test]
    fn api_key_with_newline_is_rejected() {
        let client = LlmClient::new(ClientConfig::new(DEFAULT_BASE_URL, "bad\nkey")).unwrap();
        assert!(matches!(client.headers(), Err(ClientError::Config { .. })));
    }

    #[test]
    fn default_config_values() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.api_key.is_empty());
        assert_eq!(config.timeout, Duration::from_secs(300));

        let config = config.with_timeout(Duration::from_secs(5));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }
}
