//! Generative-text completion service client.
//!
//! A single operation: prompt string in, free-text completion out. The
//! response is *not* trusted to be valid JSON — that is the extraction
//! parser's problem, not the client's.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ClientError;

/// Prompt-to-completion service abstraction.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ClientError>;
}

/// HTTP client for a hosted text-generation endpoint.
pub struct GenerativeTextClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl GenerativeTextClient {
    pub fn new(base_url: &str, api_key: Option<&str>, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(str::to_string),
            client,
            timeout_secs,
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    text: String,
}

#[async_trait]
impl CompletionClient for GenerativeTextClient {
    async fn complete(&self, prompt: &str) -> Result<String, ClientError> {
        let url = format!("{}/v1/complete", self.base_url);
        let body = CompletionRequest { prompt };

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                ClientError::Connection(self.base_url.clone())
            } else if e.is_timeout() {
                tracing::warn!(timeout_secs = self.timeout_secs, "Completion request timed out");
                ClientError::Timeout
            } else {
                ClientError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ClientError::MalformedResponse(e.to_string()))?;

        Ok(parsed.text)
    }
}

/// Mock completion client for tests — returns a configurable response.
pub struct MockCompletionClient {
    response: String,
    calls: AtomicUsize,
}

impl MockCompletionClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    /// How many completions were requested.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn complete(&self, _prompt: &str) -> Result<String, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }
}
