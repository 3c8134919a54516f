//! Document analysis (OCR) service client.
//!
//! The service exposes an asynchronous job API: submitting a document
//! returns an operation handle via the `Operation-Location` header, and the
//! handle is polled until the analysis reaches a terminal status. The
//! `OcrClient` trait abstracts that surface so the orchestrator can be
//! driven by a scripted mock in tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;

use super::types::{JobHandle, JobStatus, OcrPayload, PollResponse};
use super::ClientError;

/// Async-job OCR service abstraction.
#[async_trait]
pub trait OcrClient: Send + Sync {
    /// Submit a document for analysis. Returns the handle to poll.
    async fn submit(&self, bytes: &[u8]) -> Result<JobHandle, ClientError>;

    /// Check the status of a submitted job.
    async fn poll(&self, handle: &JobHandle) -> Result<PollResponse, ClientError>;
}

/// HTTP client for a Document-Intelligence-style layout analysis service.
pub struct DocumentAnalysisClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl DocumentAnalysisClient {
    /// Create a client for the service at `base_url`, authenticated with
    /// the subscription key the service expects on every request.
    pub fn new(base_url: &str, api_key: &str) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        }
    }

    fn classify(&self, e: reqwest::Error) -> ClientError {
        if e.is_connect() {
            ClientError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            ClientError::Timeout
        } else {
            ClientError::Http(e.to_string())
        }
    }
}

/// Wire shape of a poll response from the analysis service.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeStatusBody {
    status: String,
    analyze_result: Option<AnalyzeResultBody>,
    error: Option<AnalyzeErrorBody>,
}

#[derive(Deserialize)]
struct AnalyzeResultBody {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tables: Vec<super::types::OcrTable>,
    #[serde(default)]
    paragraphs: Vec<super::types::OcrParagraph>,
}

#[derive(Deserialize)]
struct AnalyzeErrorBody {
    #[serde(default)]
    message: String,
}

#[async_trait]
impl OcrClient for DocumentAnalysisClient {
    async fn submit(&self, bytes: &[u8]) -> Result<JobHandle, ClientError> {
        let url = format!(
            "{}/documentModels/prebuilt-layout:analyze?api-version=2024-02-29-preview",
            self.base_url
        );

        let response = self
            .client
            .post(&url)
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .header("Content-Type", "application/octet-stream")
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let operation_location = response
            .headers()
            .get("operation-location")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                ClientError::MalformedResponse("No operation location returned".into())
            })?;

        Ok(JobHandle(operation_location))
    }

    async fn poll(&self, handle: &JobHandle) -> Result<PollResponse, ClientError> {
        let response = self
            .client
            .get(&handle.0)
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: AnalyzeStatusBody = response
            .json()
            .await
            .map_err(|e| ClientError::MalformedResponse(e.to_string()))?;

        Ok(classify_status_body(body))
    }
}

/// Map the service's wire status onto the three statuses the orchestrator
/// branches on. Anything that is not a terminal status keeps polling.
fn classify_status_body(body: AnalyzeStatusBody) -> PollResponse {
    match body.status.as_str() {
        "succeeded" => PollResponse {
            status: JobStatus::Succeeded,
            result: body.analyze_result.map(|r| OcrPayload {
                text: r.content,
                tables: r.tables,
                paragraphs: r.paragraphs,
            }),
            error: None,
        },
        "failed" => PollResponse {
            status: JobStatus::Failed,
            result: None,
            error: Some(
                body.error
                    .map(|e| e.message)
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "Unknown error".to_string()),
            ),
        },
        _ => PollResponse {
            status: JobStatus::Pending,
            result: None,
            error: None,
        },
    }
}

// ──────────────────────────────────────────────
// Mock client
// ──────────────────────────────────────────────

/// One scripted poll outcome for `MockOcrClient`.
#[derive(Debug, Clone)]
pub enum MockPoll {
    Pending,
    Succeed(OcrPayload),
    Fail(String),
}

/// Scripted OCR client for tests.
///
/// Poll sequences are registered per document payload, so scripts resolve
/// deterministically even when documents are submitted concurrently. An
/// exhausted or unregistered script keeps reporting `Pending`, which is how
/// timeout paths are exercised.
#[derive(Default)]
pub struct MockOcrClient {
    scripts: Mutex<Vec<(Vec<u8>, Vec<MockPoll>)>>,
    jobs: Mutex<HashMap<usize, Vec<MockPoll>>>,
    submissions: AtomicUsize,
    fail_submit: bool,
}

impl MockOcrClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the poll script for documents submitted with these bytes.
    pub fn with_job(self, bytes: &[u8], polls: Vec<MockPoll>) -> Self {
        self.scripts.lock().unwrap().push((bytes.to_vec(), polls));
        self
    }

    /// Make every `submit` call fail.
    pub fn failing_submit(mut self) -> Self {
        self.fail_submit = true;
        self
    }

    /// Total documents submitted so far.
    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcrClient for MockOcrClient {
    async fn submit(&self, bytes: &[u8]) -> Result<JobHandle, ClientError> {
        if self.fail_submit {
            return Err(ClientError::Status {
                status: 503,
                body: "service unavailable".into(),
            });
        }
        let n = self.submissions.fetch_add(1, Ordering::SeqCst);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .iter()
            .find(|(key, _)| key.as_slice() == bytes)
            .map(|(_, polls)| polls.clone())
            .unwrap_or_default();
        self.jobs.lock().unwrap().insert(n, script);
        Ok(JobHandle(format!("mock-job-{n}")))
    }

    async fn poll(&self, handle: &JobHandle) -> Result<PollResponse, ClientError> {
        let job: usize = handle
            .0
            .strip_prefix("mock-job-")
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| ClientError::MalformedResponse("unknown mock handle".into()))?;

        let mut jobs = self.jobs.lock().unwrap();
        let queue = jobs
            .get_mut(&job)
            .ok_or_else(|| ClientError::MalformedResponse("poll before submit".into()))?;
        let outcome = if queue.is_empty() {
            None
        } else {
            Some(queue.remove(0))
        };

        Ok(match outcome {
            Some(MockPoll::Succeed(payload)) => PollResponse {
                status: JobStatus::Succeeded,
                result: Some(payload),
                error: None,
            },
            Some(MockPoll::Fail(message)) => PollResponse {
                status: JobStatus::Failed,
                result: None,
                error: Some(message),
            },
            Some(MockPoll::Pending) | None => PollResponse {
                status: JobStatus::Pending,
                result: None,
                error: None,
            },
        })
    }
}
