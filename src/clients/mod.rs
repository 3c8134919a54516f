//! External service clients: async-job OCR and one-shot text completion.
//!
//! Both services are reached through traits so the pipeline can run against
//! scripted mocks in tests. Real implementations use `reqwest` and classify
//! transport failures into `ClientError` variants.

pub mod completion;
pub mod ocr;
pub mod types;

pub use completion::{CompletionClient, GenerativeTextClient, MockCompletionClient};
pub use ocr::{DocumentAnalysisClient, MockOcrClient, MockPoll, OcrClient};
pub use types::{JobHandle, JobStatus, OcrCell, OcrParagraph, OcrPayload, OcrTable, PollResponse};

use thiserror::Error;

/// Transport-level failure talking to an external service.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Service is not reachable at {0}")]
    Connection(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Service returned error (status {status}): {body}")]
    Status { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Malformed service response: {0}")]
    MalformedResponse(String),
}
