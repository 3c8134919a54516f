//! The extraction-and-reconciliation pipeline.
//!
//! Stages, in data-flow order: per-document OCR orchestration (`ocr_job`)
//! under the batch coordinator (`batch`), corpus → events extraction
//! (`prompt`, `parser`), event reconciliation (`reconcile` over `interval`
//! and `category`), and point-in-time resolution (`timeline`).
//! `runner::SofPipeline` is the front door.

pub mod batch;
pub mod category;
pub mod export;
pub mod interval;
pub mod normalize;
pub mod ocr_job;
pub mod parser;
pub mod prompt;
pub mod reconcile;
pub mod runner;
pub mod timeline;
pub mod types;

pub use batch::{run_batch, BatchOutput};
pub use category::{categorize, EventCategory};
pub use parser::{parse_extraction_response, ParseOutcome};
pub use reconcile::{reconcile, ReconcileResult};
pub use runner::SofPipeline;
pub use timeline::{status_at, OperationStatus, TimelineStatus};
pub use types::*;

use thiserror::Error;

use crate::clients::ClientError;

/// Terminal outcome of a single document's OCR orchestration.
#[derive(Error, Debug)]
pub enum OcrJobError {
    /// The service rejected the submission or reported the job failed.
    #[error("OCR service error: {0}")]
    Service(String),

    /// The poll attempt budget ran out with the job still pending.
    #[error("OCR analysis timed out after {attempts} polls")]
    Timeout { attempts: u32 },

    #[error("OCR job cancelled")]
    Cancelled,
}

/// Failure of the multi-document OCR batch.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("No documents to process")]
    NoDocuments,

    /// Fail-fast abort: wraps the first failing document's error.
    #[error("Batch aborted by document '{document_name}' (index {index}): {source}")]
    Aborted {
        document_name: String,
        index: usize,
        source: OcrJobError,
    },

    /// Partial-batch mode with zero surviving documents.
    #[error("All {count} documents failed OCR")]
    AllDocumentsFailed { count: usize },

    #[error("Batch cancelled")]
    Cancelled,
}

/// Fatal failure of a pipeline run. Extraction parse and validation
/// problems never appear here — they degrade the output and are reported
/// through `Diagnostics`.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("OCR batch failed: {0}")]
    Batch(#[from] BatchError),

    #[error("Completion service error: {0}")]
    Completion(#[from] ClientError),

    #[error("Pipeline cancelled")]
    Cancelled,
}
