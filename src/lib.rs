//! Statement-of-Facts event extraction and laytime reconciliation.
//!
//! Scanned operational logs go in; a deduplicated, chronologically ranked
//! event timeline with overlap-aware duration totals comes out. OCR and
//! text generation are external services reached through injected clients;
//! everything else is deterministic and testable offline.

pub mod clients;
pub mod config;
pub mod pipeline;

pub use clients::{
    CompletionClient, DocumentAnalysisClient, GenerativeTextClient, OcrClient,
};
pub use config::PipelineConfig;
pub use pipeline::{
    status_at, Document, ExtractionOutput, OperationStatus, PipelineError, SofPipeline,
    TimelineStatus,
};
