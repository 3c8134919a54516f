//! Wire types shared by the OCR client implementations.

use serde::{Deserialize, Serialize};

/// Opaque handle for an in-flight OCR analysis job.
///
/// Wraps the operation URL the service hands back on submission; polled
/// until the job reaches a terminal status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle(pub String);

/// Service-reported status of an OCR job.
///
/// Transitional statuses the service may report ("notStarted", "running")
/// all classify as `Pending` — the orchestrator only branches on the two
/// terminal outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Succeeded,
    Failed,
}

/// One poll of an OCR job.
#[derive(Debug, Clone)]
pub struct PollResponse {
    pub status: JobStatus,
    /// Present when `status == Succeeded`.
    pub result: Option<OcrPayload>,
    /// Present when `status == Failed`.
    pub error: Option<String>,
}

/// Terminal OCR output for one document: raw text plus the layout
/// structures the service recognized.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrPayload {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tables: Vec<OcrTable>,
    #[serde(default)]
    pub paragraphs: Vec<OcrParagraph>,
}

/// A recognized table. The cell list may be sparse; absent cells read as
/// empty strings when the grid is reconstructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrTable {
    pub row_count: usize,
    pub column_count: usize,
    #[serde(default)]
    pub cells: Vec<OcrCell>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrCell {
    pub row_index: usize,
    pub column_index: usize,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrParagraph {
    #[serde(default)]
    pub content: String,
}
