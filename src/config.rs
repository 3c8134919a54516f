//! Pipeline configuration.
//!
//! All tuning knobs for a pipeline run in one place, passed explicitly into
//! `SofPipeline` — there is no process-wide state. Defaults: 1 s polls,
//! 30-attempt budget, fail-fast batches.

use std::time::Duration;

/// Tuning knobs for one extraction pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Delay between OCR job status polls.
    pub poll_interval: Duration,
    /// Maximum status polls per OCR job before the job is declared timed out.
    pub max_poll_attempts: u32,
    /// Ceiling on concurrently in-flight OCR jobs. Batches larger than this
    /// queue behind a semaphore.
    pub max_concurrent_ocr_jobs: usize,
    /// When true, a document whose OCR fails is skipped (and recorded in
    /// diagnostics) instead of aborting the whole batch. A batch where every
    /// document fails still errors.
    pub allow_partial_batch: bool,
    /// Two events in the same category whose intervals overlap by more than
    /// this fraction of the shorter interval are treated as near-duplicates.
    pub near_duplicate_overlap: f64,
    /// Assumed duration for an event with a start but no end, used only by
    /// the timeline status resolver. Never feeds into duration totals.
    pub fallback_event_duration: chrono::Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_poll_attempts: 30,
            max_concurrent_ocr_jobs: 4,
            allow_partial_batch: false,
            near_duplicate_overlap: 0.5,
            fallback_event_duration: chrono::Duration::hours(1),
        }
    }
}

/// Default `RUST_LOG`-style filter for the CLI binary.
pub fn default_log_filter() -> String {
    "info,laytime=debug".to_string()
}
