//! `SofPipeline` — the pipeline's public entry point.
//!
//! Wires the stages together: OCR batch → corpus → one completion call →
//! defensive parse → reconciliation. Service clients and configuration are
//! injected explicitly; nothing in the pipeline reaches for global state.
//!
//! Failure policy in one line: transport and OCR failures are fatal for
//! the run, extraction-quality failures degrade the output and show up in
//! diagnostics.

use std::sync::Arc;

use chrono::NaiveDateTime;
use tokio_util::sync::CancellationToken;

use crate::clients::{CompletionClient, OcrClient};
use crate::config::PipelineConfig;

use super::batch::run_batch;
use super::parser::{parse_extraction_response, recovered_summary, ParseOutcome};
use super::prompt::build_extraction_prompt;
use super::reconcile::reconcile;
use super::timeline::{self, TimelineStatus};
use super::types::{Diagnostics, Document, ExtractionOutput, ReconciledEvent};
use super::PipelineError;

/// Statement-of-Facts extraction pipeline.
pub struct SofPipeline {
    ocr: Arc<dyn OcrClient>,
    completion: Arc<dyn CompletionClient>,
    config: PipelineConfig,
}

impl SofPipeline {
    pub fn new(
        ocr: Arc<dyn OcrClient>,
        completion: Arc<dyn CompletionClient>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            ocr,
            completion,
            config,
        }
    }

    /// Run the full pipeline over a batch of documents.
    ///
    /// The completion call is a synchronization barrier: it starts only
    /// after every document has reached a terminal OCR state.
    pub async fn extract(
        &self,
        documents: Vec<Document>,
        cancel: &CancellationToken,
    ) -> Result<ExtractionOutput, PipelineError> {
        let document_count = documents.len();
        tracing::info!(documents = document_count, "Pipeline run starting");

        let batch = run_batch(Arc::clone(&self.ocr), documents, &self.config, cancel).await?;
        let mut diagnostics = Diagnostics {
            skipped_documents: batch.skipped,
            ..Default::default()
        };

        let prompt = build_extraction_prompt(&batch.corpus);
        tracing::info!(
            corpus_len = batch.corpus.len(),
            prompt_len = prompt.len(),
            "Corpus assembled, requesting extraction"
        );

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            result = self.completion.complete(&prompt) => result?,
        };

        let (events, analysis) = match parse_extraction_response(&response) {
            ParseOutcome::Parsed { events, analysis } => (events, analysis),
            ParseOutcome::Failure { diagnostic } => {
                // Extraction quality problems are not pipeline-fatal: the
                // run degrades to an empty result with diagnostics.
                tracing::warn!(error = %diagnostic, "Unusable extraction response");
                diagnostics.parse_errors += 1;
                diagnostics.parse_error_detail = Some(diagnostic.clone());
                (Vec::new(), recovered_summary(&diagnostic))
            }
        };

        let raw_count = events.len();
        let reconciled = reconcile(events, &self.config);
        diagnostics.duplicates_removed = reconciled.duplicates_removed;
        diagnostics.quarantined_events = reconciled.quarantined;

        tracing::info!(
            raw_events = raw_count,
            events = reconciled.events.len(),
            duplicates = diagnostics.duplicates_removed.len(),
            efficiency = reconciled.totals.overall_efficiency_percent,
            "Pipeline run complete"
        );

        Ok(ExtractionOutput {
            events: reconciled.events,
            category_totals: reconciled.totals,
            analysis,
            diagnostics,
        })
    }

    /// Point-in-time query against a reconciled event set, using this
    /// pipeline's configured fallback duration for endless events.
    pub fn status_at(&self, events: &[ReconciledEvent], at: NaiveDateTime) -> TimelineStatus {
        timeline::status_at(events, at, self.config.fallback_event_duration)
    }
}
