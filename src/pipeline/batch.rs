//! Batch coordinator — fan-out OCR over all documents, fan-in one corpus.
//!
//! One tokio task per document, capped by a semaphore so oversized batches
//! don't flood the OCR service. Results land in an index-addressed slot
//! vector (written once per index, read only after all tasks finish), so
//! corpus segments always follow input order no matter which job completes
//! first.
//!
//! The default policy is fail-fast: the first failed or timed-out document
//! cancels the remaining jobs and aborts the batch. With
//! `allow_partial_batch` set, failed documents are skipped and recorded
//! instead; only a batch with zero survivors still errors.

use std::fmt::Write as _;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::clients::OcrClient;
use crate::config::PipelineConfig;

use super::ocr_job::run_ocr_job;
use super::types::{Document, NormalizedDocument, SkippedDocument};
use super::{BatchError, OcrJobError};

/// Result of a successful batch: the merged corpus plus any documents
/// skipped under the partial-batch policy.
#[derive(Debug)]
pub struct BatchOutput {
    pub corpus: String,
    pub skipped: Vec<SkippedDocument>,
}

/// Run OCR over every document concurrently and merge the results into a
/// single corpus with per-document boundary markers.
pub async fn run_batch(
    client: Arc<dyn OcrClient>,
    documents: Vec<Document>,
    config: &PipelineConfig,
    cancel: &CancellationToken,
) -> Result<BatchOutput, BatchError> {
    if documents.is_empty() {
        return Err(BatchError::NoDocuments);
    }

    let total = documents.len();
    tracing::info!(documents = total, "Starting OCR batch");

    let semaphore = Arc::new(Semaphore::new(config.max_concurrent_ocr_jobs));
    // Child token: a batch-level abort cancels the sibling jobs without
    // touching the caller's token.
    let job_cancel = cancel.child_token();

    let mut tasks = JoinSet::new();
    for (index, document) in documents.into_iter().enumerate() {
        let client = Arc::clone(&client);
        let config = config.clone();
        let cancel = job_cancel.clone();
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("OCR job semaphore closed");
            let name = document.name.clone();
            let result = run_ocr_job(client.as_ref(), index, &document, &config, &cancel).await;
            (index, name, result)
        });
    }

    let mut slots: Vec<Option<NormalizedDocument>> = (0..total).map(|_| None).collect();
    let mut skipped = Vec::new();

    while let Some(joined) = tasks.join_next().await {
        let (index, name, result) = match joined {
            Ok(task_output) => task_output,
            Err(e) if e.is_cancelled() => continue,
            Err(e) => {
                job_cancel.cancel();
                return Err(BatchError::Aborted {
                    document_name: "<unknown>".into(),
                    index: 0,
                    source: OcrJobError::Service(format!("OCR worker task failed: {e}")),
                });
            }
        };

        match result {
            Ok(normalized) => {
                tracing::debug!(document = %name, index, "Document normalized");
                slots[index] = Some(normalized);
            }
            Err(OcrJobError::Cancelled) => {
                return Err(BatchError::Cancelled);
            }
            Err(source) if config.allow_partial_batch => {
                tracing::warn!(document = %name, index, error = %source, "Skipping failed document");
                skipped.push(SkippedDocument {
                    index,
                    name,
                    reason: source.to_string(),
                });
            }
            Err(source) => {
                tracing::error!(document = %name, index, error = %source, "Aborting batch");
                job_cancel.cancel();
                return Err(BatchError::Aborted {
                    document_name: name,
                    index,
                    source,
                });
            }
        }
    }

    let survivors = slots.iter().filter(|s| s.is_some()).count();
    if survivors == 0 {
        return Err(BatchError::AllDocumentsFailed { count: total });
    }

    tracing::info!(survivors, skipped = skipped.len(), "OCR batch complete");

    Ok(BatchOutput {
        corpus: assemble_corpus(&slots),
        skipped,
    })
}

/// Concatenate normalized documents in input order, each under a boundary
/// marker carrying its 1-based ordinal and source name.
fn assemble_corpus(slots: &[Option<NormalizedDocument>]) -> String {
    let mut corpus = String::new();
    for normalized in slots.iter().flatten() {
        let _ = writeln!(
            corpus,
            "=== DOCUMENT {}: {} ===",
            normalized.source_index + 1,
            normalized.name
        );
        corpus.push_str(&normalized.enriched_text);
        corpus.push_str("\n\n");
    }
    corpus
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{MockOcrClient, MockPoll, OcrPayload};

    fn payload(text: &str) -> OcrPayload {
        OcrPayload {
            text: text.into(),
            ..Default::default()
        }
    }

    fn succeed_after(pending_polls: usize, text: &str) -> Vec<MockPoll> {
        let mut polls = vec![MockPoll::Pending; pending_polls];
        polls.push(MockPoll::Succeed(payload(text)));
        polls
    }

    #[tokio::test(start_paused = true)]
    async fn corpus_follows_input_order_despite_staggered_completion() {
        // The first document takes 6 polls, the second finishes on its
        // first poll — completion order is inverted.
        let client = Arc::new(
            MockOcrClient::new()
                .with_job(b"slow", succeed_after(5, "slow document text"))
                .with_job(b"fast", succeed_after(0, "fast document text")),
        );
        let documents = vec![
            Document::new("slow.pdf", b"slow".to_vec()),
            Document::new("fast.pdf", b"fast".to_vec()),
        ];

        let output = run_batch(
            client,
            documents,
            &PipelineConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let first = output.corpus.find("=== DOCUMENT 1: slow.pdf ===").unwrap();
        let second = output.corpus.find("=== DOCUMENT 2: fast.pdf ===").unwrap();
        assert!(first < second);
        assert!(output.corpus.contains("slow document text"));
        assert!(output.corpus.contains("fast document text"));
        assert!(output.skipped.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn fail_fast_aborts_on_first_failed_document() {
        let client = Arc::new(
            MockOcrClient::new()
                .with_job(b"ok", succeed_after(10, "fine"))
                .with_job(b"bad", vec![MockPoll::Fail("unreadable scan".into())]),
        );
        let documents = vec![
            Document::new("ok.pdf", b"ok".to_vec()),
            Document::new("bad.pdf", b"bad".to_vec()),
        ];

        let err = run_batch(
            client,
            documents,
            &PipelineConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        match err {
            BatchError::Aborted {
                document_name,
                index,
                source,
            } => {
                assert_eq!(document_name, "bad.pdf");
                assert_eq!(index, 1);
                assert!(matches!(source, OcrJobError::Service(_)));
            }
            other => panic!("Expected Aborted, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn partial_batch_skips_failures_and_keeps_survivors() {
        let client = Arc::new(
            MockOcrClient::new()
                .with_job(b"ok", succeed_after(0, "survivor text"))
                .with_job(b"bad", vec![MockPoll::Fail("unreadable scan".into())]),
        );
        let documents = vec![
            Document::new("ok.pdf", b"ok".to_vec()),
            Document::new("bad.pdf", b"bad".to_vec()),
        ];
        let config = PipelineConfig {
            allow_partial_batch: true,
            ..Default::default()
        };

        let output = run_batch(client, documents, &config, &CancellationToken::new())
            .await
            .unwrap();

        assert!(output.corpus.contains("survivor text"));
        assert!(!output.corpus.contains("bad.pdf"));
        assert_eq!(output.skipped.len(), 1);
        assert_eq!(output.skipped[0].name, "bad.pdf");
        assert_eq!(output.skipped[0].index, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn partial_batch_with_no_survivors_errors() {
        let client = Arc::new(
            MockOcrClient::new()
                .with_job(b"a", vec![MockPoll::Fail("bad".into())])
                .with_job(b"b", vec![MockPoll::Fail("worse".into())]),
        );
        let documents = vec![
            Document::new("a.pdf", b"a".to_vec()),
            Document::new("b.pdf", b"b".to_vec()),
        ];
        let config = PipelineConfig {
            allow_partial_batch: true,
            ..Default::default()
        };

        let err = run_batch(client, documents, &config, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::AllDocumentsFailed { count: 2 }));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_batch_is_rejected() {
        let client = Arc::new(MockOcrClient::new());
        let err = run_batch(
            client,
            vec![],
            &PipelineConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BatchError::NoDocuments));
    }

    #[tokio::test(start_paused = true)]
    async fn caller_cancellation_aborts_the_batch() {
        let client = Arc::new(MockOcrClient::new());
        let documents = vec![Document::new("stuck.pdf", b"stuck".to_vec())];
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = run_batch(client, documents, &PipelineConfig::default(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_surfaces_as_aborted_batch() {
        // One document that never completes: the per-job attempt budget
        // expires and fail-fast turns it into a batch abort.
        let client = Arc::new(MockOcrClient::new());
        let documents = vec![Document::new("stuck.pdf", b"stuck".to_vec())];

        let err = run_batch(
            client,
            documents,
            &PipelineConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        match err {
            BatchError::Aborted { source, .. } => {
                assert!(matches!(source, OcrJobError::Timeout { attempts: 30 }));
            }
            other => panic!("Expected Aborted, got {other:?}"),
        }
    }
}
