//! OCR job orchestrator — drives one document to a terminal outcome.
//!
//! The polling control flow is split into a pure transition function
//! (`step`) over an explicit job state, and an async driver that owns the
//! only suspension point. Tests exercise the state machine by injecting
//! synthetic poll sequences; no timers involved.
//!
//! State machine: `Polling -> {Succeeded, Failed, TimedOut}`. Terminal
//! states absorb — no transition leaves them. Submission failures never
//! enter the machine; they map straight to a service error.

use tokio_util::sync::CancellationToken;

use crate::clients::{JobStatus, OcrClient, OcrPayload, PollResponse};
use crate::config::PipelineConfig;

use super::normalize::normalize;
use super::types::{Document, NormalizedDocument};
use super::OcrJobError;

/// State of one OCR job between polls.
#[derive(Debug)]
pub enum JobState {
    /// Waiting on the service; `attempts` polls consumed so far.
    Polling { attempts: u32 },
    Succeeded(OcrPayload),
    Failed(String),
    TimedOut { attempts: u32 },
}

/// What one poll of the service amounted to.
#[derive(Debug)]
pub enum PollOutcome {
    Pending,
    Succeeded(OcrPayload),
    Failed(String),
}

/// Advance the job state by one observed poll.
///
/// A pending poll that exhausts the attempt budget lands in `TimedOut`,
/// which is terminal and distinct from `Failed`.
pub fn step(state: JobState, outcome: PollOutcome, max_attempts: u32) -> JobState {
    match state {
        JobState::Polling { attempts } => {
            let attempts = attempts + 1;
            match outcome {
                PollOutcome::Succeeded(payload) => JobState::Succeeded(payload),
                PollOutcome::Failed(reason) => JobState::Failed(reason),
                PollOutcome::Pending if attempts >= max_attempts => {
                    JobState::TimedOut { attempts }
                }
                PollOutcome::Pending => JobState::Polling { attempts },
            }
        }
        terminal => terminal,
    }
}

/// Classify a service poll response into a transition input.
fn classify_poll(response: PollResponse) -> PollOutcome {
    match response.status {
        JobStatus::Succeeded => match response.result {
            Some(payload) => PollOutcome::Succeeded(payload),
            None => PollOutcome::Failed("Service reported success without a result".to_string()),
        },
        JobStatus::Failed => PollOutcome::Failed(
            response
                .error
                .unwrap_or_else(|| "Unknown error".to_string()),
        ),
        JobStatus::Pending => PollOutcome::Pending,
    }
}

/// Drive one document through the OCR service to a normalized result.
///
/// Sleeps `config.poll_interval` before every poll; the cancellation token
/// is observed at each of those boundaries, so an aborted batch never
/// leaves a poll loop running in the background.
pub async fn run_ocr_job(
    client: &dyn OcrClient,
    source_index: usize,
    document: &Document,
    config: &PipelineConfig,
    cancel: &CancellationToken,
) -> Result<NormalizedDocument, OcrJobError> {
    let handle = client
        .submit(&document.bytes)
        .await
        .map_err(|e| OcrJobError::Service(e.to_string()))?;

    tracing::debug!(document = %document.name, "OCR job submitted");

    let mut state = JobState::Polling { attempts: 0 };
    let payload = loop {
        tokio::select! {
            _ = cancel.cancelled() => return Err(OcrJobError::Cancelled),
            _ = tokio::time::sleep(config.poll_interval) => {}
        }

        let outcome = match client.poll(&handle).await {
            Ok(response) => classify_poll(response),
            Err(e) => PollOutcome::Failed(e.to_string()),
        };

        match step(state, outcome, config.max_poll_attempts) {
            JobState::Polling { attempts } => {
                state = JobState::Polling { attempts };
            }
            JobState::Succeeded(payload) => break payload,
            JobState::Failed(reason) => {
                tracing::warn!(document = %document.name, error = %reason, "OCR job failed");
                return Err(OcrJobError::Service(reason));
            }
            JobState::TimedOut { attempts } => {
                tracing::warn!(document = %document.name, attempts, "OCR job timed out");
                return Err(OcrJobError::Timeout { attempts });
            }
        }
    };

    tracing::debug!(
        document = %document.name,
        text_len = payload.text.len(),
        tables = payload.tables.len(),
        "OCR job succeeded"
    );

    Ok(normalize(source_index, &document.name, &payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{MockOcrClient, MockPoll};

    fn payload(text: &str) -> OcrPayload {
        OcrPayload {
            text: text.into(),
            ..Default::default()
        }
    }

    fn drive(sequence: Vec<PollOutcome>, max_attempts: u32) -> (JobState, u32) {
        let mut state = JobState::Polling { attempts: 0 };
        let mut polls = 0;
        for outcome in sequence {
            polls += 1;
            state = step(state, outcome, max_attempts);
            if !matches!(state, JobState::Polling { .. }) {
                break;
            }
        }
        (state, polls)
    }

    #[test]
    fn pending_pending_succeeded_terminates_after_three_polls() {
        let (state, polls) = drive(
            vec![
                PollOutcome::Pending,
                PollOutcome::Pending,
                PollOutcome::Succeeded(payload("done")),
            ],
            30,
        );
        assert_eq!(polls, 3);
        assert!(matches!(state, JobState::Succeeded(_)));
    }

    #[test]
    fn all_pending_times_out_at_exactly_the_budget() {
        let budget = 5;
        let sequence: Vec<PollOutcome> = (0..10).map(|_| PollOutcome::Pending).collect();
        let (state, polls) = drive(sequence, budget);
        assert_eq!(polls, budget);
        assert!(matches!(state, JobState::TimedOut { attempts } if attempts == budget));
    }

    #[test]
    fn failure_is_terminal_and_distinct_from_timeout() {
        let (state, polls) = drive(
            vec![PollOutcome::Pending, PollOutcome::Failed("corrupt scan".into())],
            30,
        );
        assert_eq!(polls, 2);
        assert!(matches!(state, JobState::Failed(reason) if reason == "corrupt scan"));
    }

    #[test]
    fn terminal_states_absorb_further_polls() {
        let state = JobState::Failed("already failed".into());
        let next = step(state, PollOutcome::Succeeded(payload("late")), 30);
        assert!(matches!(next, JobState::Failed(_)));
    }

    #[test]
    fn success_without_payload_classifies_as_failure() {
        let outcome = classify_poll(PollResponse {
            status: JobStatus::Succeeded,
            result: None,
            error: None,
        });
        assert!(matches!(outcome, PollOutcome::Failed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn driver_returns_normalized_document_on_success() {
        let client = MockOcrClient::new().with_job(
            b"bytes",
            vec![
                MockPoll::Pending,
                MockPoll::Pending,
                MockPoll::Succeed(payload("SOF text")),
            ],
        );
        let config = PipelineConfig::default();
        let document = Document::new("sof.pdf", b"bytes".to_vec());
        let cancel = CancellationToken::new();

        let result = run_ocr_job(&client, 0, &document, &config, &cancel)
            .await
            .unwrap();
        assert_eq!(result.source_index, 0);
        assert_eq!(result.name, "sof.pdf");
        assert_eq!(result.enriched_text, "SOF text");
    }

    #[tokio::test(start_paused = true)]
    async fn driver_times_out_when_service_never_finishes() {
        // No script registered: the mock reports pending forever.
        let client = MockOcrClient::new();
        let config = PipelineConfig::default();
        let document = Document::new("stuck.pdf", vec![]);
        let cancel = CancellationToken::new();

        let err = run_ocr_job(&client, 0, &document, &config, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, OcrJobError::Timeout { attempts: 30 }));
    }

    #[tokio::test(start_paused = true)]
    async fn driver_surfaces_submit_failure_as_service_error() {
        let client = MockOcrClient::new().failing_submit();
        let config = PipelineConfig::default();
        let document = Document::new("rejected.pdf", vec![]);
        let cancel = CancellationToken::new();

        let err = run_ocr_job(&client, 0, &document, &config, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, OcrJobError::Service(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn driver_observes_cancellation_at_poll_boundary() {
        let client = MockOcrClient::new();
        let config = PipelineConfig::default();
        let document = Document::new("cancelled.pdf", vec![]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = run_ocr_job(&client, 0, &document, &config, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, OcrJobError::Cancelled));
    }
}
