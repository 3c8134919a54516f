//! CLI driver: run the extraction pipeline over document files and print
//! the result as JSON.
//!
//! Usage: `laytime <file> [<file> ...]`
//!
//! Service endpoints come from the environment:
//! - `SOF_OCR_ENDPOINT` / `SOF_OCR_KEY` — document analysis service
//! - `SOF_COMPLETION_ENDPOINT` / `SOF_COMPLETION_KEY` — text generation
//!   service (key optional)

use std::process::ExitCode;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use laytime::clients::{DocumentAnalysisClient, GenerativeTextClient};
use laytime::config::{default_log_filter, PipelineConfig};
use laytime::pipeline::{export, Document, SofPipeline};

const COMPLETION_TIMEOUT_SECS: u64 = 300;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        eprintln!("Usage: laytime <file> [<file> ...]");
        return ExitCode::FAILURE;
    }

    let (ocr_endpoint, ocr_key, completion_endpoint, completion_key) = match read_env() {
        Ok(env) => env,
        Err(missing) => {
            eprintln!("Missing required environment variable: {missing}");
            return ExitCode::FAILURE;
        }
    };

    let mut documents = Vec::with_capacity(paths.len());
    for path in &paths {
        match std::fs::read(path) {
            Ok(bytes) => documents.push(Document::new(path.clone(), bytes)),
            Err(e) => {
                eprintln!("Cannot read {path}: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    let pipeline = SofPipeline::new(
        Arc::new(DocumentAnalysisClient::new(&ocr_endpoint, &ocr_key)),
        Arc::new(GenerativeTextClient::new(
            &completion_endpoint,
            completion_key.as_deref(),
            COMPLETION_TIMEOUT_SECS,
        )),
        PipelineConfig::default(),
    );

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, cancelling run");
            ctrl_c_cancel.cancel();
        }
    });

    match pipeline.extract(documents, &cancel).await {
        Ok(output) => match export::to_json(&output) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize output");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            tracing::error!(error = %e, "Pipeline run failed");
            ExitCode::FAILURE
        }
    }
}

fn read_env() -> Result<(String, String, String, Option<String>), &'static str> {
    let ocr_endpoint = std::env::var("SOF_OCR_ENDPOINT").map_err(|_| "SOF_OCR_ENDPOINT")?;
    let ocr_key = std::env::var("SOF_OCR_KEY").map_err(|_| "SOF_OCR_KEY")?;
    let completion_endpoint =
        std::env::var("SOF_COMPLETION_ENDPOINT").map_err(|_| "SOF_COMPLETION_ENDPOINT")?;
    let completion_key = std::env::var("SOF_COMPLETION_KEY").ok();
    Ok((ocr_endpoint, ocr_key, completion_endpoint, completion_key))
}
