//! JSON output for API consumers.
//!
//! Stdout carries exactly one JSON document per run: either the response
//! `{"results": [...]}` or an error `{"error": {"kind": ..., "message": ...}}`.
//! A full batch (with run date, time, and summary) can additionally be written
//! to a date-based directory.

use crate::error::{ErrorKind, SentimentError};
use crate::models::{AnalysisBatch, BatchSummary, SentimentResult};
use crate::schema::SCHEMA_VERSION;
use crate::utils::slugify_title;
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

#[derive(Serialize)]
struct AnalysisResponse<'a> {
    results: &'a [SentimentResult],
}

#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: ErrorBody<'a>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    kind: ErrorKind,
    message: &'a str,
}

#[derive(Serialize)]
struct BatchFile<'a> {
    schema_version: u32,
    #[serde(flatten)]
    batch: &'a AnalysisBatch,
    summary: BatchSummary,
}

/// Serialize the response for the "analyze topic" operation.
pub fn render_response(results: &[SentimentResult]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&AnalysisResponse { results })
}

/// Serialize a request failure.
pub fn render_error(err: &SentimentError) -> String {
    let message = err.to_string();
    let body = ErrorResponse {
        error: ErrorBody {
            kind: err.kind(),
            message: &message,
        },
    };
    // Both fields are plain strings, so this cannot fail.
    serde_json::to_string_pretty(&body).unwrap_or_default()
}

/// Write a batch, with its summary, to a JSON file under a date directory.
///
/// # Output Path
///
/// `{json_output_dir}/{date}/{topic-slug}_{HHMMSS}.json`
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_batch(
    batch: &AnalysisBatch,
    json_output_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(&BatchFile {
        schema_version: SCHEMA_VERSION,
        batch,
        summary: batch.summary(),
    })?;

    let full_json_dir = PathBuf::from(json_output_dir).join(&batch.local_date);
    info!(full_json_dir = %full_json_dir.display(), "Ensuring JSON directory exists");
    if let Err(e) = fs::create_dir_all(&full_json_dir).await {
        error!(full_json_dir = %full_json_dir.display(), error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let path = full_json_dir.join(format!("{}.json", file_stem(batch)));
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote JSON batch file");
    Ok(path)
}

/// `{topic-slug}_{HHMMSS}`, shared by the JSON and Markdown writers.
pub(crate) fn file_stem(batch: &AnalysisBatch) -> String {
    let slug = slugify_title(&batch.topic);
    let slug = if slug.is_empty() { "topic".to_string() } else { slug };
    format!("{}_{}", slug, batch.local_time.replace(':', ""))
}
