//! Markdown report generation.
//!
//! The report opens with batch-level metrics (article count, bullish and
//! bearish counts, mean gauge position) followed by one section per article
//! in discovery order.

use super::json::file_stem;
use crate::models::{AnalysisBatch, SentimentResult};
use crate::schema::{MAX_CONFIDENCE, SentimentLabel};
use std::error::Error;
use std::fmt::Write;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, instrument};

/// Render a batch as a Markdown document.
pub fn batch_to_markdown(batch: &AnalysisBatch) -> String {
    let summary = batch.summary();
    let mut md = String::new();

    writeln!(md, "# Sentiment for \"{}\"\n", batch.topic).unwrap();
    writeln!(md, "_Analyzed {} at {}_\n", batch.local_date, batch.local_time).unwrap();

    writeln!(md, "| Total Articles | Bullish Articles | Bearish Articles | Mean Gauge |").unwrap();
    writeln!(md, "|---:|---:|---:|---:|").unwrap();
    writeln!(
        md,
        "| {} | {} | {} | {:+.2} |\n",
        summary.total, summary.bullish, summary.bearish, summary.mean_gauge_position
    )
    .unwrap();

    if summary.unknown > 0 {
        writeln!(
            md,
            "> {} article(s) could not be classified.\n",
            summary.unknown
        )
        .unwrap();
    }

    for result in &batch.results {
        write_card(&mut md, result);
    }
    md
}

fn write_card(md: &mut String, result: &SentimentResult) {
    let source = result
        .source_tag()
        .map(|tag| format!(" <small>`{}`</small>", tag))
        .unwrap_or_default();
    writeln!(md, "## {}{}\n", result.title, source).unwrap();

    writeln!(
        md,
        "**{}** {} (Confidence: {}/{}, gauge {:+.1})\n",
        result.sentiment.as_str(),
        label_marker(result.sentiment),
        result.confidence,
        MAX_CONFIDENCE,
        result.gauge_position()
    )
    .unwrap();

    writeln!(md, "### Summary\n").unwrap();
    writeln!(md, "{}\n", result.summary).unwrap();

    if !result.insights.is_empty() {
        writeln!(md, "### Key Insights\n").unwrap();
        for insight in &result.insights {
            writeln!(md, "- {}", insight).unwrap();
        }
        writeln!(md).unwrap();
    }

    if !result.url.is_empty() {
        writeln!(md, "[Read Full Article]({})\n", result.url).unwrap();
    }
    writeln!(md, "---\n").unwrap();
}

fn label_marker(label: SentimentLabel) -> &'static str {
    match label {
        SentimentLabel::VeryBullish => "▲▲",
        SentimentLabel::Bullish => "▲",
        SentimentLabel::Neutral => "●",
        SentimentLabel::Bearish => "▼",
        SentimentLabel::VeryBearish => "▼▼",
        SentimentLabel::Unknown => "?",
    }
}

/// Write the report to `{markdown_output_dir}/{date}_{topic-slug}_{HHMMSS}.md`.
#[instrument(level = "info", skip_all, fields(%markdown_output_dir))]
pub async fn write_report(
    batch: &AnalysisBatch,
    markdown_output_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    fs::create_dir_all(markdown_output_dir).await?;
    let path = PathBuf::from(markdown_output_dir)
        .join(format!("{}_{}.md", batch.local_date, file_stem(batch)));
    fs::write(&path, batch_to_markdown(batch)).await?;
    info!(path = %path.display(), "Wrote Markdown report");
    Ok(path)
}
