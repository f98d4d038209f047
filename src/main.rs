//! # News Sentiment
//!
//! Searches recent news on a topic, asks a generative model to classify each
//! article's market sentiment, and returns the results as structured JSON.
//!
//! ## Usage
//!
//! ```sh
//! BRAVE_API_KEY=... GEMINI_API_KEY=... news_sentiment --topic Finance --num-articles 5
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Discovery**: Find article stubs for the topic (Brave news search)
//! 2. **Fetching**: Download each article body, falling back to its title
//! 3. **Prompting**: Render the sentiment instruction for the article
//! 4. **Completion**: Ask the model (Gemini, or any OpenAI-compatible endpoint)
//! 5. **Extraction**: Recover sentiment, confidence, summary and insights from the reply
//! 6. **Output**: Print `{"results": [...]}` and optionally write JSON/Markdown files
//!
//! Steps 2–5 run concurrently per article; results keep discovery order.

use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod error;
mod extract;
mod models;
mod outputs;
mod pipeline;
mod prompts;
mod schema;
mod scrapers;
mod utils;

use api::{GeminiClient, JadeClient, ModelBackend, RetryAsk};
use cli::Cli;
use config::{BackendKind, Settings};
use error::SentimentError;
use models::{AnalysisBatch, AnalysisRequest};
use outputs::{json, markdown};
use pipeline::Pipeline;
use scrapers::{article::ArticleFetcher, brave::BraveSearch};
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env first so RUST_LOG and API keys from it are visible below.
    let dotenv_path = dotenvy::dotenv().ok();

    // --- Tracing init ---
    // stdout is reserved for the response document.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    if let Some(path) = dotenv_path {
        debug!(path = %path.display(), "Loaded .env");
    }

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    info!(schema_version = schema::SCHEMA_VERSION, "news_sentiment starting up");
    debug!(topic = %args.topic, num_articles = args.num_articles, "Parsed CLI arguments");

    match run(args).await {
        Ok(response) => {
            println!("{response}");
            let elapsed = start_time.elapsed();
            info!(?elapsed, "Execution complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, kind = ?e.kind(), "Error processing request");
            println!("{}", json::render_error(&e));
            e.exit_code()
        }
    }
}

/// Run one request and return the response document for stdout.
///
/// Report files are a side channel: failing to write one is logged but never
/// turns a completed batch into an error.
#[instrument(level = "info", skip_all)]
async fn run(args: Cli) -> Result<String, SentimentError> {
    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    settings.apply_cli(&args);
    debug!(?settings, "Effective settings");

    let request = AnalysisRequest::new(args.topic.clone(), args.num_articles);
    request.validate()?;

    for dir in [&args.json_output_dir, &args.markdown_output_dir].into_iter().flatten() {
        ensure_writable_dir(dir).await.map_err(|e| {
            SentimentError::Output(format!("{dir} is not writable: {e}"))
        })?;
    }

    let brave_key = args
        .brave_api_key
        .clone()
        .ok_or_else(|| SentimentError::Config("missing BRAVE_API_KEY".to_string()))?;
    let mut discovery = BraveSearch::new(brave_key, settings.search_timeout())
        .map_err(|e| SentimentError::Config(e.to_string()))?;
    if let Some(base_url) = &settings.brave_base_url {
        discovery = discovery.with_base_url(base_url.clone());
    }
    let resolver = ArticleFetcher::new(settings.fetch_timeout())
        .map_err(|e| SentimentError::Config(e.to_string()))?;

    let backend = match settings.backend {
        BackendKind::Gemini => {
            let key = args
                .gemini_api_key
                .clone()
                .ok_or_else(|| SentimentError::Config("missing GEMINI_API_KEY".to_string()))?;
            let mut client =
                GeminiClient::new(key, settings.model.clone(), settings.model_timeout())
                    .map_err(|e| SentimentError::Config(e.to_string()))?;
            if let Some(base_url) = &settings.gemini_base_url {
                client = client.with_base_url(base_url.clone());
            }
            info!(model = %client.model(), "Using Gemini backend");
            ModelBackend::Gemini(client)
        }
        BackendKind::Jade => {
            let client = JadeClient::load(
                &settings.jade_template,
                settings.jade_config.as_deref(),
                settings.model_timeout(),
            )
            .await
            .map_err(|e| SentimentError::Config(e.to_string()))?;
            info!(template = %settings.jade_template, "Using awful_aj backend");
            ModelBackend::Jade(client)
        }
    };
    let model = RetryAsk::new(backend, settings.max_retries, settings.retry_base_delay());

    let pipeline = Pipeline::new(settings.pipeline_config(), discovery, resolver, model);
    let batch = pipeline.run(&request).await?;

    let response = json::render_response(&batch.results)
        .map_err(|e| SentimentError::Output(e.to_string()))?;

    write_reports(&batch, &args).await;

    let summary = batch.summary();
    info!(
        total = summary.total,
        bullish = summary.bullish,
        bearish = summary.bearish,
        unknown = summary.unknown,
        "Batch summary"
    );
    Ok(response)
}

async fn write_reports(batch: &AnalysisBatch, args: &Cli) {
    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = json::write_batch(batch, dir).await {
            warn!(dir = %dir, error = %e, "Failed to write JSON batch file");
        }
    }
    if let Some(dir) = &args.markdown_output_dir {
        if let Err(e) = markdown::write_report(batch, dir).await {
            warn!(dir = %dir, error = %e, "Failed to write Markdown report");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{
        Method::{GET, POST},
        MockServer,
    };
    use serde_json::json;

    const MODEL_REPLY: &str = r#"```json
{"summary": "Stocks rallied.", "sentiment": "Bullish", "confidence": 8, "insights": ["Rate cut hopes"]}
```"#;

    fn mock_upstreams(server: &MockServer) {
        let article_url = server.url("/markets/rally");
        server.mock(|when, then| {
            when.method(GET)
                .path("/res/v1/news/search")
                .header("X-Subscription-Token", "brave-key");
            then.status(200).json_body(json!({
                "results": [{
                    "title": "Stocks rally",
                    "description": "Markets climbed.",
                    "url": article_url,
                }]
            }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/markets/rally");
            then.status(200)
                .header("content-type", "text/html")
                .body("<html><body><article><p>The S&P 500 rose 1.2%.</p></article></body></html>");
        });
        server.mock(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-2.0-flash:generateContent")
                .header("x-goog-api-key", "gemini-key");
            then.status(200).json_body(json!({
                "candidates": [{"content": {"parts": [{"text": MODEL_REPLY}]}}]
            }));
        });
    }

    fn cli(config: &std::path::Path, json_dir: &std::path::Path, markdown_dir: &std::path::Path) -> Cli {
        Cli::parse_from([
            "news_sentiment",
            "--topic",
            "Stocks",
            "--num-articles",
            "1",
            "--config",
            config.to_str().unwrap(),
            "--brave-api-key",
            "brave-key",
            "--gemini-api-key",
            "gemini-key",
            "--json-output-dir",
            json_dir.to_str().unwrap(),
            "--markdown-output-dir",
            markdown_dir.to_str().unwrap(),
        ])
    }

    #[tokio::test]
    async fn test_failed_batch_file_still_yields_single_response() {
        let server = MockServer::start();
        mock_upstreams(&server);

        let root = std::env::temp_dir().join(format!("news_sentiment_run_{}", std::process::id()));
        let json_dir = root.join("json");
        let markdown_dir = root.join("markdown");
        std::fs::create_dir_all(&json_dir).unwrap();

        // A regular file where the dated batch directory would go.
        let today = chrono::Local::now().date_naive().to_string();
        std::fs::write(json_dir.join(&today), "occupied").unwrap();

        let config = root.join("settings.yaml");
        std::fs::write(
            &config,
            format!(
                "brave_base_url: {base}\ngemini_base_url: {base}\nmax_retries: 0\n",
                base = server.base_url()
            ),
        )
        .unwrap();

        let response = run(cli(&config, &json_dir, &markdown_dir)).await.unwrap();

        let value: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert!(value.get("error").is_none());
        let results = value["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["title"], "Stocks rally");
        assert_eq!(results[0]["sentiment"], "Bullish");
        assert_eq!(results[0]["confidence"], 8);

        assert!(json_dir.join(&today).is_file());
        let reports = std::fs::read_dir(&markdown_dir).unwrap().count();
        assert_eq!(reports, 1);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn test_unwritable_output_dir_is_invalid_request() {
        let root = std::env::temp_dir().join(format!("news_sentiment_blocked_{}", std::process::id()));
        std::fs::create_dir_all(&root).unwrap();
        let blocker = root.join("not_a_dir");
        std::fs::write(&blocker, "file").unwrap();

        let config = root.join("settings.yaml");
        std::fs::write(&config, "max_retries: 0\n").unwrap();

        let err = run(cli(&config, &blocker, &root.join("markdown")))
            .await
            .unwrap_err();
        assert!(matches!(err, SentimentError::Output(_)));
        assert_eq!(err.kind(), error::ErrorKind::InvalidRequest);

        let _ = std::fs::remove_dir_all(&root);
    }
}
