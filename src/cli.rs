//! Command-line interface definitions for News Sentiment.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! API keys can be provided via flags, environment variables, or a `.env` file.

use crate::config::BackendKind;
use crate::models::{DEFAULT_NUM_ARTICLES, DEFAULT_TOPIC};
use clap::Parser;

/// Command-line arguments for the News Sentiment application.
///
/// # Examples
///
/// ```sh
/// # Five finance articles, results as JSON on stdout
/// news_sentiment
///
/// # Ten articles about semiconductors, also writing a Markdown report
/// news_sentiment -t semiconductors -n 10 -m ./reports
///
/// # Use an OpenAI-compatible endpoint configured for awful_aj
/// news_sentiment --backend jade --jade-template sentiment_analyst
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Topic to search news for
    #[arg(short, long, default_value = DEFAULT_TOPIC)]
    pub topic: String,

    /// Number of articles to analyze (at least 1)
    #[arg(short, long, default_value_t = DEFAULT_NUM_ARTICLES, allow_negative_numbers = true)]
    pub num_articles: i64,

    /// Optional path to a YAML settings file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Completion backend
    #[arg(long, value_enum)]
    pub backend: Option<BackendKind>,

    /// Gemini model name
    #[arg(long)]
    pub model: Option<String>,

    /// awful_aj chat template name (jade backend)
    #[arg(long)]
    pub jade_template: Option<String>,

    /// Path to the awful_aj config.yaml (jade backend)
    #[arg(long)]
    pub jade_config: Option<String>,

    /// Number of articles analyzed concurrently
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Seconds allowed for fetching one article body
    #[arg(long)]
    pub fetch_timeout_secs: Option<u64>,

    /// Seconds allowed for one model call attempt
    #[arg(long)]
    pub model_timeout_secs: Option<u64>,

    /// Retries for a failed model call before the batch is aborted
    #[arg(long)]
    pub max_retries: Option<usize>,

    /// Brave Search API key
    #[arg(long, env = "BRAVE_API_KEY", hide_env_values = true)]
    pub brave_api_key: Option<String>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Output directory for the JSON batch file
    #[arg(short, long)]
    pub json_output_dir: Option<String>,

    /// Output directory for the Markdown report
    #[arg(short, long)]
    pub markdown_output_dir: Option<String>,
}
