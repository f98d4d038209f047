//! Runtime settings.
//!
//! Settings start from built-in defaults, are optionally replaced by a YAML
//! file (`--config`), and are finally overridden by any tuning flag given on
//! the command line. API keys are never read from the YAML file; they come
//! from the environment (or `.env`) through [`crate::cli::Cli`].
//!
//! ```yaml
//! backend: gemini
//! model: gemini-2.0-flash
//! gemini_base_url: https://generativelanguage.googleapis.com
//! concurrency: 4
//! fetch_timeout_secs: 15
//! model_timeout_secs: 60
//! search_timeout_secs: 20
//! max_retries: 3
//! retry_base_delay_ms: 1000
//! ```

use crate::api::DEFAULT_GEMINI_MODEL;
use crate::cli::Cli;
use crate::error::SentimentError;
use crate::pipeline::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument};

/// Which completion backend to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Google Gemini REST API (needs `GEMINI_API_KEY`).
    Gemini,
    /// OpenAI-compatible endpoint configured through `awful_aj`.
    Jade,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backend: BackendKind,
    /// Gemini model name. Ignored by the `jade` backend, whose model lives in its own config.
    pub model: String,
    /// `awful_aj` chat template used by the `jade` backend.
    pub jade_template: String,
    /// `awful_aj` config.yaml; defaults to the one in the `awful_aj` config dir.
    pub jade_config: Option<String>,
    /// Alternate Gemini host, e.g. a proxy.
    pub gemini_base_url: Option<String>,
    /// Alternate Brave Search host.
    pub brave_base_url: Option<String>,
    pub concurrency: usize,
    pub fetch_timeout_secs: u64,
    pub model_timeout_secs: u64,
    pub search_timeout_secs: u64,
    pub max_retries: usize,
    pub retry_base_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: BackendKind::Gemini,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            jade_template: "sentiment_analyst".to_string(),
            jade_config: None,
            gemini_base_url: None,
            brave_base_url: None,
            concurrency: 4,
            fetch_timeout_secs: 15,
            model_timeout_secs: 60,
            search_timeout_secs: 20,
            max_retries: 3,
            retry_base_delay_ms: 1000,
        }
    }
}

impl Settings {
    /// Read settings from a YAML file; keys it omits keep their defaults.
    #[instrument(level = "info")]
    pub fn load(path: &str) -> Result<Self, SentimentError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SentimentError::Config(format!("cannot read {path}: {e}")))?;
        let settings = Self::from_yaml(&raw)
            .map_err(|e| SentimentError::Config(format!("invalid {path}: {e}")))?;
        info!(backend = ?settings.backend, "Loaded settings file");
        Ok(settings)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    /// Apply every tuning flag the user actually passed.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(backend) = cli.backend {
            self.backend = backend;
        }
        if let Some(model) = &cli.model {
            self.model = model.clone();
        }
        if let Some(template) = &cli.jade_template {
            self.jade_template = template.clone();
        }
        if let Some(path) = &cli.jade_config {
            self.jade_config = Some(path.clone());
        }
        if let Some(concurrency) = cli.concurrency {
            self.concurrency = concurrency;
        }
        if let Some(secs) = cli.fetch_timeout_secs {
            self.fetch_timeout_secs = secs;
        }
        if let Some(secs) = cli.model_timeout_secs {
            self.model_timeout_secs = secs;
        }
        if let Some(retries) = cli.max_retries {
            self.max_retries = retries;
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            concurrency: self.concurrency.max(1),
            fetch_timeout: self.fetch_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let settings = Settings::from_yaml("concurrency: 8\nbackend: jade\n").unwrap();
        assert_eq!(settings.concurrency, 8);
        assert_eq!(settings.backend, BackendKind::Jade);
        assert_eq!(settings.model, "gemini-2.0-flash");
        assert_eq!(settings.max_retries, 3);
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        assert!(Settings::from_yaml("backend: openai\n").is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut settings = Settings::from_yaml("concurrency: 8\nmodel: gemini-1.5-pro\n").unwrap();
        let cli = Cli::parse_from(["news_sentiment", "--concurrency", "2", "--max-retries", "0"]);
        settings.apply_cli(&cli);
        assert_eq!(settings.concurrency, 2);
        assert_eq!(settings.max_retries, 0);
        assert_eq!(settings.model, "gemini-1.5-pro");
    }

    #[test]
    fn test_pipeline_config_floor() {
        let settings = Settings {
            concurrency: 0,
            fetch_timeout_secs: 3,
            ..Default::default()
        };
        let config = settings.pipeline_config();
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.fetch_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Settings::load("/nonexistent/news_sentiment.yaml").unwrap_err();
        assert!(matches!(err, SentimentError::Config(_)));
    }
}
