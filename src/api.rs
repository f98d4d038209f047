//! Generative model interaction with exponential backoff retry logic.
//!
//! The pipeline only needs one thing from a model: text in, text out. The
//! reply is not assumed to be well-formed; see [`crate::extract`].
//!
//! # Architecture
//!
//! - [`AskAsync`]: Core trait defining async prompt completion
//! - [`GeminiClient`]: Google Gemini `generateContent` over REST
//! - [`JadeClient`]: Any OpenAI-compatible endpoint via `awful_aj`
//! - [`ModelBackend`]: Runtime choice between the two
//! - [`RetryAsk`]: Decorator that adds retry logic to any `AskAsync` implementation
//!
//! # Retry Strategy
//!
//! - Configurable number of retry attempts
//! - Exponential backoff from a base delay, capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd
//! - Rejected requests ([`HttpStatusError::is_permanent`]) fail immediately

use crate::error::HttpStatusError;
use crate::utils::truncate_for_log;
use awful_aj::api::ask;
use awful_aj::{config, config::AwfulJadeConfig, config_dir, template, template::ChatTemplate};
use rand::{Rng, rng};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, instrument, warn};

/// Default Gemini model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Public Gemini REST endpoint.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Trait for async prompt completion.
///
/// Implementors send a prompt to a model and return its raw reply. Errors are
/// transport-level only (network, quota, auth); a reply that is merely badly
/// formatted is still `Ok`.
pub trait AskAsync {
    /// The type of response returned by the model.
    type Response;

    /// Send text to the model and receive a response.
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>>;
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`] implementation.
///
/// # Backoff Strategy
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAsk<T> {
    /// The underlying model client to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    /// Create a new retry wrapper around an existing [`AskAsync`] implementation.
    ///
    /// ```ignore
    /// let retry_client = RetryAsk::new(GeminiClient::new(key, DEFAULT_GEMINI_MODEL, timeout)?, 3, Duration::from_secs(1));
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync + fmt::Debug,
{
    type Response = T::Response;

    #[instrument(level = "debug", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(text).await {
                Ok(resp) => {
                    return Ok(resp);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    let permanent = e
                        .downcast_ref::<HttpStatusError>()
                        .is_some_and(HttpStatusError::is_permanent);
                    if permanent {
                        error!(
                            attempt,
                            elapsed_ms_total = total_dt.as_millis(),
                            error = %e,
                            "ask() rejected; not retrying"
                        );
                        return Err(e);
                    }

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis(),
                            elapsed_ms_total = total_dt.as_millis(),
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let exp = (attempt - 1).min(16) as u32;
                    let mut delay = self.base_delay.saturating_mul(1u32 << exp);
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis(),
                        elapsed_ms_total = total_dt.as_millis(),
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        Some(text)
    }
}

/// Client for the Gemini `generateContent` REST endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Build a client against the public endpoint with a per-request timeout.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        request_timeout: StdDuration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            http,
            base_url: GEMINI_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Point the client at a different host, e.g. a proxy or a mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl AskAsync for GeminiClient {
    type Response = String;

    #[instrument(level = "debug", skip_all, fields(model = %self.model))]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let t0 = Instant::now();
        let body = GenerateContentRequest {
            contents: [RequestContent {
                role: "user",
                parts: [RequestPart { text }],
            }],
        };

        let resp = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            warn!(
                elapsed_ms = t0.elapsed().as_millis(),
                %status,
                "Gemini call failed"
            );
            return Err(Box::new(HttpStatusError {
                service: "Gemini",
                status,
                detail: truncate_for_log(detail.trim(), 300),
            }));
        }

        let parsed: GenerateContentResponse = resp.json().await?;
        let text = match parsed.into_text() {
            Some(text) => text,
            None => {
                warn!("Gemini reply had no candidate text; treating as empty completion");
                String::new()
            }
        };
        debug!(
            elapsed_ms = t0.elapsed().as_millis(),
            bytes = text.len(),
            "Gemini call succeeded"
        );
        Ok(text)
    }
}

/// OpenAI-compatible completion through `awful_aj`.
///
/// Endpoint, model and credentials come from the `awful_aj` `config.yaml`; the
/// system prompt comes from a named `awful_aj` chat template.
#[derive(Debug, Clone)]
pub struct JadeClient {
    /// LLM configuration (API keys, endpoints, model settings).
    config: Arc<AwfulJadeConfig>,
    /// Chat template defining the conversation structure.
    template: Arc<ChatTemplate>,
    request_timeout: StdDuration,
}

impl JadeClient {
    pub fn new(config: AwfulJadeConfig, template: ChatTemplate, request_timeout: StdDuration) -> Self {
        Self {
            config: Arc::new(config),
            template: Arc::new(template),
            request_timeout,
        }
    }

    /// Load `config.yaml` (from `config_path`, or the `awful_aj` config dir) and a named template.
    #[instrument(level = "info", skip(request_timeout))]
    pub async fn load(
        template_name: &str,
        config_path: Option<&str>,
        request_timeout: StdDuration,
    ) -> Result<Self, Box<dyn Error>> {
        let template = template::load_template(template_name).await?;
        info!(template_name, "Loaded template");

        let conf_file = match config_path {
            Some(path) => std::path::PathBuf::from(path),
            None => config_dir()?.join("config.yaml"),
        };
        let path = conf_file
            .to_str()
            .ok_or_else(|| format!("not a valid config filename: {}", conf_file.display()))?;
        let config = config::load_config(path)
            .map_err(|e| format!("failed to load {path}: {e:?}"))?;
        info!(config_path = path, "Loaded configuration");

        Ok(Self::new(config, template, request_timeout))
    }
}

impl AskAsync for JadeClient {
    type Response = String;

    #[instrument(level = "debug", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let t0 = Instant::now();
        let call = ask(&self.config, text.to_string(), &self.template, None, None);
        let res = match timeout(self.request_timeout, call).await {
            Ok(res) => res,
            Err(_) => Err(format!("request timed out after {:?}", self.request_timeout).into()),
        };
        let dt = t0.elapsed();

        match &res {
            Ok(_) => debug!(elapsed_ms = dt.as_millis(), "API call succeeded"),
            Err(e) => warn!(elapsed_ms = dt.as_millis(), error = %e, "API call failed"),
        }
        res
    }
}

/// The completion backend chosen at startup.
#[derive(Debug, Clone)]
pub enum ModelBackend {
    Gemini(GeminiClient),
    Jade(JadeClient),
}

impl AskAsync for ModelBackend {
    type Response = String;

    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        match self {
            ModelBackend::Gemini(client) => client.ask(text).await,
            ModelBackend::Jade(client) => client.ask(text).await,
        }
    }
}
