//! Batch orchestration: discovery, content, prompt, model, extraction.
//!
//! One [`AnalysisRequest`] fans out into one sub-pipeline per discovered
//! article. Sub-pipelines share nothing mutable and run concurrently, up to
//! [`PipelineConfig::concurrency`] at a time, but results are yielded in
//! discovery order regardless of completion order.
//!
//! # Failure policy
//!
//! - Empty discovery: [`SentimentError::NoArticlesFound`], nothing is analyzed.
//! - Content fetch failure or timeout: recovered, the title is analyzed instead.
//! - Model transport failure (after the client's own retries): the whole batch
//!   is aborted, in-flight sub-pipelines are dropped, and the error is returned.
//!   A caller never receives a list with entries missing.
//! - Malformed model reply: recovered field by field in [`crate::extract`].

use crate::api::AskAsync;
use crate::error::SentimentError;
use crate::extract::extract;
use crate::models::{AnalysisBatch, AnalysisRequest, ArticleContent, ArticleRef, SentimentResult};
use crate::prompts::sentiment_prompt;
use crate::scrapers::{ContentResolver, NewsDiscovery};
use crate::utils::truncate_for_log;
use chrono::Local;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

/// Tuning for one pipeline instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Maximum number of articles analyzed at once. Values below 1 act as 1.
    pub concurrency: usize,
    /// Upper bound on one content fetch; on expiry the title is used.
    pub fetch_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            fetch_timeout: Duration::from_secs(15),
        }
    }
}

/// The sentiment pipeline, generic over its three collaborators.
#[derive(Debug)]
pub struct Pipeline<D, R, M> {
    config: PipelineConfig,
    discovery: D,
    resolver: R,
    model: M,
}

impl<D, R, M> Pipeline<D, R, M>
where
    D: NewsDiscovery,
    R: ContentResolver,
    M: AskAsync<Response = String>,
{
    pub fn new(config: PipelineConfig, discovery: D, resolver: R, model: M) -> Self {
        Self {
            config,
            discovery,
            resolver,
            model,
        }
    }

    /// Analyze up to `request.num_articles` articles about `request.topic`.
    ///
    /// # Errors
    ///
    /// - [`SentimentError::InvalidRequest`] before any network call
    /// - [`SentimentError::Search`] when discovery fails
    /// - [`SentimentError::NoArticlesFound`] when discovery is empty
    /// - [`SentimentError::ModelTransport`] when any article's model call fails
    #[instrument(level = "info", skip_all, fields(topic = %request.topic, num_articles = request.num_articles))]
    pub async fn run(&self, request: &AnalysisRequest) -> Result<AnalysisBatch, SentimentError> {
        let count = request.validate()?;
        let t0 = Instant::now();

        let articles = self
            .discovery
            .search(&request.topic, count)
            .await
            .map_err(|e| SentimentError::Search(e.to_string()))?;
        let articles: Vec<ArticleRef> = articles.into_iter().take(count).collect();

        if articles.is_empty() {
            warn!("No articles found");
            return Err(SentimentError::NoArticlesFound {
                topic: request.topic.clone(),
            });
        }

        let concurrency = self.config.concurrency.max(1);
        info!(count = articles.len(), concurrency, "Analyzing articles");

        let results: Vec<SentimentResult> = stream::iter(articles.iter().enumerate())
            .map(|(index, article)| self.analyze_article(index, article))
            .buffered(concurrency)
            .try_collect()
            .await?;

        let now = Local::now();
        info!(
            count = results.len(),
            elapsed_ms = t0.elapsed().as_millis(),
            "Completed sentiment batch"
        );

        Ok(AnalysisBatch {
            topic: request.topic.clone(),
            local_date: now.date_naive().to_string(),
            local_time: now.format("%H:%M:%S").to_string(),
            results,
        })
    }

    #[instrument(level = "debug", skip_all, fields(index = index, url = %article.url))]
    async fn analyze_article(
        &self,
        index: usize,
        article: &ArticleRef,
    ) -> Result<SentimentResult, SentimentError> {
        let content = match timeout(
            self.config.fetch_timeout,
            self.resolver.resolve(&article.url, &article.title),
        )
        .await
        {
            Ok(content) => content,
            Err(_) => {
                warn!(
                    timeout = ?self.config.fetch_timeout,
                    "Content fetch timed out; using title"
                );
                ArticleContent::fallback(&article.title)
            }
        };

        let prompt = sentiment_prompt(
            &article.title,
            &article.description,
            &article.url,
            &content.text,
        );

        let reply = self.model.ask(&prompt).await.map_err(|e| {
            error!(index, error = %e, "Model call failed; aborting batch");
            SentimentError::ModelTransport {
                url: article.url.clone(),
                message: e.to_string(),
            }
        })?;
        debug!(index, reply = %truncate_for_log(&reply, 300), "Model reply");

        let result = extract(&reply, &article.title, &article.url);
        info!(
            index,
            sentiment = %result.sentiment,
            confidence = result.confidence,
            insights = result.insights.len(),
            fallback_content = content.is_fallback,
            "Analyzed article"
        );
        Ok(result)
    }
}
