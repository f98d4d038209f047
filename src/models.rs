//! Data models for discovered articles and their sentiment analyses.
//!
//! This module defines the core data structures used throughout the application:
//! - [`ArticleRef`]: An article stub as returned by news discovery
//! - [`ArticleContent`]: The body text resolved for one article
//! - [`SentimentResult`]: The structured analysis recovered from one model reply
//! - [`AnalysisRequest`]: The inbound "analyze topic" operation
//! - [`AnalysisBatch`]: Ordered results for one request, plus [`BatchSummary`] statistics

use crate::error::SentimentError;
use crate::schema::SentimentLabel;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Topic searched when the caller does not name one.
pub const DEFAULT_TOPIC: &str = "Finance";

/// Number of articles analyzed when the caller does not ask for a count.
pub const DEFAULT_NUM_ARTICLES: i64 = 5;

/// An article stub produced by news discovery.
///
/// Within one batch the `url` acts as the article's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRef {
    pub title: String,
    pub description: String,
    pub url: String,
}

/// Body text for one article.
///
/// When `is_fallback` is set the body could not be retrieved and `text`
/// holds the article's title instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleContent {
    pub text: String,
    pub is_fallback: bool,
}

impl ArticleContent {
    pub fn fetched(text: String) -> Self {
        Self {
            text,
            is_fallback: false,
        }
    }

    pub fn fallback(text: &str) -> Self {
        Self {
            text: text.to_string(),
            is_fallback: true,
        }
    }
}

/// The structured analysis of one article.
///
/// `title` and `url` always come from the originating [`ArticleRef`], never
/// from the model reply. `confidence` is always within `0..=10`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub title: String,
    pub sentiment: SentimentLabel,
    pub confidence: u8,
    pub summary: String,
    pub insights: Vec<String>,
    pub url: String,
}

impl SentimentResult {
    /// Position on the `-2.0..=2.0` gauge: the label's score weighted by confidence.
    pub fn gauge_position(&self) -> f64 {
        f64::from(self.sentiment.score()) * f64::from(self.confidence) / 10.0
    }

    /// Extract the domain name (before .com/.org/etc) from the article URL.
    /// For example: "https://www.reuters.com/markets/x" -> "reuters"
    pub fn source_tag(&self) -> Option<String> {
        let parsed = url::Url::parse(&self.url).ok()?;
        let host = parsed.host_str()?;
        let parts: Vec<&str> = host.split('.').collect();
        if parts.len() >= 2 {
            return Some(parts[parts.len() - 2].to_string());
        }
        None
    }
}

/// The inbound "analyze sentiment for topic" operation.
///
/// `num_articles` is signed so that a nonsensical count from the caller can be
/// represented and rejected by [`AnalysisRequest::validate`] rather than wrapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisRequest {
    pub topic: String,
    pub num_articles: i64,
}

impl Default for AnalysisRequest {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.to_string(),
            num_articles: DEFAULT_NUM_ARTICLES,
        }
    }
}

impl AnalysisRequest {
    pub fn new(topic: impl Into<String>, num_articles: i64) -> Self {
        Self {
            topic: topic.into(),
            num_articles,
        }
    }

    /// Check the request and return the article count as a `usize`.
    ///
    /// # Errors
    ///
    /// [`SentimentError::InvalidRequest`] when the topic is blank or the count is below 1.
    pub fn validate(&self) -> Result<usize, SentimentError> {
        if self.topic.trim().is_empty() {
            return Err(SentimentError::InvalidRequest(
                "topic must not be empty".to_string(),
            ));
        }
        if self.num_articles < 1 {
            return Err(SentimentError::InvalidRequest(format!(
                "num_articles must be at least 1 (got {})",
                self.num_articles
            )));
        }
        usize::try_from(self.num_articles).map_err(|_| {
            SentimentError::InvalidRequest(format!(
                "num_articles is too large (got {})",
                self.num_articles
            ))
        })
    }
}

/// Ordered results for one request, in discovery order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisBatch {
    pub topic: String,
    /// The date of the run in `YYYY-MM-DD` format.
    pub local_date: String,
    /// The local time of the run in `HH:MM:SS` format.
    pub local_time: String,
    pub results: Vec<SentimentResult>,
}

impl AnalysisBatch {
    pub fn summary(&self) -> BatchSummary {
        BatchSummary::from_results(&self.results)
    }
}

/// Aggregate statistics over a batch.
///
/// `Unknown` results are counted on their own and never as bullish or bearish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub bullish: usize,
    pub bearish: usize,
    pub neutral: usize,
    pub unknown: usize,
    pub by_label: BTreeMap<SentimentLabel, usize>,
    pub mean_gauge_position: f64,
}

impl BatchSummary {
    pub fn from_results(results: &[SentimentResult]) -> Self {
        let by_label: BTreeMap<SentimentLabel, usize> = results
            .iter()
            .map(|r| r.sentiment)
            .counts()
            .into_iter()
            .collect();

        let bullish = results.iter().filter(|r| r.sentiment.is_bullish()).count();
        let bearish = results.iter().filter(|r| r.sentiment.is_bearish()).count();
        let count_of = |label: SentimentLabel| by_label.get(&label).copied().unwrap_or(0);

        let mean_gauge_position = if results.is_empty() {
            0.0
        } else {
            results.iter().map(SentimentResult::gauge_position).sum::<f64>() / results.len() as f64
        };

        Self {
            total: results.len(),
            bullish,
            bearish,
            neutral: count_of(SentimentLabel::Neutral),
            unknown: count_of(SentimentLabel::Unknown),
            by_label,
            mean_gauge_position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(sentiment: SentimentLabel, confidence: u8, url: &str) -> SentimentResult {
        SentimentResult {
            title: "Test".to_string(),
            sentiment,
            confidence,
            summary: "Summary".to_string(),
            insights: vec![],
            url: url.to_string(),
        }
    }

    #[test]
    fn test_request_defaults() {
        let req = AnalysisRequest::default();
        assert_eq!(req.topic, "Finance");
        assert_eq!(req.num_articles, 5);

        let req: AnalysisRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req, AnalysisRequest::default());
    }

    #[test]
    fn test_request_validation() {
        assert_eq!(AnalysisRequest::new("Finance", 3).validate().unwrap(), 3);
        assert!(matches!(
            AnalysisRequest::new("Finance", 0).validate(),
            Err(SentimentError::InvalidRequest(_))
        ));
        assert!(matches!(
            AnalysisRequest::new("Finance", -4).validate(),
            Err(SentimentError::InvalidRequest(_))
        ));
        assert!(matches!(
            AnalysisRequest::new("   ", 2).validate(),
            Err(SentimentError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_result_serialization_shape() {
        let r = SentimentResult {
            title: "Fed holds rates".to_string(),
            sentiment: SentimentLabel::VeryBullish,
            confidence: 8,
            summary: "Rates unchanged.".to_string(),
            insights: vec!["a".to_string(), "b".to_string()],
            url: "https://example.com/a".to_string(),
        };
        let value = serde_json::to_value(&r).unwrap();
        assert_eq!(value["sentiment"], "Very Bullish");
        assert_eq!(value["confidence"], 8);
        assert_eq!(value["insights"][1], "b");
    }

    #[test]
    fn test_gauge_position() {
        assert_eq!(result(SentimentLabel::VeryBullish, 10, "").gauge_position(), 2.0);
        assert_eq!(result(SentimentLabel::Bearish, 5, "").gauge_position(), -0.5);
        assert_eq!(result(SentimentLabel::Unknown, 9, "").gauge_position(), 0.0);
    }

    #[test]
    fn test_source_tag() {
        assert_eq!(
            result(SentimentLabel::Neutral, 5, "https://www.reuters.com/markets/x").source_tag(),
            Some("reuters".to_string())
        );
        assert_eq!(result(SentimentLabel::Neutral, 5, "").source_tag(), None);
    }

    #[test]
    fn test_batch_summary_counts() {
        let results = vec![
            result(SentimentLabel::VeryBullish, 10, "a"),
            result(SentimentLabel::Bullish, 6, "b"),
            result(SentimentLabel::Bearish, 4, "c"),
            result(SentimentLabel::Neutral, 5, "d"),
            result(SentimentLabel::Unknown, 0, "e"),
        ];
        let summary = BatchSummary::from_results(&results);
        assert_eq!(summary.total, 5);
        assert_eq!(summary.bullish, 2);
        assert_eq!(summary.bearish, 1);
        assert_eq!(summary.neutral, 1);
        assert_eq!(summary.unknown, 1);
        assert_eq!(summary.by_label.get(&SentimentLabel::Bullish), Some(&1));
        // (2.0 + 0.6 - 0.4 + 0 + 0) / 5
        assert!((summary.mean_gauge_position - 0.44).abs() < 1e-9);
    }

    #[test]
    fn test_batch_summary_empty() {
        let summary = BatchSummary::from_results(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.mean_gauge_position, 0.0);
    }
}
