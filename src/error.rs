//! Error taxonomy for a sentiment run.
//!
//! Only failures that abort a request live here. A missing article body is
//! recovered by the content resolver and a malformed model reply is recovered
//! field by field in [`crate::extract`]; neither ever becomes a
//! [`SentimentError`].

use serde::Serialize;
use std::process::ExitCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SentimentError {
    /// The request was rejected before any network call.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Discovery returned no candidate articles for the topic.
    #[error("no articles found for topic {topic:?}")]
    NoArticlesFound { topic: String },

    /// The news search call failed.
    #[error("news search failed: {0}")]
    Search(String),

    /// The completion call failed for an article after retries.
    #[error("model call failed for {url}: {message}")]
    ModelTransport { url: String, message: String },

    /// Required settings are missing or unreadable.
    #[error("configuration error: {0}")]
    Config(String),

    /// An output location named by the caller cannot be used.
    #[error("unusable output location: {0}")]
    Output(String),
}

/// A non-success HTTP status from an upstream API.
///
/// Kept typed so retry logic can tell a rejected request from a transient failure.
#[derive(Debug, Error)]
#[error("{service} returned {status}: {detail}")]
pub struct HttpStatusError {
    pub service: &'static str,
    pub status: reqwest::StatusCode,
    pub detail: String,
}

impl HttpStatusError {
    /// 4xx other than 408 and 429: repeating the same request cannot succeed.
    pub fn is_permanent(&self) -> bool {
        self.status.is_client_error()
            && self.status != reqwest::StatusCode::TOO_MANY_REQUESTS
            && self.status != reqwest::StatusCode::REQUEST_TIMEOUT
    }
}

/// Caller-facing classification of a [`SentimentError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    NotFound,
    UpstreamFailure,
}

impl SentimentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SentimentError::InvalidRequest(_)
            | SentimentError::Config(_)
            | SentimentError::Output(_) => ErrorKind::InvalidRequest,
            SentimentError::NoArticlesFound { .. } => ErrorKind::NotFound,
            SentimentError::Search(_) | SentimentError::ModelTransport { .. } => {
                ErrorKind::UpstreamFailure
            }
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        match self.kind() {
            ErrorKind::NotFound => ExitCode::from(2),
            ErrorKind::UpstreamFailure => ExitCode::from(3),
            ErrorKind::InvalidRequest => ExitCode::from(64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            SentimentError::NoArticlesFound {
                topic: "Finance".to_string()
            }
            .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            SentimentError::ModelTransport {
                url: "https://example.com".to_string(),
                message: "quota".to_string()
            }
            .kind(),
            ErrorKind::UpstreamFailure
        );
        assert_eq!(
            SentimentError::InvalidRequest("bad".to_string()).kind(),
            ErrorKind::InvalidRequest
        );
    }

    #[test]
    fn test_local_output_failure_is_not_upstream() {
        let e = SentimentError::Output("/readonly is not writable".to_string());
        assert_eq!(e.kind(), ErrorKind::InvalidRequest);
        assert_eq!(e.exit_code(), ExitCode::from(64));
    }

    #[test]
    fn test_http_status_permanence() {
        let err = |status: u16| HttpStatusError {
            service: "Gemini",
            status: reqwest::StatusCode::from_u16(status).unwrap(),
            detail: String::new(),
        };
        assert!(err(400).is_permanent());
        assert!(err(401).is_permanent());
        assert!(err(403).is_permanent());
        assert!(!err(429).is_permanent());
        assert!(!err(408).is_permanent());
        assert!(!err(500).is_permanent());
        assert!(!err(503).is_permanent());
        assert_eq!(err(401).to_string(), "Gemini returned 401 Unauthorized: ");
    }

    #[test]
    fn test_display_carries_message() {
        let e = SentimentError::ModelTransport {
            url: "https://example.com/a".to_string(),
            message: "429 Too Many Requests".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "model call failed for https://example.com/a: 429 Too Many Requests"
        );
        assert_eq!(
            serde_json::to_string(&ErrorKind::UpstreamFailure).unwrap(),
            "\"upstream_failure\""
        );
    }
}
