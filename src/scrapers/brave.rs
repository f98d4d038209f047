//! Brave Search news lookup.
//!
//! Uses the [news search endpoint](https://api.search.brave.com/res/v1/news/search),
//! which requires a subscription token sent in the `X-Subscription-Token` header.

use super::NewsDiscovery;
use crate::error::HttpStatusError;
use crate::models::ArticleRef;
use crate::utils::truncate_for_log;
use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Public Brave Search API host.
pub const BRAVE_BASE_URL: &str = "https://api.search.brave.com";

/// Title used when a search hit carries none.
const NO_TITLE: &str = "No Title";

#[derive(Debug, Deserialize)]
struct NewsSearchResponse {
    #[serde(default)]
    results: Vec<NewsSearchResult>,
}

#[derive(Debug, Deserialize)]
struct NewsSearchResult {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
}

impl From<NewsSearchResult> for ArticleRef {
    fn from(hit: NewsSearchResult) -> Self {
        ArticleRef {
            title: hit.title.unwrap_or_else(|| NO_TITLE.to_string()),
            description: hit.description.unwrap_or_default(),
            url: hit.url.unwrap_or_default(),
        }
    }
}

/// Brave news search client.
#[derive(Clone)]
pub struct BraveSearch {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl BraveSearch {
    pub fn new(api_key: impl Into<String>, request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            http,
            base_url: BRAVE_BASE_URL.to_string(),
            api_key: api_key.into(),
        })
    }

    /// Point the client at a different host, e.g. a mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/res/v1/news/search", self.base_url.trim_end_matches('/'))
    }
}

impl fmt::Debug for BraveSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BraveSearch")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl NewsDiscovery for BraveSearch {
    #[instrument(level = "info", skip(self))]
    async fn search(&self, query: &str, count: usize) -> Result<Vec<ArticleRef>, Box<dyn Error>> {
        let count_param = count.to_string();
        let resp = self
            .http
            .get(self.endpoint())
            .header("Accept", "application/json")
            .header("X-Subscription-Token", &self.api_key)
            .query(&[
                ("q", query),
                ("count", count_param.as_str()),
                ("result_filter", "news"),
                ("search_lang", "en"),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            warn!(%status, "Brave search failed");
            return Err(Box::new(HttpStatusError {
                service: "Brave search",
                status,
                detail: truncate_for_log(detail.trim(), 300),
            }));
        }

        let parsed: NewsSearchResponse = resp.json().await?;
        let articles: Vec<ArticleRef> = parsed
            .results
            .into_iter()
            .take(count)
            .map(ArticleRef::from)
            .collect();

        info!(count = articles.len(), "Indexed news search results");
        debug!(urls = ?articles.iter().map(|a| a.url.as_str()).collect::<Vec<_>>(), "Search result URLs");
        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::GET, MockServer};
    use serde_json::json;

    fn client(server: &MockServer) -> BraveSearch {
        BraveSearch::new("brave-key", Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.base_url())
    }

    #[tokio::test]
    async fn test_search_maps_results_in_order() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/res/v1/news/search")
                .header("X-Subscription-Token", "brave-key")
                .query_param("q", "Finance")
                .query_param("count", "2")
                .query_param("result_filter", "news")
                .query_param("search_lang", "en");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "type": "news",
                    "results": [
                        {"title": "Stocks rally", "description": "Up big.", "url": "https://a.example/1"},
                        {"description": "No headline here", "url": "https://b.example/2"}
                    ]
                }));
        });

        let articles = client(&server).search("Finance", 2).await.unwrap();
        mock.assert();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].title, "Stocks rally");
        assert_eq!(articles[0].url, "https://a.example/1");
        assert_eq!(articles[1].title, "No Title");
        assert_eq!(articles[1].description, "No headline here");
    }

    #[tokio::test]
    async fn test_search_truncates_to_count() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/res/v1/news/search");
            then.status(200).json_body(json!({
                "results": [
                    {"title": "1", "url": "u1"},
                    {"title": "2", "url": "u2"},
                    {"title": "3", "url": "u3"}
                ]
            }));
        });

        let articles = client(&server).search("Finance", 2).await.unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[1].title, "2");
    }

    #[tokio::test]
    async fn test_search_without_results_is_empty() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/res/v1/news/search");
            then.status(200).json_body(json!({"type": "news"}));
        });

        let articles = client(&server).search("zzqx", 5).await.unwrap();
        assert!(articles.is_empty());
    }

    #[tokio::test]
    async fn test_search_http_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/res/v1/news/search");
            then.status(401).body("invalid token");
        });

        let err = client(&server).search("Finance", 5).await.unwrap_err();
        assert!(err.to_string().contains("401"));
    }
}
