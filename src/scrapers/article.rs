//! Article body fetching.
//!
//! Downloads an article page and keeps only its paragraph text. Paragraphs
//! inside `<article>` are preferred; pages without one fall back to every
//! `<p>` in the document. Any failure yields the caller's fallback text.

use super::ContentResolver;
use crate::models::ArticleContent;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::error::Error;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0 Safari/537.36";

static ARTICLE_PARAGRAPHS: Lazy<Selector> = Lazy::new(|| Selector::parse("article p").unwrap());
static ALL_PARAGRAPHS: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());

/// HTTP content resolver.
#[derive(Debug, Clone)]
pub struct ArticleFetcher {
    http: reqwest::Client,
}

impl ArticleFetcher {
    pub fn new(request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { http })
    }

    /// Fetch a single article body
    async fn fetch_text(&self, url: &str) -> Result<Option<String>, Box<dyn Error>> {
        let url = Url::parse(url)?;
        let body = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(extract_text(&body))
    }
}

impl ContentResolver for ArticleFetcher {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn resolve(&self, url: &str, fallback: &str) -> ArticleContent {
        match self.fetch_text(url).await {
            Ok(Some(text)) => {
                info!(bytes = text.len(), "Parsed article");
                ArticleContent::fetched(text)
            }
            Ok(None) => {
                warn!("Article page had no paragraph text; using title");
                ArticleContent::fallback(fallback)
            }
            Err(e) => {
                warn!(error = %e, "Could not fetch article content; using title");
                ArticleContent::fallback(fallback)
            }
        }
    }
}

/// Paragraph text of an HTML document, one paragraph per line.
///
/// `None` when the document has no non-empty paragraphs.
pub fn extract_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let mut paragraphs = collect_paragraphs(&document, &ARTICLE_PARAGRAPHS);
    if paragraphs.is_empty() {
        debug!("No <article> paragraphs; using every <p>");
        paragraphs = collect_paragraphs(&document, &ALL_PARAGRAPHS);
    }

    if paragraphs.is_empty() {
        None
    } else {
        Some(paragraphs.join("\n"))
    }
}

fn collect_paragraphs(document: &Html, selector: &Selector) -> Vec<String> {
    document
        .select(selector)
        .map(|element| {
            element
                .text()
                .flat_map(str::split_whitespace)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|p| !p.is_empty())
        .collect()
}
