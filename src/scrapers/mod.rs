//! External collaborators that find articles and fetch their bodies.
//!
//! Each collaborator is a trait so the pipeline can run against test doubles:
//!
//! | Trait | Implementation | Failure behavior |
//! |-------|----------------|------------------|
//! | [`NewsDiscovery`] | [`brave::BraveSearch`] | Errors propagate and abort the request |
//! | [`ContentResolver`] | [`article::ArticleFetcher`] | Never fails; falls back to the title |

use crate::models::{ArticleContent, ArticleRef};
use std::error::Error;

pub mod article;
pub mod brave;

/// Looks up candidate articles for a query.
pub trait NewsDiscovery {
    /// Return at most `count` article stubs, in the provider's ranking order.
    async fn search(&self, query: &str, count: usize) -> Result<Vec<ArticleRef>, Box<dyn Error>>;
}

/// Fetches the plain-text body of an article.
pub trait ContentResolver {
    /// Best-effort body for `url`.
    ///
    /// Implementations must not fail: on any problem they log a warning and
    /// return [`ArticleContent::fallback`] built from `fallback`.
    async fn resolve(&self, url: &str, fallback: &str) -> ArticleContent;
}
