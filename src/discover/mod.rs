//! Discovery adapter
//!
//! Link discovery is the engine's feed: per-seed initial discovery
//! (sitemap-derived) before workers start, and link extraction from each
//! rendered page while they run. Both live behind the [`Discovery`]
//! trait so tests can drive the engine from a fixed link graph.

mod html;

pub use html::HtmlDiscovery;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// Errors from seed discovery
///
/// Discovery failures are never fatal to a job: the caller falls back to
/// the bare seed URL and relies on link extraction during the crawl.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("sitemap fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("sitemap unparsable for {url}: {message}")]
    Parse { url: String, message: String },
}

/// Finds crawlable URLs before and during a crawl
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Discovers initial URLs for a seed (e.g. from its sitemap)
    ///
    /// An empty result is normal; the seed itself is always enqueued
    /// separately.
    async fn discover_seed_urls(&self, seed: &Url) -> Result<Vec<Url>, DiscoveryError>;

    /// Extracts followable links from a rendered page
    ///
    /// Returned URLs are absolute; scope and depth admission happen in
    /// the crawl job, not here.
    fn extract_links(&self, html: &str, page_url: &Url) -> Vec<Url>;
}
