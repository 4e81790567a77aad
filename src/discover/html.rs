//! HTML and sitemap-based discovery
//!
//! Link extraction rules:
//!
//! **Include:** `<a href="...">` anywhere in the document.
//!
//! **Exclude:** `javascript:`, `mailto:`, `tel:` and data URIs;
//! fragment-only links; anything that fails to resolve against the page
//! URL.

use crate::discover::{Discovery, DiscoveryError};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

/// Discovery backed by sitemap.xml fetches and anchor-tag extraction
pub struct HtmlDiscovery {
    client: Client,
}

impl HtmlDiscovery {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("driftnet/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Discovery for HtmlDiscovery {
    async fn discover_seed_urls(&self, seed: &Url) -> Result<Vec<Url>, DiscoveryError> {
        let mut sitemap_url = seed.clone();
        sitemap_url.set_path("/sitemap.xml");
        sitemap_url.set_query(None);
        sitemap_url.set_fragment(None);

        let response = self
            .client
            .get(sitemap_url.clone())
            .send()
            .await
            .map_err(|e| DiscoveryError::Fetch {
                url: sitemap_url.to_string(),
                message: e.to_string(),
            })?;

        // A missing sitemap is the common case, not an error.
        if !response.status().is_success() {
            tracing::debug!("no sitemap at {} ({})", sitemap_url, response.status());
            return Ok(Vec::new());
        }

        let body = response.text().await.map_err(|e| DiscoveryError::Fetch {
            url: sitemap_url.to_string(),
            message: e.to_string(),
        })?;

        Ok(parse_sitemap_locs(&body))
    }

    fn extract_links(&self, html: &str, page_url: &Url) -> Vec<Url> {
        extract_anchor_links(html, page_url)
    }
}

/// Pulls `<loc>` entries out of a sitemap document
///
/// Sitemaps in the wild are simple enough that a tag scan beats a full
/// XML dependency; nested sitemap indexes yield their child sitemap
/// URLs, which are not pages and get filtered by scope later.
fn parse_sitemap_locs(body: &str) -> Vec<Url> {
    let mut urls = Vec::new();
    let mut rest = body;

    while let Some(start) = rest.find("<loc>") {
        rest = &rest[start + 5..];
        let Some(end) = rest.find("</loc>") else {
            break;
        };
        let loc = rest[..end].trim();
        if let Ok(url) = Url::parse(loc) {
            urls.push(url);
        }
        rest = &rest[end + 6..];
    }

    urls
}

fn extract_anchor_links(html: &str, page_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut links = Vec::new();
    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();

        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
            || href.starts_with("data:")
        {
            continue;
        }

        match page_url.join(href) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => links.push(url),
            Ok(_) => {}
            Err(e) => tracing::trace!("unresolvable href {:?} on {}: {}", href, page_url, e),
        }
    }

    links
}
