//! Content hashing and extraction helpers
//!
//! The content digest is the dedupe key for captured pages. It is
//! computed over the extracted body text alone; HTML and metadata never
//! contribute, so two pages with identical body text but different
//! `<head>` contents still collapse into one captured Page.

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

/// Computes the hex-encoded SHA-256 digest of extracted page text
///
/// # Examples
///
/// ```
/// use driftnet::content::content_hash;
///
/// let a = content_hash("same body");
/// let b = content_hash("same body");
/// assert_eq!(a, b);
/// assert_ne!(a, content_hash("different body"));
/// ```
pub fn content_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Metadata extracted from a page's `<head>`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl PageMetadata {
    /// Returns true when no field is populated
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

/// Extracts clean, whitespace-collapsed body text from an HTML document
///
/// Script and style contents are excluded; everything else that renders
/// as text is kept, joined with single spaces.
pub fn clean_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let body_selector = Selector::parse("body").ok();
    let root = body_selector
        .as_ref()
        .and_then(|sel| document.select(sel).next())
        .unwrap_or_else(|| document.root_element());

    let mut out = String::new();
    collect_text(*root, &mut out);
    out
}

/// Recursively collects text nodes, skipping subtrees that never render
/// as page text
fn collect_text(node: ego_tree::NodeRef<'_, scraper::Node>, out: &mut String) {
    for child in node.children() {
        match child.value() {
            scraper::Node::Element(el) => {
                if !matches!(el.name(), "script" | "style" | "noscript" | "template") {
                    collect_text(child, out);
                }
            }
            scraper::Node::Text(text) => {
                for word in text.split_whitespace() {
                    if !out.is_empty() {
                        out.push(' ');
                    }
                    out.push_str(word);
                }
            }
            _ => {}
        }
    }
}

/// Extracts title and meta description from an HTML document
pub fn extract_metadata(html: &str) -> PageMetadata {
    let document = Html::parse_document(html);

    let title = Selector::parse("title").ok().and_then(|sel| {
        document
            .select(&sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty())
    });

    let description = Selector::parse(r#"meta[name="description"]"#)
        .ok()
        .and_then(|sel| {
            document
                .select(&sel)
                .next()
                .and_then(|el| el.value().attr("content"))
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        });

    PageMetadata { title, description }
}
