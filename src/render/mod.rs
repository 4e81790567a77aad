//! Renderer adapter
//!
//! Turning a URL into rendered content is an external capability behind
//! the [`Renderer`] trait: the engine only needs an async operation that
//! either produces `{html, text, markdown?, metadata?}` or fails with a
//! [`RenderError`]. The default backend is a static HTTP fetcher; a
//! JS-capable browser backend plugs in through the same trait.

mod http;

pub use http::HttpRenderer;

use crate::content::PageMetadata;
use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// Errors from a render attempt, always scoped to a single URL
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("request failed for {url}: {message}")]
    Request { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("expected HTML for {url}, got {content_type}")]
    ContentType { url: String, content_type: String },

    #[error("render timed out for {url}")]
    Timeout { url: String },
}

/// Per-render options forwarded to the backend
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Content-readiness hints (selectors, text markers); meaningful to
    /// scripted backends, ignored by the static fetcher
    pub wait_hints: Vec<String>,
}

/// A fully rendered page
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,
    /// Clean extracted body text; the dedupe hash is computed over this
    pub text: String,
    pub markdown: Option<String>,
    pub metadata: Option<PageMetadata>,
}

/// An async backend that renders one URL to content
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &Url, options: &RenderOptions) -> Result<RenderedPage, RenderError>;
}
