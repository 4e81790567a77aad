//! Static HTTP renderer
//!
//! Fetches a page over plain HTTP and extracts text and metadata from
//! the returned document. Pages that require client-side JavaScript to
//! produce their content need a scripted backend instead; this renderer
//! captures whatever the server sends.

use crate::content::{clean_text, extract_metadata};
use crate::render::{RenderError, RenderOptions, RenderedPage, Renderer};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

const USER_AGENT: &str = concat!("driftnet/", env!("CARGO_PKG_VERSION"));

/// Renderer backed by a plain HTTP client
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    /// Builds a renderer with its own HTTP client
    ///
    /// The client-level timeout is a transport safety net; the engine
    /// applies its own per-render deadline on top.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;
        Ok(Self { client })
    }

    /// Builds a renderer around an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn render(&self, url: &Url, _options: &RenderOptions) -> Result<RenderedPage, RenderError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.is_empty()
            && !content_type.contains("text/html")
            && !content_type.contains("application/xhtml")
        {
            return Err(RenderError::ContentType {
                url: url.to_string(),
                content_type,
            });
        }

        let html = response.text().await.map_err(|e| classify_error(url, e))?;
        let text = clean_text(&html);
        let metadata = extract_metadata(&html);

        Ok(RenderedPage {
            html,
            text,
            markdown: None,
            metadata: if metadata.is_empty() { None } else { Some(metadata) },
        })
    }
}

fn classify_error(url: &Url, error: reqwest::Error) -> RenderError {
    if error.is_timeout() {
        RenderError::Timeout {
            url: url.to_string(),
        }
    } else {
        RenderError::Request {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
