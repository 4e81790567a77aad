use serde::Deserialize;
use std::time::Duration;

/// Options recognized by a crawl run
///
/// All fields have serde defaults so a profile file may specify only the
/// settings it cares about.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlOptions {
    /// Number of concurrent workers (1-10)
    pub max_workers: usize,

    /// Maximum unique pages captured per seed; unlimited when absent
    pub page_limit_per_seed: Option<u32>,

    /// Whether scope path matching requires a `/` boundary
    pub strict_path_matching: bool,

    /// Skip the cross-job cached-page lookup and always re-render
    pub skip_cache: bool,

    /// Follow links that leave the seed scopes
    pub follow_external_links: bool,

    /// Maximum external-link hops from an in-scope page (1-5)
    pub max_external_hops: u32,

    /// Per-URL render timeout in milliseconds
    pub render_timeout_ms: u64,

    /// Politeness delay between requests from one worker, in milliseconds
    pub request_delay_ms: u64,

    /// Content-readiness hints passed through to the renderer backend
    pub wait_hints: Vec<String>,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            max_workers: 5,
            page_limit_per_seed: None,
            strict_path_matching: true,
            skip_cache: false,
            follow_external_links: false,
            max_external_hops: 1,
            render_timeout_ms: 30_000,
            request_delay_ms: 250,
            wait_hints: Vec::new(),
        }
    }
}

impl CrawlOptions {
    /// Render timeout as a `Duration`
    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }

    /// Inter-request politeness delay as a `Duration`
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

/// A full crawl profile as loaded from a TOML file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlProfile {
    /// Seed URLs defining the crawl scopes
    pub seeds: Vec<String>,

    /// Path to the SQLite capture database
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Crawl options; all optional
    #[serde(default)]
    pub options: CrawlOptions,
}

fn default_database_path() -> String {
    "./driftnet.db".to_string()
}
