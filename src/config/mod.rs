//! Configuration module
//!
//! Crawl behavior is driven by a [`CrawlOptions`] bag passed to
//! `CrawlRegistry::start`. The CLI can also load a full crawl profile
//! (seeds + options + database path) from a TOML file.

mod parser;
mod types;
mod validation;

pub use parser::load_profile;
pub use types::{CrawlOptions, CrawlProfile};
pub use validation::validate_options;
