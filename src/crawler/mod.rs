//! Crawl orchestration engine
//!
//! This module contains the core of driftnet:
//! - The crawl job state machine and its queue/tracking sets
//! - The concurrent worker pool and cache-aware fetch pipeline
//! - The process-wide registry guarding the single active job
//! - Progress snapshots and subscriber plumbing

mod job;
mod progress;
mod registry;
mod worker;

pub use job::CrawlJob;
pub use progress::{ProgressBus, ProgressSnapshot, ProgressSubscription};
pub use registry::CrawlRegistry;
