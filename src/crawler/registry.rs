//! Crawl registry
//!
//! Process-wide coordinator that enforces the one-active-job rule,
//! assembles jobs from their collaborators, and exposes control and
//! status entry points. Start is fire-and-poll: it returns as soon as
//! the job is seeded and its workers are spawned.

use crate::config::{validate_options, CrawlOptions};
use crate::crawler::job::CrawlJob;
use crate::crawler::progress::{ProgressBus, ProgressSnapshot, ProgressSubscription};
use crate::crawler::worker::spawn_workers;
use crate::discover::Discovery;
use crate::render::Renderer;
use crate::storage::{JobRecord, PageStore};
use crate::url::canonicalize;
use crate::{DriftnetError, Result};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use url::Url;

/// Owner of the single active crawl job
pub struct CrawlRegistry {
    store: Arc<dyn PageStore>,
    discovery: Arc<dyn Discovery>,
    renderer: Arc<dyn Renderer>,
    progress: Arc<ProgressBus>,
    /// Serializes concurrent start attempts so exactly one wins
    start_gate: tokio::sync::Mutex<()>,
    /// The active job; cleared by the job's own completion routine
    active: Arc<Mutex<Option<Arc<CrawlJob>>>>,
}

impl CrawlRegistry {
    pub fn new(
        store: Arc<dyn PageStore>,
        discovery: Arc<dyn Discovery>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        Self {
            store,
            discovery,
            renderer,
            progress: Arc::new(ProgressBus::new()),
            start_gate: tokio::sync::Mutex::new(()),
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Starts a crawl over the given seed URLs
    ///
    /// Fails with [`DriftnetError::AlreadyRunning`] while another job is
    /// active, [`DriftnetError::NoValidSeeds`] when no seed survives
    /// canonicalization, and [`DriftnetError::Config`] when the options
    /// are out of range (a zero-worker pool would never fire completion
    /// and wedge the registry slot). Invalid seeds among valid ones are
    /// dropped with a warning. Returns once workers are running; callers
    /// observe completion by polling [`status`](Self::status) or
    /// subscribing via [`on_progress`](Self::on_progress).
    pub async fn start(&self, seeds: &[String], options: CrawlOptions) -> Result<Arc<CrawlJob>> {
        validate_options(&options)?;

        let _gate = self.start_gate.lock().await;

        if let Some(job) = self.active.lock().unwrap().as_ref() {
            return Err(DriftnetError::AlreadyRunning(job.id()));
        }

        let (raw_seeds, canonical_seeds) = canonicalize_seeds(seeds)?;
        let canonical_strings: Vec<String> =
            canonical_seeds.iter().map(|u| u.to_string()).collect();

        let record = self.store.create_job(&raw_seeds, &canonical_strings)?;
        tracing::info!(job = record.id, seeds = ?raw_seeds, "starting crawl");

        let job = Arc::new(CrawlJob::new(
            record.id,
            canonical_seeds.clone(),
            options,
            Arc::clone(&self.store),
            Arc::clone(&self.discovery),
            Arc::clone(&self.renderer),
            Arc::clone(&self.progress),
            Arc::clone(&self.active),
        ));
        job.mark_in_progress()?;

        // Seed the queue before any worker can observe it empty.
        for (raw, canonical) in raw_seeds.iter().zip(&canonical_seeds) {
            job.enqueue(raw, None);
            match self.discovery.discover_seed_urls(canonical).await {
                Ok(urls) => {
                    for url in urls {
                        job.enqueue(url.as_str(), None);
                    }
                }
                // Non-fatal: the bare seed is enough to crawl from.
                Err(e) => tracing::warn!("seed discovery failed for {}: {}", canonical, e),
            }
        }

        *self.active.lock().unwrap() = Some(Arc::clone(&job));
        spawn_workers(&job);
        Ok(job)
    }

    /// The currently active job, if any
    pub fn get_active(&self) -> Option<Arc<CrawlJob>> {
        self.active.lock().unwrap().clone()
    }

    /// Durable status of any job, active or historical
    pub fn status(&self, job_id: i64) -> Result<Option<JobRecord>> {
        Ok(self.store.get_job(job_id)?)
    }

    /// Pauses the active job; returns false when none is running
    pub fn pause_active(&self) -> bool {
        match self.get_active() {
            Some(job) => {
                job.pause();
                true
            }
            None => false,
        }
    }

    pub fn resume_active(&self) -> bool {
        match self.get_active() {
            Some(job) => {
                job.resume();
                true
            }
            None => false,
        }
    }

    /// Requests cancellation of the active job
    ///
    /// Returns immediately; the job reaches `interrupted` once in-flight
    /// URLs drain.
    pub fn cancel_active(&self) -> bool {
        match self.get_active() {
            Some(job) => {
                job.cancel();
                true
            }
            None => false,
        }
    }

    /// Subscribes a sink to progress snapshots from all jobs
    pub fn on_progress(
        &self,
        sink: impl Fn(&ProgressSnapshot) + Send + Sync + 'static,
    ) -> ProgressSubscription {
        self.progress.subscribe(sink)
    }

    pub fn store(&self) -> &Arc<dyn PageStore> {
        &self.store
    }
}

/// Canonicalizes seeds, dropping invalid ones and canonical duplicates
fn canonicalize_seeds(seeds: &[String]) -> Result<(Vec<String>, Vec<Url>)> {
    let mut raw_seeds = Vec::new();
    let mut canonical_seeds: Vec<Url> = Vec::new();
    let mut seen = HashSet::new();

    for seed in seeds {
        match canonicalize(seed) {
            Ok(url) => {
                if seen.insert(url.to_string()) {
                    raw_seeds.push(seed.trim().to_string());
                    canonical_seeds.push(url);
                }
            }
            Err(e) => tracing::warn!("skipping invalid seed {:?}: {}", seed, e),
        }
    }

    if canonical_seeds.is_empty() {
        return Err(DriftnetError::NoValidSeeds);
    }
    Ok((raw_seeds, canonical_seeds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discover::DiscoveryError;
    use crate::render::{RenderError, RenderOptions, RenderedPage};
    use crate::storage::{JobStatus, SqliteStore};
    use async_trait::async_trait;
    use std::time::Duration;

    struct EmptyDiscovery;

    #[async_trait]
    impl Discovery for EmptyDiscovery {
        async fn discover_seed_urls(
            &self,
            _: &Url,
        ) -> std::result::Result<Vec<Url>, DiscoveryError> {
            Ok(vec![])
        }
        fn extract_links(&self, _: &str, _: &Url) -> Vec<Url> {
            vec![]
        }
    }

    struct FailingRenderer;

    #[async_trait]
    impl Renderer for FailingRenderer {
        async fn render(
            &self,
            url: &Url,
            _: &RenderOptions,
        ) -> std::result::Result<RenderedPage, RenderError> {
            Err(RenderError::Status {
                url: url.to_string(),
                status: 503,
            })
        }
    }

    /// Never resolves; keeps a job active for the duration of a test
    struct StalledRenderer;

    #[async_trait]
    impl Renderer for StalledRenderer {
        async fn render(
            &self,
            _: &Url,
            _: &RenderOptions,
        ) -> std::result::Result<RenderedPage, RenderError> {
            std::future::pending().await
        }
    }

    fn registry_with(renderer: Arc<dyn Renderer>) -> CrawlRegistry {
        CrawlRegistry::new(
            Arc::new(SqliteStore::new_in_memory().unwrap()),
            Arc::new(EmptyDiscovery),
            renderer,
        )
    }

    fn quick_options() -> CrawlOptions {
        CrawlOptions {
            max_workers: 2,
            request_delay_ms: 0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_start_rejects_empty_and_invalid_seeds() {
        let registry = registry_with(Arc::new(FailingRenderer));

        let err = registry.start(&[], quick_options()).await.unwrap_err();
        assert!(matches!(err, DriftnetError::NoValidSeeds));

        let err = registry
            .start(&["not a url".to_string(), "ftp://x.com/a".to_string()], quick_options())
            .await
            .unwrap_err();
        assert!(matches!(err, DriftnetError::NoValidSeeds));
    }

    #[tokio::test]
    async fn test_start_rejects_out_of_range_options() {
        let registry = registry_with(Arc::new(FailingRenderer));
        let seeds = vec!["https://docs.example.com/api".to_string()];

        // A zero-worker pool could never run completion.
        let options = CrawlOptions {
            max_workers: 0,
            ..Default::default()
        };
        let err = registry.start(&seeds, options).await.unwrap_err();
        assert!(matches!(err, DriftnetError::Config(_)));

        // The rejection leaves no job behind; a valid start still works.
        assert!(registry.get_active().is_none());
        assert!(registry.status(1).unwrap().is_none());
        registry.start(&seeds, quick_options()).await.unwrap();
    }

    #[tokio::test]
    async fn test_second_start_rejected_while_active() {
        let registry = registry_with(Arc::new(StalledRenderer));
        let job = registry
            .start(&["https://docs.example.com/api".to_string()], quick_options())
            .await
            .unwrap();

        let err = registry
            .start(&["https://other.example.com/docs".to_string()], quick_options())
            .await
            .unwrap_err();
        match err {
            DriftnetError::AlreadyRunning(id) => assert_eq!(id, job.id()),
            other => panic!("expected AlreadyRunning, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_start_records_job_and_completion_clears_slot() {
        let registry = registry_with(Arc::new(FailingRenderer));
        let job = registry
            .start(&["https://docs.example.com/api".to_string()], quick_options())
            .await
            .unwrap();

        let record = registry.status(job.id()).unwrap().unwrap();
        assert_eq!(record.seed_urls, vec!["https://docs.example.com/api"]);
        assert_eq!(
            record.canonical_seed_urls,
            vec!["https://docs.example.com/api"]
        );

        // Single seed, renderer always fails: the job drains quickly.
        for _ in 0..100 {
            if registry.get_active().is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(registry.get_active().is_none());

        let record = registry.status(job.id()).unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Failed);
        assert_eq!(record.pages_failed, 1);
    }

    #[tokio::test]
    async fn test_canonical_duplicate_seeds_collapse() {
        let seeds = vec![
            "https://docs.example.com/api".to_string(),
            "HTTP://WWW.docs.example.com/api/".to_string(),
        ];
        let (raw, canonical) = canonicalize_seeds(&seeds).unwrap();
        assert_eq!(raw, vec!["https://docs.example.com/api"]);
        assert_eq!(canonical.len(), 1);
    }

    #[tokio::test]
    async fn test_controls_without_active_job() {
        let registry = registry_with(Arc::new(FailingRenderer));
        assert!(!registry.pause_active());
        assert!(!registry.resume_active());
        assert!(!registry.cancel_active());
    }
}
