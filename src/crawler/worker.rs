//! Worker pool and fetch pipeline
//!
//! Each worker runs the same loop: ask the job what to do, process one
//! URL through the cache-aware pipeline, settle the outcome, report
//! progress. Workers never abort mid-URL; pause and cancel take effect
//! between URLs.

use crate::content::content_hash;
use crate::crawler::job::{CrawlJob, PipelineOutcome, WorkerAction};
use crate::render::{RenderError, RenderOptions, RenderedPage};
use crate::storage::{NewPage, PageStatus};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// How long an idle worker sleeps before re-checking the queue
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Starts the worker pool for a job
///
/// The pool size is recorded on the job before any worker runs so the
/// last-worker-out completion check counts correctly.
pub(crate) fn spawn_workers(job: &Arc<CrawlJob>) {
    let count = job.options().max_workers;
    job.set_active_workers(count);
    for worker_id in 0..count {
        let job = Arc::clone(job);
        tokio::spawn(async move {
            run_worker(job, worker_id).await;
        });
    }
}

async fn run_worker(job: Arc<CrawlJob>, worker_id: usize) {
    tracing::debug!(job = job.id(), worker = worker_id, "worker started");

    loop {
        match job.next_action() {
            WorkerAction::Exit => break,
            WorkerAction::Wait => tokio::time::sleep(POLL_INTERVAL).await,
            WorkerAction::Process(key) => {
                let outcome = process_url(&job, &key).await;
                if let PipelineOutcome::Failed(message) = &outcome {
                    tracing::warn!(job = job.id(), url = %key, "capture failed: {}", message);
                }
                job.settle(&key, &outcome);
                job.report_progress();
                tokio::time::sleep(job.options().request_delay()).await;
            }
        }
    }

    tracing::debug!(job = job.id(), worker = worker_id, "worker exiting");
    job.worker_finished();
}

/// Runs one URL through the full pipeline
///
/// Order matters: cross-job cache lookup first (skips rendering
/// entirely), then render with a timeout bound, link extraction, and
/// finally the dedupe-then-save commit.
async fn process_url(job: &Arc<CrawlJob>, key: &str) -> PipelineOutcome {
    let url = match Url::parse(key) {
        Ok(url) => url,
        // Keys come from canonicalize, so this never fires in practice.
        Err(e) => return PipelineOutcome::Failed(format!("invalid canonical URL: {}", e)),
    };

    if !job.options().skip_cache {
        match job.store().get_page_by_canonical_url(key) {
            Ok(Some(cached)) if cached.job_id != job.id() => {
                tracing::debug!(job = job.id(), url = %key, "serving from cache");
                let html = match &cached.html {
                    Some(html) => html.clone(),
                    // Content is cached but the HTML was not kept; one
                    // render is still needed for link discovery. The
                    // cached text stays authoritative either way.
                    None => match render_bounded(job, &url).await {
                        Ok(rendered) => rendered.html,
                        Err(e) => {
                            tracing::warn!(
                                "link-discovery render failed for cached {}: {}",
                                key,
                                e
                            );
                            String::new()
                        }
                    },
                };
                if !html.is_empty() {
                    enqueue_links(job, &html, &url, key);
                }
                let page = RenderedPage {
                    html,
                    text: cached.content.clone(),
                    markdown: cached.markdown.clone(),
                    metadata: None,
                };
                return commit_content(job, key, page, Some(cached.metadata.clone()));
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("cache lookup failed for {}: {}", key, e),
        }
    }

    let rendered = match render_bounded(job, &url).await {
        Ok(page) => page,
        Err(e) => return PipelineOutcome::Failed(e.to_string()),
    };

    enqueue_links(job, &rendered.html, &url, key);
    commit_content(job, key, rendered, None)
}

/// Renders a URL with the configured timeout as a hard outer bound
async fn render_bounded(job: &Arc<CrawlJob>, url: &Url) -> Result<RenderedPage, RenderError> {
    let options = RenderOptions {
        wait_hints: job.options().wait_hints.clone(),
    };
    match tokio::time::timeout(
        job.options().render_timeout(),
        job.renderer().render(url, &options),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(RenderError::Timeout {
            url: url.to_string(),
        }),
    }
}

fn enqueue_links(job: &Arc<CrawlJob>, html: &str, page_url: &Url, parent_key: &str) {
    for link in job.discovery().extract_links(html, page_url) {
        job.enqueue(link.as_str(), Some(parent_key));
    }
}

/// Commits rendered content: dedupe by hash, then page-limit reserve,
/// then save
///
/// The save can still race another worker inserting the same hash; on
/// save failure the quota slot is released and the hash is re-checked so
/// the loser folds into the winner's page instead of failing the URL.
fn commit_content(
    job: &Arc<CrawlJob>,
    key: &str,
    page: RenderedPage,
    cached_metadata: Option<Option<serde_json::Value>>,
) -> PipelineOutcome {
    let hash = content_hash(&page.text);

    match job.store().get_page_by_content_hash(job.id(), &hash) {
        Ok(Some(existing)) => {
            return fold_into(job, existing.id, key);
        }
        Ok(None) => {}
        Err(e) => return PipelineOutcome::Failed(format!("dedupe lookup failed: {}", e)),
    }

    if !job.reserve_quota(key) {
        tracing::debug!(job = job.id(), url = %key, "page limit filled mid-flight");
        return PipelineOutcome::LimitDiscarded;
    }

    let metadata = match cached_metadata {
        Some(value) => value,
        None => page
            .metadata
            .as_ref()
            .filter(|m| !m.is_empty())
            .and_then(|m| serde_json::to_value(m).ok()),
    };

    let new_page = NewPage {
        job_id: job.id(),
        url: job.raw_url(key),
        canonical_url: key.to_string(),
        content: page.text,
        content_hash: hash.clone(),
        html: (!page.html.is_empty()).then_some(page.html),
        markdown: page.markdown,
        metadata,
        status: PageStatus::Success,
    };

    match job.store().save_page(new_page) {
        Ok(_) => PipelineOutcome::SavedUnique,
        Err(save_err) => {
            job.release_quota(key);
            // Unique-hash collision with a concurrent save, most likely.
            match job.store().get_page_by_content_hash(job.id(), &hash) {
                Ok(Some(existing)) => fold_into(job, existing.id, key),
                _ => PipelineOutcome::Failed(format!("save failed: {}", save_err)),
            }
        }
    }
}

fn fold_into(job: &Arc<CrawlJob>, page_id: i64, key: &str) -> PipelineOutcome {
    match job.store().append_alternate_url(page_id, key) {
        Ok(()) => {
            tracing::debug!(job = job.id(), url = %key, "duplicate content folded");
            PipelineOutcome::FoldedDuplicate
        }
        Err(e) => PipelineOutcome::Failed(format!("failed to record alternate URL: {}", e)),
    }
}
