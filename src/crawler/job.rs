//! Crawl job state machine
//!
//! One `CrawlJob` owns the entire mutable run state of a crawl: the FIFO
//! queue, the in-progress/completed/failed sets, hop depths, per-seed
//! capture counters, and the pause/cancel flags. All of it sits behind
//! one mutex; critical sections are short and never held across an
//! await, which is what makes the pairwise-disjointness of the tracking
//! sets and the exactly-once completion guarantee hold under any worker
//! count.

use crate::config::CrawlOptions;
use crate::crawler::progress::{ProgressBus, ProgressSnapshot};
use crate::discover::Discovery;
use crate::render::Renderer;
use crate::storage::{JobErrorRecord, JobPatch, JobStatus, PageStore};
use crate::url::{canonicalize, scope_seed};
use chrono::Utc;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use url::Url;

/// What a worker should do next, decided at loop top
#[derive(Debug)]
pub(crate) enum WorkerAction {
    /// Process this canonical URL (already moved into `in_progress`)
    Process(String),
    /// Nothing to do right now; sleep briefly and re-check
    Wait,
    /// Leave the loop
    Exit,
}

/// Result of running the fetch pipeline for one URL
#[derive(Debug)]
pub(crate) enum PipelineOutcome {
    /// A new unique page was persisted
    SavedUnique,
    /// Content matched an existing page; URL recorded as an alternate
    FoldedDuplicate,
    /// The seed's page limit filled up between dequeue and save
    LimitDiscarded,
    /// Terminal failure for this URL in this run
    Failed(String),
}

/// Mutable run state, guarded by the job mutex
///
/// Invariant: `queue`, `in_progress`, `completed`, and `failed` are
/// pairwise disjoint; a URL occupies exactly one of them, or none if
/// never admitted.
struct RunState {
    status: JobStatus,
    queue: VecDeque<String>,
    in_progress: HashSet<String>,
    completed: HashSet<String>,
    failed: HashSet<String>,
    /// canonical URL -> hop depth (0 = in scope)
    url_depth: HashMap<String, u32>,
    /// canonical URL -> owning canonical seed
    url_seed: HashMap<String, String>,
    /// canonical URL -> first raw spelling seen
    url_raw: HashMap<String, String>,
    /// canonical seed -> unique pages captured
    completed_per_seed: HashMap<String, u32>,
    paused: bool,
    cancelled: bool,
    active_workers: usize,
    completion_fired: bool,
    pages_processed: u64,
    pages_failed: u64,
}

impl RunState {
    fn new() -> Self {
        Self {
            status: JobStatus::Pending,
            queue: VecDeque::new(),
            in_progress: HashSet::new(),
            completed: HashSet::new(),
            failed: HashSet::new(),
            url_depth: HashMap::new(),
            url_seed: HashMap::new(),
            url_raw: HashMap::new(),
            completed_per_seed: HashMap::new(),
            paused: false,
            cancelled: false,
            active_workers: 0,
            completion_fired: false,
            pages_processed: 0,
            pages_failed: 0,
        }
    }

    fn pages_found(&self) -> u64 {
        (self.queue.len() + self.in_progress.len() + self.completed.len()) as u64
    }

    fn knows(&self, key: &str) -> bool {
        self.in_progress.contains(key)
            || self.completed.contains(key)
            || self.failed.contains(key)
            || self.queue.iter().any(|queued| queued == key)
    }
}

impl std::fmt::Debug for CrawlJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrawlJob")
            .field("id", &self.id)
            .field("canonical_seeds", &self.canonical_seeds)
            .finish_non_exhaustive()
    }
}

/// The state machine and queue owner for one crawl run
pub struct CrawlJob {
    id: i64,
    canonical_seeds: Vec<Url>,
    options: CrawlOptions,
    state: Mutex<RunState>,
    store: Arc<dyn PageStore>,
    discovery: Arc<dyn Discovery>,
    renderer: Arc<dyn Renderer>,
    progress: Arc<ProgressBus>,
    registry_slot: Arc<Mutex<Option<Arc<CrawlJob>>>>,
}

impl CrawlJob {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: i64,
        canonical_seeds: Vec<Url>,
        options: CrawlOptions,
        store: Arc<dyn PageStore>,
        discovery: Arc<dyn Discovery>,
        renderer: Arc<dyn Renderer>,
        progress: Arc<ProgressBus>,
        registry_slot: Arc<Mutex<Option<Arc<CrawlJob>>>>,
    ) -> Self {
        Self {
            id,
            canonical_seeds,
            options,
            state: Mutex::new(RunState::new()),
            store,
            discovery,
            renderer,
            progress,
            registry_slot,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn options(&self) -> &CrawlOptions {
        &self.options
    }

    pub(crate) fn store(&self) -> &Arc<dyn PageStore> {
        &self.store
    }

    pub(crate) fn discovery(&self) -> &Arc<dyn Discovery> {
        &self.discovery
    }

    pub(crate) fn renderer(&self) -> &Arc<dyn Renderer> {
        &self.renderer
    }

    // ===== Queue admission =====

    /// Admits a URL into the crawl, or silently no-ops
    ///
    /// No-op cases: the URL fails to canonicalize, is already known to
    /// any tracking set or the queue (idempotence), or falls outside
    /// every seed scope without an admissible external hop. In-scope
    /// URLs always enter at depth 0; external URLs inherit the parent's
    /// depth plus one, bounded by `max_external_hops`.
    pub fn enqueue(&self, raw_url: &str, parent: Option<&str>) {
        let canonical = match canonicalize(raw_url) {
            Ok(url) => url,
            Err(e) => {
                tracing::trace!("rejecting unparsable URL {:?}: {}", raw_url, e);
                return;
            }
        };
        let key = canonical.to_string();

        let mut st = self.state.lock().unwrap();
        if st.knows(&key) {
            return;
        }

        let admitted = if let Some(seed) = scope_seed(
            &canonical,
            &self.canonical_seeds,
            self.options.strict_path_matching,
        ) {
            Some((seed.to_string(), 0))
        } else if self.options.follow_external_links {
            parent.and_then(|parent_key| {
                let depth = st.url_depth.get(parent_key).copied().unwrap_or(0) + 1;
                if depth > self.options.max_external_hops {
                    return None;
                }
                st.url_seed
                    .get(parent_key)
                    .cloned()
                    .map(|seed| (seed, depth))
            })
        } else {
            None
        };

        let Some((seed, depth)) = admitted else {
            tracing::trace!("out of scope: {}", key);
            return;
        };

        st.url_depth.insert(key.clone(), depth);
        st.url_seed.insert(key.clone(), seed);
        st.url_raw
            .entry(key.clone())
            .or_insert_with(|| raw_url.trim().to_string());
        st.queue.push_back(key);
    }

    /// First raw spelling seen for a canonical URL
    pub(crate) fn raw_url(&self, key: &str) -> String {
        let st = self.state.lock().unwrap();
        st.url_raw.get(key).cloned().unwrap_or_else(|| key.to_string())
    }

    // ===== Lifecycle controls =====

    /// Marks the job as started, durably and in memory
    pub(crate) fn mark_in_progress(&self) -> Result<(), crate::storage::StorageError> {
        self.state.lock().unwrap().status = JobStatus::InProgress;
        self.store
            .update_job(self.id, &JobPatch::status(JobStatus::InProgress))
    }

    /// Pauses dequeuing; in-flight URLs finish normally
    pub fn pause(&self) {
        self.state.lock().unwrap().paused = true;
        tracing::info!(job = self.id, "crawl paused");
    }

    pub fn resume(&self) {
        self.state.lock().unwrap().paused = false;
        tracing::info!(job = self.id, "crawl resumed");
    }

    /// Requests cooperative cancellation; workers observe the flag at
    /// loop top and exit without forced aborts
    pub fn cancel(&self) {
        self.state.lock().unwrap().cancelled = true;
        tracing::info!(job = self.id, "crawl cancelled");
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.lock().unwrap().cancelled
    }

    // ===== Capacity accounting =====

    fn seed_has_capacity(&self, st: &RunState, seed: &str) -> bool {
        match self.options.page_limit_per_seed {
            None => true,
            Some(limit) => st.completed_per_seed.get(seed).copied().unwrap_or(0) < limit,
        }
    }

    /// True when every seed has met its configured page limit
    fn limits_met(&self, st: &RunState) -> bool {
        match self.options.page_limit_per_seed {
            None => false,
            Some(limit) => self.canonical_seeds.iter().all(|seed| {
                st.completed_per_seed
                    .get(&seed.to_string())
                    .copied()
                    .unwrap_or(0)
                    >= limit
            }),
        }
    }

    /// Final page-limit gate, checked immediately before a save commits
    ///
    /// Increments the seed's counter on success so concurrent workers
    /// racing toward the same limit cannot all pass; a failed save must
    /// hand the slot back via [`release_quota`](Self::release_quota).
    pub(crate) fn reserve_quota(&self, key: &str) -> bool {
        let mut st = self.state.lock().unwrap();
        let seed = st.url_seed.get(key).cloned().unwrap_or_default();
        let counter = st.completed_per_seed.entry(seed).or_insert(0);
        if let Some(limit) = self.options.page_limit_per_seed {
            if *counter >= limit {
                return false;
            }
        }
        *counter += 1;
        true
    }

    pub(crate) fn release_quota(&self, key: &str) {
        let mut st = self.state.lock().unwrap();
        let seed = st.url_seed.get(key).cloned().unwrap_or_default();
        if let Some(counter) = st.completed_per_seed.get_mut(&seed) {
            *counter = counter.saturating_sub(1);
        }
    }

    // ===== Worker coordination =====

    /// Records the pool size before workers start
    pub(crate) fn set_active_workers(&self, count: usize) {
        self.state.lock().unwrap().active_workers = count;
    }

    /// Decides the next step for a worker at the top of its loop
    ///
    /// An empty queue with siblings still in flight means wait, not
    /// exit: those siblings may yet discover links. Queued URLs whose
    /// seed has exhausted its page limit are discarded on the spot,
    /// since the limit can never un-fill and leaving them would wedge
    /// the FIFO head in multi-seed jobs.
    pub(crate) fn next_action(&self) -> WorkerAction {
        let mut st = self.state.lock().unwrap();

        if st.cancelled || self.limits_met(&st) {
            return WorkerAction::Exit;
        }
        if st.paused {
            return WorkerAction::Wait;
        }

        loop {
            match st.queue.pop_front() {
                None => {
                    return if st.in_progress.is_empty() {
                        WorkerAction::Exit
                    } else {
                        WorkerAction::Wait
                    };
                }
                Some(key) => {
                    let seed = st.url_seed.get(&key).cloned().unwrap_or_default();
                    if !self.seed_has_capacity(&st, &seed) {
                        tracing::debug!("dropping {} (page limit reached for {})", key, seed);
                        continue;
                    }
                    st.in_progress.insert(key.clone());
                    return WorkerAction::Process(key);
                }
            }
        }
    }

    /// Applies a pipeline outcome to the tracking sets and persists the
    /// refreshed counters
    pub(crate) fn settle(&self, key: &str, outcome: &PipelineOutcome) {
        let (found, processed, failed, error) = {
            let mut st = self.state.lock().unwrap();
            st.in_progress.remove(key);

            let mut error = None;
            match outcome {
                PipelineOutcome::SavedUnique => {
                    st.completed.insert(key.to_string());
                    st.pages_processed += 1;
                }
                PipelineOutcome::FoldedDuplicate => {
                    // The URL completed successfully; its content lives
                    // in another page's alternate list. Membership here
                    // keeps enqueue idempotent for re-discoveries.
                    st.completed.insert(key.to_string());
                }
                PipelineOutcome::LimitDiscarded => {}
                PipelineOutcome::Failed(message) => {
                    st.failed.insert(key.to_string());
                    st.pages_failed += 1;
                    error = Some(JobErrorRecord {
                        url: st.url_raw.get(key).cloned().unwrap_or_else(|| key.to_string()),
                        canonical_url: key.to_string(),
                        message: message.clone(),
                        timestamp: Utc::now().to_rfc3339(),
                    });
                }
            }
            (st.pages_found(), st.pages_processed, st.pages_failed, error)
        };

        if let Some(error) = error {
            if let Err(e) = self.store.append_job_error(self.id, &error) {
                tracing::warn!("failed to record error for {}: {}", key, e);
            }
        }
        if let Err(e) = self
            .store
            .update_job(self.id, &JobPatch::counters(found, processed, failed))
        {
            tracing::warn!("failed to persist counters for job {}: {}", self.id, e);
        }
    }

    /// Called once by each worker as it leaves its loop; the last one
    /// out runs completion exactly once
    pub(crate) fn worker_finished(self: &Arc<Self>) {
        let finish = {
            let mut st = self.state.lock().unwrap();
            st.active_workers = st.active_workers.saturating_sub(1);
            if st.active_workers == 0
                && !st.completion_fired
                && (st.queue.is_empty() || st.cancelled || self.limits_met(&st))
            {
                st.completion_fired = true;
                true
            } else {
                false
            }
        };
        if finish {
            self.finish();
        }
    }

    /// Completion routine: derives the terminal status, persists it,
    /// emits a final snapshot, and clears the registry slot
    fn finish(self: &Arc<Self>) {
        let (status, found, processed, failed) = {
            let mut st = self.state.lock().unwrap();
            let status = if st.cancelled {
                JobStatus::Interrupted
            } else if st.pages_failed > 0 && st.pages_processed == 0 {
                JobStatus::Failed
            } else if st.pages_failed > 0 {
                JobStatus::CompletedWithErrors
            } else {
                JobStatus::Completed
            };
            st.status = status;
            (status, st.pages_found(), st.pages_processed, st.pages_failed)
        };

        let patch = JobPatch {
            status: Some(status),
            pages_found: Some(found),
            pages_processed: Some(processed),
            pages_failed: Some(failed),
        };
        if let Err(e) = self.store.update_job(self.id, &patch) {
            tracing::error!("failed to persist terminal status for job {}: {}", self.id, e);
        }

        tracing::info!(
            job = self.id,
            %status,
            pages_processed = processed,
            pages_failed = failed,
            "crawl finished"
        );

        self.progress.emit(&self.snapshot());

        let mut slot = self.registry_slot.lock().unwrap();
        if slot.as_ref().map(|job| job.id) == Some(self.id) {
            *slot = None;
        }
    }

    // ===== Progress =====

    /// Derives a point-in-time snapshot from current run state
    pub fn snapshot(&self) -> ProgressSnapshot {
        let st = self.state.lock().unwrap();
        self.snapshot_locked(&st)
    }

    fn snapshot_locked(&self, st: &RunState) -> ProgressSnapshot {
        ProgressSnapshot {
            job_id: self.id,
            status: st.status,
            pages_found: st.pages_found(),
            pages_processed: st.pages_processed,
            pages_failed: st.pages_failed,
            queue_size: st.queue.len(),
            in_progress_urls: st.in_progress.iter().cloned().collect(),
        }
    }

    /// Emits a snapshot to subscribers; suppressed while paused
    pub(crate) fn report_progress(&self) {
        let snapshot = {
            let st = self.state.lock().unwrap();
            if st.paused {
                return;
            }
            self.snapshot_locked(&st)
        };
        self.progress.emit(&snapshot);
    }
}
