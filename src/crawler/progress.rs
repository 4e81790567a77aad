//! Progress reporting
//!
//! Snapshots are derived on demand from crawl job state, never tracked
//! separately. Workers push a snapshot to every subscribed sink after
//! each settled URL; sinks must not block for long or they stall the
//! reporting worker.

use crate::storage::JobStatus;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// A point-in-time view of a crawl job
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub job_id: i64,
    pub status: JobStatus,
    /// queue + in-progress + completed
    pub pages_found: u64,
    /// Unique pages captured
    pub pages_processed: u64,
    pub pages_failed: u64,
    pub queue_size: usize,
    pub in_progress_urls: Vec<String>,
}

type Sink = Box<dyn Fn(&ProgressSnapshot) + Send + Sync>;

/// Fan-out of progress snapshots to caller-supplied sinks
#[derive(Default)]
pub struct ProgressBus {
    next_id: AtomicU64,
    sinks: Mutex<HashMap<u64, Sink>>,
}

impl ProgressBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a sink; dropping the returned subscription removes it
    pub fn subscribe(
        self: &Arc<Self>,
        sink: impl Fn(&ProgressSnapshot) + Send + Sync + 'static,
    ) -> ProgressSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.sinks.lock().unwrap().insert(id, Box::new(sink));
        ProgressSubscription {
            id,
            bus: Arc::clone(self),
        }
    }

    pub(crate) fn emit(&self, snapshot: &ProgressSnapshot) {
        let sinks = self.sinks.lock().unwrap();
        for sink in sinks.values() {
            sink(snapshot);
        }
    }

    fn remove(&self, id: u64) {
        self.sinks.lock().unwrap().remove(&id);
    }
}

/// Handle to an active progress subscription
///
/// The sink stays registered for the lifetime of this handle.
pub struct ProgressSubscription {
    id: u64,
    bus: Arc<ProgressBus>,
}

impl ProgressSubscription {
    /// Explicitly removes the sink (Drop does the same)
    pub fn unsubscribe(self) {}
}

impl Drop for ProgressSubscription {
    fn drop(&mut self) {
        self.bus.remove(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn snapshot() -> ProgressSnapshot {
        ProgressSnapshot {
            job_id: 1,
            status: JobStatus::InProgress,
            pages_found: 3,
            pages_processed: 2,
            pages_failed: 0,
            queue_size: 1,
            in_progress_urls: vec![],
        }
    }

    #[test]
    fn test_emit_reaches_all_sinks() {
        let bus = Arc::new(ProgressBus::new());
        let hits = Arc::new(AtomicUsize::new(0));

        let h1 = hits.clone();
        let _sub1 = bus.subscribe(move |_| {
            h1.fetch_add(1, Ordering::SeqCst);
        });
        let h2 = hits.clone();
        let _sub2 = bus.subscribe(move |_| {
            h2.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit(&snapshot());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unsubscribe_removes_sink() {
        let bus = Arc::new(ProgressBus::new());
        let hits = Arc::new(AtomicUsize::new(0));

        let h = hits.clone();
        let sub = bus.subscribe(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        sub.unsubscribe();

        bus.emit(&snapshot());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_drop_removes_sink() {
        let bus = Arc::new(ProgressBus::new());
        let hits = Arc::new(AtomicUsize::new(0));
        {
            let h = hits.clone();
            let _sub = bus.subscribe(move |_| {
                h.fetch_add(1, Ordering::SeqCst);
            });
        }
        bus.emit(&snapshot());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
