//! Fetch workers: the fixed pool that turns identifiers into records.
//!
//! Each worker loops until the work channel is closed and drained (or the
//! run is cancelled), taking one identifier at a time:
//!
//! 1. cache hit → emit the cached record, no network call
//! 2. miss → up to `max_attempts` fetches with linear backoff between them
//! 3. empty image → unavailable: logged, not cached, not emitted, not retried
//! 4. usable record → cached, then emitted on the result channel
//!
//! Transient failures never leave the worker; an identifier that exhausts
//! its attempts is logged and dropped.

use std::sync::Arc;

use foodcrawl_common::Record;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cache::DedupCache;
use crate::fetcher::DetailFetcher;
use crate::retry::RetryPolicy;

/// Work channel receiver shared by the whole pool.
pub type WorkQueue = Arc<Mutex<mpsc::Receiver<String>>>;

/// Per-worker counters, summed by the completion watcher.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WorkerStats {
    pub processed: usize,
    pub cache_hits: usize,
    pub fetched: usize,
    pub unavailable: usize,
    pub failed: usize,
    pub fetch_attempts: usize,
    pub emitted: usize,
}

enum Resolution {
    Resolved(Record),
    Unavailable,
    Exhausted,
    Cancelled,
}

pub struct FetchWorker<F: ?Sized> {
    index: usize,
    fetcher: Arc<F>,
    cache: Arc<DedupCache>,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl<F> FetchWorker<F>
where
    F: DetailFetcher + ?Sized,
{
    pub fn new(
        index: usize,
        fetcher: Arc<F>,
        cache: Arc<DedupCache>,
        retry: RetryPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            index,
            fetcher,
            cache,
            retry,
            cancel,
        }
    }

    pub async fn run(self, queue: WorkQueue, results: mpsc::Sender<Record>) -> WorkerStats {
        let mut stats = WorkerStats::default();

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                id = next_id(&queue) => id,
            };
            let Some(id) = next else {
                break;
            };

            stats.processed += 1;
            let record = match self.resolve(&id, &mut stats).await {
                Resolution::Resolved(record) => record,
                Resolution::Unavailable | Resolution::Exhausted => continue,
                Resolution::Cancelled => break,
            };

            if results.send(record).await.is_err() {
                warn!(worker = self.index, id = %id, "Result channel closed, worker exiting");
                break;
            }
            stats.emitted += 1;
        }

        debug!(worker = self.index, ?stats, "Worker finished");
        stats
    }

    async fn resolve(&self, id: &str, stats: &mut WorkerStats) -> Resolution {
        if let Some(record) = self.cache.get(id) {
            debug!(worker = self.index, id, "Cache hit");
            stats.cache_hits += 1;
            return Resolution::Resolved(record);
        }

        let max = self.retry.max_attempts;
        for attempt in 1..=max {
            stats.fetch_attempts += 1;

            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Resolution::Cancelled,
                outcome = self.fetcher.fetch(id) => outcome,
            };

            match outcome {
                Ok(record) if record.is_available() => {
                    self.cache.put(id, record.clone());
                    stats.fetched += 1;
                    return Resolution::Resolved(record);
                }
                Ok(_) => {
                    info!(worker = self.index, id, "Record unavailable (no image), skipping");
                    stats.unavailable += 1;
                    return Resolution::Unavailable;
                }
                Err(e) => {
                    warn!(worker = self.index, id, attempt, max, error = %e, "Fetch attempt failed");
                }
            }

            if self.retry.has_attempts_left(attempt) {
                let delay = self.retry.backoff(attempt);
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return Resolution::Cancelled,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        error!(worker = self.index, id, attempts = max, "Failed to fetch details, giving up");
        stats.failed += 1;
        Resolution::Exhausted
    }
}

async fn next_id(queue: &WorkQueue) -> Option<String> {
    let mut rx = queue.lock().await;
    rx.recv().await
}
