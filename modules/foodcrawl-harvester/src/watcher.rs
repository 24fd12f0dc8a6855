use foodcrawl_common::Record;
use futures::future::join_all;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::worker::WorkerStats;

/// Sum of every worker's counters, plus how many workers did not finish
/// cleanly.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WorkerTotals {
    pub workers: usize,
    pub panicked: usize,
    pub stats: WorkerStats,
}

impl WorkerTotals {
    fn absorb(&mut self, s: WorkerStats) {
        let t = &mut self.stats;
        t.processed += s.processed;
        t.cache_hits += s.cache_hits;
        t.fetched += s.fetched;
        t.unavailable += s.unavailable;
        t.failed += s.failed;
        t.fetch_attempts += s.fetch_attempts;
        t.emitted += s.emitted;
    }
}

/// Wait for every worker, then drop `results_tx`.
///
/// Workers hold clones of the result sender; this task holds the first one,
/// so the collector sees the channel close only after all workers have
/// returned. A panicked worker is counted and logged, never propagated.
pub async fn watch(
    handles: Vec<JoinHandle<WorkerStats>>,
    results_tx: mpsc::Sender<Record>,
) -> WorkerTotals {
    let mut totals = WorkerTotals {
        workers: handles.len(),
        ..Default::default()
    };

    for (index, joined) in join_all(handles).await.into_iter().enumerate() {
        match joined {
            Ok(stats) => totals.absorb(stats),
            Err(e) => {
                error!(worker = index, error = %e, "Worker task failed");
                totals.panicked += 1;
            }
        }
    }

    drop(results_tx);
    info!(workers = totals.workers, panicked = totals.panicked, "All workers finished");
    totals
}
