//! Harvest pipeline wiring.
//!
//! ```text
//! dispatcher ─► work channel ─► N fetch workers ─► result channel ─► collector ─► sink
//!                                    │                  ▲
//!                               dedup cache        watcher drops the
//!                                                  last sender
//! ```
//!
//! Work channel capacity is `worker_count × queue_factor`; result channel
//! capacity is `worker_count`. Both are bounded, so a slow sink throttles
//! the workers and busy workers throttle the dispatcher.

use std::sync::Arc;
use std::time::Instant;

use foodcrawl_common::Config;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::cache::DedupCache;
use crate::collector::ResultCollector;
use crate::dispatcher::dispatch;
use crate::error::Result;
use crate::fetcher::DetailFetcher;
use crate::retry::RetryPolicy;
use crate::sink::BatchSink;
use crate::stats::HarvestStats;
use crate::watcher::watch;
use crate::worker::FetchWorker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub worker_count: usize,
    pub queue_factor: usize,
    pub batch_size: usize,
    pub retry: RetryPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            worker_count: foodcrawl_common::config::DEFAULT_WORKERS,
            queue_factor: foodcrawl_common::config::DEFAULT_QUEUE_FACTOR,
            batch_size: foodcrawl_common::config::DEFAULT_BATCH_SIZE,
            retry: RetryPolicy::default(),
        }
    }
}

impl From<&Config> for PipelineOptions {
    fn from(config: &Config) -> Self {
        Self {
            worker_count: config.worker_count,
            queue_factor: config.queue_factor,
            batch_size: config.batch_size,
            retry: RetryPolicy::from(config),
        }
    }
}

pub struct HarvestPipeline<F: ?Sized> {
    fetcher: Arc<F>,
    cache: Arc<DedupCache>,
    options: PipelineOptions,
}

impl<F> HarvestPipeline<F>
where
    F: DetailFetcher + ?Sized + 'static,
{
    pub fn new(fetcher: Arc<F>, cache: Arc<DedupCache>, options: PipelineOptions) -> Self {
        Self {
            fetcher,
            cache,
            options,
        }
    }

    /// Run every identifier through the pool and into `sink`.
    ///
    /// Returns once the dispatcher, all workers and the collector have
    /// finished. Cancelling `cancel` stops dispatch and makes workers exit
    /// after their current step; records already emitted are still written
    /// and the last batch is closed. A sink failure cancels the rest of the
    /// run and is returned as the error.
    pub async fn run<S>(
        &self,
        ids: Vec<String>,
        sink: S,
        cancel: CancellationToken,
    ) -> Result<HarvestStats>
    where
        S: BatchSink + 'static,
    {
        let started = Instant::now();
        let cancel = cancel.child_token();
        let ids_total = ids.len();
        let worker_count = self.options.worker_count.max(1);
        let work_capacity = worker_count * self.options.queue_factor.max(1);

        info!(
            ids = ids_total,
            workers = worker_count,
            work_capacity,
            batch_size = self.options.batch_size,
            max_attempts = self.options.retry.max_attempts,
            cached = self.cache.len(),
            "Starting harvest"
        );

        let (work_tx, work_rx) = mpsc::channel::<String>(work_capacity);
        let (result_tx, result_rx) = mpsc::channel(worker_count);

        let collector = tokio::spawn(
            ResultCollector::new(sink, self.options.batch_size).run(result_rx),
        );

        let dispatcher = tokio::spawn(dispatch(ids, work_tx, cancel.clone()));

        let queue = Arc::new(Mutex::new(work_rx));
        let handles = (0..worker_count)
            .map(|index| {
                let worker = FetchWorker::new(
                    index,
                    self.fetcher.clone(),
                    self.cache.clone(),
                    self.options.retry,
                    cancel.clone(),
                );
                tokio::spawn(worker.run(queue.clone(), result_tx.clone()))
            })
            .collect();
        drop(queue);

        let watcher = tokio::spawn(watch(handles, result_tx));

        let report = match collector.await? {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "Sink failed, aborting harvest");
                cancel.cancel();
                // Workers see a closed result channel and the token; let them unwind.
                let _ = watcher.await;
                let _ = dispatcher.await;
                return Err(e.into());
            }
        };

        let workers = watcher.await?;
        let dispatched = dispatcher.await?;

        let mut stats = HarvestStats::assemble(ids_total, dispatched, workers, report);
        stats.cancelled = cancel.is_cancelled();
        stats.elapsed = started.elapsed();

        info!(
            records = stats.records_written,
            batches = stats.batches(),
            failed = stats.failed,
            unavailable = stats.unavailable,
            cancelled = stats.cancelled,
            "Harvest finished"
        );
        Ok(stats)
    }
}
