//! Result collector: the single consumer of resolved records.
//!
//! It is the only owner of the sink, so batches need no locking. Sink calls
//! are synchronous; the CSV sink buffers rows, so they stay short.

use foodcrawl_common::Record;
use tokio::sync::mpsc;
use tracing::info;

use crate::error::SinkError;
use crate::sink::BatchSink;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectorReport {
    pub records: usize,
    pub batches: u32,
    /// Rows per batch, in batch order.
    pub batch_sizes: Vec<usize>,
}

pub struct ResultCollector<S> {
    sink: S,
    batch_size: usize,
}

impl<S: BatchSink> ResultCollector<S> {
    pub fn new(sink: S, batch_size: usize) -> Self {
        Self {
            sink,
            batch_size: batch_size.max(1),
        }
    }

    /// Drain `rx` until every sender is gone.
    ///
    /// The first record opens batch 1; a record arriving when the open batch
    /// is full closes it, opens the next one and lands there. The last batch
    /// is closed even when partial.
    pub async fn run(
        mut self,
        mut rx: mpsc::Receiver<Record>,
    ) -> Result<CollectorReport, SinkError> {
        let mut report = CollectorReport::default();
        let mut in_batch = 0usize;

        while let Some(record) = rx.recv().await {
            if report.batches == 0 || in_batch >= self.batch_size {
                if report.batches > 0 {
                    self.sink.close_batch()?;
                    report.batch_sizes.push(in_batch);
                }
                report.batches += 1;
                self.sink.open_batch(report.batches)?;
                in_batch = 0;
            }

            self.sink.write_row(&record)?;
            in_batch += 1;
            report.records += 1;
            info!(id = %record.id, count = report.records, "Saved product details");
        }

        if report.batches > 0 {
            self.sink.close_batch()?;
            report.batch_sizes.push(in_batch);
        }

        Ok(report)
    }
}
