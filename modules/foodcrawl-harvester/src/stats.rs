use std::path::PathBuf;
use std::time::Duration;

use crate::collector::CollectorReport;
use crate::watcher::WorkerTotals;

/// Stats from one harvest run.
#[derive(Debug, Default, Clone)]
pub struct HarvestStats {
    pub ids_total: usize,
    pub ids_dispatched: usize,
    pub cache_hits: usize,
    pub fetched: usize,
    pub unavailable: usize,
    pub failed: usize,
    pub fetch_attempts: usize,
    pub records_written: usize,
    pub batch_sizes: Vec<usize>,
    pub workers_panicked: usize,
    pub cancelled: bool,
    pub elapsed: Duration,
    /// Filled in by callers that know where batches land.
    pub batch_files: Vec<PathBuf>,
}

impl HarvestStats {
    pub(crate) fn assemble(
        ids_total: usize,
        ids_dispatched: usize,
        workers: WorkerTotals,
        report: CollectorReport,
    ) -> Self {
        let w = workers.stats;
        Self {
            ids_total,
            ids_dispatched,
            cache_hits: w.cache_hits,
            fetched: w.fetched,
            unavailable: w.unavailable,
            failed: w.failed,
            fetch_attempts: w.fetch_attempts,
            records_written: report.records,
            batch_sizes: report.batch_sizes,
            workers_panicked: workers.panicked,
            ..Default::default()
        }
    }

    pub fn batches(&self) -> usize {
        self.batch_sizes.len()
    }
}

impl std::fmt::Display for HarvestStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Harvest Run Complete ===")?;
        if self.cancelled {
            writeln!(f, "(cancelled before completion)")?;
        }
        writeln!(f, "IDs in feed:        {}", self.ids_total)?;
        writeln!(f, "IDs dispatched:     {}", self.ids_dispatched)?;
        writeln!(f, "Cache hits:         {}", self.cache_hits)?;
        writeln!(f, "Fetched:            {}", self.fetched)?;
        writeln!(f, "Unavailable:        {}", self.unavailable)?;
        writeln!(f, "Failed:             {}", self.failed)?;
        writeln!(f, "Fetch attempts:     {}", self.fetch_attempts)?;
        writeln!(f, "Records written:    {}", self.records_written)?;
        writeln!(f, "Elapsed:            {:.1}s", self.elapsed.as_secs_f64())?;
        if self.workers_panicked > 0 {
            writeln!(f, "Workers panicked:   {}", self.workers_panicked)?;
        }
        writeln!(f, "\nBatches: {}", self.batches())?;
        if self.batch_files.is_empty() {
            for (i, rows) in self.batch_sizes.iter().enumerate() {
                writeln!(f, "  #{}: {} rows", i + 1, rows)?;
            }
        } else {
            for (path, rows) in self.batch_files.iter().zip(&self.batch_sizes) {
                writeln!(f, "  {}: {} rows", path.display(), rows)?;
            }
        }
        Ok(())
    }
}
