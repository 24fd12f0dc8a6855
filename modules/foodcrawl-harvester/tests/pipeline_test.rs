//! End-to-end harvest scenarios against the mock fetcher.
//!
//! Every run goes through the real dispatcher, worker pool, watcher and
//! collector. Tests that involve backoff run on a paused clock.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use foodcrawl_harvester::cache::DedupCache;
use foodcrawl_harvester::error::HarvestError;
use foodcrawl_harvester::pipeline::{HarvestPipeline, PipelineOptions};
use foodcrawl_harvester::retry::RetryPolicy;
use foodcrawl_harvester::sink::{CsvBatchSink, HEADER};
use foodcrawl_harvester::testing::{available, MemorySink, MockFetcher, MockResponse};

fn options(workers: usize, batch_size: usize) -> PipelineOptions {
    PipelineOptions {
        worker_count: workers,
        queue_factor: 2,
        batch_size,
        retry: RetryPolicy::new(3, Duration::from_secs(1)),
    }
}

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn fetcher_for(list: &[&str]) -> MockFetcher {
    list.iter().fold(MockFetcher::new(), |f, id| f.on_available(id))
}

#[tokio::test]
async fn five_ids_with_two_workers_fill_batches_of_two_two_one() {
    let all = ["a", "b", "c", "d", "e"];
    let fetcher = Arc::new(fetcher_for(&all));
    let pipeline = HarvestPipeline::new(fetcher, Arc::new(DedupCache::new()), options(2, 2));
    let sink = MemorySink::new();

    let stats = pipeline
        .run(ids(&all), sink.clone(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(sink.batch_sizes(), vec![2, 2, 1]);
    assert_eq!(stats.batch_sizes, vec![2, 2, 1]);
    assert_eq!(stats.records_written, 5);

    let mut written = sink.ids();
    written.sort();
    assert_eq!(written, ids(&all));
    assert!(!stats.cancelled);
}

#[tokio::test]
async fn csv_batches_share_the_same_header() {
    let all = ["a", "b", "c", "d", "e"];
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("results");
    let pipeline = HarvestPipeline::new(
        Arc::new(fetcher_for(&all)),
        Arc::new(DedupCache::new()),
        options(2, 2),
    );

    pipeline
        .run(ids(&all), CsvBatchSink::new(&out).unwrap(), CancellationToken::new())
        .await
        .unwrap();

    let mut rows_per_file = Vec::new();
    for index in 1..=3 {
        let path = CsvBatchSink::batch_path(&out, index);
        let mut reader = csv::Reader::from_path(&path).unwrap();
        let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(header, HEADER, "header of {}", path.display());
        rows_per_file.push(reader.records().count());
    }
    assert_eq!(rows_per_file, vec![2, 2, 1]);
    assert!(!CsvBatchSink::batch_path(&out, 4).exists());
}

#[tokio::test]
async fn record_without_image_is_never_written() {
    let fetcher = Arc::new(
        MockFetcher::new()
            .on_available("A")
            .on("B", vec![MockResponse::unavailable("B")]),
    );
    let cache = Arc::new(DedupCache::new());
    let pipeline = HarvestPipeline::new(fetcher.clone(), cache.clone(), options(2, 500));
    let sink = MemorySink::new();

    let stats = pipeline
        .run(ids(&["A", "B"]), sink.clone(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(sink.ids(), vec!["A"]);
    assert_eq!(stats.unavailable, 1);
    assert_eq!(fetcher.calls("B"), 1);
    assert!(cache.get("B").is_none());
}

#[tokio::test]
async fn repeated_ids_are_fetched_once_and_written_each_time() {
    let fetcher = Arc::new(fetcher_for(&["a", "b"]));
    let pipeline = HarvestPipeline::new(fetcher.clone(), Arc::new(DedupCache::new()), options(1, 500));
    let sink = MemorySink::new();

    let stats = pipeline
        .run(ids(&["a", "b", "a", "a"]), sink.clone(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(fetcher.calls("a"), 1);
    assert_eq!(fetcher.calls("b"), 1);
    assert_eq!(stats.cache_hits, 2);
    assert_eq!(sink.ids(), vec!["a", "b", "a", "a"]);
}

#[tokio::test]
async fn warm_cache_makes_no_network_calls() {
    let cache = Arc::new(DedupCache::new());
    cache.put("a", available("a"));
    cache.put("b", available("b"));

    let fetcher = Arc::new(MockFetcher::new());
    let pipeline = HarvestPipeline::new(fetcher.clone(), cache, options(3, 500));
    let sink = MemorySink::new();

    let stats = pipeline
        .run(ids(&["a", "b", "b"]), sink.clone(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(fetcher.total_calls(), 0);
    assert_eq!(stats.fetch_attempts, 0);
    assert_eq!(sink.ids().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn failing_id_is_attempted_max_attempts_times_with_linear_backoff() {
    let fetcher = Arc::new(
        MockFetcher::new()
            .on_available("ok")
            .on("bad", vec![MockResponse::status(503)]),
    );
    let pipeline = HarvestPipeline::new(fetcher.clone(), Arc::new(DedupCache::new()), options(2, 500));
    let sink = MemorySink::new();

    let stats = pipeline
        .run(ids(&["bad", "ok"]), sink.clone(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(fetcher.calls("bad"), 3);
    assert_eq!(
        fetcher.call_gaps("bad"),
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
    assert_eq!(stats.failed, 1);
    assert_eq!(sink.ids(), vec!["ok"]);
}

#[tokio::test(start_paused = true)]
async fn nothing_resolved_means_no_batches() {
    let fetcher = Arc::new(MockFetcher::new());
    let pipeline = HarvestPipeline::new(fetcher, Arc::new(DedupCache::new()), options(2, 500));
    let sink = MemorySink::new();

    let stats = pipeline
        .run(ids(&["x", "y"]), sink.clone(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.failed, 2);
    assert_eq!(stats.batches(), 0);
    assert!(sink.batches().is_empty());
}

#[tokio::test]
async fn empty_input_completes_without_output() {
    let fetcher = Arc::new(MockFetcher::new());
    let pipeline = HarvestPipeline::new(fetcher.clone(), Arc::new(DedupCache::new()), options(4, 500));
    let sink = MemorySink::new();

    let stats = pipeline
        .run(Vec::new(), sink.clone(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.ids_dispatched, 0);
    assert_eq!(fetcher.total_calls(), 0);
    assert!(sink.batches().is_empty());
}

#[tokio::test]
async fn sink_failure_aborts_the_run() {
    let all: Vec<String> = (0..50).map(|i| format!("id-{i}")).collect();
    let refs: Vec<&str> = all.iter().map(String::as_str).collect();
    let fetcher = Arc::new(fetcher_for(&refs));
    let pipeline = HarvestPipeline::new(fetcher.clone(), Arc::new(DedupCache::new()), options(2, 5));
    let sink = MemorySink::new().fail_open_at(2);

    let err = pipeline
        .run(all.clone(), sink.clone(), CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, HarvestError::Sink(_)));
    // The bounded channels cap how far workers can run ahead of the failed
    // sink: one full batch, the result buffer and one record per worker.
    assert!(
        fetcher.total_calls() <= 12,
        "workers kept fetching after the sink failed: {} calls",
        fetcher.total_calls()
    );
    assert!(fetcher.total_calls() < all.len());
    assert_eq!(sink.batch_sizes(), vec![5]);
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_early_and_keeps_emitted_records() {
    let all: Vec<String> = (0..20).map(|i| format!("id-{i}")).collect();
    let refs: Vec<&str> = all.iter().map(String::as_str).collect();
    let fetcher = Arc::new(fetcher_for(&refs).with_delay(Duration::from_secs(10)));
    let pipeline = HarvestPipeline::new(fetcher.clone(), Arc::new(DedupCache::new()), options(2, 500));
    let sink = MemorySink::new();
    let cancel = CancellationToken::new();

    let run = {
        let sink = sink.clone();
        let cancel = cancel.clone();
        let ids = all.clone();
        tokio::spawn(async move { pipeline.run(ids, sink, cancel).await })
    };

    tokio::time::sleep(Duration::from_secs(15)).await;
    cancel.cancel();
    let stats = run.await.unwrap().unwrap();

    assert!(stats.cancelled);
    assert_eq!(stats.records_written, 2);
    assert_eq!(sink.ids().len(), 2);
    assert!(fetcher.total_calls() < all.len());
}
