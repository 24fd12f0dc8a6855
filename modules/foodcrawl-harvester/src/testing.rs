// Test doubles for the harvest pipeline.
//
// - MockFetcher (DetailFetcher): scripted per-id responses, call log
// - MemorySink (BatchSink): batches kept in memory, failure injection
//
// Plus `available` / `unavailable` record helpers.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use foodcrawl_common::Record;
use tokio::time::Instant;

use crate::error::{FetchError, SinkError};
use crate::fetcher::DetailFetcher;
use crate::sink::BatchSink;

/// A record that passes the availability check.
pub fn available(id: &str) -> Record {
    Record {
        id: id.to_string(),
        name: format!("food {id}"),
        category: "test".to_string(),
        image: format!("{id}.png"),
        ..Default::default()
    }
}

/// A record with an empty image.
pub fn unavailable(id: &str) -> Record {
    Record {
        id: id.to_string(),
        name: format!("food {id}"),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MockResponse(Result<Record, FetchError>);

impl MockResponse {
    pub fn ok(record: Record) -> Self {
        Self(Ok(record))
    }

    pub fn unavailable(id: &str) -> Self {
        Self(Ok(unavailable(id)))
    }

    pub fn transport(message: &str) -> Self {
        Self(Err(FetchError::Transport(message.to_string())))
    }

    pub fn status(status: u16) -> Self {
        Self(Err(FetchError::Status {
            status,
            message: "mock".to_string(),
        }))
    }

    pub fn decode(message: &str) -> Self {
        Self(Err(FetchError::Decode(message.to_string())))
    }
}

/// Scripted fetcher. Each id has a queue of responses; once a queue is
/// empty the last response repeats. Unregistered ids fail with a
/// transport error every time.
pub struct MockFetcher {
    scripts: Mutex<HashMap<String, VecDeque<MockResponse>>>,
    last: Mutex<HashMap<String, MockResponse>>,
    calls: Mutex<HashMap<String, Vec<Instant>>>,
    delay: Duration,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            last: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            delay: Duration::ZERO,
        }
    }

    pub fn on(self, id: &str, responses: Vec<MockResponse>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(id.to_string(), responses.into());
        self
    }

    /// Shorthand for an id that always resolves to `available(id)`.
    pub fn on_available(self, id: &str) -> Self {
        self.on(id, vec![MockResponse::ok(available(id))])
    }

    /// Every fetch sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self, id: &str) -> usize {
        self.calls.lock().unwrap().get(id).map_or(0, Vec::len)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().map(Vec::len).sum()
    }

    /// Time between consecutive fetches of `id`.
    pub fn call_gaps(&self, id: &str) -> Vec<Duration> {
        let calls = self.calls.lock().unwrap();
        calls
            .get(id)
            .map(|times| times.windows(2).map(|w| w[1] - w[0]).collect())
            .unwrap_or_default()
    }

    fn next_response(&self, id: &str) -> MockResponse {
        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(id)
            .and_then(VecDeque::pop_front);

        let mut last = self.last.lock().unwrap();
        match scripted {
            Some(response) => {
                last.insert(id.to_string(), response.clone());
                response
            }
            None => last
                .get(id)
                .cloned()
                .unwrap_or_else(|| MockResponse::transport(&format!("no response for {id}"))),
        }
    }
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DetailFetcher for MockFetcher {
    async fn fetch(&self, id: &str) -> Result<Record, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_default()
            .push(Instant::now());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let MockResponse(result) = self.next_response(id);
        result.map(|mut record| {
            record.id = id.to_string();
            record
        })
    }
}

// ---------------------------------------------------------------------------
// MemorySink
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemorySinkInner {
    batches: Vec<(u32, Vec<Record>)>,
    open: Option<(u32, Vec<Record>)>,
    rows_written: usize,
}

/// In-memory batch sink. Clones share state, so a test can keep one handle
/// and give the other to the collector.
#[derive(Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<MemorySinkInner>>,
    fail_open_at: Option<u32>,
    fail_write_after: Option<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// `open_batch(index)` fails.
    pub fn fail_open_at(mut self, index: u32) -> Self {
        self.fail_open_at = Some(index);
        self
    }

    /// Every write after the first `rows` succeeds fails.
    pub fn fail_write_after(mut self, rows: usize) -> Self {
        self.fail_write_after = Some(rows);
        self
    }

    /// Closed batches, in order.
    pub fn batches(&self) -> Vec<Vec<Record>> {
        let inner = self.inner.lock().unwrap();
        inner.batches.iter().map(|(_, rows)| rows.clone()).collect()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches().iter().map(Vec::len).collect()
    }

    /// Ids of every row in closed batches, in write order.
    pub fn ids(&self) -> Vec<String> {
        self.batches()
            .into_iter()
            .flatten()
            .map(|r| r.id)
            .collect()
    }
}

impl BatchSink for MemorySink {
    fn open_batch(&mut self, index: u32) -> Result<(), SinkError> {
        if self.fail_open_at == Some(index) {
            return Err(SinkError::Open {
                index,
                message: "injected".to_string(),
            });
        }
        let mut inner = self.inner.lock().unwrap();
        if let Some(done) = inner.open.take() {
            inner.batches.push(done);
        }
        inner.open = Some((index, Vec::new()));
        Ok(())
    }

    fn write_row(&mut self, record: &Record) -> Result<(), SinkError> {
        let mut inner = self.inner.lock().unwrap();
        let index = inner.open.as_ref().map_or(0, |(i, _)| *i);
        if self
            .fail_write_after
            .is_some_and(|limit| inner.rows_written >= limit)
        {
            return Err(SinkError::Write {
                index,
                message: "injected".to_string(),
            });
        }
        let Some((_, rows)) = inner.open.as_mut() else {
            return Err(SinkError::Write {
                index,
                message: "no batch open".to_string(),
            });
        };
        rows.push(record.clone());
        inner.rows_written += 1;
        Ok(())
    }

    fn close_batch(&mut self) -> Result<(), SinkError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(done) = inner.open.take() {
            inner.batches.push(done);
        }
        Ok(())
    }
}
