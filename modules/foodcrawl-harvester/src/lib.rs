pub mod cache;
pub mod collector;
pub mod dispatcher;
pub mod error;
pub mod feed;
pub mod fetcher;
pub mod pipeline;
pub mod retry;
pub mod sink;
pub mod stats;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod watcher;
pub mod worker;
