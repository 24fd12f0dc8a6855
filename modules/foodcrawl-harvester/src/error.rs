use std::path::PathBuf;

use dine4fit_client::Dine4FitError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarvestError>;

/// Run-level failures. Anything here aborts the harvest.
#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Output sink failed: {0}")]
    Sink(#[from] SinkError),

    #[error("Failed to read feed {}: {message}", path.display())]
    Feed { path: PathBuf, message: String },

    #[error("Cache snapshot error: {0}")]
    Snapshot(String),

    #[error("Pipeline task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for HarvestError {
    fn from(err: tokio::task::JoinError) -> Self {
        HarvestError::Task(err.to_string())
    }
}

/// The output batch could not be created or written.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("cannot open batch {index}: {message}")]
    Open { index: u32, message: String },

    #[error("cannot write batch {index}: {message}")]
    Write { index: u32, message: String },
}

/// A single fetch attempt failed. Always retried by the worker; never
/// surfaces past it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("transport: {0}")]
    Transport(String),

    #[error("status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("decode: {0}")]
    Decode(String),
}

impl From<Dine4FitError> for FetchError {
    fn from(err: Dine4FitError) -> Self {
        match err {
            Dine4FitError::Network(msg) => FetchError::Transport(msg),
            Dine4FitError::Api { status, message } => FetchError::Status { status, message },
            Dine4FitError::Decode(msg) => FetchError::Decode(msg),
        }
    }
}
