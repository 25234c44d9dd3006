//! Error types for summa-core.
//!
//! [`MapError`] is what the bounded mapper returns; [`SummaError`] covers the
//! CSV and JSON summarizers that run on top of it.

use std::path::PathBuf;

use thiserror::Error;

/// Outcome of a failed bounded map.
///
/// When several workers fail at about the same time, only the failure that
/// was recorded first is kept. Which index that is depends on scheduling and
/// is not deterministic; later failures are dropped.
#[derive(Debug, Error)]
pub enum MapError<E> {
    /// A worker returned an error for the item at `index`.
    #[error("worker failed on item {index}: {error}")]
    WorkerFailure { index: usize, error: E },
    /// The cancel flag was raised before every item was claimed.
    #[error("cancelled after {completed} of {total} items")]
    Cancelled { completed: usize, total: usize },
    /// The worker pool for a sync run could not be started.
    #[error("failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

impl<E> MapError<E> {
    /// Index of the failing item, if this is a worker failure.
    pub fn index(&self) -> Option<usize> {
        match self {
            MapError::WorkerFailure { index, .. } => Some(*index),
            MapError::Cancelled { .. } | MapError::Pool(_) => None,
        }
    }

    /// Unwrap the worker's own error, dropping the index.
    pub fn into_worker_error(self) -> Option<E> {
        match self {
            MapError::WorkerFailure { error, .. } => Some(error),
            MapError::Cancelled { .. } | MapError::Pool(_) => None,
        }
    }
}

/// Errors from reading and summarizing CSV/JSON inputs.
#[derive(Debug, Error)]
pub enum SummaError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid CSV in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("column '{column}' not found in header of {}", path.display())]
    MissingColumn { path: PathBuf, column: String },
    #[error("{}:{line}: column '{column}' is not a number: '{value}'", path.display())]
    InvalidNumber {
        path: PathBuf,
        line: u64,
        column: String,
        value: String,
    },
}

impl SummaError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SummaError::Io {
            path: path.into(),
            source,
        }
    }
}
