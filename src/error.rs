//! Error type shared by the loader, reducer and feature store.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChurnError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to open event log {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed event on a 1-based line of the log
    #[error("invalid event on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("feature store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("dataset contains no events")]
    EmptyDataset,

    #[error("column '{0}' not found in feature table")]
    UnknownColumn(String),

    #[error("feature table shape mismatch: {0}")]
    Shape(String),
}

pub type Result<T> = std::result::Result<T, ChurnError>;
