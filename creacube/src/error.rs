//! Error types for the I/O collaborators and the batch runner.
//!
//! The per-frame core never fails: an unseen cube or an unmatched frame is data.
//! Errors only come from reading inputs, loading the catalog, or a lost worker.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CreaCubeError {
    /// Reading or writing a file failed.
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The catalog is not valid JSON.
    #[error("failed to parse catalog JSON: {0}")]
    CatalogJson(#[from] serde_json::Error),
    /// The catalog is valid JSON but not shaped like a catalog.
    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),
    /// A string is not a `<Cube><axis><Cube>` connection code.
    #[error("invalid connection code {0:?}")]
    InvalidConnectionCode(String),
    /// A tracking export row could not be decoded.
    #[error("{origin}:{line}: {reason}")]
    MalformedRow {
        origin: String,
        line: usize,
        reason: String,
    },
    /// A pipeline setting is out of range.
    #[error("invalid setting {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
    /// A worker of the parallel runner went away before answering.
    #[error("annotation worker unavailable: {0}")]
    WorkerUnavailable(&'static str),
}

impl CreaCubeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CreaCubeError>;
