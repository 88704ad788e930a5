//! Error type shared by every stage of a counting run.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = TokfreakError> = std::result::Result<T, E>;

/// Every variant is fatal for the whole run: workers never retry and the
/// root never writes a partial table.
#[derive(Debug, Error)]
pub enum TokfreakError {
    /// Worker count, document count or scan limits are unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("document {title:?} not found at {path:?}")]
    DocumentNotFound { title: String, path: PathBuf },
    #[error("io error while processing {path:?}: {source}")]
    Io {
        source: std::io::Error,
        path: Option<PathBuf>,
    },
    #[error("invalid vocabulary: {0}")]
    InvalidVocabulary(String),
    /// No delimiter within the scan window after a raw range start.
    #[error("no token delimiter in {document:?} within {scanned} bytes after offset {offset}")]
    BoundaryNotFound {
        document: String,
        offset: u64,
        scanned: usize,
    },
    #[error("token in {document:?} at offset {offset} is longer than {limit} bytes")]
    TokenTooLong {
        document: String,
        offset: u64,
        limit: usize,
    },
    #[error("global offset {offset} is past the end of the corpus ({total} bytes)")]
    OffsetOutOfRange { offset: u64, total: u64 },
    /// Raised in a worker that stopped because a peer failed.
    #[error("aborted after a failure in another worker")]
    Aborted,
    #[error("worker {0} panicked")]
    WorkerPanicked(usize),
    #[error("internal error: {0}")]
    Internal(String),
}

impl TokfreakError {
    pub fn io(source: std::io::Error, path: Option<PathBuf>) -> Self {
        Self::Io { source, path }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}
