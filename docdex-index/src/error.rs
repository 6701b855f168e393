//! Error types for index construction, persistence, and search.

use docdex_embed::EmbedError;
use thiserror::Error;

/// Errors from the in-memory vector index and its on-disk snapshot format.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A vector's dimension did not match the index dimension.
    #[error("dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// An index cannot be built with zero-length vectors.
    #[error("vector dimension must be non-zero")]
    InvalidDimension,

    /// The snapshot triple on disk is incomplete (some files present, some missing).
    #[error("incomplete snapshot: {present} present but {missing} missing")]
    TripleMismatch { present: String, missing: String },

    /// A snapshot file exists but cannot be decoded.
    #[error("corrupt snapshot: {reason}")]
    CorruptSnapshot { reason: String },

    #[error("snapshot I/O failed")]
    Io(#[from] std::io::Error),

    #[error("snapshot sidecar is not valid JSON")]
    Json(#[from] serde_json::Error),
}

/// Errors from a full index build.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The document root contained no extractable text files.
    #[error("no indexable documents found under the document root")]
    NoDocuments,

    /// Another build is already running; the current index is untouched.
    #[error("an index build is already in progress")]
    BuildInProgress,

    #[error("embedding failed")]
    Embedding(#[from] EmbedError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("metadata store update failed")]
    Metadata(#[source] anyhow::Error),
}

/// Errors from query-time operations.
#[derive(Debug, Error)]
pub enum SearchError {
    /// No index has been built or loaded yet.
    #[error("no index available; build or load one first")]
    NoIndex,

    /// The query embedding's dimension does not match the index.
    #[error("query dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("query embedding failed")]
    Embedding(#[from] EmbedError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("metadata lookup failed")]
    Metadata(#[source] anyhow::Error),
}
