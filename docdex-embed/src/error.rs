//! Error types for the embedding layer.

/// Result type for embedding operations.
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Errors from embedding providers and answer generation.
///
/// Batch-level failures abort the operation that issued them (an index build
/// or a single query); the caller decides whether to retry. Configuration
/// errors surface at provider creation time.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// Provider configuration was invalid (unknown model, missing key, ...)
    #[error("invalid provider configuration: {message}")]
    InvalidConfig { message: String },

    /// The embedding backend returned the wrong number or shape of vectors
    #[error("provider returned {actual} embeddings for {expected} inputs")]
    CountMismatch { expected: usize, actual: usize },

    /// Remote endpoint failure (connection, timeout, non-2xx status)
    #[error("embedding request failed: {source}")]
    Request {
        #[from]
        source: reqwest::Error,
    },

    /// IO errors when reading model files
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Async task join errors
    #[error("async task failed: {source}")]
    AsyncTask {
        #[from]
        source: tokio::task::JoinError,
    },

    /// Errors from the local inference backend
    #[error("embedding backend error: {source}")]
    Backend {
        #[from]
        source: anyhow::Error,
    },
}

impl EmbedError {
    /// Configuration error with a custom message.
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
