use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EvalError>;

/// Errors raised while resolving embeddings or scoring them.
#[derive(Debug, Error)]
pub enum EvalError {
    /// The provider was unreachable, rejected the request, or sent back garbage.
    #[error("embedding provider failed: {0}")]
    Provider(String),

    #[error("embedding provider timed out after {secs}s")]
    ProviderTimeout { secs: u64 },

    /// The persisted cache could not be written.
    #[error("cache file {path}: {source}")]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    /// Cosine similarity is undefined for a zero-magnitude vector.
    #[error("zero-magnitude vector passed to cosine similarity")]
    DegenerateVector,

    #[error("unknown metric {0:?} (expected euclidean, manhattan, cosine, negative-inner-product)")]
    UnknownMetric(String),
}
