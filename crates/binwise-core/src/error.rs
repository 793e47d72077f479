use std::time::Duration;
use thiserror::Error;

/// A convenience `Result` alias using [`BinwiseError`].
pub type BinwiseResult<T> = Result<T, BinwiseError>;

/// Top-level error type shared by every Binwise crate.
///
/// Each variant names the collaborator or artifact that failed, so callers can
/// tell an unreachable graph apart from a corrupt snapshot without parsing
/// messages.
#[derive(Error, Debug)]
pub enum BinwiseError {
    /// The graph store could not be reached, timed out, or rejected a query.
    #[error("Graph store unavailable: {0}")]
    StoreUnavailable(String),

    /// The embedding service failed.
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// The generative completion service failed or returned no content.
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// A persisted index snapshot is unreadable or its two files disagree.
    #[error("Index corrupt: {0}")]
    IndexCorrupt(String),

    /// A vector's length does not match the index dimension.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of the index.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },

    /// Caller-supplied input is malformed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration is missing or invalid.
    #[error("Config error: {0}")]
    Config(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure modes of the embedding service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingError {
    /// The service throttled the request; worth retrying after a delay.
    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited {
        /// Server-suggested delay, when provided.
        retry_after: Option<Duration>,
    },

    /// Any non-retryable service failure: transport, status, or malformed body.
    #[error("service error: {0}")]
    Service(String),

    /// The text was empty or too long to embed.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl EmbeddingError {
    /// Whether the error is transient and the call may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// A failed classification, tagged with the pipeline stage that failed.
///
/// The resolver never downgrades an error: every variant wraps the original
/// [`BinwiseError`] from the collaborator.
#[derive(Error, Debug)]
pub enum ClassifyError {
    /// An exact lookup against the graph store failed.
    #[error("lookup failed: {0}")]
    LookupFailed(#[source] BinwiseError),

    /// The object name could not be embedded.
    #[error("embedding failed: {0}")]
    EmbeddingFailed(#[source] BinwiseError),

    /// The similarity search over the vector index failed.
    #[error("retrieval failed: {0}")]
    RetrievalFailed(#[source] BinwiseError),

    /// The generative fallback failed.
    #[error("generation failed: {0}")]
    GenerationFailed(#[source] BinwiseError),
}

impl ClassifyError {
    /// Short, stable name of the failed stage.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::LookupFailed(_) => "lookup",
            Self::EmbeddingFailed(_) => "embedding",
            Self::RetrievalFailed(_) => "retrieval",
            Self::GenerationFailed(_) => "generation",
        }
    }

    /// The underlying collaborator error.
    pub fn cause(&self) -> &BinwiseError {
        match self {
            Self::LookupFailed(e)
            | Self::EmbeddingFailed(e)
            | Self::RetrievalFailed(e)
            | Self::GenerationFailed(e) => e,
        }
    }
}
