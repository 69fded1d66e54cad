//! Error types for the `docqa-rag` crate.

use thiserror::Error;

/// Errors that can occur while ingesting documents or answering queries.
#[derive(Debug, Error)]
pub enum RagError {
    /// A configuration value or call argument is out of range.
    ///
    /// Raised locally, before any external service is contacted.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The embedding service failed (rate limit, network fault, bad input).
    #[error("Embedding service error ({provider}): {message}")]
    EmbeddingService {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The answer generation service failed.
    #[error("Generation service error ({provider}): {message}")]
    GenerationService {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A vector does not have the dimensionality fixed by the index.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimensionality fixed at the first write.
        expected: usize,
        /// Dimensionality of the offending vector.
        actual: usize,
    },

    /// No index snapshot exists at the given location.
    #[error("No index found at '{location}', run ingest first")]
    IndexNotFound {
        /// The snapshot location that was probed.
        location: String,
    },

    /// An index snapshot exists but cannot be interpreted.
    #[error("Index at '{location}' is corrupt: {message}")]
    IndexCorrupt {
        /// The snapshot location.
        location: String,
        /// What was wrong with it.
        message: String,
    },

    /// A source document could not be read or parsed.
    #[error("Failed to load document '{source_name}': {message}")]
    DocumentLoad {
        /// Path or name of the source.
        source_name: String,
        /// A description of the failure.
        message: String,
    },

    /// Writing or reading snapshot files failed at the I/O level.
    #[error("Storage error at '{location}': {message}")]
    Storage {
        /// The path being written or read.
        location: String,
        /// A description of the failure.
        message: String,
    },
}

impl RagError {
    /// Whether the failure came from an external service and may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::EmbeddingService { .. } | Self::GenerationService { .. })
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
