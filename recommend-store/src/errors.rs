//! Unified error types for the crate.

use std::time::Duration;

use thiserror::Error;

/// Top-level error for recommend-store operations.
///
/// Index failures carry the stage that failed (`collection check`,
/// `createCollection`, `upsert`, `recommend`) so a build log names it.
#[derive(Debug, Error)]
pub enum RecommendError {
    /// Options failed validation; every problem found is listed.
    #[error("invalid plugin options: {}", .0.join("; "))]
    Config(Vec<String>),

    /// I/O or filesystem errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing / serialization errors.
    #[error("parse error: {0}")]
    Parse(String),

    /// Embedding provider failed for one payload.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Embedding call did not settle in time.
    #[error("embedding timed out after {0:?}")]
    EmbeddingTimeout(Duration),

    /// Mismatch between a vector and the collection dimension.
    #[error("vector size mismatch: got {got}, want {want}")]
    VectorSizeMismatch { got: usize, want: usize },

    /// Existence check of the collection failed.
    #[error("collection check failed for '{collection}': {reason}")]
    CollectionCheck { collection: String, reason: String },

    /// Collection creation failed or was not acknowledged.
    #[error("createCollection failed for '{collection}': {reason}")]
    CreateCollection { collection: String, reason: String },

    /// Batched upsert failed.
    #[error("upsert failed for '{collection}': {reason}")]
    Upsert { collection: String, reason: String },

    /// Recommend query failed.
    #[error("recommend failed for '{collection}': {reason}")]
    Recommend { collection: String, reason: String },

    /// Host node lookup failed.
    #[error("node lookup failed: {0}")]
    Lookup(String),

    /// Qdrant client errors outside a pipeline stage (e.g. client build).
    #[error("qdrant error: {0}")]
    Qdrant(String),
}

impl From<serde_json::Error> for RecommendError {
    fn from(e: serde_json::Error) -> Self {
        RecommendError::Parse(e.to_string())
    }
}

impl From<embedding_service::AiEmbeddingError> for RecommendError {
    fn from(e: embedding_service::AiEmbeddingError) -> Self {
        RecommendError::Embedding(e.to_string())
    }
}
