//! Embedding abstraction.

use futures::future::BoxFuture;

use crate::errors::RecommendError;

/// Asynchronous embedding provider.
///
/// Implement this trait to plug in your own embedding backend. Calls for
/// different payloads must be independent: the pipeline runs many at once.
pub trait EmbeddingsProvider: Send + Sync {
    /// Produces an embedding vector for the given payload.
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, RecommendError>>;

    /// Length of the vectors this provider returns.
    fn dimensions(&self) -> usize;
}

pub mod openai;
