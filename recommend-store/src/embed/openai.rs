//! OpenAI embedding provider backed by `embedding-service`.

use embedding_service::OpenAiService;
use futures::future::BoxFuture;

use crate::{EmbeddingsProvider, RecommendError};

impl EmbeddingsProvider for OpenAiService {
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, RecommendError>> {
        Box::pin(async move { Ok(self.embeddings(text).await?) })
    }

    fn dimensions(&self) -> usize {
        OpenAiService::dimensions(self)
    }
}
