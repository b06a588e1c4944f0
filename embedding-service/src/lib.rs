//! Embedding client for OpenAI-compatible `/v1/embeddings` endpoints.
//!
//! - [`OpenAiService`] turns one payload string into one vector.
//! - [`EmbeddingModelConfig`] carries endpoint, credentials, model and size.
//! - [`AiEmbeddingError`] is the single error type of the crate.

pub mod config {
    pub mod default_config;
    pub mod embedding_model;
    pub mod embedding_model_config;
}
pub mod error_handler;
pub mod services {
    pub mod open_ai_service;
}

pub use config::default_config::config_openai_embedding;
pub use config::embedding_model::EmbeddingModel;
pub use config::embedding_model_config::EmbeddingModelConfig;
pub use error_handler::{AiEmbeddingError, ConfigError, ProviderError};
pub use services::open_ai_service::OpenAiService;
