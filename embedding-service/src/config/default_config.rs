//! Embedding config loaded from environment variables.
//!
//! # Environment variables
//!
//! - `OPENAI_BASE_URL`      = API origin (optional, default `https://api.openai.com`)
//! - `OPENAI_API_KEY`       = bearer token (optional for self-hosted gateways)
//! - `OPENAI_ORGANIZATION`  = `OpenAI-Organization` header (optional)
//! - `OPENAI_PROJECT`       = `OpenAI-Project` header (optional)
//! - `EMBEDDING_MODEL`      = `text-embedding-3-small` | `text-embedding-3-large` (optional)
//! - `EMBEDDING_SIZE`       = requested dimensions (optional, default = model size)
//! - `OPENAI_TIMEOUT_SECS`  = request timeout (optional)

use crate::{
    config::{
        embedding_model::EmbeddingModel,
        embedding_model_config::{DEFAULT_BASE_URL, EmbeddingModelConfig},
    },
    error_handler::{AiEmbeddingError, ConfigError, env_opt, env_opt_u64},
};

/// Constructs the OpenAI embedding config from environment.
///
/// # Errors
///
/// - [`ConfigError::UnsupportedModel`] if `EMBEDDING_MODEL` is unknown
/// - [`ConfigError::InvalidNumber`] if a numeric variable does not parse
/// - any error from [`EmbeddingModelConfig::validate`]
pub fn config_openai_embedding() -> Result<EmbeddingModelConfig, AiEmbeddingError> {
    let model = match env_opt("EMBEDDING_MODEL") {
        Some(m) => m.parse::<EmbeddingModel>()?,
        None => EmbeddingModel::default(),
    };

    let dimensions = match env_opt_u64("EMBEDDING_SIZE")? {
        Some(n) => usize::try_from(n).map_err(|_| ConfigError::InvalidNumber {
            var: "EMBEDDING_SIZE",
            reason: "does not fit usize",
        })?,
        None => model.native_dimensions(),
    };

    let cfg = EmbeddingModelConfig {
        base_url: env_opt("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        api_key: env_opt("OPENAI_API_KEY"),
        organization: env_opt("OPENAI_ORGANIZATION"),
        project: env_opt("OPENAI_PROJECT"),
        model,
        dimensions,
        timeout_secs: env_opt_u64("OPENAI_TIMEOUT_SECS")?,
    };
    cfg.validate()?;
    Ok(cfg)
}
