use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error_handler::ConfigError;

/// Embedding models accepted by the service.
///
/// Both are OpenAI `text-embedding-3` models, which support shortening the
/// output through the `dimensions` request field.
///
/// # Examples
///
/// ```
/// use embedding_service::EmbeddingModel;
///
/// let model: EmbeddingModel = "text-embedding-3-large".parse().unwrap();
/// assert_eq!(model.native_dimensions(), 3072);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmbeddingModel {
    /// `text-embedding-3-small`, 1536 native dimensions.
    #[default]
    #[serde(rename = "text-embedding-3-small")]
    TextEmbedding3Small,
    /// `text-embedding-3-large`, 3072 native dimensions.
    #[serde(rename = "text-embedding-3-large")]
    TextEmbedding3Large,
}

impl EmbeddingModel {
    /// Model identifier as sent on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            EmbeddingModel::TextEmbedding3Small => "text-embedding-3-small",
            EmbeddingModel::TextEmbedding3Large => "text-embedding-3-large",
        }
    }

    /// Largest `dimensions` value the model can return.
    pub fn native_dimensions(self) -> usize {
        match self {
            EmbeddingModel::TextEmbedding3Small => 1536,
            EmbeddingModel::TextEmbedding3Large => 3072,
        }
    }
}

impl fmt::Display for EmbeddingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmbeddingModel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "text-embedding-3-small" => Ok(EmbeddingModel::TextEmbedding3Small),
            "text-embedding-3-large" => Ok(EmbeddingModel::TextEmbedding3Large),
            other => Err(ConfigError::UnsupportedModel(other.to_string())),
        }
    }
}
