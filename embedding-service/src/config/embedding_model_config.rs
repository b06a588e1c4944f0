use serde::{Deserialize, Serialize};

use crate::config::embedding_model::EmbeddingModel;
use crate::error_handler::{ConfigError, Result, validate_http_endpoint};

/// Default OpenAI API origin; `/v1/embeddings` is appended to it.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Default request timeout for one embeddings call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for the embeddings endpoint.
///
/// Keys are camelCase so a host can hand over the same object it would pass
/// to the OpenAI JS client (`baseURL`, `apiKey`, `organization`, `project`).
///
/// # Fields
///
/// - `base_url`: API origin without the `/v1` suffix.
/// - `api_key`: sent as `Authorization: Bearer ...` when present.
/// - `organization` / `project`: sent as `OpenAI-Organization` / `OpenAI-Project`.
/// - `model`: one of the supported [`EmbeddingModel`]s.
/// - `dimensions`: requested vector length, also used to verify responses.
/// - `timeout_secs`: client-side timeout per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbeddingModelConfig {
    #[serde(rename = "baseURL")]
    pub base_url: String,

    pub api_key: Option<String>,

    pub organization: Option<String>,

    pub project: Option<String>,

    #[serde(rename = "embeddingModel")]
    pub model: EmbeddingModel,

    #[serde(rename = "embeddingSize")]
    pub dimensions: usize,

    pub timeout_secs: Option<u64>,
}

impl Default for EmbeddingModelConfig {
    fn default() -> Self {
        let model = EmbeddingModel::default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            organization: None,
            project: None,
            model,
            dimensions: model.native_dimensions(),
            timeout_secs: None,
        }
    }
}

impl EmbeddingModelConfig {
    /// Full URL of the embeddings endpoint.
    pub fn embeddings_url(&self) -> String {
        format!("{}/v1/embeddings", self.base_url.trim().trim_end_matches('/'))
    }

    /// Checks endpoint scheme and that `dimensions` fits the model.
    ///
    /// # Errors
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<()> {
        validate_http_endpoint("openai.baseURL", &self.base_url)?;

        let max = self.model.native_dimensions();
        if self.dimensions == 0 || self.dimensions > max {
            return Err(ConfigError::DimensionsOutOfRange {
                model: self.model.as_str(),
                got: self.dimensions,
                max,
            }
            .into());
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidNumber {
                var: "openai.timeoutSecs",
                reason: "must be > 0",
            }
            .into());
        }
        Ok(())
    }
}
