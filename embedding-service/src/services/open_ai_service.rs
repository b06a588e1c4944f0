//! OpenAI embeddings client.
//!
//! Minimal, non-streaming client around `POST {baseURL}/v1/embeddings`.
//! One request per input; the caller decides how many run concurrently.
//!
//! Constructor validation:
//! - `cfg.base_url` must start with http:// or https://
//! - `cfg.dimensions` must fit the selected model
//! - API key, organization and project must be valid header values
//!
//! Errors are normalized via unified error types in `error_handler`.

use std::time::{Duration, Instant};

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::{
    config::embedding_model_config::{DEFAULT_TIMEOUT_SECS, EmbeddingModelConfig},
    error_handler::{AiEmbeddingError, ConfigError, ProviderError, make_snippet},
};

const ORGANIZATION_HEADER: &str = "openai-organization";
const PROJECT_HEADER: &str = "openai-project";

/// Thin client for the OpenAI embeddings API.
///
/// Internally keeps a preconfigured `reqwest::Client` (timeout + default
/// headers), so it is cheap to share by reference across tasks.
#[derive(Debug)]
pub struct OpenAiService {
    client: reqwest::Client,
    cfg: EmbeddingModelConfig,
    url_embeddings: String,
}

impl OpenAiService {
    /// Creates a new [`OpenAiService`] from the given config.
    ///
    /// # Errors
    /// - [`AiEmbeddingError::Config`] if the config is invalid or a header
    ///   value cannot be encoded
    /// - [`AiEmbeddingError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: EmbeddingModelConfig) -> Result<Self, AiEmbeddingError> {
        cfg.validate()?;

        let timeout = Duration::from_secs(cfg.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        if let Some(key) = &cfg.api_key {
            headers.insert(
                header::AUTHORIZATION,
                header_value("Authorization", &format!("Bearer {key}"))?,
            );
        }
        if let Some(org) = &cfg.organization {
            headers.insert(
                HeaderName::from_static(ORGANIZATION_HEADER),
                header_value("OpenAI-Organization", org)?,
            );
        }
        if let Some(project) = &cfg.project {
            headers.insert(
                HeaderName::from_static(PROJECT_HEADER),
                header_value("OpenAI-Project", project)?,
            );
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        let url_embeddings = cfg.embeddings_url();

        info!(
            model = %cfg.model,
            dimensions = cfg.dimensions,
            endpoint = %url_embeddings,
            timeout_secs = timeout.as_secs(),
            "OpenAiService initialized"
        );

        Ok(Self {
            client,
            cfg,
            url_embeddings,
        })
    }

    /// Expected length of every returned vector.
    pub fn dimensions(&self) -> usize {
        self.cfg.dimensions
    }

    /// Retrieves a single embeddings vector via `/v1/embeddings`.
    ///
    /// # Errors
    /// - [`ProviderError::HttpStatus`] for non-2xx responses
    /// - [`AiEmbeddingError::HttpTransport`] for client/network failures and timeouts
    /// - [`ProviderError::Decode`] if the JSON cannot be parsed or `data` is empty
    /// - [`ProviderError::DimensionMismatch`] if the vector has the wrong length
    pub async fn embeddings(&self, input: &str) -> Result<Vec<f32>, AiEmbeddingError> {
        let started = Instant::now();
        let body = EmbeddingsRequest {
            model: self.cfg.model.as_str(),
            input,
            dimensions: self.cfg.dimensions,
        };

        debug!(
            model = %self.cfg.model,
            input_len = input.len(),
            "POST {}", self.url_embeddings
        );

        let resp = self
            .client
            .post(&self.url_embeddings)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_embeddings.clone();
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);

            error!(
                %status,
                %url,
                %snippet,
                model = %self.cfg.model,
                latency_ms = started.elapsed().as_millis(),
                "OpenAI /v1/embeddings returned non-success status"
            );

            return Err(ProviderError::HttpStatus {
                status,
                url,
                snippet,
            }
            .into());
        }

        let out: EmbeddingsResponse = match resp.json().await {
            Ok(v) => v,
            Err(e) => {
                error!(
                    error = %e,
                    model = %self.cfg.model,
                    latency_ms = started.elapsed().as_millis(),
                    "failed to decode /v1/embeddings response"
                );
                return Err(ProviderError::Decode(format!(
                    "serde error: {e}; expected `data[0].embedding`"
                ))
                .into());
            }
        };

        let first = out
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Decode("empty `data` in embeddings response".into()))?;

        if first.embedding.len() != self.cfg.dimensions {
            return Err(ProviderError::DimensionMismatch {
                got: first.embedding.len(),
                want: self.cfg.dimensions,
            }
            .into());
        }

        debug!(
            model = %self.cfg.model,
            latency_ms = started.elapsed().as_millis(),
            "embeddings completed"
        );

        Ok(first.embedding)
    }
}

fn header_value(name: &'static str, value: &str) -> Result<HeaderValue, AiEmbeddingError> {
    HeaderValue::from_str(value).map_err(|e| {
        ConfigError::InvalidHeader {
            name,
            reason: e.to_string(),
        }
        .into()
    })
}

/* ===========================================================================
HTTP payloads
======================================================================== */

/// Request body for `/v1/embeddings`.
#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a str,
    dimensions: usize,
}

/// Response body for `/v1/embeddings`.
#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::embedding_model::EmbeddingModel;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cfg_for(server: &MockServer) -> EmbeddingModelConfig {
        EmbeddingModelConfig {
            base_url: server.uri(),
            api_key: Some("sk-test".into()),
            organization: Some("org-1".into()),
            project: Some("proj-1".into()),
            model: EmbeddingModel::TextEmbedding3Small,
            dimensions: 3,
            timeout_secs: Some(5),
        }
    }

    #[tokio::test]
    async fn sends_model_input_dimensions_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("authorization", "Bearer sk-test"))
            .and(header("openai-organization", "org-1"))
            .and(header("openai-project", "proj-1"))
            .and(body_json(json!({
                "model": "text-embedding-3-small",
                "input": "{\"body\":\"hello\"}",
                "dimensions": 3
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list",
                "data": [{ "object": "embedding", "index": 0, "embedding": [0.1, 0.2, 0.3] }],
                "model": "text-embedding-3-small"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let svc = OpenAiService::new(cfg_for(&server)).unwrap();
        let v = svc.embeddings("{\"body\":\"hello\"}").await.unwrap();
        assert_eq!(v, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn non_success_status_is_a_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let svc = OpenAiService::new(cfg_for(&server)).unwrap();
        let err = svc.embeddings("x").await.unwrap_err();
        match err {
            AiEmbeddingError::Provider(ProviderError::HttpStatus { status, snippet, .. }) => {
                assert_eq!(status.as_u16(), 429);
                assert_eq!(snippet, "rate limited");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn wrong_length_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "embedding": [1.0] }]
            })))
            .mount(&server)
            .await;

        let svc = OpenAiService::new(cfg_for(&server)).unwrap();
        let err = svc.embeddings("x").await.unwrap_err();
        assert!(matches!(
            err,
            AiEmbeddingError::Provider(ProviderError::DimensionMismatch { got: 1, want: 3 })
        ));
    }

    #[tokio::test]
    async fn empty_data_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .mount(&server)
            .await;

        let svc = OpenAiService::new(cfg_for(&server)).unwrap();
        let err = svc.embeddings("x").await.unwrap_err();
        assert!(matches!(err, AiEmbeddingError::Provider(ProviderError::Decode(_))));
    }
}
