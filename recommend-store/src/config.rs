//! Plugin options: Qdrant connection, embedding provider, query knobs.
//!
//! Options are validated once, up front, and then passed around as an
//! immutable value. JSON keys are camelCase so a host can forward the same
//! object it already has (`collectionName`, `embeddingSize`, `nodeType`, ...).

use std::collections::BTreeMap;
use std::time::Duration;

use embedding_service::EmbeddingModelConfig;
use embedding_service::error_handler::{env_opt, env_opt_u64, must_env};
use reqwest::header::{HeaderName, HeaderValue};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::errors::RecommendError;
use crate::qdrant_facade::CollectionSpec;
use crate::record::PayloadTransform;

pub const DEFAULT_COLLECTION: &str = "articles";
pub const DEFAULT_LIMIT: u64 = 5;
pub const DEFAULT_NODE_TYPE: &str = "MarkdownRemark";
pub const DEFAULT_EMBEDDING_CONCURRENCY: usize = 8;
pub const DEFAULT_EMBEDDING_TIMEOUT_SECS: u64 = 30;

/// Optimizer overrides applied when the collection is created.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizersOptions {
    /// Segment size (kB) above which vectors are memory-mapped.
    #[serde(default)]
    pub memmap_threshold: Option<u64>,
}

/// Qdrant connection and collection settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QdrantOptions {
    /// Qdrant gRPC endpoint, e.g. `http://localhost:6334`.
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Forces TLS regardless of the scheme in `url`.
    #[serde(default)]
    pub https: Option<bool>,
    /// Extra metadata sent with every request. Numbers and booleans are
    /// accepted and sent in their JSON text form.
    #[serde(default, deserialize_with = "header_values")]
    pub headers: BTreeMap<String, String>,
    /// Store vectors on disk instead of RAM.
    #[serde(default)]
    pub on_disk: Option<bool>,
    #[serde(default = "default_collection")]
    pub collection_name: String,
    #[serde(default)]
    pub optimizers_config: Option<OptimizersOptions>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl QdrantOptions {
    /// Connection to `url` with every other setting at its default.
    pub fn new_default(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
            https: None,
            headers: BTreeMap::new(),
            on_disk: None,
            collection_name: DEFAULT_COLLECTION.to_string(),
            optimizers_config: None,
            timeout_secs: None,
        }
    }

    /// `url` with the scheme forced to `https` when `https == Some(true)`.
    pub fn effective_url(&self) -> String {
        let url = self.url.trim();
        match (self.https, url.strip_prefix("http://")) {
            (Some(true), Some(rest)) => format!("https://{rest}"),
            _ => url.to_string(),
        }
    }
}

/// What the pipeline does with a node whose embedding failed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OnEmbeddingFailure {
    /// Leave the node out of the upsert.
    #[default]
    Skip,
    /// Upsert the node with an all-zero vector (see [`crate::Point::zeroed`]).
    UpsertEmpty,
}

/// Validated configuration threaded through every component.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginOptions {
    pub qdrant: QdrantOptions,
    #[serde(default)]
    pub openai: EmbeddingModelConfig,
    /// Maximum number of recommendations per node.
    #[serde(default = "default_limit")]
    pub limit: u64,
    /// Host node type that gets indexed and resolved.
    #[serde(default = "default_node_type")]
    pub node_type: String,
    #[serde(skip)]
    pub to_payload: PayloadTransform,
    /// Upper bound on in-flight embedding requests.
    #[serde(default = "default_concurrency")]
    pub embedding_concurrency: usize,
    #[serde(default = "default_embedding_timeout")]
    pub embedding_timeout_secs: u64,
    #[serde(default)]
    pub on_embedding_failure: OnEmbeddingFailure,
}

fn header_values<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeMap<String, String>, D::Error> {
    BTreeMap::<String, Value>::deserialize(d)?
        .into_iter()
        .map(|(name, value)| {
            let text = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => {
                    return Err(D::Error::custom(format!(
                        "qdrant.headers: value for '{name}' must be a string, number or boolean, actual: {other}"
                    )));
                }
            };
            Ok((name, text))
        })
        .collect()
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}
fn default_limit() -> u64 {
    DEFAULT_LIMIT
}
fn default_node_type() -> String {
    DEFAULT_NODE_TYPE.to_string()
}
fn default_concurrency() -> usize {
    DEFAULT_EMBEDDING_CONCURRENCY
}
fn default_embedding_timeout() -> u64 {
    DEFAULT_EMBEDDING_TIMEOUT_SECS
}

impl PluginOptions {
    /// Sane defaults for a given Qdrant endpoint.
    pub fn new_default(qdrant_url: impl Into<String>) -> Self {
        Self {
            qdrant: QdrantOptions::new_default(qdrant_url),
            openai: EmbeddingModelConfig::default(),
            limit: DEFAULT_LIMIT,
            node_type: DEFAULT_NODE_TYPE.to_string(),
            to_payload: PayloadTransform::default(),
            embedding_concurrency: DEFAULT_EMBEDDING_CONCURRENCY,
            embedding_timeout_secs: DEFAULT_EMBEDDING_TIMEOUT_SECS,
            on_embedding_failure: OnEmbeddingFailure::default(),
        }
    }

    /// Replaces the payload transform.
    pub fn with_payload_transform(mut self, to_payload: PayloadTransform) -> Self {
        self.to_payload = to_payload;
        self
    }

    /// Parses a JSON options object and validates it.
    ///
    /// # Errors
    /// `RecommendError::Config` when parsing or validation fails.
    pub fn from_json_str(json: &str) -> Result<Self, RecommendError> {
        let opts: PluginOptions =
            serde_json::from_str(json).map_err(|e| RecommendError::Config(vec![e.to_string()]))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Reads options from environment variables and validates them.
    ///
    /// `QDRANT_URL` is required; everything else falls back to defaults.
    /// `QDRANT_HEADERS` is a `name=value,name=value` list.
    ///
    /// # Errors
    /// `RecommendError::Config` listing the offending variables.
    pub fn from_env() -> Result<Self, RecommendError> {
        let config_err = |e: embedding_service::AiEmbeddingError| {
            RecommendError::Config(vec![e.to_string()])
        };

        let mut qdrant = QdrantOptions::new_default(must_env("QDRANT_URL").map_err(config_err)?);
        qdrant.api_key = env_opt("QDRANT_API_KEY");
        qdrant.https = env_opt_bool("QDRANT_HTTPS")?;
        qdrant.on_disk = env_opt_bool("QDRANT_ON_DISK")?;
        if let Some(name) = env_opt("QDRANT_COLLECTION") {
            qdrant.collection_name = name;
        }
        if let Some(raw) = env_opt("QDRANT_HEADERS") {
            qdrant.headers = parse_header_list(&raw)?;
        }
        if let Some(threshold) = env_opt_u64("QDRANT_MEMMAP_THRESHOLD").map_err(config_err)? {
            qdrant.optimizers_config = Some(OptimizersOptions {
                memmap_threshold: Some(threshold),
            });
        }
        qdrant.timeout_secs = env_opt_u64("QDRANT_TIMEOUT_SECS").map_err(config_err)?;

        let mut opts = PluginOptions::new_default(String::new());
        opts.qdrant = qdrant;
        opts.openai = embedding_service::config_openai_embedding().map_err(config_err)?;

        if let Some(limit) = env_opt_u64("RECOMMEND_LIMIT").map_err(config_err)? {
            opts.limit = limit;
        }
        if let Some(node_type) = env_opt("RECOMMEND_NODE_TYPE") {
            opts.node_type = node_type;
        }
        if let Some(n) = env_opt_u64("EMBEDDING_CONCURRENCY").map_err(config_err)? {
            opts.embedding_concurrency = usize::try_from(n).unwrap_or(usize::MAX);
        }
        if let Some(secs) = env_opt_u64("EMBEDDING_TIMEOUT_SECS").map_err(config_err)? {
            opts.embedding_timeout_secs = secs;
        }
        if let Some(policy) = env_opt("ON_EMBEDDING_FAILURE") {
            opts.on_embedding_failure = match policy.trim() {
                "skip" => OnEmbeddingFailure::Skip,
                "upsertEmpty" | "upsert_empty" => OnEmbeddingFailure::UpsertEmpty,
                other => {
                    return Err(RecommendError::Config(vec![format!(
                        "ON_EMBEDDING_FAILURE must be 'skip' or 'upsertEmpty', actual: {other}"
                    )]));
                }
            };
        }

        opts.validate()?;
        debug!(
            collection = %opts.qdrant.collection_name,
            node_type = %opts.node_type,
            limit = opts.limit,
            "plugin options loaded from env"
        );
        Ok(opts)
    }

    /// Validates every option and reports all problems at once.
    ///
    /// # Errors
    /// `RecommendError::Config` with one message per problem.
    pub fn validate(&self) -> Result<(), RecommendError> {
        let mut issues = Vec::new();

        let url = self.qdrant.url.trim();
        if url.is_empty() {
            issues.push("qdrant.url is empty".to_string());
        } else if !(url.starts_with("http://") || url.starts_with("https://")) {
            issues.push(format!("qdrant.url must start with http:// or https://, actual: {url}"));
        }
        if self.qdrant.collection_name.trim().is_empty() {
            issues.push("qdrant.collectionName is empty".to_string());
        }
        for (name, value) in &self.qdrant.headers {
            if HeaderName::from_bytes(name.as_bytes()).is_err() {
                issues.push(format!("qdrant.headers: invalid header name '{name}'"));
            }
            if HeaderValue::from_str(value).is_err() {
                issues.push(format!("qdrant.headers: invalid value for '{name}'"));
            }
        }
        if self.qdrant.timeout_secs == Some(0) {
            issues.push("qdrant.timeoutSecs must be > 0".to_string());
        }

        if let Err(e) = self.openai.validate() {
            issues.push(e.to_string());
        }

        if self.limit == 0 {
            issues.push("limit must be > 0".to_string());
        }
        if self.node_type.trim().is_empty() {
            issues.push("nodeType is empty".to_string());
        }
        if self.embedding_concurrency == 0 {
            issues.push("embeddingConcurrency must be > 0".to_string());
        }
        if self.embedding_timeout_secs == 0 {
            issues.push("embeddingTimeoutSecs must be > 0".to_string());
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(RecommendError::Config(issues))
        }
    }

    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.embedding_timeout_secs)
    }

    /// Collection layout derived from these options.
    pub fn collection_spec(&self) -> CollectionSpec {
        CollectionSpec {
            name: self.qdrant.collection_name.clone(),
            dimension: self.openai.dimensions,
            on_disk: self.qdrant.on_disk,
            memmap_threshold: self
                .qdrant
                .optimizers_config
                .as_ref()
                .and_then(|o| o.memmap_threshold),
        }
    }
}

fn env_opt_bool(name: &'static str) -> Result<Option<bool>, RecommendError> {
    match env_opt(name) {
        None => Ok(None),
        Some(v) => match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(RecommendError::Config(vec![format!(
                "{name} should be boolean, actual: {v}"
            )])),
        },
    }
}

fn parse_header_list(raw: &str) -> Result<BTreeMap<String, String>, RecommendError> {
    let mut out = BTreeMap::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (k, v) = pair.split_once('=').ok_or_else(|| {
            RecommendError::Config(vec![format!("QDRANT_HEADERS entry '{pair}' is not name=value")])
        })?;
        out.insert(k.trim().to_string(), v.trim().to_string());
    }
    Ok(out)
}
