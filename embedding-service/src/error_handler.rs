//! Unified error handling for `embedding-service`.
//!
//! This module exposes a single top-level error type [`AiEmbeddingError`] for the
//! whole library, and groups domain-specific errors in nested enums
//! ([`ConfigError`], [`ProviderError`]). Small helpers for reading/validating
//! environment variables are provided and return the unified [`Result<T>`] alias.
//!
//! All messages include the prefix `[Embedding Service]` to simplify attribution in logs.

use reqwest::StatusCode;
use thiserror::Error;

/* ------------------------------------------------------------------------- */
/* Public result alias                                                       */
/* ------------------------------------------------------------------------- */

/// Unified result alias for the entire crate.
pub type Result<T> = std::result::Result<T, AiEmbeddingError>;

/* ------------------------------------------------------------------------- */
/* Top-level error                                                           */
/* ------------------------------------------------------------------------- */

/// Top-level error for the `embedding-service` crate.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AiEmbeddingError {
    /// Configuration/validation errors (startup).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Upstream provider answered, but not with a usable embedding.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Underlying HTTP transport error, including client-side timeouts.
    #[error("[Embedding Service] transport error: {0}")]
    HttpTransport(#[from] reqwest::Error),
}

impl AiEmbeddingError {
    /// `true` when the request did not finish within the client timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, AiEmbeddingError::HttpTransport(e) if e.is_timeout())
    }
}

/* ------------------------------------------------------------------------- */
/* Config errors                                                             */
/* ------------------------------------------------------------------------- */

/// Error enum for environment/config-driven setup.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is missing or empty.
    #[error("[Embedding Service] missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// A number failed to parse (sizes, timeouts).
    #[error("[Embedding Service] invalid number in {var}: {reason}")]
    InvalidNumber {
        var: &'static str,
        reason: &'static str,
    },

    /// Value had the wrong format (e.g., invalid URL).
    #[error("[Embedding Service] invalid format in {var}: {reason}")]
    InvalidFormat {
        var: &'static str,
        reason: &'static str,
    },

    /// Model name is not one of the supported embedding models.
    #[error("[Embedding Service] unsupported embedding model: {0}")]
    UnsupportedModel(String),

    /// Requested dimensionality is zero or larger than the model supports.
    #[error("[Embedding Service] dimensions {got} out of range for {model} (max {max})")]
    DimensionsOutOfRange {
        model: &'static str,
        got: usize,
        max: usize,
    },

    /// A header value cannot be sent over HTTP.
    #[error("[Embedding Service] invalid header {name}: {reason}")]
    InvalidHeader { name: &'static str, reason: String },
}

/* ------------------------------------------------------------------------- */
/* Provider errors                                                           */
/* ------------------------------------------------------------------------- */

/// Upstream returned a response we could not turn into a vector.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Non-successful HTTP status.
    #[error("[Embedding Service] HTTP {status} from {url}: {snippet}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        /// Short, trimmed snippet of the response body.
        snippet: String,
    },

    /// Response payload could not be decoded as expected.
    #[error("[Embedding Service] decode error: {0}")]
    Decode(String),

    /// Provider returned a vector of unexpected length.
    #[error("[Embedding Service] embedding has {got} dimensions, expected {want}")]
    DimensionMismatch { got: usize, want: usize },
}

/// Maximum number of characters kept from an upstream body in errors/logs.
const SNIPPET_MAX_CHARS: usize = 256;

/// Collapses whitespace and trims a response body for logging.
pub fn make_snippet(body: &str) -> String {
    let compact = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if compact.chars().count() <= SNIPPET_MAX_CHARS {
        return compact;
    }
    let mut out: String = compact.chars().take(SNIPPET_MAX_CHARS).collect();
    out.push('…');
    out
}

/* ------------------------------------------------------------------------- */
/* Env helpers (return unified `Result<T>`)                                  */
/* ------------------------------------------------------------------------- */

/// Fetches a required, non-empty environment variable.
///
/// # Errors
/// Returns [`ConfigError::MissingVar`] if the variable is absent or empty.
pub fn must_env(name: &'static str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingVar(name).into()),
    }
}

/// Reads an optional, non-empty environment variable.
pub fn env_opt(name: &'static str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parses an optional `u64` from env (`Ok(None)` if unset/empty).
///
/// # Errors
/// Returns [`ConfigError::InvalidNumber`] if the variable is set but not a valid `u64`.
pub fn env_opt_u64(name: &'static str) -> Result<Option<u64>> {
    match env_opt(name) {
        Some(v) => v.trim().parse::<u64>().map(Some).map_err(|_| {
            AiEmbeddingError::from(ConfigError::InvalidNumber {
                var: name,
                reason: "expected u64",
            })
        }),
        None => Ok(None),
    }
}

/* ------------------------------------------------------------------------- */
/* Validation helpers                                                        */
/* ------------------------------------------------------------------------- */

/// Validates that an HTTP endpoint starts with `http://` or `https://`.
///
/// # Errors
/// Returns [`ConfigError::InvalidFormat`] when the scheme is missing.
pub fn validate_http_endpoint(var: &'static str, value: &str) -> Result<()> {
    let value = value.trim();
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidFormat {
            var,
            reason: "must start with http:// or https://",
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_is_compacted_and_clamped() {
        assert_eq!(make_snippet("  a\n\n b  c "), "a b c");

        let long = "x".repeat(SNIPPET_MAX_CHARS + 10);
        let s = make_snippet(&long);
        assert_eq!(s.chars().count(), SNIPPET_MAX_CHARS + 1);
        assert!(s.ends_with('…'));
    }

    #[test]
    fn endpoint_scheme_is_checked() {
        assert!(validate_http_endpoint("OPENAI_BASE_URL", "https://api.openai.com").is_ok());
        assert!(validate_http_endpoint("OPENAI_BASE_URL", "api.openai.com").is_err());
    }
}
