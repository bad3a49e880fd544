//! Error types for the cache engine and the upstream provider.

use std::time::Duration;

/// Failures reported by an upstream statistics provider.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// Upstream has no record for the key.
    #[error("not found upstream: {key}")]
    NotFound { key: String },

    /// Authentication failed or token invalid.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// Rate limit exceeded.
    #[error("rate limited: retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Upstream refused the request itself (4xx other than auth, 404, 408, 429).
    #[error("request rejected: {message}")]
    Rejected { status: u16, message: String },

    /// Network error, timeout, or 5xx.
    #[error("network error: {message}")]
    Network { message: String },

    /// Response body could not be decoded into a payload.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },
}

impl ProviderError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Network { .. })
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

/// Engine errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    /// Persistence I/O failure. Always surfaced to the caller.
    #[error("store error for {key}: {message}")]
    Store { key: String, message: String },

    /// A stored entry exists but cannot be trusted (bad digest or undecodable).
    #[error("corrupt cache entry for {key}: {message}")]
    Corrupt { key: String, message: String },

    /// Upstream fetch failed after exhausting retries.
    #[error("fetch failed for {key} after {attempts} attempt(s): {source}")]
    Fetch {
        key: String,
        attempts: u32,
        #[source]
        source: ProviderError,
    },

    /// Payload failed a plausibility rule.
    #[error("implausible {key}: {reason}")]
    Implausible { key: String, reason: String },

    /// Nothing valid to serve: no usable cached entry and fresh fetch failed.
    #[error("cannot resolve {key}: {reason}")]
    Resolution { key: String, reason: String },

    /// Malformed resource key.
    #[error("invalid resource key: {key} - {reason}")]
    InvalidKey { key: String, reason: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl CacheError {
    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidKey { .. } | Self::Config { .. } => 1,
            Self::Resolution { .. } => 3,
            Self::Fetch { .. } => 5,
            Self::Implausible { .. } => 4,
            Self::Store { .. } | Self::Corrupt { .. } => 6,
        }
    }

    pub(crate) fn store(key: impl ToString, message: impl Into<String>) -> Self {
        Self::Store {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// Result type for engine operations.
pub type CacheResult<T> = Result<T, CacheError>;
