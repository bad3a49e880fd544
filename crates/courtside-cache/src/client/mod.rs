//! HTTP statistics provider.
//!
//! Public API: no status code knowledge. All HTTP/status mapping in http.rs,
//! all record normalization in decode.rs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::{CacheError, CacheResult, ProviderError};
use crate::key::ResourceKey;
use crate::provider::StatsProvider;
use crate::types::Payload;

mod decode;
mod http;

use http::HttpBackend;

const USER_AGENT_VALUE: &str = concat!("courtside/", env!("CARGO_PKG_VERSION"));

/// Provider speaking the result-set JSON format over HTTP.
#[derive(Debug, Clone)]
pub struct HttpProvider {
    http: HttpBackend,
}

impl HttpProvider {
    pub fn new(config: &ProviderConfig) -> CacheResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| CacheError::Config {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http: HttpBackend {
                client,
                base_url: config.url.trim_end_matches('/').to_string(),
                token: config.token.clone().filter(|t| !t.is_empty()),
            },
        })
    }

    pub fn base_url(&self) -> &str {
        &self.http.base_url
    }
}

#[async_trait]
impl StatsProvider for HttpProvider {
    async fn fetch(&self, key: &ResourceKey) -> Result<Payload, ProviderError> {
        let body = self.http.get_body(key).await?;
        let payload = decode::decode_payload(key, &body)?;
        debug!(key = %key, bytes = body.len(), "decoded upstream payload");
        Ok(payload)
    }

    fn provider_name(&self) -> &'static str {
        "http"
    }
}
