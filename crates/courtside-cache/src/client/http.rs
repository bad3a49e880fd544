//! HTTP layer: one request, status mapping.
//!
//! This is the ONLY place for status code handling. client/mod.rs never
//! interprets status codes. Retrying is left to [`crate::retry`].

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use reqwest::StatusCode;
use tracing::debug;

use crate::error::ProviderError;
use crate::key::ResourceKey;

/// HTTP backend for making requests (holds reqwest client and auth).
#[derive(Debug, Clone)]
pub(crate) struct HttpBackend {
    pub(crate) client: reqwest::Client,
    pub(crate) base_url: String,
    pub(crate) token: Option<String>,
}

impl HttpBackend {
    /// `{base}/{class}[/{id}]`
    pub(crate) fn url_for(&self, key: &ResourceKey) -> String {
        match key.id() {
            Some(id) => format!("{}/{}/{}", self.base_url, key.class(), id),
            None => format!("{}/{}", self.base_url, key.class()),
        }
    }

    /// GET the resource and return the body of a 2xx response.
    pub(crate) async fn get_body(&self, key: &ResourceKey) -> Result<String, ProviderError> {
        let url = self.url_for(key);
        debug!(url = %url, "requesting upstream resource");

        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request.send().await?;
        let status = response.status();

        match status.as_u16() {
            200..=299 => response.text().await.map_err(|e| ProviderError::Network {
                message: format!("failed to read response body: {}", e),
            }),

            401 | 403 => Err(ProviderError::Unauthorized {
                message: format!("upstream rejected credentials ({})", status),
            }),

            404 => Err(ProviderError::NotFound {
                key: key.to_string(),
            }),

            429 => {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .map(Duration::from_secs);

                Err(ProviderError::RateLimited { retry_after })
            }

            408 => Err(ProviderError::Network {
                message: status_message(status, response.text().await.ok()),
            }),

            400..=499 => Err(ProviderError::Rejected {
                status: status.as_u16(),
                message: status_message(status, response.text().await.ok()),
            }),

            _ => Err(ProviderError::Network {
                message: status_message(status, response.text().await.ok()),
            }),
        }
    }
}

fn status_message(status: StatusCode, body: Option<String>) -> String {
    match body.map(|b| b.trim().chars().take(200).collect::<String>()) {
        Some(body) if !body.is_empty() => format!("HTTP {}: {}", status.as_u16(), body),
        _ => format!("HTTP {}", status.as_u16()),
    }
}
