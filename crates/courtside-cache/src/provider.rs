//! Upstream provider seam.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::key::ResourceKey;
use crate::types::Payload;

/// One fetch attempt against the upstream source.
///
/// Implementations make exactly one upstream call per invocation; retrying is
/// the caller's job.
#[async_trait]
pub trait StatsProvider: Send + Sync {
    async fn fetch(&self, key: &ResourceKey) -> Result<Payload, ProviderError>;

    fn provider_name(&self) -> &'static str;
}
