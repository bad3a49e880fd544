//! Engine configuration.
//!
//! Layered: built-in defaults, then an optional YAML file, then environment
//! variables. Everything is fixed once the engine is built.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::{ArtifactStore, FileStore};
use crate::client::HttpProvider;
use crate::error::{CacheError, CacheResult};
use crate::key::ResourceClass;
use crate::provider::StatsProvider;
use crate::refresh::RefreshJobConfig;
use crate::resolver::RefreshOrchestrator;
use crate::retry::{RetryPolicy, RetryingFetcher};
use crate::staleness::StalenessRules;

/// Upstream provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL; resources live at `{url}/{class}[/{id}]`.
    #[serde(default = "default_provider_url")]
    pub url: String,

    /// Bearer token.
    #[serde(default)]
    pub token: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

fn default_provider_url() -> String {
    "http://127.0.0.1:8080/v1".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            url: default_provider_url(),
            token: None,
            timeout_secs: default_request_timeout(),
        }
    }
}

/// Everything needed to build a [`RefreshOrchestrator`] and its refresh job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Store root; `None` means the platform cache directory.
    #[serde(default)]
    pub store_dir: Option<PathBuf>,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub staleness: StalenessRules,

    /// Total budget for one resolution in seconds, retries included.
    #[serde(default = "default_resolve_timeout")]
    pub resolve_timeout_secs: u64,

    #[serde(default)]
    pub refresh: RefreshJobConfig,

    /// Entries to prime the store with (see [`crate::seed`]).
    #[serde(default)]
    pub seed_file: Option<PathBuf>,
}

fn default_resolve_timeout() -> u64 {
    60
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store_dir: None,
            provider: ProviderConfig::default(),
            retry: RetryPolicy::default(),
            staleness: StalenessRules::default(),
            resolve_timeout_secs: default_resolve_timeout(),
            refresh: RefreshJobConfig::default(),
            seed_file: None,
        }
    }
}

impl EngineConfig {
    /// Read a YAML config file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> CacheResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CacheError::Config {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        serde_yaml::from_str(&content).map_err(|e| CacheError::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
        })
    }

    /// Defaults overridden by the environment.
    pub fn from_env() -> CacheResult<Self> {
        Self::default().apply_env()
    }

    /// Optional file, then the environment.
    pub fn load(path: Option<&Path>) -> CacheResult<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()
    }

    /// Apply environment overrides.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `COURTSIDE_PROVIDER_URL` | Upstream base URL |
    /// | `COURTSIDE_PROVIDER_TOKEN` | Bearer token |
    /// | `COURTSIDE_PROVIDER_TIMEOUT` | Per-request timeout in seconds |
    /// | `COURTSIDE_CACHE_DIR` | Store root |
    /// | `COURTSIDE_MAX_ATTEMPTS` | Upstream attempts per fetch |
    /// | `COURTSIDE_RESOLVE_TIMEOUT` | Resolve budget in seconds |
    /// | `COURTSIDE_TTL_<CLASS>` | TTL in seconds, e.g. `COURTSIDE_TTL_PLAYER_STATS` |
    ///
    /// Empty values are ignored; unparseable numbers are an error.
    pub fn apply_env(mut self) -> CacheResult<Self> {
        if let Some(url) = env_string("COURTSIDE_PROVIDER_URL") {
            self.provider.url = url;
        }
        if let Some(token) = env_string("COURTSIDE_PROVIDER_TOKEN") {
            self.provider.token = Some(token);
        }
        if let Some(timeout) = env_parse("COURTSIDE_PROVIDER_TIMEOUT")? {
            self.provider.timeout_secs = timeout;
        }
        if let Some(dir) = env_string("COURTSIDE_CACHE_DIR") {
            self.store_dir = Some(PathBuf::from(dir));
        }
        if let Some(attempts) = env_parse("COURTSIDE_MAX_ATTEMPTS")? {
            self.retry.max_attempts = attempts;
        }
        if let Some(timeout) = env_parse("COURTSIDE_RESOLVE_TIMEOUT")? {
            self.resolve_timeout_secs = timeout;
        }
        for class in ResourceClass::ALL {
            if let Some(secs) = env_parse::<u64>(&ttl_var(class))? {
                self.staleness = self.staleness.with_ttl(class, Duration::from_secs(secs));
            }
        }
        Ok(self)
    }

    pub fn with_store_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.store_dir = Some(dir.into());
        self
    }

    pub fn with_provider_url(mut self, url: impl Into<String>) -> Self {
        self.provider.url = url.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.provider.token = Some(token.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }

    /// File store at `store_dir` or the platform default.
    pub fn file_store(&self) -> CacheResult<FileStore> {
        match &self.store_dir {
            Some(dir) => Ok(FileStore::with_dir(dir)),
            None => FileStore::new(),
        }
    }

    /// Engine over the file store and the HTTP provider.
    pub fn build(&self) -> CacheResult<RefreshOrchestrator> {
        let store = self.file_store()?;
        let provider = HttpProvider::new(&self.provider)?;
        debug!(
            store = %store.root().display(),
            provider = provider.base_url(),
            "building engine"
        );
        Ok(self.build_with(Arc::new(store), Arc::new(provider)))
    }

    /// Engine over caller-supplied collaborators.
    pub fn build_with(
        &self,
        store: Arc<dyn ArtifactStore>,
        provider: Arc<dyn StatsProvider>,
    ) -> RefreshOrchestrator {
        RefreshOrchestrator::new(
            store,
            RetryingFetcher::new(provider, self.retry.clone()),
            self.staleness.clone(),
        )
        .with_resolve_timeout(self.resolve_timeout())
    }
}

fn ttl_var(class: ResourceClass) -> String {
    format!(
        "COURTSIDE_TTL_{}",
        class.as_str().to_ascii_uppercase().replace('-', "_")
    )
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> CacheResult<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env_string(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| CacheError::Config {
                message: format!("{}={:?}: {}", name, raw, e),
            }),
        None => Ok(None),
    }
}
