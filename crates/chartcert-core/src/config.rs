//! Loader configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Certifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertifierConfig {
    /// Request timeout in seconds for remote charts.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Upper bound on the size of a fetched chart archive.
    #[serde(default = "default_max_chart_bytes")]
    pub max_chart_bytes: u64,

    /// Base directory for cache entries. Resolved from the platform cache
    /// directory when unset.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

fn default_timeout() -> u64 {
    30
}

fn default_max_chart_bytes() -> u64 {
    64 * 1024 * 1024
}

impl Default for CertifierConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            max_chart_bytes: default_max_chart_bytes(),
            cache_dir: None,
        }
    }
}

impl CertifierConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `CHARTCERT_HTTP_TIMEOUT` | Request timeout in seconds (default: 30) |
    /// | `CHARTCERT_MAX_CHART_BYTES` | Maximum archive size (default: 64 MiB) |
    /// | `CHARTCERT_CACHE_DIR` | Cache base directory |
    pub fn from_env() -> Self {
        Self {
            timeout_secs: std::env::var("CHARTCERT_HTTP_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_timeout),
            max_chart_bytes: std::env::var("CHARTCERT_MAX_CHART_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_max_chart_bytes),
            cache_dir: std::env::var_os("CHARTCERT_CACHE_DIR").map(PathBuf::from),
        }
    }

    /// Set the request timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the maximum archive size.
    pub fn with_max_chart_bytes(mut self, bytes: u64) -> Self {
        self.max_chart_bytes = bytes;
        self
    }

    /// Set the cache base directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
