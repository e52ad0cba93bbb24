//! Chart cache for a single certification run.
//!
//! Maps an identifier to the chart loaded for it so that every check of a
//! run observes the same instance and each identifier is fetched once.
//!
//! # Cache Structure
//!
//! ```text
//! {cache_dir}/chartcert/{key}/   # intended on-disk placement per entry
//! ```
//!
//! Only the in-memory map is populated today; the directory path is recorded
//! on each entry for persistence.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::error::{CertifyError, CertifyResult};
use crate::loader::LoadedChart;

/// Where entry directories are placed.
#[derive(Debug, Clone)]
enum CacheLocation {
    /// Platform cache directory, resolved on each insert.
    Platform,
    Dir(PathBuf),
    /// No addressable directory; inserts report a persistence error.
    Unavailable,
}

/// Cached chart entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub chart: LoadedChart,

    /// Intended on-disk directory; `None` when no cache directory could be
    /// resolved.
    pub path: Option<PathBuf>,
}

/// Chart cache keyed by identifier.
#[derive(Debug)]
pub struct ChartCache {
    location: CacheLocation,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ChartCache {
    /// Create a cache placed under the platform cache directory.
    pub fn new() -> Self {
        Self::with_location(CacheLocation::Platform)
    }

    /// Create a cache with a custom base directory.
    pub fn with_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self::with_location(CacheLocation::Dir(cache_dir.into()))
    }

    /// Create a cache with no on-disk placement.
    pub fn without_dir() -> Self {
        Self::with_location(CacheLocation::Unavailable)
    }

    fn with_location(location: CacheLocation) -> Self {
        Self {
            location,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Derive the filesystem-safe key for an identifier.
    ///
    /// Separator characters (`:`, `/`, `?`) become `_`. The mapping is
    /// deterministic but not reversible.
    pub fn make_key(uri: &str) -> String {
        uri.chars()
            .map(|c| match c {
                ':' | '/' | '?' => '_',
                other => other,
            })
            .collect()
    }

    /// Look up a previously added chart. Never fetches.
    pub fn get(&self, uri: &str) -> Option<LoadedChart> {
        self.lock()
            .get(&Self::make_key(uri))
            .map(|entry| entry.chart.clone())
    }

    /// Get the full entry, including its intended directory.
    pub fn entry(&self, uri: &str) -> Option<CacheEntry> {
        self.lock().get(&Self::make_key(uri)).cloned()
    }

    /// Record a chart for subsequent [`get`](Self::get) calls.
    ///
    /// Returns the entry's intended directory. When the base directory
    /// cannot be resolved the chart is still recorded in memory and a
    /// [`CertifyError::CachePersistence`] is returned.
    pub fn add(&self, uri: &str, chart: LoadedChart) -> CertifyResult<PathBuf> {
        let key = Self::make_key(uri);
        let path = self.base_dir().map(|dir| dir.join(&key));

        debug!(uri = %uri, key = %key, "caching chart");
        self.lock().insert(
            key,
            CacheEntry {
                chart,
                path: path.as_ref().ok().cloned(),
            },
        );

        path
    }

    /// Intended directory for an identifier, without touching the map.
    pub fn path_for(&self, uri: &str) -> CertifyResult<PathBuf> {
        Ok(self.base_dir()?.join(Self::make_key(uri)))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn base_dir(&self) -> CertifyResult<PathBuf> {
        match &self.location {
            CacheLocation::Dir(dir) => Ok(dir.clone()),
            CacheLocation::Platform => default_cache_dir(),
            CacheLocation::Unavailable => Err(CertifyError::CachePersistence {
                message: "cache has no on-disk location".to_string(),
            }),
        }
    }

    // Entries are only ever replaced whole, so a poisoned map is still
    // consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ChartCache {
    fn default() -> Self {
        Self::new()
    }
}

fn default_cache_dir() -> CertifyResult<PathBuf> {
    let base = dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".cache")))
        .ok_or_else(|| CertifyError::CachePersistence {
            message: "could not determine cache directory".to_string(),
        })?;

    Ok(base.join("chartcert"))
}
