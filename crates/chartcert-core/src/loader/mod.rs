//! Chart loader: resolves an identifier to a parsed chart.
//!
//! Public API: no status code knowledge. All HTTP/status mapping in http.rs.
//!
//! Accepted identifiers:
//! - `http://...`, `https://...` → archive fetched over HTTP
//! - `file:///abs/path` → local archive or chart directory
//! - `relative/or/absolute/path` → same as `file`
//!
//! Every successful load is recorded in the [`ChartCache`]; later loads of
//! the same identifier are served from it without touching the network or
//! the filesystem.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::ChartCache;
use crate::chart::{self, Chart, ChartError};
use crate::config::CertifierConfig;
use crate::error::{CertifyError, CertifyResult};

mod http;

use http::HttpFetcher;

/// Where a loaded chart came from.
#[derive(Debug, Clone)]
pub enum ChartSource {
    /// Absolute local path (archive file or chart directory).
    Local(PathBuf),

    /// Remote archive; the raw bytes are kept for tools that need a file.
    Remote { url: String, archive: Arc<Vec<u8>> },
}

/// A parsed chart plus its origin. Cheap to clone; every clone shares the
/// same [`Chart`].
#[derive(Debug, Clone)]
pub struct LoadedChart {
    pub chart: Arc<Chart>,
    pub source: ChartSource,
}

impl LoadedChart {
    pub fn new(chart: Chart, source: ChartSource) -> Self {
        Self {
            chart: Arc::new(chart),
            source,
        }
    }

    /// Resolved local path, if the chart was loaded from disk.
    pub fn local_path(&self) -> Option<&Path> {
        match &self.source {
            ChartSource::Local(path) => Some(path),
            ChartSource::Remote { .. } => None,
        }
    }
}

/// Cancellation handle threaded through loads.
///
/// Clones share state; cancelling any clone cancels them all.
#[derive(Debug, Clone)]
pub struct Cancellation {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Cancellation {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            // Sender lives as long as any clone of self; unreachable in practice.
            std::future::pending::<()>().await;
        }
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

/// Transport target for an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Remote(Url),
    Local(PathBuf),
}

/// Chart loader bound to one cache.
#[derive(Debug)]
pub struct ChartLoader {
    cache: Arc<ChartCache>,
    http: HttpFetcher,
    /// Per-key guards so concurrent first loads fetch once.
    inflight: InflightMap,
}

impl ChartLoader {
    /// Create a loader with a fresh cache placed per `config.cache_dir`.
    pub fn new(config: CertifierConfig) -> CertifyResult<Self> {
        let cache = match &config.cache_dir {
            Some(dir) => ChartCache::with_dir(dir),
            None => ChartCache::new(),
        };
        Self::with_cache(config, Arc::new(cache))
    }

    pub fn with_cache(config: CertifierConfig, cache: Arc<ChartCache>) -> CertifyResult<Self> {
        Ok(Self {
            cache,
            http: HttpFetcher::new(&config)?,
            inflight: Mutex::new(HashMap::new()),
        })
    }

    pub fn from_env() -> CertifyResult<Self> {
        Self::new(CertifierConfig::from_env())
    }

    pub fn cache(&self) -> &Arc<ChartCache> {
        &self.cache
    }

    /// Load the chart named by `uri`, consulting the cache first.
    pub async fn load_from_uri(&self, uri: &str) -> CertifyResult<LoadedChart> {
        self.load_from_uri_with_cancel(uri, &Cancellation::new())
            .await
    }

    /// Like [`load_from_uri`](Self::load_from_uri), aborting with
    /// [`CertifyError::Cancelled`] once `cancel` fires. An in-flight request
    /// is dropped together with its connection.
    pub async fn load_from_uri_with_cancel(
        &self,
        uri: &str,
        cancel: &Cancellation,
    ) -> CertifyResult<LoadedChart> {
        if cancel.is_cancelled() {
            return Err(CertifyError::Cancelled {
                uri: uri.to_string(),
            });
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(uri = %uri, "chart load cancelled");
                Err(CertifyError::Cancelled { uri: uri.to_string() })
            }
            result = self.load_once(uri) => result,
        }
    }

    async fn load_once(&self, uri: &str) -> CertifyResult<LoadedChart> {
        if let Some(hit) = self.cache.get(uri) {
            debug!(uri = %uri, "chart cache hit");
            return Ok(hit);
        }

        let guard = self.flight_guard(uri);
        let _release = FlightRelease {
            inflight: &self.inflight,
            key: ChartCache::make_key(uri),
            guard: Arc::clone(&guard),
        };
        let _permit = guard.lock().await;

        // Another task may have finished the load while we waited.
        if let Some(hit) = self.cache.get(uri) {
            debug!(uri = %uri, "chart cache hit after wait");
            return Ok(hit);
        }

        debug!(uri = %uri, "chart cache miss");
        let loaded = self.fetch(uri).await?;
        info!(
            uri = %uri,
            chart = %loaded.chart.name(),
            version = %loaded.chart.version(),
            "chart loaded"
        );

        if let Err(e) = self.cache.add(uri, loaded.clone()) {
            warn!(uri = %uri, error = %e, "failed to place chart in cache");
            return Err(e);
        }

        Ok(loaded)
    }

    fn flight_guard(&self, uri: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut inflight = self
            .inflight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        inflight
            .entry(ChartCache::make_key(uri))
            .or_default()
            .clone()
    }

    async fn fetch(&self, uri: &str) -> CertifyResult<LoadedChart> {
        match resolve_target(uri)? {
            Target::Remote(url) => {
                let bytes = Arc::new(self.http.fetch(uri, &url).await?);
                let archive = Arc::clone(&bytes);
                let chart = run_blocking(uri, move || chart::load_archive(Cursor::new(&bytes[..])))
                    .await?;
                Ok(LoadedChart::new(
                    chart,
                    ChartSource::Remote {
                        url: url.to_string(),
                        archive,
                    },
                ))
            }
            Target::Local(path) => {
                let path = absolutize(uri, &path)?;
                ensure_present(uri, path.try_exists())?;
                let chart_path = path.clone();
                let chart = run_blocking(uri, move || chart::load_path(&chart_path)).await?;
                Ok(LoadedChart::new(chart, ChartSource::Local(path)))
            }
        }
    }
}

type InflightMap = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// Drops the per-key guard once its load finishes, fails or is cancelled.
/// Later arrivals are served by the cache or start a fresh load.
struct FlightRelease<'a> {
    inflight: &'a InflightMap,
    key: String,
    guard: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for FlightRelease<'_> {
    fn drop(&mut self) {
        let mut inflight = self
            .inflight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if inflight
            .get(&self.key)
            .is_some_and(|current| Arc::ptr_eq(current, &self.guard))
        {
            inflight.remove(&self.key);
        }
    }
}

/// Classify an identifier by scheme.
fn resolve_target(uri: &str) -> CertifyResult<Target> {
    match Url::parse(uri) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(Target::Remote(url)),
            "file" => {
                let path = url
                    .to_file_path()
                    .unwrap_or_else(|()| PathBuf::from(url.path()));
                Ok(Target::Local(path))
            }
            // `C:\charts\demo.tgz` parses with a one-letter scheme.
            scheme if cfg!(windows) && scheme.len() == 1 => Ok(Target::Local(PathBuf::from(uri))),
            scheme => Err(CertifyError::UnsupportedScheme {
                scheme: scheme.to_string(),
            }),
        },
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Target::Local(PathBuf::from(uri))),
        Err(e) => Err(CertifyError::InvalidUri {
            uri: uri.to_string(),
            message: e.to_string(),
        }),
    }
}

/// Only a definite "absent" is not-found; a failed lookup is a load error.
fn ensure_present(uri: &str, exists: std::io::Result<bool>) -> CertifyResult<()> {
    match exists {
        Ok(true) => Ok(()),
        Ok(false) => Err(CertifyError::ChartNotFound {
            uri: uri.to_string(),
        }),
        Err(e) => Err(CertifyError::load(uri, format!("cannot access chart: {e}"))),
    }
}

fn absolutize(uri: &str, path: &Path) -> CertifyResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir()
        .map_err(|e| CertifyError::load(uri, format!("cannot resolve working directory: {e}")))?;
    Ok(cwd.join(path))
}

/// Run the blocking chart parser off the async runtime, wrapping its error.
async fn run_blocking<F>(uri: &str, parse: F) -> CertifyResult<Chart>
where
    F: FnOnce() -> Result<Chart, ChartError> + Send + 'static,
{
    match tokio::task::spawn_blocking(parse).await {
        Ok(Ok(chart)) => Ok(chart),
        Ok(Err(ChartError::Io(e))) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(CertifyError::ChartNotFound {
                uri: uri.to_string(),
            })
        }
        Ok(Err(e)) => Err(CertifyError::load(uri, e)),
        Err(e) => Err(CertifyError::load(uri, format!("chart parser task failed: {e}"))),
    }
}
