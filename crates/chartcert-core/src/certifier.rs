//! One certification run: load, check, build.

use std::sync::Arc;

use tracing::info;

use crate::certificate::{Certificate, CertificateBuilder};
use crate::config::CertifierConfig;
use crate::error::CertifyResult;
use crate::loader::{Cancellation, ChartLoader};
use crate::runner::CheckRunner;

/// Certifies charts with a fixed runner and a loader that owns the cache
/// for the lifetime of the certifier.
#[derive(Debug)]
pub struct Certifier {
    loader: Arc<ChartLoader>,
    runner: CheckRunner,
    parallel: bool,
}

impl Certifier {
    pub fn new(config: CertifierConfig, runner: CheckRunner) -> CertifyResult<Self> {
        Ok(Self::with_loader(Arc::new(ChartLoader::new(config)?), runner))
    }

    pub fn with_loader(loader: Arc<ChartLoader>, runner: CheckRunner) -> Self {
        Self {
            loader,
            runner,
            parallel: false,
        }
    }

    /// Evaluate checks concurrently.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn loader(&self) -> &Arc<ChartLoader> {
        &self.loader
    }

    pub async fn certify(&self, uri: &str) -> CertifyResult<Certificate> {
        self.certify_with_cancel(uri, &Cancellation::new()).await
    }

    /// Load `uri`, run every configured check and build the certificate.
    ///
    /// No certificate is produced when a check cannot be evaluated.
    pub async fn certify_with_cancel(
        &self,
        uri: &str,
        cancel: &Cancellation,
    ) -> CertifyResult<Certificate> {
        let chart = self.loader.load_from_uri_with_cancel(uri, cancel).await?;

        let results = if self.parallel {
            self.runner
                .run_parallel(Arc::clone(&self.loader), uri, cancel)
                .await?
        } else {
            self.runner.run(&self.loader, uri, cancel).await?
        };

        let mut builder = CertificateBuilder::new();
        builder
            .set_chart_name(chart.chart.name())
            .set_chart_version(chart.chart.version());
        for (name, result) in results.iter() {
            builder.add_result(name, result.clone());
        }
        let certificate = builder.build()?;

        info!(
            uri = %uri,
            chart = %certificate.chart_name(),
            version = %certificate.chart_version(),
            ok = certificate.is_ok(),
            "certification finished"
        );
        Ok(certificate)
    }
}
