//! Helm chart certification.
//!
//! This crate loads a chart (remote archive, local archive or chart
//! directory), evaluates a set of named checks against it and records the
//! outcome in a [`Certificate`]:
//!
//! - Chart loading over HTTP(S) or from disk, with a per-run cache
//! - Static check registry and a sequential or concurrent runner
//! - Built-in chart linter behind the [`ChartLinter`] trait
//! - Certificate builder with JSON and YAML rendering
//!
//! # Quick Start
//!
//! ```no_run
//! use chartcert_core::{CertifierConfig, Certifier, CheckRunner};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let certifier = Certifier::new(CertifierConfig::from_env(), CheckRunner::new())?;
//!
//! let certificate = certifier.certify("https://charts.example.com/demo-0.1.0.tgz").await?;
//! if !certificate.is_ok() {
//!     println!("failed: {:?}", certificate.failed_checks());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `CHARTCERT_HTTP_TIMEOUT` | Request timeout in seconds (default: 30) |
//! | `CHARTCERT_MAX_CHART_BYTES` | Largest accepted chart archive (default: 64 MiB) |
//! | `CHARTCERT_CACHE_DIR` | Base directory for cache paths (default: platform cache dir) |

pub mod cache;
pub mod certificate;
pub mod certifier;
pub mod chart;
pub mod checks;
pub mod config;
pub mod error;
pub mod lint;
pub mod loader;
pub mod runner;

pub use cache::ChartCache;
pub use certificate::{Certificate, CertificateBuilder, ChartIdentity};
pub use certifier::Certifier;
pub use chart::{Chart, ChartMetadata};
pub use checks::{find_check, CheckDefinition, CheckResult, CheckResultMap, CHECKS};
pub use config::CertifierConfig;
pub use error::{CertifyError, CertifyResult};
pub use lint::{ChartLinter, ChartfileLinter, LintConfig, LintMessage, LintSeverity};
pub use loader::{Cancellation, ChartLoader, ChartSource, LoadedChart};
pub use runner::CheckRunner;
