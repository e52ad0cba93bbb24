//! Certificates and the builder that assembles them.

use std::fmt;

use serde::Serialize;

use crate::checks::{CheckResult, CheckResultMap};
use crate::error::{CertifyError, CertifyResult};

/// Chart identity recorded in a certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartIdentity {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct CertificateMetadata {
    chart: ChartIdentity,
}

/// Outcome of a certification run.
///
/// ```json
/// {
///   "ok": true,
///   "metadata": { "chart": { "name": "mychart", "version": "1.0.0" } },
///   "results": { "hasReadme": { "ok": true, "reason": "Chart has README" } }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Certificate {
    ok: bool,
    metadata: CertificateMetadata,
    results: CheckResultMap,
}

impl Certificate {
    /// True iff every check passed. A certificate without results is ok.
    pub fn is_ok(&self) -> bool {
        self.ok
    }

    pub fn chart_name(&self) -> &str {
        &self.metadata.chart.name
    }

    pub fn chart_version(&self) -> &str {
        &self.metadata.chart.version
    }

    pub fn chart(&self) -> &ChartIdentity {
        &self.metadata.chart
    }

    pub fn results(&self) -> &CheckResultMap {
        &self.results
    }

    /// Names of the checks that did not pass, in result order.
    pub fn failed_checks(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|(_, r)| !r.ok)
            .map(|(name, _)| name)
            .collect()
    }

    pub fn to_json_pretty(&self) -> CertifyResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| CertifyError::Serialization {
            message: e.to_string(),
        })
    }

    pub fn to_yaml(&self) -> CertifyResult<String> {
        serde_yaml::to_string(self).map_err(|e| CertifyError::Serialization {
            message: e.to_string(),
        })
    }
}

impl fmt::Display for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<CERTIFICATION OUTPUT>")
    }
}

/// Accumulates chart identity and check results, then produces a
/// [`Certificate`]. `build` consumes the builder.
#[derive(Debug, Clone, Default)]
pub struct CertificateBuilder {
    name: String,
    version: String,
    results: CheckResultMap,
}

impl CertificateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_chart_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    pub fn set_chart_version(&mut self, version: impl Into<String>) -> &mut Self {
        self.version = version.into();
        self
    }

    /// Record a check result. A later result for the same name replaces the
    /// earlier one.
    pub fn add_result(&mut self, name: impl Into<String>, result: CheckResult) -> &mut Self {
        self.results.insert(name, result);
        self
    }

    pub fn build(self) -> CertifyResult<Certificate> {
        if self.name.is_empty() {
            return Err(CertifyError::MissingField { field: "name" });
        }
        if self.version.is_empty() {
            return Err(CertifyError::MissingField { field: "version" });
        }

        Ok(Certificate {
            ok: self.results.all_ok(),
            metadata: CertificateMetadata {
                chart: ChartIdentity {
                    name: self.name,
                    version: self.version,
                },
            },
            results: self.results,
        })
    }
}
