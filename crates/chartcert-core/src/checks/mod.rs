//! Checks: named boolean evaluations against a loaded chart.

pub mod rules;

use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{CertifyError, CertifyResult};
use crate::lint::{ChartLinter, LintConfig};
use crate::loader::{Cancellation, ChartLoader, LoadedChart};

pub use rules::{find_check, CHECKS};

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub ok: bool,
    /// One of the fixed reason strings in [`rules`], or a lint report.
    pub reason: String,
}

impl CheckResult {
    pub fn new(ok: bool, reason: impl Into<String>) -> Self {
        Self {
            ok,
            reason: reason.into(),
        }
    }

    /// Pick the pass or fail reason according to `ok`.
    pub fn from_outcome(ok: bool, pass_reason: &str, fail_reason: &str) -> Self {
        Self::new(ok, if ok { pass_reason } else { fail_reason })
    }
}

/// Check name → result, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckResultMap {
    entries: Vec<(String, CheckResult)>,
}

impl CheckResultMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a result; an existing entry with the same name is replaced in
    /// place.
    pub fn insert(&mut self, name: impl Into<String>, result: CheckResult) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = result,
            None => self.entries.push((name, result)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&CheckResult> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CheckResult)> {
        self.entries.iter().map(|(n, r)| (n.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when every result passed; vacuously true when empty.
    pub fn all_ok(&self) -> bool {
        self.entries.iter().all(|(_, r)| r.ok)
    }
}

impl Serialize for CheckResultMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, result) in &self.entries {
            map.serialize_entry(name, result)?;
        }
        map.end()
    }
}

impl<N: Into<String>> FromIterator<(N, CheckResult)> for CheckResultMap {
    fn from_iter<T: IntoIterator<Item = (N, CheckResult)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (name, result) in iter {
            map.insert(name, result);
        }
        map
    }
}

/// Collaborators available to check evaluators.
#[derive(Clone)]
pub struct CheckEnv {
    pub linter: Arc<dyn ChartLinter>,
    pub lint_config: LintConfig,
}

impl std::fmt::Debug for CheckEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckEnv")
            .field("lint_config", &self.lint_config)
            .finish_non_exhaustive()
    }
}

impl Default for CheckEnv {
    fn default() -> Self {
        Self {
            linter: Arc::new(crate::lint::ChartfileLinter),
            lint_config: LintConfig::default(),
        }
    }
}

/// Input to an evaluator.
pub struct CheckContext<'a> {
    pub chart: &'a LoadedChart,
    pub env: &'a CheckEnv,
}

/// Pure evaluation over a loaded chart.
pub type Evaluator = fn(&CheckContext<'_>) -> CertifyResult<CheckResult>;

/// Check definition for the registry.
#[derive(Debug)]
pub struct CheckDefinition {
    pub name: &'static str,
    pub description: &'static str,
    /// `None` for checks that are registered but have no policy yet.
    pub evaluate: Option<Evaluator>,
}

impl CheckDefinition {
    pub fn is_implemented(&self) -> bool {
        self.evaluate.is_some()
    }

    /// Load the chart through `loader` (cached) and evaluate it on the
    /// blocking pool.
    ///
    /// Load errors are returned unchanged; they never become a failing
    /// result.
    pub async fn run(
        &self,
        loader: &ChartLoader,
        uri: &str,
        env: &CheckEnv,
        cancel: &Cancellation,
    ) -> CertifyResult<CheckResult> {
        let Some(evaluate) = self.evaluate else {
            return Err(CertifyError::NotImplemented {
                check: self.name.to_string(),
            });
        };

        let chart = loader.load_from_uri_with_cancel(uri, cancel).await?;

        // Evaluators may block on the filesystem (helmLint).
        let env = env.clone();
        tokio::task::spawn_blocking(move || {
            evaluate(&CheckContext {
                chart: &chart,
                env: &env,
            })
        })
        .await
        .map_err(|e| CertifyError::CheckFailed {
            check: self.name.to_string(),
            message: e.to_string(),
        })?
    }
}
