//! Check runner: executes a named set of checks against one chart.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::checks::{find_check, CheckDefinition, CheckEnv, CheckResult, CheckResultMap, CHECKS};
use crate::error::{CertifyError, CertifyResult};
use crate::lint::{ChartLinter, LintConfig};
use crate::loader::{Cancellation, ChartLoader};

/// Ordered set of checks plus the environment they evaluate in.
#[derive(Debug, Clone)]
pub struct CheckRunner {
    checks: Vec<&'static CheckDefinition>,
    env: CheckEnv,
}

impl Default for CheckRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckRunner {
    /// Runner over every implemented check, in registry order.
    pub fn new() -> Self {
        Self {
            checks: CHECKS.iter().filter(|c| c.is_implemented()).collect(),
            env: CheckEnv::default(),
        }
    }

    /// Runner over the named checks, in the order given.
    ///
    /// Duplicates are collapsed onto their first occurrence. Registered but
    /// unimplemented checks are accepted here and fail when run.
    pub fn with_checks<I, S>(names: I) -> CertifyResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut checks: Vec<&'static CheckDefinition> = Vec::new();
        for name in names {
            let name = name.as_ref();
            let check = find_check(name).ok_or_else(|| CertifyError::UnknownCheck {
                name: name.to_string(),
            })?;
            if !checks.iter().any(|c| c.name == check.name) {
                checks.push(check);
            }
        }
        Ok(Self {
            checks,
            env: CheckEnv::default(),
        })
    }

    pub fn with_linter(mut self, linter: Arc<dyn ChartLinter>) -> Self {
        self.env.linter = linter;
        self
    }

    pub fn with_lint_config(mut self, config: LintConfig) -> Self {
        self.env.lint_config = config;
        self
    }

    pub fn check_names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|c| c.name).collect()
    }

    /// Run every check in order. The first error aborts the run.
    pub async fn run(
        &self,
        loader: &ChartLoader,
        uri: &str,
        cancel: &Cancellation,
    ) -> CertifyResult<CheckResultMap> {
        let mut results = CheckResultMap::new();
        for check in &self.checks {
            debug!(check = check.name, uri = %uri, "running check");
            let result = check
                .run(loader, uri, &self.env, cancel)
                .await
                .inspect_err(|e| warn!(check = check.name, error = %e, "check aborted run"))?;
            results.insert(check.name, result);
        }
        info!(uri = %uri, checks = results.len(), passed = results.all_ok(), "checks finished");
        Ok(results)
    }

    /// Run the checks concurrently.
    ///
    /// Results keep the configured order. When several checks fail to
    /// evaluate, the error of the earliest one is returned.
    pub async fn run_parallel(
        &self,
        loader: Arc<ChartLoader>,
        uri: &str,
        cancel: &Cancellation,
    ) -> CertifyResult<CheckResultMap> {
        let mut set = JoinSet::new();
        for (index, check) in self.checks.iter().copied().enumerate() {
            let loader = Arc::clone(&loader);
            let env = self.env.clone();
            let cancel = cancel.clone();
            let uri = uri.to_string();
            set.spawn(async move {
                let result = check.run(&loader, &uri, &env, &cancel).await;
                (index, result)
            });
        }

        let mut slots: Vec<Option<CertifyResult<CheckResult>>> =
            (0..self.checks.len()).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            let (index, result) =
                joined.map_err(|e| CertifyError::load(uri, format!("check task failed: {e}")))?;
            slots[index] = Some(result);
        }

        let mut results = CheckResultMap::new();
        for (check, slot) in self.checks.iter().zip(slots) {
            match slot {
                Some(Ok(result)) => results.insert(check.name, result),
                Some(Err(e)) => {
                    warn!(check = check.name, error = %e, "check aborted run");
                    return Err(e);
                }
                None => {
                    return Err(CertifyError::load(
                        uri,
                        format!("check {} produced no result", check.name),
                    ))
                }
            }
        }
        info!(uri = %uri, checks = results.len(), passed = results.all_ok(), "checks finished");
        Ok(results)
    }
}
