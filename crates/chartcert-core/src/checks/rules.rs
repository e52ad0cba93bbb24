//! Registered checks and their fixed pass/fail reasons.

use std::path::Path;

use super::{CheckContext, CheckDefinition, CheckResult};
use crate::error::{CertifyError, CertifyResult};
use crate::loader::ChartSource;

pub const API_VERSION_V2: &str = "v2";
pub const TEST_TEMPLATE_PREFIX: &str = "templates/tests/";
pub const TEST_TEMPLATE_SUFFIX: &str = ".yaml";
pub const README_NAME: &str = "README.md";

pub const HELM3_REASON: &str = "API version is V2 used in Helm 3";
pub const NOT_HELM3_REASON: &str = "API version is not V2 used in Helm 3";
pub const README_EXIST: &str = "Chart has README";
pub const README_DOES_NOT_EXIST: &str = "Chart does not have README";
pub const CHART_TEST_FILES_EXIST: &str = "Chart test files exist";
pub const CHART_TEST_FILES_DO_NOT_EXIST: &str = "Chart test files do not exist";
pub const VALUES_FILE_EXIST: &str = "Values file exist";
pub const VALUES_FILE_DOES_NOT_EXIST: &str = "Values file does not exist";
pub const VALUES_SCHEMA_FILE_EXIST: &str = "Values schema file exist";
pub const VALUES_SCHEMA_FILE_DOES_NOT_EXIST: &str = "Values schema file does not exist";
pub const MIN_KUBE_VERSION_SPECIFIED: &str = "Minimum Kubernetes version specified";
pub const MIN_KUBE_VERSION_NOT_SPECIFIED: &str = "Minimum Kubernetes version not specified";
pub const CHART_DOES_NOT_CONTAIN_CRDS: &str = "Chart does not contain CRDs";
pub const CHART_CONTAINS_CRDS: &str = "Chart contains CRDs";
pub const HELM_LINT_SUCCESSFUL: &str = "Helm lint successful";
pub const HELM_LINT_HAS_FAILED_PREFIX: &str = "Helm lint has failed:";

const SCRATCH_ARCHIVE_NAME: &str = "chart.tgz";

/// Static check registry, in execution order.
pub static CHECKS: &[CheckDefinition] = &[
    CheckDefinition {
        name: "isHelmV3",
        description: "Chart declares API version v2",
        evaluate: Some(is_helm_v3),
    },
    CheckDefinition {
        name: "hasReadme",
        description: "Chart ships a README.md",
        evaluate: Some(has_readme),
    },
    CheckDefinition {
        name: "containsTest",
        description: "Chart ships at least one test template",
        evaluate: Some(contains_test),
    },
    CheckDefinition {
        name: "containsValues",
        description: "Chart declares default values",
        evaluate: Some(contains_values),
    },
    CheckDefinition {
        name: "containsValuesSchema",
        description: "Chart ships a values schema",
        evaluate: Some(contains_values_schema),
    },
    CheckDefinition {
        name: "hasMinKubeVersion",
        description: "Chart declares a minimum Kubernetes version",
        evaluate: Some(has_min_kube_version),
    },
    CheckDefinition {
        name: "notContainsCRDs",
        description: "Chart does not ship custom resource definitions",
        evaluate: Some(not_contains_crds),
    },
    CheckDefinition {
        name: "helmLint",
        description: "Chart passes the linter",
        evaluate: Some(helm_lint),
    },
    CheckDefinition {
        name: "readmeContainsValuesSchema",
        description: "README documents the values schema",
        evaluate: None,
    },
    CheckDefinition {
        name: "keywordsAreOpenshiftCategories",
        description: "Chart keywords map to OpenShift catalog categories",
        evaluate: None,
    },
    CheckDefinition {
        name: "isCommercialChart",
        description: "Chart is published by a commercial vendor",
        evaluate: None,
    },
    CheckDefinition {
        name: "isCommunityChart",
        description: "Chart is published by the community",
        evaluate: None,
    },
    CheckDefinition {
        name: "notContainsInfraPluginsAndDrivers",
        description: "Chart does not install infrastructure plugins or drivers",
        evaluate: None,
    },
    CheckDefinition {
        name: "canBeInstalledWithoutManualPreRequisites",
        description: "Chart installs without manual prerequisites",
        evaluate: None,
    },
    CheckDefinition {
        name: "canBeInstalledWithoutClusterAdminPrivileges",
        description: "Chart installs without cluster-admin privileges",
        evaluate: None,
    },
];

/// Look up a check by name.
pub fn find_check(name: &str) -> Option<&'static CheckDefinition> {
    CHECKS.iter().find(|c| c.name == name)
}

fn is_helm_v3(ctx: &CheckContext<'_>) -> CertifyResult<CheckResult> {
    let ok = ctx.chart.chart.metadata.api_version == API_VERSION_V2;
    Ok(CheckResult::from_outcome(ok, HELM3_REASON, NOT_HELM3_REASON))
}

fn has_readme(ctx: &CheckContext<'_>) -> CertifyResult<CheckResult> {
    let ok = ctx.chart.chart.files.iter().any(|f| f.name == README_NAME);
    Ok(CheckResult::from_outcome(ok, README_EXIST, README_DOES_NOT_EXIST))
}

fn contains_test(ctx: &CheckContext<'_>) -> CertifyResult<CheckResult> {
    let ok = ctx.chart.chart.templates.iter().any(|f| {
        f.name.starts_with(TEST_TEMPLATE_PREFIX) && f.name.ends_with(TEST_TEMPLATE_SUFFIX)
    });
    Ok(CheckResult::from_outcome(
        ok,
        CHART_TEST_FILES_EXIST,
        CHART_TEST_FILES_DO_NOT_EXIST,
    ))
}

fn contains_values(ctx: &CheckContext<'_>) -> CertifyResult<CheckResult> {
    let ok = !ctx.chart.chart.values.is_empty();
    Ok(CheckResult::from_outcome(
        ok,
        VALUES_FILE_EXIST,
        VALUES_FILE_DOES_NOT_EXIST,
    ))
}

fn contains_values_schema(ctx: &CheckContext<'_>) -> CertifyResult<CheckResult> {
    let ok = !ctx.chart.chart.schema.is_empty();
    Ok(CheckResult::from_outcome(
        ok,
        VALUES_SCHEMA_FILE_EXIST,
        VALUES_SCHEMA_FILE_DOES_NOT_EXIST,
    ))
}

fn has_min_kube_version(ctx: &CheckContext<'_>) -> CertifyResult<CheckResult> {
    let ok = !ctx.chart.chart.metadata.kube_version.is_empty();
    Ok(CheckResult::from_outcome(
        ok,
        MIN_KUBE_VERSION_SPECIFIED,
        MIN_KUBE_VERSION_NOT_SPECIFIED,
    ))
}

fn not_contains_crds(ctx: &CheckContext<'_>) -> CertifyResult<CheckResult> {
    let ok = ctx.chart.chart.crd_objects().is_empty();
    Ok(CheckResult::from_outcome(
        ok,
        CHART_DOES_NOT_CONTAIN_CRDS,
        CHART_CONTAINS_CRDS,
    ))
}

fn helm_lint(ctx: &CheckContext<'_>) -> CertifyResult<CheckResult> {
    let messages = match &ctx.chart.source {
        ChartSource::Local(path) => lint_at(ctx, path)?,
        ChartSource::Remote { archive, .. } => {
            // The linter works on paths; materialize the fetched archive.
            let scratch = tempfile::TempDir::new().map_err(|e| CertifyError::Lint {
                message: format!("failed to create scratch directory: {e}"),
            })?;
            // Chart.yaml values are untrusted; never derive the file name from them.
            let path = scratch.path().join(SCRATCH_ARCHIVE_NAME);
            std::fs::write(&path, archive.as_slice()).map_err(|e| CertifyError::Lint {
                message: format!("failed to write chart archive: {e}"),
            })?;
            lint_at(ctx, &path)?
        }
    };

    if messages.is_empty() {
        return Ok(CheckResult::new(true, HELM_LINT_SUCCESSFUL));
    }

    let mut reason = HELM_LINT_HAS_FAILED_PREFIX.to_string();
    for message in &messages {
        reason.push('\n');
        reason.push_str(&message.to_string());
    }
    Ok(CheckResult::new(false, reason))
}

fn lint_at(ctx: &CheckContext<'_>, path: &Path) -> CertifyResult<Vec<crate::lint::LintMessage>> {
    ctx.env.linter.lint(path, &ctx.env.lint_config)
}
