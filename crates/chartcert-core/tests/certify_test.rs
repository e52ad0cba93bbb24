//! End-to-end certification of on-disk charts.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chartcert_core::checks::rules::{
    CHART_CONTAINS_CRDS, HELM_LINT_SUCCESSFUL, README_DOES_NOT_EXIST, README_EXIST,
};
use chartcert_core::lint::CONFIG_STRICT;
use chartcert_core::{
    Cancellation, CertifierConfig, Certifier, CertifyError, ChartCache, ChartLoader, CheckRunner,
    LintConfig,
};
use tempfile::{tempdir, TempDir};

/// Write a chart directory named `name` with the given extra files.
fn write_chart(root: &Path, name: &str, extra: &[(&str, &str)]) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(dir.join("templates/tests")).unwrap();
    fs::write(
        dir.join("Chart.yaml"),
        format!("apiVersion: v2\nname: {name}\nversion: 1.0.0\nkubeVersion: '>=1.22.0'\n"),
    )
    .unwrap();
    fs::write(dir.join("values.yaml"), "image: nginx\n").unwrap();
    fs::write(dir.join("values.schema.json"), "{\"type\": \"object\"}").unwrap();
    fs::write(
        dir.join("templates/tests/test-connection.yaml"),
        "kind: Pod\n",
    )
    .unwrap();
    for (file, data) in extra {
        let path = dir.join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, data).unwrap();
    }
    dir
}

fn create_certifier(cache: &TempDir, runner: CheckRunner) -> Certifier {
    Certifier::new(
        CertifierConfig::default().with_cache_dir(cache.path()),
        runner,
    )
    .expect("failed to create certifier")
}

#[tokio::test]
async fn test_certify_complete_chart() {
    let dir = tempdir().unwrap();
    let chart = write_chart(dir.path(), "mychart", &[("README.md", "# mychart\n")]);
    let certifier = create_certifier(&dir, CheckRunner::new());

    let cert = certifier
        .certify(chart.to_str().unwrap())
        .await
        .expect("certify failed");

    assert!(cert.is_ok(), "failed: {:?}", cert.failed_checks());
    assert_eq!(cert.chart_name(), "mychart");
    assert_eq!(cert.chart_version(), "1.0.0");
    assert_eq!(cert.results().len(), 8);
    assert_eq!(cert.results().get("hasReadme").unwrap().reason, README_EXIST);
    assert_eq!(
        cert.results().get("helmLint").unwrap().reason,
        HELM_LINT_SUCCESSFUL
    );
}

#[tokio::test]
async fn test_certify_reports_failing_checks() {
    let dir = tempdir().unwrap();
    let chart = write_chart(
        dir.path(),
        "operator",
        &[("crds/widget.yaml", "kind: CustomResourceDefinition\n")],
    );
    let certifier = create_certifier(&dir, CheckRunner::new());

    let cert = certifier.certify(chart.to_str().unwrap()).await.unwrap();

    assert!(!cert.is_ok());
    assert_eq!(cert.failed_checks(), vec!["hasReadme", "notContainsCRDs"]);
    assert_eq!(
        cert.results().get("hasReadme").unwrap().reason,
        README_DOES_NOT_EXIST
    );
    assert_eq!(
        cert.results().get("notContainsCRDs").unwrap().reason,
        CHART_CONTAINS_CRDS
    );
}

#[tokio::test]
async fn test_lint_failure_lists_messages() {
    let dir = tempdir().unwrap();
    // Directory name differs from the chart name.
    let chart = write_chart(dir.path(), "demo", &[]);
    let renamed = dir.path().join("renamed");
    fs::rename(&chart, &renamed).unwrap();

    let runner = CheckRunner::with_checks(["helmLint"]).unwrap();
    let certifier = create_certifier(&dir, runner);
    let cert = certifier.certify(renamed.to_str().unwrap()).await.unwrap();

    let lint = cert.results().get("helmLint").unwrap();
    assert!(!lint.ok);
    assert!(lint.reason.starts_with("Helm lint has failed:\n"));
    assert!(lint.reason.contains("must match"), "{}", lint.reason);
}

#[tokio::test]
async fn test_strict_lint_reports_warnings() {
    let dir = tempdir().unwrap();
    let chart_dir = dir.path().join("bare");
    fs::create_dir_all(&chart_dir).unwrap();
    fs::write(
        chart_dir.join("Chart.yaml"),
        "apiVersion: v2\nname: bare\nversion: 0.1.0\n",
    )
    .unwrap();

    let lenient = create_certifier(&dir, CheckRunner::with_checks(["helmLint"]).unwrap());
    let cert = lenient.certify(chart_dir.to_str().unwrap()).await.unwrap();
    assert!(cert.is_ok());

    let strict = create_certifier(
        &dir,
        CheckRunner::with_checks(["helmLint"])
            .unwrap()
            .with_lint_config(LintConfig::new().with(CONFIG_STRICT, "true")),
    );
    let cert = strict.certify(chart_dir.to_str().unwrap()).await.unwrap();
    assert!(!cert.is_ok());
    assert!(cert.results().get("helmLint").unwrap().reason.contains("templates/"));
}

#[tokio::test]
async fn test_not_implemented_check_aborts_certification() {
    let dir = tempdir().unwrap();
    let chart = write_chart(dir.path(), "mychart", &[]);
    let runner = CheckRunner::with_checks(["hasReadme", "isCommunityChart"]).unwrap();
    let certifier = create_certifier(&dir, runner);

    let err = certifier
        .certify(chart.to_str().unwrap())
        .await
        .unwrap_err();
    match err {
        CertifyError::NotImplemented { check } => assert_eq!(check, "isCommunityChart"),
        other => panic!("expected NotImplemented, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_chart_aborts_certification() {
    let dir = tempdir().unwrap();
    let certifier = create_certifier(&dir, CheckRunner::new());
    let missing = dir.path().join("nope");

    let err = certifier
        .certify(missing.to_str().unwrap())
        .await
        .unwrap_err();
    assert!(err.is_chart_not_found());
}

#[tokio::test]
async fn test_parallel_run_matches_sequential() {
    let dir = tempdir().unwrap();
    let chart = write_chart(dir.path(), "mychart", &[("README.md", "# hi\n")]);
    let uri = chart.to_str().unwrap().to_string();

    let loader = Arc::new(
        ChartLoader::with_cache(
            CertifierConfig::default(),
            Arc::new(ChartCache::with_dir(dir.path())),
        )
        .unwrap(),
    );
    let runner = CheckRunner::new();
    let cancel = Cancellation::new();

    let sequential = runner.run(&loader, &uri, &cancel).await.unwrap();
    let parallel = runner
        .run_parallel(Arc::clone(&loader), &uri, &cancel)
        .await
        .unwrap();

    assert_eq!(sequential, parallel);
    assert_eq!(loader.cache().len(), 1);
}

#[tokio::test]
async fn test_parallel_run_returns_first_error_in_order() {
    let dir = tempdir().unwrap();
    let chart = write_chart(dir.path(), "mychart", &[]);
    let loader = Arc::new(
        ChartLoader::with_cache(
            CertifierConfig::default(),
            Arc::new(ChartCache::with_dir(dir.path())),
        )
        .unwrap(),
    );
    let runner =
        CheckRunner::with_checks(["isHelmV3", "isCommercialChart", "isCommunityChart"]).unwrap();

    let err = runner
        .run_parallel(loader, chart.to_str().unwrap(), &Cancellation::new())
        .await
        .unwrap_err();
    match err {
        CertifyError::NotImplemented { check } => assert_eq!(check, "isCommercialChart"),
        other => panic!("expected NotImplemented, got {other:?}"),
    }
}
