#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn write_chart(root: &Path, name: &str, with_readme: bool) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(dir.join("templates/tests")).unwrap();
    fs::write(
        dir.join("Chart.yaml"),
        format!("apiVersion: v2\nname: {name}\nversion: 1.0.0\nkubeVersion: '>=1.22.0'\n"),
    )
    .unwrap();
    fs::write(dir.join("values.yaml"), "image: nginx\n").unwrap();
    fs::write(dir.join("values.schema.json"), "{}").unwrap();
    fs::write(dir.join("templates/tests/test-connection.yaml"), "kind: Pod\n").unwrap();
    if with_readme {
        fs::write(dir.join("README.md"), "# chart\n").unwrap();
    }
    dir
}

fn chartcert(cache: &Path) -> Command {
    let mut cmd = Command::cargo_bin("chartcert").unwrap();
    cmd.env("CHARTCERT_CACHE_DIR", cache).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_certified_chart_exits_zero_with_json_certificate() {
    let dir = tempdir().unwrap();
    let chart = write_chart(dir.path(), "mychart", true);

    let output = chartcert(dir.path())
        .arg("certify")
        .arg(&chart)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0), "{output:?}");

    let cert: Value = serde_json::from_slice(&output.stdout).expect("certificate is JSON");
    assert_eq!(cert["ok"], Value::Bool(true));
    assert_eq!(cert["metadata"]["chart"]["name"], "mychart");
    assert_eq!(cert["metadata"]["chart"]["version"], "1.0.0");
    assert_eq!(cert["results"]["hasReadme"]["reason"], "Chart has README");
}

#[test]
fn test_failed_check_exits_one() {
    let dir = tempdir().unwrap();
    let chart = write_chart(dir.path(), "mychart", false);

    chartcert(dir.path())
        .arg("certify")
        .arg(&chart)
        .args(["--check", "hasReadme", "--output", "text"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "FAIL hasReadme: Chart does not have README",
        ))
        .stdout(predicate::str::contains("not certified"));
}

#[test]
fn test_yaml_output() {
    let dir = tempdir().unwrap();
    let chart = write_chart(dir.path(), "mychart", true);

    chartcert(dir.path())
        .arg("certify")
        .arg(&chart)
        .args(["-c", "isHelmV3", "-o", "yaml", "--parallel"])
        .assert()
        .success()
        .stdout(predicate::str::contains("name: mychart"))
        .stdout(predicate::str::contains("isHelmV3:"));
}

#[test]
fn test_missing_chart_exits_two() {
    let dir = tempdir().unwrap();

    chartcert(dir.path())
        .args(["certify", "file:///nonexistent-path.tgz"])
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains(
            "chart not found: file:///nonexistent-path.tgz",
        ));
}

#[test]
fn test_unknown_check_exits_two() {
    let dir = tempdir().unwrap();
    let chart = write_chart(dir.path(), "mychart", true);

    chartcert(dir.path())
        .arg("certify")
        .arg(&chart)
        .args(["--check", "isShiny"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown check: isShiny"));
}

#[test]
fn test_unsupported_scheme_exits_two() {
    let dir = tempdir().unwrap();

    chartcert(dir.path())
        .args(["certify", "ftp://host/chart.tgz"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("\"ftp\""));
}

#[test]
fn test_not_implemented_check_exits_four() {
    let dir = tempdir().unwrap();
    let chart = write_chart(dir.path(), "mychart", true);

    chartcert(dir.path())
        .arg("certify")
        .arg(&chart)
        .args(["--check", "isCommercialChart"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("isCommercialChart"));
}

#[test]
fn test_checks_lists_registry() {
    let dir = tempdir().unwrap();

    chartcert(dir.path())
        .arg("checks")
        .assert()
        .success()
        .stdout(predicate::str::contains("helmLint"))
        .stdout(predicate::str::contains("isCommunityChart").not());

    chartcert(dir.path())
        .args(["checks", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("isCommunityChart"))
        .stdout(predicate::str::contains("(not implemented)"));
}
