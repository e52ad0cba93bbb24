//! Chart linting.
//!
//! [`ChartLinter`] is the seam used by the `helmLint` check: it receives the
//! path of a chart on disk plus a small string configuration map and returns
//! the messages it wants to report. An empty list means the chart is clean.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use flate2::read::GzDecoder;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::chart::{ChartMetadata, CHARTFILE_NAME, SCHEMA_NAME, VALUES_NAME};
use crate::error::{CertifyError, CertifyResult};

/// Report warnings as well as errors.
pub const CONFIG_STRICT: &str = "strict";
/// Report informational messages as well.
pub const CONFIG_VERBOSE: &str = "verbose";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum LintSeverity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for LintSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LintSeverity::Error => write!(f, "ERROR"),
            LintSeverity::Warning => write!(f, "WARNING"),
            LintSeverity::Info => write!(f, "INFO"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintMessage {
    pub severity: LintSeverity,
    /// Chart-relative path the message is about.
    pub path: String,
    pub message: String,
}

impl LintMessage {
    fn new(severity: LintSeverity, path: &str, message: impl Into<String>) -> Self {
        Self {
            severity,
            path: path.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for LintMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.path, self.message)
    }
}

/// String configuration passed to a linter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LintConfig {
    entries: BTreeMap<String, String>,
}

impl LintConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    fn flag(&self, key: &str) -> bool {
        self.get(key)
            .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
    }

    /// Lowest severity that gets reported.
    pub fn threshold(&self) -> LintSeverity {
        if self.flag(CONFIG_VERBOSE) {
            LintSeverity::Info
        } else if self.flag(CONFIG_STRICT) {
            LintSeverity::Warning
        } else {
            LintSeverity::Error
        }
    }
}

/// Lints a chart on disk.
pub trait ChartLinter: Send + Sync {
    fn lint(&self, chart_path: &Path, config: &LintConfig) -> CertifyResult<Vec<LintMessage>>;
}

/// Built-in linter covering `Chart.yaml`, values and chart layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChartfileLinter;

impl ChartLinter for ChartfileLinter {
    fn lint(&self, chart_path: &Path, config: &LintConfig) -> CertifyResult<Vec<LintMessage>> {
        let messages = if chart_path.is_dir() {
            lint_dir(chart_path)
        } else {
            let scratch = tempfile::TempDir::new().map_err(|e| CertifyError::Lint {
                message: format!("failed to create scratch directory: {e}"),
            })?;
            match unpack_archive(chart_path, scratch.path()) {
                Ok(dir) => lint_dir(&dir),
                Err(message) => vec![LintMessage::new(
                    LintSeverity::Error,
                    &chart_path.display().to_string(),
                    message,
                )],
            }
        };

        let threshold = config.threshold();
        let reported: Vec<LintMessage> = messages
            .into_iter()
            .filter(|m| m.severity <= threshold)
            .collect();

        debug!(
            path = %chart_path.display(),
            messages = reported.len(),
            threshold = %threshold,
            "chart linted"
        );
        Ok(reported)
    }
}

/// Unpack an archive and return its single top-level directory.
fn unpack_archive(archive: &Path, dest: &Path) -> Result<PathBuf, String> {
    let file = File::open(archive).map_err(|e| format!("unable to open chart archive: {e}"))?;
    let mut tar = tar::Archive::new(GzDecoder::new(BufReader::new(file)));
    tar.unpack(dest)
        .map_err(|e| format!("unable to unpack chart archive: {e}"))?;

    let mut dirs = std::fs::read_dir(dest)
        .map_err(|e| format!("unable to read unpacked chart: {e}"))?
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.path());

    match (dirs.next(), dirs.next()) {
        (Some(dir), None) => Ok(dir),
        _ => Err("chart archive must contain exactly one top-level directory".to_string()),
    }
}

fn lint_dir(dir: &Path) -> Vec<LintMessage> {
    let mut messages = Vec::new();
    lint_chartfile(dir, &mut messages);
    lint_values(dir, &mut messages);
    lint_schema(dir, &mut messages);
    if !dir.join("templates").is_dir() {
        messages.push(LintMessage::new(
            LintSeverity::Warning,
            "templates/",
            "directory not found",
        ));
    }
    messages
}

fn lint_chartfile(dir: &Path, messages: &mut Vec<LintMessage>) {
    let data = match std::fs::read(dir.join(CHARTFILE_NAME)) {
        Ok(data) => data,
        Err(_) => {
            messages.push(LintMessage::new(
                LintSeverity::Error,
                CHARTFILE_NAME,
                "file does not exist",
            ));
            return;
        }
    };

    let metadata = match ChartMetadata::from_slice(&data) {
        Ok(m) => m,
        Err(e) => {
            messages.push(LintMessage::new(
                LintSeverity::Error,
                CHARTFILE_NAME,
                e.to_string(),
            ));
            return;
        }
    };

    let error = |message: String| LintMessage::new(LintSeverity::Error, CHARTFILE_NAME, message);

    if metadata.name.is_empty() {
        messages.push(error("name is required".to_string()));
    } else if let Some(dir_name) = dir.file_name().map(|n| n.to_string_lossy()) {
        if dir_name != metadata.name {
            messages.push(error(format!(
                "directory name ({}) and chart name ({}) must match",
                dir_name, metadata.name
            )));
        }
    }

    if metadata.version.is_empty() {
        messages.push(error("version is required".to_string()));
    } else if !is_semver(&metadata.version) {
        messages.push(error(format!(
            "version '{}' is not a valid SemVer",
            metadata.version
        )));
    }

    match metadata.api_version.as_str() {
        "" => messages.push(error("apiVersion is required".to_string())),
        "v1" | "v2" => {}
        other => messages.push(error(format!(
            "apiVersion '{}' is not valid. The value must be either \"v1\" or \"v2\"",
            other
        ))),
    }

    if metadata.icon.is_empty() {
        messages.push(LintMessage::new(
            LintSeverity::Info,
            CHARTFILE_NAME,
            "icon is recommended",
        ));
    }
}

fn lint_values(dir: &Path, messages: &mut Vec<LintMessage>) {
    let Ok(data) = std::fs::read(dir.join(VALUES_NAME)) else {
        messages.push(LintMessage::new(
            LintSeverity::Info,
            VALUES_NAME,
            "file does not exist",
        ));
        return;
    };

    match serde_yaml::from_slice::<serde_yaml::Value>(&data) {
        Ok(serde_yaml::Value::Mapping(_)) | Ok(serde_yaml::Value::Null) => {}
        Ok(_) => messages.push(LintMessage::new(
            LintSeverity::Error,
            VALUES_NAME,
            "top level must be a mapping",
        )),
        Err(e) => messages.push(LintMessage::new(
            LintSeverity::Error,
            VALUES_NAME,
            format!("unable to parse YAML: {e}"),
        )),
    }
}

fn lint_schema(dir: &Path, messages: &mut Vec<LintMessage>) {
    let Ok(data) = std::fs::read(dir.join(SCHEMA_NAME)) else {
        return;
    };
    if let Err(e) = serde_json::from_slice::<serde_json::Value>(&data) {
        messages.push(LintMessage::new(
            LintSeverity::Error,
            SCHEMA_NAME,
            format!("unable to parse JSON: {e}"),
        ));
    }
}

fn is_semver(version: &str) -> bool {
    static SEMVER: OnceLock<Regex> = OnceLock::new();
    SEMVER
        .get_or_init(|| {
            Regex::new(
                r"^(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(?:-((?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*)(?:\.(?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*))*))?(?:\+([0-9a-zA-Z-]+(?:\.[0-9a-zA-Z-]+)*))?$",
            )
            .expect("semver pattern is valid")
        })
        .is_match(version)
}
