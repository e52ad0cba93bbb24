//! Chart model and loader.
//!
//! Charts are read either from a gzip-compressed tar archive (one top-level
//! directory named after the chart) or from an unpacked chart directory.
//!
//! ```text
//! mychart/
//!   Chart.yaml           # metadata (required)
//!   values.yaml          # default values
//!   values.schema.json   # values schema
//!   templates/           # rendered templates
//!   crds/                # custom resource definitions
//!   charts/              # subcharts (not loaded)
//!   README.md, ...       # everything else lands in `files`
//! ```
//!
//! Parse failures are reported as [`ChartError`]; callers outside this module
//! treat them as opaque.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path};

use flate2::read::GzDecoder;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;
use walkdir::WalkDir;

pub const CHARTFILE_NAME: &str = "Chart.yaml";
pub const VALUES_NAME: &str = "values.yaml";
pub const SCHEMA_NAME: &str = "values.schema.json";
pub const HELMIGNORE_NAME: &str = ".helmignore";
pub const TEMPLATES_DIR: &str = "templates/";
pub const CRDS_DIR: &str = "crds/";
const SUBCHARTS_DIR: &str = "charts/";
const DEFAULT_API_VERSION: &str = "v1";

/// Chart parse errors.
#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("Chart.yaml file is missing")]
    MissingChartfile,

    #[error("invalid Chart.yaml: {0}")]
    Chartfile(String),

    #[error("invalid values.yaml: {0}")]
    Values(String),

    #[error("invalid chart: {0}")]
    Invalid(String),

    #[error("invalid chart archive: {0}")]
    Archive(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Declared chart metadata (`Chart.yaml`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    #[serde(default, deserialize_with = "scalar_string")]
    pub api_version: String,

    #[serde(default, deserialize_with = "scalar_string")]
    pub name: String,

    #[serde(default, deserialize_with = "scalar_string")]
    pub version: String,

    /// Minimum platform version constraint.
    #[serde(default, deserialize_with = "scalar_string")]
    pub kube_version: String,

    #[serde(default, deserialize_with = "scalar_string")]
    pub app_version: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, rename = "type")]
    pub chart_type: String,

    #[serde(default)]
    pub icon: String,

    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Accepts numbers and booleans where a string is declared; `version: 1.0`
/// is common in hand-written charts.
fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_yaml::Value::deserialize(deserializer)?;
    match value {
        serde_yaml::Value::Null => Ok(String::new()),
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a scalar, got {:?}",
            other
        ))),
    }
}

impl ChartMetadata {
    /// Parse `Chart.yaml` content without validating required fields.
    pub fn from_slice(data: &[u8]) -> Result<Self, ChartError> {
        let metadata: Option<Self> =
            serde_yaml::from_slice(data).map_err(|e| ChartError::Chartfile(e.to_string()))?;
        Ok(metadata.unwrap_or_default())
    }

    pub fn validate(&self) -> Result<(), ChartError> {
        if self.name.trim().is_empty() {
            return Err(ChartError::Invalid(
                "chart.metadata.name is required".to_string(),
            ));
        }
        if self.version.trim().is_empty() {
            return Err(ChartError::Invalid(
                "chart.metadata.version is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// A file inside a chart, addressed by its slash-separated path relative to
/// the chart root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartFile {
    pub name: String,
    pub data: Vec<u8>,
}

/// A parsed chart.
#[derive(Debug, Clone, Default)]
pub struct Chart {
    pub metadata: ChartMetadata,
    /// Files that are not metadata, values, schema, templates or subcharts.
    pub files: Vec<ChartFile>,
    pub templates: Vec<ChartFile>,
    /// Default values from `values.yaml`.
    pub values: serde_yaml::Mapping,
    /// Raw `values.schema.json`.
    pub schema: Vec<u8>,
}

impl Chart {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn version(&self) -> &str {
        &self.metadata.version
    }

    /// Custom resource definitions shipped under `crds/`.
    pub fn crd_objects(&self) -> Vec<&ChartFile> {
        self.files
            .iter()
            .filter(|f| f.name.starts_with(CRDS_DIR) && is_manifest(&f.name))
            .collect()
    }
}

fn is_manifest(name: &str) -> bool {
    name.ends_with(".yaml") || name.ends_with(".yml") || name.ends_with(".json")
}

/// Load a chart from a local path: a chart directory or an archive file.
pub fn load_path(path: &Path) -> Result<Chart, ChartError> {
    if path.is_dir() {
        load_dir(path)
    } else {
        let file = File::open(path)?;
        load_archive(BufReader::new(file))
    }
}

/// Load a chart from a gzip-compressed tar stream.
pub fn load_archive<R: Read>(reader: R) -> Result<Chart, ChartError> {
    let decoder = GzDecoder::new(reader);
    let mut archive = tar::Archive::new(decoder);
    let mut files = Vec::new();
    let mut root: Option<String> = None;

    let entries = archive
        .entries()
        .map_err(|e| ChartError::Archive(e.to_string()))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| ChartError::Archive(e.to_string()))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let path = entry
            .path()
            .map_err(|e| ChartError::Archive(e.to_string()))?
            .into_owned();

        let mut parts = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                _ => {
                    return Err(ChartError::Archive(format!(
                        "illegal path in archive: {}",
                        path.display()
                    )))
                }
            }
        }

        if parts.len() < 2 {
            return Err(ChartError::Archive(format!(
                "file {} is not inside the chart directory",
                path.display()
            )));
        }

        let top = parts.remove(0);
        let expected = root.get_or_insert_with(|| top.clone());
        if *expected != top {
            return Err(ChartError::Archive(format!(
                "archive has more than one top-level directory: {} and {}",
                expected, top
            )));
        }

        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        files.push(ChartFile {
            name: parts.join("/"),
            data,
        });
    }

    if files.is_empty() {
        return Err(ChartError::Archive("no files in chart archive".to_string()));
    }

    load_files(files)
}

/// Load a chart from an unpacked directory, honouring `.helmignore`.
pub fn load_dir(dir: &Path) -> Result<Chart, ChartError> {
    let ignore = match std::fs::read_to_string(dir.join(HELMIGNORE_NAME)) {
        Ok(content) => IgnoreRules::parse(&content)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => IgnoreRules::default(),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let Some(rel) = relative_name(dir, entry.path()) else {
                return true;
            };
            !ignore.is_ignored(&rel, entry.file_type().is_dir())
        });

    for entry in walker {
        let entry = entry.map_err(|e| ChartError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = relative_name(dir, entry.path()) else {
            continue;
        };
        let data = std::fs::read(entry.path())?;
        files.push(ChartFile { name, data });
    }

    load_files(files)
}

fn relative_name(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    if rel.as_os_str().is_empty() {
        return None;
    }
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

/// Classify loose chart files into a [`Chart`].
pub fn load_files(files: Vec<ChartFile>) -> Result<Chart, ChartError> {
    let mut chart = Chart::default();
    let mut chartfile = None;

    for file in files {
        match file.name.as_str() {
            CHARTFILE_NAME => chartfile = Some(file.data),
            VALUES_NAME => chart.values = parse_values(&file.data)?,
            SCHEMA_NAME => chart.schema = file.data,
            "Chart.lock" | "requirements.yaml" | "requirements.lock" => {}
            name if name.starts_with(TEMPLATES_DIR) => chart.templates.push(file),
            name if name.starts_with(SUBCHARTS_DIR) => {
                debug!(file = %name, "skipping subchart file");
            }
            _ => chart.files.push(file),
        }
    }

    let data = chartfile.ok_or(ChartError::MissingChartfile)?;
    let mut metadata = ChartMetadata::from_slice(&data)?;
    if metadata.api_version.is_empty() {
        metadata.api_version = DEFAULT_API_VERSION.to_string();
    }
    metadata.validate()?;
    chart.metadata = metadata;

    Ok(chart)
}

fn parse_values(data: &[u8]) -> Result<serde_yaml::Mapping, ChartError> {
    let value: serde_yaml::Value =
        serde_yaml::from_slice(data).map_err(|e| ChartError::Values(e.to_string()))?;
    match value {
        serde_yaml::Value::Null => Ok(serde_yaml::Mapping::new()),
        serde_yaml::Value::Mapping(m) => Ok(m),
        _ => Err(ChartError::Values("top level must be a mapping".to_string())),
    }
}

/// Compiled `.helmignore` rules.
///
/// Patterns without a slash match any path component; patterns with a slash
/// match the full relative path; a trailing slash restricts the pattern to
/// directories. Negated patterns are not supported and are skipped.
#[derive(Debug, Default)]
struct IgnoreRules {
    basename: Option<GlobSet>,
    path: Option<GlobSet>,
    dir_basename: Option<GlobSet>,
    dir_path: Option<GlobSet>,
}

impl IgnoreRules {
    fn parse(content: &str) -> Result<Self, ChartError> {
        let mut basename = GlobSetBuilder::new();
        let mut path = GlobSetBuilder::new();
        let mut dir_basename = GlobSetBuilder::new();
        let mut dir_path = GlobSetBuilder::new();
        let (mut nb, mut np, mut ndb, mut ndp) = (0, 0, 0, 0);

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.starts_with('!') {
                debug!(pattern = %line, "negated .helmignore patterns are not supported");
                continue;
            }

            let dir_only = line.ends_with('/');
            let pattern = line.trim_end_matches('/').trim_start_matches("./");
            if pattern.is_empty() {
                continue;
            }
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|e| ChartError::Invalid(format!("bad {HELMIGNORE_NAME} pattern: {e}")))?;

            match (dir_only, pattern.contains('/')) {
                (false, false) => {
                    basename.add(glob);
                    nb += 1;
                }
                (false, true) => {
                    path.add(glob);
                    np += 1;
                }
                (true, false) => {
                    dir_basename.add(glob);
                    ndb += 1;
                }
                (true, true) => {
                    dir_path.add(glob);
                    ndp += 1;
                }
            }
        }

        let build = |builder: GlobSetBuilder, count: usize| -> Result<Option<GlobSet>, ChartError> {
            if count == 0 {
                return Ok(None);
            }
            builder
                .build()
                .map(Some)
                .map_err(|e| ChartError::Invalid(format!("bad {HELMIGNORE_NAME}: {e}")))
        };

        Ok(Self {
            basename: build(basename, nb)?,
            path: build(path, np)?,
            dir_basename: build(dir_basename, ndb)?,
            dir_path: build(dir_path, ndp)?,
        })
    }

    fn is_ignored(&self, rel: &str, is_dir: bool) -> bool {
        let base = rel.rsplit('/').next().unwrap_or(rel);
        let hit = |set: &Option<GlobSet>, candidate: &str| {
            set.as_ref().is_some_and(|s| s.is_match(candidate))
        };

        if hit(&self.basename, base) || hit(&self.path, rel) {
            return true;
        }
        is_dir && (hit(&self.dir_basename, base) || hit(&self.dir_path, rel))
    }
}
