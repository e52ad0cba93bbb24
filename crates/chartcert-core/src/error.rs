//! Error types for chart certification.

/// Certification errors.
#[derive(Debug, thiserror::Error)]
pub enum CertifyError {
    /// Chart absent: remote 404 or missing local path.
    #[error("chart not found: {uri}")]
    ChartNotFound { uri: String },

    /// Transport or parse failure while loading a chart.
    #[error("failed to load chart {uri}: {message}")]
    Load { uri: String, message: String },

    /// Identifier could not be parsed as a URI.
    #[error("invalid chart identifier {uri}: {message}")]
    InvalidUri { uri: String, message: String },

    /// Identifier uses a scheme other than http, https or file.
    #[error("scheme {scheme:?} not supported")]
    UnsupportedScheme { scheme: String },

    /// Check is registered but has no policy yet.
    #[error("check {check} is not implemented")]
    NotImplemented { check: String },

    /// Check name is not in the registry.
    #[error("unknown check: {name}")]
    UnknownCheck { name: String },

    /// Certificate builder invoked without a required field.
    #[error("chart {field} must be set")]
    MissingField { field: &'static str },

    /// Cache directory could not be resolved.
    #[error("cache error: {message}")]
    CachePersistence { message: String },

    /// Fetch was cancelled by the caller.
    #[error("loading {uri} was cancelled")]
    Cancelled { uri: String },

    /// Linter could not run.
    #[error("lint error: {message}")]
    Lint { message: String },

    /// Check evaluation did not complete.
    #[error("check {check} could not run: {message}")]
    CheckFailed { check: String, message: String },

    /// Certificate could not be rendered.
    #[error("serialization error: {message}")]
    Serialization { message: String },
}

impl CertifyError {
    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            // Input issues
            Self::ChartNotFound { .. } => 2,
            Self::InvalidUri { .. } => 2,
            Self::UnsupportedScheme { .. } => 2,
            Self::UnknownCheck { .. } => 2,

            // Could not evaluate
            Self::Load { .. } => 3,
            Self::Cancelled { .. } => 3,
            Self::Lint { .. } => 3,

            // Other
            Self::NotImplemented { .. } => 4,
            Self::MissingField { .. } => 4,
            Self::CheckFailed { .. } => 4,
            Self::CachePersistence { .. } => 4,
            Self::Serialization { .. } => 4,
        }
    }

    /// Whether the chart named by the identifier does not exist.
    pub fn is_chart_not_found(&self) -> bool {
        matches!(self, Self::ChartNotFound { .. })
    }

    /// Whether the failure came from a check that has no policy yet.
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented { .. })
    }

    pub(crate) fn load(uri: &str, message: impl std::fmt::Display) -> Self {
        Self::Load {
            uri: uri.to_string(),
            message: message.to_string(),
        }
    }
}

/// Result type for certification operations.
pub type CertifyResult<T> = Result<T, CertifyError>;
