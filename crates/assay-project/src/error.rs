//! Error types for project persistence and data loading
//!
//! Two families:
//! - [`ProjectError`]: structural failures (layout, config, persistence);
//!   these propagate
//! - [`LoadError`]: data-content failures while reading a batch; these are
//!   recoverable and drive the init wizard's retry loop

use std::fmt;
use std::path::PathBuf;

use assay_generator::GeneratorError;

/// Main project error type
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    /// No project configuration at the expected location
    #[error("no assay project found at {0}")]
    NotInitialized(PathBuf),

    /// Datasource name already configured
    #[error("datasource '{0}' already exists")]
    DatasourceExists(String),

    /// Datasource name not configured
    #[error("datasource '{0}' not found")]
    UnknownDatasource(String),

    /// Docs site name not configured
    #[error("data docs site '{0}' not found")]
    UnknownDocsSite(String),

    /// Suite name is neither `<suite>` nor `<asset>.<suite>`
    #[error("invalid expectation suite name '{0}': expected <suite> or <data asset>.<suite>")]
    InvalidSuiteName(String),

    /// Filesystem failure
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed `assay.yml`
    #[error("invalid project config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Malformed suite or validation document
    #[error("invalid json document: {0}")]
    Json(#[from] serde_json::Error),

    /// Datasource or generator failure
    #[error(transparent)]
    Generator(#[from] GeneratorError),

    /// Browser could not be launched
    #[error("failed to open {url}: {reason}")]
    Browser { url: String, reason: String },
}

impl ProjectError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Check if the error comes from configuration
    #[inline]
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        match self {
            Self::Yaml(_) | Self::InvalidSuiteName(_) => true,
            Self::Generator(e) => e.is_config_error(),
            _ => false,
        }
    }
}

/// Result alias for project operations
pub type Result<T> = std::result::Result<T, ProjectError>;

/// Short cause of a failed load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadErrorCategory {
    /// File does not exist or is not a file
    NotFound,
    /// File could not be read
    Unreadable,
    /// Bytes do not match the expected format
    UnsupportedFormat,
    /// Format recognized, content malformed
    Parse,
    /// No data rows
    Empty,
    /// Descriptor does not point at a file
    UnsupportedSource,
}

impl LoadErrorCategory {
    /// Human-readable cause
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "File not found",
            Self::Unreadable => "Cannot read file",
            Self::UnsupportedFormat => "Unsupported format, or corrupt file",
            Self::Parse => "Malformed data",
            Self::Empty => "No data",
            Self::UnsupportedSource => "Unsupported batch source",
        }
    }
}

impl fmt::Display for LoadErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure to materialize a batch
///
/// Always recoverable: the caller may retry with another descriptor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{category}: {message}")]
pub struct LoadError {
    /// Short cause
    pub category: LoadErrorCategory,
    /// Raw detail from the reader
    pub message: String,
}

impl LoadError {
    /// Create a load error
    #[must_use]
    pub fn new(category: LoadErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_renders_cause_then_detail() {
        let err = LoadError::new(
            LoadErrorCategory::UnsupportedFormat,
            "Expected BOF record; found b'PRODUCTI'",
        );
        assert_eq!(
            err.to_string(),
            "Unsupported format, or corrupt file: Expected BOF record; found b'PRODUCTI'"
        );
    }

    #[test]
    fn config_errors_classified() {
        assert!(ProjectError::InvalidSuiteName("x".to_string()).is_config_error());
        assert!(!ProjectError::DatasourceExists("x".to_string()).is_config_error());
    }
}
