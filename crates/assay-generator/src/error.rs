//! Error types for asset discovery and batch generation
//!
//! Errors fall into three groups:
//! - Configuration errors (bad glob specs, unknown generator kinds), fatal at
//!   construction
//! - Unknown asset names, surfaced to the caller unchanged
//! - Backend failures (unreadable base directory, table listing failure)

use std::path::PathBuf;

use assay_batch::BatchError;

/// Main generator error type
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// Requested data asset does not exist in the generator's catalog
    ///
    /// This is the data context error of the discovery layer: names are
    /// never guessed or fuzzy-matched.
    #[error("data asset '{asset}' not found in generator '{generator}'")]
    UnknownAsset { generator: String, asset: String },

    /// Asset resolved but produced no batches
    #[error("no batches available for data asset '{asset}' in generator '{generator}'")]
    NoBatches { generator: String, asset: String },

    /// Datasource has no generator under this name
    #[error("generator '{0}' not found")]
    UnknownGenerator(String),

    /// Malformed asset glob configuration
    #[error("invalid asset glob for '{asset}': {reason}")]
    InvalidAssetGlob { asset: String, reason: String },

    /// Unrecognized datasource or generator class
    #[error("unknown {what} class_name: '{class_name}'")]
    UnknownClass {
        what: &'static str,
        class_name: String,
    },

    /// Other configuration problems
    #[error("configuration error: {0}")]
    Config(String),

    /// Base directory cannot be used for matching
    #[error("invalid base directory {path}: {reason}")]
    InvalidBaseDirectory { path: PathBuf, reason: String },

    /// IO error while scanning
    #[error("io error scanning {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Remote table catalog failed to answer
    #[error("table catalog error: {0}")]
    TableCatalog(String),

    /// Invalid batch kwargs or reader options
    #[error("batch kwargs error: {0}")]
    Batch(#[from] BatchError),
}

impl GeneratorError {
    /// Check if the error comes from configuration
    ///
    /// Configuration errors are never retried.
    #[inline]
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidAssetGlob { .. }
                | Self::UnknownClass { .. }
                | Self::Config(_)
                | Self::InvalidBaseDirectory { .. }
                | Self::Batch(_)
        )
    }

    /// Check if the error is an unknown asset name
    #[inline]
    #[must_use]
    pub fn is_unknown_asset(&self) -> bool {
        matches!(self, Self::UnknownAsset { .. })
    }

    pub(crate) fn unknown_asset(generator: &str, asset: &str) -> Self {
        Self::UnknownAsset {
            generator: generator.to_string(),
            asset: asset.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for generator operations
pub type Result<T> = std::result::Result<T, GeneratorError>;
