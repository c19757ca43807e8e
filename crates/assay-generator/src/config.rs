//! Datasource and generator configuration
//!
//! Mirrors the `datasources` section of a project's `assay.yml`:
//!
//! ```yaml
//! files_datasource:
//!   class_name: PandasDatasource
//!   data_asset_type:
//!     class_name: PandasDataset
//!   generators:
//!     subdir_reader:
//!       class_name: SubdirReaderBatchKwargsGenerator
//!       base_directory: ../data
//! ```

use std::path::{Path, PathBuf};

use assay_batch::ReaderOptions;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{GeneratorError, Result};
use crate::extension::KnownExtensions;
use crate::generator::Generator;
use crate::glob_reader::GlobReaderGenerator;
use crate::glob_spec::AssetGlobEntry;
use crate::subdir::{DirectoryOptions, SubdirReaderGenerator};
use crate::table::TableGenerator;

/// Class name of the directory-convention catalog
pub const SUBDIR_READER_CLASS: &str = "SubdirReaderBatchKwargsGenerator";
/// Class name of the glob map catalog
pub const GLOB_READER_CLASS: &str = "GlobReaderBatchKwargsGenerator";
/// Class name of the remote table catalog
pub const TABLE_CLASS: &str = "TableBatchKwargsGenerator";

/// One generator entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "class_name")]
pub enum GeneratorConfig {
    /// Directory-convention catalog
    #[serde(rename = "SubdirReaderBatchKwargsGenerator")]
    SubdirReader(SubdirReaderConfig),
    /// Glob map catalog
    #[serde(rename = "GlobReaderBatchKwargsGenerator")]
    GlobReader(GlobReaderConfig),
    /// Remote table catalog
    #[serde(rename = "TableBatchKwargsGenerator")]
    Table(TableConfig),
}

/// Options of [`SubdirReaderGenerator`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubdirReaderConfig {
    pub base_directory: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known_extensions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "ReaderOptions::is_empty")]
    pub reader_options: ReaderOptions,
}

/// Options of [`GlobReaderGenerator`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobReaderConfig {
    pub base_directory: PathBuf,
    #[serde(default)]
    pub asset_globs: IndexMap<String, AssetGlobEntry>,
    #[serde(default, skip_serializing_if = "ReaderOptions::is_empty")]
    pub reader_options: ReaderOptions,
}

/// Options of [`TableGenerator`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    #[serde(default)]
    pub tables: Vec<String>,
}

impl GeneratorConfig {
    /// Directory-convention entry with default options
    #[must_use]
    pub fn subdir_reader(base_directory: impl Into<PathBuf>) -> Self {
        Self::SubdirReader(SubdirReaderConfig {
            base_directory: base_directory.into(),
            known_extensions: None,
            reader_options: ReaderOptions::new(),
        })
    }

    /// Configured class name
    #[must_use]
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::SubdirReader(_) => SUBDIR_READER_CLASS,
            Self::GlobReader(_) => GLOB_READER_CLASS,
            Self::Table(_) => TABLE_CLASS,
        }
    }

    /// Instantiate the generator
    ///
    /// Relative base directories resolve against `root`.
    ///
    /// # Errors
    /// Returns error if the configuration is invalid
    pub fn build(&self, name: &str, root: &Path) -> Result<Generator> {
        Ok(match self {
            Self::SubdirReader(cfg) => {
                let mut options =
                    DirectoryOptions::new().with_reader_options(cfg.reader_options.clone());
                if let Some(extensions) = &cfg.known_extensions {
                    if extensions.is_empty() {
                        return Err(GeneratorError::Config(format!(
                            "generator '{name}': known_extensions must not be empty"
                        )));
                    }
                    options = options.with_known_extensions(KnownExtensions::new(extensions));
                }
                SubdirReaderGenerator::new(name, root.join(&cfg.base_directory))
                    .with_options(options)
                    .into()
            }
            Self::GlobReader(cfg) => GlobReaderGenerator::new(
                name,
                root.join(&cfg.base_directory),
                cfg.asset_globs.clone(),
            )?
            .with_reader_options(cfg.reader_options.clone())
            .into(),
            Self::Table(cfg) => TableGenerator::new(name, cfg.tables.iter().cloned()).into(),
        })
    }
}

/// `data_asset_type` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataAssetTypeConfig {
    pub class_name: String,
}

/// One datasource entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasourceConfig {
    pub class_name: String,
    pub data_asset_type: DataAssetTypeConfig,
    #[serde(default)]
    pub generators: IndexMap<String, GeneratorConfig>,
}

impl DatasourceConfig {
    /// Parse a single datasource entry
    ///
    /// # Errors
    /// Returns error if the YAML is malformed or names an unknown generator
    /// class
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| GeneratorError::Config(e.to_string()))
    }

    /// Render as YAML
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| GeneratorError::Config(e.to_string()))
    }
}
