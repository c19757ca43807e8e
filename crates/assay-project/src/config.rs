//! Project configuration (`assay.yml`)

use assay_generator::DatasourceConfig;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Current config format version
pub const CONFIG_VERSION: f64 = 1.0;

/// Name of the local docs site
pub const LOCAL_SITE: &str = "local_site";

/// Parsed `assay.yml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default = "default_version")]
    pub config_version: f64,

    /// Datasources keyed by name
    #[serde(default)]
    pub datasources: IndexMap<String, DatasourceConfig>,

    /// Suite directory, relative to the project directory
    #[serde(default = "default_expectations_directory")]
    pub expectations_directory: String,

    /// Validation result directory, relative to the project directory
    #[serde(default = "default_validations_directory")]
    pub validations_directory: String,

    /// Docs sites keyed by name
    #[serde(default = "default_sites")]
    pub data_docs_sites: IndexMap<String, DocsSiteConfig>,
}

/// One docs site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocsSiteConfig {
    /// Output directory, relative to the project directory
    pub base_directory: String,
}

fn default_version() -> f64 {
    CONFIG_VERSION
}

fn default_expectations_directory() -> String {
    "expectations".to_string()
}

fn default_validations_directory() -> String {
    "uncommitted/validations".to_string()
}

fn default_sites() -> IndexMap<String, DocsSiteConfig> {
    IndexMap::from([(
        LOCAL_SITE.to_string(),
        DocsSiteConfig {
            base_directory: "uncommitted/data_docs/local_site".to_string(),
        },
    )])
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            config_version: CONFIG_VERSION,
            datasources: IndexMap::new(),
            expectations_directory: default_expectations_directory(),
            validations_directory: default_validations_directory(),
            data_docs_sites: default_sites(),
        }
    }
}

impl ProjectConfig {
    /// Parse from YAML
    ///
    /// # Errors
    /// Returns error if the YAML is invalid or names unknown generator classes
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Render as YAML
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
