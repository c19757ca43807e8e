//! On-disk project layout
//!
//! ```text
//! <root>/assay/
//!   assay.yml
//!   .gitignore
//!   expectations/<asset>/<suite>.json
//!   uncommitted/
//!     config_variables.yml
//!     validations/<asset>/<suite>/<run_id>/<uuid>.json
//!     data_docs/local_site/
//! ```
//!
//! Bare suite names drop the `<asset>/` level.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use assay_generator::config::DataAssetTypeConfig;
use assay_generator::{Datasource, DatasourceConfig, DatasourceKind, GeneratorConfig};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ProjectConfig;
use crate::error::{ProjectError, Result};
use crate::suite::{ExpectationSuite, SuiteId, ValidationId, ValidationResult};

/// Project directory name below the user's root
pub const PROJECT_DIR: &str = "assay";
/// Config file name inside the project directory
pub const CONFIG_FILE: &str = "assay.yml";

const GITIGNORE: &str = "uncommitted/\n";
const CONFIG_VARIABLES: &str =
    "# Per-machine values and credentials referenced from assay.yml; never committed.\n";

/// Datasource as listed in the project config
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasourceSummary {
    pub name: String,
    pub class_name: String,
}

/// Persistence used by the init flow
pub trait ProjectStore {
    /// Project directory
    fn project_dir(&self) -> &Path;

    /// Check whether a project config exists
    fn is_initialized(&self) -> bool;

    /// Create the directory layout and a default config; existing files are
    /// kept
    ///
    /// # Errors
    /// Returns error if the layout cannot be written
    fn scaffold(&mut self) -> Result<()>;

    /// Configured datasources in config order
    ///
    /// # Errors
    /// Returns error if the config cannot be read
    fn list_datasources(&self) -> Result<Vec<DatasourceSummary>>;

    /// Register a datasource and persist it
    ///
    /// # Errors
    /// Returns error if the name is taken or the datasource fails to build
    fn add_datasource(
        &mut self,
        name: &str,
        kind: DatasourceKind,
        generators: IndexMap<String, GeneratorConfig>,
    ) -> Result<Datasource>;

    /// Build a configured datasource
    ///
    /// # Errors
    /// Returns error if the name is unknown or the config is invalid
    fn get_datasource(&self, name: &str) -> Result<Datasource>;

    /// Stored expectation suites, sorted
    ///
    /// # Errors
    /// Returns error if the suite directory cannot be read
    fn list_expectation_suites(&self) -> Result<Vec<SuiteId>>;
}

/// Project stored under a directory
#[derive(Debug, Clone)]
pub struct FileProject {
    dir: PathBuf,
}

impl FileProject {
    /// Project under `root/assay`
    #[must_use]
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::at(root.as_ref().join(PROJECT_DIR))
    }

    /// Project in exactly `dir`
    #[must_use]
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of `assay.yml`
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    /// Read `assay.yml`
    ///
    /// # Errors
    /// Returns [`ProjectError::NotInitialized`] if absent
    pub fn config(&self) -> Result<ProjectConfig> {
        let path = self.config_path();
        let yaml = match fs::read_to_string(&path) {
            Ok(yaml) => yaml,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ProjectError::NotInitialized(self.dir.clone()))
            }
            Err(e) => return Err(ProjectError::io(path, e)),
        };
        ProjectConfig::from_yaml(&yaml)
    }

    /// Write `assay.yml`
    ///
    /// # Errors
    /// Returns error if the file cannot be written
    pub fn save_config(&self, config: &ProjectConfig) -> Result<()> {
        write_file(&self.config_path(), &config.to_yaml()?)
    }

    fn expectations_dir(&self, config: &ProjectConfig) -> PathBuf {
        self.dir.join(&config.expectations_directory)
    }

    fn validations_dir(&self, config: &ProjectConfig) -> PathBuf {
        self.dir.join(&config.validations_directory)
    }

    /// Output directory of a docs site
    ///
    /// # Errors
    /// Returns error if the config cannot be read or the site is unknown
    pub fn docs_site_dir(&self, site: &str) -> Result<PathBuf> {
        let config = self.config()?;
        config
            .data_docs_sites
            .get(site)
            .map(|s| self.dir.join(&s.base_directory))
            .ok_or_else(|| ProjectError::UnknownDocsSite(site.to_string()))
    }

    /// Where a suite is stored
    ///
    /// # Errors
    /// Returns error if the config cannot be read
    pub fn suite_path(&self, id: &SuiteId) -> Result<PathBuf> {
        let config = self.config()?;
        Ok(self
            .expectations_dir(&config)
            .join(format!("{}.json", id.relative_path())))
    }

    /// Persist a suite, replacing any previous version
    ///
    /// # Errors
    /// Returns error if the suite name is malformed or the file cannot be
    /// written
    pub fn save_suite(&self, suite: &ExpectationSuite) -> Result<PathBuf> {
        let path = self.suite_path(&suite.id()?)?;
        write_json(&path, suite)?;
        Ok(path)
    }

    /// Load a stored suite
    ///
    /// # Errors
    /// Returns error if the suite is missing or malformed
    pub fn load_suite(&self, id: &SuiteId) -> Result<ExpectationSuite> {
        read_json(&self.suite_path(id)?)
    }

    /// Where a validation result is stored
    ///
    /// # Errors
    /// Returns error if the config cannot be read
    pub fn validation_path(&self, id: &ValidationId) -> Result<PathBuf> {
        let config = self.config()?;
        Ok(self
            .validations_dir(&config)
            .join(format!("{}.json", id.relative_path())))
    }

    /// Persist a validation result
    ///
    /// # Errors
    /// Returns error if the file cannot be written
    pub fn save_validation(&self, id: &ValidationId, result: &ValidationResult) -> Result<PathBuf> {
        let path = self.validation_path(id)?;
        write_json(&path, result)?;
        Ok(path)
    }

    /// Load a stored validation result
    ///
    /// # Errors
    /// Returns error if the result is missing or malformed
    pub fn load_validation(&self, id: &ValidationId) -> Result<ValidationResult> {
        read_json(&self.validation_path(id)?)
    }

    /// Stored validation results, sorted by path
    ///
    /// # Errors
    /// Returns error if the validations directory cannot be read
    pub fn list_validations(&self) -> Result<Vec<ValidationId>> {
        let config = self.config()?;
        let mut ids = Vec::new();
        // `<suite>/<run>/<uuid>.json` or `<asset>/<suite>/<run>/<uuid>.json`
        for top in subdirs(&self.validations_dir(&config))? {
            for second in subdirs(&top)? {
                if let Ok(suite) = SuiteId::bare(file_name(&top)) {
                    push_validations(&mut ids, &suite, &second)?;
                }
                let Ok(suite) = SuiteId::new(file_name(&top), file_name(&second)) else {
                    continue;
                };
                for run_dir in subdirs(&second)? {
                    push_validations(&mut ids, &suite, &run_dir)?;
                }
            }
        }
        Ok(ids)
    }
}

impl ProjectStore for FileProject {
    fn project_dir(&self) -> &Path {
        &self.dir
    }

    fn is_initialized(&self) -> bool {
        self.config_path().is_file()
    }

    fn scaffold(&mut self) -> Result<()> {
        let config = if self.is_initialized() {
            self.config()?
        } else {
            let config = ProjectConfig::default();
            create_dir(&self.dir)?;
            self.save_config(&config)?;
            info!(project = %self.dir.display(), "created project config");
            config
        };

        create_dir(&self.expectations_dir(&config))?;
        create_dir(&self.validations_dir(&config))?;
        for site in config.data_docs_sites.values() {
            create_dir(&self.dir.join(&site.base_directory))?;
        }
        write_if_missing(&self.dir.join(".gitignore"), GITIGNORE)?;
        write_if_missing(
            &self.dir.join("uncommitted").join("config_variables.yml"),
            CONFIG_VARIABLES,
        )?;
        debug!(project = %self.dir.display(), "project layout ready");
        Ok(())
    }

    fn list_datasources(&self) -> Result<Vec<DatasourceSummary>> {
        if !self.is_initialized() {
            return Ok(Vec::new());
        }
        Ok(self
            .config()?
            .datasources
            .iter()
            .map(|(name, ds)| DatasourceSummary {
                name: name.clone(),
                class_name: ds.class_name.clone(),
            })
            .collect())
    }

    fn add_datasource(
        &mut self,
        name: &str,
        kind: DatasourceKind,
        generators: IndexMap<String, GeneratorConfig>,
    ) -> Result<Datasource> {
        let mut config = self.config()?;
        if config.datasources.contains_key(name) {
            return Err(ProjectError::DatasourceExists(name.to_string()));
        }
        let ds_config = DatasourceConfig {
            class_name: kind.class_name().to_string(),
            data_asset_type: DataAssetTypeConfig {
                class_name: kind.data_asset_class_name().to_string(),
            },
            generators,
        };
        let datasource = Datasource::from_config(name, ds_config, &self.dir)?;
        config
            .datasources
            .insert(name.to_string(), datasource.to_config().clone());
        self.save_config(&config)?;
        info!(datasource = name, %kind, "added datasource");
        Ok(datasource)
    }

    fn get_datasource(&self, name: &str) -> Result<Datasource> {
        let mut config = self.config()?;
        let ds_config = config
            .datasources
            .shift_remove(name)
            .ok_or_else(|| ProjectError::UnknownDatasource(name.to_string()))?;
        Ok(Datasource::from_config(name, ds_config, &self.dir)?)
    }

    fn list_expectation_suites(&self) -> Result<Vec<SuiteId>> {
        if !self.is_initialized() {
            return Ok(Vec::new());
        }
        let config = self.config()?;
        let mut suites = Vec::new();
        let root = self.expectations_dir(&config);
        for file in json_files(&root)? {
            match SuiteId::bare(stem(&file)) {
                Ok(id) => suites.push(id),
                Err(e) => warn!(path = %file.display(), error = %e, "unrecognized suite file, skipping"),
            }
        }
        for asset_dir in subdirs(&root)? {
            for file in json_files(&asset_dir)? {
                match SuiteId::new(file_name(&asset_dir), stem(&file)) {
                    Ok(id) => suites.push(id),
                    Err(e) => warn!(path = %file.display(), error = %e, "unrecognized suite file, skipping"),
                }
            }
        }
        suites.sort();
        Ok(suites)
    }
}

/// Validation results stored directly under one run directory
fn push_validations(ids: &mut Vec<ValidationId>, suite: &SuiteId, run_dir: &Path) -> Result<()> {
    for file in json_files(run_dir)? {
        let Ok(id) = Uuid::parse_str(&stem(&file)) else {
            warn!(path = %file.display(), "validation file without uuid name, skipping");
            continue;
        };
        ids.push(ValidationId {
            suite: suite.clone(),
            run_id: file_name(run_dir),
            id,
        });
    }
    Ok(())
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| ProjectError::io(path, e))
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir(parent)?;
    }
    fs::write(path, contents).map_err(|e| ProjectError::io(path, e))
}

fn write_if_missing(path: &Path, contents: &str) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    write_file(path, contents)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    write_file(path, &serde_json::to_string_pretty(value)?)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).map_err(|e| ProjectError::io(path, e))?;
    Ok(serde_json::from_str(&text)?)
}

/// Sorted entries of `dir` matching `keep`; a missing directory is empty
fn entries(dir: &Path, keep: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>> {
    let read = match fs::read_dir(dir) {
        Ok(read) => read,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ProjectError::io(dir, e)),
    };
    let mut paths: Vec<PathBuf> = read
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| !file_name(path).starts_with('.') && keep(path))
        .collect();
    paths.sort();
    Ok(paths)
}

fn subdirs(dir: &Path) -> Result<Vec<PathBuf>> {
    entries(dir, Path::is_dir)
}

fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    entries(dir, |p| {
        p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("json")
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaffold_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = FileProject::new(dir.path());
        assert!(!project.is_initialized());

        project.scaffold().unwrap();
        fs::write(project.project_dir().join(".gitignore"), "custom\n").unwrap();
        project.scaffold().unwrap();

        assert!(project.is_initialized());
        assert_eq!(
            fs::read_to_string(project.project_dir().join(".gitignore")).unwrap(),
            "custom\n"
        );
        for sub in [
            "expectations",
            "uncommitted/validations",
            "uncommitted/data_docs/local_site",
            "uncommitted/config_variables.yml",
        ] {
            assert!(project.project_dir().join(sub).exists(), "{sub}");
        }
    }

    #[test]
    fn uninitialized_project_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let project = FileProject::new(dir.path());
        assert!(project.list_datasources().unwrap().is_empty());
        assert!(project.list_expectation_suites().unwrap().is_empty());
        assert!(matches!(project.config(), Err(ProjectError::NotInitialized(_))));
    }

    #[test]
    fn duplicate_datasource_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = FileProject::new(dir.path());
        project.scaffold().unwrap();

        let generators = || {
            IndexMap::from([(
                "subdir_reader".to_string(),
                GeneratorConfig::subdir_reader(dir.path()),
            )])
        };
        project
            .add_datasource("files_datasource", DatasourceKind::Pandas, generators())
            .unwrap();
        let err = project
            .add_datasource("files_datasource", DatasourceKind::Pandas, generators())
            .unwrap_err();
        assert!(matches!(err, ProjectError::DatasourceExists(_)));
    }
}
