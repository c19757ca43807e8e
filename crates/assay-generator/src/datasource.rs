//! Datasources: named owners of generators
//!
//! A [`Datasource`] resolves a data asset name to batch descriptors through
//! one of its generators. Names are never guessed: an asset that none of the
//! generators report fails with [`GeneratorError::UnknownAsset`].

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;

use assay_batch::BatchKwargs;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{DataAssetTypeConfig, DatasourceConfig, GeneratorConfig};
use crate::error::{GeneratorError, Result};
use crate::generator::{BatchKwargsGenerator, BatchKwargsIter, Generator, IteratorOptions};

/// Generator name used for file datasources created interactively
pub const DEFAULT_GENERATOR: &str = "subdir_reader";

/// Compute backend a datasource loads into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasourceKind {
    /// In-memory dataframes
    Pandas,
    /// Spark dataframes
    Spark,
    /// SQL engine
    Sql,
}

impl DatasourceKind {
    /// All kinds
    pub const ALL: [Self; 3] = [Self::Pandas, Self::Spark, Self::Sql];

    /// Datasource class name in configuration
    #[must_use]
    pub fn class_name(self) -> &'static str {
        match self {
            Self::Pandas => "PandasDatasource",
            Self::Spark => "SparkDFDatasource",
            Self::Sql => "SqlAlchemyDatasource",
        }
    }

    /// Data asset class name in configuration
    #[must_use]
    pub fn data_asset_class_name(self) -> &'static str {
        match self {
            Self::Pandas => "PandasDataset",
            Self::Spark => "SparkDFDataset",
            Self::Sql => "SqlAlchemyDataset",
        }
    }

    /// Look up by datasource class name
    ///
    /// # Errors
    /// Returns [`GeneratorError::UnknownClass`] for unrecognized names
    pub fn from_class_name(class_name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.class_name() == class_name)
            .ok_or_else(|| GeneratorError::UnknownClass {
                what: "datasource",
                class_name: class_name.to_string(),
            })
    }
}

impl fmt::Display for DatasourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name())
    }
}

/// Named set of generators over one backend
#[derive(Debug)]
pub struct Datasource {
    name: String,
    kind: DatasourceKind,
    config: DatasourceConfig,
    generators: IndexMap<String, Generator>,
}

impl Datasource {
    /// Build from a configuration entry
    ///
    /// Relative generator paths resolve against `root`.
    ///
    /// # Errors
    /// Returns error if a class name is unknown, the data asset type does not
    /// belong to the datasource class, or a generator fails to build
    pub fn from_config(name: impl Into<String>, config: DatasourceConfig, root: &Path) -> Result<Self> {
        let name = name.into();
        let kind = DatasourceKind::from_class_name(&config.class_name)?;
        if config.data_asset_type.class_name != kind.data_asset_class_name() {
            return Err(GeneratorError::UnknownClass {
                what: "data asset",
                class_name: config.data_asset_type.class_name.clone(),
            });
        }

        let mut generators = IndexMap::with_capacity(config.generators.len());
        for (generator_name, generator_config) in &config.generators {
            let generator = generator_config.build(generator_name, root)?;
            generators.insert(generator_name.clone(), generator);
        }
        debug!(datasource = %name, %kind, generators = generators.len(), "datasource built");

        Ok(Self {
            name,
            kind,
            config,
            generators,
        })
    }

    /// File datasource with one directory-convention generator
    ///
    /// # Errors
    /// Returns error if the generator fails to build
    pub fn files(
        name: impl Into<String>,
        kind: DatasourceKind,
        base_directory: impl AsRef<Path>,
        root: &Path,
    ) -> Result<Self> {
        Self::from_config(name, Self::files_config(kind, base_directory), root)
    }

    /// Configuration of a file datasource
    #[must_use]
    pub fn files_config(kind: DatasourceKind, base_directory: impl AsRef<Path>) -> DatasourceConfig {
        DatasourceConfig {
            class_name: kind.class_name().to_string(),
            data_asset_type: DataAssetTypeConfig {
                class_name: kind.data_asset_class_name().to_string(),
            },
            generators: IndexMap::from([(
                DEFAULT_GENERATOR.to_string(),
                GeneratorConfig::subdir_reader(base_directory.as_ref()),
            )]),
        }
    }

    /// Datasource name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backend kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> DatasourceKind {
        self.kind
    }

    /// Configuration this datasource was built from
    #[inline]
    #[must_use]
    pub fn to_config(&self) -> &DatasourceConfig {
        &self.config
    }

    /// Generator names in configuration order
    pub fn generator_names(&self) -> impl Iterator<Item = &str> {
        self.generators.keys().map(String::as_str)
    }

    /// Look up a generator
    ///
    /// # Errors
    /// Returns [`GeneratorError::UnknownGenerator`] if absent
    pub fn generator(&self, name: &str) -> Result<&Generator> {
        self.generators
            .get(name)
            .ok_or_else(|| GeneratorError::UnknownGenerator(name.to_string()))
    }

    /// Asset names per generator
    ///
    /// # Errors
    /// Returns the first generator listing failure
    pub fn available_data_asset_names(&self) -> Result<IndexMap<String, BTreeSet<String>>> {
        self.generators
            .iter()
            .map(|(name, generator)| Ok((name.clone(), generator.get_available_data_asset_names()?)))
            .collect()
    }

    /// Generator serving `asset`
    ///
    /// With no generator named, the first generator reporting the asset wins.
    fn resolve(&self, asset: &str, generator: Option<&str>) -> Result<&Generator> {
        if let Some(name) = generator {
            let generator = self.generator(name)?;
            if generator.get_available_data_asset_names()?.contains(asset) {
                return Ok(generator);
            }
            return Err(GeneratorError::unknown_asset(name, asset));
        }

        for generator in self.generators.values() {
            if generator.get_available_data_asset_names()?.contains(asset) {
                return Ok(generator);
            }
        }
        Err(GeneratorError::unknown_asset(&self.name, asset))
    }

    /// Iterate the batches of a known asset
    ///
    /// # Errors
    /// Returns [`GeneratorError::UnknownAsset`] if no generator reports
    /// `asset`
    pub fn get_iterator(
        &self,
        asset: &str,
        generator: Option<&str>,
        options: &IteratorOptions,
    ) -> Result<BatchKwargsIter> {
        self.resolve(asset, generator)?.get_iterator(asset, options)
    }

    /// First batch of a known asset
    ///
    /// # Errors
    /// Returns [`GeneratorError::UnknownAsset`] for unreported names and
    /// [`GeneratorError::NoBatches`] when the asset has no batches
    pub fn build_batch_kwargs(&self, asset: &str, generator: Option<&str>) -> Result<BatchKwargs> {
        let resolved = self.resolve(asset, generator)?;
        let kwargs = resolved
            .get_iterator(asset, &IteratorOptions::default())?
            .next()
            .ok_or_else(|| GeneratorError::NoBatches {
                generator: resolved.name().to_string(),
                asset: asset.to_string(),
            })?;
        info!(datasource = %self.name, generator = resolved.name(), asset, "built batch kwargs");
        Ok(kwargs)
    }

    /// Descriptor of one specific file, found through the catalog
    ///
    /// Walks every generator's assets and their batches until one points at
    /// `path`, so the descriptor carries the same options and partition id
    /// iteration would give it.
    ///
    /// # Errors
    /// Returns [`GeneratorError::UnknownAsset`] if no batch points at
    /// `path`, or the first listing failure
    pub fn batch_kwargs_for_file(&self, path: impl AsRef<Path>) -> Result<BatchKwargs> {
        let path = path.as_ref();
        let wanted = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let same_file = |candidate: &Path| {
            candidate == path
                || fs::canonicalize(candidate).is_ok_and(|candidate| candidate == wanted)
        };

        for (name, generator) in &self.generators {
            for asset in generator.get_available_data_asset_names()? {
                let found = generator
                    .get_iterator(&asset, &IteratorOptions::default())?
                    .find(|kwargs| kwargs.path().is_some_and(same_file));
                if let Some(kwargs) = found {
                    debug!(datasource = %self.name, generator = %name, %asset, path = %path.display(), "file resolved to asset");
                    return Ok(kwargs);
                }
            }
        }
        Err(GeneratorError::unknown_asset(
            &self.name,
            &path.display().to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_class_names() {
        assert_eq!(DatasourceKind::Pandas.class_name(), "PandasDatasource");
        assert_eq!(DatasourceKind::Pandas.data_asset_class_name(), "PandasDataset");
        assert_eq!(
            DatasourceKind::from_class_name("SparkDFDatasource").unwrap(),
            DatasourceKind::Spark
        );
        assert!(DatasourceKind::from_class_name("ExcelDatasource")
            .unwrap_err()
            .is_config_error());
    }

    #[test]
    fn mismatched_data_asset_type_rejected() {
        let mut config = Datasource::files_config(DatasourceKind::Pandas, "data");
        config.data_asset_type.class_name = "SparkDFDataset".to_string();
        let err = Datasource::from_config("ds", config, Path::new("/")).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn files_resolve_through_the_catalog() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("f3")).unwrap();
        for name in ["Titanic.csv", "notes.txt", "f3/f3_1.csv"] {
            fs::write(dir.path().join(name), "a,b\n1,2\n").unwrap();
        }
        let ds = Datasource::files("ds", DatasourceKind::Pandas, dir.path(), dir.path()).unwrap();

        let kwargs = ds.batch_kwargs_for_file(dir.path().join("Titanic.csv")).unwrap();
        assert_eq!(kwargs.path(), Some(dir.path().join("Titanic.csv").as_path()));
        assert_eq!(kwargs.get("engine"), Some(&serde_json::json!("python")));

        let kwargs = ds.batch_kwargs_for_file(dir.path().join("f3/f3_1.csv")).unwrap();
        assert_eq!(kwargs.partition_id(), Some("f3_1"));

        for missing in ["notes.txt", "absent.csv"] {
            let err = ds.batch_kwargs_for_file(dir.path().join(missing)).unwrap_err();
            assert!(matches!(err, GeneratorError::UnknownAsset { .. }), "{err}");
        }
    }

    #[test]
    fn unknown_generator_is_reported() {
        let ds = Datasource::files("ds", DatasourceKind::Pandas, "data", Path::new("/p")).unwrap();
        let err = ds.build_batch_kwargs("x", Some("nope")).unwrap_err();
        assert!(matches!(err, GeneratorError::UnknownGenerator(ref g) if g == "nope"));
    }
}
