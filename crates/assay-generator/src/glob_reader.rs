//! Explicit glob map catalog
//!
//! Asset names are exactly the configured keys; the filesystem is only
//! consulted when an asset is iterated.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use assay_batch::ReaderOptions;
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::{GeneratorError, Result};
use crate::generator::{BatchKwargsGenerator, BatchKwargsIter, BatchTemplate, IteratorOptions};
use crate::glob_spec::{AssetGlobEntry, AssetGlobSpec, BareGlobDeprecation};
use crate::partition::{Partitioner, PathPartitioner};

/// Asset served when no globs are configured
pub const DEFAULT_ASSET: &str = "default";

/// Wildcards never match a leading dot
const MATCH_OPTIONS: glob::MatchOptions = glob::MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: true,
};

#[derive(Debug, Clone)]
struct CompiledAsset {
    spec: AssetGlobSpec,
    partitioner: Arc<dyn Partitioner>,
}

/// Catalog of assets named by configured glob patterns
#[derive(Debug, Clone)]
pub struct GlobReaderGenerator {
    name: String,
    base_directory: PathBuf,
    asset_globs: IndexMap<String, AssetGlobEntry>,
    assets: IndexMap<String, CompiledAsset>,
    reader_options: ReaderOptions,
    partitioner_override: Option<Arc<dyn Partitioner>>,
    deprecations: Vec<String>,
}

impl GlobReaderGenerator {
    /// Build a catalog from configured asset globs
    ///
    /// An empty map serves a single `default` asset matching `*`. Bare-string
    /// entries are normalized and reported through one deprecation warning.
    ///
    /// # Errors
    /// Returns error if any pattern is invalid or a partitioner fails to build
    pub fn new(
        name: impl Into<String>,
        base_directory: impl Into<PathBuf>,
        asset_globs: IndexMap<String, AssetGlobEntry>,
    ) -> Result<Self> {
        let name = name.into();
        let asset_globs = if asset_globs.is_empty() {
            IndexMap::from([(
                DEFAULT_ASSET.to_string(),
                AssetGlobEntry::from(AssetGlobSpec::new("*")),
            )])
        } else {
            asset_globs
        };

        let bare: Vec<String> = asset_globs
            .iter()
            .filter(|(_, entry)| entry.is_bare())
            .map(|(asset, _)| asset.clone())
            .collect();
        let mut deprecations = Vec::new();
        if !bare.is_empty() {
            let deprecation = BareGlobDeprecation { assets: bare };
            warn!(generator = %name, "{deprecation}");
            deprecations.push(deprecation.to_string());
        }

        let mut assets = IndexMap::with_capacity(asset_globs.len());
        for (asset, entry) in &asset_globs {
            let spec = entry.clone().into_spec();
            spec.validate(asset)?;
            let partitioner = match &spec.partitioner {
                Some(config) => config.build()?,
                None => Arc::new(PathPartitioner),
            };
            assets.insert(asset.clone(), CompiledAsset { spec, partitioner });
        }

        Ok(Self {
            name,
            base_directory: base_directory.into(),
            asset_globs,
            assets,
            reader_options: ReaderOptions::new(),
            partitioner_override: None,
            deprecations,
        })
    }

    /// Replace partitioning for every asset
    #[inline]
    #[must_use]
    pub fn with_partitioner(mut self, partitioner: Arc<dyn Partitioner>) -> Self {
        self.partitioner_override = Some(partitioner);
        self
    }

    /// With reader options for every batch
    ///
    /// Per-asset reader options take precedence.
    #[inline]
    #[must_use]
    pub fn with_reader_options(mut self, reader_options: ReaderOptions) -> Self {
        self.reader_options = reader_options;
        self
    }

    /// Matched directory
    #[inline]
    #[must_use]
    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Asset globs as configured, bare entries kept bare
    #[inline]
    #[must_use]
    pub fn asset_globs(&self) -> &IndexMap<String, AssetGlobEntry> {
        &self.asset_globs
    }

    /// Generator-wide reader options
    #[inline]
    #[must_use]
    pub fn reader_options(&self) -> &ReaderOptions {
        &self.reader_options
    }

    /// Deprecation warnings raised at construction
    #[inline]
    #[must_use]
    pub fn deprecation_warnings(&self) -> &[String] {
        &self.deprecations
    }

    fn full_pattern(&self, glob: &str) -> Result<String> {
        let base = self
            .base_directory
            .to_str()
            .ok_or_else(|| GeneratorError::InvalidBaseDirectory {
                path: self.base_directory.clone(),
                reason: "path is not valid UTF-8".to_string(),
            })?;
        let base = glob::Pattern::escape(base.trim_end_matches('/'));
        Ok(format!("{base}/{glob}"))
    }
}

impl BatchKwargsGenerator for GlobReaderGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_available_data_asset_names(&self) -> Result<BTreeSet<String>> {
        Ok(self.assets.keys().cloned().collect())
    }

    fn get_iterator(&self, asset: &str, options: &IteratorOptions) -> Result<BatchKwargsIter> {
        let compiled = self
            .assets
            .get(asset)
            .ok_or_else(|| GeneratorError::unknown_asset(&self.name, asset))?;
        let spec = &compiled.spec;

        let pattern = self.full_pattern(&spec.glob)?;
        let paths = glob::glob_with(&pattern, MATCH_OPTIONS).map_err(|e| {
            GeneratorError::InvalidAssetGlob {
                asset: asset.to_string(),
                reason: e.to_string(),
            }
        })?;
        debug!(generator = %self.name, asset, %pattern, "resolving asset glob");

        let partitioner = self
            .partitioner_override
            .clone()
            .unwrap_or_else(|| Arc::clone(&compiled.partitioner));
        let template = BatchTemplate::new(
            spec.reader_method.clone(),
            self.reader_options.merged(&spec.reader_options),
            options,
        );
        Ok(BatchKwargsIter::glob(
            paths,
            spec.glob.clone(),
            partitioner,
            template,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_map_serves_default_asset() {
        let generator = GlobReaderGenerator::new("glob", "/nonexistent", IndexMap::new()).unwrap();
        let names = generator.get_available_data_asset_names().unwrap();
        assert_eq!(names.into_iter().collect::<Vec<_>>(), vec![DEFAULT_ASSET]);
        assert!(generator.deprecation_warnings().is_empty());
    }

    #[test]
    fn invalid_glob_fails_construction() {
        let globs = IndexMap::from([("broken".to_string(), AssetGlobEntry::from("[oops"))]);
        let err = GlobReaderGenerator::new("glob", "/tmp", globs).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn unknown_asset_is_reported() {
        let globs = IndexMap::from([(
            "a".to_string(),
            AssetGlobEntry::from(AssetGlobSpec::new("*.csv")),
        )]);
        let generator = GlobReaderGenerator::new("glob", "/tmp", globs).unwrap();
        let err = generator
            .get_iterator("b", &IteratorOptions::default())
            .unwrap_err();
        assert!(err.is_unknown_asset());
    }

    #[test]
    fn wildcards_skip_hidden_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.blarg", ".hidden.blarg"] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }
        let globs = IndexMap::from([("blargs".to_string(), AssetGlobEntry::from("*.blarg"))]);
        let generator = GlobReaderGenerator::new("glob", dir.path(), globs).unwrap();

        let paths: Vec<PathBuf> = generator
            .get_iterator("blargs", &IteratorOptions::default())
            .unwrap()
            .filter_map(|k| k.path().map(Path::to_path_buf))
            .collect();
        assert_eq!(paths, vec![dir.path().join("a.blarg")]);
    }

    #[test]
    fn explicit_leading_dot_still_matches() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".hidden.blarg"), "x").unwrap();
        let globs = IndexMap::from([("hidden".to_string(), AssetGlobEntry::from(".*.blarg"))]);
        let generator = GlobReaderGenerator::new("glob", dir.path(), globs).unwrap();

        let count = generator
            .get_iterator("hidden", &IteratorOptions::default())
            .unwrap()
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn base_directory_metacharacters_are_literal() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("odd[dir]");
        std::fs::create_dir_all(&base).unwrap();
        std::fs::write(base.join("x_1.csv"), "a\n1\n").unwrap();

        let globs = IndexMap::from([(
            "x".to_string(),
            AssetGlobEntry::from(AssetGlobSpec::new("x_*.csv")),
        )]);
        let generator = GlobReaderGenerator::new("glob", &base, globs).unwrap();
        let ids: Vec<_> = generator
            .get_iterator("x", &IteratorOptions::default())
            .unwrap()
            .filter_map(|k| k.partition_id().map(str::to_string))
            .collect();
        assert_eq!(ids, vec!["1"]);
    }
}
