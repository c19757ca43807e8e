//! Directory-convention catalog
//!
//! Assets are discovered from the layout of one base directory, scanned
//! non-recursively:
//! - a data file directly under the base is an asset named by its stem
//! - a subdirectory holding at least one data file is an asset named by the
//!   subdirectory, with one partition per file
//!
//! When a file and a subdirectory share a name, iteration serves the
//! subdirectory.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use assay_batch::ReaderOptions;
use tracing::{debug, warn};

use crate::error::{GeneratorError, Result};
use crate::extension::{default_reader_options, extension_of, KnownExtensions};
use crate::generator::{
    BatchKwargsGenerator, BatchKwargsIter, BatchTemplate, FileBatch, IteratorOptions,
};

/// Options for the directory-convention catalog
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectoryOptions {
    /// Extensions that identify data files
    pub known_extensions: KnownExtensions,
    /// Reader options applied on top of per-extension defaults
    pub reader_options: ReaderOptions,
}

impl DirectoryOptions {
    /// Default options
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a replacement extension set
    #[inline]
    #[must_use]
    pub fn with_known_extensions(mut self, known_extensions: KnownExtensions) -> Self {
        self.known_extensions = known_extensions;
        self
    }

    /// With one more recognized extension
    #[inline]
    #[must_use]
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.known_extensions = self.known_extensions.with(extension);
        self
    }

    /// With reader options for every batch
    #[inline]
    #[must_use]
    pub fn with_reader_options(mut self, reader_options: ReaderOptions) -> Self {
        self.reader_options = reader_options;
        self
    }
}

/// Catalog built from a directory's layout
#[derive(Debug, Clone)]
pub struct SubdirReaderGenerator {
    name: String,
    base_directory: PathBuf,
    options: DirectoryOptions,
}

impl SubdirReaderGenerator {
    /// Create a catalog over `base_directory`
    ///
    /// The directory is not touched until discovery or iteration; a missing
    /// directory is an empty catalog.
    #[must_use]
    pub fn new(name: impl Into<String>, base_directory: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            base_directory: base_directory.into(),
            options: DirectoryOptions::default(),
        }
    }

    /// With catalog options
    #[inline]
    #[must_use]
    pub fn with_options(mut self, options: DirectoryOptions) -> Self {
        self.options = options;
        self
    }

    /// Scanned directory
    #[inline]
    #[must_use]
    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Catalog options
    #[inline]
    #[must_use]
    pub fn options(&self) -> &DirectoryOptions {
        &self.options
    }

    fn is_data_file(&self, path: &Path) -> bool {
        self.options.known_extensions.matches(path) && path.is_file()
    }

    /// Entries of the base directory, sorted by path
    fn base_entries(&self) -> Result<Vec<PathBuf>> {
        match read_sorted(&self.base_directory) {
            Ok(entries) => Ok(entries),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(base = %self.base_directory.display(), "base directory missing, empty catalog");
                Ok(Vec::new())
            }
            Err(e) => Err(GeneratorError::io(&self.base_directory, e)),
        }
    }

    /// Data files directly inside `dir`, sorted by file name
    ///
    /// An unreadable or vanished subdirectory has no data files.
    fn data_files_in(&self, dir: &Path) -> Vec<PathBuf> {
        match read_sorted(dir) {
            Ok(entries) => entries.into_iter().filter(|p| self.is_data_file(p)).collect(),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "cannot read subdirectory, skipping");
                Vec::new()
            }
        }
    }

    fn file_batch(&self, path: PathBuf, partition_id: Option<String>) -> FileBatch {
        let defaults = extension_of(&path)
            .map(default_reader_options)
            .unwrap_or_default();
        FileBatch {
            reader_options: defaults.merged(&self.options.reader_options),
            partition_id,
            path,
        }
    }

    /// Files backing `asset`, in iteration order
    fn resolve(&self, asset: &str) -> Result<Vec<FileBatch>> {
        if is_plain_name(asset) {
            let dir = self.base_directory.join(asset);
            if dir.is_dir() {
                let files = self.data_files_in(&dir);
                if !files.is_empty() {
                    return Ok(files
                        .into_iter()
                        .map(|path| {
                            let partition_id = stem(&path);
                            self.file_batch(path, partition_id)
                        })
                        .collect());
                }
            }
        }

        // Files sharing a stem are batches of one asset, in file-name order.
        let files: Vec<FileBatch> = self
            .base_entries()?
            .into_iter()
            .filter(|path| stem(path).as_deref() == Some(asset) && self.is_data_file(path))
            .map(|path| self.file_batch(path, None))
            .collect();
        if files.is_empty() {
            return Err(GeneratorError::unknown_asset(&self.name, asset));
        }
        Ok(files)
    }
}

impl BatchKwargsGenerator for SubdirReaderGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_available_data_asset_names(&self) -> Result<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        for path in self.base_entries()? {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            if path.is_dir() {
                if !self.data_files_in(&path).is_empty() {
                    names.insert(name.to_string());
                }
            } else if self.is_data_file(&path) {
                if let Some(stem) = stem(&path) {
                    names.insert(stem);
                }
            }
        }
        debug!(generator = %self.name, count = names.len(), "discovered data assets");
        Ok(names)
    }

    fn get_iterator(&self, asset: &str, options: &IteratorOptions) -> Result<BatchKwargsIter> {
        let files = self.resolve(asset)?;
        debug!(generator = %self.name, asset, files = files.len(), "resolved data asset");
        Ok(BatchKwargsIter::files(
            files,
            BatchTemplate::new(None, ReaderOptions::new(), options),
        ))
    }
}

fn read_sorted(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        match entry {
            Ok(entry) => entries.push(entry.path()),
            Err(e) => warn!(dir = %dir.display(), error = %e, "unreadable directory entry, skipping"),
        }
    }
    entries.sort();
    Ok(entries)
}

fn stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
}

/// Asset names never address anything outside the base directory
fn is_plain_name(asset: &str) -> bool {
    !asset.is_empty()
        && !asset.starts_with('.')
        && !asset.contains('/')
        && !asset.contains('\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, "a,b\n1,2\n").unwrap();
    }

    #[test]
    fn missing_base_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let generator = SubdirReaderGenerator::new("subdir", dir.path().join("nope"));
        assert!(generator.get_available_data_asset_names().unwrap().is_empty());
    }

    #[test]
    fn hidden_subdirectory_is_not_an_asset() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join(".cache/a.csv"));
        touch(&dir.path().join("visible/a.csv"));

        let generator = SubdirReaderGenerator::new("subdir", dir.path());
        let names = generator.get_available_data_asset_names().unwrap();
        assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["visible"]);
    }

    #[test]
    fn subdirectory_wins_over_same_named_file() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("sales.csv"));
        touch(&dir.path().join("sales/2019.csv"));
        touch(&dir.path().join("sales/2020.csv"));

        let generator = SubdirReaderGenerator::new("subdir", dir.path());
        let names = generator.get_available_data_asset_names().unwrap();
        assert_eq!(names.len(), 1);

        let ids: Vec<_> = generator
            .get_iterator("sales", &IteratorOptions::default())
            .unwrap()
            .map(|k| k.partition_id().map(str::to_string))
            .collect();
        assert_eq!(ids, vec![Some("2019".to_string()), Some("2020".to_string())]);
    }

    #[test]
    fn files_sharing_a_stem_are_batches_of_one_asset() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Titanic.xls"));
        touch(&dir.path().join("Titanic.csv"));

        let generator = SubdirReaderGenerator::new("subdir", dir.path());
        let paths: Vec<_> = generator
            .get_iterator("Titanic", &IteratorOptions::default())
            .unwrap()
            .filter_map(|k| k.path().map(Path::to_path_buf))
            .collect();
        assert_eq!(
            paths,
            vec![dir.path().join("Titanic.csv"), dir.path().join("Titanic.xls")]
        );
    }

    #[test]
    fn path_like_asset_names_are_unknown() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a/b.csv"));

        let generator = SubdirReaderGenerator::new("subdir", dir.path());
        let err = generator
            .get_iterator("../a", &IteratorOptions::default())
            .unwrap_err();
        assert!(err.is_unknown_asset());
    }

    #[test]
    fn configured_reader_options_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("f1.csv"));

        let options = DirectoryOptions::new().with_reader_options(
            ReaderOptions::new()
                .with("sep", serde_json::json!(";"))
                .unwrap(),
        );
        let generator = SubdirReaderGenerator::new("subdir", dir.path()).with_options(options);
        let kwargs = generator
            .get_iterator("f1", &IteratorOptions::default())
            .unwrap()
            .next()
            .unwrap();
        assert_eq!(kwargs.get("sep"), Some(&serde_json::json!(";")));
        assert_eq!(kwargs.get("engine"), Some(&serde_json::json!("python")));
    }
}
