//! Batch kwargs generator capability
//!
//! Every catalog strategy implements [`BatchKwargsGenerator`]. The concrete
//! strategies are collected in the [`Generator`] variant so a datasource can
//! hold any of them by value.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use assay_batch::{BatchKwargs, ReaderOptions};
use tracing::{debug, warn};

use crate::error::Result;
use crate::glob_reader::GlobReaderGenerator;
use crate::partition::Partitioner;
use crate::subdir::SubdirReaderGenerator;
use crate::table::TableGenerator;

/// Per-call iteration options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IteratorOptions {
    /// Reader options overlaid on every yielded descriptor
    pub reader_options: ReaderOptions,
    /// Row limit hint recorded as `limit`
    pub limit: Option<usize>,
}

impl IteratorOptions {
    /// Default options
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With extra reader options
    #[inline]
    #[must_use]
    pub fn with_reader_options(mut self, reader_options: ReaderOptions) -> Self {
        self.reader_options = reader_options;
        self
    }

    /// With a row limit
    #[inline]
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Catalog of data assets that can enumerate batches
pub trait BatchKwargsGenerator {
    /// Generator name within its datasource
    fn name(&self) -> &str;

    /// Discover the asset names this generator can serve
    ///
    /// Discovery never mutates the backend. An empty set is a valid answer.
    ///
    /// # Errors
    /// Returns error if the backend cannot be listed
    fn get_available_data_asset_names(&self) -> Result<BTreeSet<String>>;

    /// Lazily enumerate the batches of `asset`
    ///
    /// Every call re-resolves the asset against the backend; the returned
    /// iterator is finite and single-pass.
    ///
    /// # Errors
    /// Returns error if the asset is unknown to this generator or the
    /// backend cannot be read
    fn get_iterator(&self, asset: &str, options: &IteratorOptions) -> Result<BatchKwargsIter>;
}

/// Fields applied to every descriptor an iterator yields
#[derive(Debug, Clone, Default)]
pub(crate) struct BatchTemplate {
    pub(crate) reader_method: Option<String>,
    pub(crate) reader_options: ReaderOptions,
    pub(crate) limit: Option<usize>,
}

impl BatchTemplate {
    pub(crate) fn new(
        reader_method: Option<String>,
        reader_options: ReaderOptions,
        options: &IteratorOptions,
    ) -> Self {
        Self {
            reader_method,
            reader_options: reader_options.merged(&options.reader_options),
            limit: options.limit,
        }
    }

    pub(crate) fn apply(&self, mut kwargs: BatchKwargs) -> BatchKwargs {
        if let Some(method) = &self.reader_method {
            kwargs = kwargs.with_reader_method(method.clone());
        }
        kwargs = kwargs.with_reader_options(&self.reader_options);
        if let Some(limit) = self.limit {
            kwargs = kwargs.with_limit(limit);
        }
        kwargs
    }
}

/// One resolved file, ready to become a descriptor
#[derive(Debug, Clone)]
pub(crate) struct FileBatch {
    pub(crate) path: PathBuf,
    pub(crate) partition_id: Option<String>,
    pub(crate) reader_options: ReaderOptions,
}

/// Lazy, finite, single-pass sequence of batch descriptors
///
/// Each descriptor is created (and timestamped) when it is yielded. Dropping
/// the iterator early has no side effects.
#[derive(Debug)]
pub struct BatchKwargsIter {
    inner: IterInner,
}

#[derive(Debug)]
enum IterInner {
    Files {
        files: std::vec::IntoIter<FileBatch>,
        template: BatchTemplate,
    },
    Glob {
        paths: glob::Paths,
        pattern: String,
        partitioner: Arc<dyn Partitioner>,
        template: BatchTemplate,
    },
    Once(Option<BatchKwargs>),
}

impl BatchKwargsIter {
    pub(crate) fn files(files: Vec<FileBatch>, template: BatchTemplate) -> Self {
        Self {
            inner: IterInner::Files {
                files: files.into_iter(),
                template,
            },
        }
    }

    pub(crate) fn glob(
        paths: glob::Paths,
        pattern: String,
        partitioner: Arc<dyn Partitioner>,
        template: BatchTemplate,
    ) -> Self {
        Self {
            inner: IterInner::Glob {
                paths,
                pattern,
                partitioner,
                template,
            },
        }
    }

    pub(crate) fn once(kwargs: BatchKwargs) -> Self {
        Self {
            inner: IterInner::Once(Some(kwargs)),
        }
    }
}

impl Iterator for BatchKwargsIter {
    type Item = BatchKwargs;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            IterInner::Files { files, template } => loop {
                let file = files.next()?;
                // Tolerate files removed since the scan.
                if !file.path.is_file() {
                    warn!(path = %file.path.display(), "file vanished before iteration, skipping");
                    continue;
                }
                let mut kwargs =
                    BatchKwargs::from_path(&file.path).with_reader_options(&file.reader_options);
                if let Some(partition_id) = file.partition_id {
                    kwargs = kwargs.with_partition_id(partition_id);
                }
                return Some(template.apply(kwargs));
            },
            IterInner::Glob {
                paths,
                pattern,
                partitioner,
                template,
            } => loop {
                let path = match paths.next()? {
                    Ok(path) => path,
                    Err(e) => {
                        warn!(path = %e.path().display(), error = %e.error(), "unreadable glob match, skipping");
                        continue;
                    }
                };
                if !path.is_file() {
                    debug!(path = %path.display(), "glob matched a non-file, skipping");
                    continue;
                }
                let partition_id = partitioner.derive_partition_id(&path, pattern);
                let kwargs = BatchKwargs::from_path(&path).with_partition_id(partition_id);
                return Some(template.apply(kwargs));
            },
            IterInner::Once(kwargs) => kwargs.take(),
        }
    }
}

/// Any of the built-in catalog strategies
#[derive(Debug, Clone)]
pub enum Generator {
    /// Directory-convention catalog
    Subdir(SubdirReaderGenerator),
    /// Explicit glob map catalog
    Glob(GlobReaderGenerator),
    /// Remote table listing
    Table(TableGenerator),
}

impl Generator {
    /// Configuration class name of the strategy
    #[must_use]
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::Subdir(_) => crate::config::SUBDIR_READER_CLASS,
            Self::Glob(_) => crate::config::GLOB_READER_CLASS,
            Self::Table(_) => crate::config::TABLE_CLASS,
        }
    }

    fn as_dyn(&self) -> &dyn BatchKwargsGenerator {
        match self {
            Self::Subdir(g) => g,
            Self::Glob(g) => g,
            Self::Table(g) => g,
        }
    }
}

impl BatchKwargsGenerator for Generator {
    fn name(&self) -> &str {
        self.as_dyn().name()
    }

    fn get_available_data_asset_names(&self) -> Result<BTreeSet<String>> {
        self.as_dyn().get_available_data_asset_names()
    }

    fn get_iterator(&self, asset: &str, options: &IteratorOptions) -> Result<BatchKwargsIter> {
        self.as_dyn().get_iterator(asset, options)
    }
}

impl From<SubdirReaderGenerator> for Generator {
    fn from(generator: SubdirReaderGenerator) -> Self {
        Self::Subdir(generator)
    }
}

impl From<GlobReaderGenerator> for Generator {
    fn from(generator: GlobReaderGenerator) -> Self {
        Self::Glob(generator)
    }
}

impl From<TableGenerator> for Generator {
    fn from(generator: TableGenerator) -> Self {
        Self::Table(generator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn once_yields_a_single_descriptor() {
        let mut iter = BatchKwargsIter::once(BatchKwargs::from_query("SELECT * FROM t"));
        assert!(iter.next().is_some());
        assert!(iter.next().is_none());
    }

    #[test]
    fn template_overlays_iterator_options() {
        let base = ReaderOptions::new().with("sep", json!(",")).unwrap();
        let options = IteratorOptions::new()
            .with_reader_options(ReaderOptions::new().with("sep", json!("|")).unwrap())
            .with_limit(5);
        let template = BatchTemplate::new(Some("read_csv".to_string()), base, &options);

        let kwargs = template.apply(BatchKwargs::from_path("/d/a.csv"));
        assert_eq!(kwargs.get("sep"), Some(&json!("|")));
        assert_eq!(kwargs.reader_method(), Some("read_csv"));
        assert_eq!(kwargs.limit(), Some(5));
    }

    #[test]
    fn files_iterator_skips_vanished_files() {
        let dir = tempfile::tempdir().unwrap();
        let kept = dir.path().join("kept.csv");
        std::fs::write(&kept, "a\n1\n").unwrap();

        let files = vec![
            FileBatch {
                path: dir.path().join("gone.csv"),
                partition_id: Some("gone".to_string()),
                reader_options: ReaderOptions::new(),
            },
            FileBatch {
                path: kept.clone(),
                partition_id: Some("kept".to_string()),
                reader_options: ReaderOptions::new(),
            },
        ];
        let yielded: Vec<_> =
            BatchKwargsIter::files(files, BatchTemplate::default()).collect();
        assert_eq!(yielded.len(), 1);
        assert_eq!(yielded[0].path(), Some(kept.as_path()));
        assert_eq!(yielded[0].partition_id(), Some("kept"));
    }
}
