//! Remote table catalog
//!
//! Assets are the tables a compute cluster reports. Each asset is one batch:
//! a `SELECT *` query over the table.

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::sync::Arc;

use assay_batch::{BatchKwargs, ReaderOptions};
use tracing::debug;

use crate::error::{GeneratorError, Result};
use crate::generator::{BatchKwargsGenerator, BatchKwargsIter, BatchTemplate, IteratorOptions};

/// Source of table names
///
/// Implementations may call out to a remote service; no timeout or retry is
/// applied on top.
pub trait TableCatalog: Debug + Send + Sync {
    /// List the tables currently available
    ///
    /// # Errors
    /// Returns [`GeneratorError::TableCatalog`] if the catalog cannot answer
    fn list_tables(&self) -> Result<Vec<String>>;
}

/// Fixed list of tables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticTableCatalog {
    tables: Vec<String>,
}

impl StaticTableCatalog {
    /// Catalog answering with `tables`
    #[must_use]
    pub fn new<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tables: tables.into_iter().map(Into::into).collect(),
        }
    }

    /// Configured tables
    #[inline]
    #[must_use]
    pub fn tables(&self) -> &[String] {
        &self.tables
    }
}

impl TableCatalog for StaticTableCatalog {
    fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.tables.clone())
    }
}

/// Catalog of remote tables
#[derive(Debug, Clone)]
pub struct TableGenerator {
    name: String,
    catalog: Arc<dyn TableCatalog>,
    tables: Vec<String>,
}

impl TableGenerator {
    /// Generator over a fixed list of tables
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let catalog = StaticTableCatalog::new(tables);
        Self {
            name: name.into(),
            tables: catalog.tables().to_vec(),
            catalog: Arc::new(catalog),
        }
    }

    /// Generator over an external catalog
    #[must_use]
    pub fn with_catalog(name: impl Into<String>, catalog: Arc<dyn TableCatalog>) -> Self {
        Self {
            name: name.into(),
            catalog,
            tables: Vec::new(),
        }
    }

    /// Tables given at construction, persisted with the generator config
    #[inline]
    #[must_use]
    pub fn configured_tables(&self) -> &[String] {
        &self.tables
    }
}

/// Query reading a whole table, optionally limited
#[must_use]
pub fn select_all_query(table: &str, limit: Option<usize>) -> String {
    match limit {
        Some(limit) => format!("SELECT * FROM {table} LIMIT {limit}"),
        None => format!("SELECT * FROM {table}"),
    }
}

impl BatchKwargsGenerator for TableGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_available_data_asset_names(&self) -> Result<BTreeSet<String>> {
        let tables: BTreeSet<String> = self.catalog.list_tables()?.into_iter().collect();
        debug!(generator = %self.name, count = tables.len(), "listed remote tables");
        Ok(tables)
    }

    /// Names are not checked against the catalog here; the datasource does
    /// that before resolving.
    fn get_iterator(&self, asset: &str, options: &IteratorOptions) -> Result<BatchKwargsIter> {
        if asset.trim().is_empty() {
            return Err(GeneratorError::unknown_asset(&self.name, asset));
        }
        let query = select_all_query(asset, options.limit);
        let template = BatchTemplate::new(None, ReaderOptions::new(), options);
        Ok(BatchKwargsIter::once(
            template.apply(BatchKwargs::from_query(query)),
        ))
    }
}
