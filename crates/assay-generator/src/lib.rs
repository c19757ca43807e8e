//! Assay Data Asset Discovery
//!
//! Turns storage into a catalog of named data assets and enumerates each
//! asset as a lazy sequence of [`BatchKwargs`](assay_batch::BatchKwargs).
//!
//! # Catalogs
//!
//! - [`SubdirReaderGenerator`]: assets from a directory's layout
//! - [`GlobReaderGenerator`]: assets named by configured glob patterns
//! - [`TableGenerator`]: assets listed by a remote table catalog
//!
//! All three implement [`BatchKwargsGenerator`] and are held uniformly as a
//! [`Generator`]. A [`Datasource`] owns generators and resolves asset names.
//!
//! # Example
//!
//! ```no_run
//! use assay_generator::{BatchKwargsGenerator, IteratorOptions, SubdirReaderGenerator};
//!
//! let generator = SubdirReaderGenerator::new("subdir_reader", "/data");
//! for asset in generator.get_available_data_asset_names()? {
//!     for kwargs in generator.get_iterator(&asset, &IteratorOptions::default())? {
//!         println!("{asset}: {kwargs}");
//!     }
//! }
//! # Ok::<(), assay_generator::GeneratorError>(())
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod datasource;
pub mod error;
pub mod extension;
pub mod generator;
pub mod glob_reader;
pub mod glob_spec;
pub mod partition;
pub mod subdir;
pub mod table;

pub use config::{DatasourceConfig, GeneratorConfig};
pub use datasource::{Datasource, DatasourceKind, DEFAULT_GENERATOR};
pub use error::{GeneratorError, Result};
pub use extension::KnownExtensions;
pub use generator::{BatchKwargsGenerator, BatchKwargsIter, Generator, IteratorOptions};
pub use glob_reader::GlobReaderGenerator;
pub use glob_spec::{AssetGlobEntry, AssetGlobSpec};
pub use partition::{
    DatePartitioner, PartitionerConfig, Partitioner, PathPartitioner, RegexPartitioner,
};
pub use subdir::{DirectoryOptions, SubdirReaderGenerator};
pub use table::{StaticTableCatalog, TableCatalog, TableGenerator};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
