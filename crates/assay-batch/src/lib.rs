//! Assay Batch Descriptors
//!
//! A [`BatchKwargs`] value tells a loader exactly how to materialize one
//! batch of a data asset: where the data lives (a file path, a query, or a
//! table) plus any reader options. Every value carries the timestamp of its
//! creation.
//!
//! # Core Concepts
//!
//! - [`BatchKwargs`]: Ordered, validated option mapping for one batch
//! - [`BatchSource`]: The source-locating field of a descriptor
//! - [`ReaderOptions`]: Validated loader options merged into descriptors
//! - [`BatchError`]: Validation failures
//!
//! # Example
//!
//! ```
//! use assay_batch::BatchKwargs;
//!
//! let kwargs = BatchKwargs::from_path("/data/titanic/2019-01-01.csv")
//!     .with_partition_id("2019-01-01");
//!
//! assert_eq!(kwargs.partition_id(), Some("2019-01-01"));
//! assert!(kwargs.timestamp() > 0.0);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod kwargs;
mod options;
mod source;

pub use kwargs::{keys, BatchError, BatchKwargs};
pub use options::ReaderOptions;
pub use source::BatchSource;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
