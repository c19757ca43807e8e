//! Assay Project
//!
//! The collaborators of the init flow, each behind a trait so the flow can
//! run against fakes:
//!
//! - [`ProjectStore`] / [`FileProject`]: project layout and `assay.yml`
//! - [`Loader`] / [`FileLoader`]: batch materialization with classified
//!   [`LoadError`]s
//! - [`SuiteGenerator`] / [`ExampleSuiteGenerator`]: example suites and
//!   their validation results
//! - [`DocsBuilder`] / [`LocalSiteBuilder`]: static HTML data docs
//! - [`Browser`] / [`SystemBrowser`]: opening the built docs
//!
//! # Example
//!
//! ```no_run
//! use assay_project::{FileProject, ProjectStore};
//!
//! let mut project = FileProject::new(".");
//! project.scaffold()?;
//! for suite in project.list_expectation_suites()? {
//!     println!("{suite}");
//! }
//! # Ok::<(), assay_project::ProjectError>(())
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod browser;
pub mod config;
pub mod docs;
pub mod error;
pub mod loader;
pub mod store;
pub mod suite;

pub use browser::{Browser, SystemBrowser};
pub use config::{ProjectConfig, LOCAL_SITE};
pub use docs::{validation_page, DocsBuilder, DocsSite, LocalSiteBuilder};
pub use error::{LoadError, LoadErrorCategory, ProjectError, Result};
pub use loader::{Batch, DataFormat, FileLoader, Loader};
pub use store::{DatasourceSummary, FileProject, ProjectStore, CONFIG_FILE, PROJECT_DIR};
pub use suite::{
    ExampleSuiteGenerator, ExpectationSuite, SuiteGenerator, SuiteId, SuiteOutcome, ValidationId,
    ValidationResult,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
