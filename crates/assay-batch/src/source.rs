//! Source-locating field of a batch descriptor

use std::fmt::{self, Display, Formatter};
use std::path::Path;

/// Where the data of a batch comes from
///
/// Borrowed view into a [`BatchKwargs`](crate::BatchKwargs); exactly one
/// variant is reported even when a descriptor carries several source fields
/// (`path` wins over `query`, which wins over `table`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchSource<'a> {
    /// A file on a filesystem
    Path(&'a Path),
    /// A query to run against a compute backend
    Query(&'a str),
    /// A table reference
    Table(&'a str),
}

impl BatchSource<'_> {
    /// Field name used in the descriptor for this source kind
    #[inline]
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::Path(_) => crate::keys::PATH,
            Self::Query(_) => crate::keys::QUERY,
            Self::Table(_) => crate::keys::TABLE,
        }
    }
}

impl Display for BatchSource<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "path:{}", path.display()),
            Self::Query(query) => write!(f, "query:{query}"),
            Self::Table(table) => write!(f, "table:{table}"),
        }
    }
}
