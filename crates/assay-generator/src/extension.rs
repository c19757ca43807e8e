//! Recognized data file extensions
//!
//! Extension matching is case-sensitive. Files whose name starts with `.`
//! are never data files.

use std::path::Path;

use assay_batch::ReaderOptions;
use serde_json::{json, Value};

/// Extensions recognized by default
pub const DEFAULT_EXTENSIONS: [&str; 6] = ["csv", "tsv", "xls", "xlsx", "parquet", "json"];

/// Set of recognized extensions (without the dot)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownExtensions(Vec<String>);

impl KnownExtensions {
    /// Build from a list of extensions; leading dots are stripped
    #[must_use]
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        extensions
            .into_iter()
            .fold(Self(Vec::new()), |known, e| known.with(e.as_ref()))
    }

    /// Add one extension
    #[must_use]
    pub fn with(mut self, extension: &str) -> Self {
        let extension = extension.trim_start_matches('.');
        if !extension.is_empty() && !self.contains(extension) {
            self.0.push(extension.to_string());
        }
        self
    }

    /// Check membership
    #[inline]
    #[must_use]
    pub fn contains(&self, extension: &str) -> bool {
        self.0.iter().any(|e| e == extension)
    }

    /// Check whether a path names a recognized data file
    ///
    /// Only the file name is inspected; callers check the file type.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if name.starts_with('.') {
            return false;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.contains(ext))
    }

    /// Iterate extensions
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Default for KnownExtensions {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS)
    }
}

/// Reader options every batch of this extension starts with
///
/// Delimited text lets the reader sniff the separator.
#[must_use]
pub fn default_reader_options(extension: &str) -> ReaderOptions {
    let mut options = ReaderOptions::new();
    if matches!(extension, "csv" | "tsv") {
        let defaults: [(&str, Value); 2] = [("sep", Value::Null), ("engine", json!("python"))];
        for (key, value) in defaults {
            // Neither key is reserved.
            let _ = options.insert(key, value);
        }
    }
    options
}

/// Extension of a path as UTF-8
#[inline]
#[must_use]
pub fn extension_of(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_extensions_match() {
        let known = KnownExtensions::default();
        for name in ["a.csv", "a.tsv", "a.xls", "a.xlsx", "a.parquet", "a.json"] {
            assert!(known.matches(Path::new(name)), "{name}");
        }
    }

    #[test]
    fn dot_prefixed_and_unknown_rejected() {
        let known = KnownExtensions::default();
        assert!(!known.matches(Path::new(".f5.csv")));
        assert!(!known.matches(Path::new("f1.blarg")));
        assert!(!known.matches(Path::new("noext")));
    }

    #[test]
    fn matching_is_case_sensitive() {
        let known = KnownExtensions::default();
        assert!(!known.matches(Path::new("UPPER.CSV")));
    }

    #[test]
    fn extensible() {
        let known = KnownExtensions::default().with(".blarg");
        assert!(known.matches(Path::new("f1.blarg")));
        assert_eq!(known.iter().count(), DEFAULT_EXTENSIONS.len() + 1);
    }

    #[test]
    fn csv_defaults() {
        let options = default_reader_options("csv");
        assert_eq!(options.get("sep"), Some(&Value::Null));
        assert_eq!(options.get("engine"), Some(&json!("python")));
        assert!(default_reader_options("parquet").is_empty());
    }
}
