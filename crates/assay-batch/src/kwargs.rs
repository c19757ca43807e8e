//! Batch descriptors
//!
//! Provides [`BatchKwargs`], the self-sufficient instruction for fetching one
//! batch of data.

use std::fmt::{self, Display, Formatter};
use std::path::Path;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::options::ReaderOptions;
use crate::source::BatchSource;

/// Well-known descriptor field names
pub mod keys {
    //! Field names with a fixed meaning inside a [`BatchKwargs`](crate::BatchKwargs)

    /// Filesystem path source
    pub const PATH: &str = "path";
    /// Query source
    pub const QUERY: &str = "query";
    /// Table reference source
    pub const TABLE: &str = "table";
    /// Creation time, Unix seconds
    pub const TIMESTAMP: &str = "timestamp";
    /// Partition identifier within a multi-batch asset
    pub const PARTITION_ID: &str = "partition_id";
    /// Name of the reader function a loader should use
    pub const READER_METHOD: &str = "reader_method";
    /// Row limit hint
    pub const LIMIT: &str = "limit";

    /// Fields that locate the data, in precedence order
    pub const SOURCES: [&str; 3] = [PATH, QUERY, TABLE];

    /// Fields that cannot be set through generic reader options
    pub const RESERVED: [&str; 5] = [PATH, QUERY, TABLE, TIMESTAMP, PARTITION_ID];
}

/// Errors raised while building or validating batch descriptors
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// No `path`, `query` or `table` field
    #[error("batch kwargs must contain one of: path, query, table")]
    MissingSource,

    /// A source field is present but not a non-empty string
    #[error("batch kwargs field '{0}' must be a non-empty string")]
    InvalidSource(&'static str),

    /// `timestamp` is present but not a number
    #[error("batch kwargs timestamp must be a number, got {0}")]
    InvalidTimestamp(Value),

    /// Attempt to set a reserved field through generic options
    #[error("'{0}' is reserved and cannot be set as a reader option")]
    ReservedKey(String),

    /// Malformed JSON
    #[error("invalid batch kwargs json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Self-sufficient descriptor of how to fetch one batch
///
/// An ordered mapping of option name to value. Handing a `BatchKwargs` alone
/// to a loader is enough to reconstruct the batch.
///
/// # Invariants
/// - Contains at least one of `path`, `query`, `table` as a non-empty string
/// - Contains a numeric `timestamp`, set when the value was created
/// - Source and timestamp fields never change after construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "IndexMap<String, Value>",
    into = "IndexMap<String, Value>"
)]
pub struct BatchKwargs(IndexMap<String, Value>);

impl BatchKwargs {
    fn with_source(key: &'static str, value: String) -> Self {
        let mut map = IndexMap::new();
        map.insert(key.to_string(), Value::String(value));
        map.insert(keys::TIMESTAMP.to_string(), Value::from(now_timestamp()));
        Self(map)
    }

    /// Descriptor for a file on a filesystem
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self::with_source(keys::PATH, path.as_ref().to_string_lossy().into_owned())
    }

    /// Descriptor for a query against a compute backend
    #[must_use]
    pub fn from_query(query: impl Into<String>) -> Self {
        Self::with_source(keys::QUERY, query.into())
    }

    /// Descriptor for a table reference
    #[must_use]
    pub fn from_table(table: impl Into<String>) -> Self {
        Self::with_source(keys::TABLE, table.into())
    }

    /// Validate an arbitrary mapping
    ///
    /// A missing `timestamp` is injected; an existing one is kept.
    ///
    /// # Errors
    /// Returns error if no source field is present or a known field has the
    /// wrong type
    pub fn try_from_map(mut map: IndexMap<String, Value>) -> Result<Self, BatchError> {
        let mut has_source = false;
        for key in keys::SOURCES {
            match map.get(key) {
                None | Some(Value::Null) => {}
                Some(Value::String(s)) if !s.is_empty() => has_source = true,
                Some(_) => return Err(BatchError::InvalidSource(key)),
            }
        }
        if !has_source {
            return Err(BatchError::MissingSource);
        }

        match map.get(keys::TIMESTAMP) {
            None => {
                map.insert(keys::TIMESTAMP.to_string(), Value::from(now_timestamp()));
            }
            Some(Value::Number(_)) => {}
            Some(other) => return Err(BatchError::InvalidTimestamp(other.clone())),
        }

        Ok(Self(map))
    }

    /// Parse from a JSON object
    ///
    /// # Errors
    /// Returns error if the JSON is malformed or fails validation
    pub fn from_json(json: &str) -> Result<Self, BatchError> {
        let map: IndexMap<String, Value> = serde_json::from_str(json)?;
        Self::try_from_map(map)
    }

    /// Attach a partition identifier
    #[inline]
    #[must_use]
    pub fn with_partition_id(mut self, partition_id: impl Into<String>) -> Self {
        self.0.insert(
            keys::PARTITION_ID.to_string(),
            Value::String(partition_id.into()),
        );
        self
    }

    /// Name the reader a loader should use
    #[inline]
    #[must_use]
    pub fn with_reader_method(mut self, method: impl Into<String>) -> Self {
        self.0
            .insert(keys::READER_METHOD.to_string(), Value::String(method.into()));
        self
    }

    /// Attach a row limit hint
    #[inline]
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.0.insert(keys::LIMIT.to_string(), Value::from(limit));
        self
    }

    /// Set a single reader option
    ///
    /// # Errors
    /// Returns error if `key` is a source, timestamp or partition field
    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Result<Self, BatchError> {
        let key = key.into();
        if keys::RESERVED.contains(&key.as_str()) {
            return Err(BatchError::ReservedKey(key));
        }
        self.0.insert(key, value);
        Ok(self)
    }

    /// Set several reader options; later entries win
    ///
    /// # Errors
    /// Returns error on the first reserved key
    pub fn with_options<'a, I>(self, options: I) -> Result<Self, BatchError>
    where
        I: IntoIterator<Item = (&'a String, &'a Value)>,
    {
        options
            .into_iter()
            .try_fold(self, |kwargs, (key, value)| {
                kwargs.with_option(key.clone(), value.clone())
            })
    }

    /// Merge validated reader options; later values win
    #[must_use]
    pub fn with_reader_options(mut self, options: &ReaderOptions) -> Self {
        for (key, value) in options.iter() {
            self.0.insert(key.clone(), value.clone());
        }
        self
    }

    /// The source-locating field
    #[must_use]
    pub fn source(&self) -> BatchSource<'_> {
        if let Some(path) = self.path() {
            BatchSource::Path(path)
        } else if let Some(query) = self.query() {
            BatchSource::Query(query)
        } else if let Some(table) = self.table() {
            BatchSource::Table(table)
        } else {
            unreachable!("BatchKwargs is constructed with a source field")
        }
    }

    /// Filesystem path, if this is a path descriptor
    #[inline]
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.get_str(keys::PATH).map(Path::new)
    }

    /// Query text, if present
    #[inline]
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.get_str(keys::QUERY)
    }

    /// Table reference, if present
    #[inline]
    #[must_use]
    pub fn table(&self) -> Option<&str> {
        self.get_str(keys::TABLE)
    }

    /// Partition identifier, if present
    #[inline]
    #[must_use]
    pub fn partition_id(&self) -> Option<&str> {
        self.get_str(keys::PARTITION_ID)
    }

    /// Reader method, if present
    #[inline]
    #[must_use]
    pub fn reader_method(&self) -> Option<&str> {
        self.get_str(keys::READER_METHOD)
    }

    /// Row limit hint, if present
    #[inline]
    #[must_use]
    pub fn limit(&self) -> Option<u64> {
        self.0.get(keys::LIMIT).and_then(Value::as_u64)
    }

    /// Creation time in Unix seconds
    #[inline]
    #[must_use]
    pub fn timestamp(&self) -> f64 {
        self.0
            .get(keys::TIMESTAMP)
            .and_then(Value::as_f64)
            .unwrap_or_default()
    }

    /// Creation time as a UTC datetime
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let micros = (self.timestamp() * 1_000_000.0).round();
        #[allow(clippy::cast_possible_truncation)]
        DateTime::from_timestamp_micros(micros as i64)
    }

    /// Raw field access
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Check whether a field is present
    #[inline]
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Iterate fields in insertion order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields, timestamp included
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; a descriptor has at least a source and a timestamp
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy of the fields without `timestamp`
    ///
    /// Two descriptors for the same partition created at different times are
    /// equal under this view.
    #[must_use]
    pub fn without_timestamp(&self) -> IndexMap<String, Value> {
        let mut map = self.0.clone();
        map.shift_remove(keys::TIMESTAMP);
        map
    }

    /// Serialize as a compact JSON object
    #[must_use]
    pub fn to_json(&self) -> String {
        Value::Object(self.0.clone().into_iter().collect()).to_string()
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }
}

impl TryFrom<IndexMap<String, Value>> for BatchKwargs {
    type Error = BatchError;

    fn try_from(map: IndexMap<String, Value>) -> Result<Self, Self::Error> {
        Self::try_from_map(map)
    }
}

impl From<BatchKwargs> for IndexMap<String, Value> {
    fn from(kwargs: BatchKwargs) -> Self {
        kwargs.0
    }
}

impl Display for BatchKwargs {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}

fn now_timestamp() -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let micros = Utc::now().timestamp_micros() as f64;
    micros / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn from_path_sets_source_and_timestamp() {
        let kwargs = BatchKwargs::from_path("/data/f1.csv");
        assert_eq!(kwargs.path(), Some(Path::new("/data/f1.csv")));
        assert!(kwargs.contains_key(keys::TIMESTAMP));
        assert!(kwargs.timestamp() > 1_500_000_000.0);
        assert!(kwargs.created_at().is_some());
    }

    #[test]
    fn source_precedence() {
        let kwargs = BatchKwargs::from_query("select * from t");
        assert_eq!(kwargs.source(), BatchSource::Query("select * from t"));
        assert_eq!(kwargs.source().key(), "query");

        let table = BatchKwargs::from_table("events");
        assert_eq!(table.source(), BatchSource::Table("events"));
    }

    #[test]
    fn field_order_is_insertion_order() {
        let kwargs = BatchKwargs::from_path("/data/f1.csv")
            .with_option("sep", Value::Null)
            .unwrap()
            .with_option("engine", json!("python"))
            .unwrap();

        let keys: Vec<_> = kwargs.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["path", "timestamp", "sep", "engine"]);
    }

    #[test]
    fn reserved_options_rejected() {
        let result = BatchKwargs::from_path("/data/f1.csv").with_option("timestamp", json!(0));
        assert!(matches!(result, Err(BatchError::ReservedKey(k)) if k == "timestamp"));

        let result = BatchKwargs::from_path("/data/f1.csv").with_option("path", json!("/x"));
        assert!(result.is_err());
    }

    #[test]
    fn try_from_map_requires_source() {
        let mut map = IndexMap::new();
        map.insert("sep".to_string(), json!(","));
        assert!(matches!(
            BatchKwargs::try_from_map(map),
            Err(BatchError::MissingSource)
        ));

        let mut map = IndexMap::new();
        map.insert("path".to_string(), json!(42));
        assert!(matches!(
            BatchKwargs::try_from_map(map),
            Err(BatchError::InvalidSource("path"))
        ));
    }

    #[test]
    fn try_from_map_injects_missing_timestamp() {
        let mut map = IndexMap::new();
        map.insert("table".to_string(), json!("events"));
        let kwargs = BatchKwargs::try_from_map(map).unwrap();
        assert!(kwargs.timestamp() > 0.0);
    }

    #[test]
    fn try_from_map_keeps_existing_timestamp() {
        let kwargs = BatchKwargs::from_json(r#"{"path": "/a.csv", "timestamp": 12.5}"#).unwrap();
        assert_eq!(kwargs.timestamp(), 12.5);

        let bad = BatchKwargs::from_json(r#"{"path": "/a.csv", "timestamp": "yesterday"}"#);
        assert!(matches!(bad, Err(BatchError::InvalidTimestamp(_))));
    }

    #[test]
    fn without_timestamp_compares_partitions() {
        let a = BatchKwargs::from_path("/d/f3/f3_1.csv").with_partition_id("f3_1");
        let b = BatchKwargs::from_path("/d/f3/f3_1.csv").with_partition_id("f3_1");
        assert_eq!(a.without_timestamp(), b.without_timestamp());
        assert!(!a.without_timestamp().contains_key("timestamp"));
    }

    #[test]
    fn serde_validates_on_deserialize() {
        let kwargs = BatchKwargs::from_path("/d/a.csv").with_limit(10);
        let json = serde_json::to_string(&kwargs).unwrap();
        let back: BatchKwargs = serde_json::from_str(&json).unwrap();
        assert_eq!(back, kwargs);
        assert_eq!(back.limit(), Some(10));

        let invalid: Result<BatchKwargs, _> = serde_json::from_str(r#"{"limit": 3}"#);
        assert!(invalid.is_err());
    }

    proptest! {
        #[test]
        fn prop_options_never_displace_the_source(key in "[a-z_]{1,12}", value in any::<i64>()) {
            let result = BatchKwargs::from_path("/d/a.csv").with_option(key.clone(), json!(value));
            if keys::RESERVED.contains(&key.as_str()) {
                prop_assert!(result.is_err());
            } else {
                let kwargs = result.unwrap();
                prop_assert_eq!(kwargs.path(), Some(Path::new("/d/a.csv")));
                prop_assert_eq!(kwargs.get(&key), Some(&json!(value)));
            }
        }
    }
}
