//! Reader options carried into batch descriptors

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::kwargs::{keys, BatchError};

/// Validated set of reader options
///
/// Never contains a reserved descriptor field, so merging it into a
/// [`BatchKwargs`](crate::BatchKwargs) cannot fail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "IndexMap<String, Value>",
    into = "IndexMap<String, Value>"
)]
pub struct ReaderOptions(IndexMap<String, Value>);

impl ReaderOptions {
    /// Empty option set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an option, replacing any previous value
    ///
    /// # Errors
    /// Returns error if `key` is a reserved descriptor field
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Result<(), BatchError> {
        let key = key.into();
        if keys::RESERVED.contains(&key.as_str()) {
            return Err(BatchError::ReservedKey(key));
        }
        self.0.insert(key, value);
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert)
    ///
    /// # Errors
    /// Returns error if `key` is a reserved descriptor field
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Result<Self, BatchError> {
        self.insert(key, value)?;
        Ok(self)
    }

    /// Overlay `other` on top of `self`; values from `other` win
    #[must_use]
    pub fn merged(&self, other: &ReaderOptions) -> Self {
        let mut map = self.0.clone();
        for (key, value) in &other.0 {
            map.insert(key.clone(), value.clone());
        }
        Self(map)
    }

    /// Look up an option
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Iterate options in insertion order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Number of options
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no options
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<IndexMap<String, Value>> for ReaderOptions {
    type Error = BatchError;

    fn try_from(map: IndexMap<String, Value>) -> Result<Self, Self::Error> {
        map.into_iter()
            .try_fold(Self::new(), |options, (key, value)| options.with(key, value))
    }
}

impl From<ReaderOptions> for IndexMap<String, Value> {
    fn from(options: ReaderOptions) -> Self {
        options.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merged_prefers_overlay() {
        let base = ReaderOptions::new()
            .with("sep", Value::Null)
            .unwrap()
            .with("engine", json!("python"))
            .unwrap();
        let overlay = ReaderOptions::new().with("sep", json!("|")).unwrap();

        let merged = base.merged(&overlay);
        assert_eq!(merged.get("sep"), Some(&json!("|")));
        assert_eq!(merged.get("engine"), Some(&json!("python")));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn reserved_keys_rejected_on_deserialize() {
        let ok: ReaderOptions = serde_json::from_str(r#"{"header": 0}"#).unwrap();
        assert_eq!(ok.len(), 1);

        let bad: Result<ReaderOptions, _> = serde_json::from_str(r#"{"partition_id": "x"}"#);
        assert!(bad.is_err());
    }
}
