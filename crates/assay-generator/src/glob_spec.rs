//! Asset glob specifications
//!
//! An asset glob maps a data asset name to a file pattern. Two shapes are
//! accepted in configuration:
//!
//! ```yaml
//! asset_globs:
//!   blargs: "*.blarg"          # bare pattern, deprecated
//!   daily:
//!     glob: "sales_*.csv"
//!     partitioner:
//!       kind: date
//! ```
//!
//! Anything else fails at construction with a descriptive error.

use std::fmt;

use assay_batch::ReaderOptions;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_yaml::Value;

use crate::error::{GeneratorError, Result};
use crate::partition::PartitionerConfig;

/// Structured asset glob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssetGlobSpec {
    /// Pattern relative to the generator's base directory
    pub glob: String,

    /// Partitioning override for this asset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partitioner: Option<PartitionerConfig>,

    /// Reader a loader should use for matches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reader_method: Option<String>,

    /// Reader options added to every match
    #[serde(default, skip_serializing_if = "ReaderOptions::is_empty")]
    pub reader_options: ReaderOptions,
}

impl AssetGlobSpec {
    /// Spec with only a pattern
    #[inline]
    #[must_use]
    pub fn new(glob: impl Into<String>) -> Self {
        Self {
            glob: glob.into(),
            partitioner: None,
            reader_method: None,
            reader_options: ReaderOptions::new(),
        }
    }

    /// With a partitioner override
    #[inline]
    #[must_use]
    pub fn with_partitioner(mut self, partitioner: PartitionerConfig) -> Self {
        self.partitioner = Some(partitioner);
        self
    }

    /// With a reader method
    #[inline]
    #[must_use]
    pub fn with_reader_method(mut self, method: impl Into<String>) -> Self {
        self.reader_method = Some(method.into());
        self
    }

    /// With reader options
    #[inline]
    #[must_use]
    pub fn with_reader_options(mut self, options: ReaderOptions) -> Self {
        self.reader_options = options;
        self
    }

    /// Check the pattern compiles
    ///
    /// # Errors
    /// Returns error naming `asset` if the pattern is empty, absolute, or not
    /// a valid glob
    pub fn validate(&self, asset: &str) -> Result<()> {
        let invalid = |reason: String| GeneratorError::InvalidAssetGlob {
            asset: asset.to_string(),
            reason,
        };
        if self.glob.trim().is_empty() {
            return Err(invalid("glob pattern is empty".to_string()));
        }
        if self.glob.starts_with('/') {
            return Err(invalid(format!(
                "glob '{}' must be relative to the base directory",
                self.glob
            )));
        }
        glob::Pattern::new(&self.glob)
            .map_err(|e| invalid(format!("glob '{}' is invalid: {e}", self.glob)))?;
        Ok(())
    }
}

/// Asset glob as written in configuration
#[derive(Debug, Clone, PartialEq)]
pub enum AssetGlobEntry {
    /// Deprecated bare pattern
    Bare(String),
    /// Structured spec
    Spec(AssetGlobSpec),
}

impl AssetGlobEntry {
    /// Check for the deprecated shape
    #[inline]
    #[must_use]
    pub fn is_bare(&self) -> bool {
        matches!(self, Self::Bare(_))
    }

    /// Normalize into the structured shape
    #[must_use]
    pub fn into_spec(self) -> AssetGlobSpec {
        match self {
            Self::Bare(glob) => AssetGlobSpec::new(glob),
            Self::Spec(spec) => spec,
        }
    }

    /// Parse one configuration value
    ///
    /// # Errors
    /// Returns error if the value is neither a string nor a mapping with a
    /// `glob` key
    pub fn from_value(value: Value) -> std::result::Result<Self, String> {
        match value {
            Value::String(glob) => Ok(Self::Bare(glob)),
            Value::Mapping(map) => {
                if !map.contains_key("glob") {
                    return Err("mapping is missing the required `glob` key".to_string());
                }
                serde_yaml::from_value(Value::Mapping(map))
                    .map(Self::Spec)
                    .map_err(|e| e.to_string())
            }
            other => Err(format!(
                "expected a glob pattern string or a mapping with a `glob` key, found {}",
                describe(&other)
            )),
        }
    }
}

impl From<AssetGlobSpec> for AssetGlobEntry {
    fn from(spec: AssetGlobSpec) -> Self {
        Self::Spec(spec)
    }
}

impl From<&str> for AssetGlobEntry {
    fn from(glob: &str) -> Self {
        Self::Bare(glob.to_string())
    }
}

impl Serialize for AssetGlobEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Bare(glob) => serializer.serialize_str(glob),
            Self::Spec(spec) => spec.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for AssetGlobEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Deprecation raised when bare-string asset globs are normalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BareGlobDeprecation {
    /// Assets configured with a bare pattern
    pub assets: Vec<String>,
}

impl fmt::Display for BareGlobDeprecation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "asset_globs entries given as bare strings are deprecated ({}); use {{glob: <pattern>}} instead",
            self.assets.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn bare_and_structured_shapes_parse() {
        let yaml = r#"
blargs: "*.blarg"
fs:
  glob: "f*"
  partitioner:
    kind: date
"#;
        let globs: IndexMap<String, AssetGlobEntry> = serde_yaml::from_str(yaml).unwrap();
        assert!(globs["blargs"].is_bare());
        assert_eq!(globs["blargs"].clone().into_spec(), AssetGlobSpec::new("*.blarg"));

        let fs = globs["fs"].clone().into_spec();
        assert_eq!(fs.glob, "f*");
        assert_eq!(fs.partitioner, Some(PartitionerConfig::Date));
    }

    #[test]
    fn invalid_shapes_fail_descriptively() {
        let err = serde_yaml::from_str::<IndexMap<String, AssetGlobEntry>>("a: [1, 2]")
            .unwrap_err()
            .to_string();
        assert!(err.contains("found a sequence"), "{err}");

        let err = serde_yaml::from_str::<IndexMap<String, AssetGlobEntry>>("a: {pattern: x}")
            .unwrap_err()
            .to_string();
        assert!(err.contains("`glob`"), "{err}");

        let err = serde_yaml::from_str::<IndexMap<String, AssetGlobEntry>>(
            "a: {glob: x, colour: red}",
        )
        .unwrap_err()
        .to_string();
        assert!(err.contains("colour"), "{err}");
    }

    #[test]
    fn validate_rejects_bad_patterns() {
        assert!(AssetGlobSpec::new("*.csv").validate("a").is_ok());
        assert!(AssetGlobSpec::new("").validate("a").is_err());
        assert!(AssetGlobSpec::new("/abs/*.csv").validate("a").is_err());

        let err = AssetGlobSpec::new("[*.csv").validate("broken").unwrap_err();
        assert!(matches!(err, GeneratorError::InvalidAssetGlob { ref asset, .. } if asset == "broken"));
    }

    #[test]
    fn serializes_back_to_original_shape() {
        let bare = AssetGlobEntry::from("*.csv");
        assert_eq!(serde_yaml::to_string(&bare).unwrap().trim(), "'*.csv'");

        let spec = AssetGlobEntry::from(AssetGlobSpec::new("*.csv"));
        assert_eq!(serde_yaml::to_string(&spec).unwrap().trim(), "glob: '*.csv'");
    }
}
