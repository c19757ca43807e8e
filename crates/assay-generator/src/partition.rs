//! Partition identifiers for multi-file assets
//!
//! A [`Partitioner`] maps a matched file and the pattern that matched it to a
//! stable partition id. Strategies are swapped by injection: generators hold
//! an `Arc<dyn Partitioner>` and never need subclassing.
//!
//! # Strategies
//! - [`PathPartitioner`]: strip the pattern's literal prefix and suffix
//! - [`RegexPartitioner`]: capture group of a regex over the file name
//! - [`DatePartitioner`]: first calendar date in the file name

use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{GeneratorError, Result};

/// Derives partition ids from matched paths
///
/// # Contract
/// - Must be deterministic: same inputs, same id
/// - Must not consult file metadata (modification time, size)
pub trait Partitioner: Debug + Send + Sync {
    /// Partition id for `path`, which matched `pattern`
    fn derive_partition_id(&self, path: &Path, pattern: &str) -> String;
}

/// Default strategy: longest literal prefix/suffix stripping
///
/// The file name of the matched path loses the literal text before the first
/// wildcard and after the last wildcard of the pattern's final component.
/// `*.csv` turns `20190101.csv` into `20190101`; `f*` turns `f1.blarg` into
/// `1.blarg`. When nothing varying is left the file stem is used.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathPartitioner;

impl PathPartitioner {
    fn literal_affixes(pattern: &str) -> Option<(&str, &str)> {
        let last = pattern.rsplit('/').next().unwrap_or(pattern);
        let has_class = last.contains('[');
        let is_wild = |c: char| c == '*' || c == '?' || c == '[' || (has_class && c == ']');

        let first = last.find(is_wild)?;
        let end = last.rfind(is_wild)?;
        Some((&last[..first], &last[end + 1..]))
    }
}

impl Partitioner for PathPartitioner {
    fn derive_partition_id(&self, path: &Path, pattern: &str) -> String {
        let name = file_name(path);
        let fallback = || file_stem(path);

        let Some((prefix, suffix)) = Self::literal_affixes(pattern) else {
            return fallback();
        };
        if name.len() < prefix.len() + suffix.len() {
            return fallback();
        }
        match name
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(suffix))
        {
            Some(middle) if !middle.is_empty() => middle.to_string(),
            _ => fallback(),
        }
    }
}

/// Capture group of a regular expression over the file name
///
/// Falls back to [`PathPartitioner`] when the regex does not match or the
/// group is empty.
#[derive(Debug, Clone)]
pub struct RegexPartitioner {
    regex: Regex,
    group: usize,
}

impl RegexPartitioner {
    /// Compile a partitioning regex
    ///
    /// # Errors
    /// Returns error if the regex is invalid or has no group `group`
    pub fn new(pattern: &str, group: usize) -> Result<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| GeneratorError::Config(format!("invalid partition regex: {e}")))?;
        if group >= regex.captures_len() {
            return Err(GeneratorError::Config(format!(
                "partition regex '{pattern}' has no capture group {group}"
            )));
        }
        Ok(Self { regex, group })
    }
}

impl Partitioner for RegexPartitioner {
    fn derive_partition_id(&self, path: &Path, pattern: &str) -> String {
        let name = file_name(path);
        self.regex
            .captures(&name)
            .and_then(|caps| caps.get(self.group))
            .map(|m| m.as_str())
            .filter(|s| !s.is_empty())
            .map_or_else(
                || PathPartitioner.derive_partition_id(path, pattern),
                str::to_string,
            )
    }
}

/// First calendar date found in the file name, rendered `%Y-%m-%d`
///
/// Recognizes `YYYYMMDD` and `YYYY-MM-DD` style dates with `-`, `_`, `.` or
/// `/` separators. Falls back to [`PathPartitioner`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DatePartitioner;

impl DatePartitioner {
    /// Create a date partitioner
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// First `YYYY[sep]MM[sep]DD` run that is a real calendar date; `sep`
    /// is one of `-_./`
    fn find_date(name: &str) -> Option<NaiveDate> {
        let bytes = name.as_bytes();
        (0..bytes.len()).find_map(|start| {
            let mut pos = start;
            let mut parts = [0u32; 3];
            for (i, width) in [4usize, 2, 2].into_iter().enumerate() {
                if i > 0 && matches!(bytes.get(pos), Some(b'-' | b'_' | b'.' | b'/')) {
                    pos += 1;
                }
                let digits = bytes.get(pos..pos + width)?;
                if !digits.iter().all(u8::is_ascii_digit) {
                    return None;
                }
                parts[i] = digits
                    .iter()
                    .fold(0, |acc, d| acc * 10 + u32::from(d - b'0'));
                pos += width;
            }
            let year = i32::try_from(parts[0]).ok()?;
            NaiveDate::from_ymd_opt(year, parts[1], parts[2])
        })
    }
}

impl Partitioner for DatePartitioner {
    fn derive_partition_id(&self, path: &Path, pattern: &str) -> String {
        Self::find_date(&file_name(path)).map_or_else(
            || PathPartitioner.derive_partition_id(path, pattern),
            |date| date.format("%Y-%m-%d").to_string(),
        )
    }
}

/// Serializable partitioner selection for asset glob specs
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PartitionerConfig {
    /// [`PathPartitioner`]
    #[default]
    Default,
    /// [`RegexPartitioner`]
    Regex {
        pattern: String,
        #[serde(default = "default_group")]
        group: usize,
    },
    /// [`DatePartitioner`]
    Date,
}

fn default_group() -> usize {
    1
}

impl PartitionerConfig {
    /// Instantiate the configured strategy
    ///
    /// # Errors
    /// Returns error if a regex fails to compile
    pub fn build(&self) -> Result<Arc<dyn Partitioner>> {
        Ok(match self {
            Self::Default => Arc::new(PathPartitioner),
            Self::Regex { pattern, group } => Arc::new(RegexPartitioner::new(pattern, *group)?),
            Self::Date => Arc::new(DatePartitioner::new()),
        })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name(path))
}
