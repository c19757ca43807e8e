//! Expectation suites and validation results
//!
//! Only the document shapes and an example-suite generator live here; the
//! expectation language itself is owned elsewhere.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::info;
use uuid::Uuid;

use crate::error::{ProjectError, Result};
use crate::loader::Batch;
use crate::store::FileProject;

/// Suite identifier: `<data asset>.<suite>` or a bare `<suite>`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SuiteId {
    asset: Option<String>,
    suite: String,
}

fn valid_part(part: &str) -> bool {
    !part.is_empty() && !part.starts_with('.') && !part.contains(['/', '\\'])
}

impl SuiteId {
    /// Create from parts
    ///
    /// # Errors
    /// Returns error if either part is empty or contains a path separator
    pub fn new(asset: impl Into<String>, suite: impl Into<String>) -> Result<Self> {
        let (asset, suite) = (asset.into(), suite.into());
        if !valid_part(&asset) || !valid_part(&suite) || suite.contains('.') {
            return Err(ProjectError::InvalidSuiteName(format!("{asset}.{suite}")));
        }
        Ok(Self {
            asset: Some(asset),
            suite,
        })
    }

    /// Suite not qualified by a data asset
    ///
    /// # Errors
    /// Returns error if the name is empty, dotted or contains a path separator
    pub fn bare(suite: impl Into<String>) -> Result<Self> {
        let suite = suite.into();
        if !valid_part(&suite) || suite.contains('.') {
            return Err(ProjectError::InvalidSuiteName(suite));
        }
        Ok(Self { asset: None, suite })
    }

    /// Default suite for a data asset
    ///
    /// # Errors
    /// Returns error if the asset name is not usable as a path component
    pub fn warning(asset: &str) -> Result<Self> {
        Self::new(asset, "warning")
    }

    /// Data asset part, absent for bare names
    #[inline]
    #[must_use]
    pub fn asset(&self) -> Option<&str> {
        self.asset.as_deref()
    }

    /// Suite part
    #[inline]
    #[must_use]
    pub fn suite(&self) -> &str {
        &self.suite
    }

    /// Number of path components the id occupies
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        if self.asset.is_some() {
            2
        } else {
            1
        }
    }

    /// Path below a store root, without extension
    #[must_use]
    pub fn relative_path(&self) -> String {
        match &self.asset {
            Some(asset) => format!("{asset}/{}", self.suite),
            None => self.suite.clone(),
        }
    }
}

impl FromStr for SuiteId {
    type Err = ProjectError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.rsplit_once('.') {
            Some((asset, suite)) => Self::new(asset, suite),
            None => Self::bare(s),
        }
    }
}

impl fmt::Display for SuiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.asset {
            Some(asset) => write!(f, "{asset}.{}", self.suite),
            None => f.write_str(&self.suite),
        }
    }
}

/// One expectation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expectation {
    pub expectation_type: String,
    pub kwargs: Map<String, Value>,
}

impl Expectation {
    fn new(expectation_type: &str, kwargs: Value) -> Self {
        let kwargs = match kwargs {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            expectation_type: expectation_type.to_string(),
            kwargs,
        }
    }
}

/// Expectation suite document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectationSuite {
    pub expectation_suite_name: String,
    pub data_asset_name: String,
    pub expectations: Vec<Expectation>,
    #[serde(default)]
    pub meta: Map<String, Value>,
}

impl ExpectationSuite {
    /// Identifier of this suite
    ///
    /// # Errors
    /// Returns error if the stored name is malformed
    pub fn id(&self) -> Result<SuiteId> {
        self.expectation_suite_name.parse()
    }
}

/// Validation result identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidationId {
    pub suite: SuiteId,
    pub run_id: String,
    pub id: Uuid,
}

impl ValidationId {
    /// Fresh identifier for a validation run of `suite`
    #[must_use]
    pub fn new_run(suite: SuiteId) -> Self {
        Self {
            suite,
            run_id: Utc::now().format("%Y%m%dT%H%M%S%.6fZ").to_string(),
            id: Uuid::new_v4(),
        }
    }

    /// Path below a validations root, without extension
    #[must_use]
    pub fn relative_path(&self) -> String {
        format!("{}/{}/{}", self.suite.relative_path(), self.run_id, self.id)
    }
}

/// Outcome of one expectation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectationResult {
    pub expectation_config: Expectation,
    pub success: bool,
    #[serde(default)]
    pub result: Map<String, Value>,
}

/// Counts over a validation run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationStatistics {
    pub evaluated_expectations: usize,
    pub successful_expectations: usize,
    pub unsuccessful_expectations: usize,
    pub success_percent: f64,
}

/// Validation result document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub success: bool,
    pub results: Vec<ExpectationResult>,
    pub statistics: ValidationStatistics,
    #[serde(default)]
    pub meta: Map<String, Value>,
}

/// What a suite generator produced
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteOutcome {
    pub suite: SuiteId,
    pub expectations: usize,
    pub validation: Option<ValidationId>,
}

/// Produces example expectation suites from a sample batch
pub trait SuiteGenerator {
    /// Generate, persist and validate an example suite named `suite`
    ///
    /// # Errors
    /// Returns error if the suite or its validation cannot be persisted
    fn generate_example_suite(&mut self, batch: &Batch, suite: &SuiteId) -> Result<SuiteOutcome>;
}

/// Columns that get a per-column expectation
const EXAMPLE_COLUMNS: usize = 10;

/// Builds table-shape expectations from a batch and validates the batch
/// against them
#[derive(Debug, Clone)]
pub struct ExampleSuiteGenerator {
    project: FileProject,
}

impl ExampleSuiteGenerator {
    /// Generator persisting into `project`
    #[must_use]
    pub fn new(project: FileProject) -> Self {
        Self { project }
    }

    /// Example suite for a batch
    #[must_use]
    pub fn build_suite(batch: &Batch, suite: &SuiteId) -> ExpectationSuite {
        let mut expectations = vec![
            Expectation::new(
                "expect_table_columns_to_match_ordered_list",
                json!({ "column_list": batch.columns }),
            ),
            Expectation::new(
                "expect_table_row_count_to_be_between",
                json!({ "min_value": batch.row_count(), "max_value": batch.row_count() }),
            ),
        ];
        expectations.extend(batch.columns.iter().take(EXAMPLE_COLUMNS).map(|column| {
            Expectation::new("expect_column_to_exist", json!({ "column": column }))
        }));

        let mut meta = Map::new();
        meta.insert("assay.version".to_string(), json!(crate::VERSION));
        meta.insert("batch_kwargs".to_string(), json!(batch.kwargs));

        ExpectationSuite {
            expectation_suite_name: suite.to_string(),
            data_asset_name: suite
                .asset()
                .map_or_else(|| batch_asset_name(batch), str::to_string),
            expectations,
            meta,
        }
    }

    /// Check a batch against table-shape expectations
    #[must_use]
    pub fn validate(batch: &Batch, suite: &ExpectationSuite, run_id: &str) -> ValidationResult {
        let results: Vec<ExpectationResult> = suite
            .expectations
            .iter()
            .map(|expectation| evaluate(batch, expectation))
            .collect();
        let successful = results.iter().filter(|r| r.success).count();
        let evaluated = results.len();
        #[allow(clippy::cast_precision_loss)]
        let success_percent = if evaluated == 0 {
            100.0
        } else {
            successful as f64 * 100.0 / evaluated as f64
        };

        let mut meta = Map::new();
        meta.insert(
            "expectation_suite_name".to_string(),
            json!(suite.expectation_suite_name),
        );
        meta.insert("data_asset_name".to_string(), json!(suite.data_asset_name));
        meta.insert("run_id".to_string(), json!(run_id));
        meta.insert("batch_kwargs".to_string(), json!(batch.kwargs));

        ValidationResult {
            success: successful == evaluated,
            results,
            statistics: ValidationStatistics {
                evaluated_expectations: evaluated,
                successful_expectations: successful,
                unsuccessful_expectations: evaluated - successful,
                success_percent,
            },
            meta,
        }
    }
}

/// Asset a bare-named suite describes: the batch's file stem or table
fn batch_asset_name(batch: &Batch) -> String {
    if let Some(stem) = batch.kwargs.path().and_then(Path::file_stem) {
        return stem.to_string_lossy().into_owned();
    }
    batch.kwargs.table().unwrap_or_default().to_string()
}

fn evaluate(batch: &Batch, expectation: &Expectation) -> ExpectationResult {
    let kwargs = &expectation.kwargs;
    let (success, observed) = match expectation.expectation_type.as_str() {
        "expect_table_columns_to_match_ordered_list" => {
            let expected = kwargs.get("column_list").cloned().unwrap_or(Value::Null);
            (expected == json!(batch.columns), json!(batch.columns))
        }
        "expect_table_row_count_to_be_between" => {
            let count = batch.row_count() as u64;
            let min = kwargs.get("min_value").and_then(Value::as_u64).unwrap_or(0);
            let max = kwargs
                .get("max_value")
                .and_then(Value::as_u64)
                .unwrap_or(u64::MAX);
            (min <= count && count <= max, json!(count))
        }
        "expect_column_to_exist" => {
            let column = kwargs.get("column").and_then(Value::as_str).unwrap_or_default();
            (batch.columns.iter().any(|c| c == column), Value::Null)
        }
        _ => (false, Value::Null),
    };

    let mut result = Map::new();
    if !observed.is_null() {
        result.insert("observed_value".to_string(), observed);
    }
    ExpectationResult {
        expectation_config: expectation.clone(),
        success,
        result,
    }
}

impl SuiteGenerator for ExampleSuiteGenerator {
    fn generate_example_suite(&mut self, batch: &Batch, suite: &SuiteId) -> Result<SuiteOutcome> {
        let document = Self::build_suite(batch, suite);
        let path = self.project.save_suite(&document)?;
        info!(suite = %suite, path = %path.display(), "saved example expectation suite");

        let validation_id = ValidationId::new_run(suite.clone());
        let validation = Self::validate(batch, &document, &validation_id.run_id);
        let path = self.project.save_validation(&validation_id, &validation)?;
        info!(suite = %suite, success = validation.success, path = %path.display(), "saved validation result");

        Ok(SuiteOutcome {
            suite: suite.clone(),
            expectations: document.expectations.len(),
            validation: Some(validation_id),
        })
    }
}
