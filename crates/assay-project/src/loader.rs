//! Batch materialization
//!
//! A [`Loader`] turns a [`BatchKwargs`] into a [`Batch`] of rows. Failures
//! are [`LoadError`]s: classified, recoverable, and never fatal to the
//! caller's state.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use assay_batch::{BatchKwargs, BatchSource};
use indexmap::IndexSet;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{LoadError, LoadErrorCategory};

/// Rows read from one batch
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Descriptor the batch was read from
    pub kwargs: BatchKwargs,
    /// Column names in file order
    pub columns: Vec<String>,
    /// Row values, aligned with `columns`
    pub rows: Vec<Vec<Value>>,
}

impl Batch {
    /// Number of data rows
    #[inline]
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Materializes batches
pub trait Loader {
    /// Read the batch `kwargs` describes
    ///
    /// # Errors
    /// Returns a classified [`LoadError`] if the data cannot be read
    fn load(&self, kwargs: &BatchKwargs) -> Result<Batch, LoadError>;
}

/// Formats recognized by [`FileLoader`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Csv,
    Tsv,
    Excel,
    Parquet,
    Json,
}

impl DataFormat {
    /// Format for a reader method name
    #[must_use]
    pub fn from_reader_method(method: &str) -> Option<Self> {
        match method {
            "read_csv" | "read_table" => Some(Self::Csv),
            "read_excel" => Some(Self::Excel),
            "read_parquet" => Some(Self::Parquet),
            "read_json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Format for a file extension
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "tsv" => Some(Self::Tsv),
            "xls" | "xlsx" => Some(Self::Excel),
            "parquet" => Some(Self::Parquet),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    fn detect(kwargs: &BatchKwargs, path: &Path) -> Option<Self> {
        let by_extension = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension);
        match kwargs.reader_method().and_then(Self::from_reader_method) {
            // read_csv over a .tsv file keeps the tab default
            Some(Self::Csv) if by_extension == Some(Self::Tsv) => by_extension,
            Some(format) => Some(format),
            None => by_extension,
        }
    }
}

const OLE2_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const ZIP_MAGIC: [u8; 4] = [b'P', b'K', 0x03, 0x04];
const PARQUET_MAGIC: [u8; 4] = *b"PAR1";
const SNIFF_DELIMITERS: [u8; 4] = [b',', b'\t', b';', b'|'];

/// Reads delimited text and JSON files from the local filesystem
///
/// Spreadsheet and parquet files are recognized by their magic bytes but not
/// decoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

impl FileLoader {
    /// Create a file loader
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn load_delimited(
        kwargs: &BatchKwargs,
        path: &Path,
        format: DataFormat,
    ) -> Result<(Vec<String>, Vec<Vec<Value>>), LoadError> {
        let delimiter = match separator(kwargs) {
            Some(delimiter) => delimiter,
            None if format == DataFormat::Tsv => b'\t',
            None => sniff_delimiter(path)?,
        };
        let limit = row_limit(kwargs);

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .from_path(path)
            .map_err(csv_error)?;
        let columns: Vec<String> = reader
            .headers()
            .map_err(csv_error)?
            .iter()
            .map(str::to_string)
            .collect();
        if columns.iter().all(String::is_empty) {
            return Err(LoadError::new(LoadErrorCategory::Empty, "file has no header row"));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            if limit.is_some_and(|limit| rows.len() >= limit) {
                break;
            }
            let record = record.map_err(csv_error)?;
            rows.push(record.iter().map(parse_field).collect());
        }
        Ok((columns, rows))
    }

    fn load_json(
        kwargs: &BatchKwargs,
        path: &Path,
    ) -> Result<(Vec<String>, Vec<Vec<Value>>), LoadError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| LoadError::new(LoadErrorCategory::Unreadable, e.to_string()))?;
        let parse = |e: serde_json::Error| LoadError::new(LoadErrorCategory::Parse, e.to_string());

        let records: Vec<Map<String, Value>> = if text.trim_start().starts_with('[') {
            serde_json::from_str(&text).map_err(parse)?
        } else {
            text.lines()
                .filter(|line| !line.trim().is_empty())
                .map(|line| serde_json::from_str(line).map_err(parse))
                .collect::<Result<_, _>>()?
        };

        let columns: Vec<String> = records
            .iter()
            .flat_map(Map::keys)
            .cloned()
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();
        let limit = row_limit(kwargs).unwrap_or(usize::MAX);
        let rows = records
            .into_iter()
            .take(limit)
            .map(|mut record| {
                columns
                    .iter()
                    .map(|c| record.remove(c).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Ok((columns, rows))
    }

    fn reject_binary(path: &Path, format: DataFormat) -> LoadError {
        let head = match read_head(path) {
            Ok(head) => head,
            Err(e) => return e,
        };
        let recognized = match format {
            DataFormat::Excel => head.starts_with(&OLE2_MAGIC) || head.starts_with(&ZIP_MAGIC),
            _ => head.starts_with(&PARQUET_MAGIC),
        };
        let message = match (format, recognized) {
            (DataFormat::Excel, true) => "no spreadsheet engine is available to read workbooks".to_string(),
            (_, true) => "no columnar engine is available to read parquet files".to_string(),
            (DataFormat::Excel, false) => {
                format!("Expected BOF record; found b'{}'", escaped_bytes(&head))
            }
            (_, false) => format!("Expected PAR1 magic; found b'{}'", escaped_bytes(&head)),
        };
        LoadError::new(LoadErrorCategory::UnsupportedFormat, message)
    }
}

impl Loader for FileLoader {
    fn load(&self, kwargs: &BatchKwargs) -> Result<Batch, LoadError> {
        let path = match kwargs.source() {
            BatchSource::Path(path) => path,
            other => {
                return Err(LoadError::new(
                    LoadErrorCategory::UnsupportedSource,
                    format!("cannot read {} sources from the filesystem", other.key()),
                ))
            }
        };
        if !path.is_file() {
            return Err(LoadError::new(
                LoadErrorCategory::NotFound,
                format!("No such file: '{}'", path.display()),
            ));
        }

        let format = DataFormat::detect(kwargs, path).ok_or_else(|| {
            LoadError::new(
                LoadErrorCategory::UnsupportedFormat,
                format!("unrecognized file type: '{}'", path.display()),
            )
        })?;
        debug!(path = %path.display(), ?format, "loading batch");

        let (columns, rows) = match format {
            DataFormat::Csv | DataFormat::Tsv => Self::load_delimited(kwargs, path, format)?,
            DataFormat::Json => Self::load_json(kwargs, path)?,
            DataFormat::Excel | DataFormat::Parquet => return Err(Self::reject_binary(path, format)),
        };
        if rows.is_empty() {
            return Err(LoadError::new(LoadErrorCategory::Empty, "no data rows"));
        }
        Ok(Batch {
            kwargs: kwargs.clone(),
            columns,
            rows,
        })
    }
}

fn separator(kwargs: &BatchKwargs) -> Option<u8> {
    match kwargs.get("sep")?.as_str()? {
        "\\t" => Some(b'\t'),
        sep if sep.len() == 1 => sep.bytes().next(),
        _ => None,
    }
}

fn row_limit(kwargs: &BatchKwargs) -> Option<usize> {
    kwargs.limit().and_then(|limit| usize::try_from(limit).ok())
}

/// Most frequent candidate delimiter in the header line, `,` on ties
fn sniff_delimiter(path: &Path) -> Result<u8, LoadError> {
    let file =
        File::open(path).map_err(|e| LoadError::new(LoadErrorCategory::Unreadable, e.to_string()))?;
    let mut header = Vec::new();
    BufReader::new(file)
        .read_until(b'\n', &mut header)
        .map_err(|e| LoadError::new(LoadErrorCategory::Unreadable, e.to_string()))?;

    let mut best = (b',', 0);
    for candidate in SNIFF_DELIMITERS {
        let count = header.iter().filter(|&&b| b == candidate).count();
        if count > best.1 {
            best = (candidate, count);
        }
    }
    Ok(best.0)
}

fn read_head(path: &Path) -> Result<Vec<u8>, LoadError> {
    let mut head = Vec::with_capacity(8);
    File::open(path)
        .and_then(|file| file.take(8).read_to_end(&mut head))
        .map_err(|e| LoadError::new(LoadErrorCategory::Unreadable, e.to_string()))?;
    Ok(head)
}

fn csv_error(e: csv::Error) -> LoadError {
    let category = if e.is_io_error() {
        LoadErrorCategory::Unreadable
    } else {
        LoadErrorCategory::Parse
    };
    LoadError::new(category, e.to_string())
}

/// Typed cell value: integer, float, or text; empty cells are null
fn parse_field(field: &str) -> Value {
    if field.is_empty() {
        return Value::Null;
    }
    if let Ok(int) = field.parse::<i64>() {
        return Value::from(int);
    }
    if let Ok(float) = field.parse::<f64>() {
        if float.is_finite() {
            return Value::from(float);
        }
    }
    Value::String(field.to_string())
}

/// Render bytes as an escaped byte-string literal
fn escaped_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\'' => out.push_str("\\'"),
            b'\t' => out.push_str("\\t"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            0x20..=0x7e => out.push(char::from(b)),
            _ => out.push_str(&format!("\\x{b:02x}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn load(dir: &Path, name: &str, contents: &[u8]) -> Result<Batch, LoadError> {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        FileLoader::new().load(&BatchKwargs::from_path(&path))
    }

    #[test]
    fn reads_csv_with_typed_cells() {
        let dir = tempfile::tempdir().unwrap();
        let batch = load(dir.path(), "t.csv", b"name,age,fare\nAllen,29,211.3375\nAllison,,151.55\n").unwrap();
        assert_eq!(batch.columns, vec!["name", "age", "fare"]);
        assert_eq!(batch.row_count(), 2);
        assert_eq!(batch.rows[0], vec![json!("Allen"), json!(29), json!(211.3375)]);
        assert_eq!(batch.rows[1][1], Value::Null);
    }

    #[test]
    fn sniffs_semicolons() {
        let dir = tempfile::tempdir().unwrap();
        let batch = load(dir.path(), "t.csv", b"a;b\n1;2\n").unwrap();
        assert_eq!(batch.columns, vec!["a", "b"]);
    }

    #[test]
    fn explicit_separator_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(&path, "a|b,c\n1|2,3\n").unwrap();
        let kwargs = BatchKwargs::from_path(&path)
            .with_option("sep", json!("|"))
            .unwrap();
        let batch = FileLoader::new().load(&kwargs).unwrap();
        assert_eq!(batch.columns, vec!["a", "b,c"]);
    }

    #[test]
    fn limit_truncates_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(&path, "a\n1\n2\n3\n").unwrap();
        let batch = FileLoader::new()
            .load(&BatchKwargs::from_path(&path).with_limit(2))
            .unwrap();
        assert_eq!(batch.row_count(), 2);
    }

    #[test]
    fn header_only_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path(), "t.csv", b"a,b\n").unwrap_err();
        assert_eq!(err.category, LoadErrorCategory::Empty);
    }

    #[test]
    fn ragged_rows_are_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path(), "t.csv", b"a,b\n1,2,3\n").unwrap_err();
        assert_eq!(err.category, LoadErrorCategory::Parse);
    }

    #[test]
    fn text_disguised_as_xls_reports_bof() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path(), "t.xls", b"PRODUCTID,NAME\n1,x\n").unwrap_err();
        assert_eq!(err.category, LoadErrorCategory::UnsupportedFormat);
        assert_eq!(err.message, "Expected BOF record; found b'PRODUCTI'");
    }

    #[test]
    fn real_workbook_magic_is_recognized() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path(), "t.xls", &OLE2_MAGIC).unwrap_err();
        assert_eq!(err.category, LoadErrorCategory::UnsupportedFormat);
        assert!(!err.message.contains("BOF"));
    }

    #[test]
    fn json_array_and_ndjson() {
        let dir = tempfile::tempdir().unwrap();
        let batch = load(dir.path(), "a.json", br#"[{"a": 1}, {"a": 2, "b": "x"}]"#).unwrap();
        assert_eq!(batch.columns, vec!["a", "b"]);
        assert_eq!(batch.rows[0], vec![json!(1), Value::Null]);

        let batch = load(dir.path(), "b.json", b"{\"a\": 1}\n\n{\"a\": 2}\n").unwrap();
        assert_eq!(batch.row_count(), 2);
    }

    #[test]
    fn missing_file_and_query_sources() {
        let err = FileLoader::new()
            .load(&BatchKwargs::from_path("/definitely/not/here.csv"))
            .unwrap_err();
        assert_eq!(err.category, LoadErrorCategory::NotFound);

        let err = FileLoader::new()
            .load(&BatchKwargs::from_query("SELECT * FROM t"))
            .unwrap_err();
        assert_eq!(err.category, LoadErrorCategory::UnsupportedSource);
    }

    #[test]
    fn escaped_bytes_escapes() {
        assert_eq!(escaped_bytes(b"PK\x03\x04a'\\"), "PK\\x03\\x04a\\'\\\\");
    }
}
