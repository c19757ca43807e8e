//! Testing utilities for the assay workspace
//!
//! Shared directory-tree fixtures, project fixtures and recording fakes.

#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use assay_generator::{Datasource, DatasourceKind};
use assay_project::suite::Expectation;
use assay_project::{Browser, ExpectationSuite, FileProject, ProjectStore};
use indexmap::IndexMap;
use serde_json::Map;
use tempfile::TempDir;

/// Header and rows of the sample passenger file
pub const TITANIC_CSV: &str = "\
Name,PClass,Age,Sex,Survived
\"Allen, Miss Elisabeth Walton\",1st,29,female,1
\"Allison, Miss Helen Loraine\",1st,2,female,0
\"Allison, Mr Hudson Joshua Creighton\",1st,30,male,0
";

/// Write `contents` at `dir/relative`, creating parent directories
pub fn write_file(dir: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

/// Write `relative` with placeholder CSV content for each entry
pub fn write_files(dir: &Path, relatives: &[&str]) {
    for relative in relatives {
        write_file(dir, relative, "a,b\n1,2\n");
    }
}

/// `f1.csv`, `f2.csv` and `f3/` holding two dated partitions
pub fn filesystem_csv() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_files(
        dir.path(),
        &["f1.csv", "f2.csv", "f3/f3_20190101.csv", "f3/f3_20190102.csv"],
    );
    dir
}

/// Mixed extensions, hidden files and a subdirectory with no recognized files
pub fn extensions_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_files(
        dir.path(),
        &[
            "f1.blarg",
            "f2.csv",
            "f3/f3_1.blarg",
            "f3/f3_2.blarg",
            "f4/f4_1.csv",
            "f4/f4_2.csv",
            ".f5.csv",
            "f6.tsv",
            "f7.xls",
            "f8.parquet",
            "f9.xls",
            "f0.json",
        ],
    );
    dir
}

/// Flat directory mostly of `.blarg` files
pub fn blarg_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_files(
        dir.path(),
        &[
            "f1.blarg",
            "f2.csv",
            "f3.blarg",
            "f4.blarg",
            "f5.blarg",
            "f6.blarg",
            "f7.xls",
            "f8.parquet",
            "f9.xls",
            "f0.json",
        ],
    );
    dir
}

/// Sample passenger CSV at `dir/data/Titanic.csv`
pub fn titanic_csv(dir: &Path) -> PathBuf {
    write_file(dir, "data/Titanic.csv", TITANIC_CSV)
}

/// Text file named like a workbook at `dir/data/Titanic.xls`
pub fn corrupt_xls(dir: &Path) -> PathBuf {
    write_file(
        dir,
        "data/Titanic.xls",
        "PRODUCTID,PRODUCTNAME\n1,widget\n",
    )
}

/// Scaffolded project below `root`
pub fn scaffolded_project(root: &Path) -> FileProject {
    let mut project = FileProject::new(root);
    project.scaffold().unwrap();
    project
}

/// Project with two file datasources and one stored suite
pub fn complete_project(root: &Path) -> FileProject {
    let mut project = scaffolded_project(root);
    let data = titanic_csv(root);
    let base = data.parent().unwrap().to_path_buf();
    for name in ["files_datasource", "archive_datasource"] {
        let config = Datasource::files_config(DatasourceKind::Pandas, &base);
        project
            .add_datasource(name, DatasourceKind::Pandas, config.generators)
            .unwrap();
    }
    project
        .save_suite(&ExpectationSuite {
            expectation_suite_name: "Titanic.warning".to_string(),
            data_asset_name: "Titanic".to_string(),
            expectations: vec![Expectation {
                expectation_type: "expect_column_to_exist".to_string(),
                kwargs: Map::from_iter([("column".to_string(), "Name".into())]),
            }],
            meta: Map::new(),
        })
        .unwrap();
    project
}

/// Names of every file below `dir`, relative and sorted
pub fn tree(dir: &Path) -> Vec<String> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) {
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                walk(root, &path, out);
            } else if let Ok(relative) = path.strip_prefix(root) {
                out.push(relative.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    let mut out = Vec::new();
    walk(dir, dir, &mut out);
    out.sort();
    out
}

/// Browser fake recording every opened URL
#[derive(Debug, Clone, Default)]
pub struct RecordingBrowser {
    opened: Arc<Mutex<Vec<String>>>,
}

impl RecordingBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// URLs opened so far, through any clone
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl Browser for RecordingBrowser {
    fn open(&self, url: &str) -> assay_project::Result<()> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

/// Asset globs from `(asset, pattern)` pairs in structured form
pub fn asset_globs(pairs: &[(&str, &str)]) -> IndexMap<String, assay_generator::AssetGlobEntry> {
    pairs
        .iter()
        .map(|(asset, glob)| {
            (
                (*asset).to_string(),
                assay_generator::AssetGlobSpec::new(*glob).into(),
            )
        })
        .collect()
}
