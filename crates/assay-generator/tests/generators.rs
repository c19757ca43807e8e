//! Catalog behavior over real directory trees

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use assay_generator::{
    BatchKwargsGenerator, Datasource, DatasourceConfig, DatasourceKind, DatePartitioner,
    DirectoryOptions, GeneratorConfig, GeneratorError, GlobReaderGenerator, IteratorOptions,
    SubdirReaderGenerator, TableGenerator,
};
use assay_test_utils::{asset_globs, blarg_tree, extensions_tree, filesystem_csv, write_files};
use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;

fn names(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[test]
fn directory_catalog_lists_files_and_subdirectories() {
    let dir = filesystem_csv();
    let generator = SubdirReaderGenerator::new("subdir_reader", dir.path());

    assert_eq!(
        generator.get_available_data_asset_names().unwrap(),
        names(&["f1", "f2", "f3"])
    );
}

#[test]
fn top_level_file_yields_one_descriptor() {
    let dir = filesystem_csv();
    let generator = SubdirReaderGenerator::new("subdir_reader", dir.path());

    let batches: Vec<_> = generator
        .get_iterator("f1", &IteratorOptions::default())
        .unwrap()
        .collect();
    assert_eq!(batches.len(), 1);

    let kwargs = &batches[0];
    assert!(kwargs.timestamp() > 0.0);
    let expected: IndexMap<String, Value> = IndexMap::from([
        ("path".to_string(), json!(path_string(&dir.path().join("f1.csv")))),
        ("sep".to_string(), Value::Null),
        ("engine".to_string(), json!("python")),
    ]);
    assert_eq!(kwargs.without_timestamp(), expected);
}

#[test]
fn subdirectory_yields_sorted_partitions() {
    let dir = filesystem_csv();
    let generator = SubdirReaderGenerator::new("subdir_reader", dir.path());

    let batches: Vec<_> = generator
        .get_iterator("f3", &IteratorOptions::default())
        .unwrap()
        .collect();
    let paths: Vec<_> = batches.iter().map(|b| b.path().unwrap().to_path_buf()).collect();
    assert_eq!(
        paths,
        vec![
            dir.path().join("f3").join("f3_20190101.csv"),
            dir.path().join("f3").join("f3_20190102.csv"),
        ]
    );
    let partitions: Vec<_> = batches.iter().map(|b| b.partition_id().unwrap()).collect();
    assert_eq!(partitions, vec!["f3_20190101", "f3_20190102"]);
}

#[test]
fn unknown_asset_is_a_data_context_error() {
    let dir = filesystem_csv();
    let generator = SubdirReaderGenerator::new("subdir_reader", dir.path());

    let err = generator
        .get_iterator("f4", &IteratorOptions::default())
        .unwrap_err();
    assert!(err.is_unknown_asset(), "{err}");
}

#[test]
fn only_recognized_visible_files_are_assets() {
    let dir = extensions_tree();
    let generator = SubdirReaderGenerator::new("subdir_reader", dir.path());

    assert_eq!(
        generator.get_available_data_asset_names().unwrap(),
        names(&["f0", "f2", "f4", "f6", "f7", "f8", "f9"])
    );
    // Never yielded either
    for asset in ["f1", "f3", "f5", ".f5"] {
        assert!(generator
            .get_iterator(asset, &IteratorOptions::default())
            .is_err());
    }
}

#[test]
fn extra_extensions_extend_the_catalog() {
    let dir = extensions_tree();
    let generator = SubdirReaderGenerator::new("subdir_reader", dir.path())
        .with_options(DirectoryOptions::new().with_extension("blarg"));

    let assets = generator.get_available_data_asset_names().unwrap();
    assert!(assets.contains("f1"));
    assert!(assets.contains("f3"));
    assert!(!assets.contains(".f5"));
    assert_eq!(
        generator
            .get_iterator("f3", &IteratorOptions::default())
            .unwrap()
            .count(),
        2
    );
}

#[test]
fn iteration_rescans_and_is_deterministic() {
    let dir = filesystem_csv();
    let generator = SubdirReaderGenerator::new("subdir_reader", dir.path());
    let run = || -> Vec<(String, Option<String>)> {
        generator
            .get_iterator("f3", &IteratorOptions::default())
            .unwrap()
            .map(|b| {
                (
                    path_string(b.path().unwrap()),
                    b.partition_id().map(str::to_string),
                )
            })
            .collect()
    };
    let first = run();
    assert_eq!(first, run());

    write_files(dir.path(), &["f3/f3_20190103.csv"]);
    assert_eq!(run().len(), 3);
}

#[test]
fn glob_catalog_names_are_the_configured_keys() {
    let dir = blarg_tree();
    let generator = GlobReaderGenerator::new(
        "glob_reader",
        dir.path(),
        asset_globs(&[("blargs", "*.blarg"), ("fs", "f*")]),
    )
    .unwrap();
    assert_eq!(
        generator.get_available_data_asset_names().unwrap(),
        names(&["blargs", "fs"])
    );

    // Independent of what exists on disk
    let empty = TempDir::new().unwrap();
    let generator = GlobReaderGenerator::new(
        "glob_reader",
        empty.path(),
        asset_globs(&[("blargs", "*.blarg"), ("fs", "f*")]),
    )
    .unwrap();
    assert_eq!(
        generator.get_available_data_asset_names().unwrap(),
        names(&["blargs", "fs"])
    );
    assert_eq!(
        generator
            .get_iterator("blargs", &IteratorOptions::default())
            .unwrap()
            .count(),
        0
    );
}

#[test]
fn glob_catalog_yields_matching_files() {
    let dir = blarg_tree();
    let generator = GlobReaderGenerator::new(
        "glob_reader",
        dir.path(),
        asset_globs(&[("blargs", "*.blarg"), ("fs", "f*")]),
    )
    .unwrap();

    let paths: BTreeSet<_> = generator
        .get_iterator("blargs", &IteratorOptions::default())
        .unwrap()
        .map(|b| b.path().unwrap().to_path_buf())
        .collect();
    let expected: BTreeSet<_> = ["f1", "f3", "f4", "f5", "f6"]
        .iter()
        .map(|f| dir.path().join(format!("{f}.blarg")))
        .collect();
    assert_eq!(paths, expected);

    assert_eq!(
        generator
            .get_iterator("fs", &IteratorOptions::default())
            .unwrap()
            .count(),
        10
    );
}

#[test]
fn bare_glob_strings_iterate_like_structured_specs() {
    let dir = blarg_tree();
    let root = dir.path().display();
    let bare = DatasourceConfig::from_yaml(&format!(
        "class_name: PandasDatasource\n\
         data_asset_type:\n  class_name: PandasDataset\n\
         generators:\n  glob_reader:\n    class_name: GlobReaderBatchKwargsGenerator\n    \
         base_directory: '{root}'\n    asset_globs:\n      blargs: '*.blarg'\n      fs: 'f*'\n"
    ))
    .unwrap();

    let GeneratorConfig::GlobReader(cfg) = &bare.generators["glob_reader"] else {
        panic!("expected a glob reader config");
    };
    let bare_generator =
        GlobReaderGenerator::new("glob_reader", dir.path(), cfg.asset_globs.clone()).unwrap();
    let structured = GlobReaderGenerator::new(
        "glob_reader",
        dir.path(),
        asset_globs(&[("blargs", "*.blarg"), ("fs", "f*")]),
    )
    .unwrap();

    assert_eq!(bare_generator.deprecation_warnings().len(), 1);
    assert!(structured.deprecation_warnings().is_empty());

    for asset in ["blargs", "fs"] {
        let view = |g: &GlobReaderGenerator| -> Vec<_> {
            g.get_iterator(asset, &IteratorOptions::default())
                .unwrap()
                .map(|b| b.without_timestamp())
                .collect()
        };
        assert_eq!(view(&bare_generator), view(&structured));
    }
}

#[test]
fn injected_date_partitioner_applies_to_every_asset() {
    let dir = TempDir::new().unwrap();
    write_files(
        dir.path(),
        &["20190101__my_data.csv", "20190102__my_data.csv"],
    );
    let generator = GlobReaderGenerator::new("glob_reader", dir.path(), IndexMap::new())
        .unwrap()
        .with_partitioner(Arc::new(DatePartitioner::new()));

    assert_eq!(
        generator.get_available_data_asset_names().unwrap(),
        names(&["default"])
    );
    let mut partitions: Vec<_> = generator
        .get_iterator("default", &IteratorOptions::default())
        .unwrap()
        .map(|b| b.partition_id().unwrap().to_string())
        .collect();
    partitions.sort();
    assert_eq!(partitions, vec!["2019-01-01", "2019-01-02"]);
}

#[test]
fn empty_table_catalog_still_iterates_named_tables() {
    let generator = TableGenerator::new("table", Vec::<String>::new());
    assert!(generator.configured_tables().is_empty());
    assert!(generator.get_available_data_asset_names().unwrap().is_empty());

    let batches: Vec<_> = generator
        .get_iterator("foo", &IteratorOptions::default())
        .unwrap()
        .collect();
    assert!(!batches.is_empty());
    let kwargs = &batches[0];
    assert!(kwargs.timestamp() > 0.0);
    assert!(kwargs
        .query()
        .unwrap()
        .to_lowercase()
        .starts_with("select * from"));
}

#[test]
fn datasource_rejects_names_outside_the_catalog() {
    let datasource = Datasource::from_config(
        "db",
        DatasourceConfig {
            class_name: DatasourceKind::Sql.class_name().to_string(),
            data_asset_type: assay_generator::config::DataAssetTypeConfig {
                class_name: DatasourceKind::Sql.data_asset_class_name().to_string(),
            },
            generators: IndexMap::from([(
                "table".to_string(),
                GeneratorConfig::Table(assay_generator::config::TableConfig::default()),
            )]),
        },
        Path::new("."),
    )
    .unwrap();

    let err = datasource.build_batch_kwargs("foo", None).unwrap_err();
    assert!(matches!(err, GeneratorError::UnknownAsset { .. }), "{err}");
}

#[test]
fn file_datasource_resolves_assets_through_its_generator() {
    let dir = filesystem_csv();
    let datasource =
        Datasource::files("files_datasource", DatasourceKind::Pandas, dir.path(), Path::new("."))
            .unwrap();

    let names_by_generator = datasource.available_data_asset_names().unwrap();
    assert_eq!(
        names_by_generator["subdir_reader"],
        names(&["f1", "f2", "f3"])
    );
    assert_eq!(datasource.generator_names().collect::<Vec<_>>(), vec!["subdir_reader"]);

    let kwargs = datasource.build_batch_kwargs("f3", None).unwrap();
    assert_eq!(kwargs.partition_id(), Some("f3_20190101"));

    let err = datasource.build_batch_kwargs("f4", None).unwrap_err();
    assert!(err.is_unknown_asset());
}
