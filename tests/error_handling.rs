mod common;
use crate::common::{init_tracing, temp_config};

use ingest_config::config::{
    load_and_validate, load_from_path, LoadOptions, Schema, ValidateOptions, ViolationKind,
};
use ingest_config::errors::ConfigError;

fn no_env() -> LoadOptions {
    LoadOptions {
        validate: ValidateOptions::default(),
        env_prefix: None,
    }
}

#[test]
fn malformed_json_is_fatal_and_names_the_file() {
    init_tracing();
    let file = temp_config(r#"{"db.host": "a", "#, ".json");

    match load_from_path(file.path()) {
        Err(ConfigError::Malformed { origin, .. }) => {
            assert_eq!(origin, file.path().display().to_string());
        }
        other => panic!("expected Malformed, got {other:?}"),
    }
}

#[test]
fn nested_json_object_is_malformed() {
    let file = temp_config(r#"{"db": {"host": "a"}}"#, ".json");

    match load_from_path(file.path()) {
        Err(ConfigError::Malformed { reason, .. }) => {
            assert!(reason.contains("key 'db'"), "{reason}");
            assert!(reason.contains("nested object"), "{reason}");
        }
        other => panic!("expected Malformed, got {other:?}"),
    }
}

#[test]
fn every_violation_is_reported_at_once() {
    let file = temp_config(
        r#"{
            "db.host": "?",
            "db.port": 70000,
            "db.user": "loader",
            "-gtf.database": "ensembl",
            "gtf.batch_size": 0,
            "gtf.filename": "?/Homo_sapiens.GRCh38.105.chr.gtf.gz"
        }"#,
        ".json",
    );

    match load_and_validate(file.path(), &Schema::standard(), &no_env()) {
        Err(ConfigError::SchemaViolation(report)) => {
            assert_eq!(report.keys_of_kind(ViolationKind::Placeholder), vec!["db.host", "gtf.filename"]);
            assert_eq!(report.keys_of_kind(ViolationKind::Missing), vec!["db.password"]);
            assert_eq!(
                report.keys_of_kind(ViolationKind::Constraint),
                vec!["db.port", "gtf.batch_size"]
            );
            let msg = report.to_string();
            assert!(msg.contains("'gtf.batch_size': expected positive integer, got 0"), "{msg}");
        }
        other => panic!("expected SchemaViolation, got {other:?}"),
    }
}

#[test]
fn toml_config_loads_and_validates() {
    let file = temp_config(
        r#"
database = "forome"

[db]
host = "mysql.internal"
port = 3306
user = "loader"
password = "s3cret"

[gtex]
database = "gtex"
batch_size = 10000
filename = "/data/gtex/gene_median_tpm.gct.gz"
"#,
        ".toml",
    );

    let doc = load_and_validate(file.path(), &Schema::standard(), &no_env())
        .expect("valid TOML config");
    assert!(doc.contains("gtex.database"));
    assert!(!doc.entry("gtex.database").expect("marker").marker);
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let res = load_from_path(dir.path().join("absent.json"));
    match res {
        Err(ConfigError::Io(err)) => {
            assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
            assert!(err.to_string().contains("absent.json"), "{err}");
        }
        other => panic!("expected Io, got {other:?}"),
    }
}

#[test]
fn directory_in_place_of_config_is_an_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let res = load_from_path(dir.path());
    assert!(matches!(res, Err(ConfigError::Io(_))), "{res:?}");
}
