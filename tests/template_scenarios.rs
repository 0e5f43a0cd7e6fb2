mod common;
use crate::common::{init_tracing, template_path};

use std::error::Error;
use std::num::NonZeroUsize;

use ingest_config::config::{
    load, validate, ConfigSource, ConfigValue, Port, Schema, ValidateOptions, ViolationKind,
};
use ingest_config::errors::ConfigError;
use ingest_config::sources::Source;
use ingest_config_test_utils::builders::ConfigDocumentBuilder;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn template_flags_every_unresolved_placeholder() -> TestResult {
    init_tracing();

    let doc = load(&ConfigSource::File(template_path()))?;
    let report = validate(&Schema::standard(), &doc, ValidateOptions::default());
    let placeholders = report.unresolved_placeholders();

    for key in [
        "db.host",
        "db.user",
        "db.password",
        "pharmgkb.path",
        "clinvar.variant_summary_file",
        "clinvar.XML_FILE",
        "gtf.filename",
        "gtex.filename",
    ] {
        assert!(placeholders.contains(&key), "{key} not flagged: {placeholders:?}");
    }
    assert!(!placeholders.contains(&"db.port"));
    assert!(!placeholders.contains(&"database"));

    // Every template source is declared through its `-` marker.
    for source in Source::ALL {
        assert!(doc.entry(&source.marker_key()).map(|e| e.marker).unwrap_or(false));
    }
    Ok(())
}

#[test]
fn template_batch_sizes_are_positive_integers() -> TestResult {
    init_tracing();

    let schema = Schema::standard();
    let doc = load(&ConfigSource::File(template_path()))?;

    let expected = [
        (Source::PharmGkb, 100),
        (Source::Gtex, 10000),
        (Source::Clinvar, 1000),
        (Source::Gtf, 10000),
    ];
    for (source, size) in expected {
        let got: NonZeroUsize = schema.get(&doc, &source.key("batch_size"))?;
        assert_eq!(got.get(), size, "{source}");
    }

    let report = validate(&schema, &doc, ValidateOptions::default());
    assert!(
        report
            .violations()
            .iter()
            .all(|v| !v.key.ends_with(".batch_size")),
        "{report}"
    );
    Ok(())
}

#[test]
fn missing_port_needs_a_registered_default() -> TestResult {
    let doc = ConfigDocumentBuilder::new()
        .with("db.host", "mysql.internal")
        .build();

    match Schema::standard().get::<Port>(&doc, "db.port") {
        Err(ConfigError::MissingKey { key }) => assert_eq!(key, "db.port"),
        other => panic!("expected MissingKey, got {other:?}"),
    }

    let schema = Schema::standard().with_default("db.port", 3306)?;
    assert_eq!(schema.get::<Port>(&doc, "db.port")?.get(), 3306);

    // A registered default also satisfies validation.
    let report = validate(&schema, &doc, ValidateOptions::default());
    assert!(!report.keys_of_kind(ViolationKind::Missing).contains(&"db.port"));
    Ok(())
}

#[test]
fn non_numeric_port_is_a_type_mismatch() -> TestResult {
    let doc = ConfigDocumentBuilder::resolved()
        .with("db.port", "not-a-number")
        .build();
    let schema = Schema::standard();

    match schema.get::<i64>(&doc, "db.port") {
        Err(ConfigError::TypeMismatch { key, .. }) => assert_eq!(key, "db.port"),
        other => panic!("expected TypeMismatch, got {other:?}"),
    }

    let report = validate(&schema, &doc, ValidateOptions::default());
    assert_eq!(report.keys_of_kind(ViolationKind::TypeMismatch), vec!["db.port"]);
    let msg = report.to_string();
    assert!(msg.contains("'db.port'") && msg.contains("TCP port"), "{msg}");
    Ok(())
}

#[test]
fn unknown_keys_only_fail_strict_validation() -> TestResult {
    let doc = ConfigDocumentBuilder::resolved()
        .with("foo.bar", ConfigValue::Int(1))
        .build();
    let schema = Schema::standard();

    let lenient = validate(&schema, &doc, ValidateOptions::default());
    assert!(lenient.is_valid(), "{lenient}");

    let strict = validate(&schema, &doc, ValidateOptions::strict());
    assert_eq!(strict.keys_of_kind(ViolationKind::UnknownKey), vec!["foo.bar"]);
    assert!(matches!(
        strict.into_result(),
        Err(ConfigError::SchemaViolation(_))
    ));
    Ok(())
}

#[test]
fn validation_is_repeatable() -> TestResult {
    let doc = load(&ConfigSource::File(template_path()))?;
    let schema = Schema::standard();
    let first = validate(&schema, &doc, ValidateOptions::strict());
    let second = validate(&schema, &doc, ValidateOptions::strict());
    assert_eq!(first, second);
    Ok(())
}
