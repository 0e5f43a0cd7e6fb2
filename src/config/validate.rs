// src/config/validate.rs

use std::fmt;

use tracing::{debug, info};

use crate::config::document::{namespace_of, ConfigDocument, MARKER_PREFIX};
use crate::config::schema::{render_value, CheckFailure, KeySpec, Requirement, Schema};
use crate::errors::{ConfigError, Result};
use crate::sources::Source;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Also report keys the schema does not know.
    pub strict: bool,
}

impl ValidateOptions {
    pub fn strict() -> Self {
        Self { strict: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    Missing,
    TypeMismatch,
    Constraint,
    Placeholder,
    UnknownKey,
    MissingMarker,
}

/// One problem with one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub key: String,
    pub expected: String,
    /// Rendered value, `None` when the key is absent. Secrets are redacted.
    pub actual: Option<String>,
    pub kind: ViolationKind,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.actual) {
            (ViolationKind::Missing, _) => {
                write!(f, "'{}': missing, expected {}", self.key, self.expected)
            }
            (ViolationKind::MissingMarker, _) => write!(
                f,
                "'{}': missing, expected {} (namespace has settings but no marker)",
                self.key, self.expected
            ),
            (ViolationKind::Placeholder, Some(actual)) => write!(
                f,
                "'{}': unresolved placeholder {}, expected {}",
                self.key, actual, self.expected
            ),
            (ViolationKind::UnknownKey, _) => {
                write!(f, "'{}': unknown key ({})", self.key, self.expected)
            }
            (_, Some(actual)) => {
                write!(f, "'{}': expected {}, got {}", self.key, self.expected, actual)
            }
            (_, None) => write!(f, "'{}': expected {}", self.key, self.expected),
        }
    }
}

/// All violations found in one pass, in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn keys_of_kind(&self, kind: ViolationKind) -> Vec<&str> {
        self.violations
            .iter()
            .filter(|v| v.kind == kind)
            .map(|v| v.key.as_str())
            .collect()
    }

    /// Keys whose values still need operator substitution.
    pub fn unresolved_placeholders(&self) -> Vec<&str> {
        self.keys_of_kind(ViolationKind::Placeholder)
    }

    /// `Err(SchemaViolation)` carrying every violation, if there are any.
    pub fn into_result(self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ConfigError::SchemaViolation(self))
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.violations.is_empty() {
            return write!(f, "configuration is valid");
        }
        write!(f, "{} configuration violation(s):", self.violations.len())?;
        for v in &self.violations {
            write!(f, "\n  - {v}")?;
        }
        Ok(())
    }
}

/// Check every recognised key of `doc` against `schema`.
///
/// Never fails early: the report holds everything that is wrong. Order is
/// schema declaration order, then namespace markers, then unknown keys
/// (strict mode only) in key order.
pub fn validate(schema: &Schema, doc: &ConfigDocument, options: ValidateOptions) -> ValidationReport {
    let mut violations = Vec::new();

    for spec in schema.specs() {
        check_spec(schema, doc, spec, &mut violations);
    }
    check_markers(schema, doc, &mut violations);
    if options.strict {
        check_unknown_keys(schema, doc, &mut violations);
    }

    let report = ValidationReport { violations };
    info!(
        violations = report.len(),
        strict = options.strict,
        "validated configuration"
    );
    report
}

/// Validate in strict mode and turn any violation into `SchemaViolation`.
pub fn validate_strict(schema: &Schema, doc: &ConfigDocument) -> Result<()> {
    validate(schema, doc, ValidateOptions::strict()).into_result()
}

fn check_spec(schema: &Schema, doc: &ConfigDocument, spec: &KeySpec, out: &mut Vec<Violation>) {
    let expected = spec.constraint.describe().to_string();

    let Some(entry) = doc.entry(&spec.key) else {
        let required = match spec.requirement {
            Requirement::Required => true,
            Requirement::Optional => false,
            Requirement::WhenDeclared(source) => schema.is_declared(doc, source),
        };
        if required && spec.default.is_none() {
            out.push(Violation {
                key: spec.key.clone(),
                expected,
                actual: None,
                kind: ViolationKind::Missing,
            });
        }
        return;
    };

    if entry.marker && !spec.marker {
        out.push(Violation {
            key: format!("{MARKER_PREFIX}{}", spec.key),
            expected: format!("plain key '{}' (the '-' prefix is reserved for namespace markers)", spec.key),
            actual: Some(spec.display_value(&entry.value)),
            kind: ViolationKind::Constraint,
        });
    }

    let kind = match spec.constraint.check(&entry.value) {
        Ok(()) => return,
        Err(CheckFailure::Type) => ViolationKind::TypeMismatch,
        Err(CheckFailure::Bounds) => ViolationKind::Constraint,
        Err(CheckFailure::Placeholder) => ViolationKind::Placeholder,
    };
    debug!(key = %spec.key, ?kind, "violation");
    out.push(Violation {
        key: spec.key.clone(),
        expected,
        actual: Some(spec.display_value(&entry.value)),
        kind,
    });
}

/// A source namespace with recognised settings but no `-<source>.database`
/// marker. Unknown keys alone do not count as settings.
fn check_markers(schema: &Schema, doc: &ConfigDocument, out: &mut Vec<Violation>) {
    for source in Source::ALL {
        let has_settings = doc
            .keys()
            .any(|key| namespace_of(key) == Some(source.name()) && schema.is_known(key));
        if has_settings && !schema.is_declared(doc, source) {
            out.push(Violation {
                key: format!("{MARKER_PREFIX}{}", source.marker_key()),
                expected: "target database name for this source".to_string(),
                actual: None,
                kind: ViolationKind::MissingMarker,
            });
        }
    }
}

fn check_unknown_keys(schema: &Schema, doc: &ConfigDocument, out: &mut Vec<Violation>) {
    for (key, entry) in doc.iter() {
        if schema.is_known(key) {
            continue;
        }
        let written = if entry.marker {
            format!("{MARKER_PREFIX}{key}")
        } else {
            key.to_string()
        };
        let expected = match namespace_of(key) {
            Some(ns) => format!("not recognised in namespace '{ns}'"),
            None => "not a recognised global key".to_string(),
        };
        out.push(Violation {
            key: written,
            expected,
            actual: Some(render_value(false, &entry.value)),
            kind: ViolationKind::UnknownKey,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::value::ConfigValue;

    fn valid_doc() -> ConfigDocument {
        ConfigDocument::new()
            .with_value("db.host", "mysql.internal")
            .unwrap()
            .with_value("db.port", 3306)
            .unwrap()
            .with_value("db.user", "loader")
            .unwrap()
            .with_value("db.password", "s3cret")
            .unwrap()
            .with_value("-gtf.database", "ensembl")
            .unwrap()
            .with_value("gtf.batch_size", 10000)
            .unwrap()
            .with_value("gtf.filename", "/data/Homo_sapiens.GRCh38.105.chr.gtf.gz")
            .unwrap()
    }

    #[test]
    fn valid_document_has_no_violations() {
        let report = validate(&Schema::standard(), &valid_doc(), ValidateOptions::strict());
        assert!(report.is_valid(), "{report}");
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn undeclared_sources_need_no_keys() {
        let report = validate(&Schema::standard(), &valid_doc(), ValidateOptions::default());
        assert!(report.keys_of_kind(ViolationKind::Missing).is_empty());
    }

    #[test]
    fn declared_source_requires_its_settings() {
        let doc = valid_doc().with_value("-clinvar.database", "clinvar").unwrap();
        let report = validate(&Schema::standard(), &doc, ValidateOptions::default());
        assert_eq!(
            report.keys_of_kind(ViolationKind::Missing),
            vec![
                "clinvar.batch_size",
                "clinvar.variant_summary_file",
                "clinvar.XML_FILE"
            ]
        );
    }

    #[test]
    fn settings_without_marker_are_reported() {
        let doc = valid_doc().with_value("gtex.batch_size", 10).unwrap();
        let report = validate(&Schema::standard(), &doc, ValidateOptions::default());
        assert_eq!(
            report.keys_of_kind(ViolationKind::MissingMarker),
            vec!["-gtex.database"]
        );
    }

    #[test]
    fn unknown_keys_alone_do_not_need_a_marker() {
        let doc = valid_doc().with_value("gtex.note", "later").unwrap();
        let report = validate(&Schema::standard(), &doc, ValidateOptions::default());
        assert!(report.is_valid(), "{report}");

        let report = validate(&Schema::standard(), &doc, ValidateOptions::strict());
        assert_eq!(report.keys_of_kind(ViolationKind::UnknownKey), vec!["gtex.note"]);
        assert!(report.keys_of_kind(ViolationKind::MissingMarker).is_empty());
    }

    #[test]
    fn zero_and_negative_batch_sizes_are_constraint_violations() {
        let doc = valid_doc().with_value("gtf.batch_size", 0).unwrap();
        let report = validate(&Schema::standard(), &doc, ValidateOptions::default());
        assert_eq!(report.keys_of_kind(ViolationKind::Constraint), vec!["gtf.batch_size"]);

        let doc = valid_doc().with_value("gtf.batch_size", -10).unwrap();
        let report = validate(&Schema::standard(), &doc, ValidateOptions::default());
        assert_eq!(report.keys_of_kind(ViolationKind::Constraint), vec!["gtf.batch_size"]);
    }

    #[test]
    fn dash_on_ordinary_key_is_reported() {
        let doc = valid_doc().with_value("-gtf.filename-extra", "x").unwrap();
        let report = validate(&Schema::standard(), &doc, ValidateOptions::strict());
        assert_eq!(report.keys_of_kind(ViolationKind::UnknownKey), vec!["-gtf.filename-extra"]);

        let doc = ConfigDocument::new()
            .with_value("-db.host", "h")
            .unwrap()
            .with_value("db.port", 1)
            .unwrap()
            .with_value("db.user", "u")
            .unwrap()
            .with_value("db.password", "p")
            .unwrap();
        let report = validate(&Schema::standard(), &doc, ValidateOptions::default());
        assert_eq!(report.keys_of_kind(ViolationKind::Constraint), vec!["-db.host"]);
    }

    #[test]
    fn password_never_appears_in_report() {
        let doc = valid_doc().with_value("db.password", ConfigValue::from("  ")).unwrap();
        let report = validate(&Schema::standard(), &doc, ValidateOptions::default());
        let text = report.to_string();
        assert!(text.contains("'db.password'"), "{text}");
        assert!(text.contains("<redacted>"), "{text}");
    }

    #[test]
    fn strict_result_aggregates_everything() {
        let doc = ConfigDocument::new().with_value("foo.bar", 1).unwrap();
        match validate_strict(&Schema::standard(), &doc) {
            Err(ConfigError::SchemaViolation(report)) => {
                assert_eq!(report.keys_of_kind(ViolationKind::Missing).len(), 4);
                assert_eq!(report.keys_of_kind(ViolationKind::UnknownKey), vec!["foo.bar"]);
                let msg = report.to_string();
                assert!(msg.starts_with("5 configuration violation(s):"), "{msg}");
            }
            other => panic!("expected SchemaViolation, got {other:?}"),
        }
    }
}
