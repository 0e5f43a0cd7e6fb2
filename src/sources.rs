// src/sources.rs

//! Ingestion sources and the settings each job reads at startup.
//!
//! The ingestion jobs themselves live elsewhere. This module is the
//! boundary they consume: a [`SourceJob`] is everything one job needs,
//! resolved and checked before any batch is written.

use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::ValueEnum;
use tracing::{debug, info};

use crate::config::document::{ConfigDocument, MARKER_PREFIX};
use crate::config::schema::{Constraint, Schema, DB_HOST, DB_PASSWORD, DB_PORT, DB_USER};
use crate::config::value::{ConfigValue, FromConfigValue, Port};
use crate::errors::{ConfigError, Result};
use crate::fs::FileSystem;

/// Tables a PharmGKB download directory must contain.
pub const PHARMGKB_TABLES: &[&str] = &[
    "clinical_ann.tsv",
    "clinical_ann_metadata.tsv",
    "study_parameters.tsv",
    "var_drug_ann.tsv",
    "var_fa_ann.tsv",
    "var_pheno_ann.tsv",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum)]
pub enum Source {
    /// Pharmacogenomics annotations (PharmGKB).
    #[value(name = "pharmgkb")]
    PharmGkb,
    /// Gene expression medians (GTEx).
    #[value(name = "gtex")]
    Gtex,
    /// Clinical variants (ClinVar).
    #[value(name = "clinvar")]
    Clinvar,
    /// Genome annotation (Ensembl GTF).
    #[value(name = "gtf")]
    Gtf,
}

impl Source {
    pub const ALL: [Source; 4] = [Source::PharmGkb, Source::Gtex, Source::Clinvar, Source::Gtf];

    /// Namespace prefix used in config keys.
    pub fn name(self) -> &'static str {
        match self {
            Source::PharmGkb => "pharmgkb",
            Source::Gtex => "gtex",
            Source::Clinvar => "clinvar",
            Source::Gtf => "gtf",
        }
    }

    pub fn key(self, field: &str) -> String {
        format!("{}.{}", self.name(), field)
    }

    /// Stored form of the marker key, `<source>.database`.
    pub fn marker_key(self) -> String {
        self.key("database")
    }

    /// Marker key as written in templates, `-<source>.database`.
    pub fn written_marker_key(self) -> String {
        format!("{MARKER_PREFIX}{}", self.marker_key())
    }

    pub fn path_fields(self) -> &'static [&'static str] {
        match self {
            Source::PharmGkb => &["path"],
            Source::Gtex => &["filename"],
            Source::Clinvar => &["variant_summary_file", "XML_FILE"],
            Source::Gtf => &["filename"],
        }
    }

    fn input_kind(self) -> InputKind {
        match self {
            Source::PharmGkb => InputKind::Directory {
                required_files: PHARMGKB_TABLES,
            },
            _ => InputKind::File,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Source::ALL
            .into_iter()
            .find(|src| src.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!("unknown ingestion source '{s}' (expected pharmgkb, gtex, clinvar or gtf)")
            })
    }
}

/// A credential that never shows up in logs or debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Connection parameters for the database writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConnection {
    pub host: String,
    pub port: Port,
    pub user: String,
    pub password: Secret,
    pub database: String,
}

impl DbConnection {
    /// `mysql://user@host:port/database`, without the password.
    pub fn display_url(&self) -> String {
        format!(
            "mysql://{}@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    File,
    /// A directory holding a fixed set of tables.
    Directory { required_files: &'static [&'static str] },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInput {
    pub key: String,
    pub path: PathBuf,
    pub kind: InputKind,
}

impl SourceInput {
    /// Concrete files this input stands for.
    pub fn files(&self) -> Vec<PathBuf> {
        match self.kind {
            InputKind::File => vec![self.path.clone()],
            InputKind::Directory { required_files } => {
                required_files.iter().map(|f| self.path.join(f)).collect()
            }
        }
    }
}

/// Everything one ingestion job needs, resolved and placeholder-free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceJob {
    pub source: Source,
    pub connection: DbConnection,
    pub batch_size: NonZeroUsize,
    pub inputs: Vec<SourceInput>,
}

impl SourceJob {
    /// Resolve the settings for `source`.
    ///
    /// Fails on the first missing key, type mismatch or placeholder, so a
    /// bad config stops the job before it starts writing.
    pub fn resolve(schema: &Schema, doc: &ConfigDocument, source: Source) -> Result<Self> {
        let database = target_database(schema, doc, source)?;

        let connection = DbConnection {
            host: with_fallback(schema, doc, source, DB_HOST)?,
            port: with_fallback(schema, doc, source, DB_PORT)?,
            user: with_fallback(schema, doc, source, DB_USER)?,
            password: Secret::new(with_fallback::<String>(
                schema,
                doc,
                source,
                DB_PASSWORD,
            )?),
            database,
        };

        let batch_size: NonZeroUsize = schema.get_resolved(doc, &source.key("batch_size"))?;

        let mut inputs = Vec::new();
        for field in source.path_fields() {
            let key = source.key(field);
            let path: PathBuf = schema.get_resolved(doc, &key)?;
            inputs.push(SourceInput {
                key,
                path,
                kind: source.input_kind(),
            });
        }

        info!(
            %source,
            target = %connection.display_url(),
            batch_size = batch_size.get(),
            inputs = inputs.len(),
            "resolved ingestion job"
        );

        Ok(Self {
            source,
            connection,
            batch_size,
            inputs,
        })
    }

    /// Check that every input exists. Only meaningful once the job is activated.
    pub fn check_inputs(&self, fs: &dyn FileSystem) -> Result<()> {
        for input in &self.inputs {
            match input.kind {
                InputKind::File => ensure(fs.is_file(&input.path), self.source, input, &input.path)?,
                InputKind::Directory { .. } => {
                    ensure(fs.is_dir(&input.path), self.source, input, &input.path)?;
                    for file in input.files() {
                        ensure(fs.is_file(&file), self.source, input, &file)?;
                    }
                }
            }
            debug!(source = %self.source, key = %input.key, path = ?input.path, "input present");
        }
        Ok(())
    }

    pub fn input_files(&self) -> Vec<PathBuf> {
        self.inputs.iter().flat_map(SourceInput::files).collect()
    }
}

fn ensure(present: bool, source: Source, input: &SourceInput, path: &Path) -> Result<()> {
    if present {
        Ok(())
    } else {
        Err(ConfigError::MissingInput {
            source_name: source.name().to_string(),
            key: input.key.clone(),
            path: path.to_path_buf(),
        })
    }
}

fn target_database(schema: &Schema, doc: &ConfigDocument, source: Source) -> Result<String> {
    let key = source.written_marker_key();
    let name: String = schema.get_resolved(doc, &key)?;
    if Constraint::DatabaseName
        .check(&ConfigValue::Str(name.clone()))
        .is_ok()
    {
        return Ok(name);
    }
    Err(ConfigError::TypeMismatch {
        key,
        expected: Constraint::DatabaseName.describe().to_string(),
        actual: format!("{name:?}"),
    })
}

/// `<source>.<field>` when present, else the global `<field>`.
fn with_fallback<T: FromConfigValue>(
    schema: &Schema,
    doc: &ConfigDocument,
    source: Source,
    field: &str,
) -> Result<T> {
    match schema.get_optional_resolved(doc, &source.key(field))? {
        Some(v) => Ok(v),
        None => schema.get_resolved(doc, field),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn doc() -> ConfigDocument {
        ConfigDocument::new()
            .with_value("db.host", "mysql.internal")
            .unwrap()
            .with_value("db.port", 3306)
            .unwrap()
            .with_value("db.user", "loader")
            .unwrap()
            .with_value("db.password", "s3cret")
            .unwrap()
            .with_value("-pharmgkb.database", "pharmgkb")
            .unwrap()
            .with_value("pharmgkb.path", "/data/pharmgkb")
            .unwrap()
            .with_value("pharmgkb.batch_size", 100)
            .unwrap()
            .with_value("-clinvar.database", "clinvar")
            .unwrap()
            .with_value("clinvar.batch_size", 1000)
            .unwrap()
            .with_value("clinvar.variant_summary_file", "/data/variant_summary.txt.gz")
            .unwrap()
            .with_value("clinvar.XML_FILE", "/data/ClinVarFullRelease.xml.gz")
            .unwrap()
            .with_value("clinvar.db.host", "clinvar-db.internal")
            .unwrap()
    }

    #[test]
    fn source_names_parse() {
        assert_eq!("PharmGKB".parse::<Source>(), Ok(Source::PharmGkb));
        assert_eq!("gtf".parse::<Source>(), Ok(Source::Gtf));
        assert!("ensembl".parse::<Source>().is_err());
        assert_eq!(Source::Clinvar.written_marker_key(), "-clinvar.database");
    }

    #[test]
    fn per_source_overrides_win_over_global_connection() {
        let schema = Schema::standard();
        let job = SourceJob::resolve(&schema, &doc(), Source::Clinvar).unwrap();
        assert_eq!(job.connection.host, "clinvar-db.internal");
        assert_eq!(job.connection.user, "loader");
        assert_eq!(job.connection.port.get(), 3306);
        assert_eq!(job.connection.database, "clinvar");
        assert_eq!(job.batch_size.get(), 1000);
        assert_eq!(job.inputs.len(), 2);
        assert_eq!(job.inputs[1].key, "clinvar.XML_FILE");

        let job = SourceJob::resolve(&schema, &doc(), Source::PharmGkb).unwrap();
        assert_eq!(job.connection.host, "mysql.internal");
    }

    #[test]
    fn undeclared_source_fails_on_marker() {
        let err = SourceJob::resolve(&Schema::standard(), &doc(), Source::Gtex).unwrap_err();
        match err {
            ConfigError::MissingKey { key } => assert_eq!(key, "-gtex.database"),
            other => panic!("expected MissingKey, got {other:?}"),
        }
    }

    #[test]
    fn placeholder_path_stops_the_job() {
        let d = doc().with_value("pharmgkb.path", "/?").unwrap();
        match SourceJob::resolve(&Schema::standard(), &d, Source::PharmGkb) {
            Err(ConfigError::Placeholder { key, .. }) => assert_eq!(key, "pharmgkb.path"),
            other => panic!("expected Placeholder, got {other:?}"),
        }
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let d = doc().with_value("pharmgkb.batch_size", 0).unwrap();
        match SourceJob::resolve(&Schema::standard(), &d, Source::PharmGkb) {
            Err(ConfigError::TypeMismatch { key, expected, .. }) => {
                assert_eq!(key, "pharmgkb.batch_size");
                assert_eq!(expected, "positive integer");
            }
            other => panic!("expected TypeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn password_is_not_in_debug_output() {
        let job = SourceJob::resolve(&Schema::standard(), &doc(), Source::PharmGkb).unwrap();
        let dbg = format!("{job:?}");
        assert!(!dbg.contains("s3cret"));
        assert_eq!(job.connection.password.expose(), "s3cret");
        assert_eq!(
            job.connection.display_url(),
            "mysql://loader@mysql.internal:3306/pharmgkb"
        );
    }

    #[test]
    fn pharmgkb_directory_must_hold_every_table() {
        let job = SourceJob::resolve(&Schema::standard(), &doc(), Source::PharmGkb).unwrap();
        let fs = MockFileSystem::new();
        for table in &PHARMGKB_TABLES[..5] {
            fs.add_file(Path::new("/data/pharmgkb").join(table), "header\n");
        }

        match job.check_inputs(&fs) {
            Err(ConfigError::MissingInput { source_name, key, path }) => {
                assert_eq!(source_name, "pharmgkb");
                assert_eq!(key, "pharmgkb.path");
                assert_eq!(path, PathBuf::from("/data/pharmgkb/var_pheno_ann.tsv"));
            }
            other => panic!("expected MissingInput, got {other:?}"),
        }

        fs.add_file("/data/pharmgkb/var_pheno_ann.tsv", "header\n");
        job.check_inputs(&fs).unwrap();
        assert_eq!(job.input_files().len(), PHARMGKB_TABLES.len());
    }
}
