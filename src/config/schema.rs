// src/config/schema.rs

//! The set of recognised keys, their constraints and defaults.
//!
//! Layout of a standard ingestion config:
//!
//! ```json
//! {
//!     "db.host": "mysql.internal",
//!     "db.port": 3306,
//!     "db.user": "loader",
//!     "db.password": "secret",
//!     "database": "forome",
//!
//!     "-gtex.database": "gtex",
//!     "gtex.batch_size": 10000,
//!     "gtex.filename": "/data/gtex/gene_median_tpm.gct.gz"
//! }
//! ```
//!
//! Each source may also override the connection with `<source>.db.host`,
//! `<source>.db.port`, `<source>.db.user` and `<source>.db.password`.

use std::collections::BTreeMap;

use crate::config::document::ConfigDocument;
use crate::config::placeholder::is_placeholder;
use crate::config::value::{ConfigValue, FromConfigValue};
use crate::errors::{ConfigError, PlaceholderError, Result};
use crate::sources::Source;

pub const DB_HOST: &str = "db.host";
pub const DB_PORT: &str = "db.port";
pub const DB_USER: &str = "db.user";
pub const DB_PASSWORD: &str = "db.password";
pub const DATABASE: &str = "database";

const REDACTED: &str = "<redacted>";

/// What a value must look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    NonEmptyString,
    Port,
    PositiveInteger,
    Path,
    DatabaseName,
}

/// Why a value failed its constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckFailure {
    /// Wrong type altogether (text where an integer belongs).
    Type,
    /// Right type, value out of bounds.
    Bounds,
    Placeholder,
}

impl Constraint {
    pub fn describe(self) -> &'static str {
        match self {
            Constraint::NonEmptyString => "non-empty string",
            Constraint::Port => "TCP port (integer 1..=65535)",
            Constraint::PositiveInteger => "positive integer",
            Constraint::Path => "filesystem path",
            Constraint::DatabaseName => {
                "database name (non-empty, no whitespace, '.', '/' or '\\')"
            }
        }
    }

    pub fn check(self, value: &ConfigValue) -> std::result::Result<(), CheckFailure> {
        if let ConfigValue::Str(s) = value {
            if is_placeholder(s) {
                return Err(CheckFailure::Placeholder);
            }
        }

        match self {
            Constraint::Port => {
                let port = value.as_integer().ok_or(CheckFailure::Type)?;
                if (1..=65535).contains(&port) {
                    Ok(())
                } else {
                    Err(CheckFailure::Bounds)
                }
            }
            Constraint::PositiveInteger => {
                let n = value.as_integer().ok_or(CheckFailure::Type)?;
                if n > 0 { Ok(()) } else { Err(CheckFailure::Bounds) }
            }
            Constraint::NonEmptyString => {
                let s = String::from_config_value(value).ok_or(CheckFailure::Type)?;
                if s.trim().is_empty() {
                    Err(CheckFailure::Bounds)
                } else {
                    Ok(())
                }
            }
            Constraint::Path => {
                let s = value.as_str().ok_or(CheckFailure::Type)?;
                if s.trim().is_empty() {
                    Err(CheckFailure::Bounds)
                } else {
                    Ok(())
                }
            }
            Constraint::DatabaseName => {
                let s = value.as_str().ok_or(CheckFailure::Type)?;
                let bad = s.is_empty()
                    || s.chars()
                        .any(|c| c.is_whitespace() || matches!(c, '.' | '/' | '\\'));
                if bad { Err(CheckFailure::Bounds) } else { Ok(()) }
            }
        }
    }
}

/// When a key has to be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Required,
    Optional,
    /// Required once the source's marker key is present.
    WhenDeclared(Source),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpec {
    pub key: String,
    pub constraint: Constraint,
    pub requirement: Requirement,
    pub default: Option<ConfigValue>,
    pub secret: bool,
    /// The key is a namespace marker and may carry the `-` prefix.
    pub marker: bool,
}

impl KeySpec {
    pub fn new(key: impl Into<String>, constraint: Constraint, requirement: Requirement) -> Self {
        Self {
            key: key.into(),
            constraint,
            requirement,
            default: None,
            secret: false,
            marker: false,
        }
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    pub fn marker(mut self) -> Self {
        self.marker = true;
        self
    }

    /// Render a stored value for an error message, hiding secrets.
    pub fn display_value(&self, value: &ConfigValue) -> String {
        render_value(self.secret, value)
    }
}

pub(crate) fn render_value(secret: bool, value: &ConfigValue) -> String {
    match value {
        ConfigValue::Str(s) if secret && !is_placeholder(s) => REDACTED.to_string(),
        other => other.to_string(),
    }
}

/// Registry of recognised keys.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    specs: Vec<KeySpec>,
    index: BTreeMap<String, usize>,
}

impl Schema {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Keys understood by the ingestion jobs.
    pub fn standard() -> Self {
        let mut schema = Schema::empty();

        schema.register(KeySpec::new(DB_HOST, Constraint::NonEmptyString, Requirement::Required));
        schema.register(KeySpec::new(DB_PORT, Constraint::Port, Requirement::Required));
        schema.register(KeySpec::new(DB_USER, Constraint::NonEmptyString, Requirement::Required));
        schema.register(
            KeySpec::new(DB_PASSWORD, Constraint::NonEmptyString, Requirement::Required).secret(),
        );
        schema.register(KeySpec::new(DATABASE, Constraint::DatabaseName, Requirement::Optional));

        for source in Source::ALL {
            let when = Requirement::WhenDeclared(source);
            schema.register(
                KeySpec::new(source.marker_key(), Constraint::DatabaseName, when).marker(),
            );
            schema.register(KeySpec::new(
                source.key("batch_size"),
                Constraint::PositiveInteger,
                when,
            ));
            for field in source.path_fields() {
                schema.register(KeySpec::new(source.key(field), Constraint::Path, when));
            }

            let opt = Requirement::Optional;
            schema.register(KeySpec::new(source.key(DB_HOST), Constraint::NonEmptyString, opt));
            schema.register(KeySpec::new(source.key(DB_PORT), Constraint::Port, opt));
            schema.register(KeySpec::new(source.key(DB_USER), Constraint::NonEmptyString, opt));
            schema.register(
                KeySpec::new(source.key(DB_PASSWORD), Constraint::NonEmptyString, opt).secret(),
            );
        }

        schema
    }

    /// Add or replace a key specification.
    pub fn register(&mut self, spec: KeySpec) {
        match self.index.get(&spec.key) {
            Some(&i) => self.specs[i] = spec,
            None => {
                self.index.insert(spec.key.clone(), self.specs.len());
                self.specs.push(spec);
            }
        }
    }

    /// Register a default for `key`, which must already be known.
    pub fn with_default(mut self, key: &str, value: impl Into<ConfigValue>) -> Result<Self> {
        let i = *self.index.get(key).ok_or_else(|| {
            ConfigError::Other(anyhow::anyhow!("cannot set default for unknown key '{key}'"))
        })?;
        self.specs[i].default = Some(value.into());
        Ok(self)
    }

    pub fn spec(&self, key: &str) -> Option<&KeySpec> {
        let (key, _) = crate::config::document::normalize_key(key);
        self.index.get(key).map(|&i| &self.specs[i])
    }

    pub fn is_known(&self, key: &str) -> bool {
        self.spec(key).is_some()
    }

    /// Specifications in declaration order.
    pub fn specs(&self) -> impl Iterator<Item = &KeySpec> {
        self.specs.iter()
    }

    /// Whether the document declares `source` through its marker key.
    pub fn is_declared(&self, doc: &ConfigDocument, source: Source) -> bool {
        doc.contains(&source.marker_key())
    }

    /// Stored value, or the registered default.
    pub fn lookup<'a>(&'a self, doc: &'a ConfigDocument, key: &str) -> Option<&'a ConfigValue> {
        doc.get_raw(key)
            .or_else(|| self.spec(key).and_then(|s| s.default.as_ref()))
    }

    /// Typed accessor.
    ///
    /// Fails with `MissingKey` when the key is absent and has no default,
    /// and with `TypeMismatch` when the value cannot be read as `T`.
    pub fn get<T: FromConfigValue>(&self, doc: &ConfigDocument, key: &str) -> Result<T> {
        match self.get_optional(doc, key)? {
            Some(v) => Ok(v),
            None => Err(ConfigError::MissingKey {
                key: key.to_string(),
            }),
        }
    }

    /// Like [`Schema::get`], but an absent key is `Ok(None)`.
    pub fn get_optional<T: FromConfigValue>(
        &self,
        doc: &ConfigDocument,
        key: &str,
    ) -> Result<Option<T>> {
        let Some(value) = self.lookup(doc, key) else {
            return Ok(None);
        };
        match T::from_config_value(value) {
            Some(v) => Ok(Some(v)),
            None => Err(ConfigError::TypeMismatch {
                key: key.to_string(),
                expected: T::EXPECTED.to_string(),
                actual: self.render(key, value),
            }),
        }
    }

    /// Like [`Schema::get`], but a placeholder value is an error.
    pub fn get_resolved<T: FromConfigValue>(&self, doc: &ConfigDocument, key: &str) -> Result<T> {
        self.ensure_resolved(doc, key)?;
        self.get(doc, key)
    }

    /// Like [`Schema::get_optional`], but a placeholder value is an error.
    pub fn get_optional_resolved<T: FromConfigValue>(
        &self,
        doc: &ConfigDocument,
        key: &str,
    ) -> Result<Option<T>> {
        self.ensure_resolved(doc, key)?;
        self.get_optional(doc, key)
    }

    fn ensure_resolved(&self, doc: &ConfigDocument, key: &str) -> Result<()> {
        if let Some(ConfigValue::Str(s)) = self.lookup(doc, key) {
            if is_placeholder(s) {
                return Err(ConfigError::Placeholder {
                    key: key.to_string(),
                    source: PlaceholderError { value: s.clone() },
                });
            }
        }
        Ok(())
    }

    fn render(&self, key: &str, value: &ConfigValue) -> String {
        let secret = self.spec(key).map(|s| s.secret).unwrap_or(false);
        render_value(secret, value)
    }
}
