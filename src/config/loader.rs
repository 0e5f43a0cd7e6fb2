// src/config/loader.rs

use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::document::{ConfigDocument, DocumentBuilder};
use crate::config::schema::{Constraint, Schema};
use crate::config::validate::{validate, ValidateOptions};
use crate::config::value::ConfigValue;
use crate::errors::{ConfigError, Result};
use crate::fs::{FileSystem, RealFileSystem};

/// Prefix for environment overrides unless told otherwise.
pub const DEFAULT_ENV_PREFIX: &str = "INGEST";

/// Where a document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// A file on disk; the format follows the extension.
    File(PathBuf),
    Json(String),
    Toml(String),
    /// Only the `<prefix>_*` environment variables that map to known keys.
    Env { prefix: String },
}

impl ConfigSource {
    /// Short label for logs; never includes inline document text.
    pub fn describe(&self) -> String {
        match self {
            ConfigSource::File(path) => path.display().to_string(),
            ConfigSource::Json(_) => "<json>".to_string(),
            ConfigSource::Toml(_) => "<toml>".to_string(),
            ConfigSource::Env { prefix } => format!("env:{prefix}_*"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Toml,
}

impl Format {
    /// `.toml` is TOML; `.json`, the legacy `.js` template name, and
    /// anything else are read as JSON.
    pub fn from_path(path: &Path) -> Format {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("toml") => Format::Toml,
            _ => Format::Json,
        }
    }
}

/// Load options for [`load_and_validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    pub validate: ValidateOptions,
    /// Apply `<prefix>_*` environment overrides. `None` disables them.
    pub env_prefix: Option<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            validate: ValidateOptions::default(),
            env_prefix: Some(DEFAULT_ENV_PREFIX.to_string()),
        }
    }
}

/// Load a document from `source` using the real filesystem and environment.
///
/// This only parses; it does **not** validate. Use [`load_and_validate`]
/// for that.
pub fn load(source: &ConfigSource) -> Result<ConfigDocument> {
    load_with_fs(source, &Schema::standard(), &RealFileSystem)
}

/// Like [`load`], reading files through `fs`. `schema` is only consulted
/// for [`ConfigSource::Env`].
pub fn load_with_fs(
    source: &ConfigSource,
    schema: &Schema,
    fs: &dyn FileSystem,
) -> Result<ConfigDocument> {
    let doc = match source {
        ConfigSource::File(path) => {
            let contents = fs.read_to_string(path)?;
            parse_str(&contents, Format::from_path(path), &path.display().to_string())?
        }
        ConfigSource::Json(text) => parse_json(text, "<json>")?,
        ConfigSource::Toml(text) => parse_toml(text, "<toml>")?,
        ConfigSource::Env { prefix } => from_env_vars(schema, prefix, std::env::vars())?,
    };
    debug!(origin = %source.describe(), entries = doc.len(), "loaded configuration");
    Ok(doc)
}

/// Load a document from a file path.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ConfigDocument> {
    load(&ConfigSource::File(path.as_ref().to_path_buf()))
}

/// Load, apply environment overrides and validate.
///
/// This is the entry point for ingestion jobs: anything wrong with the
/// config surfaces here, at startup, as one `SchemaViolation` listing
/// every problem.
pub fn load_and_validate(
    path: impl AsRef<Path>,
    schema: &Schema,
    options: &LoadOptions,
) -> Result<ConfigDocument> {
    let doc = load_with_fs(
        &ConfigSource::File(path.as_ref().to_path_buf()),
        schema,
        &RealFileSystem,
    )?;
    finalize(schema, doc, options, std::env::vars())
}

/// Apply the environment overlay from `vars` (when enabled) and validate.
pub fn finalize<I>(
    schema: &Schema,
    doc: ConfigDocument,
    options: &LoadOptions,
    vars: I,
) -> Result<ConfigDocument>
where
    I: IntoIterator<Item = (String, String)>,
{
    let doc = match &options.env_prefix {
        Some(prefix) => apply_env_overrides(schema, &doc, prefix, vars)?,
        None => doc,
    };
    validate(schema, &doc, options.validate).into_result()?;
    Ok(doc)
}

/// Where the CLI looks when no path is given.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("ingest.json")
}

pub fn parse_str(text: &str, format: Format, origin: &str) -> Result<ConfigDocument> {
    match format {
        Format::Json => parse_json(text, origin),
        Format::Toml => parse_toml(text, origin),
    }
}

/// Parse a flat JSON object of string and integer values.
pub fn parse_json(text: &str, origin: &str) -> Result<ConfigDocument> {
    let mut de = serde_json::Deserializer::from_str(text);
    let entries = FlatEntries::deserialize(&mut de)
        .map_err(|e| ConfigError::malformed(origin, e.to_string()))?;
    de.end()
        .map_err(|e| ConfigError::malformed(origin, e.to_string()))?;

    let mut builder = DocumentBuilder::new(origin);
    for (key, value) in entries.0 {
        builder.insert(&key, value)?;
    }
    Ok(builder.finish())
}

/// Parse TOML. Tables flatten onto dotted keys, so `[db] host = "x"` and
/// `"db.host" = "x"` mean the same (and may not both appear).
pub fn parse_toml(text: &str, origin: &str) -> Result<ConfigDocument> {
    let table: toml::Table =
        toml::from_str(text).map_err(|e| ConfigError::malformed(origin, e.to_string()))?;

    let mut builder = DocumentBuilder::new(origin);
    flatten_toml(&mut builder, None, &table)?;
    Ok(builder.finish())
}

fn flatten_toml(builder: &mut DocumentBuilder, prefix: Option<&str>, table: &toml::Table) -> Result<()> {
    for (name, value) in table {
        let key = match prefix {
            Some(p) => format!("{p}.{name}"),
            None => name.clone(),
        };
        let scalar = match value {
            toml::Value::String(s) => ConfigValue::Str(s.clone()),
            toml::Value::Integer(i) => ConfigValue::Int(*i),
            toml::Value::Table(inner) => {
                flatten_toml(builder, Some(&key), inner)?;
                continue;
            }
            other => {
                return Err(ConfigError::malformed(
                    builder.origin(),
                    format!(
                        "key '{key}': {} values are not supported, expected string or integer",
                        other.type_str()
                    ),
                ));
            }
        };
        builder.insert(&key, scalar)?;
    }
    Ok(())
}

/// Environment variable that overrides `key`: `INGEST_DB_HOST`,
/// `INGEST_CLINVAR_XML_FILE`, `INGEST_GTEX_DATABASE`.
pub fn env_var_name(prefix: &str, key: &str) -> String {
    let (key, _) = crate::config::document::normalize_key(key);
    let mut name = String::with_capacity(prefix.len() + key.len() + 1);
    name.push_str(prefix);
    name.push('_');
    for c in key.chars() {
        match c {
            '.' | '-' => name.push('_'),
            c => name.push(c.to_ascii_uppercase()),
        }
    }
    name
}

/// Return a copy of `doc` with every schema key that has a matching
/// environment variable replaced.
pub fn apply_env_overrides<I>(
    schema: &Schema,
    doc: &ConfigDocument,
    prefix: &str,
    vars: I,
) -> Result<ConfigDocument>
where
    I: IntoIterator<Item = (String, String)>,
{
    let vars: std::collections::HashMap<String, String> = vars.into_iter().collect();
    let mut next = doc.clone();
    let mut applied = 0usize;

    for spec in schema.specs() {
        let Some(raw) = vars.get(&env_var_name(prefix, &spec.key)) else {
            continue;
        };
        let value = env_value(spec.constraint, raw);
        let written = if spec.marker && !doc.contains(&spec.key) {
            format!("{}{}", crate::config::document::MARKER_PREFIX, spec.key)
        } else {
            spec.key.clone()
        };
        next = next.with_value(&written, value)?;
        applied += 1;
        debug!(key = %spec.key, "applied environment override");
    }

    if applied > 0 {
        info!(applied, prefix, "applied environment overrides");
    }
    Ok(next)
}

/// Build a document purely from environment variables.
pub fn from_env_vars<I>(schema: &Schema, prefix: &str, vars: I) -> Result<ConfigDocument>
where
    I: IntoIterator<Item = (String, String)>,
{
    apply_env_overrides(schema, &ConfigDocument::new(), prefix, vars)
}

/// Turn operator-supplied text (environment, `--set`) into a value,
/// keeping numeric keys numeric.
pub fn value_from_text(schema: &Schema, key: &str, raw: &str) -> ConfigValue {
    match schema.spec(key) {
        Some(spec) => env_value(spec.constraint, raw),
        None => ConfigValue::Str(raw.to_string()),
    }
}

fn env_value(constraint: Constraint, raw: &str) -> ConfigValue {
    match constraint {
        Constraint::Port | Constraint::PositiveInteger => match raw.trim().parse::<i64>() {
            Ok(i) => ConfigValue::Int(i),
            Err(_) => ConfigValue::Str(raw.to_string()),
        },
        _ => ConfigValue::Str(raw.to_string()),
    }
}

/// Entries of a flat object, in source order, duplicates kept so the
/// builder can reject them.
struct FlatEntries(Vec<(String, ConfigValue)>);

impl<'de> Deserialize<'de> for FlatEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(FlatVisitor)
    }
}

struct FlatVisitor;

impl<'de> Visitor<'de> for FlatVisitor {
    type Value = FlatEntries;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a flat object of string keys to string or integer values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
        let mut entries = Vec::new();
        while let Some(key) = map.next_key::<String>()? {
            let value = map.next_value_seed(ScalarSeed { key: &key })?;
            entries.push((key, value));
        }
        Ok(FlatEntries(entries))
    }
}

struct ScalarSeed<'a> {
    key: &'a str,
}

impl<'de> DeserializeSeed<'de> for ScalarSeed<'_> {
    type Value = ConfigValue;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<Self::Value, D::Error> {
        deserializer.deserialize_any(ScalarVisitor { key: self.key })
    }
}

struct ScalarVisitor<'a> {
    key: &'a str,
}

impl ScalarVisitor<'_> {
    fn unsupported<E: de::Error>(&self, what: &str) -> E {
        E::custom(format!(
            "key '{}': {what} values are not supported, expected string or integer",
            self.key
        ))
    }
}

impl<'de> Visitor<'de> for ScalarVisitor<'_> {
    type Value = ConfigValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a string or integer for key '{}'", self.key)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
        Ok(ConfigValue::Str(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<Self::Value, E> {
        Ok(ConfigValue::Str(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Self::Value, E> {
        Ok(ConfigValue::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Self::Value, E> {
        i64::try_from(v)
            .map(ConfigValue::Int)
            .map_err(|_| E::custom(format!("key '{}': integer {v} is out of range", self.key)))
    }

    fn visit_bool<E: de::Error>(self, _v: bool) -> std::result::Result<Self::Value, E> {
        Err(self.unsupported("boolean"))
    }

    fn visit_f64<E: de::Error>(self, _v: f64) -> std::result::Result<Self::Value, E> {
        Err(self.unsupported("float"))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Err(self.unsupported("null"))
    }

    fn visit_seq<A: de::SeqAccess<'de>>(self, _seq: A) -> std::result::Result<Self::Value, A::Error> {
        Err(self.unsupported("array"))
    }

    fn visit_map<A: MapAccess<'de>>(self, _map: A) -> std::result::Result<Self::Value, A::Error> {
        Err(self.unsupported("nested object"))
    }
}
