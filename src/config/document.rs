// src/config/document.rs

use std::collections::{BTreeMap, BTreeSet};

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::config::value::ConfigValue;
use crate::errors::{ConfigError, Result};

/// Leading character that turns a key into a namespace marker.
pub const MARKER_PREFIX: char = '-';

/// One stored value.
///
/// `marker` is set when the key was written with a leading `-`
/// (`-gtex.database`). The dash itself is not part of the stored key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub value: ConfigValue,
    pub marker: bool,
}

/// Split a written key into its stored form and marker flag.
pub fn normalize_key(key: &str) -> (&str, bool) {
    match key.strip_prefix(MARKER_PREFIX) {
        Some(rest) => (rest, true),
        None => (key, false),
    }
}

/// Namespace of a stored key: everything before the first dot.
///
/// Keys without a dot (`database`) belong to no namespace.
pub fn namespace_of(key: &str) -> Option<&str> {
    key.split_once('.').map(|(ns, _)| ns)
}

/// Origin reported for keys rejected by [`ConfigDocument::with_value`].
const SUBSTITUTION_ORIGIN: &str = "substitution";

/// Normalize a written key, rejecting ones that could not be parsed back:
/// empty keys and keys with an empty dot-separated segment.
pub fn check_key<'k>(origin: &str, key: &'k str) -> Result<(&'k str, bool)> {
    let (stored, marker) = normalize_key(key);
    if stored.trim().is_empty() {
        return Err(ConfigError::malformed(origin, format!("empty key {key:?}")));
    }
    if stored.split('.').any(|segment| segment.is_empty()) {
        return Err(ConfigError::malformed(
            origin,
            format!("key {key:?} has an empty namespace segment"),
        ));
    }
    Ok((stored, marker))
}

/// A loaded configuration: a flat, ordered map of dotted keys to scalars.
///
/// Immutable once built. Substitutions go through [`ConfigDocument::with_value`],
/// which returns a new document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigDocument {
    entries: BTreeMap<String, Entry>,
}

impl ConfigDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key. Accepts both `-x.database` and `x.database`.
    pub fn get_raw(&self, key: &str) -> Option<&ConfigValue> {
        self.entry(key).map(|e| &e.value)
    }

    pub fn entry(&self, key: &str) -> Option<&Entry> {
        let (key, _) = normalize_key(key);
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entry(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct namespaces used by the document, in sorted order.
    pub fn namespaces(&self) -> BTreeSet<&str> {
        self.keys().filter_map(namespace_of).collect()
    }

    /// Keys that were written with the `-` marker prefix.
    pub fn markers(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.iter()
            .filter(|(_, e)| e.marker)
            .map(|(k, e)| (k, &e.value))
    }

    /// Return a copy with `key` set to `value`.
    ///
    /// An existing entry keeps its marker flag; a new key written as `-x`
    /// becomes a marker. The key is held to the same rules as a parsed
    /// one, so the result can always be written out and read back.
    pub fn with_value(&self, key: &str, value: impl Into<ConfigValue>) -> Result<ConfigDocument> {
        let (stored, marker) = check_key(SUBSTITUTION_ORIGIN, key)?;
        let mut next = self.clone();
        let marker = next
            .entries
            .get(stored)
            .map(|e| e.marker)
            .unwrap_or(marker);
        next.entries.insert(
            stored.to_string(),
            Entry {
                value: value.into(),
                marker,
            },
        );
        Ok(next)
    }

    /// Pretty JSON, markers written back with their `-` prefix.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Other(anyhow::anyhow!("serializing config as JSON: {e}")))
    }

    /// TOML with quoted dotted keys, e.g. `"db.host" = "localhost"`.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self)
            .map_err(|e| ConfigError::Other(anyhow::anyhow!("serializing config as TOML: {e}")))
    }

    fn written_key(key: &str, entry: &Entry) -> String {
        if entry.marker {
            format!("{MARKER_PREFIX}{key}")
        } else {
            key.to_string()
        }
    }
}

impl Serialize for ConfigDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, entry) in &self.entries {
            map.serialize_entry(&Self::written_key(key, entry), &entry.value)?;
        }
        map.end()
    }
}

/// Accumulates entries while a source is parsed, enforcing key uniqueness.
#[derive(Debug)]
pub struct DocumentBuilder {
    origin: String,
    entries: BTreeMap<String, Entry>,
}

impl DocumentBuilder {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            entries: BTreeMap::new(),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn insert(&mut self, key: &str, value: ConfigValue) -> Result<()> {
        let (stored, marker) = check_key(&self.origin, key)?;
        if let Some(existing) = self.entries.get(stored) {
            let first = ConfigDocument::written_key(stored, existing);
            return Err(ConfigError::malformed(
                &self.origin,
                format!("duplicate key '{key}' (already defined as '{first}')"),
            ));
        }
        self.entries
            .insert(stored.to_string(), Entry { value, marker });
        Ok(())
    }

    pub fn finish(self) -> ConfigDocument {
        ConfigDocument {
            entries: self.entries,
        }
    }
}
