// src/errors.rs

//! Crate-wide error type.
//!
//! Every variant that concerns a single entry carries the key, so the
//! message tells an operator which line of the config to fix.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::validate::ValidationReport;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("malformed config in {origin}: {reason}")]
    Malformed { origin: String, reason: String },

    #[error("missing required key '{key}' (no value and no default registered)")]
    MissingKey { key: String },

    #[error("key '{key}': expected {expected}, got {actual}")]
    TypeMismatch {
        key: String,
        expected: String,
        actual: String,
    },

    #[error("key '{key}' still holds a placeholder and must be substituted: {source}")]
    Placeholder {
        key: String,
        #[source]
        source: PlaceholderError,
    },

    #[error("{0}")]
    SchemaViolation(ValidationReport),

    #[error("source '{source_name}': input for '{key}' not found at {path:?}")]
    MissingInput {
        source_name: String,
        key: String,
        path: PathBuf,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A value is a placeholder sentinel (`?`) and cannot be used as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("value {value:?} is a placeholder")]
pub struct PlaceholderError {
    pub value: String,
}

impl ConfigError {
    pub(crate) fn malformed(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Malformed {
            origin: origin.into(),
            reason: reason.into(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ConfigError>;
