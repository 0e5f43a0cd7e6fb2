// src/config/mod.rs

//! Configuration loading and validation for the ingestion jobs.
//!
//! Responsibilities:
//! - Scalar values and typed coercion (`value.rs`).
//! - The flat, immutable document and its `-` marker keys (`document.rs`).
//! - Placeholder (`?`) detection (`placeholder.rs`).
//! - Recognised keys, constraints and defaults (`schema.rs`).
//! - Reading JSON / TOML / environment sources (`loader.rs`).
//! - Batch validation reports (`validate.rs`).

pub mod document;
pub mod loader;
pub mod placeholder;
pub mod schema;
pub mod validate;
pub mod value;

pub use document::{ConfigDocument, DocumentBuilder, Entry};
pub use loader::{
    apply_env_overrides, default_config_path, load, load_and_validate, load_from_path,
    load_with_fs, ConfigSource, Format, LoadOptions,
};
pub use placeholder::{is_placeholder, resolve_placeholder, resolve_value};
pub use schema::{Constraint, KeySpec, Requirement, Schema};
pub use validate::{
    validate, validate_strict, ValidateOptions, ValidationReport, Violation, ViolationKind,
};
pub use value::{ConfigValue, FromConfigValue, Port};
