// src/config/placeholder.rs

//! Detection of the `?` placeholder sentinel.
//!
//! Templates ship with `?` wherever an operator has to fill something in:
//! the whole value (`"?"`), a directory (`"/?"`, `"?/file.gct.gz"`) or a
//! file stem (`"?.txt.gz"`). None of those may reach a consumer.

use crate::config::value::ConfigValue;
use crate::errors::PlaceholderError;

pub const PLACEHOLDER: &str = "?";

/// True when `value` is, or contains, a placeholder path segment.
///
/// A segment counts only when it is exactly `?` or its stem is (`?.txt`);
/// a `?` inside a name such as `what?.txt` is part of the name.
pub fn is_placeholder(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed == PLACEHOLDER {
        return true;
    }
    trimmed
        .split(['/', '\\'])
        .any(segment_is_placeholder)
}

fn segment_is_placeholder(segment: &str) -> bool {
    let segment = segment.trim();
    if segment == PLACEHOLDER {
        return true;
    }
    // `?.xml.gz`: the stem before the first dot is the sentinel.
    matches!(segment.split_once('.'), Some((stem, _)) if stem == PLACEHOLDER)
}

/// Pass `value` through unless it is a placeholder.
pub fn resolve_placeholder(value: &str) -> Result<&str, PlaceholderError> {
    if is_placeholder(value) {
        Err(PlaceholderError {
            value: value.to_string(),
        })
    } else {
        Ok(value)
    }
}

/// Same as [`resolve_placeholder`] for a stored value. Integers never are.
pub fn resolve_value(value: &ConfigValue) -> Result<&ConfigValue, PlaceholderError> {
    match value {
        ConfigValue::Str(s) => resolve_placeholder(s).map(|_| value),
        ConfigValue::Int(_) => Ok(value),
    }
}
