// src/config/value.rs

use std::fmt;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A scalar stored in a config document.
///
/// The format only knows strings and integers. Serializes back to a JSON
/// string or number, so a document survives a save/load cycle unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Int(i64),
    Str(String),
}

impl ConfigValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Str(s) => Some(s),
            ConfigValue::Int(_) => None,
        }
    }

    /// Integer view; numeric strings (`"3306"`) coerce.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(i) => Some(*i),
            ConfigValue::Str(s) => s.trim().parse::<i64>().ok(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ConfigValue::Int(_) => "integer",
            ConfigValue::Str(_) => "string",
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Int(i) => write!(f, "{i}"),
            ConfigValue::Str(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::Str(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::Str(s)
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> Self {
        ConfigValue::Int(i)
    }
}

/// Types a stored value can be read as.
///
/// `EXPECTED` is what shows up in a `TypeMismatch` message.
pub trait FromConfigValue: Sized {
    const EXPECTED: &'static str;

    fn from_config_value(value: &ConfigValue) -> Option<Self>;
}

impl FromConfigValue for String {
    const EXPECTED: &'static str = "string";

    fn from_config_value(value: &ConfigValue) -> Option<Self> {
        match value {
            ConfigValue::Str(s) => Some(s.clone()),
            ConfigValue::Int(i) => Some(i.to_string()),
        }
    }
}

impl FromConfigValue for PathBuf {
    const EXPECTED: &'static str = "path";

    fn from_config_value(value: &ConfigValue) -> Option<Self> {
        match value {
            ConfigValue::Str(s) if !s.trim().is_empty() => Some(PathBuf::from(s)),
            ConfigValue::Str(_) => None,
            ConfigValue::Int(i) => Some(PathBuf::from(i.to_string())),
        }
    }
}

impl FromConfigValue for i64 {
    const EXPECTED: &'static str = "integer";

    fn from_config_value(value: &ConfigValue) -> Option<Self> {
        value.as_integer()
    }
}

macro_rules! impl_from_config_value_int {
    ($($ty:ty => $expected:literal),* $(,)?) => {
        $(
            impl FromConfigValue for $ty {
                const EXPECTED: &'static str = $expected;

                fn from_config_value(value: &ConfigValue) -> Option<Self> {
                    value.as_integer().and_then(|i| <$ty>::try_from(i).ok())
                }
            }
        )*
    };
}

impl_from_config_value_int! {
    u16 => "integer in 0..=65535",
    u32 => "non-negative 32-bit integer",
    u64 => "non-negative integer",
    usize => "non-negative integer",
}

impl FromConfigValue for NonZeroUsize {
    const EXPECTED: &'static str = "positive integer";

    fn from_config_value(value: &ConfigValue) -> Option<Self> {
        usize::from_config_value(value).and_then(NonZeroUsize::new)
    }
}

/// A TCP port number, 1..=65535.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Port(u16);

impl Port {
    pub fn new(port: u16) -> Option<Self> {
        (port != 0).then_some(Port(port))
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromConfigValue for Port {
    const EXPECTED: &'static str = "TCP port (integer 1..=65535)";

    fn from_config_value(value: &ConfigValue) -> Option<Self> {
        u16::from_config_value(value).and_then(Port::new)
    }
}
