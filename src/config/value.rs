//! Setting values and the shared truthiness predicate

use serde::{Deserialize, Serialize};
use std::fmt;

/// A resolved or proposed setting value.
///
/// Values coming from forms or the value store arrive as text; they are cast
/// to the definition's type before they are cached or handed to validators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    #[default]
    Null,
    Bool(bool), // Must be before Int to avoid bool -> int coercion
    Int(i64),
    String(String),
}

impl SettingValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SettingValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SettingValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            SettingValue::Null => "null",
            SettingValue::Bool(_) => "boolean",
            SettingValue::Int(_) => "integer",
            SettingValue::String(_) => "string",
        }
    }

    /// Text form written to the value store (`Null` becomes the empty string)
    pub fn to_raw(&self) -> String {
        match self {
            SettingValue::Null => String::new(),
            SettingValue::Bool(b) => b.to_string(),
            SettingValue::Int(n) => n.to_string(),
            SettingValue::String(s) => s.clone(),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Null => f.write_str("null"),
            other => f.write_str(&other.to_raw()),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Bool(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        SettingValue::Int(value)
    }
}

impl From<i32> for SettingValue {
    fn from(value: i32) -> Self {
        SettingValue::Int(i64::from(value))
    }
}

impl From<u32> for SettingValue {
    fn from(value: u32) -> Self {
        SettingValue::Int(i64::from(value))
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::String(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        SettingValue::String(value)
    }
}

impl From<&String> for SettingValue {
    fn from(value: &String) -> Self {
        SettingValue::String(value.clone())
    }
}

impl<T: Into<SettingValue>> From<Option<T>> for SettingValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SettingValue::Null, Into::into)
    }
}

/// The one truthiness predicate used for enablement checks and boolean casts.
///
/// False for `Null`, `false`, `0`, blank strings and the strings `"false"` /
/// `"0"` (case-insensitive); true for everything else. Accepts either a value
/// reference or an `Option` of one, so `truthy(engine.get(key).as_ref())`
/// reads naturally.
///
/// # Example
///
/// ```
/// use modset::{truthy, SettingValue};
///
/// assert!(!truthy(&SettingValue::from("FALSE")));
/// assert!(!truthy(None::<&SettingValue>));
/// assert!(truthy(&SettingValue::from("yes")));
/// ```
pub fn truthy<'a>(value: impl Into<Option<&'a SettingValue>>) -> bool {
    match value.into() {
        None | Some(SettingValue::Null) => false,
        Some(SettingValue::Bool(b)) => *b,
        Some(SettingValue::Int(n)) => *n != 0,
        Some(SettingValue::String(s)) => {
            let s = s.trim();
            !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false"))
        }
    }
}
