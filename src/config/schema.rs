//! Setting definitions and category schemas
//!
//! # Overview
//!
//! Each application module describes its settings as a [`Schema`]: one
//! category (the namespace root, e.g. `auth`) plus an ordered list of
//! [`Definition`]s. Definitions are typed (`string`, `integer`, `boolean`,
//! `enum`), carry a typed default, a display group and description, and may
//! declare a `depends_on` gate on another setting.
//!
//! ```rust
//! use modset::{Definition, EnumSource, Schema};
//!
//! let schema = Schema::new("auth")
//!     .setting(
//!         Definition::boolean("credentials.email_password.enabled", true)
//!             .group("Credentials")
//!             .description("Allow sign-in with email and password"),
//!     )?
//!     .setting(
//!         Definition::integer("credentials.email_password.min_length", 8)
//!             .group("Credentials")
//!             .min(6)
//!             .max(128)
//!             .depends_on("auth.credentials.email_password.enabled"),
//!     )?
//!     .setting(
//!         Definition::enumeration("session.store", "cookie", EnumSource::fixed(["cookie", "redis"]))
//!             .group("Sessions"),
//!     )?;
//!
//! assert_eq!(schema.keys().len(), 3);
//! assert!(schema.is_valid());
//! # Ok::<(), modset::Error>(())
//! ```
//!
//! # Enum sources
//!
//! An enum's allowed values come from an [`EnumSource`]: either a fixed list
//! or a provider closure evaluated every time the list is needed, so values
//! contributed by modules that load later are still picked up.

use super::key::FullKey;
use super::value::{SettingValue, truthy};
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;
use regex::Regex;
use std::borrow::Cow;
use std::sync::{Arc, OnceLock};

// =============================================================================
// Setting Types
// =============================================================================

/// Type of a setting value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingType {
    String,
    Integer,
    Boolean,
    Enum,
}

impl SettingType {
    pub fn name(&self) -> &'static str {
        match self {
            SettingType::String => "string",
            SettingType::Integer => "integer",
            SettingType::Boolean => "boolean",
            SettingType::Enum => "enum",
        }
    }
}

impl fmt::Display for SettingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SettingType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" => Ok(SettingType::String),
            "integer" | "int" => Ok(SettingType::Integer),
            "boolean" | "bool" => Ok(SettingType::Boolean),
            "enum" => Ok(SettingType::Enum),
            other => Err(Error::InvalidDefinition {
                key: String::new(),
                reason: format!("unsupported setting type '{other}'"),
            }),
        }
    }
}

// =============================================================================
// Enum Source
// =============================================================================

/// Provider closure producing the allowed values of an enum setting
pub type EnumProvider = Arc<dyn Fn() -> Vec<String> + Send + Sync>;

/// Where an enum setting gets its allowed values from
#[derive(Clone)]
pub enum EnumSource {
    /// A fixed, ordered list
    Static(Vec<String>),
    /// Evaluated at the point of use, never memoized
    Dynamic(EnumProvider),
}

impl EnumSource {
    /// Fixed list of allowed values
    pub fn fixed<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        EnumSource::Static(values.into_iter().map(Into::into).collect())
    }

    /// Lazily evaluated list of allowed values
    pub fn dynamic<F>(provider: F) -> Self
    where
        F: Fn() -> Vec<String> + Send + Sync + 'static,
    {
        EnumSource::Dynamic(Arc::new(provider))
    }

    /// The allowed values right now
    pub fn resolve(&self) -> Vec<String> {
        match self {
            EnumSource::Static(values) => values.clone(),
            EnumSource::Dynamic(provider) => provider(),
        }
    }
}

impl fmt::Debug for EnumSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumSource::Static(values) => f.debug_tuple("Static").field(values).finish(),
            EnumSource::Dynamic(_) => f.write_str("Dynamic(Fn)"),
        }
    }
}

// =============================================================================
// Definition
// =============================================================================

/// Static metadata for one setting.
///
/// `key` is relative to the owning schema's category and may itself contain
/// separators. `depends_on`, when set, is the *full* key of the (boolean
/// interpreted) setting that gates this one.
#[derive(Debug, Clone)]
pub struct Definition {
    pub key: String,
    pub setting_type: SettingType,
    pub default: SettingValue,
    /// Display grouping label, no effect on resolution
    pub group: String,
    pub description: String,
    pub depends_on: Option<String>,
    pub enum_source: Option<EnumSource>,
    /// Inclusive lower bound for integers
    pub min: Option<i64>,
    /// Inclusive upper bound for integers
    pub max: Option<i64>,
    /// Regex a string value must match
    pub pattern: Option<String>,
    /// `pattern` compiled on first use
    pattern_regex: OnceLock<Regex>,
}

impl Definition {
    /// Create a definition of any type.
    ///
    /// Prefer the typed constructors; this one exists for definitions built
    /// from text (see [`SettingType`]'s `FromStr`).
    pub fn new(key: impl Into<String>, setting_type: SettingType, default: impl Into<SettingValue>) -> Self {
        Self {
            key: key.into(),
            setting_type,
            default: default.into(),
            group: String::new(),
            description: String::new(),
            depends_on: None,
            enum_source: None,
            min: None,
            max: None,
            pattern: None,
            pattern_regex: OnceLock::new(),
        }
    }

    pub fn string(key: impl Into<String>, default: impl Into<String>) -> Self {
        Self::new(key, SettingType::String, SettingValue::String(default.into()))
    }

    pub fn integer(key: impl Into<String>, default: i64) -> Self {
        Self::new(key, SettingType::Integer, SettingValue::Int(default))
    }

    pub fn boolean(key: impl Into<String>, default: bool) -> Self {
        Self::new(key, SettingType::Boolean, SettingValue::Bool(default))
    }

    pub fn enumeration(key: impl Into<String>, default: impl Into<String>, source: EnumSource) -> Self {
        Self::new(key, SettingType::Enum, SettingValue::String(default.into())).enum_source(source)
    }

    // =========================================================================
    // Builder setters
    // =========================================================================

    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Gate this setting on the truthiness of another setting (full key)
    #[must_use]
    pub fn depends_on(mut self, full_key: impl Into<String>) -> Self {
        self.depends_on = Some(full_key.into());
        self
    }

    #[must_use]
    pub fn enum_source(mut self, source: EnumSource) -> Self {
        self.enum_source = Some(source);
        self
    }

    #[must_use]
    pub fn min(mut self, min: i64) -> Self {
        self.min = Some(min);
        self
    }

    #[must_use]
    pub fn max(mut self, max: i64) -> Self {
        self.max = Some(max);
        self
    }

    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self.pattern_regex = OnceLock::new();
        self
    }

    /// Allowed values for an enum setting, evaluated now
    pub fn enum_values(&self) -> Vec<String> {
        self.enum_source
            .as_ref()
            .map(EnumSource::resolve)
            .unwrap_or_default()
    }

    // =========================================================================
    // Casting
    // =========================================================================

    /// Cast a proposed value for writing.
    ///
    /// Booleans go through [`truthy`]; integers and strings parse directly and
    /// fall back to the default on unparsable input; enums must name one of
    /// the currently allowed values. Constraints are checked after the cast.
    pub fn cast_for_write(&self, raw: &SettingValue) -> std::result::Result<SettingValue, String> {
        let value = match self.setting_type {
            SettingType::Boolean => SettingValue::Bool(truthy(raw)),
            SettingType::Integer => SettingValue::Int(self.coerce_integer(raw)),
            SettingType::String => match raw {
                SettingValue::Null => self.default.clone(),
                other => SettingValue::String(other.to_raw()),
            },
            SettingType::Enum => {
                let candidate = raw.to_raw();
                let allowed = self.enum_values();
                if !allowed.iter().any(|v| *v == candidate) {
                    return Err(format!(
                        "'{candidate}' is not one of: {}",
                        allowed.join(", ")
                    ));
                }
                SettingValue::String(candidate)
            }
        };
        self.check_constraints(&value)?;
        Ok(value)
    }

    /// Cast a raw override read back from the value store.
    ///
    /// Never fails: stored enum values are returned as-is even if the allowed
    /// list has since changed.
    pub fn cast_stored(&self, raw: &str) -> SettingValue {
        match self.setting_type {
            SettingType::Boolean => SettingValue::Bool(truthy(&SettingValue::from(raw))),
            SettingType::Integer => raw
                .trim()
                .parse::<i64>()
                .map_or_else(|_| self.default.clone(), SettingValue::Int),
            SettingType::String | SettingType::Enum => SettingValue::String(raw.to_string()),
        }
    }

    /// Type-aware equality between a resolved and a proposed value
    pub fn same_value(&self, current: &SettingValue, proposed: &SettingValue) -> bool {
        match self.setting_type {
            SettingType::Boolean => truthy(current) == truthy(proposed),
            SettingType::Integer => self.coerce_integer(current) == self.coerce_integer(proposed),
            SettingType::String | SettingType::Enum => current.to_raw() == proposed.to_raw(),
        }
    }

    fn coerce_integer(&self, raw: &SettingValue) -> i64 {
        let parsed = match raw {
            SettingValue::Int(n) => Some(*n),
            SettingValue::String(s) => s.trim().parse::<i64>().ok(),
            SettingValue::Null | SettingValue::Bool(_) => None,
        };
        parsed
            .or_else(|| self.default.as_i64())
            .unwrap_or_default()
    }

    fn check_constraints(&self, value: &SettingValue) -> std::result::Result<(), String> {
        if let SettingValue::Int(n) = value {
            if let Some(min) = self.min {
                if *n < min {
                    return Err(format!("Value must be at least {min}"));
                }
            }
            if let Some(max) = self.max {
                if *n > max {
                    return Err(format!("Value must be at most {max}"));
                }
            }
        }
        if let (Some(pattern), SettingValue::String(text)) = (&self.pattern, value) {
            if !self.compiled_pattern(pattern)?.is_match(text) {
                return Err(format!("Value does not match pattern: {pattern}"));
            }
        }
        Ok(())
    }

    /// Regex for `pattern`, compiled once and reused while the text matches
    fn compiled_pattern(&self, pattern: &str) -> std::result::Result<Cow<'_, Regex>, String> {
        if let Some(re) = self.pattern_regex.get().filter(|re| re.as_str() == pattern) {
            return Ok(Cow::Borrowed(re));
        }
        let re = Regex::new(pattern).map_err(|e| format!("Invalid regex pattern: {e}"))?;
        match self.pattern_regex.set(re) {
            Ok(()) => self.compiled_pattern(pattern),
            // `pattern` was edited after the first compile
            Err(re) => Ok(Cow::Owned(re)),
        }
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Validate the definition itself as a member of `category`
    pub fn validate(&self, category: &str) -> std::result::Result<(), String> {
        if category.trim().is_empty() || category.contains(super::key::SEPARATOR) {
            return Err(format!("invalid category '{category}'"));
        }
        if self.key.trim().is_empty() {
            return Err("key must not be empty".to_string());
        }

        let expected = match self.setting_type {
            SettingType::Boolean => matches!(self.default, SettingValue::Bool(_)),
            SettingType::Integer => matches!(self.default, SettingValue::Int(_)),
            SettingType::String | SettingType::Enum => matches!(self.default, SettingValue::String(_)),
        };
        if !expected {
            return Err(format!(
                "default {} does not match type {}",
                self.default.type_name(),
                self.setting_type
            ));
        }

        if let Some(target) = &self.depends_on {
            let parsed = FullKey::parse(target)
                .ok_or_else(|| format!("depends_on '{target}' is not a full key"))?;
            if parsed.category() == category && parsed.key() == self.key {
                return Err("a setting cannot depend on itself".to_string());
            }
        }

        if self.setting_type == SettingType::Enum {
            match &self.enum_source {
                None => return Err("enum type must have an enum source".to_string()),
                Some(EnumSource::Static(values)) => {
                    let default = self.default.to_raw();
                    if !values.contains(&default) {
                        return Err(format!("default '{default}' is not an allowed value"));
                    }
                }
                // Providers may be populated by modules that load later
                Some(EnumSource::Dynamic(_)) => {}
            }
        }

        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(format!("min ({min}) cannot be greater than max ({max})"));
            }
        }
        if let Some(pattern) = &self.pattern {
            if pattern.is_empty() {
                return Err("Pattern cannot be empty string".to_string());
            }
            self.compiled_pattern(pattern)?;
        }

        self.check_constraints(&self.default)
            .map_err(|e| format!("Default value is invalid: {e}"))
    }
}

// =============================================================================
// Schema
// =============================================================================

/// Ordered, named collection of definitions under one category.
///
/// Built through the consuming [`Schema::setting`] builder and handed to a
/// [`crate::Registry`]; after that it only changes through registry merges.
#[derive(Debug, Clone)]
pub struct Schema {
    category: String,
    definitions: Vec<Arc<Definition>>,
}

impl Schema {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            definitions: Vec::new(),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Append a definition.
    ///
    /// # Errors
    ///
    /// `Error::InvalidDefinition` if the key is empty or already present, the
    /// default does not match the type, the definition depends on itself, or
    /// its constraints are malformed.
    pub fn setting(mut self, definition: Definition) -> Result<Self> {
        let full_key = format!("{}.{}", self.category, definition.key);
        definition
            .validate(&self.category)
            .map_err(|reason| Error::InvalidDefinition {
                key: full_key.clone(),
                reason,
            })?;
        if self.get(&definition.key).is_some() {
            return Err(Error::InvalidDefinition {
                key: full_key,
                reason: "key is already defined in this schema".to_string(),
            });
        }
        self.definitions.push(Arc::new(definition));
        Ok(self)
    }

    /// Re-validate every definition without raising
    pub fn is_valid(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        self.definitions.iter().all(|def| {
            let unique = seen.insert(def.key.as_str());
            if let Err(reason) = def.validate(&self.category) {
                log::debug!("Invalid definition {}.{}: {reason}", self.category, def.key);
                return false;
            }
            unique
        })
    }

    pub fn get(&self, key: &str) -> Option<&Arc<Definition>> {
        self.definitions.iter().find(|def| def.key == key)
    }

    pub fn definitions(&self) -> &[Arc<Definition>] {
        &self.definitions
    }

    /// Keys in registration order
    pub fn keys(&self) -> Vec<String> {
        self.definitions.iter().map(|def| def.key.clone()).collect()
    }

    /// `(key, default)` pairs in registration order
    pub fn defaults(&self) -> Vec<(String, SettingValue)> {
        self.definitions
            .iter()
            .map(|def| (def.key.clone(), def.default.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Merge `other` into this schema: same key replaces in place, new keys append
    pub(crate) fn merge(&mut self, other: Schema) {
        for def in other.definitions {
            match self.definitions.iter_mut().find(|d| d.key == def.key) {
                Some(existing) => *existing = def,
                None => self.definitions.push(def),
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
