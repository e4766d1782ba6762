//! Full setting keys (`category.key`)

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Separator between the category and the setting key
pub const SEPARATOR: char = '.';

/// A parsed `category.key` identifier.
///
/// Only the first separator is significant: the category is everything before
/// it and the key is everything after it, so keys like
/// `credentials.email_password.enabled` survive intact under the `auth`
/// category.
///
/// # Example
///
/// ```
/// use modset::FullKey;
///
/// let key = FullKey::parse("auth.credentials.email_password.enabled").unwrap();
/// assert_eq!(key.category(), "auth");
/// assert_eq!(key.key(), "credentials.email_password.enabled");
/// assert_eq!(key.to_string(), "auth.credentials.email_password.enabled");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FullKey {
    category: String,
    key: String,
}

impl FullKey {
    /// Build a full key from its two parts
    pub fn new(category: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            key: key.into(),
        }
    }

    /// Split `full_key` on its first separator.
    ///
    /// Returns `None` if there is no separator or either side is empty.
    pub fn parse(full_key: &str) -> Option<Self> {
        let (category, key) = full_key.split_once(SEPARATOR)?;
        if category.is_empty() || key.is_empty() {
            return None;
        }
        Some(Self::new(category, key))
    }

    /// The category (namespace root)
    pub fn category(&self) -> &str {
        &self.category
    }

    /// The key inside the category, never re-split
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for FullKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.category, self.key)
    }
}

impl FromStr for FullKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Error::InvalidKey(s.to_string()))
    }
}
