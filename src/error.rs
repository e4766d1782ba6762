//! Error types for modset

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for modset operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for modset
#[derive(Error, Debug)]
pub enum Error {
    // -------------------------------------------------------------------------
    // Write-side setting errors
    // -------------------------------------------------------------------------
    #[error("Unknown setting: {0}")]
    UnknownSetting(String),

    #[error("Setting '{0}' is locked")]
    LockedSetting(String),

    #[error("Validation failed for {key}: {message}")]
    Validation { key: String, message: String },

    #[error("Dependency cycle detected at {key}: {}", chain.join(" -> "))]
    DependencyCycle { key: String, chain: Vec<String> },

    // -------------------------------------------------------------------------
    // Schema errors
    // -------------------------------------------------------------------------
    #[error("Invalid setting definition for {key}: {reason}")]
    InvalidDefinition { key: String, reason: String },

    #[error("Invalid setting key '{0}': expected 'category.key'")]
    InvalidKey(String),

    #[error("Setting '{key}' is outside batch category '{category}'")]
    CategoryMismatch { key: String, category: String },

    // -------------------------------------------------------------------------
    // Store errors
    // -------------------------------------------------------------------------
    #[error("Value store error: {0}")]
    Store(String),

    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory '{path}': {source}")]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Serialization errors
    // -------------------------------------------------------------------------
    #[error("Failed to serialize data: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to parse settings: {0}")]
    Parse(String),

    // -------------------------------------------------------------------------
    // Configuration errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Shorthand for a validation failure on `key`
    pub(crate) fn validation(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Check if this is a "not found" type error
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::UnknownSetting(_))
    }

    /// Check if this error vetoed a write (cast failure, constraint or validator)
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// Check if this error came from the durable store
    #[must_use]
    pub fn is_store_error(&self) -> bool {
        matches!(
            self,
            Error::Store(_)
                | Error::FileRead { .. }
                | Error::FileWrite { .. }
                | Error::DirectoryCreate { .. }
        )
    }
}
