//! On-disk formats for the file value store
//!
//! A [`FileStore`](crate::FileStore) keeps every override in one flat
//! [`RawMap`]: dotted full keys (`auth.session.timeout`) map to the canonical
//! text of their value. Keys are never split into nested tables, so a backend
//! only has to encode and decode a single string-to-string map. Reading and
//! the atomic replace-on-write are shared by every format.

use crate::error::{Error, Result};
use crate::security::{ensure_secure_dir, set_secure_file_permissions};
use std::collections::BTreeMap;
use std::path::Path;

/// Flat `full_key → text` map as persisted, sorted by key
pub type RawMap = BTreeMap<String, String>;

/// File format for the flat override map
pub trait StorageBackend: Clone + Send + Sync {
    /// File extension for this format (e.g., "json", "toml")
    fn extension(&self) -> &str;

    /// Render the map as file content
    fn encode(&self, values: &RawMap) -> Result<String>;

    /// Parse file content back into the map
    fn decode(&self, content: &str) -> Result<RawMap>;

    /// Load the map stored at `path`
    fn read(&self, path: &Path) -> Result<RawMap> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.decode(&content)
    }

    /// Replace the file at `path` with `values`.
    ///
    /// The content goes to a sibling `.tmp` file that is made owner-only and
    /// then renamed over the target, so readers see the old map or the new
    /// one and never a partial file. A missing parent directory is created
    /// owner-only as well.
    fn write(&self, path: &Path, values: &RawMap) -> Result<()> {
        let content = self.encode(values)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                ensure_secure_dir(parent)?;
            }
        }

        let file_name = path.file_name().ok_or_else(|| {
            Error::Config(format!(
                "Invalid path '{}': must have a filename",
                path.display()
            ))
        })?;
        let mut temp_name = file_name.to_os_string();
        temp_name.push(".tmp");
        let temp_path = path.with_file_name(temp_name);

        let staged = std::fs::write(&temp_path, &content)
            .map_err(|e| Error::FileWrite {
                path: temp_path.clone(),
                source: e,
            })
            .and_then(|()| set_secure_file_permissions(&temp_path))
            .and_then(|()| {
                std::fs::rename(&temp_path, path).map_err(|e| Error::FileWrite {
                    path: path.to_path_buf(),
                    source: e,
                })
            });

        if staged.is_err() {
            let _ = std::fs::remove_file(&temp_path);
        }
        staged
    }
}

// =============================================================================
// JSON Storage Implementation
// =============================================================================

/// JSON object with one member per override (default)
#[derive(Clone, Default)]
pub struct JsonStorage {
    pretty: bool,
}

impl JsonStorage {
    /// Pretty-printed, one override per line
    pub fn new() -> Self {
        Self { pretty: true }
    }

    /// Single-line JSON
    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl StorageBackend for JsonStorage {
    fn extension(&self) -> &str {
        "json"
    }

    fn encode(&self, values: &RawMap) -> Result<String> {
        let content = if self.pretty {
            serde_json::to_string_pretty(values)?
        } else {
            serde_json::to_string(values)?
        };
        Ok(content)
    }

    fn decode(&self, content: &str) -> Result<RawMap> {
        Ok(serde_json::from_str(content)?)
    }
}

// =============================================================================
// TOML Storage Implementation
// =============================================================================

/// TOML document of quoted dotted keys at the top level
#[cfg(feature = "toml")]
#[derive(Clone, Default)]
pub struct TomlStorage;

#[cfg(feature = "toml")]
impl TomlStorage {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "toml")]
impl StorageBackend for TomlStorage {
    fn extension(&self) -> &str {
        "toml"
    }

    fn encode(&self, values: &RawMap) -> Result<String> {
        toml::to_string_pretty(values).map_err(|e| Error::Parse(e.to_string()))
    }

    fn decode(&self, content: &str) -> Result<RawMap> {
        toml::from_str(content).map_err(|e| Error::Parse(e.to_string()))
    }
}

// =============================================================================
// YAML Storage Implementation
// =============================================================================

/// YAML mapping of full keys to strings
#[cfg(feature = "yaml")]
#[derive(Clone, Default)]
pub struct YamlStorage;

#[cfg(feature = "yaml")]
impl YamlStorage {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "yaml")]
impl StorageBackend for YamlStorage {
    fn extension(&self) -> &str {
        "yaml"
    }

    fn encode(&self, values: &RawMap) -> Result<String> {
        serde_yaml::to_string(values).map_err(|e| Error::Parse(e.to_string()))
    }

    fn decode(&self, content: &str) -> Result<RawMap> {
        serde_yaml::from_str(content).map_err(|e| Error::Parse(e.to_string()))
    }
}

// =============================================================================
// Tests
// =============================================================================
