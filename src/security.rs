//! File permission helpers for persisted settings
//!
//! Stored overrides can hold client ids, hostnames and similar operational
//! values, so the file store keeps them owner-only on Unix.

use crate::error::{Error, Result};
use std::path::Path;

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)
        .map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?
        .permissions();
    perms.set_mode(mode);

    fs::set_permissions(path, perms).map_err(|e| Error::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Restrict a file to its owner (Unix: 0o600)
///
/// # Errors
///
/// `Error::FileRead` / `Error::FileWrite` if the metadata cannot be read or
/// the mode cannot be applied.
#[cfg(unix)]
pub fn set_secure_file_permissions(path: &Path) -> Result<()> {
    set_mode(path, 0o600)
}

/// Restrict a directory to its owner (Unix: 0o700)
///
/// # Errors
///
/// Same as [`set_secure_file_permissions`].
#[cfg(unix)]
pub fn set_secure_dir_permissions(path: &Path) -> Result<()> {
    set_mode(path, 0o700)
}

/// No-op on Windows (permissions managed via ACLs)
#[cfg(not(unix))]
pub fn set_secure_file_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

/// No-op on Windows (permissions managed via ACLs)
#[cfg(not(unix))]
pub fn set_secure_dir_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

/// Create `path` (and parents) and restrict it to the owner
///
/// # Errors
///
/// `Error::DirectoryCreate` if the directory cannot be created.
pub fn ensure_secure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| Error::DirectoryCreate {
        path: path.to_path_buf(),
        source: e,
    })?;
    set_secure_dir_permissions(path)
}
