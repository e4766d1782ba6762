//! File-backed value store

use super::ValueStore;
use super::gate::TransactionGate;
use crate::error::Result;
use crate::storage::{JsonStorage, RawMap, StorageBackend};
use crate::sync::{MutexExt, RwLockExt};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

/// [`ValueStore`] persisting a flat `full_key → text` map to one file.
///
/// Every write outside a transaction rewrites the file atomically. Inside a
/// transaction the owning thread's writes stay in memory and the file is
/// written once on commit; other threads wait for the commit or rollback.
///
/// # Example
///
/// ```no_run
/// use modset::{FileStore, ValueStore};
///
/// let store = FileStore::open("~/.config/myapp/settings.json")?;
/// store.set_raw("ui.theme", "dark")?;
/// # Ok::<(), modset::Error>(())
/// ```
pub struct FileStore<S: StorageBackend = JsonStorage> {
    path: PathBuf,
    storage: S,
    values: RwLock<RawMap>,
    /// Map as it was when the open transaction started
    snapshot: Mutex<Option<RawMap>>,
    gate: TransactionGate,
}

impl FileStore<JsonStorage> {
    /// Open (or lazily create) a pretty-printed JSON store at `path`
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or parsed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_storage(path, JsonStorage::new())
    }
}

impl<S: StorageBackend> FileStore<S> {
    /// Open a store at `path` using a specific storage format.
    ///
    /// A leading `~` expands to the user's home directory. A missing file is
    /// an empty store; it is created on the first write.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or parsed.
    pub fn with_storage(path: impl AsRef<Path>, storage: S) -> Result<Self> {
        let path = expand_home(path.as_ref());
        let values = if path.exists() {
            storage.read(&path)?
        } else {
            RawMap::new()
        };
        info!(
            "Opened {} value store at {} ({} override(s))",
            storage.extension(),
            path.display(),
            values.len()
        );

        Ok(Self {
            path,
            storage,
            values: RwLock::new(values),
            snapshot: Mutex::new(None),
            gate: TransactionGate::default(),
        })
    }

    /// Resolved location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        let values = self.values.read_recovered().clone();
        self.storage.write(&self.path, &values)?;
        debug!("Flushed {} override(s) to {}", values.len(), self.path.display());
        Ok(())
    }

    /// Apply `mutate` to the map and persist it, undoing the change if the
    /// file cannot be written. `mutate` reports whether it changed anything.
    fn mutate<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut RawMap) -> bool,
    {
        let Some(_gate) = self.gate.enter() else {
            // Inside this thread's transaction: buffered until commit
            mutate(&mut *self.values.write_recovered());
            return Ok(());
        };

        let before = {
            let mut values = self.values.write_recovered();
            let before = values.clone();
            if !mutate(&mut *values) {
                return Ok(());
            }
            before
        };
        if let Err(e) = self.flush() {
            *self.values.write_recovered() = before;
            return Err(e);
        }
        Ok(())
    }
}

impl<S: StorageBackend> ValueStore for FileStore<S> {
    fn get_raw(&self, full_key: &str) -> Result<Option<String>> {
        let _gate = self.gate.enter();
        Ok(self.values.read_recovered().get(full_key).cloned())
    }

    fn set_raw(&self, full_key: &str, value: &str) -> Result<()> {
        self.mutate(|values| {
            values.insert(full_key.to_string(), value.to_string());
            true
        })
    }

    fn remove_raw(&self, full_key: &str) -> Result<()> {
        self.mutate(|values| values.remove(full_key).is_some())
    }

    fn all_raw(&self) -> Result<RawMap> {
        let _gate = self.gate.enter();
        Ok(self.values.read_recovered().clone())
    }

    fn run_in_transaction(&self, body: &mut dyn FnMut() -> Result<()>) -> Result<()> {
        let Some(_gate) = self.gate.enter() else {
            return body();
        };
        *self.snapshot.lock_recovered() = Some(self.values.read_recovered().clone());

        let result = body().and_then(|()| self.flush());
        let snapshot = self.snapshot.lock_recovered().take();

        if let Err(e) = &result {
            warn!("Discarding buffered writes to {}: {e}", self.path.display());
            if let Some(snapshot) = snapshot {
                *self.values.write_recovered() = snapshot;
            }
        }
        result
    }
}

/// Expand a leading `~` to the home directory
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::{Arc, mpsc};
    use std::thread;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_writes_persist_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = FileStore::open(&path).unwrap();
        assert!(store.all_raw().unwrap().is_empty());
        assert!(!path.exists());

        store.set_raw("auth.session.timeout", "7200").unwrap();
        store.set_raw("ui.theme", "dark").unwrap();
        store.remove_raw("ui.theme").unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(
            reopened.get_raw("auth.session.timeout").unwrap().as_deref(),
            Some("7200")
        );
        assert_eq!(reopened.get_raw("ui.theme").unwrap(), None);
    }

    #[test]
    fn test_transaction_flushes_once_on_commit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = FileStore::open(&path).unwrap();

        store
            .run_in_transaction(&mut || {
                store.set_raw("a.x", "1")?;
                assert!(!path.exists());
                store.set_raw("a.y", "2")
            })
            .unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.all_raw().unwrap().len(), 2);
    }

    #[test]
    fn test_transaction_rollback_keeps_file_and_memory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = FileStore::open(&path).unwrap();
        store.set_raw("a.x", "1").unwrap();

        let result = store.run_in_transaction(&mut || {
            store.set_raw("a.x", "2")?;
            store.set_raw("a.y", "3")?;
            Err(Error::Store("veto".into()))
        });

        assert!(result.is_err());
        assert_eq!(store.get_raw("a.x").unwrap().as_deref(), Some("1"));
        assert_eq!(store.get_raw("a.y").unwrap(), None);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get_raw("a.x").unwrap().as_deref(), Some("1"));
        assert_eq!(reopened.get_raw("a.y").unwrap(), None);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(FileStore::open(&path).is_err());
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home(Path::new("/etc/app.json")), PathBuf::from("/etc/app.json"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/app.json")), home.join("app.json"));
        }
    }

    #[test]
    fn test_failed_flush_keeps_disk_and_memory_in_step() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = FileStore::open(&path).unwrap();
        store.set_raw("a.x", "1").unwrap();

        std::fs::create_dir(dir.path().join("settings.json.tmp")).unwrap();
        assert!(store.set_raw("a.x", "2").is_err());

        assert_eq!(store.get_raw("a.x").unwrap().as_deref(), Some("1"));
        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get_raw("a.x").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn test_other_thread_write_survives_rollback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = Arc::new(FileStore::open(&path).unwrap());
        let (opened_tx, opened_rx) = mpsc::channel();
        let (fail_tx, fail_rx) = mpsc::channel::<()>();

        let owner = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                store.run_in_transaction(&mut || {
                    store.set_raw("x.a", "pending")?;
                    opened_tx.send(()).unwrap();
                    fail_rx.recv().unwrap();
                    Err(Error::Store("veto".into()))
                })
            })
        };

        opened_rx.recv().unwrap();
        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || store.set_raw("y.b", "committed").unwrap())
        };
        thread::sleep(Duration::from_millis(50));
        fail_tx.send(()).unwrap();

        assert!(owner.join().unwrap().is_err());
        writer.join().unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(
            reopened.all_raw().unwrap(),
            RawMap::from([("y.b".to_string(), "committed".to_string())])
        );
    }
}
