//! In-process value store

use super::ValueStore;
use super::gate::TransactionGate;
use crate::error::Result;
use crate::sync::{MutexExt, RwLockExt};
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, RwLock};

/// Undo entry: key plus the value it held before the write
type JournalEntry = (String, Option<String>);

/// Map-backed [`ValueStore`] with journaled transactions.
///
/// While a transaction is open every mutation made by its thread records the
/// previous value; a failing body replays the journal in reverse. Other
/// threads wait for the transaction to finish before reading or writing.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
    journal: Mutex<Option<Vec<JournalEntry>>>,
    gate: TransactionGate,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with raw overrides
    pub fn with_values<I, K, T>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<String>,
        T: Into<String>,
    {
        Self {
            values: RwLock::new(
                values
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        let _gate = self.gate.enter();
        self.values.read_recovered().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&self, full_key: &str, previous: Option<String>) {
        if let Some(journal) = self.journal.lock_recovered().as_mut() {
            journal.push((full_key.to_string(), previous));
        }
    }

    fn rollback(&self, journal: Vec<JournalEntry>) {
        let mut values = self.values.write_recovered();
        for (key, previous) in journal.into_iter().rev() {
            match previous {
                Some(value) => values.insert(key, value),
                None => values.remove(&key),
            };
        }
    }
}

impl ValueStore for MemoryStore {
    fn get_raw(&self, full_key: &str) -> Result<Option<String>> {
        let _gate = self.gate.enter();
        Ok(self.values.read_recovered().get(full_key).cloned())
    }

    fn set_raw(&self, full_key: &str, value: &str) -> Result<()> {
        let _gate = self.gate.enter();
        let previous = self
            .values
            .write_recovered()
            .insert(full_key.to_string(), value.to_string());
        self.record(full_key, previous);
        Ok(())
    }

    fn remove_raw(&self, full_key: &str) -> Result<()> {
        let _gate = self.gate.enter();
        let previous = self.values.write_recovered().remove(full_key);
        if previous.is_some() {
            self.record(full_key, previous);
        }
        Ok(())
    }

    fn all_raw(&self) -> Result<BTreeMap<String, String>> {
        let _gate = self.gate.enter();
        Ok(self
            .values
            .read_recovered()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn run_in_transaction(&self, body: &mut dyn FnMut() -> Result<()>) -> Result<()> {
        let Some(_gate) = self.gate.enter() else {
            return body();
        };
        *self.journal.lock_recovered() = Some(Vec::new());

        let result = body();
        let journal = self.journal.lock_recovered().take().unwrap_or_default();

        if let Err(e) = &result {
            warn!("Rolling back {} store write(s): {e}", journal.len());
            self.rollback(journal);
        } else {
            debug!("Committed {} store write(s)", journal.len());
        }
        result
    }
}
