//! Administrative locks
//!
//! A locked key keeps its current value; every write path refuses it.

use crate::sync::RwLockExt;
use log::info;
use std::collections::HashSet;
use std::sync::RwLock;

/// Set of full keys frozen against writes
#[derive(Debug, Default)]
pub struct LockSet {
    keys: RwLock<HashSet<String>>,
}

impl LockSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Freeze `full_key`. The key does not need to be registered yet.
    pub fn lock(&self, full_key: impl Into<String>) {
        let full_key = full_key.into();
        if self.keys.write_recovered().insert(full_key.clone()) {
            info!("Locked setting {full_key}");
        }
    }

    pub fn is_locked(&self, full_key: &str) -> bool {
        self.keys.read_recovered().contains(full_key)
    }

    /// Sorted snapshot of every locked key
    pub fn locked_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.keys.read_recovered().iter().cloned().collect();
        keys.sort();
        keys
    }

    #[cfg(any(test, feature = "test-util"))]
    pub(crate) fn clear(&self) {
        self.keys.write_recovered().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership() {
        let locks = LockSet::new();
        locks.lock("auth.session.timeout");
        locks.lock("auth.session.timeout");
        locks.lock("billing.enabled");

        assert!(locks.is_locked("auth.session.timeout"));
        assert!(!locks.is_locked("auth.session"));
        assert_eq!(
            locks.locked_keys(),
            vec!["auth.session.timeout", "billing.enabled"]
        );

        locks.clear();
        assert!(locks.locked_keys().is_empty());
    }
}
