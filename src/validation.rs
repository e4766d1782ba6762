//! Cross-field validators
//!
//! Validators run on every write after the value has been cast. They receive
//! the tentative value and a [`StateView`] of the live settings, which already
//! includes writes applied earlier in the same batch, and may veto the write
//! with a human-readable message.

use crate::config::{SettingValue, truthy};
use crate::sync::RwLockExt;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Type alias for a validator function
pub type Validator =
    Arc<dyn Fn(&SettingValue, &StateView<'_>) -> Result<(), String> + Send + Sync>;

/// Source of resolved values behind a [`StateView`]
pub(crate) trait Resolve {
    fn resolve(&self, full_key: &str) -> Option<SettingValue>;
}

/// Read-only view of resolved settings handed to validators
pub struct StateView<'a> {
    source: &'a dyn Resolve,
}

impl<'a> StateView<'a> {
    pub(crate) fn new(source: &'a dyn Resolve) -> Self {
        Self { source }
    }

    /// Resolved value of `full_key`, `None` if unregistered
    pub fn get(&self, full_key: &str) -> Option<SettingValue> {
        self.source.resolve(full_key)
    }

    /// [`truthy`] applied to the resolved value of `full_key`
    pub fn is_truthy(&self, full_key: &str) -> bool {
        truthy(self.get(full_key).as_ref())
    }
}

/// Per-key validator lists, run in registration order
#[derive(Default)]
pub struct ValidatorSet {
    validators: RwLock<HashMap<String, Vec<Validator>>>,
}

impl ValidatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a validator for `full_key`
    pub fn add<F>(&self, full_key: &str, validator: F)
    where
        F: Fn(&SettingValue, &StateView<'_>) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validators
            .write_recovered()
            .entry(full_key.to_string())
            .or_default()
            .push(Arc::new(validator));
    }

    /// Run every validator for `full_key`; the first failure wins.
    ///
    /// The lock is released before validators run so they can read through
    /// the view freely.
    pub fn validate(&self, full_key: &str, value: &SettingValue, view: &StateView<'_>) -> Result<(), String> {
        let validators: Vec<Validator> = self
            .validators
            .read_recovered()
            .get(full_key)
            .cloned()
            .unwrap_or_default();

        for validator in &validators {
            validator(value, view)?;
        }
        Ok(())
    }

    pub fn count(&self, full_key: &str) -> usize {
        self.validators
            .read_recovered()
            .get(full_key)
            .map_or(0, Vec::len)
    }

    #[cfg(any(test, feature = "test-util"))]
    pub(crate) fn clear(&self) {
        self.validators.write_recovered().clear();
    }
}
