//! Event system for settings changes
//!
//! Provides reactive callbacks for committed setting writes. Listeners never
//! see writes from a batch that was rolled back.

use crate::config::SettingValue;
use crate::sync::RwLockExt;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Type alias for a change callback
pub type ChangeCallback = Arc<dyn Fn(&str, &SettingValue, &SettingValue) + Send + Sync>;

/// Manages event listeners for settings changes
#[derive(Default)]
pub struct EventManager {
    /// Global listeners (called for all changes)
    global_listeners: RwLock<Vec<ChangeCallback>>,

    /// Per-key listeners (called only for specific setting changes)
    key_listeners: RwLock<HashMap<String, Vec<ChangeCallback>>>,
}

impl EventManager {
    /// Create a new event manager
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a global change listener (called for all settings changes)
    ///
    /// # Arguments
    /// * `callback` - Function receiving (`full_key`, `old_value`, `new_value`)
    pub fn on_change<F>(&self, callback: F)
    where
        F: Fn(&str, &SettingValue, &SettingValue) + Send + Sync + 'static,
    {
        self.global_listeners
            .write_recovered()
            .push(Arc::new(callback));
    }

    /// Register a listener for a specific setting key
    ///
    /// # Arguments
    /// * `full_key` - The setting key (e.g., "`auth.session.timeout`")
    /// * `callback` - Function receiving (`full_key`, `old_value`, `new_value`)
    pub fn watch<F>(&self, full_key: &str, callback: F)
    where
        F: Fn(&str, &SettingValue, &SettingValue) + Send + Sync + 'static,
    {
        self.key_listeners
            .write_recovered()
            .entry(full_key.to_string())
            .or_default()
            .push(Arc::new(callback));
    }

    /// Notify all listeners about a change
    pub fn notify(&self, full_key: &str, old_value: &SettingValue, new_value: &SettingValue) {
        // Snapshot callbacks so listeners may register more listeners
        let mut callbacks: Vec<ChangeCallback> = self.global_listeners.read_recovered().clone();
        if let Some(listeners) = self.key_listeners.read_recovered().get(full_key) {
            callbacks.extend(listeners.iter().cloned());
        }

        for callback in &callbacks {
            callback(full_key, old_value, new_value);
        }
    }

    /// Remove all listeners for a specific key
    pub fn unwatch(&self, full_key: &str) {
        self.key_listeners.write_recovered().remove(full_key);
    }

    /// Clear all listeners
    pub fn clear(&self) {
        self.global_listeners.write_recovered().clear();
        self.key_listeners.write_recovered().clear();
    }
}

// =============================================================================
// Tests
// =============================================================================
