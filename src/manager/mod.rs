//! Setting resolution engine
//!
//! This module contains [`EngineContext`], the entry point every module talks
//! to: registration, reads, single and batched writes, locks, validators and
//! change events all go through it.

mod batch;
mod builder;
mod cache;

pub use batch::{Batch, BatchReport};
pub use builder::EngineBuilder;

use crate::cache::CacheStrategy;
use crate::config::{Definition, FullKey, Registry, Schema, SettingValue, truthy};
use crate::error::{Error, Result};
use crate::events::EventManager;
use crate::locks::LockSet;
use crate::store::ValueStore;
use crate::sync::MutexExt;
use crate::validation::{Resolve, StateView, ValidatorSet};
use cache::ResolverCache;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Editability of a setting, recomputed on every call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldState {
    Editable,
    /// An administrator froze the key
    Locked,
    /// The setting's `depends_on` target is not truthy
    DisabledByDependency,
}

impl FieldState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldState::Editable => "editable",
            FieldState::Locked => "locked",
            FieldState::DisabledByDependency => "disabled_by_dependency",
        }
    }

    pub fn is_editable(&self) -> bool {
        *self == FieldState::Editable
    }
}

impl fmt::Display for FieldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted write, reported to listeners once it is durable
pub(crate) struct Change {
    pub(crate) key: String,
    pub(crate) old: SettingValue,
    pub(crate) new: SettingValue,
}

/// Registry, locks, validators, cache and value store behind one handle.
///
/// Share it across threads with `Arc`; every operation takes `&self`.
///
/// # Example
///
/// ```rust
/// use modset::{Definition, EngineContext, FieldState, MemoryStore};
///
/// let engine = EngineContext::builder(MemoryStore::new()).build()?;
/// engine.registry().define("mail", |schema| {
///     schema
///         .setting(Definition::boolean("smtp.enabled", true).group("SMTP"))?
///         .setting(
///             Definition::string("smtp.host", "localhost")
///                 .group("SMTP")
///                 .depends_on("mail.smtp.enabled"),
///         )
/// })?;
///
/// engine.set("mail.smtp.host", "smtp.example.com")?;
/// assert_eq!(engine.get("mail.smtp.host"), Some("smtp.example.com".into()));
///
/// engine.set("mail.smtp.enabled", false)?;
/// assert_eq!(engine.field_state("mail.smtp.host")?, FieldState::DisabledByDependency);
///
/// // Unregistered keys read as `None` and refuse writes
/// assert_eq!(engine.get("mail.imap.host"), None);
/// assert!(engine.set("mail.imap.host", "x").is_err());
/// # Ok::<(), modset::Error>(())
/// ```
pub struct EngineContext<V: ValueStore> {
    registry: Registry,
    locks: LockSet,
    validators: ValidatorSet,
    events: EventManager,
    cache: ResolverCache,
    store: V,

    /// Schemas re-registered by `reset()`
    builtins: Vec<Schema>,

    /// Serializes writes so cache updates and durable commits never interleave
    write_mutex: Mutex<()>,
}

impl<V: ValueStore> EngineContext<V> {
    /// Start building an engine around `store`
    pub fn builder(store: V) -> EngineBuilder<V> {
        EngineBuilder::new(store)
    }

    pub(crate) fn from_parts(store: V, strategy: CacheStrategy, builtins: Vec<Schema>) -> Self {
        let engine = Self {
            registry: Registry::new(),
            locks: LockSet::new(),
            validators: ValidatorSet::new(),
            events: EventManager::new(),
            cache: ResolverCache::new(strategy),
            store,
            builtins,
            write_mutex: Mutex::new(()),
        };
        engine.seed_builtins();
        engine
    }

    fn seed_builtins(&self) {
        for schema in &self.builtins {
            self.registry.register(schema.clone());
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The durable store the engine reads from and writes to
    pub fn store(&self) -> &V {
        &self.store
    }

    /// Change listeners
    pub fn events(&self) -> &EventManager {
        &self.events
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Resolve a setting: cache, then stored override, then default.
    ///
    /// Returns `None` for keys no module registered. A failing store read
    /// falls back to the default without memoizing it.
    pub fn get(&self, full_key: &str) -> Option<SettingValue> {
        match self.try_get(full_key) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to read {full_key} from value store, using default: {e}");
                self.registry
                    .find_definition(full_key)
                    .map(|def| def.default.clone())
            }
        }
    }

    /// Like [`get`](Self::get) but surfaces value store errors
    ///
    /// # Errors
    ///
    /// Propagates store read failures.
    pub fn try_get(&self, full_key: &str) -> Result<Option<SettingValue>> {
        if let Some(value) = self.cache.get(full_key) {
            return Ok(Some(value));
        }
        match self.registry.find_definition(full_key) {
            Some(def) => self.resolve_definition(full_key, &def).map(Some),
            None => Ok(None),
        }
    }

    /// Resolve a setting and deserialize it into `T`.
    ///
    /// ```rust
    /// use modset::{Definition, EngineContext, MemoryStore};
    ///
    /// let engine = EngineContext::builder(MemoryStore::new()).build()?;
    /// engine.registry().define("net", |s| s.setting(Definition::integer("http.port", 8080)))?;
    ///
    /// let port: Option<u16> = engine.get_as("net.http.port")?;
    /// assert_eq!(port, Some(8080));
    /// # Ok::<(), modset::Error>(())
    /// ```
    ///
    /// # Errors
    ///
    /// `Error::Parse` if the resolved value does not fit `T`.
    pub fn get_as<T: DeserializeOwned>(&self, full_key: &str) -> Result<Option<T>> {
        let Some(value) = self.try_get(full_key)? else {
            return Ok(None);
        };
        serde_json::to_value(&value)
            .and_then(serde_json::from_value)
            .map(Some)
            .map_err(|e| Error::Parse(format!("{full_key}: {e}")))
    }

    /// Every resolved value of `category`, in registration order
    pub fn snapshot(&self, category: &str) -> Vec<(String, SettingValue)> {
        let Some(schema) = self.registry.schema(category) else {
            return Vec::new();
        };
        schema
            .definitions()
            .iter()
            .map(|def| {
                let full_key = FullKey::new(category, def.key.as_str()).to_string();
                let value = self.get(&full_key).unwrap_or_else(|| def.default.clone());
                (full_key, value)
            })
            .collect()
    }

    fn resolve_definition(&self, full_key: &str, def: &Definition) -> Result<SettingValue> {
        if let Some(value) = self.cache.get(full_key) {
            return Ok(value);
        }

        let generation = self.cache.generation();
        let value = match self.store.get_raw(full_key)? {
            Some(raw) => def.cast_stored(&raw),
            None => def.default.clone(),
        };
        self.cache
            .insert_if_current(full_key, value.clone(), generation);
        Ok(value)
    }

    fn definition(&self, full_key: &str) -> Result<Arc<Definition>> {
        self.registry
            .find_definition(full_key)
            .ok_or_else(|| Error::UnknownSetting(full_key.to_string()))
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Cast, validate and persist a single setting.
    ///
    /// Writing a value equal to the resolved one is a no-op and never touches
    /// the store.
    ///
    /// # Errors
    ///
    /// * `Error::UnknownSetting` - no definition for `full_key`
    /// * `Error::LockedSetting` - the key is locked
    /// * `Error::Validation` - cast, constraint or validator failure
    /// * store errors from persisting the value
    pub fn set(&self, full_key: &str, value: impl Into<SettingValue>) -> Result<()> {
        let value = value.into();
        let change = {
            let _write_guard = self.write_mutex.lock_recovered();
            self.apply_write(full_key, &value)?
        };

        if let Some(change) = change {
            self.events.notify(&change.key, &change.old, &change.new);
        }
        Ok(())
    }

    /// Drop the stored override so the default applies again.
    ///
    /// Goes through the same lock and validator checks as a write of the
    /// default value. Returns the default.
    ///
    /// # Errors
    ///
    /// Same as [`set`](Self::set).
    pub fn reset_setting(&self, full_key: &str) -> Result<SettingValue> {
        let (old, default) = {
            let _write_guard = self.write_mutex.lock_recovered();
            let def = self.definition(full_key)?;
            if self.locks.is_locked(full_key) {
                return Err(Error::LockedSetting(full_key.to_string()));
            }

            let default = def.default.clone();
            self.validators
                .validate(full_key, &default, &StateView::new(self))
                .map_err(|message| Error::validation(full_key, message))?;

            let old = self.resolve_definition(full_key, &def)?;
            self.store.remove_raw(full_key)?;
            self.cache.put(full_key, default.clone());
            info!("Setting {full_key} reset to default");

            let changed = !def.same_value(&old, &default);
            (changed.then_some(old), default)
        };

        if let Some(old) = old {
            self.events.notify(full_key, &old, &default);
        }
        Ok(default)
    }

    /// The single write path shared by [`set`](Self::set) and batches.
    ///
    /// Callers hold `write_mutex`. Returns `None` when the value is unchanged.
    pub(crate) fn apply_write(&self, full_key: &str, raw: &SettingValue) -> Result<Option<Change>> {
        let def = self.definition(full_key)?;
        if self.locks.is_locked(full_key) {
            return Err(Error::LockedSetting(full_key.to_string()));
        }

        let value = def
            .cast_for_write(raw)
            .map_err(|message| Error::validation(full_key, message))?;

        self.validators
            .validate(full_key, &value, &StateView::new(self))
            .map_err(|message| Error::validation(full_key, message))?;

        let current = self.resolve_definition(full_key, &def)?;
        if def.same_value(&current, &value) {
            debug!("Setting {full_key} unchanged, skipping save");
            return Ok(None);
        }

        self.store.set_raw(full_key, &value.to_raw())?;
        self.cache.put(full_key, value.clone());
        info!("Setting {full_key} saved");

        Ok(Some(Change {
            key: full_key.to_string(),
            old: current,
            new: value,
        }))
    }

    /// Start a batch of writes scoped to `category`
    pub fn batch(&self, category: impl Into<String>) -> Batch<'_, V> {
        Batch::new(self, category.into())
    }

    // =========================================================================
    // Enablement
    // =========================================================================

    /// Whether `full_key` can be edited right now.
    ///
    /// Locks take precedence; otherwise a setting is disabled when its
    /// `depends_on` target resolves falsy. Only the direct target counts.
    ///
    /// # Errors
    ///
    /// * `Error::UnknownSetting` - no definition for `full_key`
    /// * `Error::DependencyCycle` - following `depends_on` loops back
    pub fn field_state(&self, full_key: &str) -> Result<FieldState> {
        self.field_state_by(full_key, |target| Ok(truthy(self.get(target).as_ref())))
    }

    /// [`field_state`](Self::field_state) with the `depends_on` target judged
    /// by `gate_open` instead of its resolved value
    pub(crate) fn field_state_by<F>(&self, full_key: &str, gate_open: F) -> Result<FieldState>
    where
        F: FnOnce(&str) -> Result<bool>,
    {
        let def = self.definition(full_key)?;
        if self.locks.is_locked(full_key) {
            return Ok(FieldState::Locked);
        }
        let Some(target) = def.depends_on.as_deref() else {
            return Ok(FieldState::Editable);
        };

        self.registry.dependency_chain(full_key)?;
        Ok(if gate_open(target)? {
            FieldState::Editable
        } else {
            FieldState::DisabledByDependency
        })
    }

    // =========================================================================
    // Locks and validators
    // =========================================================================

    /// Administrative configuration hook.
    ///
    /// ```rust
    /// use modset::{EngineContext, MemoryStore};
    ///
    /// let engine = EngineContext::builder(MemoryStore::new()).build()?;
    /// engine.configure(|locks| {
    ///     locks.lock("auth.session.timeout");
    /// });
    /// assert!(engine.is_locked("auth.session.timeout"));
    /// # Ok::<(), modset::Error>(())
    /// ```
    pub fn configure<F>(&self, configure: F)
    where
        F: FnOnce(&LockSet),
    {
        configure(&self.locks);
    }

    pub fn is_locked(&self, full_key: &str) -> bool {
        self.locks.is_locked(full_key)
    }

    /// Register a cross-field validator for `full_key`.
    ///
    /// The validator receives the cast value and a view of the resolved
    /// settings; returning `Err(message)` vetoes the write.
    pub fn add_validator<F>(&self, full_key: &str, validator: F)
    where
        F: Fn(&SettingValue, &StateView<'_>) -> std::result::Result<(), String>
            + Send
            + Sync
            + 'static,
    {
        self.validators.add(full_key, validator);
    }

    // =========================================================================
    // Cache
    // =========================================================================

    /// Drop every memoized value; the next reads go to the store
    pub fn invalidate_cache(&self) {
        self.cache.invalidate();
    }

    /// Clear registry, locks, validators, listeners and cache, then register
    /// the built-in schemas again. Stored overrides are left alone.
    #[cfg(any(test, feature = "test-util"))]
    pub fn reset(&self) {
        let _write_guard = self.write_mutex.lock_recovered();
        self.registry.clear();
        self.locks.clear();
        self.validators.clear();
        self.events.clear();
        self.cache.invalidate();
        self.seed_builtins();
        info!("Engine reset");
    }
}

impl<V: ValueStore> Resolve for EngineContext<V> {
    fn resolve(&self, full_key: &str) -> Option<SettingValue> {
        self.get(full_key)
    }
}

// =============================================================================
// Tests
// =============================================================================
