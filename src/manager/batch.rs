//! All-or-nothing writes of several settings in one category
//!
//! A batch runs inside one value store transaction. Any error rolls the store
//! back and drops the whole resolver cache, because writes that succeeded
//! before the failure already updated their cache entries.

use super::{Change, EngineContext, FieldState};
use crate::config::{FullKey, SettingValue, truthy};
use crate::error::{Error, Result};
use crate::store::ValueStore;
use crate::sync::MutexExt;
use log::{debug, info, warn};
use std::collections::HashMap;

/// Outcome of a committed [`Batch`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Keys whose value was persisted, in submission order
    pub changed: Vec<String>,
    /// Keys whose proposed value equalled the resolved one
    pub unchanged: Vec<String>,
    /// Keys ignored because they were not editable
    pub skipped: Vec<(String, FieldState)>,
}

impl BatchReport {
    pub fn is_noop(&self) -> bool {
        self.changed.is_empty()
    }
}

/// Ordered `(full_key, value)` pairs committed together.
///
/// Created by [`EngineContext::batch`].
///
/// # Example
///
/// ```rust
/// use modset::{Definition, EngineContext, MemoryStore};
///
/// let engine = EngineContext::builder(MemoryStore::new()).build()?;
/// engine.registry().define("ui", |s| {
///     s.setting(Definition::string("theme", "light"))?
///         .setting(Definition::integer("page_size", 25))
/// })?;
///
/// let report = engine
///     .batch("ui")
///     .set("ui.theme", "dark")
///     .set("ui.page_size", "25")
///     .commit()?;
///
/// assert_eq!(report.changed, vec!["ui.theme"]);
/// assert_eq!(report.unchanged, vec!["ui.page_size"]);
/// # Ok::<(), modset::Error>(())
/// ```
#[must_use = "a batch does nothing until committed"]
pub struct Batch<'a, V: ValueStore> {
    engine: &'a EngineContext<V>,
    category: String,
    pairs: Vec<(String, SettingValue)>,
}

impl<'a, V: ValueStore> Batch<'a, V> {
    pub(crate) fn new(engine: &'a EngineContext<V>, category: String) -> Self {
        Self {
            engine,
            category,
            pairs: Vec::new(),
        }
    }

    /// Queue a write. Nothing is checked until [`commit`](Self::commit).
    pub fn set(mut self, full_key: impl Into<String>, value: impl Into<SettingValue>) -> Self {
        self.pairs.push((full_key.into(), value.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Apply every queued write, or none of them.
    ///
    /// Non-editable keys are skipped rather than rejected. Dependency gating
    /// takes the batch itself into account: a key whose `depends_on` target
    /// is switched off in the same batch is skipped whatever the order.
    /// Unchanged values are not written. Listeners are notified only after
    /// the store committed.
    ///
    /// # Errors
    ///
    /// * `Error::CategoryMismatch` - a key outside the batch category
    /// * `Error::UnknownSetting` / `Error::DependencyCycle` - from planning
    /// * `Error::Validation` and store errors - the batch is rolled back
    pub fn commit(self) -> Result<BatchReport> {
        let Batch {
            engine,
            category,
            pairs,
        } = self;

        for (full_key, _) in &pairs {
            let in_category = FullKey::parse(full_key).is_some_and(|k| k.category() == category);
            if !in_category {
                return Err(Error::CategoryMismatch {
                    key: full_key.clone(),
                    category,
                });
            }
        }

        let write_guard = engine.write_mutex.lock_recovered();
        let states = plan(engine, &pairs)?;

        let mut report = BatchReport::default();
        let mut changes: Vec<Change> = Vec::new();
        let result = engine.store.run_in_transaction(&mut || {
            for ((full_key, value), state) in pairs.iter().zip(&states) {
                if !state.is_editable() {
                    debug!("Skipping {full_key} in batch: {state}");
                    report.skipped.push((full_key.clone(), *state));
                    continue;
                }

                let def = engine.definition(full_key)?;
                let current = engine.resolve_definition(full_key, &def)?;
                if def.same_value(&current, value) {
                    debug!("Setting {full_key} unchanged, skipping save");
                    report.unchanged.push(full_key.clone());
                    continue;
                }

                match engine.apply_write(full_key, value)? {
                    Some(change) => {
                        report.changed.push(full_key.clone());
                        changes.push(change);
                    }
                    None => report.unchanged.push(full_key.clone()),
                }
            }
            Ok(())
        });

        if let Err(e) = result {
            engine.invalidate_cache();
            warn!("Batch for category '{category}' rolled back: {e}");
            return Err(e);
        }
        drop(write_guard);

        info!(
            "Committed batch for category '{category}': {} changed, {} unchanged, {} skipped",
            report.changed.len(),
            report.unchanged.len(),
            report.skipped.len()
        );
        for change in &changes {
            engine.events.notify(&change.key, &change.old, &change.new);
        }
        Ok(report)
    }
}

/// Field state of every pair as it will be once the batch is applied.
///
/// A `depends_on` target that this batch writes gates through its proposed
/// value, but only when the target is itself editable under the same rule.
/// A target the batch will skip gates through its current value.
fn plan<V: ValueStore>(
    engine: &EngineContext<V>,
    pairs: &[(String, SettingValue)],
) -> Result<Vec<FieldState>> {
    let mut proposed = HashMap::new();
    for (full_key, value) in pairs {
        let def = engine.definition(full_key)?;
        // An uncastable value fails the batch later; it never gates anything
        if let Ok(cast) = def.cast_for_write(value) {
            proposed.insert(full_key.clone(), cast);
        }
    }

    let mut planner = Planner {
        engine,
        proposed,
        states: HashMap::new(),
    };
    pairs
        .iter()
        .map(|(full_key, _)| planner.state(full_key))
        .collect()
}

struct Planner<'a, V: ValueStore> {
    engine: &'a EngineContext<V>,
    proposed: HashMap<String, SettingValue>,
    states: HashMap<String, FieldState>,
}

impl<V: ValueStore> Planner<'_, V> {
    fn state(&mut self, full_key: &str) -> Result<FieldState> {
        if let Some(state) = self.states.get(full_key) {
            return Ok(*state);
        }

        let engine = self.engine;
        let state = engine.field_state_by(full_key, |target| {
            if let Some(value) = self.proposed.get(target).cloned() {
                if self.state(target)?.is_editable() {
                    return Ok(truthy(&value));
                }
            }
            Ok(truthy(engine.get(target).as_ref()))
        })?;

        self.states.insert(full_key.to_string(), state);
        Ok(state)
    }
}
