//! Builder for `EngineContext`
//!
//! This module contains [`EngineBuilder`] which provides a fluent API
//! for creating an [`EngineContext`](super::EngineContext).

use crate::cache::CacheStrategy;
use crate::config::Schema;
use crate::error::Result;
use crate::store::ValueStore;

use super::EngineContext;

/// Builder for creating an [`EngineContext`] with a fluent API.
///
/// # Example
///
/// ```rust
/// use modset::{CacheStrategy, Definition, EngineContext, MemoryStore, Schema};
///
/// let engine = EngineContext::builder(MemoryStore::new())
///     .cache_strategy(CacheStrategy::Lru(256))
///     .with_builtin(
///         Schema::new("system")
///             .setting(Definition::boolean("maintenance.enabled", false))?,
///     )
///     .build()?;
///
/// assert_eq!(engine.get("system.maintenance.enabled"), Some(false.into()));
/// # Ok::<(), modset::Error>(())
/// ```
pub struct EngineBuilder<V: ValueStore> {
    store: V,
    cache_strategy: CacheStrategy,
    builtins: Vec<Schema>,
}

impl<V: ValueStore> EngineBuilder<V> {
    /// Create a new builder around the durable value store.
    pub fn new(store: V) -> Self {
        Self {
            store,
            cache_strategy: CacheStrategy::default(),
            builtins: Vec::new(),
        }
    }

    /// Set how resolved values are memoized (default: [`CacheStrategy::Full`]).
    pub fn cache_strategy(mut self, strategy: CacheStrategy) -> Self {
        self.cache_strategy = strategy;
        self
    }

    /// Register a built-in schema.
    ///
    /// Built-ins are registered when the engine is built and registered
    /// again after every `reset()`.
    pub fn with_builtin(mut self, schema: Schema) -> Self {
        self.builtins.push(schema);
        self
    }

    /// Build the engine.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the cache strategy is invalid.
    pub fn build(self) -> Result<EngineContext<V>> {
        self.cache_strategy.validate()?;
        Ok(EngineContext::from_parts(
            self.store,
            self.cache_strategy,
            self.builtins,
        ))
    }
}
