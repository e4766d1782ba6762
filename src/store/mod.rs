//! Durable value stores
//!
//! The engine never owns persistence. It reads and writes raw text overrides
//! through a [`ValueStore`], and relies on the store's transaction boundary
//! for all-or-nothing batch writes.

mod file;
mod gate;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::Result;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Durable `full_key → text` storage consumed by the engine
pub trait ValueStore: Send + Sync {
    /// Raw override for `full_key`, `None` if nothing is stored
    fn get_raw(&self, full_key: &str) -> Result<Option<String>>;

    /// Store `value` as the override for `full_key`
    fn set_raw(&self, full_key: &str, value: &str) -> Result<()>;

    /// Drop the override for `full_key`; a missing key is not an error
    fn remove_raw(&self, full_key: &str) -> Result<()>;

    /// Every stored override
    fn all_raw(&self) -> Result<BTreeMap<String, String>>;

    /// Run `body` so that its writes are applied all-or-nothing.
    ///
    /// If `body` returns an error, every write it made is undone and the
    /// error is returned unchanged. The transaction belongs to the calling
    /// thread: a transaction opened inside it on the same thread joins it,
    /// while calls from other threads wait until it has finished. Both
    /// bundled stores behave this way, so several engines may share one
    /// store behind an `Arc`.
    fn run_in_transaction(&self, body: &mut dyn FnMut() -> Result<()>) -> Result<()>;
}

impl<V: ValueStore + ?Sized> ValueStore for Arc<V> {
    fn get_raw(&self, full_key: &str) -> Result<Option<String>> {
        (**self).get_raw(full_key)
    }

    fn set_raw(&self, full_key: &str, value: &str) -> Result<()> {
        (**self).set_raw(full_key, value)
    }

    fn remove_raw(&self, full_key: &str) -> Result<()> {
        (**self).remove_raw(full_key)
    }

    fn all_raw(&self) -> Result<BTreeMap<String, String>> {
        (**self).all_raw()
    }

    fn run_in_transaction(&self, body: &mut dyn FnMut() -> Result<()>) -> Result<()> {
        (**self).run_in_transaction(body)
    }
}
