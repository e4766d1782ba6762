//! Resolved-value cache for `EngineContext`
//!
//! Every mutation bumps a generation counter. A reader that resolved a value
//! from the store only memoizes it if no mutation happened in between, so a
//! concurrent invalidation can never be overwritten by a stale resolution.

use crate::cache::CacheStrategy;
use crate::config::SettingValue;
use crate::sync::RwLockExt;
use log::debug;
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::RwLock;

enum Slots {
    Full(HashMap<String, SettingValue>),
    Lru(LruCache<String, SettingValue>),
    Disabled,
}

struct CacheState {
    slots: Slots,
    generation: u64,
}

pub(crate) struct ResolverCache {
    state: RwLock<CacheState>,
}

impl ResolverCache {
    /// `strategy` must already be validated
    pub(crate) fn new(strategy: CacheStrategy) -> Self {
        let slots = match strategy {
            CacheStrategy::Full => Slots::Full(HashMap::new()),
            CacheStrategy::Lru(size) => match NonZeroUsize::new(size) {
                Some(size) => Slots::Lru(LruCache::new(size)),
                None => Slots::Disabled,
            },
            CacheStrategy::None => Slots::Disabled,
        };
        Self {
            state: RwLock::new(CacheState {
                slots,
                generation: 0,
            }),
        }
    }

    pub(crate) fn get(&self, full_key: &str) -> Option<SettingValue> {
        let hit = {
            let state = self.state.read_recovered();
            match &state.slots {
                Slots::Full(map) => Some(map.get(full_key).cloned()),
                Slots::Disabled => Some(None),
                // LRU lookups reorder entries and need the write lock
                Slots::Lru(_) => None,
            }
        };
        let hit = match hit {
            Some(hit) => hit,
            None => match &mut self.state.write_recovered().slots {
                Slots::Lru(lru) => lru.get(full_key).cloned(),
                _ => None,
            },
        };

        if hit.is_some() {
            debug!("Cache hit for {full_key}");
        }
        hit
    }

    pub(crate) fn generation(&self) -> u64 {
        self.state.read_recovered().generation
    }

    /// Memoize a value resolved from the store, unless the cache changed since
    /// `generation` was read
    pub(crate) fn insert_if_current(&self, full_key: &str, value: SettingValue, generation: u64) {
        let mut state = self.state.write_recovered();
        if state.generation != generation {
            debug!("Cache moved on while resolving {full_key}, not memoizing");
            return;
        }
        Self::store(&mut state.slots, full_key, value);
    }

    /// Record a value that was just written
    pub(crate) fn put(&self, full_key: &str, value: SettingValue) {
        let mut state = self.state.write_recovered();
        state.generation += 1;
        Self::store(&mut state.slots, full_key, value);
    }

    /// Drop every memoized entry
    pub(crate) fn invalidate(&self) {
        let mut state = self.state.write_recovered();
        state.generation += 1;
        match &mut state.slots {
            Slots::Full(map) => map.clear(),
            Slots::Lru(lru) => lru.clear(),
            Slots::Disabled => {}
        }
        debug!("Resolver cache invalidated");
    }

    fn store(slots: &mut Slots, full_key: &str, value: SettingValue) {
        match slots {
            Slots::Full(map) => {
                map.insert(full_key.to_string(), value);
            }
            Slots::Lru(lru) => {
                lru.put(full_key.to_string(), value);
            }
            Slots::Disabled => {}
        }
    }
}
