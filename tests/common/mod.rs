//! Common test utilities for modset integration tests
//!
//! Provides shared fixture schemas, a store wrapper that counts writes, and
//! logger setup.

#![allow(dead_code)]

use modset::{
    Definition, EngineContext, EnumSource, MemoryStore, Result, Schema, ValueStore, truthy,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

// =============================================================================
// Logging
// =============================================================================

/// Route `log` output through the test harness
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// =============================================================================
// Counting Store
// =============================================================================

/// `MemoryStore` that counts calls to the write path
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    writes: AtomicUsize,
    transactions: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn transactions(&self) -> usize {
        self.transactions.load(Ordering::SeqCst)
    }
}

impl ValueStore for CountingStore {
    fn get_raw(&self, full_key: &str) -> Result<Option<String>> {
        self.inner.get_raw(full_key)
    }

    fn set_raw(&self, full_key: &str, value: &str) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set_raw(full_key, value)
    }

    fn remove_raw(&self, full_key: &str) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.remove_raw(full_key)
    }

    fn all_raw(&self) -> Result<BTreeMap<String, String>> {
        self.inner.all_raw()
    }

    fn run_in_transaction(&self, body: &mut dyn FnMut() -> Result<()>) -> Result<()> {
        self.transactions.fetch_add(1, Ordering::SeqCst);
        self.inner.run_in_transaction(body)
    }
}

// =============================================================================
// Fixture Schemas
// =============================================================================

/// Authentication settings with two mutually required sign-in methods
pub fn auth_schema() -> Schema {
    Schema::new("auth")
        .setting(
            Definition::boolean("credentials.email_password.enabled", true)
                .group("Credentials")
                .description("Allow signing in with email and password"),
        )
        .and_then(|s| {
            s.setting(
                Definition::boolean("credentials.magic_link.enabled", true)
                    .group("Credentials")
                    .description("Allow signing in with an emailed link"),
            )
        })
        .and_then(|s| {
            s.setting(
                Definition::integer("session.timeout", 3600)
                    .group("Sessions")
                    .min(60)
                    .max(86_400),
            )
        })
        .and_then(|s| {
            s.setting(
                Definition::string("oauth.client_id", "")
                    .group("OAuth")
                    .depends_on("auth.oauth.enabled"),
            )
        })
        .and_then(|s| s.setting(Definition::boolean("oauth.enabled", false).group("OAuth")))
        .and_then(|s| {
            s.setting(Definition::enumeration(
                "password.hash",
                "argon2",
                EnumSource::fixed(["argon2", "bcrypt", "scrypt"]),
            ))
        })
        .expect("fixture schema is valid")
}

/// Register the "at least one method" rule on both credential toggles
pub fn require_one_credential<V: ValueStore>(engine: &EngineContext<V>) {
    const METHODS: [&str; 2] = [
        "auth.credentials.email_password.enabled",
        "auth.credentials.magic_link.enabled",
    ];
    for (own, other) in [(METHODS[0], METHODS[1]), (METHODS[1], METHODS[0])] {
        engine.add_validator(own, move |value, state| {
            if truthy(value) || state.is_truthy(other) {
                Ok(())
            } else {
                Err("at least one sign-in method must remain enabled".into())
            }
        });
    }
}

// =============================================================================
// Engines
// =============================================================================

/// Engine over a shared counting store with the auth schema registered
pub fn counting_engine() -> (EngineContext<Arc<CountingStore>>, Arc<CountingStore>) {
    init_logger();
    let store = Arc::new(CountingStore::new());
    let engine = EngineContext::builder(Arc::clone(&store))
        .with_builtin(auth_schema())
        .build()
        .expect("engine builds");
    (engine, store)
}

/// Engine over a plain memory store with the auth schema registered
pub fn memory_engine() -> EngineContext<MemoryStore> {
    init_logger();
    EngineContext::builder(MemoryStore::new())
        .with_builtin(auth_schema())
        .build()
        .expect("engine builds")
}
