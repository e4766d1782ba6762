mod common;

use common::{auth_schema, init_logger, require_one_credential};
use modset::{CacheStrategy, EngineContext, MemoryStore, SettingValue, ValueStore};
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn test_concurrent_access() {
    init_logger();
    let engine = EngineContext::builder(MemoryStore::new())
        .with_builtin(auth_schema())
        .build()
        .unwrap();

    let engine = Arc::new(engine);
    let barrier = Arc::new(Barrier::new(10));
    let mut handles = vec![];

    for i in 0..10i64 {
        let e = Arc::clone(&engine);
        let b = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            b.wait();
            // Mixed reads and writes
            if i % 2 == 0 {
                for _ in 0..50 {
                    let _ = e.get("auth.session.timeout");
                }
            } else {
                e.set("auth.session.timeout", 60 * (i + 1)).unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    // Cache and store agree once the dust settles
    let cached = engine.get("auth.session.timeout");
    engine.invalidate_cache();
    assert_eq!(engine.get("auth.session.timeout"), cached);
}

#[test]
fn test_concurrent_batches_stay_consistent() {
    init_logger();
    let engine = EngineContext::builder(MemoryStore::new())
        .cache_strategy(CacheStrategy::Lru(4))
        .with_builtin(auth_schema())
        .build()
        .unwrap();
    require_one_credential(&engine);

    let engine = Arc::new(engine);
    let barrier = Arc::new(Barrier::new(8));
    let mut handles = vec![];

    for i in 0..8i64 {
        let e = Arc::clone(&engine);
        let b = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            b.wait();
            for round in 0..20i64 {
                // Odd threads try to turn both methods off and are always vetoed
                let both_off = i % 2 == 1;
                let _ = e
                    .batch("auth")
                    .set("auth.session.timeout", 60 + i * 100 + round)
                    .set("auth.credentials.magic_link.enabled", !both_off || round % 2 == 0)
                    .set("auth.credentials.email_password.enabled", !both_off)
                    .commit();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let magic = engine.get("auth.credentials.magic_link.enabled");
    let password = engine.get("auth.credentials.email_password.enabled");
    assert!(
        magic == Some(SettingValue::Bool(true)) || password == Some(SettingValue::Bool(true)),
        "validator invariant violated: {magic:?} / {password:?}"
    );

    // Every cached value matches the store
    for key in [
        "auth.session.timeout",
        "auth.credentials.magic_link.enabled",
        "auth.credentials.email_password.enabled",
    ] {
        let cached = engine.get(key);
        let stored = engine.store().get_raw(key).unwrap();
        engine.invalidate_cache();
        assert_eq!(engine.get(key), cached, "{key} (stored: {stored:?})");
    }
}
