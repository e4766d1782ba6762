//! Batch transactions: atomicity, cache coherence and gating

mod common;

use common::{counting_engine, memory_engine, require_one_credential};
use modset::{
    Definition, EngineContext, Error, FieldState, MemoryStore, Result, SettingValue, ValueStore,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn test_batch_commits_changed_pairs() {
    let (engine, store) = counting_engine();

    let report = engine
        .batch("auth")
        .set("auth.session.timeout", "1800")
        .set("auth.credentials.magic_link.enabled", "true")
        .set("auth.password.hash", "bcrypt")
        .commit()
        .unwrap();

    assert_eq!(report.changed, vec!["auth.session.timeout", "auth.password.hash"]);
    assert_eq!(report.unchanged, vec!["auth.credentials.magic_link.enabled"]);
    assert!(report.skipped.is_empty());
    assert_eq!(store.writes(), 2);
    assert_eq!(store.transactions(), 1);

    engine.invalidate_cache();
    assert_eq!(engine.get("auth.session.timeout"), Some(SettingValue::Int(1800)));
    assert_eq!(engine.get("auth.password.hash"), Some("bcrypt".into()));
}

#[test]
fn test_batch_atomicity_with_cache_coherence() {
    let engine = memory_engine();
    engine.add_validator("auth.password.hash", |_, _| Err("hash changes are frozen".into()));

    let err = engine
        .batch("auth")
        .set("auth.session.timeout", 900)
        .set("auth.password.hash", "bcrypt")
        .commit()
        .unwrap_err();

    assert!(err.is_validation());
    // The first pair had been written and cached before the veto
    assert_eq!(engine.get("auth.session.timeout"), Some(SettingValue::Int(3600)));
    assert_eq!(engine.get("auth.password.hash"), Some("argon2".into()));
    assert_eq!(engine.store().get_raw("auth.session.timeout").unwrap(), None);
}

#[test]
fn test_vetoed_batch_keeps_previous_overrides() {
    let engine = memory_engine();
    engine.set("auth.session.timeout", 600).unwrap();
    require_one_credential(&engine);

    let result = engine
        .batch("auth")
        .set("auth.session.timeout", 1200)
        .set("auth.credentials.magic_link.enabled", false)
        .set("auth.credentials.email_password.enabled", false)
        .commit();

    assert!(result.is_err());
    assert_eq!(engine.get("auth.session.timeout"), Some(SettingValue::Int(600)));
    assert_eq!(
        engine.get("auth.credentials.magic_link.enabled"),
        Some(SettingValue::Bool(true))
    );
    assert_eq!(
        engine.store().get_raw("auth.session.timeout").unwrap().as_deref(),
        Some("600")
    );
}

#[test]
fn test_validators_see_earlier_batch_writes() {
    let engine = memory_engine();
    require_one_credential(&engine);

    let report = engine
        .batch("auth")
        .set("auth.credentials.email_password.enabled", false)
        .set("auth.credentials.magic_link.enabled", true)
        .commit()
        .unwrap();
    assert_eq!(report.changed, vec!["auth.credentials.email_password.enabled"]);

    // The last pair is judged against the magic link write before it
    let result = engine
        .batch("auth")
        .set("auth.credentials.email_password.enabled", true)
        .set("auth.credentials.magic_link.enabled", false)
        .set("auth.credentials.email_password.enabled", false)
        .commit();
    assert!(result.is_err());
    assert_eq!(
        engine.get("auth.credentials.email_password.enabled"),
        Some(SettingValue::Bool(false))
    );
    assert_eq!(
        engine.get("auth.credentials.magic_link.enabled"),
        Some(SettingValue::Bool(true))
    );
}

#[test]
fn test_dependency_gating_in_batch() {
    let engine = memory_engine();
    engine.set("auth.oauth.enabled", true).unwrap();

    for order in [["auth.oauth.enabled", "auth.oauth.client_id"], ["auth.oauth.client_id", "auth.oauth.enabled"]] {
        let mut batch = engine.batch("auth");
        for key in order {
            batch = match key {
                "auth.oauth.enabled" => batch.set(key, false),
                _ => batch.set(key, "client-42"),
            };
        }
        let report = batch.commit().unwrap();

        assert_eq!(
            report.skipped,
            vec![("auth.oauth.client_id".to_string(), FieldState::DisabledByDependency)]
        );
        assert_eq!(engine.get("auth.oauth.client_id"), Some("".into()));

        engine.set("auth.oauth.enabled", true).unwrap();
    }
}

fn chained_engine() -> EngineContext<MemoryStore> {
    let engine = EngineContext::builder(MemoryStore::new()).build().unwrap();
    engine
        .registry()
        .define("mail", |s| {
            s.setting(Definition::boolean("smtp.enabled", true))?
                .setting(Definition::boolean("smtp.auth", false).depends_on("mail.smtp.enabled"))?
                .setting(Definition::string("smtp.user", "").depends_on("mail.smtp.auth"))
        })
        .unwrap();
    engine
}

#[test]
fn test_skipped_gate_does_not_enable_its_dependents() {
    let engine = chained_engine();

    let report = engine
        .batch("mail")
        .set("mail.smtp.enabled", false)
        .set("mail.smtp.auth", true)
        .set("mail.smtp.user", "changed")
        .commit()
        .unwrap();

    assert_eq!(report.changed, vec!["mail.smtp.enabled"]);
    assert_eq!(
        report.skipped,
        vec![
            ("mail.smtp.auth".to_string(), FieldState::DisabledByDependency),
            ("mail.smtp.user".to_string(), FieldState::DisabledByDependency),
        ]
    );
    assert_eq!(engine.get("mail.smtp.auth"), Some(SettingValue::Bool(false)));
    assert_eq!(engine.get("mail.smtp.user"), Some("".into()));
    assert_eq!(
        engine.field_state("mail.smtp.user").unwrap(),
        FieldState::DisabledByDependency
    );
}

#[test]
fn test_written_gate_enables_its_dependents() {
    let engine = chained_engine();

    // Dependents first: gating follows what the batch writes, not pair order
    let report = engine
        .batch("mail")
        .set("mail.smtp.user", "mailer")
        .set("mail.smtp.auth", true)
        .commit()
        .unwrap();

    assert_eq!(report.changed, vec!["mail.smtp.user", "mail.smtp.auth"]);
    assert!(report.skipped.is_empty());
    assert_eq!(engine.get("mail.smtp.user"), Some("mailer".into()));
    assert_eq!(engine.field_state("mail.smtp.user").unwrap(), FieldState::Editable);
}

#[test]
fn test_locked_gate_keeps_its_current_value() {
    let engine = chained_engine();
    engine.configure(|locks| locks.lock("mail.smtp.auth"));

    let report = engine
        .batch("mail")
        .set("mail.smtp.auth", true)
        .set("mail.smtp.user", "mailer")
        .commit()
        .unwrap();

    assert!(report.changed.is_empty());
    assert_eq!(
        report.skipped,
        vec![
            ("mail.smtp.auth".to_string(), FieldState::Locked),
            ("mail.smtp.user".to_string(), FieldState::DisabledByDependency),
        ]
    );
}

#[test]
fn test_locked_pair_is_ignored_not_rejected() {
    let engine = memory_engine();
    engine.configure(|locks| locks.lock("auth.session.timeout"));

    let report = engine
        .batch("auth")
        .set("auth.session.timeout", 60)
        .set("auth.password.hash", "scrypt")
        .commit()
        .unwrap();

    assert_eq!(report.changed, vec!["auth.password.hash"]);
    assert_eq!(
        report.skipped,
        vec![("auth.session.timeout".to_string(), FieldState::Locked)]
    );
    assert_eq!(engine.get("auth.session.timeout"), Some(SettingValue::Int(3600)));
}

#[test]
fn test_listeners_only_hear_committed_batches() {
    let engine = memory_engine();
    let notified = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&notified);
    engine.events().on_change(move |_, _, _| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let failed = engine
        .batch("auth")
        .set("auth.session.timeout", 900)
        .set("auth.password.hash", "md5")
        .commit();
    assert!(failed.is_err());
    assert_eq!(notified.load(Ordering::SeqCst), 0);

    engine
        .batch("auth")
        .set("auth.session.timeout", 900)
        .set("auth.password.hash", "scrypt")
        .commit()
        .unwrap();
    assert_eq!(notified.load(Ordering::SeqCst), 2);
}

#[test]
fn test_empty_batch_is_a_noop() {
    let (engine, store) = counting_engine();
    let batch = engine.batch("auth");
    assert!(batch.is_empty());

    let report = batch.commit().unwrap();
    assert!(report.is_noop());
    assert_eq!(store.writes(), 0);
}

// =============================================================================
// Store failures
// =============================================================================

/// Store that refuses writes to one key
struct FailingStore {
    inner: MemoryStore,
    poisoned_key: &'static str,
}

impl ValueStore for FailingStore {
    fn get_raw(&self, full_key: &str) -> Result<Option<String>> {
        self.inner.get_raw(full_key)
    }

    fn set_raw(&self, full_key: &str, value: &str) -> Result<()> {
        if full_key == self.poisoned_key {
            return Err(Error::Store(format!("write to {full_key} refused")));
        }
        self.inner.set_raw(full_key, value)
    }

    fn remove_raw(&self, full_key: &str) -> Result<()> {
        self.inner.remove_raw(full_key)
    }

    fn all_raw(&self) -> Result<BTreeMap<String, String>> {
        self.inner.all_raw()
    }

    fn run_in_transaction(&self, body: &mut dyn FnMut() -> Result<()>) -> Result<()> {
        self.inner.run_in_transaction(body)
    }
}

#[test]
fn test_store_failure_rolls_back_batch() {
    let engine = EngineContext::builder(FailingStore {
        inner: MemoryStore::new(),
        poisoned_key: "net.http.port",
    })
    .build()
    .unwrap();
    engine
        .registry()
        .define("net", |s| {
            s.setting(Definition::string("http.host", "0.0.0.0"))?
                .setting(Definition::integer("http.port", 8080))
        })
        .unwrap();

    let err = engine
        .batch("net")
        .set("net.http.host", "127.0.0.1")
        .set("net.http.port", 9090)
        .commit()
        .unwrap_err();

    assert!(err.is_store_error());
    assert_eq!(engine.get("net.http.host"), Some("0.0.0.0".into()));
    assert!(engine.store().all_raw().unwrap().is_empty());

    // Single writes surface the store error and leave the cache alone
    assert!(engine.set("net.http.port", 9090).is_err());
    assert_eq!(engine.get("net.http.port"), Some(SettingValue::Int(8080)));
}
