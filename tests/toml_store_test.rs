//! TOML storage backend behind the file store

#![cfg(feature = "toml")]

mod common;

use common::auth_schema;
use modset::{EngineContext, FileStore, SettingValue, TomlStorage};
use tempfile::TempDir;

#[test]
fn test_toml_store_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("settings.toml");

    {
        let store = FileStore::with_storage(&path, TomlStorage::new()).unwrap();
        let engine = EngineContext::builder(store)
            .with_builtin(auth_schema())
            .build()
            .unwrap();
        engine.set("auth.session.timeout", 1800).unwrap();
        engine.set("auth.password.hash", "scrypt").unwrap();
    }

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(
        content.contains("\"auth.session.timeout\" = \"1800\""),
        "dotted keys stay flat: {content}"
    );

    let store = FileStore::with_storage(&path, TomlStorage::new()).unwrap();
    let engine = EngineContext::builder(store)
        .with_builtin(auth_schema())
        .build()
        .unwrap();
    assert_eq!(engine.get("auth.session.timeout"), Some(SettingValue::Int(1800)));
    assert_eq!(engine.get("auth.password.hash"), Some("scrypt".into()));
}
