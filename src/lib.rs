//! # modset - Modular Settings Engine
//!
//! A pluggable setting registry and resolution engine for applications built
//! from independent modules. Each module registers a schema of typed settings
//! under its own category; the engine resolves values (cache → stored
//! override → default), enforces administrative locks, gates settings on
//! other settings, runs cross-field validators and applies batched writes
//! atomically against a durable value store.
//!
//! ## Features
//!
//! - **Schemas**: Typed definitions (`string`, `integer`, `boolean`, `enum`) with
//!   defaults, display groups, descriptions, ranges and patterns
//! - **Merge on register**: Modules register in any order; re-registering a
//!   category merges by key
//! - **Dependency gating**: `depends_on` disables a setting while its target is falsy
//! - **Locks**: Administratively frozen keys refuse every write
//! - **Validators**: Cross-field rules that see the live resolved state
//! - **Atomic batches**: All-or-nothing writes with cache coherence on rollback
//! - **Pluggable storage**: In-memory or file-backed (JSON, TOML, YAML) value stores
//!
//! ## Quick Start
//!
//! ```rust
//! use modset::{Definition, EngineContext, MemoryStore, Schema};
//!
//! let engine = EngineContext::builder(MemoryStore::new()).build()?;
//!
//! engine.registry().register(
//!     Schema::new("auth")
//!         .setting(Definition::boolean("credentials.email_password.enabled", true).group("Credentials"))?
//!         .setting(Definition::integer("session.timeout", 3600).group("Sessions").min(60))?,
//! );
//!
//! engine.set("auth.session.timeout", "7200")?;
//! assert_eq!(engine.get("auth.session.timeout"), Some(7200.into()));
//! # Ok::<(), modset::Error>(())
//! ```
//!
//! ## Validators and Batches
//!
//! ```rust
//! use modset::{Definition, EngineContext, MemoryStore, truthy};
//!
//! let engine = EngineContext::builder(MemoryStore::new()).build()?;
//! engine.registry().define("auth", |s| {
//!     s.setting(Definition::boolean("password.enabled", true))?
//!         .setting(Definition::boolean("magic_link.enabled", true))
//! })?;
//!
//! engine.add_validator("auth.password.enabled", |value, state| {
//!     if truthy(value) || state.is_truthy("auth.magic_link.enabled") {
//!         Ok(())
//!     } else {
//!         Err("at least one sign-in method must remain enabled".into())
//!     }
//! });
//!
//! let result = engine
//!     .batch("auth")
//!     .set("auth.magic_link.enabled", false)
//!     .set("auth.password.enabled", false)
//!     .commit();
//!
//! // The whole batch rolled back
//! assert!(result.is_err());
//! assert_eq!(engine.get("auth.magic_link.enabled"), Some(true.into()));
//! # Ok::<(), modset::Error>(())
//! ```
//!
//! ## Persisting to a File
//!
//! ```rust,no_run
//! use modset::{EngineContext, FileStore};
//!
//! let store = FileStore::open("~/.config/my-app/settings.json")?;
//! let engine = EngineContext::builder(store).build()?;
//! # Ok::<(), modset::Error>(())
//! ```

// Core modules
mod cache;
mod docs;
mod error;
mod events;
mod locks;
mod manager;
mod store;
mod sync;
mod validation;

pub mod security;
pub mod storage;

// Grouped modules
pub mod config;

// Re-exports from core
pub use cache::CacheStrategy;
pub use docs::{DocsConfig, generate_docs};
pub use error::{Error, Result};
pub use events::{ChangeCallback, EventManager};
pub use locks::LockSet;
pub use manager::{Batch, BatchReport, EngineBuilder, EngineContext, FieldState};
pub use storage::{JsonStorage, RawMap, StorageBackend};
pub use store::{FileStore, MemoryStore, ValueStore};
pub use validation::{StateView, Validator, ValidatorSet};

#[cfg(feature = "toml")]
pub use storage::TomlStorage;
#[cfg(feature = "yaml")]
pub use storage::YamlStorage;

// Re-exports from config
pub use config::{
    Definition, DependencyIssue, EnumProvider, EnumSource, FullKey, Registry, Schema,
    SettingType, SettingValue, truthy,
};
