//! Core schema types
//!
//! This module contains the foundational types for setting registration:
//! - `FullKey` - Parsed `category.key` identifier
//! - `SettingValue` - Typed value plus the shared `truthy` predicate
//! - `Definition` / `Schema` - Per-setting metadata and per-category collections
//! - `Registry` - Category → schema map with merge semantics

mod key;
mod registry;
mod schema;
mod value;

pub use key::{FullKey, SEPARATOR};
pub use registry::{DependencyIssue, Registry};
pub use schema::{Definition, EnumProvider, EnumSource, Schema, SettingType};
pub use value::{SettingValue, truthy};
