//! Category → schema registry
//!
//! Modules register their schemas during bootstrap in any order. Registering a
//! category twice merges the schemas: a definition with an existing key
//! replaces it in place (last write wins), new keys are appended. The order
//! of definitions drives UI grouping, so it is stable across merges.

use super::key::FullKey;
use super::schema::{Definition, Schema};
use crate::error::{Error, Result};
use crate::sync::RwLockExt;
use log::{debug, info};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// Problems found by [`Registry::dependency_issues`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyIssue {
    /// Following `depends_on` from the first key leads back to it
    Cycle { chain: Vec<String> },
    /// `depends_on` names a setting no module has registered
    MissingTarget { key: String, target: String },
}

#[derive(Default)]
struct RegistryState {
    order: Vec<String>,
    schemas: HashMap<String, Schema>,
}

/// Process-wide map of category → [`Schema`], shared by every module
#[derive(Default)]
pub struct Registry {
    state: RwLock<RegistryState>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or merge) a schema. Never fails on duplicate categories.
    pub fn register(&self, schema: Schema) {
        let category = schema.category().to_string();
        let count = schema.len();
        let mut state = self.state.write_recovered();
        match state.schemas.get_mut(&category) {
            Some(existing) => {
                existing.merge(schema);
                info!("Merged {count} setting(s) into category '{category}'");
            }
            None => {
                state.order.push(category.clone());
                state.schemas.insert(category.clone(), schema);
                info!("Registered category '{category}' with {count} setting(s)");
            }
        }
    }

    /// Build a fresh schema for `category` and register it.
    ///
    /// # Example
    ///
    /// ```
    /// use modset::{Definition, Registry};
    ///
    /// let registry = Registry::new();
    /// registry.define("billing", |schema| {
    ///     schema
    ///         .setting(Definition::boolean("invoices.enabled", true))?
    ///         .setting(Definition::integer("invoices.due_days", 30))
    /// })?;
    /// assert!(registry.find_definition("billing.invoices.due_days").is_some());
    /// # Ok::<(), modset::Error>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Propagates the builder's `Error::InvalidDefinition`; nothing is
    /// registered in that case.
    pub fn define<F>(&self, category: &str, build: F) -> Result<()>
    where
        F: FnOnce(Schema) -> Result<Schema>,
    {
        let schema = build(Schema::new(category))?;
        self.register(schema);
        Ok(())
    }

    /// Snapshot of all category names in registration order
    pub fn categories(&self) -> Vec<String> {
        self.state.read_recovered().order.clone()
    }

    /// Clone of a category's schema
    pub fn schema(&self, category: &str) -> Option<Schema> {
        self.state.read_recovered().schemas.get(category).cloned()
    }

    /// Look up a definition by full key; `None` for anything unregistered
    pub fn find_definition(&self, full_key: &str) -> Option<Arc<Definition>> {
        let key = FullKey::parse(full_key)?;
        self.find(&key)
    }

    /// Look up a definition by parsed key
    pub fn find(&self, key: &FullKey) -> Option<Arc<Definition>> {
        let state = self.state.read_recovered();
        state
            .schemas
            .get(key.category())
            .and_then(|schema| schema.get(key.key()))
            .cloned()
    }

    /// Definitions of `category` grouped by their display group.
    ///
    /// Groups appear in first-seen order and definitions keep registration
    /// order inside their group. Unknown categories yield an empty list.
    pub fn grouped_definitions(&self, category: &str) -> Vec<(String, Vec<Arc<Definition>>)> {
        let state = self.state.read_recovered();
        let Some(schema) = state.schemas.get(category) else {
            return Vec::new();
        };

        let mut groups: Vec<(String, Vec<Arc<Definition>>)> = Vec::new();
        for def in schema.definitions() {
            match groups.iter_mut().find(|(label, _)| *label == def.group) {
                Some((_, members)) => members.push(Arc::clone(def)),
                None => groups.push((def.group.clone(), vec![Arc::clone(def)])),
            }
        }
        groups
    }

    /// Follow `depends_on` from `full_key`, returning the visited chain.
    ///
    /// # Errors
    ///
    /// `Error::DependencyCycle` if a key repeats along the way.
    pub fn dependency_chain(&self, full_key: &str) -> Result<Vec<String>> {
        let mut chain = vec![full_key.to_string()];
        let mut seen: HashSet<String> = HashSet::from([full_key.to_string()]);
        let mut current = self.find_definition(full_key);

        while let Some(target) = current.and_then(|def| def.depends_on.clone()) {
            chain.push(target.clone());
            if !seen.insert(target.clone()) {
                return Err(Error::DependencyCycle {
                    key: full_key.to_string(),
                    chain,
                });
            }
            current = self.find_definition(&target);
        }
        Ok(chain)
    }

    /// Pre-flight check of every `depends_on` edge, without raising.
    ///
    /// Reports each distinct cycle once and every edge whose target is not
    /// registered (yet).
    pub fn dependency_issues(&self) -> Vec<DependencyIssue> {
        let edges: Vec<(String, String)> = {
            let state = self.state.read_recovered();
            state
                .order
                .iter()
                .filter_map(|category| state.schemas.get(category))
                .flat_map(|schema| {
                    schema.definitions().iter().filter_map(|def| {
                        def.depends_on
                            .as_ref()
                            .map(|target| (format!("{}.{}", schema.category(), def.key), target.clone()))
                    })
                })
                .collect()
        };

        let mut issues = Vec::new();
        let mut cycle_members: HashSet<String> = HashSet::new();
        for (key, target) in &edges {
            if self.find_definition(target).is_none() {
                issues.push(DependencyIssue::MissingTarget {
                    key: key.clone(),
                    target: target.clone(),
                });
                continue;
            }
            if cycle_members.contains(key) {
                continue;
            }
            if let Err(Error::DependencyCycle { chain, .. }) = self.dependency_chain(key) {
                // Only report a cycle from a key that is actually on it
                if chain.last() == Some(key) {
                    cycle_members.extend(chain.iter().cloned());
                    issues.push(DependencyIssue::Cycle { chain });
                }
            }
        }
        debug!("Dependency pre-flight found {} issue(s)", issues.len());
        issues
    }

    /// Total number of registered definitions
    pub fn len(&self) -> usize {
        self.state
            .read_recovered()
            .schemas
            .values()
            .map(Schema::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(any(test, feature = "test-util"))]
    pub(crate) fn clear(&self) {
        let mut state = self.state.write_recovered();
        state.order.clear();
        state.schemas.clear();
    }
}
