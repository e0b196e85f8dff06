//! Function registry
//!
//! The catalog is an explicit value built at startup and shared by
//! reference. Registration is idempotent: the first definition of a name wins.

pub mod builtins;
pub mod definition;
pub mod query;

pub use builtins::builtin_functions;
pub use definition::*;
pub use query::*;

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::error::{EvalError, EvalResult};

// ============================================================================
// REGISTRY
// ============================================================================

/// Named functions available to expressions.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionDefinition>,
    order: Vec<String>,
}

impl FunctionRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the standard catalog.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for def in builtin_functions() {
            registry.register(def);
        }
        registry
    }

    /// Add a function. Returns `false` and keeps the existing definition if
    /// the name is already taken.
    pub fn register(&mut self, def: FunctionDefinition) -> bool {
        if self.functions.contains_key(&def.name) {
            return false;
        }
        self.order.push(def.name.clone());
        self.functions.insert(def.name.clone(), def);
        true
    }

    pub fn get(&self, name: &str) -> Option<&FunctionDefinition> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Look up a function or fail with `UnknownFunction`.
    pub fn resolve(&self, name: &str) -> EvalResult<&FunctionDefinition> {
        self.get(name).ok_or_else(|| EvalError::UnknownFunction {
            name: name.to_string(),
        })
    }

    /// All functions in registration order.
    pub fn list(&self) -> Vec<&FunctionDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.functions.get(name))
            .collect()
    }

    pub fn list_client_evaluable(&self) -> Vec<&FunctionDefinition> {
        self.list().into_iter().filter(|f| f.client_evaluable).collect()
    }

    pub fn list_by_category(&self, category: FunctionCategory) -> Vec<&FunctionDefinition> {
        self.list()
            .into_iter()
            .filter(|f| f.category == category)
            .collect()
    }

    /// Catalog for clients that mirror the safe subset.
    pub fn export_documentation(&self) -> FunctionCatalog {
        let functions: Vec<FunctionDefinition> = self.list().into_iter().cloned().collect();

        let mut by_category: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for f in &functions {
            by_category
                .entry(f.category.to_string())
                .or_default()
                .push(f.name.clone());
        }

        let client_evaluable = functions
            .iter()
            .filter(|f| f.client_evaluable)
            .map(|f| f.name.clone())
            .collect();

        FunctionCatalog {
            functions,
            by_category,
            client_evaluable,
        }
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Serializable function documentation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCatalog {
    pub functions: Vec<FunctionDefinition>,
    pub by_category: BTreeMap<String, Vec<String>>,
    pub client_evaluable: Vec<String>,
}
