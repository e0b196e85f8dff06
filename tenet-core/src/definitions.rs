//! Declarative rule descriptors
//!
//! Validators, defaults and hooks arrive from the external configuration
//! layer as these plain structures. The engine treats them as read-only.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{default_operations, DefaultPolicy, Operation, Severity, Value};

// ============================================================================
// VALIDATOR DEFINITION
// ============================================================================

/// A declared validator: type name, parameters, shared metadata and guard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorDefinition {
    #[serde(rename = "type")]
    pub validator_type: String,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default = "default_operations")]
    pub on: Vec<Operation>,
    #[serde(default)]
    pub when: Option<String>,
}

impl ValidatorDefinition {
    pub fn new(validator_type: impl Into<String>) -> Self {
        Self {
            validator_type: validator_type.into(),
            params: BTreeMap::new(),
            message: None,
            code: None,
            severity: Severity::Error,
            on: default_operations(),
            when: None,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn on(mut self, operations: impl Into<Vec<Operation>>) -> Self {
        self.on = operations.into();
        self
    }

    pub fn when(mut self, guard: impl Into<String>) -> Self {
        self.when = Some(guard.into());
        self
    }

    pub fn applies_to(&self, operation: Operation) -> bool {
        self.on.contains(&operation)
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key).filter(|v| !v.is_null())
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.param(key).and_then(Value::as_str)
    }

    pub fn param_bool(&self, key: &str) -> Option<bool> {
        match self.param(key)? {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// A parameter given either as one string or as a list of strings.
    pub fn param_str_list(&self, key: &str) -> Vec<String> {
        match self.param(key) {
            Some(Value::String(s)) => vec![s.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }
}

// ============================================================================
// DEFAULT DEFINITION
// ============================================================================

/// A declared default: literal value or expression, write policy and guard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultDefinition {
    pub field: String,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub expression: Option<String>,
    #[serde(default)]
    pub policy: DefaultPolicy,
    #[serde(default)]
    pub when: Option<String>,
    #[serde(default = "default_operations")]
    pub on: Vec<Operation>,
}

impl DefaultDefinition {
    /// Default with a literal value.
    pub fn value(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: Some(value.into()),
            expression: None,
            policy: DefaultPolicy::Default,
            when: None,
            on: default_operations(),
        }
    }

    /// Default computed from an expression.
    pub fn expression(field: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: None,
            expression: Some(expression.into()),
            policy: DefaultPolicy::Default,
            when: None,
            on: default_operations(),
        }
    }

    pub fn with_policy(mut self, policy: DefaultPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn when(mut self, guard: impl Into<String>) -> Self {
        self.when = Some(guard.into());
        self
    }

    pub fn on(mut self, operations: impl Into<Vec<Operation>>) -> Self {
        self.on = operations.into();
        self
    }

    pub fn applies_to(&self, operation: Operation) -> bool {
        self.on.contains(&operation)
    }
}

// ============================================================================
// HOOK DEFINITION
// ============================================================================

/// A declared hook invocation at one lifecycle point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookDefinition {
    pub name: String,
    #[serde(default = "default_operations")]
    pub on: Vec<Operation>,
    #[serde(default)]
    pub when: Option<String>,
    #[serde(default)]
    pub description: String,
}

impl HookDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            on: default_operations(),
            when: None,
            description: String::new(),
        }
    }

    pub fn on(mut self, operations: impl Into<Vec<Operation>>) -> Self {
        self.on = operations.into();
        self
    }

    pub fn when(mut self, guard: impl Into<String>) -> Self {
        self.when = Some(guard.into());
        self
    }

    pub fn applies_to(&self, operation: Operation) -> bool {
        self.on.contains(&operation)
    }
}
