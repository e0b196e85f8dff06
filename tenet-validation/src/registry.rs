//! Validator registry and the declaration wrapper
//!
//! Types resolve to either a factory, which is handed the full
//! declaration, or a shared parameterless instance. Factories win when a
//! name is registered both ways.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tenet_core::{ValidationIssue, ValidatorDefinition};

use crate::canned;
use crate::error::{ValidatorError, ValidatorResult};
use crate::validator::{ValidationContext, Validator};

/// Builds a validator from its declaration.
pub type ValidatorFactory =
    Arc<dyn Fn(&ValidatorDefinition) -> ValidatorResult<Arc<dyn Validator>> + Send + Sync>;

/// Catalog of validator types, built once at startup.
#[derive(Default, Clone)]
pub struct ValidatorRegistry {
    factories: HashMap<String, ValidatorFactory>,
    classes: HashMap<String, Arc<dyn Validator>>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the canned validator types.
    pub fn with_canned() -> Self {
        let mut registry = Self::new();
        canned::register_canned(&mut registry);
        registry
    }

    /// Register a parameterless validator.
    ///
    /// Returns `false` and keeps the existing entry if the name is taken.
    pub fn register(&mut self, name: impl Into<String>, validator: impl Validator + 'static) -> bool {
        let name = name.into();
        if self.is_registered(&name) {
            tracing::debug!(validator = %name, "Validator type already registered, ignoring");
            return false;
        }
        self.classes.insert(name, Arc::new(validator));
        true
    }

    /// Register a factory for a parameterized validator type.
    pub fn register_factory<F>(&mut self, name: impl Into<String>, factory: F) -> bool
    where
        F: Fn(&ValidatorDefinition) -> ValidatorResult<Arc<dyn Validator>> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.is_registered(&name) {
            tracing::debug!(validator = %name, "Validator type already registered, ignoring");
            return false;
        }
        self.factories.insert(name, Arc::new(factory));
        true
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.factories.contains_key(name) || self.classes.contains_key(name)
    }

    /// Sorted list of every registered type name.
    pub fn list_registered(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .factories
            .keys()
            .chain(self.classes.keys())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Resolve a declaration into a runnable validator.
    pub fn create(&self, definition: &ValidatorDefinition) -> ValidatorResult<ConfiguredValidator> {
        let name = definition.validator_type.as_str();
        let inner = if let Some(factory) = self.factories.get(name) {
            factory(definition)?
        } else if let Some(validator) = self.classes.get(name) {
            validator.clone()
        } else {
            return Err(ValidatorError::UnknownType {
                validator_type: name.to_string(),
                available: self.list_registered(),
            });
        };

        Ok(ConfiguredValidator {
            definition: definition.clone(),
            inner,
        })
    }
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("types", &self.list_registered())
            .finish()
    }
}

// ============================================================================
// CONFIGURED VALIDATOR
// ============================================================================

/// A validator bound to its declaration.
///
/// Applies the `on` filter and `when` guard, then fills in a missing
/// message from the declaration. Issues emitted without a code take the
/// declared code and severity as well; coded issues keep their own.
#[derive(Clone)]
pub struct ConfiguredValidator {
    definition: ValidatorDefinition,
    inner: Arc<dyn Validator>,
}

impl ConfiguredValidator {
    pub fn definition(&self) -> &ValidatorDefinition {
        &self.definition
    }

    pub fn name(&self) -> &str {
        &self.definition.validator_type
    }

    fn backfill(&self, mut issue: ValidationIssue) -> ValidationIssue {
        if issue.message.is_empty() {
            if let Some(message) = &self.definition.message {
                issue.message = message.clone();
            }
        }
        if issue.code.is_empty() {
            if let Some(code) = &self.definition.code {
                issue.code = code.clone();
            }
            issue.severity = self.definition.severity;
        }
        issue
    }
}

#[async_trait]
impl Validator for ConfiguredValidator {
    async fn validate(&self, ctx: &ValidationContext<'_>) -> ValidatorResult<Vec<ValidationIssue>> {
        if !self.definition.applies_to(ctx.operation) {
            tracing::debug!(
                validator = %self.name(),
                entity = %ctx.entity,
                operation = %ctx.operation,
                "Validator does not apply to operation, skipping"
            );
            return Ok(Vec::new());
        }

        if let Some(guard) = self.definition.when.as_deref() {
            if ctx.condition(guard, self.name()).await? != Some(true) {
                return Ok(Vec::new());
            }
        }

        let issues = self.inner.validate(ctx).await?;
        Ok(issues.into_iter().map(|issue| self.backfill(issue)).collect())
    }
}

impl fmt::Debug for ConfiguredValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfiguredValidator")
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tenet_core::{GuardFailurePolicy, Operation, Record, Severity};
    use tenet_dsl::ExpressionEngine;
    use tenet_test_utils::{record, MockQueryCapability};

    struct AlwaysFails;

    #[async_trait]
    impl Validator for AlwaysFails {
        async fn validate(&self, _ctx: &ValidationContext<'_>) -> ValidatorResult<Vec<ValidationIssue>> {
            Ok(vec![ValidationIssue::error("", "")])
        }
    }

    async fn run(validator: &ConfiguredValidator, operation: Operation, rec: &Record) -> Vec<ValidationIssue> {
        let query = MockQueryCapability::new();
        let engine = ExpressionEngine::with_builtins();
        let ctx = ValidationContext::new("contact", operation, rec, &query, &engine);
        validator.validate(&ctx).await.unwrap()
    }

    #[test]
    fn test_registration_is_idempotent() {
        let mut registry = ValidatorRegistry::new();
        assert!(registry.register("fails", AlwaysFails));
        assert!(!registry.register("fails", AlwaysFails));
        assert_eq!(registry.list_registered(), vec!["fails"]);
    }

    #[test]
    fn test_unknown_type_is_an_error() {
        let registry = ValidatorRegistry::with_canned();
        let err = registry
            .create(&ValidatorDefinition::new("noSuchRule"))
            .unwrap_err();
        match err {
            ValidatorError::UnknownType { validator_type, available } => {
                assert_eq!(validator_type, "noSuchRule");
                assert!(available.contains(&"unique".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_backfills_from_declaration() {
        let mut registry = ValidatorRegistry::new();
        registry.register("fails", AlwaysFails);
        let validator = registry
            .create(
                &ValidatorDefinition::new("fails")
                    .with_message("Check this")
                    .with_code("CHECK")
                    .with_severity(Severity::Warning),
            )
            .unwrap();

        let issues = run(&validator, Operation::Create, &record(json!({}))).await;
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "Check this");
        assert_eq!(issues[0].code, "CHECK");
        assert_eq!(issues[0].severity, Severity::Warning);
    }

    #[tokio::test]
    async fn test_operation_filter_and_guard() {
        let mut registry = ValidatorRegistry::new();
        registry.register("fails", AlwaysFails);

        let update_only = registry
            .create(&ValidatorDefinition::new("fails").on([Operation::Update]))
            .unwrap();
        assert!(run(&update_only, Operation::Create, &record(json!({}))).await.is_empty());

        let guarded = registry
            .create(&ValidatorDefinition::new("fails").when("status == 'active'"))
            .unwrap();
        assert!(run(&guarded, Operation::Create, &record(json!({"status": "lead"}))).await.is_empty());
        assert_eq!(
            run(&guarded, Operation::Create, &record(json!({"status": "active"}))).await.len(),
            1
        );

        // fail-open under the default policy
        let broken = registry
            .create(&ValidatorDefinition::new("fails").when("status > 3"))
            .unwrap();
        assert!(run(&broken, Operation::Create, &record(json!({"status": "x"}))).await.is_empty());
    }

    #[tokio::test]
    async fn test_guard_failure_rejects_under_policy() {
        let mut registry = ValidatorRegistry::new();
        registry.register("fails", AlwaysFails);
        let broken = registry
            .create(&ValidatorDefinition::new("fails").when("status > 3"))
            .unwrap();

        let query = MockQueryCapability::new();
        let engine = ExpressionEngine::with_builtins();
        let rec = record(json!({"status": "x"}));
        let ctx = ValidationContext::new("contact", Operation::Create, &rec, &query, &engine)
            .with_guard_policy(GuardFailurePolicy::Reject);
        assert!(matches!(
            broken.validate(&ctx).await,
            Err(ValidatorError::Guard { .. })
        ));
    }
}
