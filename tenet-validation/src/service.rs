//! Validation service
//!
//! Runs field-constraint validators, then declared validators, then any
//! tenant-configured validators, one at a time and in that order. Every
//! issue is collected; only an unexpected failure stops the run.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use tenet_core::{
    GuardFailurePolicy, Operation, QueryCapability, Record, UserContext, ValidationIssue,
    ValidationResult, ValidatorDefinition,
};
use tenet_dsl::ExpressionEngine;

use crate::error::{EngineError, EngineResult, ValidatorResult};
use crate::field_constraints::FieldConstraintValidator;
use crate::registry::ValidatorRegistry;
use crate::validator::{ValidationContext, Validator};

/// Source of validators configured per tenant at runtime.
#[async_trait]
pub trait ConfiguredValidatorLoader: Send + Sync {
    async fn load(&self, entity: &str, tenant_id: &str) -> ValidatorResult<Vec<ValidatorDefinition>>;
}

/// Validates records against a shared registry.
#[derive(Clone)]
pub struct ValidationService {
    registry: Arc<ValidatorRegistry>,
    query: Arc<dyn QueryCapability>,
    engine: ExpressionEngine,
    guard_policy: GuardFailurePolicy,
    loader: Option<Arc<dyn ConfiguredValidatorLoader>>,
}

impl ValidationService {
    pub fn new(
        registry: Arc<ValidatorRegistry>,
        query: Arc<dyn QueryCapability>,
        engine: ExpressionEngine,
    ) -> Self {
        Self {
            registry,
            query,
            engine,
            guard_policy: GuardFailurePolicy::Skip,
            loader: None,
        }
    }

    pub fn with_guard_policy(mut self, policy: GuardFailurePolicy) -> Self {
        self.guard_policy = policy;
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn ConfiguredValidatorLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn registry(&self) -> &ValidatorRegistry {
        &self.registry
    }

    pub fn engine(&self) -> &ExpressionEngine {
        &self.engine
    }

    /// Context for one record, wired to this service's query capability.
    pub fn context<'a>(
        &'a self,
        entity: &'a str,
        operation: Operation,
        record: &'a Record,
        original: Option<&'a Record>,
        user: Option<&'a UserContext>,
    ) -> ValidationContext<'a> {
        ValidationContext::new(entity, operation, record, self.query.as_ref(), &self.engine)
            .with_original(original)
            .with_user(user)
            .with_guard_policy(self.guard_policy)
    }

    /// Run every applicable validator and collect the issues.
    pub async fn validate(
        &self,
        ctx: &ValidationContext<'_>,
        definitions: &[ValidatorDefinition],
        field_validators: &[FieldConstraintValidator],
    ) -> EngineResult<ValidationResult> {
        let mut issues: Vec<ValidationIssue> = Vec::new();

        for validator in field_validators {
            let found = validator
                .validate(ctx)
                .await
                .map_err(|e| EngineError::from_validator(&validator.field().name, e))?;
            issues.extend(found);
        }

        self.run_declared(ctx, definitions, &mut issues).await?;

        if let (Some(loader), Some(tenant_id)) = (&self.loader, ctx.tenant_id()) {
            let configured = loader
                .load(ctx.entity, tenant_id)
                .await
                .map_err(|source| EngineError::Loader {
                    entity: ctx.entity.to_string(),
                    source,
                })?;
            tracing::debug!(
                entity = %ctx.entity,
                tenant_id = %tenant_id,
                count = configured.len(),
                "Loaded configured validators"
            );
            self.run_declared(ctx, &configured, &mut issues).await?;
        }

        let result = ValidationResult::from_issues(issues);
        tracing::debug!(
            entity = %ctx.entity,
            operation = %ctx.operation,
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "Validation complete"
        );
        Ok(result)
    }

    async fn run_declared(
        &self,
        ctx: &ValidationContext<'_>,
        definitions: &[ValidatorDefinition],
        issues: &mut Vec<ValidationIssue>,
    ) -> EngineResult<()> {
        for definition in definitions {
            let name = definition.validator_type.as_str();
            let validator = self
                .registry
                .create(definition)
                .map_err(|e| EngineError::from_validator(name, e))?;
            let found = validator
                .validate(ctx)
                .await
                .map_err(|e| EngineError::from_validator(name, e))?;
            issues.extend(found);
        }
        Ok(())
    }
}

impl fmt::Debug for ValidationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationService")
            .field("registry", &self.registry)
            .field("guard_policy", &self.guard_policy)
            .field("has_loader", &self.loader.is_some())
            .finish_non_exhaustive()
    }
}
