//! Entity lifecycle: defaults, then validation, for one record operation
//!
//! Nothing here persists. The prepared record and its validation result
//! go back to the caller, who decides what to store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tenet_core::{EntityModel, Operation, Record, UserContext, ValidationResult};

use crate::defaulting::DefaultingService;
use crate::error::EngineResult;
use crate::field_constraints::generate_field_validators;
use crate::interpolation::MessageInterpolator;
use crate::metadata::{auto_fields, relation_validators, static_defaults};
use crate::service::ValidationService;

/// A prepared record and the outcome of validating it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleResult {
    pub record: Record,
    pub validation: ValidationResult,
}

/// Orchestrates defaulting and validation for an entity.
#[derive(Debug, Clone)]
pub struct EntityLifecycle {
    defaulting: DefaultingService,
    validation: ValidationService,
}

impl EntityLifecycle {
    pub fn new(defaulting: DefaultingService, validation: ValidationService) -> Self {
        Self {
            defaulting,
            validation,
        }
    }

    pub fn validation(&self) -> &ValidationService {
        &self.validation
    }

    /// Apply defaults and run every validator layer.
    ///
    /// On delete the stored record is validated as given: no defaults, no
    /// auto fields and no field constraints, only validators declared for
    /// delete.
    pub async fn prepare(
        &self,
        entity: &EntityModel,
        operation: Operation,
        record: &Record,
        original: Option<&Record>,
        user: Option<&UserContext>,
    ) -> EngineResult<LifecycleResult> {
        self.prepare_at(entity, operation, record, original, user, Utc::now())
            .await
    }

    /// [`prepare`](Self::prepare) with an explicit clock for auto fields.
    pub async fn prepare_at(
        &self,
        entity: &EntityModel,
        operation: Operation,
        record: &Record,
        original: Option<&Record>,
        user: Option<&UserContext>,
        now: DateTime<Utc>,
    ) -> EngineResult<LifecycleResult> {
        let (prepared, field_validators) = if operation == Operation::Delete {
            (record.clone(), Vec::new())
        } else {
            let prepared = self.defaulting.apply_defaults(
                record,
                &static_defaults(entity),
                operation,
                original,
                user,
            )?;
            let prepared = self
                .defaulting
                .apply_defaults(&prepared, &entity.defaults, operation, original, user)?;
            let prepared = self.defaulting.apply_auto_fields(
                &prepared,
                operation,
                &auto_fields(entity),
                user,
                now,
            );
            (prepared, generate_field_validators(entity))
        };

        let mut definitions = entity.validators.clone();
        definitions.extend(relation_validators(entity));

        let ctx = self
            .validation
            .context(&entity.name, operation, &prepared, original, user);
        let result = self
            .validation
            .validate(&ctx, &definitions, &field_validators)
            .await?;

        let validation = MessageInterpolator::for_entity(entity).apply(result, &prepared, original);

        tracing::debug!(
            entity = %entity.name,
            operation = %operation,
            valid = validation.valid,
            warnings = validation.warnings.len(),
            "Record prepared"
        );

        Ok(LifecycleResult {
            record: prepared,
            validation,
        })
    }
}
