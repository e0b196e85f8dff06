//! Write pipeline
//!
//! Sequences one record write around the caller's persistence step:
//!
//! 1. [`WritePipeline::prepare_write`]: defaults, validation, warning
//!    acknowledgment and `beforeSave`/`beforeDelete` hooks.
//! 2. The caller persists the record.
//! 3. [`WritePipeline::complete_write`]: `afterSave` hooks, then
//!    `afterCommit` hooks.

use std::sync::Arc;

use serde::Serialize;

use tenet_core::{
    ConfigResult, EngineConfig, EntityModel, HookPoint, Operation, QueryCapability, Record,
    UserContext, ValidationIssue, ValidationResult,
};
use tenet_dsl::ExpressionEngine;
use tenet_hooks::{HookContext, HookRegistry, HookService, HookServices};

use crate::acknowledgment::WarningAcknowledgmentService;
use crate::defaulting::DefaultingService;
use crate::error::EngineResult;
use crate::lifecycle::EntityLifecycle;
use crate::registry::ValidatorRegistry;
use crate::service::ValidationService;

// ============================================================================
// REQUEST AND OUTCOMES
// ============================================================================

/// One record write as submitted by a caller.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    pub operation: Operation,
    pub record: Record,
    /// Stored record on update and delete
    pub original: Option<Record>,
    pub user: Option<UserContext>,
    /// Token echoed back after a warning round trip
    pub acknowledgment: Option<String>,
}

impl WriteRequest {
    pub fn create(record: Record) -> Self {
        Self {
            operation: Operation::Create,
            record,
            original: None,
            user: None,
            acknowledgment: None,
        }
    }

    pub fn update(record: Record, original: Record) -> Self {
        Self {
            operation: Operation::Update,
            original: Some(original),
            ..Self::create(record)
        }
    }

    /// Delete of a stored record; validators see the stored values.
    pub fn delete(stored: Record) -> Self {
        Self {
            operation: Operation::Delete,
            original: Some(stored.clone()),
            ..Self::create(stored)
        }
    }

    pub fn with_user(mut self, user: UserContext) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_acknowledgment(mut self, token: impl Into<String>) -> Self {
        self.acknowledgment = Some(token.into());
        self
    }
}

/// Result of preparing a write.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum WriteOutcome {
    /// Errors block the write
    Rejected(ValidationResult),
    /// Warnings only; resubmit the returned record with the token
    NeedsAcknowledgment {
        record: Record,
        result: ValidationResult,
        token: String,
    },
    /// A hook refused the write
    Aborted { reason: String },
    /// Ready to persist
    Ready {
        operation: Operation,
        record: Record,
        acknowledged_warnings: Vec<ValidationIssue>,
    },
}

impl WriteOutcome {
    /// HTTP-style status for transport layers.
    pub fn status_code(&self) -> u16 {
        match self {
            WriteOutcome::Rejected(_) | WriteOutcome::Aborted { .. } => 422,
            WriteOutcome::NeedsAcknowledgment { .. } => 202,
            WriteOutcome::Ready {
                operation: Operation::Create,
                ..
            } => 201,
            WriteOutcome::Ready { .. } => 200,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, WriteOutcome::Ready { .. })
    }

    /// Abort reason as a validation error, for callers that report every
    /// failure in one shape.
    pub fn abort_issue(&self) -> Option<ValidationIssue> {
        match self {
            WriteOutcome::Aborted { reason } => Some(ValidationIssue::error(reason.clone(), "HOOK_ABORT")),
            _ => None,
        }
    }
}

/// Result of the post-persistence hooks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum Completion {
    /// `afterSave` hooks passed; carries any fields they updated
    Committed { record: Record },
    /// An `afterSave` hook refused; the caller should roll back
    Aborted { reason: String },
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Runs the write lifecycle for any entity.
#[derive(Debug, Clone)]
pub struct WritePipeline {
    lifecycle: EntityLifecycle,
    acknowledgments: WarningAcknowledgmentService,
    hooks: HookService,
    services: Option<HookServices>,
}

impl WritePipeline {
    pub fn new(
        lifecycle: EntityLifecycle,
        acknowledgments: WarningAcknowledgmentService,
        hooks: HookService,
    ) -> Self {
        Self {
            lifecycle,
            acknowledgments,
            hooks,
            services: None,
        }
    }

    /// Wire every service from configuration and the startup registries.
    pub fn from_config(
        config: &EngineConfig,
        validators: Arc<ValidatorRegistry>,
        hooks: Arc<HookRegistry>,
        query: Arc<dyn QueryCapability>,
    ) -> ConfigResult<Self> {
        config.validate()?;
        let policy = config.guards.on_error;
        let engine = ExpressionEngine::with_builtins();

        let lifecycle = EntityLifecycle::new(
            DefaultingService::new(engine.clone()).with_guard_policy(policy),
            ValidationService::new(validators, query.clone(), engine.clone()).with_guard_policy(policy),
        );
        let acknowledgments = WarningAcknowledgmentService::from_config(config)?;
        let hooks = HookService::new(hooks, engine)
            .with_query(query)
            .with_guard_policy(policy);

        Ok(Self::new(lifecycle, acknowledgments, hooks))
    }

    /// Handle passed through to hooks untouched.
    pub fn with_services(mut self, services: HookServices) -> Self {
        self.services = Some(services);
        self
    }

    pub fn lifecycle(&self) -> &EntityLifecycle {
        &self.lifecycle
    }

    pub fn acknowledgments(&self) -> &WarningAcknowledgmentService {
        &self.acknowledgments
    }

    /// Everything that happens before the caller persists.
    pub async fn prepare_write(
        &self,
        entity: &EntityModel,
        request: WriteRequest,
    ) -> EngineResult<WriteOutcome> {
        let WriteRequest {
            operation,
            record,
            original,
            user,
            acknowledgment,
        } = request;

        let prepared = self
            .lifecycle
            .prepare(entity, operation, &record, original.as_ref(), user.as_ref())
            .await?;
        let mut validation = prepared.validation;

        if !validation.valid {
            tracing::info!(
                entity = %entity.name,
                operation = %operation,
                errors = validation.errors.len(),
                "Write rejected by validation"
            );
            return Ok(WriteOutcome::Rejected(validation));
        }

        if validation.has_warnings() {
            match acknowledgment.as_deref() {
                None => {
                    let token = self.acknowledgments.generate_token(
                        &entity.name,
                        &prepared.record,
                        &validation.warnings,
                    );
                    validation.acknowledgment_token = Some(token.clone());
                    return Ok(WriteOutcome::NeedsAcknowledgment {
                        record: prepared.record,
                        result: validation,
                        token,
                    });
                }
                Some(token) => {
                    self.acknowledgments.verify_token(
                        token,
                        &entity.name,
                        &prepared.record,
                        &validation.warnings,
                    )?;
                }
            }
        }

        let point = if operation == Operation::Delete {
            HookPoint::BeforeDelete
        } else {
            HookPoint::BeforeSave
        };
        let mut ctx = self.hook_context(entity, operation, prepared.record, original, user);
        if let Some(reason) = self.run_point(entity, point, &mut ctx).await? {
            return Ok(WriteOutcome::Aborted { reason });
        }

        Ok(WriteOutcome::Ready {
            operation,
            record: ctx.record,
            acknowledged_warnings: validation.warnings,
        })
    }

    /// Post-persistence hooks: `afterSave`, then `afterCommit` unless an
    /// `afterSave` hook aborted.
    pub async fn complete_write(
        &self,
        entity: &EntityModel,
        operation: Operation,
        record: Record,
        original: Option<Record>,
        user: Option<UserContext>,
    ) -> EngineResult<Completion> {
        let mut ctx = self.hook_context(entity, operation, record, original, user);

        if let Some(reason) = self.run_point(entity, HookPoint::AfterSave, &mut ctx).await? {
            return Ok(Completion::Aborted { reason });
        }

        // Failures here are logged by the hook service and never surface
        if let Err(e) = self
            .hooks
            .run_entity_hooks(entity, HookPoint::AfterCommit, &mut ctx)
            .await
        {
            tracing::error!(entity = %entity.name, error = %e, "afterCommit hooks failed");
        }

        Ok(Completion::Committed { record: ctx.record })
    }

    fn hook_context(
        &self,
        entity: &EntityModel,
        operation: Operation,
        record: Record,
        original: Option<Record>,
        user: Option<UserContext>,
    ) -> HookContext {
        let ctx = HookContext::new(entity.name.as_str(), operation, record)
            .with_original(original)
            .with_user(user);
        match &self.services {
            Some(services) => ctx.with_services(services.clone()),
            None => ctx,
        }
    }

    /// Run one point; `Some(reason)` when a hook aborted.
    async fn run_point(
        &self,
        entity: &EntityModel,
        point: HookPoint,
        ctx: &mut HookContext,
    ) -> EngineResult<Option<String>> {
        let result = self.hooks.run_entity_hooks(entity, point, ctx).await?;
        Ok(result.and_then(|r| r.abort))
    }
}
