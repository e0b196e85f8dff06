//! Validator trait and the context validators run against

use async_trait::async_trait;
use std::fmt;

use tenet_core::{
    GuardFailurePolicy, Operation, QueryCapability, Record, UserContext, ValidationIssue, Value,
};
use tenet_dsl::{EvaluationContext, ExpressionEngine, ExpressionResult};

use crate::error::{ValidatorError, ValidatorResult};

/// A rule that inspects one record and reports issues.
///
/// An empty list means the record passed. An `Err` is an unexpected
/// failure and aborts the whole operation.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, ctx: &ValidationContext<'_>) -> ValidatorResult<Vec<ValidationIssue>>;
}

/// Everything a validator may read.
#[derive(Clone, Copy)]
pub struct ValidationContext<'a> {
    pub entity: &'a str,
    pub operation: Operation,
    /// Record with defaults already applied
    pub record: &'a Record,
    /// Stored record on update and delete
    pub original: Option<&'a Record>,
    pub user: Option<&'a UserContext>,
    pub query: &'a dyn QueryCapability,
    pub engine: &'a ExpressionEngine,
    pub guard_policy: GuardFailurePolicy,
}

impl<'a> ValidationContext<'a> {
    pub fn new(
        entity: &'a str,
        operation: Operation,
        record: &'a Record,
        query: &'a dyn QueryCapability,
        engine: &'a ExpressionEngine,
    ) -> Self {
        Self {
            entity,
            operation,
            record,
            original: None,
            user: None,
            query,
            engine,
            guard_policy: GuardFailurePolicy::Skip,
        }
    }

    pub fn with_original(mut self, original: Option<&'a Record>) -> Self {
        self.original = original;
        self
    }

    pub fn with_user(mut self, user: Option<&'a UserContext>) -> Self {
        self.user = user;
        self
    }

    pub fn with_guard_policy(mut self, policy: GuardFailurePolicy) -> Self {
        self.guard_policy = policy;
        self
    }

    pub fn tenant_id(&self) -> Option<&'a str> {
        self.user.map(|u| u.tenant_id.as_str())
    }

    /// Field value of the current record; null when absent.
    pub fn value(&self, field: &str) -> &'a Value {
        const NULL: &Value = &Value::Null;
        self.record.get(field).unwrap_or(NULL)
    }

    pub fn original_value(&self, field: &str) -> &'a Value {
        const NULL: &Value = &Value::Null;
        self.original.and_then(|o| o.get(field)).unwrap_or(NULL)
    }

    /// Expression context over this record, with query access and the
    /// caller exposed as `context`.
    pub fn expression_context(&self) -> EvaluationContext<'a> {
        let ctx = EvaluationContext::new(self.record)
            .with_original(self.original)
            .with_query(self.query)
            .with_tenant(self.tenant_id());
        match self.user {
            Some(user) => ctx.with_variable("context", user.to_value()),
            None => ctx,
        }
    }

    /// Evaluate a boolean expression, query functions included.
    pub async fn evaluate_bool(&self, source: &str) -> ExpressionResult<bool> {
        self.engine
            .evaluate_bool_async(source, &self.expression_context())
            .await
    }

    /// Evaluate a condition, applying the guard policy to failures.
    ///
    /// `Ok(None)` means the condition could not be evaluated and the rule
    /// should be skipped.
    pub async fn condition(&self, source: &str, rule: &str) -> ValidatorResult<Option<bool>> {
        match self.evaluate_bool(source).await {
            Ok(met) => Ok(Some(met)),
            Err(source_error) if self.guard_policy == GuardFailurePolicy::Reject => {
                Err(ValidatorError::Guard {
                    source: source_error,
                })
            }
            Err(e) => {
                tracing::warn!(
                    entity = %self.entity,
                    validator = %rule,
                    guard = %source,
                    error = %e,
                    "Condition failed to evaluate, skipping rule"
                );
                Ok(None)
            }
        }
    }
}

impl fmt::Debug for ValidationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationContext")
            .field("entity", &self.entity)
            .field("operation", &self.operation)
            .field("record", &self.record)
            .field("original", &self.original)
            .field("user", &self.user)
            .field("guard_policy", &self.guard_policy)
            .finish_non_exhaustive()
    }
}
