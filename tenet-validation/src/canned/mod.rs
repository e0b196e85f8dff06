//! Canned validators
//!
//! Reusable rule types shipped with the engine, configured entirely
//! through declaration parameters. Each factory reads its parameters up
//! front so a bad declaration fails when it is resolved, not mid-request.

mod query_rules;
mod record_rules;

pub use query_rules::{NoActiveChildrenValidator, ReferenceExistsValidator, UniqueValidator};
pub use record_rules::{
    ConditionalRequiredValidator, DateRangeValidator, ExpressionValidator,
    FieldComparisonValidator, ImmutableValidator,
};

use std::sync::Arc;

use tenet_core::{Filter, Severity, ValidationIssue, ValidatorDefinition};

use crate::error::{ValidatorError, ValidatorResult};
use crate::registry::ValidatorRegistry;
use crate::validator::Validator;

pub const DATE_RANGE: &str = "dateRange";
pub const UNIQUE: &str = "unique";
pub const FIELD_COMPARISON: &str = "fieldComparison";
pub const CONDITIONAL_REQUIRED: &str = "conditionalRequired";
pub const IMMUTABLE: &str = "immutable";
pub const REFERENCE_EXISTS: &str = "referenceExists";
pub const NO_ACTIVE_CHILDREN: &str = "noActiveChildren";
pub const EXPRESSION: &str = "expression";

/// Register every canned type as a factory.
pub fn register_canned(registry: &mut ValidatorRegistry) {
    fn shared<V: Validator + 'static>(v: ValidatorResult<V>) -> ValidatorResult<Arc<dyn Validator>> {
        v.map(|v| Arc::new(v) as Arc<dyn Validator>)
    }

    registry.register_factory(DATE_RANGE, |d| shared(DateRangeValidator::from_definition(d)));
    registry.register_factory(UNIQUE, |d| shared(UniqueValidator::from_definition(d)));
    registry.register_factory(FIELD_COMPARISON, |d| {
        shared(FieldComparisonValidator::from_definition(d))
    });
    registry.register_factory(CONDITIONAL_REQUIRED, |d| {
        shared(ConditionalRequiredValidator::from_definition(d))
    });
    registry.register_factory(IMMUTABLE, |d| shared(ImmutableValidator::from_definition(d)));
    registry.register_factory(REFERENCE_EXISTS, |d| {
        shared(ReferenceExistsValidator::from_definition(d))
    });
    registry.register_factory(NO_ACTIVE_CHILDREN, |d| {
        shared(NoActiveChildrenValidator::from_definition(d))
    });
    registry.register_factory(EXPRESSION, |d| shared(ExpressionValidator::from_definition(d)));
}

// ============================================================================
// SHARED HELPERS
// ============================================================================

/// Message, code and severity a rule reports with: the declaration's,
/// falling back to the rule's own defaults.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Report {
    message: String,
    code: String,
    severity: Severity,
}

impl Report {
    pub(crate) fn new(
        definition: &ValidatorDefinition,
        default_message: impl Into<String>,
        default_code: &str,
    ) -> Self {
        Self {
            message: definition
                .message
                .clone()
                .unwrap_or_else(|| default_message.into()),
            code: definition
                .code
                .clone()
                .unwrap_or_else(|| default_code.to_string()),
            severity: definition.severity,
        }
    }

    pub(crate) fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn issue(&self) -> ValidationIssue {
        self.issue_with(self.message.clone())
    }

    pub(crate) fn issue_with(&self, message: String) -> ValidationIssue {
        ValidationIssue::error(message, self.code.clone()).with_severity(self.severity)
    }
}

pub(crate) fn required_str(definition: &ValidatorDefinition, key: &str) -> ValidatorResult<String> {
    definition
        .param_str(key)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            ValidatorError::invalid_params(
                &definition.validator_type,
                format!("missing required parameter '{}'", key),
            )
        })
}

pub(crate) fn required_list(
    definition: &ValidatorDefinition,
    key: &str,
) -> ValidatorResult<Vec<String>> {
    let items = definition.param_str_list(key);
    if items.is_empty() {
        return Err(ValidatorError::invalid_params(
            &definition.validator_type,
            format!("parameter '{}' must name at least one field", key),
        ));
    }
    Ok(items)
}

pub(crate) fn optional_filter(
    definition: &ValidatorDefinition,
    key: &str,
) -> ValidatorResult<Filter> {
    match definition.param(key) {
        Some(value) => Filter::from_value(value).map_err(|e| {
            ValidatorError::invalid_params(&definition.validator_type, e.to_string())
        }),
        None => Ok(Filter::new()),
    }
}
