//! Rules that only read the record being written

use async_trait::async_trait;
use std::cmp::Ordering;

use tenet_core::{Operation, ValidationIssue, ValidatorDefinition, Value};

use super::{required_list, required_str, Report};
use crate::error::ValidatorResult;
use crate::validator::{ValidationContext, Validator};

// ============================================================================
// DATE RANGE
// ============================================================================

/// End date must fall after the start date.
#[derive(Debug, Clone)]
pub struct DateRangeValidator {
    start_field: String,
    end_field: String,
    allow_equal: bool,
    report: Report,
}

impl DateRangeValidator {
    pub fn from_definition(definition: &ValidatorDefinition) -> ValidatorResult<Self> {
        let start_field = required_str(definition, "startField")?;
        let end_field = required_str(definition, "endField")?;
        let report = Report::new(
            definition,
            format!("{} must be after {}", end_field, start_field),
            "INVALID_DATE_RANGE",
        );
        Ok(Self {
            allow_equal: definition.param_bool("allowEqual").unwrap_or(false),
            start_field,
            end_field,
            report,
        })
    }
}

#[async_trait]
impl Validator for DateRangeValidator {
    async fn validate(&self, ctx: &ValidationContext<'_>) -> ValidatorResult<Vec<ValidationIssue>> {
        let start = ctx.value(&self.start_field);
        let end = ctx.value(&self.end_field);
        if start.is_null() || end.is_null() {
            return Ok(Vec::new());
        }

        let ordering = match (start.as_date(), end.as_date()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => start.compare(end),
        };
        let Some(ordering) = ordering else {
            return Ok(vec![type_mismatch(start, end).on_field(&self.end_field)]);
        };

        let in_order = match ordering {
            Ordering::Less => true,
            Ordering::Equal => self.allow_equal,
            Ordering::Greater => false,
        };
        if in_order {
            Ok(Vec::new())
        } else {
            Ok(vec![self.report.issue().on_field(&self.end_field)])
        }
    }
}

// ============================================================================
// FIELD COMPARISON
// ============================================================================

/// Two fields compared with a named operator.
#[derive(Debug, Clone)]
pub struct FieldComparisonValidator {
    left: String,
    operator: String,
    right: String,
    report: Report,
}

impl FieldComparisonValidator {
    pub fn from_definition(definition: &ValidatorDefinition) -> ValidatorResult<Self> {
        Ok(Self {
            left: required_str(definition, "left")?,
            operator: definition.param_str("operator").unwrap_or("eq").to_string(),
            right: required_str(definition, "right")?,
            report: Report::new(definition, "Field comparison failed", "FIELD_COMPARISON_FAILED"),
        })
    }
}

#[async_trait]
impl Validator for FieldComparisonValidator {
    async fn validate(&self, ctx: &ValidationContext<'_>) -> ValidatorResult<Vec<ValidationIssue>> {
        let left = ctx.value(&self.left);
        let right = ctx.value(&self.right);
        if left.is_null() || right.is_null() {
            return Ok(Vec::new());
        }

        let holds = match self.operator.as_str() {
            "eq" => Some(left.semantic_eq(right)),
            "neq" => Some(!left.semantic_eq(right)),
            op @ ("lt" | "lte" | "gt" | "gte") => left.compare(right).map(|ord| match op {
                "lt" => ord == Ordering::Less,
                "lte" => ord != Ordering::Greater,
                "gt" => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            }),
            other => {
                return Ok(vec![ValidationIssue::error(
                    format!("Unknown comparison operator: {}", other),
                    "INVALID_OPERATOR",
                )])
            }
        };

        match holds {
            Some(true) => Ok(Vec::new()),
            Some(false) => Ok(vec![self.report.issue().on_field(&self.left)]),
            None => Ok(vec![type_mismatch(left, right)]),
        }
    }
}

fn type_mismatch(left: &Value, right: &Value) -> ValidationIssue {
    ValidationIssue::error(
        format!("Cannot compare {} and {}", left.type_name(), right.type_name()),
        "TYPE_MISMATCH",
    )
}

// ============================================================================
// CONDITIONAL REQUIRED
// ============================================================================

/// A field becomes required while a condition holds.
#[derive(Debug, Clone)]
pub struct ConditionalRequiredValidator {
    field: String,
    condition: String,
    report: Report,
}

impl ConditionalRequiredValidator {
    pub fn from_definition(definition: &ValidatorDefinition) -> ValidatorResult<Self> {
        let field = required_str(definition, "field")?;
        let report = Report::new(definition, format!("{} is required", field), "FIELD_REQUIRED");
        Ok(Self {
            condition: definition.param_str("when").unwrap_or("true").to_string(),
            field,
            report,
        })
    }
}

#[async_trait]
impl Validator for ConditionalRequiredValidator {
    async fn validate(&self, ctx: &ValidationContext<'_>) -> ValidatorResult<Vec<ValidationIssue>> {
        match ctx.condition(&self.condition, "conditionalRequired").await? {
            Some(true) => {}
            _ => return Ok(Vec::new()),
        }

        if ctx.value(&self.field).is_blank() {
            Ok(vec![self.report.issue().on_field(&self.field)])
        } else {
            Ok(Vec::new())
        }
    }
}

// ============================================================================
// IMMUTABLE
// ============================================================================

/// Fields that may not change once the record exists.
#[derive(Debug, Clone)]
pub struct ImmutableValidator {
    fields: Vec<String>,
    condition: Option<String>,
    report: Report,
}

impl ImmutableValidator {
    pub fn from_definition(definition: &ValidatorDefinition) -> ValidatorResult<Self> {
        Ok(Self {
            fields: required_list(definition, "fields")?,
            condition: definition.param_str("when").map(str::to_string),
            report: Report::new(definition, "{field} cannot be changed", "FIELD_IMMUTABLE"),
        })
    }
}

#[async_trait]
impl Validator for ImmutableValidator {
    async fn validate(&self, ctx: &ValidationContext<'_>) -> ValidatorResult<Vec<ValidationIssue>> {
        if ctx.operation != Operation::Update || ctx.original.is_none() {
            return Ok(Vec::new());
        }

        if let Some(condition) = &self.condition {
            match ctx.condition(condition, "immutable").await? {
                Some(true) => {}
                _ => return Ok(Vec::new()),
            }
        }

        Ok(self
            .fields
            .iter()
            .filter(|f| !ctx.original_value(f).semantic_eq(ctx.value(f)))
            .map(|f| {
                self.report
                    .issue_with(self.report.message().replace("{field}", f))
                    .on_field(f)
            })
            .collect())
    }
}

// ============================================================================
// EXPRESSION
// ============================================================================

/// Free-form boolean rule; fails when the expression is false.
#[derive(Debug, Clone)]
pub struct ExpressionValidator {
    rule: String,
    field: Option<String>,
    report: Report,
}

impl ExpressionValidator {
    pub fn from_definition(definition: &ValidatorDefinition) -> ValidatorResult<Self> {
        Ok(Self {
            rule: definition.param_str("rule").unwrap_or("true").to_string(),
            field: definition.param_str("field").map(str::to_string),
            report: Report::new(definition, "Validation failed", "EXPRESSION_VALIDATION_FAILED"),
        })
    }

    fn scoped(&self, issue: ValidationIssue) -> ValidationIssue {
        match &self.field {
            Some(field) => issue.on_field(field),
            None => issue,
        }
    }
}

#[async_trait]
impl Validator for ExpressionValidator {
    async fn validate(&self, ctx: &ValidationContext<'_>) -> ValidatorResult<Vec<ValidationIssue>> {
        match ctx.evaluate_bool(&self.rule).await {
            Ok(true) => Ok(Vec::new()),
            Ok(false) => Ok(vec![self.scoped(self.report.issue())]),
            Err(e) => {
                tracing::warn!(
                    entity = %ctx.entity,
                    rule = %self.rule,
                    error = %e,
                    "Expression validator failed to evaluate"
                );
                Ok(vec![self.scoped(ValidationIssue::error(
                    format!("Expression evaluation failed: {}", e),
                    "EXPRESSION_ERROR",
                ))])
            }
        }
    }
}
