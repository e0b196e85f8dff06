//! Field-constraint validators
//!
//! Generated from field metadata rather than declared: required, format,
//! numeric bounds, length bounds, pattern and picklist membership.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use tenet_core::{EntityModel, FieldDefinition, FieldType, Operation, ValidationIssue, Value};

use crate::error::{ValidatorError, ValidatorResult};
use crate::validator::{ValidationContext, Validator};

// ============================================================================
// FORMAT PATTERNS
// ============================================================================

struct FormatPatterns {
    email: Regex,
    phone: Regex,
    url: Regex,
    uuid: Regex,
    date: Regex,
    datetime: Regex,
}

static FORMATS: Lazy<Result<FormatPatterns, regex::Error>> = Lazy::new(|| {
    Ok(FormatPatterns {
        email: Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")?,
        phone: Regex::new(
            r"^[+]?[(]?[0-9]{1,3}[)]?[-\s.]?[(]?[0-9]{1,4}[)]?[-\s.]?[0-9]{1,4}[-\s.]?[0-9]{1,9}$",
        )?,
        url: RegexBuilder::new(r"^https?://[^\s/$.?#].[^\s]*$")
            .case_insensitive(true)
            .build()?,
        uuid: RegexBuilder::new(
            r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$",
        )
        .case_insensitive(true)
        .build()?,
        date: Regex::new(r"^\d{4}-\d{2}-\d{2}$")?,
        datetime: Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}")?,
    })
});

fn formats() -> ValidatorResult<&'static FormatPatterns> {
    FORMATS
        .as_ref()
        .map_err(|e| ValidatorError::failed(format!("format patterns failed to compile: {}", e)))
}

// ============================================================================
// FIELD CONSTRAINT VALIDATOR
// ============================================================================

/// Checks one field against its own declared constraints.
#[derive(Debug, Clone)]
pub struct FieldConstraintValidator {
    field: FieldDefinition,
    label: String,
    pattern: Option<Regex>,
}

impl FieldConstraintValidator {
    pub fn new(field: FieldDefinition) -> Self {
        let pattern = field.validation.pattern.as_deref().and_then(|p| {
            // Anchored at the start only, matching the expression `matches` builtin
            Regex::new(&format!("^(?:{})", p))
                .map_err(|e| {
                    tracing::warn!(
                        field = %field.name,
                        pattern = %p,
                        error = %e,
                        "Field pattern does not compile, ignoring"
                    );
                })
                .ok()
        });
        Self {
            label: field.label(),
            field,
            pattern,
        }
    }

    pub fn field(&self) -> &FieldDefinition {
        &self.field
    }

    fn issue(&self, message: String, code: impl Into<String>) -> ValidationIssue {
        ValidationIssue::error(message, code).on_field(&self.field.name)
    }

    fn check_format(&self, value: &Value) -> ValidatorResult<Option<String>> {
        let field_type = self.field.field_type;

        if field_type.is_numeric() {
            if let Value::String(s) = value {
                if s.trim().parse::<f64>().is_err() {
                    return Ok(Some(format!("{} must be a number", self.label)));
                }
            }
            return Ok(None);
        }

        if field_type == FieldType::Boolean {
            let accepted = match value {
                Value::Bool(_) => true,
                Value::Int(i) => *i == 0 || *i == 1,
                Value::Float(f) => *f == 0.0 || *f == 1.0,
                Value::String(s) => s == "true" || s == "false",
                _ => false,
            };
            return Ok((!accepted).then(|| format!("{} must be a boolean", self.label)));
        }

        let Value::String(text) = value else {
            return Ok(None);
        };
        let patterns = formats()?;
        let (regex, expected) = match field_type {
            FieldType::Email => (&patterns.email, "a valid email address"),
            FieldType::Phone => (&patterns.phone, "a valid phone number"),
            FieldType::Url => (&patterns.url, "a valid URL"),
            FieldType::Uuid => (&patterns.uuid, "a valid UUID"),
            FieldType::Date => (&patterns.date, "a valid date (YYYY-MM-DD)"),
            FieldType::Datetime => (&patterns.datetime, "a valid datetime"),
            _ => return Ok(None),
        };

        if regex.is_match(text) {
            Ok(None)
        } else {
            Ok(Some(format!("{} must be {}", self.label, expected)))
        }
    }

    fn check_bounds(&self, value: &Value, issues: &mut Vec<ValidationIssue>) {
        let number = match value {
            Value::String(s) => s.trim().parse::<f64>().ok(),
            other => other.as_f64(),
        };
        let Some(number) = number else {
            return;
        };
        let rules = &self.field.validation;

        if let Some(min) = rules.min {
            if number < min {
                issues.push(self.issue(
                    format!("{} must be at least {}", self.label, format_bound(min)),
                    "MIN_VALUE",
                ));
            }
        }
        if let Some(max) = rules.max {
            if number > max {
                issues.push(self.issue(
                    format!("{} must be at most {}", self.label, format_bound(max)),
                    "MAX_VALUE",
                ));
            }
        }
    }

    fn check_length(&self, value: &Value, issues: &mut Vec<ValidationIssue>) {
        let Value::String(text) = value else {
            return;
        };
        let length = text.chars().count();
        let rules = &self.field.validation;

        if let Some(min) = rules.min_length {
            if length < min {
                issues.push(self.issue(
                    format!("{} must be at least {} characters", self.label, min),
                    "MIN_LENGTH",
                ));
            }
        }
        if let Some(max) = rules.max_length {
            if length > max {
                issues.push(self.issue(
                    format!("{} must be at most {} characters", self.label, max),
                    "MAX_LENGTH",
                ));
            }
        }
    }

    fn check_options(&self, value: &Value, issues: &mut Vec<ValidationIssue>) {
        if self.field.options.is_empty() {
            return;
        }
        let chosen: Vec<&Value> = match (self.field.field_type, value) {
            (FieldType::MultiPicklist, Value::Array(items)) => items.iter().collect(),
            _ => vec![value],
        };

        for v in chosen {
            let known = self.field.options.iter().any(|o| o.value.semantic_eq(v));
            if !known {
                issues.push(self.issue(
                    format!("'{}' is not a valid option for {}", v, self.label),
                    "INVALID_OPTION",
                ));
            }
        }
    }
}

#[async_trait]
impl Validator for FieldConstraintValidator {
    async fn validate(&self, ctx: &ValidationContext<'_>) -> ValidatorResult<Vec<ValidationIssue>> {
        let mut issues = Vec::new();

        // Populated by the engine on create
        if self.field.auto.is_some() && ctx.operation == Operation::Create {
            return Ok(issues);
        }

        let value = ctx.value(&self.field.name);
        if value.is_empty_value() {
            if self.field.validation.required {
                issues.push(self.issue(format!("{} is required", self.label), "REQUIRED"));
            }
            return Ok(issues);
        }

        if let Some(message) = self.check_format(value)? {
            issues.push(self.issue(message, format!("INVALID_{}", self.field.field_type.code_tag())));
            return Ok(issues);
        }

        if self.field.field_type.is_numeric() {
            self.check_bounds(value, &mut issues);
        }
        if self.field.field_type.is_textual() {
            self.check_length(value, &mut issues);
        }
        if let (Some(pattern), Value::String(text)) = (&self.pattern, value) {
            if !pattern.is_match(text) {
                issues.push(self.issue(format!("{} format is invalid", self.label), "PATTERN_MISMATCH"));
            }
        }
        if self.field.field_type.is_picklist() {
            self.check_options(value, &mut issues);
        }

        Ok(issues)
    }
}

/// Whole bounds print without a fractional part.
fn format_bound(bound: f64) -> String {
    if bound.fract() == 0.0 && bound.abs() < 1e15 {
        format!("{}", bound as i64)
    } else {
        bound.to_string()
    }
}

/// One validator per field that declares something checkable.
pub fn generate_field_validators(entity: &EntityModel) -> Vec<FieldConstraintValidator> {
    entity
        .fields
        .iter()
        .filter(|f| {
            f.validation.is_constrained() || f.field_type.has_format() || f.field_type.is_picklist()
        })
        .cloned()
        .map(FieldConstraintValidator::new)
        .collect()
}
