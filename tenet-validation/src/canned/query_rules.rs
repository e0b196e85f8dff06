//! Rules that consult stored data through the query capability

use async_trait::async_trait;

use tenet_core::{Filter, Operation, ValidationIssue, ValidatorDefinition};

use super::{optional_filter, required_list, required_str, Report};
use crate::error::{ValidatorError, ValidatorResult};
use crate::validator::{ValidationContext, Validator};

// ============================================================================
// UNIQUE
// ============================================================================

/// One or more fields whose combined value must not already exist.
#[derive(Debug, Clone)]
pub struct UniqueValidator {
    fields: Vec<String>,
    tenant_scoped: bool,
    report: Report,
}

impl UniqueValidator {
    pub fn from_definition(definition: &ValidatorDefinition) -> ValidatorResult<Self> {
        let fields = required_list(definition, "fields")?;
        let tenant_scoped = match definition.param_str("scope").unwrap_or("tenant") {
            "tenant" => true,
            "global" => false,
            other => {
                return Err(ValidatorError::invalid_params(
                    &definition.validator_type,
                    format!("scope must be 'tenant' or 'global', got '{}'", other),
                ))
            }
        };
        let report = Report::new(
            definition,
            format!("{} already exists", fields.join(", ")),
            "DUPLICATE_VALUE",
        );
        Ok(Self {
            fields,
            tenant_scoped,
            report,
        })
    }
}

#[async_trait]
impl Validator for UniqueValidator {
    async fn validate(&self, ctx: &ValidationContext<'_>) -> ValidatorResult<Vec<ValidationIssue>> {
        let mut filter = Filter::new();
        for field in &self.fields {
            let value = ctx.value(field);
            if value.is_null() {
                return Ok(Vec::new());
            }
            filter = filter.eq(field, value.clone());
        }

        if ctx.operation == Operation::Update {
            let id = ctx.value("id");
            if !id.is_null() {
                filter = filter.neq("id", id.clone());
            }
        }

        let tenant_id = if self.tenant_scoped { ctx.tenant_id() } else { None };
        if ctx.query.exists(ctx.entity, &filter, tenant_id).await? {
            Ok(vec![self.report.issue().on_field(&self.fields[0])])
        } else {
            Ok(Vec::new())
        }
    }
}

// ============================================================================
// REFERENCE EXISTS
// ============================================================================

/// A foreign key must point at an existing record.
#[derive(Debug, Clone)]
pub struct ReferenceExistsValidator {
    field: String,
    entity: String,
    filter: Filter,
    report: Report,
}

impl ReferenceExistsValidator {
    pub fn from_definition(definition: &ValidatorDefinition) -> ValidatorResult<Self> {
        let field = required_str(definition, "field")?;
        let entity = required_str(definition, "entity")?;
        let report = Report::new(
            definition,
            format!("Referenced {} not found", entity),
            "REFERENCE_NOT_FOUND",
        );
        Ok(Self {
            filter: optional_filter(definition, "filter")?,
            field,
            entity,
            report,
        })
    }
}

#[async_trait]
impl Validator for ReferenceExistsValidator {
    async fn validate(&self, ctx: &ValidationContext<'_>) -> ValidatorResult<Vec<ValidationIssue>> {
        let value = ctx.value(&self.field);
        if value.is_null() {
            return Ok(Vec::new());
        }

        let filter = Filter::new().eq("id", value.clone()).and(self.filter.clone());
        if ctx.query.exists(&self.entity, &filter, ctx.tenant_id()).await? {
            Ok(Vec::new())
        } else {
            Ok(vec![self.report.issue().on_field(&self.field)])
        }
    }
}

// ============================================================================
// NO ACTIVE CHILDREN
// ============================================================================

/// Blocks a delete while child records still point at the record.
#[derive(Debug, Clone)]
pub struct NoActiveChildrenValidator {
    child_entity: String,
    foreign_key: String,
    filter: Filter,
    report: Report,
}

impl NoActiveChildrenValidator {
    pub fn from_definition(definition: &ValidatorDefinition) -> ValidatorResult<Self> {
        let child_entity = required_str(definition, "childEntity")?;
        let report = Report::new(
            definition,
            format!("Cannot delete: has related {} records", child_entity),
            "HAS_ACTIVE_CHILDREN",
        );
        Ok(Self {
            foreign_key: required_str(definition, "foreignKey")?,
            filter: optional_filter(definition, "filter")?,
            child_entity,
            report,
        })
    }
}

#[async_trait]
impl Validator for NoActiveChildrenValidator {
    async fn validate(&self, ctx: &ValidationContext<'_>) -> ValidatorResult<Vec<ValidationIssue>> {
        if ctx.operation != Operation::Delete {
            return Ok(Vec::new());
        }
        let id = ctx.value("id");
        if id.is_null() {
            return Ok(Vec::new());
        }

        let filter = Filter::new()
            .eq(&self.foreign_key, id.clone())
            .and(self.filter.clone());
        let children = ctx.query.count(&self.child_entity, &filter, ctx.tenant_id()).await?;
        if children > 0 {
            tracing::debug!(
                entity = %ctx.entity,
                child_entity = %self.child_entity,
                children,
                "Delete blocked by child records"
            );
            Ok(vec![self.report.issue()])
        } else {
            Ok(Vec::new())
        }
    }
}
