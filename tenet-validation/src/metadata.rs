//! Rules derived from entity metadata
//!
//! Field declarations imply defaults, auto-filled values and reference
//! checks without anyone writing them out.

use tenet_core::{
    AutoSource, DefaultDefinition, EntityModel, FieldType, Operation, Severity,
    ValidatorDefinition,
};

use crate::canned::REFERENCE_EXISTS;

/// Create-only defaults taken from each non-auto field's `default`.
pub fn static_defaults(entity: &EntityModel) -> Vec<DefaultDefinition> {
    entity
        .fields
        .iter()
        .filter(|f| f.auto.is_none())
        .filter_map(|f| {
            let value = f.default.as_ref().filter(|v| !v.is_null())?;
            Some(DefaultDefinition::value(&f.name, value.clone()).on([Operation::Create]))
        })
        .collect()
}

/// Auto-filled fields in declaration order.
pub fn auto_fields(entity: &EntityModel) -> Vec<(String, AutoSource)> {
    entity
        .fields
        .iter()
        .filter_map(|f| f.auto.map(|source| (f.name.clone(), source)))
        .collect()
}

/// One `referenceExists` declaration per relation field.
pub fn relation_validators(entity: &EntityModel) -> Vec<ValidatorDefinition> {
    entity
        .fields
        .iter()
        .filter(|f| f.field_type == FieldType::Relation)
        .filter_map(|f| {
            let target = f.relation.as_ref()?;
            Some(
                ValidatorDefinition::new(REFERENCE_EXISTS)
                    .with_param("field", f.name.as_str())
                    .with_param("entity", target.entity.as_str())
                    .with_message(format!("Referenced {} not found", target.entity))
                    .with_code("REFERENCE_NOT_FOUND")
                    .with_severity(Severity::Error)
                    .on([Operation::Create, Operation::Update]),
            )
        })
        .collect()
}
