//! Entity lifecycle: defaults, field constraints, declared and configured
//! validators, and message interpolation over one record operation.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::json;
use std::sync::Arc;

use tenet_core::{
    DefaultDefinition, DefaultPolicy, EntityModel, GuardFailurePolicy, Operation, Severity, Value,
    ValidatorDefinition,
};
use tenet_dsl::ExpressionEngine;
use tenet_test_utils::assertions::*;
use tenet_test_utils::{fixtures, record, MockQueryCapability};
use tenet_validation::*;

fn lifecycle_with(query: MockQueryCapability) -> EntityLifecycle {
    let engine = ExpressionEngine::with_builtins();
    EntityLifecycle::new(
        DefaultingService::new(engine.clone()),
        ValidationService::new(
            Arc::new(ValidatorRegistry::with_canned()),
            Arc::new(query),
            engine,
        ),
    )
}

fn lifecycle() -> EntityLifecycle {
    lifecycle_with(MockQueryCapability::new())
}

fn contact_with_full_name() -> EntityModel {
    fixtures::contact_entity().with_default(
        DefaultDefinition::expression("fullName", "concat(firstName, \" \", lastName)")
            .with_policy(DefaultPolicy::Overwrite)
            .on([Operation::Create, Operation::Update]),
    )
}

#[tokio::test]
async fn test_create_fills_defaults_and_audit_fields() {
    let entity = contact_with_full_name();
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
    let user = fixtures::user();

    let result = lifecycle()
        .prepare_at(
            &entity,
            Operation::Create,
            &record(json!({"firstName": "John", "lastName": "Doe"})),
            None,
            Some(&user),
            now,
        )
        .await
        .unwrap();

    assert_valid(&result.validation);
    let rec = &result.record;
    assert_eq!(rec["fullName"], Value::from("John Doe"));
    assert_eq!(rec["status"], Value::from("active"));
    assert_eq!(rec["tenantId"], Value::from("tenant-1"));
    assert_eq!(rec["createdBy"], Value::from("user-1"));
    assert_eq!(rec["createdAt"], Value::Timestamp(now));
    assert_eq!(rec["updatedAt"], Value::Timestamp(now));
}

#[tokio::test]
async fn test_update_recomputes_overwrite_defaults() {
    let entity = contact_with_full_name();
    let user = fixtures::user();
    let original = fixtures::stored_contact();
    let mut changed = original.clone();
    changed.insert("lastName".to_string(), "Smith".into());
    changed.insert("fullName".to_string(), "stale".into());

    let result = lifecycle()
        .prepare(&entity, Operation::Update, &changed, Some(&original), Some(&user))
        .await
        .unwrap();

    assert_valid(&result.validation);
    assert_eq!(result.record["fullName"], Value::from("John Smith"));
    // create-only audit fields stay untouched on update
    assert!(!result.record.contains_key("createdBy"));
    assert!(result.record.contains_key("updatedAt"));
}

#[tokio::test]
async fn test_field_constraints_use_labels() {
    let result = lifecycle()
        .prepare(
            &fixtures::contact_entity(),
            Operation::Create,
            &record(json!({"lastName": "Doe", "email": "not-an-email", "status": "archived"})),
            None,
            Some(&fixtures::user()),
        )
        .await
        .unwrap();

    let required = assert_error_code(&result.validation, "REQUIRED");
    assert_eq!(required.message, "First Name is required");
    assert_eq!(required.field.as_deref(), Some("firstName"));
    assert_error_code(&result.validation, "INVALID_EMAIL");
    let option = assert_error_code(&result.validation, "INVALID_OPTION");
    assert_eq!(option.message, "'archived' is not a valid option for Status");
}

#[tokio::test]
async fn test_conditional_required_with_interpolated_message() {
    let entity = fixtures::contact_entity().with_validator(
        ValidatorDefinition::new("conditionalRequired")
            .with_param("field", "email")
            .with_param("when", "status == 'active'")
            .with_message("Email is required for {status:label} contacts"),
    );
    let svc = lifecycle();
    let user = fixtures::user();

    // status defaults to active, so email becomes required
    let result = svc
        .prepare(
            &entity,
            Operation::Create,
            &record(json!({"firstName": "Ann", "lastName": "Lee"})),
            None,
            Some(&user),
        )
        .await
        .unwrap();
    let issue = assert_error_code(&result.validation, "FIELD_REQUIRED");
    assert_eq!(issue.message, "Email is required for Active contacts");

    let result = svc
        .prepare(
            &entity,
            Operation::Create,
            &record(json!({"firstName": "Ann", "lastName": "Lee", "status": "inactive"})),
            None,
            Some(&user),
        )
        .await
        .unwrap();
    assert_valid(&result.validation);
}

#[tokio::test]
async fn test_relation_fields_must_resolve() {
    let query = MockQueryCapability::new()
        .with_records("account", [record(json!({"id": "acc-1", "tenantId": "tenant-1"}))]);
    let svc = lifecycle_with(query);
    let entity = fixtures::contact_entity();
    let user = fixtures::user();

    let ok = svc
        .prepare(
            &entity,
            Operation::Create,
            &record(json!({"firstName": "A", "lastName": "B", "accountId": "acc-1"})),
            None,
            Some(&user),
        )
        .await
        .unwrap();
    assert_valid(&ok.validation);

    let missing = svc
        .prepare(
            &entity,
            Operation::Create,
            &record(json!({"firstName": "A", "lastName": "B", "accountId": "acc-2"})),
            None,
            Some(&user),
        )
        .await
        .unwrap();
    let issue = assert_error_code(&missing.validation, "REFERENCE_NOT_FOUND");
    assert_eq!(issue.field.as_deref(), Some("accountId"));
}

#[tokio::test]
async fn test_delete_runs_only_declared_rules() {
    let query = MockQueryCapability::new()
        .with_records("order", [record(json!({"id": "o-1", "contactId": "c-1"}))]);
    let entity = fixtures::contact_entity().with_validator(
        ValidatorDefinition::new("noActiveChildren")
            .with_param("childEntity", "order")
            .with_param("foreignKey", "contactId")
            .on([Operation::Delete]),
    );
    let svc = lifecycle_with(query);

    // no names: field constraints would fail a create, but delete skips them
    let stored = record(json!({"id": "c-1"}));
    let result = svc
        .prepare(&entity, Operation::Delete, &stored, Some(&stored), Some(&fixtures::user()))
        .await
        .unwrap();
    assert_eq!(result.record, stored);
    assert_eq!(result.validation.errors.len(), 1);
    assert_error_code(&result.validation, "HAS_ACTIVE_CHILDREN");

    let orphan = record(json!({"id": "c-2"}));
    let result = svc
        .prepare(&entity, Operation::Delete, &orphan, Some(&orphan), None)
        .await
        .unwrap();
    assert_valid(&result.validation);
}

#[tokio::test]
async fn test_unknown_validator_type_is_an_error() {
    let entity = fixtures::contact_entity().with_validator(ValidatorDefinition::new("luhn"));
    let err = lifecycle()
        .prepare(
            &entity,
            Operation::Create,
            &record(json!({"firstName": "A", "lastName": "B"})),
            None,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validator {
            source: ValidatorError::UnknownType { .. },
            ..
        }
    ));
}

#[tokio::test]
async fn test_guard_failure_policy() {
    let entity = fixtures::contact_entity().with_validator(
        ValidatorDefinition::new("expression")
            .with_param("rule", "false")
            .when("status > 3"),
    );
    let input = record(json!({"firstName": "A", "lastName": "B"}));

    let skipped = lifecycle()
        .prepare(&entity, Operation::Create, &input, None, None)
        .await
        .unwrap();
    assert_valid(&skipped.validation);

    let engine = ExpressionEngine::with_builtins();
    let strict = EntityLifecycle::new(
        DefaultingService::new(engine.clone()),
        ValidationService::new(
            Arc::new(ValidatorRegistry::with_canned()),
            Arc::new(MockQueryCapability::new()),
            engine,
        )
        .with_guard_policy(GuardFailurePolicy::Reject),
    );
    let err = strict
        .prepare(&entity, Operation::Create, &input, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Guard { .. }));
}

// ============================================================================
// CONFIGURED VALIDATORS
// ============================================================================

struct TenantRules;

#[async_trait]
impl ConfiguredValidatorLoader for TenantRules {
    async fn load(&self, entity: &str, tenant_id: &str) -> ValidatorResult<Vec<ValidatorDefinition>> {
        match (entity, tenant_id) {
            ("contact", "tenant-1") => Ok(vec![ValidatorDefinition::new("expression")
                .with_param("rule", "email != null")
                .with_param("field", "email")
                .with_severity(Severity::Warning)
                .with_code("EMAIL_RECOMMENDED")
                .with_message("{firstName} has no email")]),
            ("contact", "broken") => Err(ValidatorError::failed("rule store unavailable")),
            _ => Ok(Vec::new()),
        }
    }
}

fn lifecycle_with_loader() -> EntityLifecycle {
    let engine = ExpressionEngine::with_builtins();
    EntityLifecycle::new(
        DefaultingService::new(engine.clone()),
        ValidationService::new(
            Arc::new(ValidatorRegistry::with_canned()),
            Arc::new(MockQueryCapability::new()),
            engine,
        )
        .with_loader(Arc::new(TenantRules)),
    )
}

#[tokio::test]
async fn test_configured_validators_are_tenant_scoped() {
    let svc = lifecycle_with_loader();
    let entity = fixtures::contact_entity();
    let input = record(json!({"firstName": "Ann", "lastName": "Lee"}));

    let result = svc
        .prepare(&entity, Operation::Create, &input, None, Some(&fixtures::user()))
        .await
        .unwrap();
    assert!(result.validation.valid);
    let warning = assert_warning_code(&result.validation, "EMAIL_RECOMMENDED");
    assert_eq!(warning.message, "Ann has no email");

    // no tenant, no configured rules
    let result = svc
        .prepare(&entity, Operation::Create, &input, None, None)
        .await
        .unwrap();
    assert_no_code(&result.validation, "EMAIL_RECOMMENDED");
}

#[tokio::test]
async fn test_loader_failure_surfaces() {
    let user = tenet_core::UserContext::new("broken", "user-9");
    let err = lifecycle_with_loader()
        .prepare(
            &fixtures::contact_entity(),
            Operation::Create,
            &record(json!({"firstName": "Ann", "lastName": "Lee"})),
            None,
            Some(&user),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Loader { ref entity, .. } if entity == "contact"));
}
