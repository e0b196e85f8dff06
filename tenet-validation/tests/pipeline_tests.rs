//! Write pipeline: rejection, the warning acknowledgment round trip, hook
//! aborts and post-persistence hooks.

use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tenet_core::{
    AutoSource, EngineConfig, EntityModel, FieldDefinition, FieldType, HookDefinition, HookPoint,
    Operation, Severity, Value, ValidatorDefinition,
};
use tenet_hooks::{hook_fn, HookError, HookRegistry, HookResult};
use tenet_test_utils::assertions::*;
use tenet_test_utils::{fixtures, record, MockQueryCapability};
use tenet_validation::*;

const CONFIG: &str = r#"
[acknowledgment]
secret = "pipeline-test-secret"
ttl_seconds = 600
"#;

fn product_entity() -> EntityModel {
    EntityModel::new("product")
        .with_field(FieldDefinition::new("id", FieldType::Text))
        .with_field(FieldDefinition::new("sku", FieldType::Text).required())
        .with_field(FieldDefinition::new("price", FieldType::Currency))
        .with_field(FieldDefinition::new("discount", FieldType::Percent))
        .with_field(FieldDefinition::new("createdAt", FieldType::Datetime).with_auto(AutoSource::Now))
        .with_validator(
            ValidatorDefinition::new("expression")
                .with_param("rule", "discount == null || discount <= 30")
                .with_param("field", "discount")
                .with_severity(Severity::Warning)
                .with_code("LARGE_DISCOUNT")
                .with_message("A {discount}% discount needs sign-off"),
        )
        .with_hook(HookPoint::BeforeSave, HookDefinition::new("check_sku"))
        .with_hook(HookPoint::AfterSave, HookDefinition::new("stamp_search"))
        .with_hook(HookPoint::AfterCommit, HookDefinition::new("notify"))
}

fn hooks(notified: Arc<AtomicUsize>) -> HookRegistry {
    let mut registry = HookRegistry::new();
    registry.register(
        "check_sku",
        hook_fn(|ctx| async move {
            if ctx.record.get("sku") == Some(&Value::from("DUP-1")) {
                return Ok(Some(HookResult::abort("duplicate SKU")));
            }
            Ok(None)
        }),
    );
    registry.register(
        "stamp_search",
        hook_fn(|ctx| async move {
            let sku = ctx.record.get("sku").map(Value::to_display_string).unwrap_or_default();
            Ok(Some(HookResult::update(record(json!({"searchKey": sku.to_lowercase()})))))
        }),
    );
    registry.register(
        "notify",
        hook_fn(move |_| {
            let notified = notified.clone();
            async move {
                notified.fetch_add(1, Ordering::SeqCst);
                Err(HookError::failed("mail relay down"))
            }
        }),
    );
    registry
}

fn pipeline() -> WritePipeline {
    pipeline_with(Arc::new(AtomicUsize::new(0)))
}

fn pipeline_with(notified: Arc<AtomicUsize>) -> WritePipeline {
    let config = EngineConfig::from_toml_str(CONFIG).unwrap();
    WritePipeline::from_config(
        &config,
        Arc::new(ValidatorRegistry::with_canned()),
        Arc::new(hooks(notified)),
        Arc::new(MockQueryCapability::new()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_clean_create_is_ready() {
    let outcome = pipeline()
        .prepare_write(
            &product_entity(),
            WriteRequest::create(record(json!({"sku": "A-1", "discount": 10})))
                .with_user(fixtures::user()),
        )
        .await
        .unwrap();

    assert_eq!(outcome.status_code(), 201);
    let WriteOutcome::Ready {
        operation,
        record,
        acknowledged_warnings,
    } = outcome
    else {
        panic!("expected ready, got {:?}", outcome);
    };
    assert_eq!(operation, Operation::Create);
    assert!(record.contains_key("createdAt"));
    assert!(acknowledged_warnings.is_empty());
}

#[tokio::test]
async fn test_errors_reject() {
    let outcome = pipeline()
        .prepare_write(&product_entity(), WriteRequest::create(record(json!({"price": 5}))))
        .await
        .unwrap();

    assert_eq!(outcome.status_code(), 422);
    let WriteOutcome::Rejected(result) = outcome else {
        panic!("expected rejection, got {:?}", outcome);
    };
    assert_error_code(&result, "REQUIRED");
}

#[tokio::test]
async fn test_warning_acknowledgment_round_trip() {
    let pipeline = pipeline();
    let entity = product_entity();
    let user = fixtures::user();

    let first = pipeline
        .prepare_write(
            &entity,
            WriteRequest::create(record(json!({"sku": "A-1", "discount": 45}))).with_user(user.clone()),
        )
        .await
        .unwrap();
    assert_eq!(first.status_code(), 202);
    let WriteOutcome::NeedsAcknowledgment {
        record: prepared,
        result,
        token,
    } = first
    else {
        panic!("expected acknowledgment request, got {:?}", first);
    };
    assert!(result.valid);
    assert_eq!(result.acknowledgment_token.as_deref(), Some(token.as_str()));
    let warning = assert_warning_code(&result, "LARGE_DISCOUNT");
    assert_eq!(warning.message, "A 45% discount needs sign-off");

    // the prepared record carries its audit stamp, so the resubmission
    // hashes to the same content
    let second = pipeline
        .prepare_write(
            &entity,
            WriteRequest::create(prepared.clone())
                .with_user(user.clone())
                .with_acknowledgment(token.clone()),
        )
        .await
        .unwrap();
    let WriteOutcome::Ready {
        record: saved,
        acknowledged_warnings,
        ..
    } = second
    else {
        panic!("expected ready, got {:?}", second);
    };
    assert_eq!(saved, prepared);
    assert_eq!(acknowledged_warnings.len(), 1);

    let mut edited = prepared.clone();
    edited.insert("discount".to_string(), Value::from(50));
    let err = pipeline
        .prepare_write(
            &entity,
            WriteRequest::create(edited).with_user(user.clone()).with_acknowledgment(token.clone()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Acknowledgment(AcknowledgmentError::DataChanged)));

    let mut forged = token.clone();
    let last = forged.pop().unwrap();
    forged.push(if last == '0' { '1' } else { '0' });
    let err = pipeline
        .prepare_write(
            &entity,
            WriteRequest::create(prepared).with_user(user).with_acknowledgment(forged),
        )
        .await
        .unwrap_err();
    match err {
        EngineError::Acknowledgment(e) => {
            assert!(matches!(e, AcknowledgmentError::Invalid { .. }));
            assert_eq!(e.status_code(), 422);
        }
        other => panic!("expected acknowledgment error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_token_is_ignored_without_warnings() {
    let outcome = pipeline()
        .prepare_write(
            &product_entity(),
            WriteRequest::create(record(json!({"sku": "A-1"}))).with_acknowledgment("garbage"),
        )
        .await
        .unwrap();
    assert!(outcome.is_ready());
}

#[tokio::test]
async fn test_before_save_hook_aborts() {
    let outcome = pipeline()
        .prepare_write(
            &product_entity(),
            WriteRequest::create(record(json!({"sku": "DUP-1"}))).with_user(fixtures::user()),
        )
        .await
        .unwrap();

    assert_eq!(outcome.status_code(), 422);
    assert_eq!(
        outcome,
        WriteOutcome::Aborted {
            reason: "duplicate SKU".to_string()
        }
    );
    let issue = outcome.abort_issue().unwrap();
    assert_eq!(issue.code, "HOOK_ABORT");
    assert!(issue.is_error());
}

#[tokio::test]
async fn test_update_is_ok_status() {
    let stored = record(json!({"id": "p-1", "sku": "A-1", "createdAt": "2024-01-01T00:00:00Z"}));
    let mut changed = stored.clone();
    changed.insert("price".to_string(), Value::from(12.5));

    let outcome = pipeline()
        .prepare_write(&product_entity(), WriteRequest::update(changed, stored))
        .await
        .unwrap();
    assert_eq!(outcome.status_code(), 200);
}

#[tokio::test]
async fn test_complete_write_ignores_after_commit_failures() {
    let notified = Arc::new(AtomicUsize::new(0));
    let pipeline = pipeline_with(notified.clone());

    let completion = pipeline
        .complete_write(
            &product_entity(),
            Operation::Create,
            record(json!({"id": "p-1", "sku": "AB-1"})),
            None,
            Some(fixtures::user()),
        )
        .await
        .unwrap();

    assert_eq!(
        completion,
        Completion::Committed {
            record: record(json!({"id": "p-1", "sku": "AB-1", "searchKey": "ab-1"}))
        }
    );
    assert_eq!(notified.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_outcome_serializes_with_tag() {
    let outcome = WriteOutcome::Aborted {
        reason: "duplicate SKU".to_string(),
    };
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json, json!({"outcome": "aborted", "reason": "duplicate SKU"}));
}

#[test]
fn test_from_config_requires_secret() {
    let result = WritePipeline::from_config(
        &EngineConfig::default(),
        Arc::new(ValidatorRegistry::with_canned()),
        Arc::new(HookRegistry::new()),
        Arc::new(MockQueryCapability::new()),
    );
    assert!(matches!(result, Err(tenet_core::ConfigError::MissingRequired { .. })));
}
