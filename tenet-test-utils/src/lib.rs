//! TENET Test Utilities
//!
//! Shared test infrastructure for the TENET workspace:
//! - An in-memory query capability
//! - Proptest generators for values and records
//! - Test fixtures for common scenarios
//! - Assertions over validation results

pub use tenet_core::{
    record_from_json, AutoSource, EntityModel, FieldDefinition, FieldType, Filter, QueryCapability,
    QueryError, QueryResult, Record, Severity, UserContext, ValidationIssue, ValidationResult,
    Value,
};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Build a record from a JSON object literal.
pub fn record(json: serde_json::Value) -> Record {
    record_from_json(json)
}

// ============================================================================
// MOCK QUERY CAPABILITY
// ============================================================================

/// One call observed by [`MockQueryCapability`].
#[derive(Debug, Clone, PartialEq)]
pub struct QueryCall {
    pub entity: String,
    pub filter: Filter,
    pub tenant_id: Option<String>,
}

/// In-memory query capability.
///
/// Records carrying a `tenantId` field are only visible to that tenant;
/// records without one are visible to every scope.
#[derive(Debug, Clone, Default)]
pub struct MockQueryCapability {
    tables: Arc<RwLock<HashMap<String, Vec<Record>>>>,
    calls: Arc<RwLock<Vec<QueryCall>>>,
    failure: Option<String>,
}

impl MockQueryCapability {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capability whose every query fails with a backend error.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn with_records(self, entity: &str, records: impl IntoIterator<Item = Record>) -> Self {
        self.tables_mut()
            .entry(entity.to_string())
            .or_default()
            .extend(records);
        self
    }

    pub fn insert(&self, entity: &str, record: Record) {
        self.tables_mut()
            .entry(entity.to_string())
            .or_default()
            .push(record);
    }

    pub fn clear(&self) {
        self.tables_mut().clear();
        self.calls_mut().clear();
    }

    /// Calls made so far, oldest first.
    pub fn calls(&self) -> Vec<QueryCall> {
        self.calls
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    fn tables(&self) -> RwLockReadGuard<'_, HashMap<String, Vec<Record>>> {
        self.tables
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn tables_mut(&self) -> RwLockWriteGuard<'_, HashMap<String, Vec<Record>>> {
        self.tables
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn calls_mut(&self) -> RwLockWriteGuard<'_, Vec<QueryCall>> {
        self.calls
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn visible_to(record: &Record, tenant_id: Option<&str>) -> bool {
    match (tenant_id, record.get("tenantId")) {
        (Some(tenant), Some(owner)) => owner.as_str() == Some(tenant),
        _ => true,
    }
}

#[async_trait]
impl QueryCapability for MockQueryCapability {
    async fn query(
        &self,
        entity: &str,
        filter: &Filter,
        tenant_id: Option<&str>,
    ) -> QueryResult<Vec<Record>> {
        self.calls_mut().push(QueryCall {
            entity: entity.to_string(),
            filter: filter.clone(),
            tenant_id: tenant_id.map(str::to_string),
        });

        if let Some(reason) = &self.failure {
            return Err(QueryError::Backend {
                entity: entity.to_string(),
                reason: reason.clone(),
            });
        }

        Ok(self
            .tables()
            .get(entity)
            .map(|rows| {
                rows.iter()
                    .filter(|r| visible_to(r, tenant_id) && filter.matches(r))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for values and records.

    use super::*;
    use chrono::{DateTime, NaiveDate, Utc};
    use proptest::prelude::*;

    /// Field or variable name that is never an expression keyword.
    pub fn arb_identifier() -> impl Strategy<Value = String> {
        "[a-z][a-zA-Z0-9_]{0,8}".prop_filter("keywords are reserved", |s| {
            !matches!(
                s.to_ascii_lowercase().as_str(),
                "true" | "false" | "null" | "and" | "or" | "not" | "in"
            )
        })
    }

    pub fn arb_date() -> impl Strategy<Value = NaiveDate> {
        // 2000-01-01 through 2040-12-31
        (730_119i32..745_095i32).prop_filter_map("valid day", NaiveDate::from_num_days_from_ce_opt)
    }

    pub fn arb_timestamp() -> impl Strategy<Value = DateTime<Utc>> {
        (946_684_800i64..2_240_524_800i64)
            .prop_filter_map("valid timestamp", |secs| DateTime::from_timestamp(secs, 0))
    }

    /// Scalar values, including null.
    pub fn arb_scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            (-1_000_000i64..1_000_000).prop_map(Value::Int),
            (-1_000_000i64..1_000_000).prop_map(|i| Value::Float(i as f64 / 100.0)),
            "[a-zA-Z0-9 ]{0,12}".prop_map(Value::String),
            arb_date().prop_map(Value::Date),
            arb_timestamp().prop_map(Value::Timestamp),
        ]
    }

    /// Any value, nesting arrays and objects a few levels deep.
    pub fn arb_value() -> impl Strategy<Value = Value> {
        arb_scalar().prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map(arb_identifier(), inner, 0..4).prop_map(Value::Object),
            ]
        })
    }

    pub fn arb_record() -> impl Strategy<Value = Record> {
        prop::collection::btree_map(arb_identifier(), arb_value(), 0..6)
    }

    pub fn arb_severity() -> impl Strategy<Value = Severity> {
        prop_oneof![Just(Severity::Error), Just(Severity::Warning)]
    }

    pub fn arb_issue() -> impl Strategy<Value = ValidationIssue> {
        ("[A-Z_]{3,12}", "[a-z ]{1,20}", arb_severity()).prop_map(|(code, message, severity)| {
            ValidationIssue::error(message, code).with_severity(severity)
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built entities and callers for common scenarios.

    use super::*;

    /// Caller in tenant `tenant-1`.
    pub fn user() -> UserContext {
        UserContext::new("tenant-1", "user-1").with_roles(["member"])
    }

    /// Contact entity with names, a formatted email, a status picklist, an
    /// account relation and audit fields.
    pub fn contact_entity() -> EntityModel {
        EntityModel::new("contact")
            .with_field(FieldDefinition::new("id", FieldType::Uuid))
            .with_field(FieldDefinition::new("firstName", FieldType::Name).required())
            .with_field(FieldDefinition::new("lastName", FieldType::Name).required())
            .with_field(FieldDefinition::new("fullName", FieldType::Text))
            .with_field(FieldDefinition::new("email", FieldType::Email))
            .with_field(
                FieldDefinition::new("status", FieldType::Picklist)
                    .with_options([("active", "Active"), ("inactive", "Inactive")])
                    .with_default("active"),
            )
            .with_field(FieldDefinition::new("accountId", FieldType::Relation).with_relation("account"))
            .with_field(FieldDefinition::new("tenantId", FieldType::Text).with_auto(AutoSource::TenantId))
            .with_field(FieldDefinition::new("createdAt", FieldType::Datetime).with_auto(AutoSource::Now))
            .with_field(FieldDefinition::new("updatedAt", FieldType::Datetime).with_auto(AutoSource::Now))
            .with_field(FieldDefinition::new("createdBy", FieldType::Text).with_auto(AutoSource::UserId))
    }

    /// A stored contact as an update's prior record.
    pub fn stored_contact() -> Record {
        record(serde_json::json!({
            "id": "0b7e7f4e-3c1a-4d7e-9a55-1f2f3c4d5e6f",
            "firstName": "John",
            "lastName": "Doe",
            "status": "active",
            "email": "john@example.com",
            "tenantId": "tenant-1",
        }))
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over validation results.

    use super::*;

    /// Assert the result has no errors.
    #[track_caller]
    pub fn assert_valid(result: &ValidationResult) {
        assert!(
            result.valid && result.errors.is_empty(),
            "Expected valid result, got errors: {:?}",
            result.errors
        );
    }

    /// Assert an error with `code` is present and return it.
    #[track_caller]
    pub fn assert_error_code<'a>(result: &'a ValidationResult, code: &str) -> &'a ValidationIssue {
        assert!(!result.valid, "Expected invalid result, got {:?}", result);
        match result.errors.iter().find(|e| e.code == code) {
            Some(issue) => issue,
            None => panic!("Expected error {}, got: {:?}", code, result.errors),
        }
    }

    /// Assert a warning with `code` is present and return it.
    #[track_caller]
    pub fn assert_warning_code<'a>(result: &'a ValidationResult, code: &str) -> &'a ValidationIssue {
        match result.warnings.iter().find(|w| w.code == code) {
            Some(issue) => issue,
            None => panic!("Expected warning {}, got: {:?}", code, result.warnings),
        }
    }

    /// Assert no issue of either severity carries `code`.
    #[track_caller]
    pub fn assert_no_code(result: &ValidationResult, code: &str) {
        let found = result
            .errors
            .iter()
            .chain(&result.warnings)
            .find(|i| i.code == code);
        assert!(found.is_none(), "Unexpected issue {}: {:?}", code, found);
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[tokio::test]
    async fn test_mock_filters_by_tenant_and_filter() -> QueryResult<()> {
        let mock = MockQueryCapability::new().with_records(
            "contact",
            [
                record(serde_json::json!({"email": "a@x.io", "tenantId": "t1"})),
                record(serde_json::json!({"email": "a@x.io", "tenantId": "t2"})),
                record(serde_json::json!({"email": "b@x.io"})),
            ],
        );

        let filter = Filter::new().eq("email", "a@x.io");
        assert_eq!(mock.count("contact", &filter, Some("t1")).await?, 1);
        assert_eq!(mock.count("contact", &filter, None).await?, 2);
        assert_eq!(mock.count("contact", &Filter::new(), Some("t2")).await?, 2);
        assert!(!mock.exists("account", &filter, None).await?);

        let calls = mock.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[0].tenant_id.as_deref(), Some("t1"));
        Ok(())
    }

    #[tokio::test]
    async fn test_failing_mock() {
        let mock = MockQueryCapability::failing("connection refused");
        assert!(matches!(
            mock.query("contact", &Filter::new(), None).await,
            Err(QueryError::Backend { .. })
        ));
    }

    #[test]
    fn test_contact_fixture() {
        let entity = fixtures::contact_entity();
        assert!(entity.field("email").is_some());
        assert_eq!(entity.field("status").map(|f| f.options.len()), Some(2));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_identifiers_are_not_keywords(name in generators::arb_identifier()) {
            prop_assert!(name != "in" && name != "not");
        }

        #[test]
        fn prop_records_survive_json(record in generators::arb_record()) {
            let json = serde_json::to_value(&Value::Object(record.clone())).unwrap();
            let back = record_from_json(json);
            prop_assert_eq!(back.len(), record.len());
        }
    }
}
