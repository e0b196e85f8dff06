//! Defaulting: field values computed before validation
//!
//! Defaults apply in the order given because a later expression may read
//! a field an earlier default just wrote. Evaluation is synchronous; a
//! default expression cannot call query functions.

use chrono::{DateTime, Utc};

use tenet_core::{
    AutoSource, DefaultDefinition, DefaultPolicy, GuardFailurePolicy, Operation, Record,
    UserContext, Value,
};
use tenet_dsl::{EvaluationContext, ExpressionEngine};

use crate::error::{EngineError, EngineResult};

/// Applies declared defaults and auto-filled fields.
#[derive(Debug, Clone, Default)]
pub struct DefaultingService {
    engine: ExpressionEngine,
    guard_policy: GuardFailurePolicy,
}

impl DefaultingService {
    pub fn new(engine: ExpressionEngine) -> Self {
        Self {
            engine,
            guard_policy: GuardFailurePolicy::Skip,
        }
    }

    pub fn with_guard_policy(mut self, policy: GuardFailurePolicy) -> Self {
        self.guard_policy = policy;
        self
    }

    /// Apply `defaults` in order to a copy of `record`.
    ///
    /// Expressions and guards see the record as it stands after every
    /// earlier default, plus `original` and the caller as `context`.
    pub fn apply_defaults(
        &self,
        record: &Record,
        defaults: &[DefaultDefinition],
        operation: Operation,
        original: Option<&Record>,
        user: Option<&UserContext>,
    ) -> EngineResult<Record> {
        let mut result = record.clone();

        for default in defaults {
            if !default.applies_to(operation) {
                continue;
            }

            let computed = {
                let ctx = expression_context(&result, original, user);

                if let Some(guard) = default.when.as_deref() {
                    match self.engine.evaluate_bool(guard, &ctx) {
                        Ok(true) => {}
                        Ok(false) => continue,
                        Err(source) if self.guard_policy == GuardFailurePolicy::Reject => {
                            return Err(EngineError::Guard {
                                rule: format!("default for '{}'", default.field),
                                source,
                            });
                        }
                        Err(e) => {
                            tracing::warn!(
                                field = %default.field,
                                guard = %guard,
                                error = %e,
                                "Default guard failed to evaluate, skipping default"
                            );
                            continue;
                        }
                    }
                }

                let current = result.get(&default.field).unwrap_or(&Value::Null);
                if default.policy == DefaultPolicy::Default && !current.is_blank() {
                    continue;
                }

                match (&default.expression, &default.value) {
                    (Some(expression), _) => match self.engine.evaluate(expression, &ctx) {
                        Ok(value) => value,
                        Err(source) if self.guard_policy == GuardFailurePolicy::Reject => {
                            return Err(EngineError::Default {
                                field: default.field.clone(),
                                source,
                            });
                        }
                        Err(e) => {
                            tracing::warn!(
                                field = %default.field,
                                expression = %expression,
                                error = %e,
                                "Default expression failed to evaluate, skipping default"
                            );
                            continue;
                        }
                    },
                    (None, Some(value)) if !value.is_null() => value.clone(),
                    _ => continue,
                }
            };

            result.insert(default.field.clone(), computed);
        }

        Ok(result)
    }

    /// Fill auto fields on a copy of `record`.
    ///
    /// A field that already holds a value is left alone, so resubmitting a
    /// prepared record yields the same record.
    pub fn apply_auto_fields(
        &self,
        record: &Record,
        operation: Operation,
        auto_fields: &[(String, AutoSource)],
        user: Option<&UserContext>,
        now: DateTime<Utc>,
    ) -> Record {
        let mut result = record.clone();

        for (field, source) in auto_fields {
            if result.get(field).is_some_and(|v| !v.is_null()) {
                continue;
            }
            if !auto_applies(field, *source, operation) {
                continue;
            }

            let value = match source {
                AutoSource::Now => Some(Value::Timestamp(now)),
                AutoSource::UserId => user
                    .filter(|u| !u.user_id.is_empty())
                    .map(|u| Value::from(u.user_id.as_str())),
                AutoSource::TenantId => user
                    .filter(|u| !u.tenant_id.is_empty())
                    .map(|u| Value::from(u.tenant_id.as_str())),
            };
            if let Some(value) = value {
                result.insert(field.clone(), value);
            }
        }

        result
    }
}

/// `updatedAt` and `updatedBy` follow every write; everything else is
/// stamped once on create.
fn auto_applies(field: &str, source: AutoSource, operation: Operation) -> bool {
    match (source, field) {
        (AutoSource::Now, "updatedAt") | (AutoSource::UserId, "updatedBy") => {
            matches!(operation, Operation::Create | Operation::Update)
        }
        _ => operation == Operation::Create,
    }
}

fn expression_context<'a>(
    record: &'a Record,
    original: Option<&'a Record>,
    user: Option<&UserContext>,
) -> EvaluationContext<'a> {
    let ctx = EvaluationContext::new(record).with_original(original);
    match user {
        Some(user) => ctx.with_variable("context", user.to_value()),
        None => ctx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tenet_test_utils::{fixtures, record};

    fn service() -> DefaultingService {
        DefaultingService::new(ExpressionEngine::with_builtins())
    }

    #[test]
    fn test_full_name_overwrite() {
        let defaults = vec![DefaultDefinition::expression(
            "fullName",
            r#"concat(firstName, " ", lastName)"#,
        )
        .with_policy(DefaultPolicy::Overwrite)
        .on([Operation::Create, Operation::Update])];

        let rec = record(json!({"firstName": "John", "lastName": "Doe", "fullName": "stale"}));
        let out = service()
            .apply_defaults(&rec, &defaults, Operation::Update, None, None)
            .unwrap();
        assert_eq!(out["fullName"], Value::from("John Doe"));
    }

    #[test]
    fn test_default_policy_keeps_present_values() {
        let defaults = vec![
            DefaultDefinition::value("status", "active"),
            DefaultDefinition::value("source", "web"),
        ];
        let rec = record(json!({"status": "lead", "source": "  "}));
        let out = service()
            .apply_defaults(&rec, &defaults, Operation::Create, None, None)
            .unwrap();
        assert_eq!(out["status"], Value::from("lead"));
        assert_eq!(out["source"], Value::from("web"));
    }

    #[test]
    fn test_later_defaults_see_earlier_ones() {
        let defaults = vec![
            DefaultDefinition::value("qty", 2),
            DefaultDefinition::expression("total", "qty * price"),
        ];
        let rec = record(json!({"price": 5}));
        let out = service()
            .apply_defaults(&rec, &defaults, Operation::Create, None, None)
            .unwrap();
        assert_eq!(out["total"], Value::Int(10));
    }

    #[test]
    fn test_guards_and_context() {
        let defaults = vec![
            DefaultDefinition::value("priority", "high").when("amount > 1000"),
            DefaultDefinition::expression("owner", "context.userId"),
        ];
        let user = fixtures::user();
        let out = service()
            .apply_defaults(&record(json!({"amount": 10})), &defaults, Operation::Create, None, Some(&user))
            .unwrap();
        assert!(!out.contains_key("priority"));
        assert_eq!(out["owner"], Value::from("user-1"));
    }

    #[test]
    fn test_failing_expression_follows_policy() {
        let defaults = vec![DefaultDefinition::expression("ratio", "amount / 0")];
        let rec = record(json!({"amount": 10}));

        let out = service()
            .apply_defaults(&rec, &defaults, Operation::Create, None, None)
            .unwrap();
        assert!(!out.contains_key("ratio"));

        let err = service()
            .with_guard_policy(GuardFailurePolicy::Reject)
            .apply_defaults(&rec, &defaults, Operation::Create, None, None)
            .unwrap_err();
        assert!(matches!(err, EngineError::Default { ref field, .. } if field == "ratio"));
    }

    #[test]
    fn test_auto_fields() {
        let auto = vec![
            ("tenantId".to_string(), AutoSource::TenantId),
            ("createdAt".to_string(), AutoSource::Now),
            ("updatedAt".to_string(), AutoSource::Now),
            ("createdBy".to_string(), AutoSource::UserId),
        ];
        let user = fixtures::user();
        let now = Utc::now();

        let created = service().apply_auto_fields(&record(json!({})), Operation::Create, &auto, Some(&user), now);
        assert_eq!(created["tenantId"], Value::from("tenant-1"));
        assert_eq!(created["createdAt"], Value::Timestamp(now));
        assert_eq!(created["createdBy"], Value::from("user-1"));

        let updated = service().apply_auto_fields(&record(json!({})), Operation::Update, &auto, Some(&user), now);
        assert_eq!(updated.keys().collect::<Vec<_>>(), vec!["updatedAt"]);

        // present values are never replaced
        let again = service().apply_auto_fields(&created, Operation::Create, &auto, Some(&user), Utc::now());
        assert_eq!(again, created);
    }
}
