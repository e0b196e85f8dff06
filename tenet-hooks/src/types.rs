//! Hook context and result types

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use tenet_core::{Operation, Record, UserContext, Value};

/// Opaque handle for hooks that need their own data access.
///
/// The engine passes it through untouched; hooks downcast it.
pub type HookServices = Arc<dyn Any + Send + Sync>;

/// Before and after values of one changed field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: Value,
    pub new: Value,
}

/// Fields whose values differ between `original` and `record`.
///
/// Fields present only in `record` count as changed with a null `old`.
/// Returns `None` without an original, i.e. on create.
pub fn compute_changes(
    record: &Record,
    original: Option<&Record>,
) -> Option<BTreeMap<String, FieldChange>> {
    let original = original?;
    let changes = record
        .iter()
        .filter_map(|(key, new)| {
            let old = original.get(key).cloned().unwrap_or_default();
            (old != *new).then(|| {
                (
                    key.clone(),
                    FieldChange {
                        old,
                        new: new.clone(),
                    },
                )
            })
        })
        .collect();
    Some(changes)
}

// ============================================================================
// HOOK CONTEXT
// ============================================================================

/// Everything a hook can see about the operation in flight.
#[derive(Clone)]
pub struct HookContext {
    pub entity: String,
    pub operation: Operation,
    /// In-flight record, including updates from earlier hooks
    pub record: Record,
    pub original: Option<Record>,
    /// Field diff of `record` against `original`, refreshed as hook
    /// updates merge in; `None` on create
    pub changes: Option<BTreeMap<String, FieldChange>>,
    pub user: Option<UserContext>,
    pub services: Option<HookServices>,
}

impl HookContext {
    pub fn new(entity: impl Into<String>, operation: Operation, record: Record) -> Self {
        Self {
            entity: entity.into(),
            operation,
            record,
            original: None,
            changes: None,
            user: None,
            services: None,
        }
    }

    /// Attach the prior record and compute the diff against it.
    pub fn with_original(mut self, original: Option<Record>) -> Self {
        self.changes = compute_changes(&self.record, original.as_ref());
        self.original = original;
        self
    }

    /// Merge a hook's update into the record and refresh the diff.
    pub fn apply_update(&mut self, update: &Record) {
        self.record
            .extend(update.iter().map(|(k, v)| (k.clone(), v.clone())));
        if self.original.is_some() {
            self.changes = compute_changes(&self.record, self.original.as_ref());
        }
    }

    pub fn with_user(mut self, user: Option<UserContext>) -> Self {
        self.user = user;
        self
    }

    pub fn with_services(mut self, services: HookServices) -> Self {
        self.services = Some(services);
        self
    }

    /// Downcast the services handle.
    pub fn services<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.services.as_deref()?.downcast_ref::<T>()
    }

    pub fn changed(&self, field: &str) -> bool {
        self.changes
            .as_ref()
            .is_some_and(|changes| changes.contains_key(field))
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.tenant_id.as_str())
    }
}

impl fmt::Debug for HookContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookContext")
            .field("entity", &self.entity)
            .field("operation", &self.operation)
            .field("record", &self.record)
            .field("original", &self.original)
            .field(
                "changes",
                &self
                    .changes
                    .as_ref()
                    .map(|c| c.keys().collect::<BTreeSet<_>>()),
            )
            .field("user", &self.user)
            .field("services", &self.services.as_ref().map(|_| "<services>"))
            .finish()
    }
}

// ============================================================================
// HOOK RESULT
// ============================================================================

/// What a hook asks the engine to do.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HookResult {
    /// Fields to merge into the in-flight record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<Record>,
    /// Reason to fail the operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort: Option<String>,
}

impl HookResult {
    pub fn update(fields: Record) -> Self {
        Self {
            update: Some(fields),
            abort: None,
        }
    }

    pub fn abort(reason: impl Into<String>) -> Self {
        Self {
            update: None,
            abort: Some(reason.into()),
        }
    }

    pub fn is_abort(&self) -> bool {
        self.abort.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenet_core::record_from_json;
    use serde_json::json;

    #[test]
    fn test_compute_changes_on_create_is_none() {
        let record = record_from_json(json!({"a": 1}));
        assert!(compute_changes(&record, None).is_none());
    }

    #[test]
    fn test_compute_changes_reports_old_and_new() {
        let original = record_from_json(json!({"status": "draft", "qty": 1, "sku": "A"}));
        let record = record_from_json(json!({"status": "sent", "qty": 1, "sku": "A", "note": "x"}));

        let changes = compute_changes(&record, Some(&original)).unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(
            changes["status"],
            FieldChange {
                old: Value::from("draft"),
                new: Value::from("sent"),
            }
        );
        assert_eq!(changes["note"].old, Value::Null);
    }

    #[test]
    fn test_context_tracks_changes() {
        let ctx = HookContext::new("order", Operation::Update, record_from_json(json!({"qty": 2})))
            .with_original(Some(record_from_json(json!({"qty": 1}))));
        assert!(ctx.changed("qty"));
        assert!(!ctx.changed("sku"));
    }

    #[test]
    fn test_apply_update_refreshes_changes() {
        let mut ctx = HookContext::new("order", Operation::Update, record_from_json(json!({"qty": 1})))
            .with_original(Some(record_from_json(json!({"qty": 1, "total": 10}))));
        assert!(!ctx.changed("total"));

        ctx.apply_update(&record_from_json(json!({"total": 12})));
        assert_eq!(ctx.record["total"], Value::from(12));
        assert!(ctx.changed("total"));

        let mut created = HookContext::new("order", Operation::Create, Record::new());
        created.apply_update(&record_from_json(json!({"total": 12})));
        assert!(created.changes.is_none());
    }

    #[test]
    fn test_services_downcast() {
        struct Clock(i64);

        let ctx = HookContext::new("order", Operation::Create, Record::new())
            .with_services(Arc::new(Clock(42)));
        assert_eq!(ctx.services::<Clock>().map(|c| c.0), Some(42));
        assert!(ctx.services::<String>().is_none());
    }
}
