//! Evaluation context

use std::collections::BTreeMap;

use tenet_core::{QueryCapability, Record, Value};

/// Inputs visible to one evaluation.
///
/// Identifiers resolve against `record` and `original` (reserved names),
/// then `variables`, then the fields of the current record.
#[derive(Clone, Default)]
pub struct EvaluationContext<'a> {
    pub record: Option<&'a Record>,
    pub original: Option<&'a Record>,
    pub variables: BTreeMap<String, Value>,
    pub query: Option<&'a dyn QueryCapability>,
    pub tenant_id: Option<&'a str>,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(record: &'a Record) -> Self {
        Self {
            record: Some(record),
            ..Self::default()
        }
    }

    pub fn with_original(mut self, original: Option<&'a Record>) -> Self {
        self.original = original;
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn with_variables(mut self, variables: BTreeMap<String, Value>) -> Self {
        self.variables.extend(variables);
        self
    }

    pub fn with_query(mut self, query: &'a dyn QueryCapability) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_tenant(mut self, tenant_id: Option<&'a str>) -> Self {
        self.tenant_id = tenant_id;
        self
    }

    /// Resolve a bare identifier. Unknown names are null.
    pub fn resolve(&self, name: &str) -> Value {
        match name {
            "record" => Value::Object(self.record.cloned().unwrap_or_default()),
            "original" => Value::Object(self.original.cloned().unwrap_or_default()),
            _ => self
                .variables
                .get(name)
                .or_else(|| self.record.and_then(|r| r.get(name)))
                .cloned()
                .unwrap_or_default(),
        }
    }
}

impl std::fmt::Debug for EvaluationContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("record", &self.record)
            .field("original", &self.original)
            .field("variables", &self.variables)
            .field("query", &self.query.map(|_| "<capability>"))
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_order() {
        let mut record = Record::new();
        record.insert("status".into(), Value::from("open"));
        record.insert("limit".into(), Value::from(5));

        let ctx = EvaluationContext::new(&record).with_variable("limit", 10);
        assert_eq!(ctx.resolve("limit"), Value::from(10));
        assert_eq!(ctx.resolve("status"), Value::from("open"));
        assert_eq!(ctx.resolve("missing"), Value::Null);
        assert_eq!(ctx.resolve("original"), Value::Object(Record::new()));
        assert_eq!(ctx.resolve("record"), Value::Object(record.clone()));
    }
}
