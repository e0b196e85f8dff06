//! Query filters handed to a query capability
//!
//! Filters are conjunctions of simple field conditions. They can be built
//! in code or converted from the object form used inside expressions and
//! validator parameters.

use serde::{Deserialize, Serialize};

use crate::{QueryError, QueryResult, Record, Value};

/// Filter operator for field comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    /// Equal to
    Eq,
    /// Not equal to
    Neq,
}

/// One `field op value` condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub field: String,
    pub op: FilterOperator,
    pub value: Value,
}

impl FilterCondition {
    pub fn matches(&self, record: &Record) -> bool {
        let actual = record.get(&self.field).unwrap_or(&Value::Null);
        let equal = actual.semantic_eq(&self.value);
        match self.op {
            FilterOperator::Eq => equal,
            FilterOperator::Neq => !equal,
        }
    }
}

/// Conjunction of conditions. An empty filter matches everything.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Filter {
    pub conditions: Vec<FilterCondition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(FilterCondition {
            field: field.into(),
            op: FilterOperator::Eq,
            value: value.into(),
        });
        self
    }

    pub fn neq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(FilterCondition {
            field: field.into(),
            op: FilterOperator::Neq,
            value: value.into(),
        });
        self
    }

    /// Append every condition of another filter.
    pub fn and(mut self, other: Filter) -> Self {
        self.conditions.extend(other.conditions);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().all(|c| c.matches(record))
    }

    /// Build a filter from its object form.
    ///
    /// Accepts `{"field": value, ...}` (equality per key) or
    /// `{"and": [{"field": f, "op": "eq"|"neq", "value": v}, ...]}`.
    /// Null yields an empty filter.
    pub fn from_value(value: &Value) -> QueryResult<Filter> {
        let map = match value {
            Value::Null => return Ok(Filter::new()),
            Value::Object(map) => map,
            other => {
                return Err(QueryError::InvalidFilter {
                    reason: format!("expected an object, got {}", other.type_name()),
                })
            }
        };

        match map.get("and") {
            Some(Value::Array(items)) if map.len() == 1 => {
                items
                    .iter()
                    .try_fold(Filter::new(), |filter, item| -> QueryResult<Filter> {
                        Ok(filter.and_condition(parse_condition(item)?))
                    })
            }
            _ => Ok(Filter {
                conditions: map
                    .iter()
                    .map(|(field, value)| FilterCondition {
                        field: field.clone(),
                        op: FilterOperator::Eq,
                        value: value.clone(),
                    })
                    .collect(),
            }),
        }
    }

    fn and_condition(mut self, condition: FilterCondition) -> Self {
        self.conditions.push(condition);
        self
    }
}

fn parse_condition(item: &Value) -> QueryResult<FilterCondition> {
    let map = item.as_object().ok_or_else(|| QueryError::InvalidFilter {
        reason: "condition must be an object".to_string(),
    })?;
    let field = map
        .get("field")
        .and_then(Value::as_str)
        .ok_or_else(|| QueryError::InvalidFilter {
            reason: "condition is missing 'field'".to_string(),
        })?;
    let op = match map.get("op").and_then(Value::as_str).unwrap_or("eq") {
        "eq" => FilterOperator::Eq,
        "neq" | "ne" => FilterOperator::Neq,
        other => {
            return Err(QueryError::InvalidFilter {
                reason: format!("unsupported operator '{}'", other),
            })
        }
    };
    Ok(FilterCondition {
        field: field.to_string(),
        op,
        value: map.get("value").cloned().unwrap_or(Value::Null),
    })
}
