//! Query functions: `exists`, `count` and `lookup`
//!
//! These have no synchronous implementation. The asynchronous evaluator
//! dispatches them here with the context's query capability and tenant.

use serde::Serialize;

use crate::error::{EvalError, EvalResult};
use tenet_core::{Filter, QueryCapability, Value};

/// Which query a query function issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    Exists,
    Count,
    Lookup,
}

/// Run a query function over bound arguments.
pub async fn run_query(
    function: &str,
    kind: QueryKind,
    args: &[Value],
    query: &dyn QueryCapability,
    tenant_id: Option<&str>,
) -> EvalResult<Value> {
    let entity = args
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| EvalError::invalid_argument(function, "entity name must be a string"))?;

    match kind {
        QueryKind::Exists => {
            let filter = Filter::from_value(args.get(1).unwrap_or(&Value::Null))?;
            Ok(Value::Bool(query.exists(entity, &filter, tenant_id).await?))
        }
        QueryKind::Count => {
            let filter = Filter::from_value(args.get(1).unwrap_or(&Value::Null))?;
            let count = query.count(entity, &filter, tenant_id).await?;
            Ok(i64::try_from(count)
                .map(Value::Int)
                .unwrap_or(Value::Float(count as f64)))
        }
        QueryKind::Lookup => {
            let field = args
                .get(1)
                .and_then(Value::as_str)
                .ok_or_else(|| EvalError::invalid_argument(function, "field name must be a string"))?;
            let filter = Filter::from_value(args.get(2).unwrap_or(&Value::Null))?;
            let rows = query.query(entity, &filter, tenant_id).await?;
            Ok(rows
                .first()
                .and_then(|row| row.get(field))
                .cloned()
                .unwrap_or_default())
        }
    }
}
