//! Asynchronous evaluator
//!
//! Same semantics as [`Evaluator`](super::Evaluator), plus query functions.
//! Subexpressions are evaluated strictly left to right.

use futures_util::future::{BoxFuture, FutureExt};
use std::collections::BTreeMap;

use super::context::EvaluationContext;
use super::ops;
use crate::error::{EvalError, EvalResult};
use crate::functions::{run_query, FunctionImpl, FunctionRegistry};
use crate::parser::{BinaryOp, Expr};
use tenet_core::Value;

#[derive(Debug, Clone, Copy)]
pub struct AsyncEvaluator<'r> {
    registry: &'r FunctionRegistry,
}

impl<'r> AsyncEvaluator<'r> {
    pub fn new(registry: &'r FunctionRegistry) -> Self {
        Self { registry }
    }

    pub fn evaluate<'e, 'c: 'e>(
        &'e self,
        expr: &'e Expr,
        ctx: &'e EvaluationContext<'c>,
    ) -> BoxFuture<'e, EvalResult<Value>> {
        async move {
            match expr {
                Expr::Literal(value) => Ok(value.clone()),
                Expr::Identifier(name) => Ok(ctx.resolve(name)),
                Expr::Member { object, property } => {
                    Ok(ops::member(&self.evaluate(object, ctx).await?, property))
                }
                Expr::Index { object, index } => {
                    let object = self.evaluate(object, ctx).await?;
                    let index = self.evaluate(index, ctx).await?;
                    Ok(ops::index(&object, &index))
                }
                Expr::Binary {
                    op: BinaryOp::And,
                    left,
                    right,
                } => {
                    if !self.evaluate(left, ctx).await?.is_truthy() {
                        return Ok(Value::Bool(false));
                    }
                    Ok(Value::Bool(self.evaluate(right, ctx).await?.is_truthy()))
                }
                Expr::Binary {
                    op: BinaryOp::Or,
                    left,
                    right,
                } => {
                    if self.evaluate(left, ctx).await?.is_truthy() {
                        return Ok(Value::Bool(true));
                    }
                    Ok(Value::Bool(self.evaluate(right, ctx).await?.is_truthy()))
                }
                Expr::Binary { op, left, right } => {
                    let left = self.evaluate(left, ctx).await?;
                    let right = self.evaluate(right, ctx).await?;
                    ops::apply_binary(*op, &left, &right)
                }
                Expr::Unary { op, operand } => {
                    ops::apply_unary(*op, &self.evaluate(operand, ctx).await?)
                }
                Expr::Call { name, args } => self.call(name, args, ctx).await,
                Expr::Array(items) => {
                    let mut values = Vec::with_capacity(items.len());
                    for item in items {
                        values.push(self.evaluate(item, ctx).await?);
                    }
                    Ok(Value::Array(values))
                }
                Expr::Object(entries) => {
                    let mut map = BTreeMap::new();
                    for (key, value) in entries {
                        map.insert(key.clone(), self.evaluate(value, ctx).await?);
                    }
                    Ok(Value::Object(map))
                }
            }
        }
        .boxed()
    }

    async fn call(
        &self,
        name: &str,
        args: &[Expr],
        ctx: &EvaluationContext<'_>,
    ) -> EvalResult<Value> {
        let def = self.registry.resolve(name)?;

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.evaluate(arg, ctx).await?);
        }
        let values = def.bind_arguments(values)?;

        match def.implementation {
            FunctionImpl::Native(f) => f(&values),
            FunctionImpl::Query(kind) => {
                let query = ctx.query.ok_or_else(|| EvalError::QueryCapabilityRequired {
                    function: name.to_string(),
                })?;
                tracing::debug!(function = name, tenant = ?ctx.tenant_id, "running query function");
                run_query(name, kind, &values, query, ctx.tenant_id).await
            }
        }
    }
}
