//! Synchronous evaluator

use std::collections::BTreeMap;

use super::context::EvaluationContext;
use super::ops;
use crate::error::{EvalError, EvalResult};
use crate::functions::{FunctionImpl, FunctionRegistry};
use crate::parser::{BinaryOp, Expr};
use tenet_core::Value;

/// Evaluates an AST against a context using a function registry.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'r> {
    registry: &'r FunctionRegistry,
}

impl<'r> Evaluator<'r> {
    pub fn new(registry: &'r FunctionRegistry) -> Self {
        Self { registry }
    }

    pub fn evaluate(&self, expr: &Expr, ctx: &EvaluationContext<'_>) -> EvalResult<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Identifier(name) => Ok(ctx.resolve(name)),
            Expr::Member { object, property } => {
                Ok(ops::member(&self.evaluate(object, ctx)?, property))
            }
            Expr::Index { object, index } => {
                let object = self.evaluate(object, ctx)?;
                let index = self.evaluate(index, ctx)?;
                Ok(ops::index(&object, &index))
            }
            Expr::Binary {
                op: BinaryOp::And,
                left,
                right,
            } => {
                if !self.evaluate(left, ctx)?.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.evaluate(right, ctx)?.is_truthy()))
            }
            Expr::Binary {
                op: BinaryOp::Or,
                left,
                right,
            } => {
                if self.evaluate(left, ctx)?.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.evaluate(right, ctx)?.is_truthy()))
            }
            Expr::Binary { op, left, right } => {
                let left = self.evaluate(left, ctx)?;
                let right = self.evaluate(right, ctx)?;
                ops::apply_binary(*op, &left, &right)
            }
            Expr::Unary { op, operand } => ops::apply_unary(*op, &self.evaluate(operand, ctx)?),
            Expr::Call { name, args } => self.call(name, args, ctx),
            Expr::Array(items) => items
                .iter()
                .map(|item| self.evaluate(item, ctx))
                .collect::<EvalResult<Vec<_>>>()
                .map(Value::Array),
            Expr::Object(entries) => entries
                .iter()
                .map(|(key, value)| Ok((key.clone(), self.evaluate(value, ctx)?)))
                .collect::<EvalResult<BTreeMap<_, _>>>()
                .map(Value::Object),
        }
    }

    fn call(&self, name: &str, args: &[Expr], ctx: &EvaluationContext<'_>) -> EvalResult<Value> {
        let def = self.registry.resolve(name)?;
        let native = match def.implementation {
            FunctionImpl::Native(f) => f,
            FunctionImpl::Query(_) => {
                return Err(EvalError::AsyncRequired {
                    function: name.to_string(),
                })
            }
        };

        let values = args
            .iter()
            .map(|arg| self.evaluate(arg, ctx))
            .collect::<EvalResult<Vec<_>>>()?;
        native(&def.bind_arguments(values)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use tenet_core::Record;

    fn eval(source: &str, record: &Record) -> EvalResult<Value> {
        let registry = FunctionRegistry::with_builtins();
        let expr = parse(source).map_err(|e| EvalError::mismatch(e.to_string()))?;
        Evaluator::new(&registry).evaluate(&expr, &EvaluationContext::new(record))
    }

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_short_circuit_skips_failing_right_side() {
        let r = Record::new();
        assert_eq!(eval("false && 1 / 0", &r), Ok(Value::Bool(false)));
        assert_eq!(eval("true || unknownFn()", &r), Ok(Value::Bool(true)));
        assert_eq!(eval("1 && 'x'", &r), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_member_and_index_on_null() {
        let r = record(&[("owner", Value::Null)]);
        assert_eq!(eval("owner.name", &r), Ok(Value::Null));
        assert_eq!(eval("owner[0]", &r), Ok(Value::Null));
        assert_eq!(eval("missing.deep.path", &r), Ok(Value::Null));
    }

    #[test]
    fn test_original_access() {
        let r = record(&[("status", "closed".into())]);
        assert_eq!(eval("original.status", &r), Ok(Value::Null));
        assert_eq!(eval("record.status", &r), Ok(Value::from("closed")));
    }

    #[test]
    fn test_query_function_needs_async_path() {
        assert_eq!(
            eval("exists('contact', {})", &Record::new()),
            Err(EvalError::AsyncRequired {
                function: "exists".into()
            })
        );
    }

    #[test]
    fn test_unknown_function() {
        assert_eq!(
            eval("frobnicate(1)", &Record::new()),
            Err(EvalError::UnknownFunction {
                name: "frobnicate".into()
            })
        );
    }

    #[test]
    fn test_arity_is_checked() {
        assert!(matches!(
            eval("len()", &Record::new()),
            Err(EvalError::Arity { got: 0, .. })
        ));
    }

    #[test]
    fn test_literals_evaluate_elements() {
        let r = record(&[("a", 2.into())]);
        assert_eq!(
            eval("{x: a * 2, y: [a, 'b']}.y[1]", &r),
            Ok(Value::from("b"))
        );
    }
}
