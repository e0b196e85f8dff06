//! Expression engine facade
//!
//! Owns a shared function registry and turns source text into values.
//! Every call parses afresh; ASTs are never cached.

use std::sync::Arc;

use crate::error::{EvalError, ExpressionResult};
use crate::eval::{AsyncEvaluator, EvaluationContext, Evaluator};
use crate::functions::FunctionRegistry;
use crate::parser::{parse, Expr};
use tenet_core::Value;

#[derive(Debug, Clone)]
pub struct ExpressionEngine {
    registry: Arc<FunctionRegistry>,
}

impl Default for ExpressionEngine {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ExpressionEngine {
    pub fn new(registry: Arc<FunctionRegistry>) -> Self {
        Self { registry }
    }

    /// Engine over the standard builtin catalog.
    pub fn with_builtins() -> Self {
        Self::new(Arc::new(FunctionRegistry::with_builtins()))
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn parse(&self, source: &str) -> ExpressionResult<Expr> {
        parse(source)
    }

    /// Parse and verify every called function is registered.
    pub fn check(&self, source: &str) -> ExpressionResult<Expr> {
        let expr = parse(source)?;
        if let Some(unknown) = expr
            .called_functions()
            .into_iter()
            .find(|name| !self.registry.contains(name))
        {
            return Err(EvalError::UnknownFunction {
                name: unknown.to_string(),
            }
            .into());
        }
        Ok(expr)
    }

    /// Whether a client holding the safe subset can evaluate `source` itself.
    pub fn is_client_evaluable(&self, source: &str) -> ExpressionResult<bool> {
        let expr = self.check(source)?;
        Ok(expr.called_functions().into_iter().all(|name| {
            self.registry
                .get(name)
                .is_some_and(|f| f.client_evaluable)
        }))
    }

    /// Evaluate synchronously. Query functions fail with `AsyncRequired`.
    pub fn evaluate(&self, source: &str, ctx: &EvaluationContext<'_>) -> ExpressionResult<Value> {
        let expr = parse(source)?;
        Ok(Evaluator::new(&self.registry).evaluate(&expr, ctx)?)
    }

    /// Evaluate synchronously and coerce the result to a boolean.
    pub fn evaluate_bool(&self, source: &str, ctx: &EvaluationContext<'_>) -> ExpressionResult<bool> {
        Ok(self.evaluate(source, ctx)?.is_truthy())
    }

    /// Evaluate with query function support.
    pub async fn evaluate_async(
        &self,
        source: &str,
        ctx: &EvaluationContext<'_>,
    ) -> ExpressionResult<Value> {
        let expr = parse(source)?;
        Ok(AsyncEvaluator::new(&self.registry)
            .evaluate(&expr, ctx)
            .await?)
    }

    pub async fn evaluate_bool_async(
        &self,
        source: &str,
        ctx: &EvaluationContext<'_>,
    ) -> ExpressionResult<bool> {
        Ok(self.evaluate_async(source, ctx).await?.is_truthy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExpressionError;
    use tenet_core::Record;

    #[test]
    fn test_check_rejects_unknown_functions() {
        let engine = ExpressionEngine::with_builtins();
        assert!(engine.check("len(name) > 1").is_ok());
        assert!(matches!(
            engine.check("len(nope(name))"),
            Err(ExpressionError::Eval(EvalError::UnknownFunction { ref name })) if name == "nope"
        ));
    }

    #[test]
    fn test_client_evaluable() -> Result<(), ExpressionError> {
        let engine = ExpressionEngine::with_builtins();
        assert!(engine.is_client_evaluable("upper(a) == 'X'")?);
        assert!(!engine.is_client_evaluable("!exists('contact', {email: email})")?);
        Ok(())
    }

    #[test]
    fn test_evaluate_bool_uses_truthiness() -> Result<(), ExpressionError> {
        let engine = ExpressionEngine::with_builtins();
        let record = Record::new();
        let ctx = EvaluationContext::new(&record);
        assert!(!engine.evaluate_bool("missing", &ctx)?);
        assert!(engine.evaluate_bool("'x'", &ctx)?);
        Ok(())
    }
}
