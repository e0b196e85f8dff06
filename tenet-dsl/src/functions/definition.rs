//! Function metadata

use serde::Serialize;
use std::fmt;

use super::query::QueryKind;
use crate::error::EvalResult;
use tenet_core::Value;

/// Native implementation over already-evaluated arguments.
pub type NativeFn = fn(&[Value]) -> EvalResult<Value>;

/// Catalog grouping used for documentation and client export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionCategory {
    String,
    Date,
    Math,
    Collection,
    Logic,
    Query,
}

impl FunctionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionCategory::String => "string",
            FunctionCategory::Date => "date",
            FunctionCategory::Math => "math",
            FunctionCategory::Collection => "collection",
            FunctionCategory::Logic => "logic",
            FunctionCategory::Query => "query",
        }
    }
}

impl fmt::Display for FunctionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared type tag of a parameter or return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Any,
    String,
    Number,
    Integer,
    Boolean,
    Date,
    Array,
    Object,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub description: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    pub variadic: bool,
}

impl Parameter {
    pub fn required(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: String::new(),
            required: true,
            default: None,
            variadic: false,
        }
    }

    /// Optional parameter filled with `default` when omitted.
    pub fn optional(name: impl Into<String>, param_type: ParamType, default: Value) -> Self {
        Self {
            required: false,
            default: Some(default),
            ..Self::required(name, param_type)
        }
    }

    /// Trailing parameter that absorbs any remaining arguments.
    pub fn variadic(name: impl Into<String>, param_type: ParamType, required: bool) -> Self {
        Self {
            required,
            variadic: true,
            ..Self::required(name, param_type)
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// How a function runs.
#[derive(Clone, Copy)]
pub enum FunctionImpl {
    Native(NativeFn),
    /// Needs a query capability and the asynchronous evaluator
    Query(QueryKind),
}

impl fmt::Debug for FunctionImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionImpl::Native(_) => f.write_str("Native"),
            FunctionImpl::Query(kind) => write!(f, "Query({:?})", kind),
        }
    }
}

/// A registered function with its contract.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub category: FunctionCategory,
    pub params: Vec<Parameter>,
    pub return_type: ParamType,
    pub client_evaluable: bool,
    pub examples: Vec<String>,
    #[serde(skip)]
    pub implementation: FunctionImpl,
}

impl FunctionDefinition {
    /// Native function, safe to evaluate outside the engine by default.
    pub fn native(name: impl Into<String>, category: FunctionCategory, f: NativeFn) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            category,
            params: Vec::new(),
            return_type: ParamType::Any,
            client_evaluable: true,
            examples: Vec::new(),
            implementation: FunctionImpl::Native(f),
        }
    }

    /// Query function; never client evaluable.
    pub fn query(name: impl Into<String>, kind: QueryKind) -> Self {
        Self {
            client_evaluable: false,
            implementation: FunctionImpl::Query(kind),
            ..Self::native(name, FunctionCategory::Query, |_| Ok(Value::Null))
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn param(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    pub fn returns(mut self, return_type: ParamType) -> Self {
        self.return_type = return_type;
        self
    }

    pub fn example(mut self, example: impl Into<String>) -> Self {
        self.examples.push(example.into());
        self
    }

    pub fn server_only(mut self) -> Self {
        self.client_evaluable = false;
        self
    }

    pub fn is_query(&self) -> bool {
        matches!(self.implementation, FunctionImpl::Query(_))
    }

    fn is_variadic(&self) -> bool {
        self.params.last().is_some_and(|p| p.variadic)
    }

    fn arity_text(&self) -> String {
        let required = self.params.iter().filter(|p| p.required).count();
        if self.is_variadic() {
            format!("at least {}", required)
        } else if required == self.params.len() {
            required.to_string()
        } else {
            format!("{} to {}", required, self.params.len())
        }
    }

    /// Check arity and fill omitted optional parameters from their defaults.
    pub fn bind_arguments(&self, mut args: Vec<Value>) -> EvalResult<Vec<Value>> {
        let required = self.params.iter().filter(|p| p.required).count();
        if args.len() < required || (!self.is_variadic() && args.len() > self.params.len()) {
            return Err(crate::error::EvalError::Arity {
                function: self.name.clone(),
                expected: self.arity_text(),
                got: args.len(),
            });
        }

        let supplied = args.len();
        for param in self.params.iter().skip(supplied) {
            if !param.variadic {
                args.push(param.default.clone().unwrap_or_default());
            }
        }
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;

    fn sample() -> FunctionDefinition {
        FunctionDefinition::native("round", FunctionCategory::Math, |args| Ok(args[0].clone()))
            .param(Parameter::required("value", ParamType::Number))
            .param(Parameter::optional("decimals", ParamType::Integer, Value::Int(0)))
    }

    #[test]
    fn test_bind_fills_defaults() {
        let bound = sample().bind_arguments(vec![Value::Float(1.5)]);
        assert_eq!(bound, Ok(vec![Value::Float(1.5), Value::Int(0)]));
    }

    #[test]
    fn test_bind_rejects_bad_arity() {
        let err = sample().bind_arguments(vec![]).unwrap_err();
        assert_eq!(
            err,
            EvalError::Arity {
                function: "round".into(),
                expected: "1 to 2".into(),
                got: 0,
            }
        );
        assert!(sample()
            .bind_arguments(vec![Value::Null, Value::Null, Value::Null])
            .is_err());
    }

    #[test]
    fn test_variadic_accepts_any_tail() {
        let def = FunctionDefinition::native("max", FunctionCategory::Math, |_| Ok(Value::Null))
            .param(Parameter::variadic("values", ParamType::Number, true));
        assert!(def.bind_arguments(vec![Value::Int(1); 5]).is_ok());
        assert!(matches!(
            def.bind_arguments(vec![]),
            Err(EvalError::Arity { ref expected, .. }) if expected == "at least 1"
        ));
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["returnType"], "any");
        assert_eq!(json["clientEvaluable"], true);
        assert_eq!(json["params"][1]["default"], 0);
        assert!(json.get("implementation").is_none());
    }
}
