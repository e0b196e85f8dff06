//! Operator semantics shared by the synchronous and asynchronous evaluators

use std::cmp::Ordering;

use crate::error::{EvalError, EvalResult};
use crate::parser::{BinaryOp, UnaryOp};
use tenet_core::Value;

/// Apply a non-short-circuit binary operator to evaluated operands.
pub fn apply_binary(op: BinaryOp, left: &Value, right: &Value) -> EvalResult<Value> {
    match op {
        BinaryOp::Or => Ok(Value::Bool(left.is_truthy() || right.is_truthy())),
        BinaryOp::And => Ok(Value::Bool(left.is_truthy() && right.is_truthy())),
        BinaryOp::Eq => Ok(Value::Bool(left.semantic_eq(right))),
        BinaryOp::Ne => Ok(Value::Bool(!left.semantic_eq(right))),
        BinaryOp::Lt => ordering(left, right).map(|o| Value::Bool(o == Ordering::Less)),
        BinaryOp::Le => ordering(left, right).map(|o| Value::Bool(o != Ordering::Greater)),
        BinaryOp::Gt => ordering(left, right).map(|o| Value::Bool(o == Ordering::Greater)),
        BinaryOp::Ge => ordering(left, right).map(|o| Value::Bool(o != Ordering::Less)),
        BinaryOp::In => membership(left, right).map(Value::Bool),
        BinaryOp::NotIn => membership(left, right).map(|found| Value::Bool(!found)),
        BinaryOp::Add => add(left, right),
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            arithmetic(op, left, right)
        }
    }
}

/// Apply a unary operator.
pub fn apply_unary(op: UnaryOp, operand: &Value) -> EvalResult<Value> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
        UnaryOp::Neg => match operand {
            Value::Null => Ok(Value::Null),
            Value::Int(i) => Ok(i
                .checked_neg()
                .map(Value::Int)
                .unwrap_or(Value::Float(-(*i as f64)))),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(EvalError::mismatch(format!(
                "Cannot negate non-numeric value: {}",
                other.type_name()
            ))),
        },
    }
}

/// `object.property`; anything but an object yields null.
pub fn member(object: &Value, property: &str) -> Value {
    match object {
        Value::Object(map) => map.get(property).cloned().unwrap_or_default(),
        _ => Value::Null,
    }
}

/// `object[index]`. Objects index by string key; arrays and strings by a
/// non-negative integer. Everything else yields null.
pub fn index(object: &Value, index: &Value) -> Value {
    match (object, index) {
        (Value::Object(map), Value::String(key)) => map.get(key).cloned().unwrap_or_default(),
        (Value::Array(items), Value::Int(i)) => usize::try_from(*i)
            .ok()
            .and_then(|i| items.get(i))
            .cloned()
            .unwrap_or_default(),
        (Value::String(s), Value::Int(i)) => usize::try_from(*i)
            .ok()
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::String(c.to_string()))
            .unwrap_or_default(),
        _ => Value::Null,
    }
}

/// `item in container`.
///
/// Strings test for a substring, arrays for an equal element and objects for
/// a key. A null container contains nothing.
pub fn membership(item: &Value, container: &Value) -> EvalResult<bool> {
    match container {
        Value::Null => Ok(false),
        Value::String(haystack) => Ok(match item {
            Value::Null => false,
            other => haystack.contains(other.to_display_string().as_str()),
        }),
        Value::Array(items) => Ok(items.iter().any(|v| v.semantic_eq(item))),
        Value::Object(map) => Ok(item.as_str().is_some_and(|key| map.contains_key(key))),
        other => Err(EvalError::mismatch(format!(
            "'in' operator requires collection, got {}",
            other.type_name()
        ))),
    }
}

fn ordering(left: &Value, right: &Value) -> EvalResult<Ordering> {
    left.compare(right).ok_or_else(|| {
        EvalError::mismatch(format!(
            "Cannot compare {} and {}",
            left.type_name(),
            right.type_name()
        ))
    })
}

fn add(left: &Value, right: &Value) -> EvalResult<Value> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::String(_), _) | (_, Value::String(_)) => Ok(Value::String(format!(
            "{}{}",
            left.to_display_string(),
            right.to_display_string()
        ))),
        _ => arithmetic(BinaryOp::Add, left, right),
    }
}

/// Numeric arithmetic. Integer results that overflow fall back to floats.
fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> EvalResult<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }

    let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
        let verb = match op {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "subtract",
            BinaryOp::Mul => "multiply",
            BinaryOp::Div => "divide",
            _ => "modulo",
        };
        return Err(EvalError::mismatch(format!(
            "Cannot {} {} and {}",
            verb,
            left.type_name(),
            right.type_name()
        )));
    };

    match op {
        BinaryOp::Div if b == 0.0 => return Err(EvalError::DivisionByZero),
        BinaryOp::Mod if b == 0.0 => return Err(EvalError::ModuloByZero),
        BinaryOp::Div => return Ok(Value::Float(a / b)),
        _ => {}
    }

    if let (Value::Int(x), Value::Int(y)) = (left, right) {
        let exact = match op {
            BinaryOp::Add => x.checked_add(*y),
            BinaryOp::Sub => x.checked_sub(*y),
            BinaryOp::Mul => x.checked_mul(*y),
            _ => x.checked_rem_euclid(*y).map(|r| {
                // Remainder takes the sign of the divisor
                if r != 0 && *y < 0 {
                    r + y
                } else {
                    r
                }
            }),
        };
        if let Some(i) = exact {
            return Ok(Value::Int(i));
        }
    }

    Ok(Value::Float(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        _ => {
            let r = a % b;
            if r != 0.0 && (r < 0.0) != (b < 0.0) {
                r + b
            } else {
                r
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bin(op: BinaryOp, l: impl Into<Value>, r: impl Into<Value>) -> EvalResult<Value> {
        apply_binary(op, &l.into(), &r.into())
    }

    #[test]
    fn test_add_concatenates_strings() {
        assert_eq!(bin(BinaryOp::Add, "a", 1), Ok(Value::from("a1")));
        assert_eq!(bin(BinaryOp::Add, 2.0, "x"), Ok(Value::from("2.0x")));
        assert_eq!(bin(BinaryOp::Add, true, "!"), Ok(Value::from("true!")));
    }

    #[test]
    fn test_null_propagates_through_arithmetic() {
        for op in [BinaryOp::Add, BinaryOp::Sub, BinaryOp::Mul, BinaryOp::Div, BinaryOp::Mod] {
            assert_eq!(bin(op, Value::Null, 0), Ok(Value::Null));
            assert_eq!(bin(op, 1, Value::Null), Ok(Value::Null));
        }
    }

    #[test]
    fn test_division() {
        assert_eq!(bin(BinaryOp::Div, 7, 2), Ok(Value::Float(3.5)));
        assert_eq!(bin(BinaryOp::Div, 6, 3), Ok(Value::Float(2.0)));
        assert_eq!(bin(BinaryOp::Div, 1, 0), Err(EvalError::DivisionByZero));
        assert_eq!(bin(BinaryOp::Mod, 1, 0.0), Err(EvalError::ModuloByZero));
    }

    #[test]
    fn test_modulo_takes_divisor_sign() {
        assert_eq!(bin(BinaryOp::Mod, 7, 3), Ok(Value::Int(1)));
        assert_eq!(bin(BinaryOp::Mod, -7, 3), Ok(Value::Int(2)));
        assert_eq!(bin(BinaryOp::Mod, 7, -3), Ok(Value::Int(-2)));
        assert_eq!(bin(BinaryOp::Mod, -7.5, 2), Ok(Value::Float(0.5)));
    }

    #[test]
    fn test_overflow_falls_back_to_float() {
        assert_eq!(
            bin(BinaryOp::Mul, i64::MAX, 2),
            Ok(Value::Float(i64::MAX as f64 * 2.0))
        );
    }

    #[test]
    fn test_ordering_of_incompatible_types_fails() {
        assert!(matches!(
            bin(BinaryOp::Lt, "a", 1),
            Err(EvalError::TypeMismatch { .. })
        ));
        assert_eq!(bin(BinaryOp::Lt, 1, 1.5), Ok(Value::Bool(true)));
        assert_eq!(bin(BinaryOp::Ge, "b", "a"), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_membership() {
        let list = Value::from(vec![Value::from(1), Value::from("x")]);
        assert_eq!(membership(&Value::Float(1.0), &list), Ok(true));
        assert_eq!(membership(&Value::from("ell"), &Value::from("hello")), Ok(true));
        assert_eq!(membership(&Value::from("a"), &Value::Null), Ok(false));
        assert!(membership(&Value::from(1), &Value::from(5)).is_err());
    }

    #[test]
    fn test_index_out_of_range_is_null() {
        let list = Value::from(vec![Value::from(1)]);
        assert_eq!(index(&list, &Value::Int(3)), Value::Null);
        assert_eq!(index(&list, &Value::Int(-1)), Value::Null);
        assert_eq!(index(&Value::from("abc"), &Value::Int(1)), Value::from("b"));
    }

    #[test]
    fn test_negation() {
        assert_eq!(apply_unary(UnaryOp::Neg, &Value::Int(3)), Ok(Value::Int(-3)));
        assert_eq!(apply_unary(UnaryOp::Neg, &Value::Null), Ok(Value::Null));
        assert!(apply_unary(UnaryOp::Neg, &Value::from("x")).is_err());
        assert_eq!(apply_unary(UnaryOp::Not, &Value::from("")), Ok(Value::Bool(true)));
    }
}
