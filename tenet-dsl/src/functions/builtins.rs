//! Builtin function catalog
//!
//! Every builtin except the query functions is client evaluable, so the
//! null contracts here must stay stable.

use chrono::{Datelike, NaiveDate, TimeDelta, Utc};
use regex::Regex;

use super::definition::{FunctionCategory as Cat, FunctionDefinition as Def, Parameter, ParamType};
use super::query::QueryKind;
use crate::error::{EvalError, EvalResult};
use crate::eval::ops;
use tenet_core::Value;

/// The standard catalog, in registration order.
pub fn builtin_functions() -> Vec<Def> {
    let mut defs = Vec::new();
    defs.extend(string_functions());
    defs.extend(date_functions());
    defs.extend(math_functions());
    defs.extend(collection_functions());
    defs.extend(logic_functions());
    defs.extend(query_functions());
    defs
}

fn value_param() -> Parameter {
    Parameter::required("value", ParamType::Any)
}

// ============================================================================
// STRING
// ============================================================================

fn string_functions() -> Vec<Def> {
    vec![
        Def::native("len", Cat::String, len)
            .describe("Length of a string or array; 0 for null")
            .param(value_param())
            .returns(ParamType::Integer)
            .example("len(name) > 2"),
        Def::native("isEmpty", Cat::String, is_empty)
            .describe("True for null, a blank string or an empty array")
            .param(value_param())
            .returns(ParamType::Boolean)
            .example("isEmpty(email)"),
        Def::native("concat", Cat::String, concat)
            .describe("Concatenate values as strings, skipping nulls")
            .param(Parameter::variadic("values", ParamType::Any, false))
            .returns(ParamType::String)
            .example("concat(firstName, \" \", lastName)"),
        Def::native("trim", Cat::String, trim)
            .describe("Strip surrounding whitespace")
            .param(value_param())
            .returns(ParamType::String),
        Def::native("upper", Cat::String, upper)
            .describe("Uppercase a string")
            .param(value_param())
            .returns(ParamType::String),
        Def::native("lower", Cat::String, lower)
            .describe("Lowercase a string")
            .param(value_param())
            .returns(ParamType::String),
        Def::native("matches", Cat::String, matches)
            .describe("Whether the value matches a regular expression from its start")
            .param(value_param())
            .param(Parameter::required("pattern", ParamType::String))
            .returns(ParamType::Boolean)
            .example("matches(sku, \"[A-Z]{3}-\\\\d+\")"),
        Def::native("startsWith", Cat::String, starts_with)
            .describe("Whether the value starts with a prefix")
            .param(value_param())
            .param(Parameter::required("prefix", ParamType::String))
            .returns(ParamType::Boolean),
        Def::native("endsWith", Cat::String, ends_with)
            .describe("Whether the value ends with a suffix")
            .param(value_param())
            .param(Parameter::required("suffix", ParamType::String))
            .returns(ParamType::Boolean),
    ]
}

fn len(args: &[Value]) -> EvalResult<Value> {
    let n = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        _ => 0,
    };
    Ok(Value::Int(n as i64))
}

fn is_empty(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Bool(args[0].is_empty_value()))
}

fn concat(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::String(
        args.iter()
            .filter(|v| !v.is_null())
            .map(Value::to_display_string)
            .collect(),
    ))
}

fn text_or_empty(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => other.to_display_string(),
    }
}

fn trim(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::String(text_or_empty(&args[0]).trim().to_string()))
}

fn upper(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::String(text_or_empty(&args[0]).to_uppercase()))
}

fn lower(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::String(text_or_empty(&args[0]).to_lowercase()))
}

fn matches(args: &[Value]) -> EvalResult<Value> {
    if args[0].is_null() || args[1].is_null() {
        return Ok(Value::Bool(false));
    }
    let pattern = format!("^(?:{})", args[1].to_display_string());
    let matched = Regex::new(&pattern)
        .map(|re| re.is_match(&args[0].to_display_string()))
        .unwrap_or(false);
    Ok(Value::Bool(matched))
}

fn starts_with(args: &[Value]) -> EvalResult<Value> {
    affix(args, |s, p| s.starts_with(p))
}

fn ends_with(args: &[Value]) -> EvalResult<Value> {
    affix(args, |s, p| s.ends_with(p))
}

fn affix(args: &[Value], test: fn(&str, &str) -> bool) -> EvalResult<Value> {
    if args[0].is_null() || args[1].is_null() {
        return Ok(Value::Bool(false));
    }
    Ok(Value::Bool(test(
        &args[0].to_display_string(),
        &args[1].to_display_string(),
    )))
}

// ============================================================================
// DATE
// ============================================================================

fn date_functions() -> Vec<Def> {
    vec![
        Def::native("now", Cat::Date, |_| Ok(Value::Timestamp(Utc::now())))
            .describe("Current UTC timestamp")
            .returns(ParamType::Date),
        Def::native("today", Cat::Date, |_| Ok(Value::Date(Utc::now().date_naive())))
            .describe("Current UTC date")
            .returns(ParamType::Date)
            .example("dueDate >= today()"),
        Def::native("daysBetween", Cat::Date, days_between)
            .describe("Whole days from start to end")
            .param(Parameter::required("start", ParamType::Date))
            .param(Parameter::required("end", ParamType::Date))
            .returns(ParamType::Integer)
            .example("daysBetween(startDate, endDate) <= 30"),
        Def::native("addDays", Cat::Date, add_days)
            .describe("Shift a date or timestamp by a number of days")
            .param(Parameter::required("date", ParamType::Date))
            .param(Parameter::required("days", ParamType::Integer))
            .returns(ParamType::Date),
        Def::native("year", Cat::Date, |args| date_part("year", &args[0], |d| i64::from(d.year())))
            .describe("Calendar year of a date")
            .param(Parameter::required("date", ParamType::Date))
            .returns(ParamType::Integer),
        Def::native("month", Cat::Date, |args| date_part("month", &args[0], |d| i64::from(d.month())))
            .describe("Month (1-12) of a date")
            .param(Parameter::required("date", ParamType::Date))
            .returns(ParamType::Integer),
        Def::native("day", Cat::Date, |args| date_part("day", &args[0], |d| i64::from(d.day())))
            .describe("Day of month of a date")
            .param(Parameter::required("date", ParamType::Date))
            .returns(ParamType::Integer),
    ]
}

fn require_date(function: &str, value: &Value) -> EvalResult<NaiveDate> {
    value.as_date().ok_or_else(|| {
        EvalError::invalid_argument(function, format!("expected a date, got {}", value.type_name()))
    })
}

fn days_between(args: &[Value]) -> EvalResult<Value> {
    if args[0].is_null() || args[1].is_null() {
        return Ok(Value::Null);
    }
    let start = require_date("daysBetween", &args[0])?;
    let end = require_date("daysBetween", &args[1])?;
    Ok(Value::Int((end - start).num_days()))
}

fn add_days(args: &[Value]) -> EvalResult<Value> {
    if args[0].is_null() || args[1].is_null() {
        return Ok(Value::Null);
    }
    let days = match &args[1] {
        Value::Int(i) => *i,
        Value::Float(f) if f.is_finite() => f.trunc() as i64,
        other => {
            return Err(EvalError::invalid_argument(
                "addDays",
                format!("days must be a number, got {}", other.type_name()),
            ))
        }
    };
    let out_of_range = || EvalError::invalid_argument("addDays", "date out of range");
    let delta = TimeDelta::try_days(days).ok_or_else(out_of_range)?;

    match &args[0] {
        Value::Timestamp(ts) => ts
            .checked_add_signed(delta)
            .map(Value::Timestamp)
            .ok_or_else(out_of_range),
        other => require_date("addDays", other)?
            .checked_add_signed(delta)
            .map(Value::Date)
            .ok_or_else(out_of_range),
    }
}

fn date_part(function: &str, value: &Value, part: fn(NaiveDate) -> i64) -> EvalResult<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    Ok(Value::Int(part(require_date(function, value)?)))
}

// ============================================================================
// MATH
// ============================================================================

fn math_functions() -> Vec<Def> {
    vec![
        Def::native("abs", Cat::Math, abs)
            .describe("Absolute value")
            .param(Parameter::required("value", ParamType::Number))
            .returns(ParamType::Number),
        Def::native("round", Cat::Math, round)
            .describe("Round half away from zero to a number of decimals")
            .param(Parameter::required("value", ParamType::Number))
            .param(Parameter::optional("decimals", ParamType::Integer, Value::Int(0)))
            .returns(ParamType::Number)
            .example("round(total * 1.2, 2)"),
        Def::native("floor", Cat::Math, |args| integral("floor", &args[0], f64::floor))
            .describe("Largest integer not above the value")
            .param(Parameter::required("value", ParamType::Number))
            .returns(ParamType::Integer),
        Def::native("ceil", Cat::Math, |args| integral("ceil", &args[0], f64::ceil))
            .describe("Smallest integer not below the value")
            .param(Parameter::required("value", ParamType::Number))
            .returns(ParamType::Integer),
        Def::native("min", Cat::Math, |args| extreme("min", args, std::cmp::Ordering::Less))
            .describe("Smallest non-null argument")
            .param(Parameter::variadic("values", ParamType::Any, true))
            .returns(ParamType::Any),
        Def::native("max", Cat::Math, |args| extreme("max", args, std::cmp::Ordering::Greater))
            .describe("Largest non-null argument")
            .param(Parameter::variadic("values", ParamType::Any, true))
            .returns(ParamType::Any),
    ]
}

fn require_number(function: &str, value: &Value) -> EvalResult<f64> {
    value.as_f64().ok_or_else(|| {
        EvalError::invalid_argument(function, format!("expected a number, got {}", value.type_name()))
    })
}

fn abs(args: &[Value]) -> EvalResult<Value> {
    match &args[0] {
        Value::Null => Ok(Value::Null),
        Value::Int(i) => Ok(i
            .checked_abs()
            .map(Value::Int)
            .unwrap_or(Value::Float((*i as f64).abs()))),
        other => Ok(Value::Float(require_number("abs", other)?.abs())),
    }
}

fn round(args: &[Value]) -> EvalResult<Value> {
    let value = match &args[0] {
        Value::Null => return Ok(Value::Null),
        Value::Int(i) => return Ok(Value::Int(*i)),
        other => require_number("round", other)?,
    };
    let decimals = match &args[1] {
        Value::Null => 0,
        other => require_number("round", other)? as i32,
    };
    let factor = 10f64.powi(decimals);
    Ok(Value::Float((value * factor).round() / factor))
}

fn integral(function: &str, value: &Value, op: fn(f64) -> f64) -> EvalResult<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Int(i) => Ok(Value::Int(*i)),
        other => {
            let rounded = op(require_number(function, other)?);
            // Out-of-range results stay floats
            if rounded.is_finite() && rounded.abs() < 9.2e18 {
                Ok(Value::Int(rounded as i64))
            } else {
                Ok(Value::Float(rounded))
            }
        }
    }
}

fn extreme(function: &str, args: &[Value], wanted: std::cmp::Ordering) -> EvalResult<Value> {
    let mut best: Option<&Value> = None;
    for candidate in args.iter().filter(|v| !v.is_null()) {
        best = match best {
            None => Some(candidate),
            Some(current) => {
                let ord = candidate.compare(current).ok_or_else(|| {
                    EvalError::invalid_argument(
                        function,
                        format!(
                            "cannot compare {} and {}",
                            candidate.type_name(),
                            current.type_name()
                        ),
                    )
                })?;
                Some(if ord == wanted { candidate } else { current })
            }
        };
    }
    Ok(best.cloned().unwrap_or_default())
}

// ============================================================================
// COLLECTION
// ============================================================================

fn collection_functions() -> Vec<Def> {
    vec![
        Def::native("contains", Cat::Collection, |args| {
            Ok(Value::Bool(ops::membership(&args[1], &args[0]).unwrap_or(false)))
        })
        .describe("Membership test that never fails; false for null")
        .param(Parameter::required("collection", ParamType::Any))
        .param(Parameter::required("item", ParamType::Any))
        .returns(ParamType::Boolean)
        .example("contains(tags, \"vip\")"),
        Def::native("size", Cat::Collection, size)
            .describe("Length of a string, array or object; 0 for null")
            .param(value_param())
            .returns(ParamType::Integer),
        Def::native("first", Cat::Collection, |args| Ok(edge(&args[0], true)))
            .describe("First element of an array")
            .param(Parameter::required("array", ParamType::Array))
            .returns(ParamType::Any),
        Def::native("last", Cat::Collection, |args| Ok(edge(&args[0], false)))
            .describe("Last element of an array")
            .param(Parameter::required("array", ParamType::Array))
            .returns(ParamType::Any),
    ]
}

fn size(args: &[Value]) -> EvalResult<Value> {
    let n = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        _ => 0,
    };
    Ok(Value::Int(n as i64))
}

fn edge(value: &Value, first: bool) -> Value {
    let items = value.as_array().unwrap_or_default();
    let item = if first { items.first() } else { items.last() };
    item.cloned().unwrap_or_default()
}

// ============================================================================
// LOGIC
// ============================================================================

fn logic_functions() -> Vec<Def> {
    vec![
        Def::native("coalesce", Cat::Logic, |args| {
            Ok(args.iter().find(|v| !v.is_null()).cloned().unwrap_or_default())
        })
        .describe("First non-null argument")
        .param(Parameter::variadic("values", ParamType::Any, false))
        .returns(ParamType::Any)
        .example("coalesce(nickname, firstName)"),
        Def::native("if", Cat::Logic, |args| {
            Ok(if args[0].is_truthy() { args[1].clone() } else { args[2].clone() })
        })
        .describe("Select a branch by the truthiness of a condition")
        .param(Parameter::required("condition", ParamType::Any))
        .param(Parameter::required("then", ParamType::Any))
        .param(Parameter::optional("else", ParamType::Any, Value::Null))
        .returns(ParamType::Any),
    ]
}

// ============================================================================
// QUERY
// ============================================================================

fn query_functions() -> Vec<Def> {
    let entity = || Parameter::required("entity", ParamType::String);
    let filter = || Parameter::optional("filter", ParamType::Object, Value::Null);
    vec![
        Def::query("exists", QueryKind::Exists)
            .describe("Whether any record of an entity matches a filter")
            .param(entity())
            .param(filter())
            .returns(ParamType::Boolean)
            .example("!exists(\"contact\", {email: email})"),
        Def::query("count", QueryKind::Count)
            .describe("Number of records of an entity matching a filter")
            .param(entity())
            .param(filter())
            .returns(ParamType::Integer),
        Def::query("lookup", QueryKind::Lookup)
            .describe("A field of the first record matching a filter")
            .param(entity())
            .param(Parameter::required("field", ParamType::String))
            .param(filter())
            .returns(ParamType::Any)
            .example("lookup(\"account\", \"status\", {id: accountId}) == \"active\""),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::FunctionImpl;

    fn call(name: &str, args: Vec<Value>) -> EvalResult<Value> {
        let def = builtin_functions()
            .into_iter()
            .find(|d| d.name == name)
            .unwrap_or_else(|| panic!("no builtin {}", name));
        let args = def.bind_arguments(args)?;
        match def.implementation {
            FunctionImpl::Native(f) => f(&args),
            FunctionImpl::Query(_) => panic!("{} is a query function", name),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> Value {
        Value::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_string_null_contracts() {
        assert_eq!(call("len", vec![Value::Null]), Ok(Value::Int(0)));
        assert_eq!(call("len", vec!["héllo".into()]), Ok(Value::Int(5)));
        assert_eq!(call("isEmpty", vec!["  ".into()]), Ok(Value::Bool(true)));
        assert_eq!(
            call("concat", vec!["a".into(), Value::Null, 1.into()]),
            Ok(Value::from("a1"))
        );
        assert_eq!(call("trim", vec![Value::Null]), Ok(Value::from("")));
        assert_eq!(call("upper", vec!["abc".into()]), Ok(Value::from("ABC")));
        assert_eq!(
            call("startsWith", vec![Value::Null, "a".into()]),
            Ok(Value::Bool(false))
        );
    }

    #[test]
    fn test_matches_is_anchored_at_start() {
        assert_eq!(
            call("matches", vec!["ABC-12".into(), "[A-Z]+-\\d+".into()]),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            call("matches", vec!["xABC".into(), "ABC".into()]),
            Ok(Value::Bool(false))
        );
        assert_eq!(
            call("matches", vec!["abc".into(), "(".into()]),
            Ok(Value::Bool(false))
        );
    }

    #[test]
    fn test_dates() {
        assert_eq!(
            call("daysBetween", vec![date(2024, 1, 1), "2024-03-01".into()]),
            Ok(Value::Int(60))
        );
        assert_eq!(
            call("addDays", vec!["2024-02-28".into(), 2.into()]),
            Ok(date(2024, 3, 1))
        );
        assert_eq!(call("year", vec![date(2023, 7, 4)]), Ok(Value::Int(2023)));
        assert_eq!(call("month", vec![date(2023, 7, 4)]), Ok(Value::Int(7)));
        assert_eq!(call("day", vec![Value::Null]), Ok(Value::Null));
        assert!(matches!(
            call("year", vec!["soon".into()]),
            Err(EvalError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_math() {
        assert_eq!(call("round", vec![2.5.into()]), Ok(Value::Float(3.0)));
        assert_eq!(call("round", vec![(-2.5).into()]), Ok(Value::Float(-3.0)));
        assert_eq!(call("round", vec![1.2345.into(), 2.into()]), Ok(Value::Float(1.23)));
        assert_eq!(call("floor", vec![2.7.into()]), Ok(Value::Int(2)));
        assert_eq!(call("ceil", vec![2.1.into()]), Ok(Value::Int(3)));
        assert_eq!(call("abs", vec![(-4).into()]), Ok(Value::Int(4)));
        assert_eq!(
            call("max", vec![1.into(), Value::Null, 3.5.into()]),
            Ok(Value::Float(3.5))
        );
        assert_eq!(call("min", vec![Value::Null, Value::Null]), Ok(Value::Null));
    }

    #[test]
    fn test_collections_and_logic() {
        let tags = Value::from(vec![Value::from("vip"), Value::from("new")]);
        assert_eq!(
            call("contains", vec![tags.clone(), "vip".into()]),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            call("contains", vec![5.into(), "x".into()]),
            Ok(Value::Bool(false))
        );
        assert_eq!(call("size", vec![tags.clone()]), Ok(Value::Int(2)));
        assert_eq!(call("last", vec![tags]), Ok(Value::from("new")));
        assert_eq!(call("first", vec![Value::Null]), Ok(Value::Null));
        assert_eq!(
            call("coalesce", vec![Value::Null, "b".into()]),
            Ok(Value::from("b"))
        );
        assert_eq!(call("if", vec![false.into(), 1.into()]), Ok(Value::Null));
    }
}
