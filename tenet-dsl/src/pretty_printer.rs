//! Pretty printer for expression ASTs
//!
//! Renders an [`Expr`] back to source. Binary and unary operations are
//! fully parenthesized, so re-parsing the output yields an equal tree.

use crate::parser::*;
use std::fmt::{self, Write};
use tenet_core::{format_float, Value};

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => write_literal(f, value),
            Expr::Identifier(name) => f.write_str(name),
            Expr::Member { object, property } => write!(f, "{}.{}", object, property),
            Expr::Index { object, index } => write!(f, "{}[{}]", object, index),
            Expr::Binary { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Expr::Unary { op, operand } => write!(f, "({}{})", op.symbol(), operand),
            Expr::Call { name, args } => {
                write!(f, "{}(", name)?;
                write_list(f, args)?;
                f.write_char(')')
            }
            Expr::Array(items) => {
                f.write_char('[')?;
                write_list(f, items)?;
                f.write_char(']')
            }
            Expr::Object(entries) => {
                f.write_char('{')?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_string(f, key)?;
                    write!(f, ": {}", value)?;
                }
                f.write_char('}')
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_literal(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Null => f.write_str("null"),
        Value::Bool(b) => write!(f, "{}", b),
        Value::Int(i) => write!(f, "{}", i),
        Value::Float(n) => f.write_str(&format_float(*n)),
        Value::String(s) => write_string(f, s),
        // Only built programmatically; render as their string form
        other => write_string(f, &other.to_display_string()),
    }
}

fn write_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

#[cfg(test)]
mod tests {
    use crate::error::ExpressionError;
    use crate::parser::parse;

    fn roundtrip(source: &str) -> Result<String, ExpressionError> {
        let ast = parse(source)?;
        let printed = ast.to_string();
        assert_eq!(parse(&printed)?, ast, "reparse of {:?} differs", printed);
        Ok(printed)
    }

    #[test]
    fn test_binary_is_parenthesized() -> Result<(), ExpressionError> {
        assert_eq!(roundtrip("1 + 2 * 3")?, "(1 + (2 * 3))");
        assert_eq!(roundtrip("a or b and not c")?, "(a || (b && (!c)))");
        Ok(())
    }

    #[test]
    fn test_strings_are_reescaped() -> Result<(), ExpressionError> {
        assert_eq!(roundtrip(r#"'say "hi"\n'"#)?, r#""say \"hi\"\n""#);
        Ok(())
    }

    #[test]
    fn test_floats_keep_decimal_point() -> Result<(), ExpressionError> {
        assert_eq!(roundtrip("3.0 - x")?, "(3.0 - x)");
        Ok(())
    }

    #[test]
    fn test_postfix_and_literals() -> Result<(), ExpressionError> {
        assert_eq!(
            roundtrip("record.tags[0] not in {a: [1, null], 'b c': true}")?,
            r#"(record.tags[0] not in {"a": [1, null], "b c": true})"#
        );
        assert_eq!(roundtrip("(-x).y")?, "(-x).y");
        Ok(())
    }
}
