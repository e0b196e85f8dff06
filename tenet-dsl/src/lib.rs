//! TENET expression language
//!
//! Lexer, parser, evaluators and function catalog for rule expressions.
//!
//! Architecture:
//! ```text
//! Source text
//!     ↓
//! Lexer (tokens with line/column)
//!     ↓
//! Parser (precedence climbing → Expr)
//!     ↓
//! Evaluator / AsyncEvaluator (EvaluationContext + FunctionRegistry)
//!     ↓
//! Value
//! ```

pub mod engine;
pub mod error;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod pretty_printer;

// Re-export key types for convenience
pub use engine::ExpressionEngine;
pub use error::*;
pub use eval::{AsyncEvaluator, EvaluationContext, Evaluator};
pub use functions::{
    FunctionCatalog, FunctionCategory, FunctionDefinition, FunctionImpl, FunctionRegistry,
    ParamType, Parameter, QueryKind,
};
pub use lexer::{tokenize, Lexer, Span, Token, TokenKind};
pub use parser::{parse, BinaryOp, Expr, Parser, UnaryOp, MAX_NESTING_DEPTH};
