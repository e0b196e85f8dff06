//! Error types for lexing, parsing and evaluating expressions

use tenet_core::QueryError;
use thiserror::Error;

/// Lexical error with the offending location.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LexError {
    #[error("Unexpected character '{character}' at line {line}, column {column}")]
    UnexpectedCharacter {
        character: char,
        position: usize,
        line: usize,
        column: usize,
    },

    #[error("Unterminated string starting at line {line}, column {column}")]
    UnterminatedString { line: usize, column: usize },
}

impl LexError {
    pub fn line(&self) -> usize {
        match self {
            LexError::UnexpectedCharacter { line, .. } | LexError::UnterminatedString { line, .. } => *line,
        }
    }

    pub fn column(&self) -> usize {
        match self {
            LexError::UnexpectedCharacter { column, .. }
            | LexError::UnterminatedString { column, .. } => *column,
        }
    }
}

/// Parse error with location information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Parse error at line {}, column {}: {}",
            self.line, self.column, self.message
        )
    }
}

impl std::error::Error for ParseError {}

/// Evaluation errors.
///
/// An unknown identifier is not an error; it evaluates to null.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvalError {
    #[error("Unknown function: {name}")]
    UnknownFunction { name: String },

    #[error("{message}")]
    TypeMismatch { message: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Modulo by zero")]
    ModuloByZero,

    #[error("Function '{function}' expects {expected} argument(s), got {got}")]
    Arity {
        function: String,
        expected: String,
        got: usize,
    },

    #[error("Invalid argument to '{function}': {reason}")]
    InvalidArgument { function: String, reason: String },

    #[error("Query function '{function}' must be evaluated asynchronously")]
    AsyncRequired { function: String },

    #[error("Query function '{function}' requires a query capability")]
    QueryCapabilityRequired { function: String },

    #[error("Query failed: {0}")]
    Query(#[from] QueryError),
}

impl EvalError {
    pub(crate) fn mismatch(message: impl Into<String>) -> Self {
        EvalError::TypeMismatch {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_argument(function: &str, reason: impl Into<String>) -> Self {
        EvalError::InvalidArgument {
            function: function.to_string(),
            reason: reason.into(),
        }
    }
}

/// Any failure from source text to value.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExpressionError {
    #[error("Lexer error: {0}")]
    Lex(#[from] LexError),

    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),
}

pub type EvalResult<T> = Result<T, EvalError>;
pub type ExpressionResult<T> = Result<T, ExpressionError>;
