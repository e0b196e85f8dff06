//! Parser implementation
//!
//! Recursive descent with one function per precedence level, lowest first:
//! or, and, comparison, additive, multiplicative, unary, postfix, primary.

use super::ast::*;
use crate::error::{ExpressionResult, ParseError};
use crate::lexer::*;
use std::collections::HashSet;
use tenet_core::Value;

/// Deepest AST the parser will build. Nesting, unary chains and binary
/// chains all count, so the evaluators never recurse past this.
pub const MAX_NESTING_DEPTH: usize = 256;

// ============================================================================
// PARSER
// ============================================================================

/// Parser for rule expressions.
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) pos: usize,
    depth: usize,
}

impl Parser {
    /// Create a parser over a token stream that ends in `Eof`.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| &t.kind) != Some(&TokenKind::Eof) {
            let span = tokens.last().map(|t| t.span).unwrap_or_default();
            tokens.push(Token {
                kind: TokenKind::Eof,
                span,
            });
        }
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// Parse a complete expression, consuming every token.
    pub fn parse(&mut self) -> Result<Expr, ParseError> {
        if self.is_at_end() {
            return Err(self.error("Empty expression"));
        }

        let expr = self.parse_or_expr()?;

        if !self.is_at_end() {
            let found = self.current().kind.to_string();
            return Err(self.error(&format!("Unexpected token '{}'", found)));
        }

        Ok(expr)
    }

    fn parse_or_expr(&mut self) -> Result<Expr, ParseError> {
        let base = self.depth;
        let mut left = self.parse_and_expr()?;

        while self.check(&TokenKind::Or) {
            self.advance();
            self.descend()?;
            let right = self.parse_and_expr()?;
            left = Expr::binary(BinaryOp::Or, left, right);
        }

        self.depth = base;
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr, ParseError> {
        let base = self.depth;
        let mut left = self.parse_comparison()?;

        while self.check(&TokenKind::And) {
            self.advance();
            self.descend()?;
            let right = self.parse_comparison()?;
            left = Expr::binary(BinaryOp::And, left, right);
        }

        self.depth = base;
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let base = self.depth;
        let mut left = self.parse_additive()?;

        while let Some(op) = self.comparison_op() {
            self.advance();
            self.descend()?;
            let right = self.parse_additive()?;
            left = Expr::binary(op, left, right);
        }

        self.depth = base;
        Ok(left)
    }

    fn comparison_op(&self) -> Option<BinaryOp> {
        match self.current().kind {
            TokenKind::Eq => Some(BinaryOp::Eq),
            TokenKind::Ne => Some(BinaryOp::Ne),
            TokenKind::Lt => Some(BinaryOp::Lt),
            TokenKind::Le => Some(BinaryOp::Le),
            TokenKind::Gt => Some(BinaryOp::Gt),
            TokenKind::Ge => Some(BinaryOp::Ge),
            TokenKind::In => Some(BinaryOp::In),
            TokenKind::NotIn => Some(BinaryOp::NotIn),
            _ => None,
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let base = self.depth;
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            self.descend()?;
            let right = self.parse_multiplicative()?;
            left = Expr::binary(op, left, right);
        }

        self.depth = base;
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let base = self.depth;
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.current().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            self.descend()?;
            let right = self.parse_unary()?;
            left = Expr::binary(op, left, right);
        }

        self.depth = base;
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.current().kind {
            TokenKind::Not => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let base = self.depth;
        self.descend()?;
        let operand = self.parse_unary()?;
        self.depth = base;
        Ok(Expr::unary(op, operand))
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let base = self.depth;
        let mut expr = self.parse_primary()?;

        loop {
            if self.check(&TokenKind::Dot) {
                self.advance();
                self.descend()?;
                let property = self.expect_identifier("Expected property name after '.'")?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                };
            } else if self.check(&TokenKind::LBracket) {
                self.advance();
                self.descend()?;
                let index = self.parse_or_expr()?;
                self.expect(TokenKind::RBracket, "Expected ']' after index")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                break;
            }
        }

        self.depth = base;
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let literal = match &self.current().kind {
            TokenKind::Integer(i) => Some(Value::Int(*i)),
            TokenKind::Float(f) => Some(Value::Float(*f)),
            TokenKind::String(s) => Some(Value::String(s.clone())),
            TokenKind::Boolean(b) => Some(Value::Bool(*b)),
            TokenKind::Null => Some(Value::Null),
            _ => None,
        };
        if let Some(value) = literal {
            self.advance();
            return Ok(Expr::Literal(value));
        }

        match &self.current().kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                if self.check(&TokenKind::LParen) {
                    self.advance();
                    let base = self.depth;
                    self.descend()?;
                    let args = self.parse_arguments()?;
                    self.depth = base;
                    Ok(Expr::Call { name, args })
                } else {
                    Ok(Expr::Identifier(name))
                }
            }
            TokenKind::LParen => {
                self.advance();
                let base = self.depth;
                self.descend()?;
                let expr = self.parse_or_expr()?;
                self.expect(TokenKind::RParen, "Expected ')' after expression")?;
                self.depth = base;
                Ok(expr)
            }
            TokenKind::LBracket => {
                self.advance();
                let base = self.depth;
                self.descend()?;
                let array = self.parse_array()?;
                self.depth = base;
                Ok(array)
            }
            TokenKind::LBrace => {
                self.advance();
                let base = self.depth;
                self.descend()?;
                let object = self.parse_object()?;
                self.depth = base;
                Ok(object)
            }
            TokenKind::Eof => Err(self.error("Unexpected end of expression")),
            other => {
                let found = other.to_string();
                Err(self.error(&format!("Unexpected token '{}'", found)))
            }
        }
    }

    /// Arguments after an opening `(`, through the closing `)`.
    fn parse_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();

        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_or_expr()?);
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }

        self.expect(TokenKind::RParen, "Expected ')' after function arguments")?;
        Ok(args)
    }

    /// Array literal after the opening `[`.
    fn parse_array(&mut self) -> Result<Expr, ParseError> {
        let mut items = Vec::new();

        if !self.check(&TokenKind::RBracket) {
            loop {
                items.push(self.parse_or_expr()?);
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }

        self.expect(TokenKind::RBracket, "Expected ']' after array elements")?;
        Ok(Expr::Array(items))
    }

    /// Object literal after the opening `{`. Keys are strings or bare identifiers.
    fn parse_object(&mut self) -> Result<Expr, ParseError> {
        let mut entries = Vec::new();
        let mut seen = HashSet::new();

        if !self.check(&TokenKind::RBrace) {
            loop {
                let key = match &self.current().kind {
                    TokenKind::String(s) | TokenKind::Identifier(s) => s.clone(),
                    _ => return Err(self.error("Expected string or identifier as object key")),
                };
                self.advance();
                self.expect(TokenKind::Colon, "Expected ':' after object key")?;
                let value = self.parse_or_expr()?;

                // Later duplicates win, as in a map literal
                if !seen.insert(key.clone()) {
                    entries.retain(|(k, _): &(String, Expr)| *k != key);
                }
                entries.push((key, value));

                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }

        self.expect(TokenKind::RBrace, "Expected '}' after object entries")?;
        Ok(Expr::Object(entries))
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    /// Step one level deeper, failing once the AST would exceed `MAX_NESTING_DEPTH`.
    fn descend(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(self.error("Expression nested too deeply"));
        }
        Ok(())
    }

    pub(crate) fn current(&self) -> &Token {
        // `new` guarantees a trailing Eof and `advance` never passes it
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub(crate) fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(kind)
    }

    pub(crate) fn expect(&mut self, kind: TokenKind, message: &str) -> Result<(), ParseError> {
        if self.check(&kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    pub(crate) fn expect_identifier(&mut self, message: &str) -> Result<String, ParseError> {
        match &self.current().kind {
            TokenKind::Identifier(s) => {
                let s = s.clone();
                self.advance();
                Ok(s)
            }
            _ => Err(self.error(message)),
        }
    }

    pub(crate) fn error(&self, msg: &str) -> ParseError {
        let span = self.current().span;
        ParseError {
            message: msg.to_string(),
            line: span.line,
            column: span.column,
        }
    }
}

/// Lex and parse expression source into an AST.
pub fn parse(source: &str) -> ExpressionResult<Expr> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser::new(tokens);
    Ok(parser.parse()?)
}
