//! Lexer implementation

use super::token::*;
use crate::error::LexError;
use std::iter::Peekable;
use std::str::CharIndices;

// ============================================================================
// LEXER IMPLEMENTATION
// ============================================================================

/// Lexer for rule expressions.
pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            line: 1,
            column: 1,
            pos: 0,
        }
    }

    /// Tokenize the entire source. The last token is always `Eof`.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        Ok(tokens)
    }

    /// Get the next token from the source.
    fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();

        let start_pos = self.pos;
        let start_line = self.line;
        let start_col = self.column;

        let kind = match self.peek_char() {
            None => TokenKind::Eof,
            Some(c) => match c {
                '(' => self.single(TokenKind::LParen),
                ')' => self.single(TokenKind::RParen),
                '[' => self.single(TokenKind::LBracket),
                ']' => self.single(TokenKind::RBracket),
                '{' => self.single(TokenKind::LBrace),
                '}' => self.single(TokenKind::RBrace),
                ',' => self.single(TokenKind::Comma),
                '.' => self.single(TokenKind::Dot),
                ':' => self.single(TokenKind::Colon),
                '+' => self.single(TokenKind::Plus),
                '-' => self.single(TokenKind::Minus),
                '*' => self.single(TokenKind::Star),
                '/' => self.single(TokenKind::Slash),
                '%' => self.single(TokenKind::Percent),

                '=' => {
                    if self.peek_next_char() == Some('=') {
                        self.advance();
                        self.advance();
                        TokenKind::Eq
                    } else {
                        return Err(self.unexpected('='));
                    }
                }

                '!' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        TokenKind::Ne
                    } else {
                        TokenKind::Not
                    }
                }

                '<' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        TokenKind::Le
                    } else {
                        TokenKind::Lt
                    }
                }

                '>' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        TokenKind::Ge
                    } else {
                        TokenKind::Gt
                    }
                }

                '&' | '|' => {
                    if self.peek_next_char() == Some(c) {
                        self.advance();
                        self.advance();
                        if c == '&' {
                            TokenKind::And
                        } else {
                            TokenKind::Or
                        }
                    } else {
                        return Err(self.unexpected(c));
                    }
                }

                '"' | '\'' => self.scan_string(c)?,

                c if c.is_ascii_digit() => self.scan_number(),

                c if c.is_ascii_alphabetic() || c == '_' => self.scan_identifier(),

                c => return Err(self.unexpected(c)),
            },
        };

        Ok(Token {
            kind,
            span: Span {
                start: start_pos,
                end: self.pos,
                line: start_line,
                column: start_col,
            },
        })
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    fn unexpected(&self, character: char) -> LexError {
        LexError::UnexpectedCharacter {
            character,
            position: self.pos,
            line: self.line,
            column: self.column,
        }
    }

    /// Scan an identifier or keyword. Keywords match case-insensitively.
    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.pos;

        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let ident = &self.source[start..self.pos];

        match ident.to_ascii_lowercase().as_str() {
            "true" => TokenKind::Boolean(true),
            "false" => TokenKind::Boolean(false),
            "null" => TokenKind::Null,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "in" => TokenKind::In,
            "not" => {
                if self.consume_trailing_in() {
                    TokenKind::NotIn
                } else {
                    TokenKind::Not
                }
            }
            _ => TokenKind::Identifier(ident.to_string()),
        }
    }

    /// After `not`, look past at least one whitespace character for a
    /// standalone `in`. Consumes it on success, leaves input untouched otherwise.
    fn consume_trailing_in(&mut self) -> bool {
        let rest = &self.source[self.pos..];
        let trimmed = rest.trim_start();
        let gap = rest.len() - trimmed.len();
        if gap == 0 {
            return false;
        }

        let bytes = trimmed.as_bytes();
        let is_in = bytes.len() >= 2
            && bytes[..2].eq_ignore_ascii_case(b"in")
            && bytes
                .get(2)
                .map_or(true, |b| !(b.is_ascii_alphanumeric() || *b == b'_'));
        if !is_in {
            return false;
        }

        let end = self.pos + gap + 2;
        while self.pos < end {
            if self.advance() == Some('\n') {
                self.line += 1;
                self.column = 1;
            }
        }
        true
    }

    /// Scan a single- or double-quoted string literal with escapes.
    fn scan_string(&mut self, quote: char) -> Result<TokenKind, LexError> {
        let (line, column) = (self.line, self.column);
        self.advance(); // consume opening quote
        let mut value = String::new();

        loop {
            match self.peek_char() {
                None => return Err(LexError::UnterminatedString { line, column }),
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    let escaped = self
                        .advance()
                        .ok_or(LexError::UnterminatedString { line, column })?;
                    value.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        other => other,
                    });
                }
                Some(c) => {
                    self.advance();
                    if c == '\n' {
                        self.line += 1;
                        self.column = 1;
                    }
                    value.push(c);
                }
            }
        }

        Ok(TokenKind::String(value))
    }

    /// Scan an integer or decimal literal. A decimal needs digits on both
    /// sides of the point.
    fn scan_number(&mut self) -> TokenKind {
        let start = self.pos;
        self.consume_digits();

        let is_decimal = self.peek_char() == Some('.')
            && self
                .peek_next_char()
                .is_some_and(|c| c.is_ascii_digit());
        if is_decimal {
            self.advance();
            self.consume_digits();
        }

        let text = &self.source[start..self.pos];
        if !is_decimal {
            if let Ok(i) = text.parse::<i64>() {
                return TokenKind::Integer(i);
            }
        }
        // Digit-only text always parses as f64
        TokenKind::Float(text.parse::<f64>().unwrap_or(f64::INFINITY))
    }

    fn consume_digits(&mut self) {
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if !c.is_whitespace() {
                break;
            }
            self.advance();
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            }
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn peek_next_char(&self) -> Option<char> {
        let mut iter = self.source[self.pos..].chars();
        iter.next();
        iter.next()
    }

    fn advance(&mut self) -> Option<char> {
        if let Some((i, c)) = self.chars.next() {
            self.pos = i + c.len_utf8();
            self.column += 1;
            Some(c)
        } else {
            None
        }
    }
}

/// Tokenize a source string.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_operators_prefer_two_chars() {
        assert_eq!(
            kinds("a <= b != c && !d"),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::Le,
                TokenKind::Identifier("b".into()),
                TokenKind::Ne,
                TokenKind::Identifier("c".into()),
                TokenKind::And,
                TokenKind::Not,
                TokenKind::Identifier("d".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(
            kinds("TRUE And null OR False"),
            vec![
                TokenKind::Boolean(true),
                TokenKind::And,
                TokenKind::Null,
                TokenKind::Or,
                TokenKind::Boolean(false),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_not_in_lookahead() {
        assert_eq!(
            kinds("x not   in list"),
            vec![
                TokenKind::Identifier("x".into()),
                TokenKind::NotIn,
                TokenKind::Identifier("list".into()),
                TokenKind::Eof,
            ]
        );
        // `not inside` is `not` followed by an identifier
        assert_eq!(
            kinds("not inside"),
            vec![
                TokenKind::Not,
                TokenKind::Identifier("inside".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("42 2.5 1.x"),
            vec![
                TokenKind::Integer(42),
                TokenKind::Float(2.5),
                TokenKind::Integer(1),
                TokenKind::Dot,
                TokenKind::Identifier("x".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#""a\"b\n" 'it\'s' "\q""#),
            vec![
                TokenKind::String("a\"b\n".into()),
                TokenKind::String("it's".into()),
                TokenKind::String("q".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unexpected_character_location() {
        let err = tokenize("a == 1\n  b # c").unwrap_err();
        assert_eq!(
            err,
            LexError::UnexpectedCharacter {
                character: '#',
                position: 11,
                line: 2,
                column: 5,
            }
        );
    }

    #[test]
    fn test_single_equals_is_rejected() {
        assert!(matches!(
            tokenize("a = 1"),
            Err(LexError::UnexpectedCharacter { character: '=', .. })
        ));
    }

    #[test]
    fn test_unterminated_string() {
        assert!(matches!(
            tokenize("name == \"abc"),
            Err(LexError::UnterminatedString { line: 1, column: 9 })
        ));
    }

    #[test]
    fn test_spans_track_columns() {
        let tokens = tokenize("ab  cd").unwrap();
        assert_eq!(tokens[1].span.column, 5);
        assert_eq!(tokens[1].span.start, 4);
        assert_eq!(tokens[1].span.end, 6);
    }
}
