//! Fuzz target for the expression lexer
//!
//! Run with: cargo +nightly fuzz run lexer_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use tenet_dsl::{Lexer, TokenKind};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    // Errors are fine; panics and hangs are not
    let Ok(tokens) = Lexer::new(input).tokenize() else {
        return;
    };

    assert_eq!(
        tokens.last().map(|t| &t.kind),
        Some(&TokenKind::Eof),
        "Last token should always be Eof"
    );

    let mut previous_end = 0;
    for token in &tokens {
        assert!(token.span.start <= token.span.end, "Span start should be <= end");
        assert!(token.span.start >= previous_end, "Spans should not overlap");
        assert!(token.span.end <= input.len(), "Span should stay inside the input");
        assert!(token.span.line >= 1 && token.span.column >= 1);
        previous_end = token.span.end;
    }
});
