//! Fuzz target for the expression parser and evaluator
//!
//! Any source that parses must render back to source that parses to the
//! same tree, and must evaluate without panicking.
//!
//! Run with: cargo +nightly fuzz run parser_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use tenet_core::Record;
use tenet_dsl::{parse, EvaluationContext, Evaluator, FunctionRegistry};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    match parse(input) {
        Ok(expr) => {
            let printed = expr.to_string();
            // Overflowing literals lex as infinity, which has no source form
            if !printed.contains("inf") {
                let reparsed = parse(&printed);
                assert_eq!(reparsed.as_ref().ok(), Some(&expr), "printed: {}", printed);
            }

            let registry = FunctionRegistry::with_builtins();
            let record = Record::new();
            let _ = Evaluator::new(&registry).evaluate(&expr, &EvaluationContext::new(&record));
        }
        Err(e) => {
            // Every error names a location or a cause
            assert!(!e.to_string().is_empty());
        }
    }
});
