use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tenet_core::{record_from_json, Record};
use tenet_dsl::{parse, tokenize, EvaluationContext, ExpressionEngine};

const GUARD: &str = r#"status == "active" && count > 0 && !isEmpty(email)"#;
const DERIVED: &str = r#"concat(upper(trim(firstName)), " ", lastName) + " <" + lower(email) + ">""#;

fn sample_record() -> Record {
    record_from_json(serde_json::json!({
        "status": "active",
        "count": 5,
        "firstName": "  ada ",
        "lastName": "Lovelace",
        "email": "ADA@EXAMPLE.COM",
    }))
}

fn bench_lex_parse(c: &mut Criterion) {
    c.bench_function("expr/tokenize_guard", |b| {
        b.iter(|| {
            let tokens = tokenize(black_box(GUARD)).expect("tokenize");
            black_box(tokens.len());
        });
    });

    c.bench_function("expr/parse_derived", |b| {
        b.iter(|| {
            let expr = parse(black_box(DERIVED)).expect("parse");
            black_box(expr);
        });
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let engine = ExpressionEngine::with_builtins();
    let record = sample_record();

    c.bench_function("expr/evaluate_guard", |b| {
        b.iter(|| {
            let ctx = EvaluationContext::new(&record);
            let result = engine.evaluate_bool(black_box(GUARD), &ctx).expect("evaluate");
            black_box(result);
        });
    });

    c.bench_function("expr/evaluate_derived", |b| {
        b.iter(|| {
            let ctx = EvaluationContext::new(&record);
            let result = engine.evaluate(black_box(DERIVED), &ctx).expect("evaluate");
            black_box(result);
        });
    });
}

criterion_group!(benches, bench_lex_parse, bench_evaluate);
criterion_main!(benches);
