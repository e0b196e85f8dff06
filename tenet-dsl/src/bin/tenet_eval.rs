/// Expression Evaluator - evaluates a rule expression against a JSON record
///
/// Usage: tenet-eval [--tokens] [--ast] <expression> [record-json]
///        tenet-eval --functions
use std::process::ExitCode;

use tenet_core::{record_from_json, Record};
use tenet_dsl::{tokenize, EvaluationContext, ExpressionEngine, ExpressionError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Default)]
struct Options {
    tokens: bool,
    ast: bool,
    functions: bool,
    positional: Vec<String>,
}

fn parse_args() -> Result<Options, String> {
    let mut options = Options::default();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--tokens" => options.tokens = true,
            "--ast" => options.ast = true,
            "--functions" => options.functions = true,
            flag if flag.starts_with("--") => return Err(format!("Unknown flag: {}", flag)),
            _ => options.positional.push(arg),
        }
    }
    Ok(options)
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env("TENET_LOG"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("TENET_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    if let Err(e) = result {
        eprintln!("Failed to init subscriber: {}", e);
    }
}

fn usage() {
    eprintln!("Usage: tenet-eval [--tokens] [--ast] <expression> [record-json]");
    eprintln!("       tenet-eval --functions");
    eprintln!();
    eprintln!("Example:");
    eprintln!("  tenet-eval 'status == \"active\" && count > 0' '{{\"status\":\"active\",\"count\":5}}'");
}

fn run(options: &Options) -> Result<(), String> {
    let engine = ExpressionEngine::with_builtins();

    if options.functions {
        let catalog = engine.registry().export_documentation();
        let text = serde_json::to_string_pretty(&catalog).map_err(|e| e.to_string())?;
        println!("{}", text);
        return Ok(());
    }

    let source = options
        .positional
        .first()
        .ok_or_else(|| "Missing expression".to_string())?;

    let record: Record = match options.positional.get(1) {
        Some(text) => {
            let json: serde_json::Value = serde_json::from_str(text)
                .map_err(|e| format!("Invalid record JSON: {}", e))?;
            if !json.is_object() {
                return Err("Record JSON must be an object".to_string());
            }
            record_from_json(json)
        }
        None => Record::new(),
    };

    if options.tokens {
        let tokens = tokenize(source).map_err(|e| ExpressionError::from(e).to_string())?;
        for token in &tokens {
            println!(
                "{:>4}:{:<4} {:?}",
                token.span.line, token.span.column, token.kind
            );
        }
    }

    if options.ast {
        let expr = engine.parse(source).map_err(|e| e.to_string())?;
        println!("{}", expr);
    }

    tracing::debug!(expression = %source, fields = record.len(), "evaluating");
    let ctx = EvaluationContext::new(&record);
    let value = engine.evaluate(source, &ctx).map_err(|e| e.to_string())?;
    let text = serde_json::to_string(&value).map_err(|e| e.to_string())?;
    println!("{}", text);
    Ok(())
}

fn main() -> ExitCode {
    init_logging();

    let options = match parse_args() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{}", e);
            usage();
            return ExitCode::from(2);
        }
    };
    if options.positional.is_empty() && !options.functions {
        usage();
        return ExitCode::from(2);
    }

    match run(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
