//! `conduit` command-line front end (`SPEC_FULL.md` SUPP-2).
//!
//! Two modes, chosen by whether a file path is given: `conduit script.cd`
//! parses and runs the whole file through [`conduit::run_async`] (the async
//! path, since a one-shot file run expects any trailing promise forced
//! before printing); bare `conduit` drops into a line-at-a-time REPL that
//! reuses a single [`conduit::Evaluator`] and root environment across lines,
//! so a `let` on one line is visible to the next (mirroring `run.rs`'s
//! `prepare_root` doc comment).
//!
//! No teacher analogue: ouros's CLI drives a resumable bytecode `Runner`
//! through external-call suspension points and a separate `type_check`
//! pass; this crate has neither, so the whole program runs in one call.

use std::{
    env, fs,
    io::{self, BufRead, Write as _},
    process::ExitCode,
};

use conduit::{
    expressions::Stmt, io::StdPrint, parse_program, prepare_root, resource::ResourceLimits, run_async, tracer::StderrTracer, EnvRef, Evaluator,
    RunError, Value,
};
use indexmap::IndexMap;

fn main() -> ExitCode {
    let mut json_output = false;
    let mut file_path = None;
    for arg in env::args().skip(1) {
        if arg == "--json" {
            json_output = true;
        } else {
            file_path = Some(arg);
        }
    }

    match file_path {
        Some(path) => run_file(&path, json_output),
        None => run_repl(),
    }
}

fn run_file(path: &str, json_output: bool) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("conduit: cannot read '{path}': {err}");
            return ExitCode::FAILURE;
        }
    };

    let program = match parse_program(&source) {
        Ok(program) => program,
        Err(err) => {
            eprintln!("conduit: {err}");
            return ExitCode::FAILURE;
        }
    };

    let result = run_async(&program, true, ResourceLimits::default(), Box::new(StdPrint), Box::new(StderrTracer));
    match result {
        Ok(value) => {
            if json_output {
                println!("{}", value_to_json(&value));
            } else {
                println!("{value}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("conduit: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Interactive loop: each line is parsed and evaluated against a root
/// environment built once up front, so bindings accumulate across lines the
/// way a script's statements accumulate against a single root.
fn run_repl() -> ExitCode {
    let mut eval = Evaluator::new(ResourceLimits::default(), Box::new(StdPrint), Box::new(StderrTracer));
    let env = prepare_root(&eval);

    println!("conduit REPL — ':exit' to quit");
    let stdin = io::stdin();
    prompt();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let line = line.trim();
        if line == ":exit" {
            break;
        }
        if line.is_empty() {
            prompt();
            continue;
        }

        match parse_program(line) {
            Ok(program) => eval_repl_program(&mut eval, &env, &program),
            Err(err) => eprintln!("conduit: {err}"),
        }
        prompt();
    }
    ExitCode::SUCCESS
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

/// Evaluates one REPL line's statements against the shared root
/// environment, printing each expression statement's value (matching
/// `run.rs::run_program`'s "result is the last statement's value", but
/// printed eagerly per line instead of only at program end).
fn eval_repl_program(eval: &mut Evaluator, env: &EnvRef, program: &[Stmt]) {
    for stmt in program {
        match eval_repl_stmt(eval, env, stmt) {
            Ok(Some(value)) => println!("{value}"),
            Ok(None) => {}
            Err(err) => {
                eprintln!("conduit: {err}");
                return;
            }
        }
    }
}

fn eval_repl_stmt(eval: &mut Evaluator, env: &EnvRef, stmt: &Stmt) -> Result<Option<Value>, RunError> {
    if let Stmt::ExprStmt(expr) = stmt {
        let value = eval.eval_expr(env, expr)?;
        return Ok(Some(eval.take_pending_return().unwrap_or(value)));
    }
    eval.eval_stmt(env, stmt)
}

/// Renders a [`Value`] as JSON for `--json` output. Callables and promises
/// have no JSON shape, so they fall back to their display form the same way
/// `Value::Debug` does — this is display convenience, not a serialization
/// contract `Value` itself needs to carry.
fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Number(n) => serde_json::json!(n),
        Value::Str(s) => serde_json::Value::String(s.to_string()),
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Null => serde_json::Value::Null,
        Value::List(items) => serde_json::Value::Array(items.borrow().iter().map(value_to_json).collect()),
        Value::Tuple(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        Value::Record(fields) => {
            let map: IndexMap<String, serde_json::Value> = fields.borrow().iter().map(|(k, v)| (k.clone(), value_to_json(v))).collect();
            serde_json::Value::Object(map.into_iter().collect())
        }
        other => serde_json::Value::String(other.to_display_string()),
    }
}
