//! Program entry points (`spec.md` §6 "Program entry", component C10).
//!
//! `run`/`run_async` are the two faithful evaluation paths `spec.md` §4.8 and
//! §9 describe: both pre-populate a root environment with the kernel
//! built-ins and the `Pipeline` namespace record, then evaluate the
//! statement sequence against it; `run_async` additionally forces any
//! trailing promise before returning, since an async-mode caller expects an
//! already-settled result (`spec.md` §4.8: "await and unwrap at each step").
//!
//! No teacher analogue — ouros's equivalent entry point drives a bytecode
//! `Runner` through a resumable `RunProgress` state machine; this crate has
//! no bytecode and no external-call suspension, so the whole run happens in
//! one call with no progress object to resume.

use std::rc::Rc;

use crate::{
    builtins,
    environment::EnvRef,
    error::RunResult,
    evaluator::Evaluator,
    expressions::{Program, Stmt},
    io::PrintWriter,
    pipeline, promise,
    resource::ResourceLimits,
    tracer::VmTracer,
    value::Value,
};

/// Evaluates `program` on the synchronous path. `strict` follows `spec.md`
/// §6's `run(program, strict)` contract: when `true` (the conventional
/// choice for a file run), the first statement-level error aborts the whole
/// program; when `false`, an error is logged through the configured
/// `PrintWriter` and evaluation continues with the remaining statements,
/// which suits a REPL that should survive one bad line.
pub fn run(program: &Program, strict: bool, limits: ResourceLimits, print: Box<dyn PrintWriter>, tracer: Box<dyn VmTracer>) -> RunResult<Value> {
    let mut eval = Evaluator::new(limits, print, tracer);
    let env = prepare_root(&eval);
    run_program(&mut eval, &env, program, strict)
}

/// Evaluates `program` on the async path (`spec.md` §4.8): identical to
/// [`run`], except the evaluator runs in async mode (so a pipe whose left
/// side is a promise forces it immediately instead of deferring) and any
/// promise the program's last statement produces is forced before
/// returning.
pub fn run_async(program: &Program, strict: bool, limits: ResourceLimits, print: Box<dyn PrintWriter>, tracer: Box<dyn VmTracer>) -> RunResult<Value> {
    let mut eval = Evaluator::new(limits, print, tracer);
    eval.set_async(true);
    let env = prepare_root(&eval);
    let result = run_program(&mut eval, &env, program, strict)?;
    match result {
        Value::Promise(p) => promise::force(&mut eval, &p),
        other => Ok(other),
    }
}

/// Builds the root environment `run`/`run_async` evaluate statements
/// against. This must be `eval`'s own `global_env`, not a freshly built one:
/// `Evaluator::export_global` (the `#export` decorator's effect) writes into
/// `global_env` directly, and those bindings only become visible to
/// subsequent top-level statements if top-level evaluation uses that exact
/// environment. Public so `conduit-cli`'s REPL can build one `Evaluator` and
/// root `Environment` once and keep evaluating lines against it, the way a
/// script's statements accumulate bindings against a single root.
#[must_use]
pub fn prepare_root(eval: &Evaluator) -> EnvRef {
    let env = Rc::clone(eval.global_env());
    builtins::install(&env);
    let pipeline_namespace = pipeline::namespace_record(&env);
    env.borrow_mut().define("Pipeline", pipeline_namespace, false);
    env
}

enum StmtOutcome {
    Value(Value),
    Returned(Value),
    NoValue,
}

fn run_program(eval: &mut Evaluator, env: &EnvRef, program: &Program, strict: bool) -> RunResult<Value> {
    let mut last = Value::Null;
    for stmt in program {
        match eval_top_level_stmt(eval, env, stmt) {
            Ok(StmtOutcome::Value(value)) => last = value,
            Ok(StmtOutcome::Returned(value)) => {
                last = value;
                break;
            }
            Ok(StmtOutcome::NoValue) => {}
            Err(e) if strict => return Err(e),
            Err(e) => eval.print_line(&format!("warning: {e}")),
        }
    }
    Ok(last)
}

/// Evaluates one top-level statement, distinguishing "produced a value"
/// (an `ExprStmt`, whose value becomes the program's result if it is the
/// last statement) from "produced no value" (`let`/`and`/`context`/
/// `provide`/decorator definitions) and from an in-flight `return` (which
/// ends the program early with that value, `spec.md` §4.2 step 6 applied at
/// the outermost scope).
fn eval_top_level_stmt(eval: &mut Evaluator, env: &EnvRef, stmt: &Stmt) -> RunResult<StmtOutcome> {
    if let Stmt::ExprStmt(expr) = stmt {
        let value = eval.eval_expr(env, expr)?;
        return Ok(match eval.take_pending_return() {
            Some(returned) => StmtOutcome::Returned(returned),
            None => StmtOutcome::Value(value),
        });
    }
    match eval.eval_stmt(env, stmt)? {
        Some(returned) => Ok(StmtOutcome::Returned(returned)),
        None => Ok(StmtOutcome::NoValue),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{expressions::Expr, io::NoPrint, tracer::NoopTracer};

    fn run_source(program: Program) -> Value {
        run(&program, true, ResourceLimits::default(), Box::new(NoPrint), Box::new(NoopTracer)).unwrap()
    }

    #[test]
    fn program_result_is_last_expression_statement() {
        let program = vec![
            Stmt::LetStmt { name: "x".into(), mutable: false, value: Expr::NumberLiteral(2.0), decorators: vec![] },
            Stmt::ExprStmt(Expr::BinaryExpr {
                op: crate::expressions::BinaryOp::Add,
                left: Box::new(Expr::Identifier("x".into())),
                right: Box::new(Expr::NumberLiteral(3.0)),
            }),
        ];
        assert!(matches!(run_source(program), Value::Number(n) if n == 5.0));
    }

    #[test]
    fn root_environment_exposes_kernel_builtins_and_pipeline_namespace() {
        let program = vec![Stmt::ExprStmt(Expr::CallExpr {
            callee: Box::new(Expr::Identifier("__identity__".into())),
            args: vec![Expr::NumberLiteral(9.0)],
        })];
        assert!(matches!(run_source(program), Value::Number(n) if n == 9.0));

        let program = vec![Stmt::ExprStmt(Expr::MemberExpr { target: Box::new(Expr::Identifier("Pipeline".into())), member: "identity".into() })];
        assert!(matches!(run_source(program), Value::Pipeline(_)));
    }

    #[test]
    fn non_strict_run_continues_past_an_erroring_statement() {
        let program = vec![
            Stmt::ExprStmt(Expr::Identifier("undefined_name".into())),
            Stmt::ExprStmt(Expr::NumberLiteral(1.0)),
        ];
        let result = run(&program, false, ResourceLimits::default(), Box::new(NoPrint), Box::new(NoopTracer)).unwrap();
        assert!(matches!(result, Value::Number(n) if n == 1.0));
    }

    #[test]
    fn strict_run_aborts_on_the_first_error() {
        let program = vec![
            Stmt::ExprStmt(Expr::Identifier("undefined_name".into())),
            Stmt::ExprStmt(Expr::NumberLiteral(1.0)),
        ];
        let err = run(&program, true, ResourceLimits::default(), Box::new(NoPrint), Box::new(NoopTracer)).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::UndefinedVariable);
    }
}
