//! Exercises the twelve invariants of `spec.md` §8 directly, each as its own
//! small program rather than as a property-based generator: the invariants
//! are about *the evaluator's* guarantees (pipe desugaring, overload
//! determinism, memoization, ...), which a handful of representative
//! programs demonstrates as clearly as a generated sweep would.

use conduit::{environment::Environment, io::NoPrint, parse_program, resource::ResourceLimits, run, tracer::NoopTracer, value::Value, RunError};
use pretty_assertions::assert_eq;

fn run_strict(source: &str) -> Value {
    let program = parse_program(source).unwrap();
    run(&program, true, ResourceLimits::default(), Box::new(NoPrint), Box::new(NoopTracer)).unwrap()
}

fn run_strict_err(source: &str) -> RunError {
    let program = parse_program(source).unwrap();
    run(&program, true, ResourceLimits::default(), Box::new(NoPrint), Box::new(NoopTracer)).unwrap_err()
}

fn number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => *n,
        other => panic!("expected a number, got {other:?}"),
    }
}

/// Runs `source` against a fresh `Evaluator`, returning both the program's
/// result and the evaluator itself, so a test can inspect context state
/// (`Evaluator::contexts`) that `run`/`run_async` would otherwise discard.
/// Mirrors `run.rs::eval_top_level_stmt`'s "an `ExprStmt`'s value is the
/// running result" dispatch, since `eval_stmt` alone only surfaces a
/// pending `return`, not a plain expression's value.
fn run_keeping_evaluator(source: &str) -> (Value, conduit::Evaluator) {
    use conduit::expressions::Stmt;
    let program = parse_program(source).unwrap();
    let mut eval = conduit::Evaluator::new(ResourceLimits::default(), Box::new(NoPrint), Box::new(NoopTracer));
    let env = conduit::prepare_root(&eval);
    let mut last = Value::Null;
    for stmt in &program {
        if let Stmt::ExprStmt(expr) = stmt {
            last = eval.eval_expr(&env, expr).unwrap();
        } else {
            eval.eval_stmt(&env, stmt).unwrap();
        }
    }
    (last, eval)
}

/// Invariant 1: `e /> f` and `f(e)` produce equal values.
#[test]
fn pipe_equivalence() {
    let piped = run_strict("let double = (x) -> x * 2\n5 /> double");
    let called = run_strict("let double = (x) -> x * 2\ndouble(5)");
    assert_eq!(number(&piped), number(&called));
}

/// Invariant 2: `5 /> add(3)` binds 5 as the first argument (`add(5, 3)`);
/// `5 /> add(3, _)` binds 5 where `_` sits, as the second argument
/// (`add(3, 5)`). Subtraction (non-commutative) makes the two bindings
/// distinguishable.
#[test]
fn placeholder_position() {
    let default_position = run_strict("let sub = (a, b) -> a - b\n5 /> sub(3)");
    assert_eq!(number(&default_position), 2.0); // sub(5, 3) = 5 - 3

    let placeholder_position = run_strict("let sub = (a, b) -> a - b\n5 /> sub(3, _)");
    assert_eq!(number(&placeholder_position), -2.0); // sub(3, 5) = 3 - 5
}

/// Invariant 3: `a /> b /> c` is equivalent to `(a /> b) /> c`.
#[test]
fn forward_pipe_associativity() {
    let unparenthesized = run_strict("let inc = (x) -> x + 1\nlet double = (x) -> x * 2\n3 /> inc /> double");
    let parenthesized = run_strict("let inc = (x) -> x + 1\nlet double = (x) -> x * 2\n(3 /> inc) /> double");
    assert_eq!(number(&unparenthesized), number(&parenthesized));
    assert_eq!(number(&unparenthesized), 8.0);
}

/// Invariant 4: for all `v`, `v /> Pipeline.identity` equals `v`.
#[test]
fn identity_pipeline_is_a_no_op() {
    assert_eq!(number(&run_strict("5 /> Pipeline.identity")), 5.0);
    assert_eq!(number(&run_strict("-12 /> Pipeline.identity")), -12.0);
}

/// `spec.md` §4.5/§3 invariant 4: `Pipeline.identity` carries one
/// `__identity__` stage, distinct from the genuinely zero-stage
/// `Pipeline.empty` — both apply as a no-op, but only `empty` reports
/// `isEmpty() == true` and `length == 0`.
#[test]
fn identity_pipeline_has_one_stage_empty_pipeline_has_none() {
    assert_eq!(number(&run_strict("Pipeline.identity.length")), 1.0);
    assert!(!run_strict("Pipeline.identity.isEmpty()").is_truthy());
    assert_eq!(number(&run_strict("Pipeline.empty.length")), 0.0);
    assert!(run_strict("Pipeline.empty.isEmpty()").is_truthy());
}

/// Invariant 5: if `f` is reversible and total on the given domain, `v /> f
/// </ f` equals `v`.
#[test]
fn reverse_round_trip() {
    let source = "let double = (x) -> x * 2 and double = (x) <- x / 2\n7 /> double </ double";
    assert_eq!(number(&run_strict(source)), 7.0);
}

/// Invariant 6: the same call with the same argument types always resolves
/// to the same overload.
#[test]
fn overload_determinism() {
    let source = r#"
        let show = (x: int) -> "int:" + x
        and show = (x: string) -> "str:" + x
        [show(1), show(2), show(3), show("a")]
    "#;
    let Value::List(items) = run_strict(source) else { panic!("expected a list") };
    let rendered: Vec<String> = items.borrow().iter().map(Value::to_display_string).collect();
    assert_eq!(rendered, vec!["int:1", "int:2", "int:3", "str:a"]);
}

/// Invariant 7: a `#memo`-annotated pure function returns the cached value
/// for repeated calls with equal argument lists, observed via a counter
/// side-effect wrapper (a context-backed mutable counter, since there is no
/// kernel built-in for process-wide mutable state).
#[test]
fn memoization_skips_repeated_equal_calls() {
    let source = r#"
        context calls = 0
        let slow = (x) -> {
            provide calls = calls + 1
            x * x
        } #memo
        [slow(4), slow(4), slow(4)]
    "#;
    let (result, eval) = run_keeping_evaluator(source);
    let Value::List(items) = result else { panic!("expected a list") };
    let results: Vec<f64> = items.borrow().iter().map(number).collect();
    assert_eq!(results, vec![16.0, 16.0, 16.0]);
    assert_eq!(number(&eval.contexts().current("calls").unwrap()), 1.0);
}

/// Invariant 8: a function that always fails, annotated `#retry(3)`, is
/// called exactly 4 times before propagating.
#[test]
fn retry_exhaustion_calls_n_plus_one_times() {
    let source = r#"
        context attempts = 0
        let always_fails = () -> {
            provide attempts = attempts + 1
            1 / 0
        } #retry(3)
        always_fails()
    "#;
    let program = parse_program(source).unwrap();
    let mut eval = conduit::Evaluator::new(ResourceLimits::default(), Box::new(NoPrint), Box::new(NoopTracer));
    let env = conduit::prepare_root(&eval);
    for stmt in &program {
        let _ = eval.eval_stmt(&env, stmt);
    }
    assert_eq!(number(&eval.contexts().current("attempts").unwrap()), 4.0);
}

/// Invariant 9: `parallel([a,b,c], f, {limit: 1})` returns `[f(a,0), f(b,1),
/// f(c,2)]` in that order.
#[test]
fn parallel_ordering_with_a_limit() {
    let source = r#"
        let doubled_with_index = (x, i) -> x * 2 + i
        await parallel([10, 20, 30], doubled_with_index, { limit: 1 })
    "#;
    let Value::List(items) = run_strict(source) else { panic!("expected a list") };
    let results: Vec<f64> = items.borrow().iter().map(number).collect();
    assert_eq!(results, vec![20.0, 41.0, 62.0]);
}

/// Invariant 10: if the left side of `/>` resolves to a promise that
/// resolves to `v`, the whole expression resolves to what `v /> right`
/// would produce.
#[test]
fn promise_lifting_through_a_pipe() {
    let direct = run_strict("let inc = (x) -> x + 1\n5 /> inc");
    let lifted = run_strict("let inc = (x) -> x + 1\nawait (delay(0, 5) /> inc)");
    assert_eq!(number(&direct), number(&lifted));
}

/// Invariant 11: inside a function attaching context `Logger`, the binding
/// `Logger` equals the registry's current value at *call time*, not at
/// function-definition time.
#[test]
fn context_injection_reads_at_call_time() {
    let source = r#"
        context Tag = "default"
        let read_tag = (x) attach(Tag) -> Tag + ":" + x
        provide Tag = "updated"
        read_tag("value")
    "#;
    match run_strict(source) {
        Value::Str(s) => assert_eq!(&*s, "updated:value"),
        other => panic!("expected a string, got {other:?}"),
    }
}

/// Invariant 12: assigning to a `let`-bound name fails; assigning to a
/// `maybe`-bound name succeeds. The parser has no reassignment-expression
/// syntax (`spec.md`'s grammar binds only via `let`/`maybe`/`and`), so this
/// exercises `Environment::assign` directly, the same boundary
/// `environment.rs`'s own unit tests use.
#[test]
fn immutable_binding_rejects_reassignment_mutable_accepts_it() {
    let env = Environment::root();
    env.borrow_mut().bind_let("frozen", Value::Number(1.0), false);
    env.borrow_mut().bind_let("flexible", Value::Number(1.0), true);

    assert!(Environment::assign(&env, "frozen", Value::Number(2.0)).is_err());
    assert!(Environment::assign(&env, "flexible", Value::Number(2.0)).is_ok());
    assert_eq!(number(&Environment::get(&env, "flexible").unwrap()), 2.0);
}

#[test]
fn run_strict_err_reports_division_by_zero() {
    let err = run_strict_err("1 / 0");
    assert_eq!(err.kind, conduit::ErrorKind::DivisionByZero);
}
