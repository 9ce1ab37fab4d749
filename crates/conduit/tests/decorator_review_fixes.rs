//! Regression coverage for a maintainer review pass over the decorator
//! engine and pipeline algebra: `#coerce`'s own type argument, `#timeout`'s
//! sync-vs-promise split, unknown-decorator fallback, `Pipeline.stages`'
//! element type, and `.visualize()`'s print-and-return-null contract.

use std::{cell::RefCell, rc::Rc};

use conduit::{expressions::Stmt, parse_program, resource::ResourceLimits, run, tracer::NoopTracer, value::Value, Evaluator, NoPrint, PrintWriter, RunError};

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

/// A print sink that stays readable after the `Evaluator` that owns it (as a
/// `Box<dyn PrintWriter>`) is dropped, by keeping the buffer behind a shared
/// `Rc<RefCell<_>>` the test retains its own handle to.
#[derive(Clone, Default)]
struct SharedPrint(Rc<RefCell<String>>);

impl PrintWriter for SharedPrint {
    fn write_line(&mut self, line: &str) {
        let mut buf = self.0.borrow_mut();
        buf.push_str(line);
        buf.push('\n');
    }
}

/// Runs `source` against a fresh `Evaluator`, returning its final
/// expression's value alongside everything printed during the run (mirrors
/// `testable_properties.rs::run_keeping_evaluator`'s statement loop).
fn run_capturing_print(source: &str) -> (Value, String) {
    let program = parse_program(source).unwrap();
    let sink = SharedPrint::default();
    let mut eval = Evaluator::new(ResourceLimits::default(), Box::new(sink.clone()), Box::new(NoopTracer));
    let env = conduit::prepare_root(&eval);
    let mut last = Value::Null;
    for stmt in &program {
        match stmt {
            Stmt::ExprStmt(expr) => last = eval.eval_expr(&env, expr).unwrap(),
            other => eval.eval_stmt(&env, other).unwrap(),
        }
    }
    let output = sink.0.borrow().clone();
    (last, output)
}

/// `#coerce(T)` reads its own `T` argument rather than each parameter's
/// declared type, and actually coerces (`spec.md` §4.6).
#[test]
fn coerce_converts_a_string_argument_using_its_own_type_argument() {
    let result = run_strict(
        r#"
        let add_one = (x) -> x + 1 #coerce(int)
        add_one("5")
    "#,
    );
    assert_eq!(number(&result), 6.0);
}

/// `#coerce(T)` fails the call rather than silently leaving the argument
/// unconverted when coercion is impossible.
#[test]
fn coerce_fails_when_the_argument_cannot_be_converted() {
    let err = run_strict_err(
        r#"
        let add_one = (x) -> x + 1 #coerce(int)
        add_one("not a number")
    "#,
    );
    assert_eq!(err.kind, conduit::ErrorKind::InvalidDecoratorArgument);
}

/// `#timeout(ms)` is a no-op for a synchronous result, even one that took
/// real wall-clock time to produce (`spec.md` §4.6: "otherwise no-op").
#[test]
fn timeout_does_not_reject_a_slow_synchronous_result() {
    let result = run_strict(
        r#"
        let slow = (n) -> {
            let fib = (k) -> k <= 1 ? k : fib(k - 1) + fib(k - 2)
            fib(n)
        } #timeout(0)
        slow(20)
    "#,
    );
    assert_eq!(number(&result), 6765.0);
}

/// An unknown decorator name (not a built-in, not in the custom registry)
/// warns and passes the executor through unchanged rather than aborting the
/// call (`spec.md` §4.6).
#[test]
fn unknown_decorator_warns_but_does_not_abort_the_call() {
    let (result, output) = run_capturing_print(
        r#"
        let add_one = (x) -> x + 1 #not_a_real_decorator
        add_one(5)
    "#,
    );
    assert_eq!(number(&result), 6.0);
    assert!(output.contains("not_a_real_decorator"), "expected a warning about the unknown decorator, got: {output}");
}

/// `.stages` returns description strings (`spec.md` §4.5), not pipeline
/// values wrapping a single stage.
#[test]
fn pipeline_stages_member_returns_description_strings() {
    let result = run_strict(
        r#"
        let a = (x) -> x
        let b = (x) -> x
        let p = />[ a, />>> b, \>(a, b) ]
        p.stages
    "#,
    );
    let Value::List(items) = result else { panic!("expected a list") };
    let items = items.borrow();
    let as_strings: Vec<String> = items
        .iter()
        .map(|v| match v {
            Value::Str(s) => s.to_string(),
            other => panic!("expected a string description, got {other:?}"),
        })
        .collect();
    assert_eq!(as_strings, vec!["a".to_owned(), "spread".to_owned(), "parallel[2]".to_owned()]);
}

/// `.visualize()` prints the diagram and returns `null` (`spec.md` §4.5),
/// rather than returning the diagram as a string.
#[test]
fn pipeline_visualize_prints_and_returns_null() {
    let (result, output) = run_capturing_print(
        r#"
        let a = (x) -> x
        let p = />[ a ]
        p.visualize()
    "#,
    );
    assert!(matches!(result, Value::Null));
    assert!(output.contains('a'), "expected the diagram to mention stage 'a', got: {output}");
}
