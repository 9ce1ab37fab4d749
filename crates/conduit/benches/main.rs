//! Microbenchmarks over a handful of non-foldable programs, run end to end
//! through the lexer/parser/evaluator. The teacher's equivalent
//! (`benches/arithmetic_non_foldable.rs`) compares its interpreter against
//! CPython via `pyo3`; there is no reference implementation to compare
//! against here (see `DESIGN.md` for why `pyo3`/`codspeed-criterion-compat`
//! were dropped), so this measures the interpreter alone with plain
//! `criterion`.

use std::hint::black_box;

use conduit::{Value, io::NoPrint, parse_program, resource::ResourceLimits, run, tracer::NoopTracer};
use criterion::{Criterion, criterion_group, criterion_main};

fn run_conduit(source: &str) -> Value {
    let program = parse_program(source).expect("benchmark source must parse");
    run(&program, true, ResourceLimits::default(), Box::new(NoPrint), Box::new(NoopTracer)).expect("benchmark source must evaluate")
}

fn number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => *n,
        other => panic!("expected a number, got {other:?}"),
    }
}

/// Two locals added at runtime, the same shape the teacher uses to avoid a
/// constant-folding short-circuit (this evaluator has none, but the shape
/// still exercises `let` binding plus a binary op rather than a bare
/// literal).
const ADD_TWO_LOCALS: &str = "
let x = 1
let y = 2
x + y
";

/// A tight loop expressed as pipe-driven recursion (the language has no
/// `for` statement): each step pipes the running total and counter through
/// a self-recursive function.
const ADD_TWO_LOOP_1000: &str = "
let step = (total, i) -> i >= 1000 ? total : step(total + 1 + 2, i + 1)
step(0, 0)
";

/// Forward-pipe chain of three unary functions, exercising `pipe.rs`'s
/// per-stage dispatch rather than a single direct call.
const PIPE_CHAIN: &str = "
let inc = (x) -> x + 1
let double = (x) -> x * 2
let square = (x) -> x * x
1 /> inc /> double /> square /> inc
";

/// `filter`/`map`/`reduce` over a fifty-element list, the same kernel
/// built-ins `spec.md` §8's seed scenario exercises, at a size large enough
/// to be worth timing.
const FILTER_MAP_REDUCE_50: &str = "
let xs = Pipeline.identity
let nums = [1,2,3,4,5,6,7,8,9,10,11,12,13,14,15,16,17,18,19,20,21,22,23,24,25,26,27,28,29,30,31,32,33,34,35,36,37,38,39,40,41,42,43,44,45,46,47,48,49,50]
nums /> filter((x) -> x % 2 == 0) /> map((x) -> x * x) /> reduce(0, (acc, x) -> acc + x)
";

/// Memoized recursive Fibonacci, the `spec.md` §8 seed scenario's own
/// workload, timing the steady-state cost of decorator-wrapped calls whose
/// cache is already warm.
const FIBONACCI_MEMO_30: &str = "
let fib = (n) -> n <= 1 ? n : fib(n - 1) + fib(n - 2) #memo
fib(30)
";

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("add_two_locals", |b| {
        b.iter(|| black_box(number(&run_conduit(ADD_TWO_LOCALS))));
    });

    c.bench_function("add_two_loop_1000", |b| {
        b.iter(|| black_box(number(&run_conduit(ADD_TWO_LOOP_1000))));
    });

    c.bench_function("pipe_chain", |b| {
        b.iter(|| black_box(number(&run_conduit(PIPE_CHAIN))));
    });

    c.bench_function("filter_map_reduce_50", |b| {
        b.iter(|| black_box(number(&run_conduit(FILTER_MAP_REDUCE_50))));
    });

    c.bench_function("fibonacci_memo_30", |b| {
        b.iter(|| black_box(number(&run_conduit(FIBONACCI_MEMO_30))));
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
