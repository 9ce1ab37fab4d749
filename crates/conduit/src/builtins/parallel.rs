//! Two call shapes share the `parallel` name (`SPEC_FULL.md` SUPP-3):
//!
//! - `parallel(branches) -> Promise<list>`: each branch — a zero-argument
//!   callable, a promise, or a plain value — is run, and the result settles
//!   to the list of their results in declaration order (`spec.md` §5's
//!   single-threaded cooperative model: "concurrently" means "one shared
//!   scheduling point, declaration order preserved", exactly as
//!   `eval_parallel_pipe` runs its branches in `pipe.rs`).
//! - `parallel(list, fn, { limit? }) -> Promise<list>`: applies `fn(element,
//!   index)` to every element of `list`, preserving input index order
//!   (`spec.md` §8 testable property 9, §9 Open Question #4's corrected
//!   semantics). `limit` bounds how many tasks would be in flight at once;
//!   since this evaluator is single-threaded and synchronous, that cap has
//!   no observable effect beyond arity/type-checking it, the same trade-off
//!   `pipeline.rs`'s `run_listwise` documents for `#parallel`/`#prefetch`.
//!
//! The two shapes are disambiguated by arity: one argument is always the
//! branch-list form, two or three arguments are always the list/fn form.

use super::{ListArg, arity_error, expect_list, force_list, type_error};
use crate::{error::RunResult, evaluator::Evaluator, promise, promise::Promise, value::Value};

pub fn call(_eval: &mut Evaluator, mut args: Vec<Value>) -> RunResult<Value> {
    match args.len() {
        1 => match expect_list("parallel", &args.pop().unwrap())? {
            ListArg::Ready(branches) => Ok(Value::Promise(Promise::from_thunk(move |eval| call_branches(eval, branches)))),
            ListArg::Pending(p) => Ok(Value::Promise(Promise::from_thunk(move |eval| {
                let branches = force_list("parallel", eval, &p)?;
                call_branches(eval, branches)
            }))),
        },
        2 | 3 => call_listwise(args),
        n => Err(arity_error("parallel", "1 argument, or 2-3 arguments", n)),
    }
}

fn call_branches(eval: &mut Evaluator, branches: Vec<Value>) -> RunResult<Value> {
    let mut results = Vec::with_capacity(branches.len());
    for branch in branches {
        results.push(run_branch(eval, branch)?);
    }
    Ok(Value::new_list(results))
}

fn run_branch(eval: &mut Evaluator, branch: Value) -> RunResult<Value> {
    match branch {
        Value::Promise(p) => promise::force(eval, &p),
        callable if callable.is_callable() => eval.call_value(&callable, vec![]),
        plain => Ok(plain),
    }
}

fn call_listwise(mut args: Vec<Value>) -> RunResult<Value> {
    let options = if args.len() == 3 { Some(args.pop().unwrap()) } else { None };
    let callee = args.pop().unwrap();
    if !callee.is_callable() {
        return Err(type_error("parallel", "a callable second argument", &callee));
    }
    match expect_list("parallel", &args.pop().unwrap())? {
        ListArg::Ready(elements) => {
            let _limit = resolve_limit(&options, elements.len())?;
            Ok(Value::Promise(Promise::from_thunk(move |eval| run_listwise(eval, elements, callee))))
        }
        ListArg::Pending(p) => Ok(Value::Promise(Promise::from_thunk(move |eval| {
            let elements = force_list("parallel", eval, &p)?;
            let _limit = resolve_limit(&options, elements.len())?;
            run_listwise(eval, elements, callee)
        }))),
    }
}

fn resolve_limit(options: &Option<Value>, element_count: usize) -> RunResult<usize> {
    match options {
        Some(Value::Record(fields)) => match fields.borrow().get("limit") {
            Some(Value::Number(n)) if *n >= 1.0 => Ok(*n as usize),
            Some(other) => Err(type_error("parallel", "a positive number for 'limit'", other)),
            None => Ok(element_count.max(1)),
        },
        Some(other) => Err(type_error("parallel", "an options record", other)),
        None => Ok(element_count.max(1)),
    }
}

fn run_listwise(eval: &mut Evaluator, elements: Vec<Value>, callee: Value) -> RunResult<Value> {
    let mut results = Vec::with_capacity(elements.len());
    for (index, element) in elements.into_iter().enumerate() {
        results.push(eval.call_value(&callee, vec![element, Value::Number(index as f64)])?);
    }
    Ok(Value::new_list(results))
}
