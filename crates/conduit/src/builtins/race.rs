//! `race(branches) -> Promise`. Settles to the first branch that succeeds;
//! if every branch rejects, settles to the last rejection (the resolved
//! reading of an open question: with no real concurrency there is no
//! meaningful "first to reject", so the last attempt's error is the most
//! informative one to surface).

use super::{ListArg, arity_error, expect_list, force_list};
use crate::{
    error::{ErrorKind, RunError, RunResult},
    evaluator::Evaluator,
    promise, promise::Promise,
    value::Value,
};

pub fn call(_eval: &mut Evaluator, mut args: Vec<Value>) -> RunResult<Value> {
    if args.len() != 1 {
        return Err(arity_error("race", "1 argument", args.len()));
    }
    match expect_list("race", &args.pop().unwrap())? {
        ListArg::Ready(branches) => Ok(Value::Promise(Promise::from_thunk(move |eval| race_branches(eval, branches)))),
        ListArg::Pending(p) => Ok(Value::Promise(Promise::from_thunk(move |eval| {
            let branches = force_list("race", eval, &p)?;
            race_branches(eval, branches)
        }))),
    }
}

fn race_branches(eval: &mut Evaluator, branches: Vec<Value>) -> RunResult<Value> {
    let mut last_err: Option<RunError> = None;
    for branch in branches {
        match run_branch(eval, branch) {
            Ok(value) => return Ok(value),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| RunError::new(ErrorKind::BuiltinTypeError, "race requires at least one branch")))
}

fn run_branch(eval: &mut Evaluator, branch: Value) -> RunResult<Value> {
    match branch {
        Value::Promise(p) => promise::force(eval, &p),
        callable if callable.is_callable() => eval.call_value(&callable, vec![]),
        plain => Ok(plain),
    }
}
