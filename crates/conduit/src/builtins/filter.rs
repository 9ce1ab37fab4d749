//! `filter(list, predicate) -> list`. Keeps elements for which `predicate`
//! returns a truthy value (`value.rs::is_truthy`). Promise-aware
//! (`SPEC_FULL.md` SUPP-3): a promise list argument or a promise-returning
//! predicate lifts the whole call to a `Promise`.

use super::{ListArg, arity_error, expect_list, flatten_promise, force_list};
use crate::{error::RunResult, evaluator::Evaluator, promise, promise::Promise, value::Value};

pub fn call(eval: &mut Evaluator, mut args: Vec<Value>) -> RunResult<Value> {
    if args.len() != 2 {
        return Err(arity_error("filter", "2 arguments (list, predicate)", args.len()));
    }
    let predicate = args.pop().unwrap();
    match expect_list("filter", &args.pop().unwrap())? {
        ListArg::Ready(items) => filter_from(eval, items, 0, Vec::new(), predicate),
        ListArg::Pending(p) if eval.is_async() => {
            let items = force_list("filter", eval, &p)?;
            filter_from(eval, items, 0, Vec::new(), predicate)
        }
        ListArg::Pending(p) => Ok(Value::Promise(Promise::from_thunk(move |eval| {
            let items = force_list("filter", eval, &p)?;
            flatten_promise(eval, filter_from(eval, items, 0, Vec::new(), predicate)?)
        }))),
    }
}

/// Filters `items[start..]` into `results`, suspending into a chained
/// `Promise` the first time a predicate's verdict comes back pending.
fn filter_from(eval: &mut Evaluator, items: Vec<Value>, start: usize, mut results: Vec<Value>, predicate: Value) -> RunResult<Value> {
    for i in start..items.len() {
        let item = items[i].clone();
        let verdict = eval.call_value(&predicate, vec![item.clone()])?;
        match verdict {
            Value::Promise(p) if eval.is_async() => {
                if promise::force(eval, &p)?.is_truthy() {
                    results.push(item);
                }
            }
            Value::Promise(p) => {
                let next = i + 1;
                return Ok(Value::Promise(Promise::from_thunk(move |eval| {
                    if promise::force(eval, &p)?.is_truthy() {
                        results.push(item);
                    }
                    flatten_promise(eval, filter_from(eval, items, next, results, predicate)?)
                })));
            }
            other if other.is_truthy() => results.push(item),
            _ => {}
        }
    }
    Ok(Value::new_list(results))
}
