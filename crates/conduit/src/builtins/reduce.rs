//! `reduce(list, init, fn) -> value`. Left fold: `fn(accumulator, element)`
//! called once per element in order, seeded with `init`. Promise-aware
//! (`SPEC_FULL.md` SUPP-3): a promise list argument or a promise-returning
//! reducer lifts the whole call to a `Promise`.

use super::{ListArg, arity_error, expect_list, flatten_promise, force_list};
use crate::{error::RunResult, evaluator::Evaluator, promise, promise::Promise, value::Value};

pub fn call(eval: &mut Evaluator, mut args: Vec<Value>) -> RunResult<Value> {
    if args.len() != 3 {
        return Err(arity_error("reduce", "3 arguments (list, initial, function)", args.len()));
    }
    let reducer = args.pop().unwrap();
    let init = args.pop().unwrap();
    match expect_list("reduce", &args.pop().unwrap())? {
        ListArg::Ready(items) => reduce_from(eval, items, 0, init, reducer),
        ListArg::Pending(p) if eval.is_async() => {
            let items = force_list("reduce", eval, &p)?;
            reduce_from(eval, items, 0, init, reducer)
        }
        ListArg::Pending(p) => Ok(Value::Promise(Promise::from_thunk(move |eval| {
            let items = force_list("reduce", eval, &p)?;
            flatten_promise(eval, reduce_from(eval, items, 0, init, reducer)?)
        }))),
    }
}

/// Folds `items[start..]` starting from `init`, suspending into a chained
/// `Promise` the first time the reducer's result comes back pending.
fn reduce_from(eval: &mut Evaluator, items: Vec<Value>, start: usize, init: Value, reducer: Value) -> RunResult<Value> {
    let mut acc = init;
    for i in start..items.len() {
        let item = items[i].clone();
        let result = eval.call_value(&reducer, vec![acc, item])?;
        acc = match result {
            Value::Promise(p) if eval.is_async() => promise::force(eval, &p)?,
            Value::Promise(p) => {
                let next = i + 1;
                return Ok(Value::Promise(Promise::from_thunk(move |eval| {
                    let resolved = promise::force(eval, &p)?;
                    flatten_promise(eval, reduce_from(eval, items, next, resolved, reducer)?)
                })));
            }
            other => other,
        };
    }
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::{io::NoPrint, resource::ResourceLimits, tracer::NoopTracer};

    fn eval() -> Evaluator {
        Evaluator::new(ResourceLimits::default(), Box::new(NoPrint), Box::new(NoopTracer))
    }

    #[test]
    fn a_promise_returning_reducer_lifts_the_whole_call_to_a_promise() {
        let mut ev = eval();
        let list = Value::new_list(vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)]);
        let sum = Value::Native(Rc::new(RefCell::new(|_eval: &mut Evaluator, args: Vec<Value>| {
            let (Value::Number(acc), Value::Number(n)) = (&args[0], &args[1]) else { panic!("expected numbers") };
            Ok(Value::Promise(Promise::resolved(Value::Number(acc + n))))
        })));
        let result = call(&mut ev, vec![list, Value::Number(0.0), sum]).unwrap();
        let Value::Promise(p) = result else { panic!("expected the call to lift to a promise") };
        let value = promise::force(&mut ev, &p).unwrap();
        assert!(matches!(value, Value::Number(n) if n == 6.0));
    }
}
