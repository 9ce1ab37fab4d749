//! `map(list, fn) -> list`. Applies `fn` to each element in order.
//! Promise-aware (`SPEC_FULL.md` SUPP-3): a promise list argument or a
//! promise-returning callback lifts the whole call to a `Promise`, the list
//! builtins' analogue of `pipe.rs::lift_promise`.

use super::{ListArg, arity_error, expect_list, flatten_promise, force_list};
use crate::{error::RunResult, evaluator::Evaluator, promise, promise::Promise, value::Value};

pub fn call(eval: &mut Evaluator, mut args: Vec<Value>) -> RunResult<Value> {
    if args.len() != 2 {
        return Err(arity_error("map", "2 arguments (list, function)", args.len()));
    }
    let mapper = args.pop().unwrap();
    match expect_list("map", &args.pop().unwrap())? {
        ListArg::Ready(items) => map_from(eval, items, 0, Vec::new(), mapper),
        ListArg::Pending(p) if eval.is_async() => {
            let items = force_list("map", eval, &p)?;
            map_from(eval, items, 0, Vec::new(), mapper)
        }
        ListArg::Pending(p) => Ok(Value::Promise(Promise::from_thunk(move |eval| {
            let items = force_list("map", eval, &p)?;
            flatten_promise(eval, map_from(eval, items, 0, Vec::new(), mapper)?)
        }))),
    }
}

/// Maps `items[start..]` into `results`, suspending into a chained `Promise`
/// the first time an element's mapped value comes back pending.
fn map_from(eval: &mut Evaluator, items: Vec<Value>, start: usize, mut results: Vec<Value>, mapper: Value) -> RunResult<Value> {
    for i in start..items.len() {
        let item = items[i].clone();
        let result = eval.call_value(&mapper, vec![item])?;
        match result {
            Value::Promise(p) if eval.is_async() => results.push(promise::force(eval, &p)?),
            Value::Promise(p) => {
                let next = i + 1;
                return Ok(Value::Promise(Promise::from_thunk(move |eval| {
                    let value = promise::force(eval, &p)?;
                    results.push(value);
                    flatten_promise(eval, map_from(eval, items, next, results, mapper)?)
                })));
            }
            other => results.push(other),
        }
    }
    Ok(Value::new_list(results))
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::{io::NoPrint, resource::ResourceLimits, tracer::NoopTracer};

    fn eval() -> Evaluator {
        Evaluator::new(ResourceLimits::default(), Box::new(NoPrint), Box::new(NoopTracer))
    }

    fn doubler() -> Value {
        Value::Native(Rc::new(RefCell::new(|_eval: &mut Evaluator, args: Vec<Value>| {
            let Value::Number(n) = args[0] else { panic!("expected a number") };
            Ok(Value::Number(n * 2.0))
        })))
    }

    #[test]
    fn maps_a_plain_list_eagerly() {
        let mut ev = eval();
        let list = Value::new_list(vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)]);
        let result = call(&mut ev, vec![list, doubler()]).unwrap();
        let Value::List(items) = result else { panic!("expected a list") };
        let values: Vec<f64> = items.borrow().iter().map(|v| if let Value::Number(n) = v { *n } else { panic!() }).collect();
        assert_eq!(values, vec![2.0, 4.0, 6.0]);
    }

    #[test]
    fn a_promise_list_argument_lifts_the_whole_call_to_a_promise() {
        let mut ev = eval();
        let list = Value::Promise(Promise::resolved(Value::new_list(vec![Value::Number(1.0), Value::Number(2.0)])));
        let result = call(&mut ev, vec![list, doubler()]).unwrap();
        let Value::Promise(p) = result else { panic!("expected the call to lift to a promise") };
        let Value::List(items) = promise::force(&mut ev, &p).unwrap() else { panic!("expected a list") };
        let values: Vec<f64> = items.borrow().iter().map(|v| if let Value::Number(n) = v { *n } else { panic!() }).collect();
        assert_eq!(values, vec![2.0, 4.0]);
    }

    #[test]
    fn a_promise_returning_callback_lifts_the_whole_call_to_a_promise() {
        let mut ev = eval();
        let list = Value::new_list(vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)]);
        let mapper = Value::Native(Rc::new(RefCell::new(|_eval: &mut Evaluator, args: Vec<Value>| {
            let Value::Number(n) = args[0] else { panic!("expected a number") };
            Ok(Value::Promise(Promise::resolved(Value::Number(n * 10.0))))
        })));
        let result = call(&mut ev, vec![list, mapper]).unwrap();
        let Value::Promise(p) = result else { panic!("expected the call to lift to a promise") };
        let Value::List(items) = promise::force(&mut ev, &p).unwrap() else { panic!("expected a list") };
        let values: Vec<f64> = items.borrow().iter().map(|v| if let Value::Number(n) = v { *n } else { panic!() }).collect();
        assert_eq!(values, vec![10.0, 20.0, 30.0]);
    }
}
