//! `then(promise, fn) -> Promise`. Chains `fn` onto `promise`'s eventual
//! value, the manual equivalent of what a forward pipe does automatically
//! when its left side is a promise (`pipe.rs::lift_promise`).

use super::arity_error;
use crate::{error::RunResult, evaluator::Evaluator, promise, promise::Promise, value::Value};

pub fn call(_eval: &mut Evaluator, mut args: Vec<Value>) -> RunResult<Value> {
    if args.len() != 2 {
        return Err(arity_error("then", "2 arguments", args.len()));
    }
    let continuation = args.pop().unwrap();
    let source = args.pop().unwrap();
    Ok(Value::Promise(Promise::from_thunk(move |eval| {
        let resolved = match source {
            Value::Promise(p) => promise::force(eval, &p)?,
            other => other,
        };
        let result = eval.call_value(&continuation, vec![resolved])?;
        match result {
            Value::Promise(p) => promise::force(eval, &p),
            other => Ok(other),
        }
    })))
}
