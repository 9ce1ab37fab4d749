//! `delay(ms, value?) -> Promise` (`SPEC_FULL.md` SUPP-3). `ms` is always
//! the first argument; `value` defaults to `Null` when omitted. There is no
//! real timer: `spec.md` §5 rules out OS threads and IO, so `delay` models
//! the passage of time by simply deferring `value` behind a promise that
//! settles the first time it is forced, the same laziness every other
//! promise in this crate has. `ms` itself is accepted and arity-checked but
//! otherwise unused, since nothing in this crate schedules by wall time.

use super::arity_error;
use crate::{error::RunResult, evaluator::Evaluator, promise::Promise, value::Value};

pub fn call(_eval: &mut Evaluator, mut args: Vec<Value>) -> RunResult<Value> {
    let value = match args.len() {
        1 => Value::Null,
        2 => args.pop().unwrap(),
        n => return Err(arity_error("delay", "1 or 2 arguments", n)),
    };
    Ok(Value::Promise(Promise::from_thunk(move |_| Ok(value))))
}
