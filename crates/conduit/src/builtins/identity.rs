//! `__identity__(x) -> x`. Used internally as `Pipeline::identity`'s single
//! stage and directly callable from user code as the degenerate pipe target.

use crate::{error::RunResult, evaluator::Evaluator, value::Value};

pub fn call(_eval: &mut Evaluator, mut args: Vec<Value>) -> RunResult<Value> {
    Ok(args.drain(..).next().unwrap_or(Value::Null))
}
