//! `print(x) -> x`. Writes `x`'s display form through the evaluator's
//! configured [`crate::io::PrintWriter`] (`spec.md` §6) and returns `x`
//! unchanged, so `print` can sit in the middle of a pipe chain as a tap.

use super::arity_error;
use crate::{error::RunResult, evaluator::Evaluator, value::Value};

pub fn call(eval: &mut Evaluator, mut args: Vec<Value>) -> RunResult<Value> {
    if args.len() != 1 {
        return Err(arity_error("print", "1 argument", args.len()));
    }
    let value = args.pop().unwrap();
    eval.print_line(&value.to_display_string());
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{io::CollectStringPrint, resource::ResourceLimits, tracer::NoopTracer};

    #[test]
    fn print_writes_display_form_and_passes_value_through() {
        let mut eval = Evaluator::new(ResourceLimits::default(), Box::new(CollectStringPrint::new()), Box::new(NoopTracer));
        let result = call(&mut eval, vec![Value::Number(4.0)]).unwrap();
        assert!(matches!(result, Value::Number(n) if n == 4.0));
    }
}
