//! The pipe engine: forward, spread, parallel, and reverse pipes
//! (`spec.md` §4.4, component C6).
//!
//! No direct teacher analogue — ouros has no pipe operator. The dispatch
//! style (match on the right-hand `Expr` node kind, call through
//! `Evaluator::call_value` for the actual invocation) follows the
//! AST-directed-recursion discipline `evaluator.rs` uses throughout, and the
//! promise-lifting rules below follow the teacher's `asyncio.rs` convention
//! of "a pending value becomes a value by forcing its thunk once".

use std::rc::Rc;

use crate::{
    environment::{EnvRef, Environment},
    error::{ErrorKind, RunError, RunResult},
    evaluator::Evaluator,
    expressions::Expr,
    promise::{self, Promise},
    value::Value,
};

/// `left /> right` (`spec.md` §4.4 "Forward pipe").
pub fn eval_pipe(eval: &mut Evaluator, env: &EnvRef, left: &Expr, right: &Expr) -> RunResult<Value> {
    let value = eval.eval_expr(env, left)?;
    apply_forward(eval, env, value, right)
}

/// Forwards an already-materialized value into `right`, implementing every
/// branch of `spec.md` §4.4's forward-pipe rule set. Shared by the forward
/// pipe itself, each element of a spread pipe, each branch's continuation
/// after a parallel pipe, and every stage of a [`crate::pipeline::Pipeline`]
/// (`spec.md` §4.5: "each stage transforms the current value by applying the
/// forward-pipe rules above").
pub fn apply_forward(eval: &mut Evaluator, env: &EnvRef, value: Value, right: &Expr) -> RunResult<Value> {
    match value {
        Value::Promise(promise) => lift_promise(eval, env, promise, right),
        Value::ParallelResult(values) => apply_parallel_result(eval, env, &values, right),
        other => apply_plain(eval, env, other, right),
    }
}

/// Invariant 6 (`spec.md` §3): "Promises propagate: any pipe whose left side
/// is a promise returns a promise that continues the pipe after resolution."
/// On the async path we force eagerly instead of building a second promise,
/// since the async path's whole contract is "await and unwrap at each step"
/// (`spec.md` §4.8).
fn lift_promise(eval: &mut Evaluator, env: &EnvRef, promise: Promise, right: &Expr) -> RunResult<Value> {
    if eval.is_async() {
        let resolved = promise::force(eval, &promise)?;
        return apply_forward(eval, env, resolved, right);
    }
    let env = Rc::clone(env);
    let right = right.clone();
    Ok(Value::Promise(Promise::from_thunk(move |eval| {
        let resolved = promise::force(eval, &promise)?;
        let continued = apply_forward(eval, &env, resolved, &right)?;
        // Flatten: a promise's settled value is never itself a promise.
        match continued {
            Value::Promise(inner) => promise::force(eval, &inner),
            other => Ok(other),
        }
    })))
}

/// Invariant 5 (`spec.md` §3): a `ParallelResult` piped forward is spread
/// into positional arguments, unless `right`'s argument list already names a
/// placeholder (in which case the placeholder receives the whole result as
/// a list instead — `spec.md` §4.4).
fn apply_parallel_result(eval: &mut Evaluator, env: &EnvRef, values: &Rc<Vec<Value>>, right: &Expr) -> RunResult<Value> {
    match right {
        Expr::CallExpr { callee, args } if !args.iter().any(is_placeholder_arg) => {
            let callee_value = eval.eval_expr(env, callee)?;
            let mut call_args = eval_args(eval, env, args)?;
            let mut spread: Vec<Value> = (**values).clone();
            spread.append(&mut call_args);
            eval.call_value(&callee_value, spread)
        }
        // Either no call (bare identifier/lambda target — call with every
        // value as a positional argument) or a call whose args already
        // contain a placeholder (receives the whole result as a list,
        // spec.md §4.4: "spread only happens when there are no placeholders").
        Expr::CallExpr { callee, args } => {
            let callee_value = eval.eval_expr(env, callee)?;
            let call_env = bind_placeholder(env, Value::new_list((**values).clone()));
            let call_args = eval_args(eval, &call_env, args)?;
            eval.call_value(&callee_value, call_args)
        }
        _ => {
            let callee_value = eval.eval_expr(env, right)?;
            eval.call_value(&callee_value, (**values).clone())
        }
    }
}

/// The plain (non-promise, non-parallel-result) forward-pipe dispatch table
/// of `spec.md` §4.4.
fn apply_plain(eval: &mut Evaluator, env: &EnvRef, value: Value, right: &Expr) -> RunResult<Value> {
    match right {
        Expr::Identifier(_) | Expr::MemberExpr { .. } | Expr::FunctionExpr(_) => {
            let target = eval.eval_expr(env, right)?;
            eval.call_value(&target, vec![value])
        }
        Expr::CallExpr { callee, args } => {
            let callee_value = eval.eval_expr(env, callee)?;
            let has_placeholder = args.iter().any(is_placeholder_arg);
            let call_args = if has_placeholder {
                let call_env = bind_placeholder(env, value);
                eval_args(eval, &call_env, args)?
            } else {
                let mut call_args = eval_args(eval, env, args)?;
                call_args.insert(0, value);
                call_args
            };
            eval.call_value(&callee_value, call_args)
        }
        Expr::PipeExpr { left, right: inner_right } => {
            let intermediate = apply_forward(eval, env, value, left)?;
            apply_forward(eval, env, intermediate, inner_right)
        }
        _ => Err(RunError::new(ErrorKind::InvalidPipeTarget, "Right side of pipe must be a function or call")),
    }
}

/// `left />>> right` (`spec.md` §4.4 "Spread pipe"). Each element is
/// forwarded along with its index (`spec.md` §8's seed scenario interpolates
/// `i: x` per element), so `right` may be written as a one- or two-parameter
/// function; a single-parameter target simply leaves the index argument
/// unbound.
pub fn eval_spread_pipe(eval: &mut Evaluator, env: &EnvRef, left: &Expr, right: &Expr) -> RunResult<Value> {
    let value = eval.eval_expr(env, left)?;
    let elements = match value {
        Value::List(items) => items.borrow().clone(),
        Value::ParallelResult(items) => (*items).clone(),
        _ => return Err(RunError::new(ErrorKind::InvalidSpreadTarget, "Spread pipe requires a list or parallel result")),
    };
    let mut results = Vec::with_capacity(elements.len());
    let mut saw_promise = false;
    for (index, element) in elements.into_iter().enumerate() {
        let result = apply_forward_indexed(eval, env, element, index, right)?;
        saw_promise |= matches!(result, Value::Promise(_));
        results.push(result);
    }
    if saw_promise {
        let mut forced = Vec::with_capacity(results.len());
        for result in results {
            forced.push(match result {
                Value::Promise(p) => promise::force(eval, &p)?,
                other => other,
            });
        }
        Ok(Value::Promise(Promise::resolved(Value::new_list(forced))))
    } else {
        Ok(Value::new_list(results))
    }
}

/// Forwards `value` into `right` the same way `apply_plain` does, but also
/// passes `index` as a second positional argument (or appended after
/// placeholder substitution) for the benefit of spread-pipe targets that want
/// to know their position.
fn apply_forward_indexed(eval: &mut Evaluator, env: &EnvRef, value: Value, index: usize, right: &Expr) -> RunResult<Value> {
    if let Value::Promise(promise) = value {
        let env = Rc::clone(env);
        let right = right.clone();
        return Ok(Value::Promise(Promise::from_thunk(move |eval| {
            let resolved = promise::force(eval, &promise)?;
            let continued = apply_forward_indexed(eval, &env, resolved, index, &right)?;
            match continued {
                Value::Promise(inner) => promise::force(eval, &inner),
                other => Ok(other),
            }
        })));
    }
    let index_value = Value::Number(index as f64);
    match right {
        Expr::Identifier(_) | Expr::MemberExpr { .. } | Expr::FunctionExpr(_) => {
            let target = eval.eval_expr(env, right)?;
            eval.call_value(&target, vec![value, index_value])
        }
        Expr::CallExpr { callee, args } => {
            let callee_value = eval.eval_expr(env, callee)?;
            let has_placeholder = args.iter().any(is_placeholder_arg);
            let call_args = if has_placeholder {
                let call_env = bind_placeholder(env, value);
                let mut call_args = eval_args(eval, &call_env, args)?;
                call_args.push(index_value);
                call_args
            } else {
                let mut call_args = eval_args(eval, env, args)?;
                call_args.insert(0, value);
                call_args.insert(1, index_value);
                call_args
            };
            eval.call_value(&callee_value, call_args)
        }
        _ => apply_forward(eval, env, value, right),
    }
}

/// `input \> b1 \> b2 ... ` (`spec.md` §4.4 "Parallel pipe"). Branches run
/// "concurrently" in the sense of sharing one evaluated input and producing
/// independent values; the single-threaded cooperative model (`spec.md` §5)
/// means they execute in declaration order, which is also the order
/// `ParallelResult`'s elements must preserve.
pub fn eval_parallel_pipe(eval: &mut Evaluator, env: &EnvRef, input: &Expr, branches: &[Expr]) -> RunResult<Value> {
    let mut value = eval.eval_expr(env, input)?;
    if eval.is_async()
        && let Value::Promise(p) = value
    {
        value = promise::force(eval, &p)?;
    }
    let mut results = Vec::with_capacity(branches.len());
    for branch in branches {
        results.push(apply_forward(eval, env, value.clone(), branch)?);
    }
    Ok(Value::ParallelResult(Rc::new(results)))
}

/// `value </ target` (`spec.md` §4.4 "Reverse pipe").
pub fn eval_reverse_pipe(eval: &mut Evaluator, env: &EnvRef, value_expr: &Expr, target_expr: &Expr) -> RunResult<Value> {
    let value = eval.eval_expr(env, value_expr)?;
    let target = eval.eval_expr(env, target_expr)?;
    reverse_apply(eval, value, &target)
}

/// Applies `target` in reverse to `value`; `target` must be a
/// `ReversibleFunction`, `BidirectionalPipeline`, or a `Pipeline` whose
/// stages are all reversible (`spec.md` §4.4).
pub fn reverse_apply(eval: &mut Evaluator, value: Value, target: &Value) -> RunResult<Value> {
    match target {
        Value::ReversibleFunction(pair) => crate::function::apply(eval, &pair.reverse, vec![value]),
        Value::BidirectionalPipeline(bidi) => crate::pipeline::apply_bidirectional_reverse(eval, bidi, value),
        Value::Pipeline(pipeline) => crate::pipeline::apply_reverse(eval, pipeline, value),
        _ => Err(RunError::new(ErrorKind::NotReversible, "Cannot apply reverse pipe: target is not reversible")),
    }
}

/// Whether `expr`, written directly in argument position, is one of the two
/// placeholder forms (`spec.md` §4.4 "Placeholder handling").
#[must_use]
pub fn is_placeholder_arg(expr: &Expr) -> bool {
    matches!(expr, Expr::PlaceholderExpr) || matches!(expr, Expr::Identifier(name) if name == "input")
}

/// Builds a child environment with both placeholder spellings (`_` and
/// `input`) bound to `value`, used whenever an argument list names a
/// placeholder (`spec.md` §4.4) and by `match` guards binding the scrutinee
/// (`spec.md` §4.7).
#[must_use]
pub fn bind_placeholder(env: &EnvRef, value: Value) -> EnvRef {
    let child = Environment::child(env);
    child.borrow_mut().define("_", value.clone(), false);
    child.borrow_mut().define("input", value, false);
    child
}

/// Evaluates a call's argument list left to right.
pub fn eval_args(eval: &mut Evaluator, env: &EnvRef, args: &[Expr]) -> RunResult<Vec<Value>> {
    args.iter().map(|arg| eval.eval_expr(env, arg)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        builtins, environment::Environment, expressions::BinaryOp, io::NoPrint, resource::ResourceLimits, tracer::NoopTracer,
    };

    fn eval_with_builtins() -> (Evaluator, EnvRef) {
        let env = Environment::root();
        builtins::install(&env);
        let eval = Evaluator::new(ResourceLimits::default(), Box::new(NoPrint), Box::new(NoopTracer));
        (eval, env)
    }

    #[test]
    fn pipe_equivalence_with_direct_call() {
        let (mut eval, env) = eval_with_builtins();
        let left = Expr::NumberLiteral(5.0);
        let right = Expr::Identifier("__identity__".into());
        let piped = eval_pipe(&mut eval, &env, &left, &right).unwrap();
        assert!(matches!(piped, Value::Number(n) if n == 5.0));
    }

    #[test]
    fn placeholder_binds_second_argument_position() {
        let (mut eval, env) = eval_with_builtins();
        env.borrow_mut().define(
            "sub",
            Value::Function(std::rc::Rc::new(crate::function::Function {
                name: Some("sub".into()),
                params: vec![
                    crate::signature::Param { name: "a".into(), type_ann: None, default: None },
                    crate::signature::Param { name: "b".into(), type_ann: None, default: None },
                ],
                attachments: vec![],
                body: crate::function::FunctionBody::Expr(std::rc::Rc::new(Expr::BinaryExpr {
                    op: BinaryOp::Sub,
                    left: Box::new(Expr::Identifier("a".into())),
                    right: Box::new(Expr::Identifier("b".into())),
                })),
                env: env.clone(),
                decorators: vec![],
                signature: crate::signature::Signature::default(),
                is_reverse: false,
            })),
            false,
        );
        // 5 /> sub(3, _) binds 5 as the second argument -> sub(3, 5) -> -2
        let left = Expr::NumberLiteral(5.0);
        let right = Expr::CallExpr {
            callee: Box::new(Expr::Identifier("sub".into())),
            args: vec![Expr::NumberLiteral(3.0), Expr::PlaceholderExpr],
        };
        let result = eval_pipe(&mut eval, &env, &left, &right).unwrap();
        assert!(matches!(result, Value::Number(n) if n == -2.0));
    }
}
