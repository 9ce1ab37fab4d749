//! Function values and application (`spec.md` §3, §4.2, component C4).
//!
//! Grounded on the teacher's `function.rs`: a `Function` is an immutable
//! value created once (invariant 1 of `spec.md` §3) and never mutated after
//! creation — environment operations that look like "extending" a function
//! (`spec.md` §4.1) always build a brand-new composite value instead
//! (`environment.rs::bind_let`).

use std::rc::Rc;

use crate::{
    decorator::{CallInfo, DecoratorSpec, build_executor, callee_key_for},
    environment::{EnvRef, Environment},
    error::{RunError, RunResult},
    evaluator::Evaluator,
    expressions::Expr,
    signature::{Param, Signature},
    value::Value,
};

/// A function literal's body, resolved from `expressions::BodyExpr` at
/// `FunctionExpr` evaluation time (`spec.md` §3).
#[derive(Debug, Clone)]
pub enum FunctionBody {
    Expr(Rc<Expr>),
    Block { statements: Rc<[crate::expressions::Stmt]>, result: Rc<Expr> },
}

/// A function value (`spec.md` §3). Created once by evaluating a
/// `FunctionExpr`; never mutated afterward. `Clone` is cheap (every field is
/// itself `Rc`-backed or trivially copyable) and is used by
/// `evaluator.rs::attach_extra_decorators` to build a new `Function` with an
/// extended decorator list without mutating the original.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: Option<String>,
    pub params: Vec<Param>,
    /// Context names this function attaches into its call-time environment
    /// (`spec.md` §4.2 step 3).
    pub attachments: Vec<String>,
    pub body: FunctionBody,
    /// The environment captured at the point the `FunctionExpr` was
    /// evaluated (its defining closure).
    pub env: EnvRef,
    pub decorators: Vec<DecoratorSpec>,
    pub signature: Signature,
    /// Whether the parser marked this as a reverse-direction body
    /// (`and f = (x) <- ...`), per `spec.md` §3's `is_reverse` flag.
    pub is_reverse: bool,
}

/// Applies `func` to `args`, running the full `spec.md` §4.2 procedure:
/// child environment, parameter binding (with defaults and `_` skipping),
/// context attachment, the decorator stack, then body evaluation with
/// `return`-unwind handling.
pub fn apply(eval: &mut Evaluator, func: &Rc<Function>, args: Vec<Value>) -> RunResult<Value> {
    eval.resources_mut().enter()?;
    let result = apply_inner(eval, func, args);
    eval.resources_mut().exit();
    result
}

fn apply_inner(eval: &mut Evaluator, func: &Rc<Function>, args: Vec<Value>) -> RunResult<Value> {
    let call_env = Environment::child(&func.env);
    bind_params(eval, &call_env, &func.params, &args)?;
    bind_attachments(eval, &call_env, &func.attachments)?;

    let info = CallInfo {
        name: func.name.clone().unwrap_or_else(|| "<anonymous>".to_owned()),
        signature: func.signature.clone(),
        args,
        env: Rc::clone(&call_env),
        callee_key: callee_key_for(&Value::Function(Rc::clone(func))),
    };

    let body_func = Rc::clone(func);
    let body_env = Rc::clone(&call_env);
    let base: crate::decorator::Executor = Box::new(move |eval| run_body(eval, &body_func.body, &body_env));

    let mut executor = build_executor(eval, &func.decorators, &info, base)?;
    executor(eval)
}

/// Binds positional arguments to parameters: present-and-non-null argument,
/// else evaluated default, else `Null`. Parameters named `_` are skipped
/// entirely (`spec.md` §4.2 step 2).
fn bind_params(eval: &mut Evaluator, call_env: &EnvRef, params: &[Param], args: &[Value]) -> RunResult<()> {
    for (i, param) in params.iter().enumerate() {
        if param.is_ignored() {
            continue;
        }
        let value = match args.get(i) {
            Some(v) if !v.is_null() => v.clone(),
            _ => match &param.default {
                Some(expr) => eval.eval_expr(&param_default_env(call_env), expr)?,
                None => Value::Null,
            },
        };
        call_env.borrow_mut().define(param.name.clone(), value, true);
    }
    Ok(())
}

/// Defaults are evaluated "in the closure" per `spec.md` §4.2 step 2; the
/// call environment's parent chain already *is* that closure, so we reuse
/// it directly rather than threading a separate environment reference.
fn param_default_env(call_env: &EnvRef) -> EnvRef {
    Rc::clone(call_env)
}

/// Looks up each attached context in the registry and binds it by name into
/// the call environment, read at call time rather than definition time
/// (`spec.md` §4.2 step 3, testable property 11).
fn bind_attachments(eval: &Evaluator, call_env: &EnvRef, attachments: &[String]) -> RunResult<()> {
    for name in attachments {
        let Some(value) = eval.contexts().current(name) else {
            return Err(RunError::undefined_context(name));
        };
        call_env.borrow_mut().define(name.clone(), value, true);
    }
    Ok(())
}

/// Evaluates the function body, converting a pending `return` signal into the
/// body's result value (`spec.md` §4.2 step 6: "non-local exit" caught at the
/// function-call boundary, nowhere else — `return` is never represented as a
/// `RunError`, see `evaluator::Evaluator::take_pending_return`).
fn run_body(eval: &mut Evaluator, body: &FunctionBody, env: &EnvRef) -> RunResult<Value> {
    match body {
        FunctionBody::Expr(expr) => {
            let value = eval.eval_expr(env, expr)?;
            Ok(eval.take_pending_return().unwrap_or(value))
        }
        FunctionBody::Block { statements, result } => {
            for stmt in statements.iter() {
                if let Some(returned) = eval.eval_stmt(env, stmt)? {
                    return Ok(returned);
                }
            }
            let value = eval.eval_expr(env, result)?;
            Ok(eval.take_pending_return().unwrap_or(value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{evaluator::Evaluator, io::NoPrint, resource::ResourceLimits, tracer::NoopTracer};

    fn make_function(body: FunctionBody, params: Vec<Param>) -> Rc<Function> {
        Rc::new(Function {
            name: Some("f".into()),
            params,
            attachments: vec![],
            body,
            env: Environment::root(),
            decorators: vec![],
            signature: Signature::default(),
            is_reverse: false,
        })
    }

    #[test]
    fn apply_binds_positional_arguments() {
        let mut eval = Evaluator::new(ResourceLimits::default(), Box::new(NoPrint), Box::new(NoopTracer));
        let param = Param { name: "x".into(), type_ann: None, default: None };
        let func = make_function(FunctionBody::Expr(Rc::new(Expr::Identifier("x".into()))), vec![param]);
        let result = apply(&mut eval, &func, vec![Value::Number(41.0)]).unwrap();
        assert!(matches!(result, Value::Number(n) if n == 41.0));
    }

    #[test]
    fn apply_falls_back_to_default_when_argument_missing() {
        let mut eval = Evaluator::new(ResourceLimits::default(), Box::new(NoPrint), Box::new(NoopTracer));
        let param = Param { name: "x".into(), type_ann: None, default: Some(Rc::new(Expr::NumberLiteral(7.0))) };
        let func = make_function(FunctionBody::Expr(Rc::new(Expr::Identifier("x".into()))), vec![param]);
        let result = apply(&mut eval, &func, vec![]).unwrap();
        assert!(matches!(result, Value::Number(n) if n == 7.0));
    }

    #[test]
    fn ignored_parameter_name_is_skipped() {
        let mut eval = Evaluator::new(ResourceLimits::default(), Box::new(NoPrint), Box::new(NoopTracer));
        let param = Param { name: "_".into(), type_ann: None, default: None };
        let func = make_function(FunctionBody::Expr(Rc::new(Expr::NumberLiteral(1.0))), vec![param]);
        let result = apply(&mut eval, &func, vec![Value::Number(99.0)]).unwrap();
        assert!(matches!(result, Value::Number(n) if n == 1.0));
    }
}
