//! The decorator engine: executor-stack wrapping plus every built-in
//! decorator (`spec.md` §4.6, component C7).
//!
//! A decorator list `[d1, d2, d3]` attached to a function or pipeline wraps
//! its base execution as `d1(d2(d3(base)))` — `d1` runs outermost, seeing
//! `d2`'s (and therefore `d3`'s) effects as part of "the call". We build
//! that nesting by folding the list right-to-left: each `apply_*` call
//! receives the executor built so far as `inner` and returns a new executor
//! that wraps it.

use std::{cell::RefCell, rc::Rc, time::Instant};

use crate::{
    environment::EnvRef,
    error::{ErrorKind, RunError, RunResult},
    evaluator::Evaluator,
    function::Function,
    signature::Signature,
    tracer::TraceEvent,
    value::{NativeFn, Value, identity_key},
};

/// An evaluated decorator reference, stored on `Function`/`Pipeline`
/// (`spec.md` §3: "decorators (evaluated, bound at creation time)").
/// Argument expressions are evaluated once, in the defining environment, the
/// moment the function/pipeline literal is constructed.
#[derive(Debug, Clone)]
pub struct DecoratorSpec {
    pub name: String,
    pub args: Vec<Value>,
}

/// One nested execution step. Built fresh for every call — `apply` (in
/// `function.rs`/`pipeline.rs`) constructs one executor chain per
/// invocation, then calls it exactly once. Declared `FnMut` rather than
/// `FnOnce` only so a *custom* decorator's own function body can choose to
/// invoke its wrapped executor more than once (e.g. implementing its own
/// retry loop) — built-in decorators never do.
pub type Executor = Box<dyn FnMut(&mut Evaluator) -> RunResult<Value>>;

/// Read-only metadata about the call a decorator stack is wrapping, used by
/// `#log`, `#memo`, `#validate`, `#trace`, and similar decorators that need
/// to see the call's name, declared signature, or bound arguments.
#[derive(Clone)]
pub struct CallInfo {
    pub name: String,
    pub signature: Signature,
    pub args: Vec<Value>,
    pub env: EnvRef,
    /// Pointer-identity key of the function/pipeline being called, used as
    /// the `#memo` cache key prefix.
    pub callee_key: usize,
}

/// Builds the full executor chain for `decorators` around `base`
/// (`spec.md` §4.6).
pub fn build_executor(eval: &mut Evaluator, decorators: &[DecoratorSpec], info: &CallInfo, base: Executor) -> RunResult<Executor> {
    let mut exec = base;
    for spec in decorators.iter().rev() {
        exec = apply_decorator(eval, spec, info, exec)?;
    }
    Ok(exec)
}

fn apply_decorator(eval: &mut Evaluator, spec: &DecoratorSpec, info: &CallInfo, inner: Executor) -> RunResult<Executor> {
    match spec.name.as_str() {
        "log" => Ok(log_decorator(info.clone(), inner, false)),
        "log_verbose" => Ok(log_decorator(info.clone(), inner, true)),
        "memo" => Ok(memo_decorator(info.clone(), inner)),
        "time" => Ok(time_decorator(info.clone(), inner)),
        "retry" => retry_decorator(spec, inner),
        "timeout" => timeout_decorator(spec, inner),
        "validate" => Ok(validate_decorator(info.clone(), inner)),
        "pure" => Ok(pure_decorator(inner)),
        "async" => Ok(async_decorator(inner)),
        "trace" => Ok(trace_decorator(info.clone(), inner)),
        "coerce" => coerce_decorator(spec, info.clone(), inner),
        "parse" => Ok(parse_decorator(info.clone(), inner)),
        "stringify" => Ok(stringify_decorator(inner)),
        "tease" => tease_decorator(spec, inner),
        "profile" => Ok(profile_decorator(info.clone(), inner)),
        "debug" => Ok(debug_decorator(info.clone(), inner)),
        "tap" => tap_decorator(spec, inner),
        "export" => export_decorator(spec, info.clone(), inner),
        "autoparallel" => Ok(autoparallel_decorator(info.clone(), inner)),
        "batch" => batch_decorator(spec, info.clone(), inner),
        "parallel" | "prefetch" => Ok(eager_force_decorator(inner)),
        other => {
            let Some(decorator_fn) = eval.lookup_custom_decorator(other) else {
                // Unknown name, not in the custom registry either: `spec.md` §4.6
                // says to warn and pass the executor through unchanged, not to
                // abort the call.
                eval.print_line(&format!("[warning] unknown decorator '{other}'"));
                return Ok(inner);
            };
            Ok(custom_decorator(spec.args.clone(), decorator_fn, inner))
        }
    }
}

fn log_decorator(info: CallInfo, mut inner: Executor, verbose: bool) -> Executor {
    Box::new(move |eval| {
        let args_display: Vec<String> = info.args.iter().map(Value::to_display_string).collect();
        eval.print_line(&format!("[log] calling {}({})", info.name, args_display.join(", ")));
        let result = inner(eval)?;
        if verbose {
            eval.print_line(&format!("[log] {} -> {}", info.name, result.to_display_string()));
        }
        Ok(result)
    })
}

fn memo_decorator(info: CallInfo, mut inner: Executor) -> Executor {
    Box::new(move |eval| {
        let key = memo_key(&info);
        if let Some(cached) = eval.memo_get(&key) {
            return Ok(cached);
        }
        let result = inner(eval)?;
        eval.memo_set(key, result.clone());
        Ok(result)
    })
}

fn memo_key(info: &CallInfo) -> (usize, String) {
    let args_repr = info.args.iter().map(Value::to_display_string).collect::<Vec<_>>().join("\u{1}");
    (info.callee_key, args_repr)
}

fn time_decorator(info: CallInfo, mut inner: Executor) -> Executor {
    Box::new(move |eval| {
        let start = Instant::now();
        let result = inner(eval);
        eval.print_line(&format!("[time] {} took {:?}", info.name, start.elapsed()));
        result
    })
}

fn retry_decorator(spec: &DecoratorSpec, mut inner: Executor) -> RunResult<Executor> {
    let n = decorator_arg_count(spec, "retry")?;
    Ok(Box::new(move |eval| {
        let mut last_err = None;
        // "Try up to n+1 times" (`spec.md` §4.6/§8 testable property 8):
        // the initial attempt plus up to `n` retries after a failure.
        for attempt in 0..=n {
            match inner(eval) {
                Ok(v) => return Ok(v),
                Err(e) => {
                    if attempt < n {
                        eval.print_line(&format!("[retry] attempt {} failed: {}", attempt + 1, e.message));
                    }
                    last_err = Some(e);
                }
            }
        }
        Err(RunError::new(
            ErrorKind::RetryExhausted,
            format!("retry exhausted after {} attempts: {}", n + 1, last_err.map(|e| e.message).unwrap_or_default()),
        )
        .from_decorator("retry"))
    }))
}

/// `#timeout(ms)` (`spec.md` §4.6): only meaningful when the inner executor
/// produces a promise — a synchronous result is returned as-is, no timing
/// check applied. The promise case races forcing it against the elapsed
/// wall clock: if forcing takes longer than `millis`, the returned promise
/// rejects with "exceeded Nms" instead of the forced value.
fn timeout_decorator(spec: &DecoratorSpec, mut inner: Executor) -> RunResult<Executor> {
    let millis = decorator_arg_count(spec, "timeout")? as u64;
    Ok(Box::new(move |eval| match inner(eval)? {
        Value::Promise(p) => Ok(Value::Promise(crate::promise::Promise::from_thunk(move |eval| {
            let start = Instant::now();
            let result = crate::promise::force(eval, &p)?;
            if start.elapsed().as_millis() as u64 > millis {
                return Err(RunError::new(ErrorKind::TimedOut, format!("execution exceeded {millis}ms")).from_decorator("timeout"));
            }
            Ok(result)
        }))),
        other => Ok(other),
    }))
}

/// Validates each bound argument against the call's *declared signature*
/// before running, and the result (or a promise result's resolved value)
/// against the declared return type afterward (`spec.md` §4.6 `#validate`:
/// no predicate argument, it checks the signature the call was already
/// typed with). A parameter or return type with no annotation is left
/// unchecked; null is only accepted where the annotation marks `optional`.
fn validate_decorator(info: CallInfo, mut inner: Executor) -> Executor {
    Box::new(move |eval| {
        for (param, arg) in info.signature.params.iter().zip(info.args.iter()) {
            check_validate_type(&param.name, param.type_ann.as_ref(), arg)?;
        }
        let result = inner(eval)?;
        match (&info.signature.return_type, result) {
            (Some(return_type), Value::Promise(p)) => {
                let return_type = *return_type;
                Ok(Value::Promise(crate::promise::Promise::from_thunk(move |eval| {
                    let resolved = crate::promise::force(eval, &p)?;
                    check_validate_type("return value", Some(&return_type), &resolved)?;
                    Ok(resolved)
                })))
            }
            (Some(return_type), other) => {
                check_validate_type("return value", Some(&return_type), &other)?;
                Ok(other)
            }
            (None, other) => Ok(other),
        }
    })
}

fn check_validate_type(label: &str, type_ann: Option<&crate::signature::TypeAnnotation>, value: &Value) -> RunResult<()> {
    let Some(type_ann) = type_ann else { return Ok(()) };
    if type_ann.matches(value) {
        Ok(())
    } else if value.is_null() {
        Err(RunError::new(ErrorKind::ValidationFailed, format!("{label} is null but is not declared optional")).from_decorator("validate"))
    } else {
        Err(RunError::new(ErrorKind::ValidationFailed, format!("{label} does not match declared type {:?}", type_ann.name)).from_decorator("validate"))
    }
}

fn pure_decorator(mut inner: Executor) -> Executor {
    Box::new(move |eval| {
        let previous = eval.suppress_print();
        let result = inner(eval);
        eval.restore_print(previous);
        result
    })
}

fn async_decorator(mut inner: Executor) -> Executor {
    Box::new(move |eval| {
        let result = inner(eval)?;
        Ok(Value::Promise(crate::promise::Promise::resolved(result)))
    })
}

fn trace_decorator(info: CallInfo, mut inner: Executor) -> Executor {
    Box::new(move |eval| {
        eval.trace(TraceEvent::Call { name: info.name.clone(), depth: eval.call_depth() });
        let result = inner(eval);
        match &result {
            Ok(v) => eval.trace(TraceEvent::Return { name: info.name.clone(), result: v.to_display_string() }),
            Err(e) => eval.trace(TraceEvent::Error { message: e.to_string() }),
        }
        result
    })
}

/// `#coerce(T)` (`spec.md` §4.6): strictly coerces every bound parameter to
/// the decorator's own `T` argument (not each parameter's own declared type,
/// which `#validate` already checks) before running the body; a parameter
/// that cannot be coerced fails the call rather than being silently skipped.
fn coerce_decorator(spec: &DecoratorSpec, info: CallInfo, mut inner: Executor) -> RunResult<Executor> {
    let target = coerce_target(spec)?;
    Ok(Box::new(move |eval| {
        for param in &info.signature.params {
            let Ok(current) = crate::environment::Environment::get(&info.env, &param.name) else { continue };
            if target.matches(&current) {
                continue;
            }
            let coerced = coerce_value(&current, target)
                .ok_or_else(|| RunError::new(ErrorKind::InvalidDecoratorArgument, format!("cannot coerce '{}' to {target:?}", param.name)).from_decorator("coerce"))?;
            let _ = crate::environment::Environment::assign(&info.env, &param.name, coerced);
        }
        inner(eval)
    }))
}

fn coerce_target(spec: &DecoratorSpec) -> RunResult<crate::signature::TypeName> {
    match spec.args.first() {
        Some(Value::Str(s)) => crate::signature::TypeName::from_name(s)
            .ok_or_else(|| RunError::new(ErrorKind::InvalidDecoratorArgument, format!("#coerce does not support type '{s}'")).from_decorator("coerce")),
        _ => Err(RunError::new(ErrorKind::InvalidDecoratorArgument, "#coerce requires a type name argument").from_decorator("coerce")),
    }
}

fn coerce_value(value: &Value, target: crate::signature::TypeName) -> Option<Value> {
    use crate::signature::TypeName;
    match (target, value) {
        (TypeName::Int, Value::Str(s)) => s.trim().parse::<f64>().ok().map(Value::Number),
        (TypeName::Int, Value::Bool(b)) => Some(Value::Number(if *b { 1.0 } else { 0.0 })),
        (TypeName::Str, other) => Some(Value::str(other.to_display_string())),
        (TypeName::Bool, other) => Some(Value::Bool(other.is_truthy())),
        (TypeName::List, other) => Some(Value::new_list(vec![other.clone()])),
        _ => None,
    }
}

fn parse_decorator(info: CallInfo, mut inner: Executor) -> Executor {
    Box::new(move |eval| {
        for param in &info.signature.params {
            let Ok(Value::Str(s)) = crate::environment::Environment::get(&info.env, &param.name) else { continue };
            if let Some(parsed) = parse_string(&s) {
                let _ = crate::environment::Environment::assign(&info.env, &param.name, parsed);
            }
        }
        inner(eval)
    })
}

/// `#parse` (`spec.md` §4.6): try a bare number first, then fall back to a
/// JSON literal; leaves the original string bound if neither parses.
fn parse_string(s: &str) -> Option<Value> {
    let trimmed = s.trim();
    if let Ok(n) = trimmed.parse::<f64>() {
        return Some(Value::Number(n));
    }
    json_to_value(&serde_json::from_str::<serde_json::Value>(trimmed).ok()?)
}

fn json_to_value(json: &serde_json::Value) -> Option<Value> {
    Some(match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64()?),
        serde_json::Value::String(s) => Value::str(s.clone()),
        serde_json::Value::Array(items) => Value::new_list(items.iter().map(json_to_value).collect::<Option<Vec<_>>>()?),
        serde_json::Value::Object(map) => {
            let mut fields = indexmap::IndexMap::new();
            for (key, val) in map {
                fields.insert(key.clone(), json_to_value(val)?);
            }
            Value::new_record(fields)
        }
    })
}

fn stringify_decorator(mut inner: Executor) -> Executor {
    Box::new(move |eval| Ok(Value::str(inner(eval)?.to_display_string())))
}

/// `#tease(T)` (`spec.md` §4.6): best-effort coerce the result to `T`,
/// reusing `#coerce`'s conversion table plus a leading-digit fallback for
/// numbers; returns the original value unchanged rather than failing.
fn tease_decorator(spec: &DecoratorSpec, mut inner: Executor) -> RunResult<Executor> {
    let target = coerce_target(spec)?;
    Ok(Box::new(move |eval| {
        let result = inner(eval)?;
        if target.matches(&result) {
            return Ok(result);
        }
        Ok(tease_value(&result, target).unwrap_or(result))
    }))
}

fn tease_value(value: &Value, target: crate::signature::TypeName) -> Option<Value> {
    use crate::signature::TypeName;
    if let Some(coerced) = coerce_value(value, target) {
        return Some(coerced);
    }
    match (target, value) {
        (TypeName::Int, Value::Str(s)) => {
            let digits: String = s.trim().chars().skip_while(|c| !c.is_ascii_digit() && *c != '-').take_while(|c| c.is_ascii_digit() || *c == '-' || *c == '.').collect();
            digits.parse::<f64>().ok().map(Value::Number)
        }
        _ => None,
    }
}

fn profile_decorator(info: CallInfo, mut inner: Executor) -> Executor {
    Box::new(move |eval| {
        let start = Instant::now();
        let result = inner(eval);
        eval.trace(TraceEvent::Call { name: format!("{} ({:?})", info.name, start.elapsed()), depth: eval.call_depth() });
        result
    })
}

fn debug_decorator(info: CallInfo, mut inner: Executor) -> Executor {
    Box::new(move |eval| {
        let args_display: Vec<String> = info.args.iter().map(Value::to_display_string).collect();
        eval.trace(TraceEvent::Call { name: format!("{}({})", info.name, args_display.join(", ")), depth: eval.call_depth() });
        let result = inner(eval);
        if let Ok(v) = &result {
            eval.trace(TraceEvent::Return { name: info.name.clone(), result: v.to_display_string() });
        }
        result
    })
}

fn tap_decorator(spec: &DecoratorSpec, mut inner: Executor) -> RunResult<Executor> {
    let Some(side_effect) = spec.args.first().cloned() else {
        return Err(RunError::new(ErrorKind::InvalidDecoratorArgument, "#tap requires a function argument").from_decorator("tap"));
    };
    Ok(Box::new(move |eval| {
        let result = inner(eval)?;
        eval.call_value(&side_effect, vec![result.clone()])?;
        Ok(result)
    }))
}

fn export_decorator(spec: &DecoratorSpec, info: CallInfo, mut inner: Executor) -> RunResult<Executor> {
    let name = match spec.args.first() {
        Some(Value::Str(s)) => s.to_string(),
        _ => info.name.clone(),
    };
    Ok(Box::new(move |eval| {
        let result = inner(eval)?;
        eval.export_global(&name, result.clone());
        Ok(result)
    }))
}

/// When the call received exactly one argument and it is a list, applies the
/// wrapped executor once per element (rebinding the sole parameter between
/// calls) and collects a `ParallelResult`; otherwise calls through normally.
/// A best-effort reading of "auto-parallelize over list input" for a
/// single-threaded evaluator with no real worker pool.
fn autoparallel_decorator(info: CallInfo, mut inner: Executor) -> Executor {
    Box::new(move |eval| {
        let (Some(param), Some(Value::List(items))) = (info.signature.params.first(), info.args.first()) else {
            return inner(eval);
        };
        let elements = items.borrow().clone();
        let mut results = Vec::with_capacity(elements.len());
        for element in elements {
            info.env.borrow_mut().define(param.name.clone(), element, true);
            results.push(inner(eval)?);
        }
        Ok(Value::ParallelResult(Rc::new(results)))
    })
}

fn batch_decorator(spec: &DecoratorSpec, info: CallInfo, mut inner: Executor) -> RunResult<Executor> {
    let size = decorator_arg_count(spec, "batch")?.max(1);
    Ok(Box::new(move |eval| {
        let (Some(param), Some(Value::List(items))) = (info.signature.params.first(), info.args.first()) else {
            return inner(eval);
        };
        let elements = items.borrow().clone();
        let mut results = Vec::new();
        for chunk in elements.chunks(size) {
            info.env.borrow_mut().define(param.name.clone(), Value::new_list(chunk.to_vec()), true);
            results.push(inner(eval)?);
        }
        Ok(Value::new_list(results))
    }))
}

/// `#parallel`/`#prefetch` mark a call for eager concurrent execution; the
/// evaluator has no real scheduler (promises resolve on demand, see
/// `promise.rs`), so both decorators degrade to forcing any promise result
/// immediately rather than leaving it lazy.
fn eager_force_decorator(mut inner: Executor) -> Executor {
    Box::new(move |eval| {
        let result = inner(eval)?;
        match result {
            Value::Promise(p) => crate::promise::force(eval, &p),
            other => Ok(other),
        }
    })
}

fn custom_decorator(args: Vec<Value>, decorator_fn: Rc<Function>, inner: Executor) -> Executor {
    let mut inner = Some(inner);
    Box::new(move |eval| {
        let captured = inner.take().expect("custom decorator executor invoked more than once");
        let native = wrap_as_native(captured);
        let mut call_args = vec![Value::Native(native)];
        call_args.extend(args.clone());
        crate::function::apply(eval, &decorator_fn, call_args)
    })
}

fn wrap_as_native(mut inner: Executor) -> NativeFn {
    Rc::new(RefCell::new(move |eval: &mut Evaluator, _args: Vec<Value>| inner(eval)))
}

fn decorator_arg_count(spec: &DecoratorSpec, name: &'static str) -> RunResult<usize> {
    match spec.args.first() {
        Some(Value::Number(n)) if *n >= 0.0 => Ok(*n as usize),
        _ => Err(RunError::new(ErrorKind::InvalidDecoratorArgument, format!("#{name} requires a non-negative numeric argument")).from_decorator(name)),
    }
}

/// Computes the `callee_key` field of a [`CallInfo`] for a callable value.
#[must_use]
pub fn callee_key_for(value: &Value) -> usize {
    identity_key(value)
}
