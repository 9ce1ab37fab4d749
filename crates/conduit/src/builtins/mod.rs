//! The kernel built-in registry (`spec.md` §6, §10, component C9).
//!
//! Everything beyond these nine names — string/list helpers, math, I/O
//! beyond `print` — is explicitly out of scope (`spec.md` §1: "non-kernel
//! builtins ... external collaborators with fixed contracts"). One module
//! per built-in mirrors the teacher's `mod abs; mod aiter; ...` per-builtin
//! layout, generalized from "one Python builtin" to "one kernel built-in".

mod delay;
mod filter;
mod identity;
mod map;
mod parallel;
mod print;
mod race;
mod reduce;
mod then;

use std::rc::Rc;

use crate::{
    environment::EnvRef,
    evaluator::Evaluator,
    promise::{self, Promise},
    value::{Builtin, Value},
};

const ALL: &[(&str, fn(&mut crate::evaluator::Evaluator, Vec<Value>) -> crate::error::RunResult<Value>)] = &[
    ("__identity__", identity::call),
    ("print", print::call),
    ("delay", delay::call),
    ("parallel", parallel::call),
    ("race", race::call),
    ("then", then::call),
    ("map", map::call),
    ("filter", filter::call),
    ("reduce", reduce::call),
];

/// Populates the root environment with the kernel built-ins (`spec.md` §6's
/// Built-in registry). Called once by `run`/`run_async` before any user
/// statement executes; also used directly by tests that need a minimal
/// built-in-equipped environment (see `pipe.rs`, `pipeline.rs`).
pub fn install(env: &EnvRef) {
    for (name, func) in ALL {
        env.borrow_mut().define(*name, Value::Builtin(Rc::new(Builtin { name, func: *func })), false);
    }
}

/// Shared arity/type-checking helper: every built-in reports mismatches the
/// same way (`ErrorKind::BuiltinTypeError`, `spec.md` §7).
fn arity_error(name: &str, expected: &str, got: usize) -> crate::error::RunError {
    crate::error::RunError::new(
        crate::error::ErrorKind::BuiltinTypeError,
        format!("{name} expects {expected}, got {got} argument(s)"),
    )
}

fn type_error(name: &str, expected: &str, value: &Value) -> crate::error::RunError {
    crate::error::RunError::new(
        crate::error::ErrorKind::BuiltinTypeError,
        format!("{name} expects {expected}, got {}", value.type_name()),
    )
}

/// Outcome of resolving a built-in's list-shaped argument. `SPEC_FULL.md`
/// SUPP-3: "if given a `Promise` list ... the whole call lifts to a
/// `Promise`" — a `Promise` argument is deferred rather than rejected, so
/// callers can build a `Promise`-wrapped continuation instead of failing.
enum ListArg {
    Ready(Vec<Value>),
    Pending(Promise),
}

fn expect_list(name: &str, value: &Value) -> crate::error::RunResult<ListArg> {
    match value {
        Value::List(items) => Ok(ListArg::Ready(items.borrow().clone())),
        Value::ParallelResult(items) => Ok(ListArg::Ready((**items).clone())),
        Value::Promise(p) => Ok(ListArg::Pending(p.clone())),
        other => Err(type_error(name, "a list", other)),
    }
}

/// Forces an `ListArg::Pending` promise and re-validates that it settled to
/// a list/parallel-result rather than something else.
fn force_list(name: &str, eval: &mut Evaluator, p: &Promise) -> crate::error::RunResult<Vec<Value>> {
    match promise::force(eval, p)? {
        Value::List(items) => Ok(items.borrow().clone()),
        Value::ParallelResult(items) => Ok((*items).clone()),
        other => Err(type_error(name, "a list", &other)),
    }
}

/// Forces a value down through however many nested `Promise`s a chained
/// continuation produced, settling on the first non-`Promise` value.
fn flatten_promise(eval: &mut Evaluator, mut value: Value) -> crate::error::RunResult<Value> {
    while let Value::Promise(p) = value {
        value = promise::force(eval, &p)?;
    }
    Ok(value)
}
