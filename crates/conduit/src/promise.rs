//! Promises: deferred values produced by `#async`-decorated functions and by
//! the `delay`/`parallel`/`race`/`then` kernel builtins (`spec.md` §5, §10).
//!
//! No teacher analogue (ouros has no async surface); the "settle once, cache
//! the result" shape mirrors how the teacher's `asyncio.rs` `GatherFuture`
//! polls a child future exactly until it first resolves and never again. This
//! crate runs single-threaded and cooperatively (`spec.md` §5: "no real OS
//! threads or IO"), so a promise's deferred computation is a plain closure
//! forced synchronously the first time something awaits it — there is no
//! executor loop to drive in the background.

use std::{cell::RefCell, fmt, rc::Rc};

use crate::{error::RunResult, evaluator::Evaluator, value::Value};

type Thunk = Box<dyn FnOnce(&mut Evaluator) -> RunResult<Value>>;

enum State {
    Pending(Thunk),
    Settled(RunResult<Value>),
    /// Set while `force` is running the thunk, to fail loudly on reentrant
    /// self-await instead of panicking on a double-borrow.
    Forcing,
}

/// A shared, lazily-forced deferred value. Cheap to clone (an `Rc` around
/// the shared cell); cloning a `Promise` shares its eventual settlement, it
/// does not re-run the thunk.
#[derive(Clone)]
pub struct Promise(Rc<RefCell<State>>);

impl Promise {
    /// An already-settled promise — used by `#async` (wraps a function's
    /// already-computed result) and `Promise::resolved` call sites that have
    /// no real deferred work to do.
    #[must_use]
    pub fn resolved(value: Value) -> Self {
        Self(Rc::new(RefCell::new(State::Settled(Ok(value)))))
    }

    #[must_use]
    pub fn rejected(error: crate::error::RunError) -> Self {
        Self(Rc::new(RefCell::new(State::Settled(Err(error)))))
    }

    /// A promise whose value is computed on first `force`, per `spec.md`
    /// §4.4's promise-lifting rule for a pipe whose left side is pending.
    #[must_use]
    pub fn from_thunk(thunk: impl FnOnce(&mut Evaluator) -> RunResult<Value> + 'static) -> Self {
        Self(Rc::new(RefCell::new(State::Pending(Box::new(thunk)))))
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(&*self.0.borrow(), State::Settled(_))
    }

    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0.borrow() {
            State::Pending(_) => write!(f, "Promise(pending)"),
            State::Forcing => write!(f, "Promise(forcing)"),
            State::Settled(Ok(v)) => write!(f, "Promise(resolved: {v:?})"),
            State::Settled(Err(e)) => write!(f, "Promise(rejected: {e})"),
        }
    }
}

/// Resolves `promise` to its final value, running its thunk at most once.
/// This is what `await`, `then`, and the sync-path forward pipe's promise
/// lifting rule all reduce to.
pub fn force(eval: &mut Evaluator, promise: &Promise) -> RunResult<Value> {
    let thunk = {
        let mut state = promise.0.borrow_mut();
        match std::mem::replace(&mut *state, State::Forcing) {
            State::Settled(result) => {
                *state = State::Settled(result.clone());
                return result;
            }
            State::Pending(thunk) => thunk,
            State::Forcing => {
                *state = State::Forcing;
                return Err(crate::error::RunError::new(
                    crate::error::ErrorKind::TypeMismatch,
                    "promise awaited while already being forced (self-referential promise)",
                ));
            }
        }
    };
    let result = thunk(eval);
    *promise.0.borrow_mut() = State::Settled(result.clone());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{io::NoPrint, resource::ResourceLimits, tracer::NoopTracer};

    #[test]
    fn forcing_a_resolved_promise_returns_its_value() {
        let mut eval = Evaluator::new(ResourceLimits::default(), Box::new(NoPrint), Box::new(NoopTracer));
        let p = Promise::resolved(Value::Number(7.0));
        let result = force(&mut eval, &p).unwrap();
        assert!(matches!(result, Value::Number(n) if n == 7.0));
    }

    #[test]
    fn thunk_only_runs_once_across_repeated_forces() {
        let mut eval = Evaluator::new(ResourceLimits::default(), Box::new(NoPrint), Box::new(NoopTracer));
        let calls = Rc::new(RefCell::new(0));
        let calls_inner = Rc::clone(&calls);
        let p = Promise::from_thunk(move |_| {
            *calls_inner.borrow_mut() += 1;
            Ok(Value::Number(1.0))
        });
        force(&mut eval, &p).unwrap();
        force(&mut eval, &p).unwrap();
        assert_eq!(*calls.borrow(), 1);
    }
}
