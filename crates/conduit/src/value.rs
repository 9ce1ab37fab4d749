//! The runtime value model (`spec.md` §3, component C1).
//!
//! `Value` is a tagged sum of every shape a Conduit expression can produce.
//! Reference types (`List`, `Record`, `Function`, `Pipeline`, ...) are `Rc`-
//! wrapped rather than heap-arena-indexed: `spec.md` §9 explicitly permits
//! either a tracing-GC or reference-counted implementation, and a
//! tree-walking interpreter over `Rc` is the idiomatic choice when there is
//! no bytecode compiler computing slot layouts up front.

use std::{cell::RefCell, fmt, rc::Rc};

use indexmap::IndexMap;

use crate::{
    function::Function,
    pipeline::{BidirectionalPipeline, Pipeline, ReversibleFunction},
    promise::Promise,
};

/// A mutable, shared list. Lists have reference identity in the host but
/// that identity is never observed from Conduit code (`spec.md` §3).
pub type ListRef = Rc<RefCell<Vec<Value>>>;

/// An insertion-ordered record. `indexmap::IndexMap` gives us field order
/// for free, matching `spec.md` §3's "insertion-ordered map string→Value".
pub type RecordRef = Rc<RefCell<IndexMap<String, Value>>>;

/// A native function value produced by wrapping a Rust closure as a
/// callable `Value`. Used to expose a decorator's current executor to a
/// user-defined custom decorator (`decorator.rs`) as a callable value.
pub type NativeFn = Rc<RefCell<dyn FnMut(&mut crate::evaluator::Evaluator, Vec<Value>) -> crate::error::RunResult<Value>>>;

/// A registered kernel built-in (`spec.md` §6, §10): `__identity__`,
/// `print`, `delay`, `parallel`, `race`, `then`, `map`, `filter`, `reduce`.
#[derive(Clone)]
pub struct Builtin {
    pub name: &'static str,
    pub func: fn(&mut crate::evaluator::Evaluator, Vec<Value>) -> crate::error::RunResult<Value>,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<builtin {}>", self.name)
    }
}

/// The runtime value tagged sum (`spec.md` §3).
#[derive(Clone)]
pub enum Value {
    Number(f64),
    Str(Rc<str>),
    Bool(bool),
    Null,
    List(ListRef),
    Tuple(Rc<[Value]>),
    Record(RecordRef),
    Function(Rc<Function>),
    Builtin(Rc<Builtin>),
    /// A Rust closure exposed as a callable value; see [`NativeFn`].
    Native(NativeFn),
    Promise(Promise),
    ParallelResult(Rc<Vec<Value>>),
    OverloadSet(Rc<OverloadSet>),
    Pipeline(Rc<Pipeline>),
    BidirectionalPipeline(Rc<BidirectionalPipeline>),
    ReversibleFunction(Rc<ReversibleFunction>),
}

/// A collection of functions sharing a name but differing in declared
/// parameter types (`spec.md` §3, §4.3). Formed only at binding time by
/// [`crate::environment::Environment`]; never mutated in place — extending
/// an overload set produces a brand-new `OverloadSet` value (invariant 1).
#[derive(Debug)]
pub struct OverloadSet {
    pub overloads: Vec<Rc<Function>>,
}

impl Value {
    /// Runtime type name used by overload resolution (`spec.md` §4.3) and
    /// by `#validate`/`#coerce`.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "int",
            Value::Str(_) => "string",
            Value::Bool(_) => "bool",
            Value::Null => "null",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Record(_) => "record",
            Value::Function(_) | Value::Builtin(_) | Value::Native(_) | Value::ReversibleFunction(_) | Value::OverloadSet(_) => "function",
            Value::Promise(_) => "promise",
            Value::ParallelResult(_) => "parallel",
            Value::Pipeline(_) => "pipeline",
            Value::BidirectionalPipeline(_) => "pipeline",
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthiness used by `if`/ternary/guard evaluation: `false`, `null`,
    /// `0`, and `""` are falsy; everything else (including empty
    /// lists/records, matching common pipe-language conventions) is truthy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Null => false,
            Value::Number(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Whether this value can stand in as the right-hand side of a pipe, a
    /// call target, or a reverse-pipe target (`spec.md` §4.4).
    #[must_use]
    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Value::Function(_)
                | Value::Builtin(_)
                | Value::Native(_)
                | Value::OverloadSet(_)
                | Value::ReversibleFunction(_)
                | Value::Pipeline(_)
                | Value::BidirectionalPipeline(_)
        )
    }

    #[must_use]
    pub fn new_list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    #[must_use]
    pub fn new_record(fields: IndexMap<String, Value>) -> Self {
        Value::Record(Rc::new(RefCell::new(fields)))
    }

    #[must_use]
    pub fn str(s: impl Into<Rc<str>>) -> Self {
        Value::Str(s.into())
    }

    /// Canonical, deterministic textual form used both by `print`/string
    /// interpolation (`Display`) and by the `#memo` decorator's argument
    /// serialization (`spec.md` §3 invariant 7) — the latter does not need
    /// to round-trip, only to be stable and distinguish distinct values.
    #[must_use]
    pub fn to_display_string(&self) -> String {
        format!("{self}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    let mut buf = ryu::Buffer::new();
                    f.write_str(buf.format(*n))
                }
            }
            Value::Str(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => f.write_str("null"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", Repr(item))?;
                }
                f.write_str("]")
            }
            Value::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", Repr(item))?;
                }
                f.write_str(")")
            }
            Value::Record(fields) => {
                f.write_str("{ ")?;
                for (i, (key, value)) in fields.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {}", Repr(value))?;
                }
                f.write_str(" }")
            }
            Value::Function(func) => write!(f, "<function {}>", func.name.as_deref().unwrap_or("anonymous")),
            Value::Builtin(b) => write!(f, "<builtin {}>", b.name),
            Value::Native(_) => f.write_str("<native function>"),
            Value::Promise(_) => f.write_str("<promise>"),
            Value::ParallelResult(values) => {
                f.write_str("<parallel ")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str(">")
            }
            Value::OverloadSet(set) => write!(f, "<overload-set {} variants>", set.overloads.len()),
            Value::Pipeline(p) => write!(f, "<pipeline {} stages>", p.stages.len()),
            Value::BidirectionalPipeline(p) => write!(f, "<bidirectional-pipeline {} stages>", p.stages.len()),
            Value::ReversibleFunction(r) => write!(f, "<reversible function {}>", r.forward.name.as_deref().unwrap_or("anonymous")),
        }
    }
}

/// Wraps a value for `repr`-style display inside list/tuple/record
/// containers, where strings need their quotes shown.
struct Repr<'a>(&'a Value);

impl fmt::Display for Repr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::Str(s) => write!(f, "\"{s}\""),
            other => write!(f, "{other}"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

/// Structural deep equality (`spec.md` §3) used by `==`, `match` patterns,
/// and `Pipeline::equals`'s sibling helpers. Functions, pipelines, and
/// native callables compare by reference identity — there is no useful
/// structural notion of equality for a closure.
#[must_use]
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Null, Value::Null) => true,
        (Value::List(x), Value::List(y)) => {
            let x = x.borrow();
            let y = y.borrow();
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| deep_equal(a, b))
        }
        (Value::Tuple(x), Value::Tuple(y)) => x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| deep_equal(a, b)),
        (Value::Record(x), Value::Record(y)) => {
            let x = x.borrow();
            let y = y.borrow();
            x.len() == y.len() && x.iter().all(|(k, v)| y.get(k).is_some_and(|w| deep_equal(v, w)))
        }
        (Value::ParallelResult(x), Value::ParallelResult(y)) => x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| deep_equal(a, b)),
        (Value::Function(x), Value::Function(y)) => Rc::ptr_eq(x, y),
        (Value::Builtin(x), Value::Builtin(y)) => x.name == y.name,
        (Value::Pipeline(x), Value::Pipeline(y)) => Rc::ptr_eq(x, y),
        (Value::BidirectionalPipeline(x), Value::BidirectionalPipeline(y)) => Rc::ptr_eq(x, y),
        (Value::ReversibleFunction(x), Value::ReversibleFunction(y)) => Rc::ptr_eq(x, y),
        (Value::OverloadSet(x), Value::OverloadSet(y)) => Rc::ptr_eq(x, y),
        _ => false,
    }
}

/// A stable pointer-identity key for side-tables keyed by function/pipeline
/// identity (used by the `#memo` decorator, see `decorator.rs`).
#[must_use]
pub fn identity_key(value: &Value) -> usize {
    match value {
        Value::Function(f) => Rc::as_ptr(f).cast::<()>() as usize,
        Value::Pipeline(p) => Rc::as_ptr(p).cast::<()>() as usize,
        Value::BidirectionalPipeline(p) => Rc::as_ptr(p).cast::<()>() as usize,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_matches_spec_falsy_set() {
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::str("").is_truthy());
        assert!(Value::Number(0.5).is_truthy());
        assert!(Value::new_list(vec![]).is_truthy());
    }

    #[test]
    fn deep_equal_compares_lists_structurally() {
        let a = Value::new_list(vec![Value::Number(1.0), Value::str("x")]);
        let b = Value::new_list(vec![Value::Number(1.0), Value::str("x")]);
        assert!(deep_equal(&a, &b));
        let c = Value::new_list(vec![Value::Number(1.0), Value::str("y")]);
        assert!(!deep_equal(&a, &c));
    }

    #[test]
    fn display_formats_integral_numbers_without_decimal() {
        assert_eq!(Value::Number(4.0).to_string(), "4");
        assert_eq!(Value::Number(4.5).to_string(), "4.5");
    }
}
