//! Runtime error type shared by every fallible evaluator operation.

use std::fmt;

use strum::{Display, EnumString, IntoStaticStr};

/// Result type alias for operations that can fail during evaluation.
pub type RunResult<T> = Result<T, RunError>;

/// Broad classification of a runtime failure.
///
/// Mirrors the three failure kinds of `spec.md` §7: evaluation failures
/// (undefined name, bad pipe target, match exhaustion, ...), validation
/// failures raised by the `#validate` decorator, and decorator-originated
/// failures (`retry` exhaustion, `timeout`). `return` is deliberately not a
/// member of this enum — it unwinds via `Evaluator`'s `pending_return` field
/// and is never converted into a `RunError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum ErrorKind {
    /// Name lookup failed in the environment chain.
    UndefinedVariable,
    /// Assignment target does not exist in any enclosing scope.
    UndefinedAssignment,
    /// Assignment to a binding declared with `let` (immutable).
    ImmutableReassignment,
    /// A context attachment named a context that was never declared.
    UndefinedContext,
    /// `match` had no matching case.
    NoMatchingCase,
    /// Right-hand side of a pipe was not a callable/pipeline/reversible target.
    InvalidPipeTarget,
    /// Spread pipe's left side was not a list or parallel result.
    InvalidSpreadTarget,
    /// Reverse pipe target was not reversible.
    NotReversible,
    /// A binary/unary operator was applied to incompatible operand types.
    TypeMismatch,
    /// Division or modulo by zero.
    DivisionByZero,
    /// List/tuple/string index out of bounds, or non-integer index.
    InvalidIndex,
    /// Record field access on a missing field.
    MissingField,
    /// Overload resolution found no matching overload.
    NoMatchingOverload,
    /// `#validate` rejected an argument or return value.
    ValidationFailed,
    /// A decorator argument was malformed (e.g. `#retry("x")`).
    InvalidDecoratorArgument,
    /// `retry` exhausted its attempts; wraps the last inner failure.
    RetryExhausted,
    /// `timeout` elapsed before the inner execution settled.
    TimedOut,
    /// Evaluator recursion depth exceeded configured resource limits.
    RecursionLimit,
    /// A built-in was called with the wrong arity or argument kinds.
    BuiltinTypeError,
    /// Lexing/parsing failure surfaced as a runtime error at `run` time.
    SyntaxError,
}

/// A runtime error: a kind, a message, and an optional decorator origin tag.
///
/// `spec.md` §7 specifies that user-visible errors are "one-line message,
/// optionally with `[decorator-name]` prefix for decorator-originated
/// failures" and that the core does not require a stack trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunError {
    pub kind: ErrorKind,
    pub message: String,
    pub decorator: Option<&'static str>,
}

impl RunError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), decorator: None }
    }

    /// Tags this error as originating from the named decorator, prefixing
    /// its display form with `[name]` per `spec.md` §7.
    #[must_use]
    pub fn from_decorator(mut self, name: &'static str) -> Self {
        self.decorator = Some(name);
        self
    }

    #[must_use]
    pub fn undefined_variable(name: &str) -> Self {
        Self::new(ErrorKind::UndefinedVariable, format!("Undefined variable '{name}'"))
    }

    #[must_use]
    pub fn immutable_reassignment(name: &str) -> Self {
        Self::new(ErrorKind::ImmutableReassignment, format!("Cannot reassign immutable variable '{name}'"))
    }

    #[must_use]
    pub fn undefined_context(name: &str) -> Self {
        Self::new(ErrorKind::UndefinedContext, format!("Context '{name}' is not defined"))
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(decorator) = self.decorator {
            write!(f, "[{decorator}] {}", self.message)
        } else {
            f.write_str(&self.message)
        }
    }
}

impl std::error::Error for RunError {}
