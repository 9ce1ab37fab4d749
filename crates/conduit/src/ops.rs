//! Binary and unary primitive operators (`spec.md` §3, component C3).
//!
//! Grounded on the teacher's `value.rs` binary-op dispatch tables: a flat
//! `match` over `(operator, operand shapes)` returning a typed error on
//! mismatch rather than silently coercing. `And`/`Or` are handled by
//! `evaluator.rs` directly (they need to short-circuit the right operand's
//! evaluation, which this module — working on already-evaluated `Value`s —
//! has no way to do).

use crate::{
    error::{ErrorKind, RunError, RunResult},
    expressions::{BinaryOp, UnaryOp},
    value::{Value, deep_equal},
};

/// Applies every `BinaryOp` except `And`/`Or` (`spec.md` §3's "arithmetic,
/// comparison, string concatenation with coercion, short-circuit logical").
pub fn apply_binary(op: BinaryOp, left: Value, right: Value) -> RunResult<Value> {
    match op {
        BinaryOp::Add => add(left, right),
        BinaryOp::Sub => numeric(left, right, "-", |a, b| a - b),
        BinaryOp::Mul => numeric(left, right, "*", |a, b| a * b),
        BinaryOp::Div => divide(left, right),
        BinaryOp::Mod => modulo(left, right),
        BinaryOp::Eq => Ok(Value::Bool(deep_equal(&left, &right))),
        BinaryOp::NotEq => Ok(Value::Bool(!deep_equal(&left, &right))),
        BinaryOp::Lt => compare(left, right, |o| o == std::cmp::Ordering::Less),
        BinaryOp::LtEq => compare(left, right, |o| o != std::cmp::Ordering::Greater),
        BinaryOp::Gt => compare(left, right, |o| o == std::cmp::Ordering::Greater),
        BinaryOp::GtEq => compare(left, right, |o| o != std::cmp::Ordering::Less),
        BinaryOp::And | BinaryOp::Or => {
            unreachable!("And/Or short-circuit and are dispatched by evaluator.rs before reaching ops::apply_binary")
        }
    }
}

pub fn apply_unary(op: UnaryOp, operand: Value) -> RunResult<Value> {
    match op {
        UnaryOp::Neg => match operand {
            Value::Number(n) => Ok(Value::Number(-n)),
            other => Err(type_mismatch("-", &other, None)),
        },
        UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
    }
}

/// `+`: numeric addition, or string concatenation when either side is a
/// string — "string concatenation with coercion" means the non-string side
/// is stringified with its normal display form rather than rejected.
fn add(left: Value, right: Value) -> RunResult<Value> {
    match (&left, &right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (Value::Str(_), _) | (_, Value::Str(_)) => Ok(Value::str(format!("{left}{right}"))),
        (Value::List(a), Value::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            Ok(Value::new_list(items))
        }
        _ => Err(type_mismatch("+", &left, Some(&right))),
    }
}

fn numeric(left: Value, right: Value, symbol: &'static str, f: impl Fn(f64, f64) -> f64) -> RunResult<Value> {
    match (&left, &right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(f(*a, *b))),
        _ => Err(type_mismatch(symbol, &left, Some(&right))),
    }
}

fn divide(left: Value, right: Value) -> RunResult<Value> {
    match (&left, &right) {
        (Value::Number(_), Value::Number(b)) if *b == 0.0 => Err(RunError::new(ErrorKind::DivisionByZero, "Division by zero")),
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),
        _ => Err(type_mismatch("/", &left, Some(&right))),
    }
}

fn modulo(left: Value, right: Value) -> RunResult<Value> {
    match (&left, &right) {
        (Value::Number(_), Value::Number(b)) if *b == 0.0 => Err(RunError::new(ErrorKind::DivisionByZero, "Modulo by zero")),
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a % b)),
        _ => Err(type_mismatch("%", &left, Some(&right))),
    }
}

fn compare(left: Value, right: Value, accept: impl Fn(std::cmp::Ordering) -> bool) -> RunResult<Value> {
    let ordering = match (&left, &right) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => None,
    };
    match ordering {
        Some(o) => Ok(Value::Bool(accept(o))),
        None => Err(type_mismatch("comparison", &left, Some(&right))),
    }
}

fn type_mismatch(op: &str, left: &Value, right: Option<&Value>) -> RunError {
    let message = match right {
        Some(right) => format!("Cannot apply '{op}' to {} and {}", left.type_name(), right.type_name()),
        None => format!("Cannot apply '{op}' to {}", left.type_name()),
    };
    RunError::new(ErrorKind::TypeMismatch, message)
}
