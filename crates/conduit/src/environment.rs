//! Lexical environment and binding-time composite rules (`spec.md` §3, §4.1,
//! component C2).
//!
//! Generalizes the teacher's namespace-slot-chain framing (`namespace.rs`,
//! since removed) from pre-resolved integer slots to name lookup: Conduit
//! has no compiler pass computing slot layouts ahead of evaluation, so each
//! frame is a name→binding map with a parent pointer.

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::{
    error::RunError,
    function::Function,
    value::{OverloadSet, Value},
};

pub type EnvRef = Rc<RefCell<Environment>>;

/// A single variable slot: a value plus its mutability (`spec.md` §3).
#[derive(Debug, Clone)]
pub struct Binding {
    pub value: Value,
    pub mutable: bool,
}

/// One lexical frame. The root frame (no parent) holds the kernel built-ins
/// and the `Pipeline` namespace record.
#[derive(Debug, Default)]
pub struct Environment {
    parent: Option<EnvRef>,
    bindings: HashMap<String, Binding>,
}

impl Environment {
    #[must_use]
    pub fn root() -> EnvRef {
        Rc::new(RefCell::new(Self::default()))
    }

    #[must_use]
    pub fn child(parent: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Self { parent: Some(Rc::clone(parent)), bindings: HashMap::new() }))
    }

    /// Unconditionally installs a slot in this frame (`spec.md` §4.1).
    pub fn define(&mut self, name: impl Into<String>, value: Value, mutable: bool) {
        self.bindings.insert(name.into(), Binding { value, mutable });
    }

    #[must_use]
    pub fn has_in_current(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        if self.bindings.contains_key(name) {
            return true;
        }
        match &self.parent {
            Some(parent) => parent.borrow().has(name),
            None => false,
        }
    }

    /// Walks the parent chain looking up `name`; fails with
    /// `ErrorKind::UndefinedVariable` if absent anywhere in the chain
    /// (`spec.md` §3 Environment operations).
    pub fn get(this: &EnvRef, name: &str) -> Result<Value, RunError> {
        let env = this.borrow();
        if let Some(binding) = env.bindings.get(name) {
            return Ok(binding.value.clone());
        }
        match &env.parent {
            Some(parent) => Environment::get(parent, name),
            None => Err(RunError::undefined_variable(name)),
        }
    }

    /// Walks the parent chain reassigning `name`; fails if the binding is
    /// immutable or absent (`spec.md` §3).
    pub fn assign(this: &EnvRef, name: &str, value: Value) -> Result<(), RunError> {
        let mut env = this.borrow_mut();
        if let Some(binding) = env.bindings.get_mut(name) {
            if !binding.mutable {
                return Err(RunError::immutable_reassignment(name));
            }
            binding.value = value;
            return Ok(());
        }
        let parent = env.parent.clone();
        drop(env);
        match parent {
            Some(parent) => Environment::assign(&parent, name, value),
            None => Err(RunError::new(crate::error::ErrorKind::UndefinedAssignment, format!("Undefined variable '{name}'"))),
        }
    }

    /// Applies the binding-time rules of `spec.md` §4.1 for a `let`
    /// statement: reversible-function extension, overload extension, or a
    /// plain define, in that priority order.
    pub fn bind_let(&mut self, name: &str, value: Value, mutable: bool) {
        if let Some(composed) = self.try_compose_with_existing(name, &value) {
            self.define(name.to_owned(), composed, mutable);
            return;
        }
        self.define(name.to_owned(), value, mutable);
    }

    /// Applies the binding-time rules of `spec.md` §4.1 for an `and`
    /// statement: the name must already exist in the current scope; the same
    /// reversible/overload rules apply, but a plain define never happens.
    pub fn bind_and(&mut self, name: &str, value: Value) -> Result<(), RunError> {
        if !self.has_in_current(name) {
            return Err(RunError::new(
                crate::error::ErrorKind::UndefinedAssignment,
                format!("'and' requires '{name}' to already be defined in this scope"),
            ));
        }
        let mutable = self.bindings.get(name).is_some_and(|b| b.mutable);
        let composed = self.try_compose_with_existing(name, &value).unwrap_or(value);
        self.define(name.to_owned(), composed, mutable);
        Ok(())
    }

    /// Implements `spec.md` §4.1's two binding-time special cases. Returns
    /// `None` when neither applies (the caller falls back to a plain
    /// define/replace).
    fn try_compose_with_existing(&self, name: &str, incoming: &Value) -> Option<Value> {
        let existing = self.bindings.get(name).map(|b| &b.value)?;
        if let Value::Function(new_fn) = incoming {
            if new_fn.is_reverse {
                return match existing {
                    Value::Function(old_fn) => {
                        Some(Value::ReversibleFunction(Rc::new(crate::pipeline::ReversibleFunction { forward: Rc::clone(old_fn), reverse: Rc::clone(new_fn) })))
                    }
                    Value::ReversibleFunction(pair) => {
                        Some(Value::ReversibleFunction(Rc::new(crate::pipeline::ReversibleFunction { forward: Rc::clone(&pair.forward), reverse: Rc::clone(new_fn) })))
                    }
                    _ => None,
                };
            }
            if new_fn.signature.is_typed() {
                return match existing {
                    Value::Function(old_fn) => Some(Value::OverloadSet(Rc::new(OverloadSet { overloads: vec![Rc::clone(old_fn), Rc::clone(new_fn)] }))),
                    Value::OverloadSet(set) => {
                        let mut overloads = set.overloads.clone();
                        overloads.push(Rc::clone(new_fn));
                        Some(Value::OverloadSet(Rc::new(OverloadSet { overloads })))
                    }
                    _ => None,
                };
            }
        }
        None
    }
}

/// Helper used by call-site binding (`function.rs`) to look up a name
/// without going through `Environment::get`'s error conversion, for spots
/// that want to distinguish "absent" from other failures.
#[must_use]
pub fn is_plain_function(value: &Value) -> Option<&Rc<Function>> {
    match value {
        Value::Function(f) => Some(f),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{function::Function, signature::Signature};

    fn dummy_function(is_reverse: bool, typed: bool) -> Rc<Function> {
        let mut sig = Signature::default();
        if typed {
            sig.params.push(crate::signature::Param {
                name: "x".into(),
                type_ann: Some(crate::signature::TypeAnnotation { name: crate::signature::TypeName::Int, optional: false }),
                default: None,
            });
        }
        Rc::new(Function {
            name: Some("f".into()),
            params: sig.params.clone(),
            attachments: vec![],
            body: crate::function::FunctionBody::Expr(Rc::new(crate::expressions::Expr::NullLiteral)),
            env: Environment::root(),
            decorators: vec![],
            signature: sig,
            is_reverse,
        })
    }

    #[test]
    fn let_extends_overload_set_for_typed_redefinition() {
        let env = Environment::root();
        env.borrow_mut().define("f", Value::Function(dummy_function(false, false)), false);
        env.borrow_mut().bind_let("f", Value::Function(dummy_function(false, true)), false);
        assert!(matches!(Environment::get(&env, "f").unwrap(), Value::OverloadSet(_)));
    }

    #[test]
    fn let_builds_reversible_function_for_reverse_redefinition() {
        let env = Environment::root();
        env.borrow_mut().define("f", Value::Function(dummy_function(false, false)), false);
        env.borrow_mut().bind_let("f", Value::Function(dummy_function(true, false)), false);
        assert!(matches!(Environment::get(&env, "f").unwrap(), Value::ReversibleFunction(_)));
    }

    #[test]
    fn assign_to_immutable_binding_fails() {
        let env = Environment::root();
        env.borrow_mut().define("x", Value::Number(1.0), false);
        let err = Environment::assign(&env, "x", Value::Number(2.0)).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::ImmutableReassignment);
    }

    #[test]
    fn assign_to_mutable_binding_succeeds() {
        let env = Environment::root();
        env.borrow_mut().define("x", Value::Number(1.0), true);
        Environment::assign(&env, "x", Value::Number(2.0)).unwrap();
        assert!(matches!(Environment::get(&env, "x").unwrap(), Value::Number(n) if n == 2.0));
    }
}
