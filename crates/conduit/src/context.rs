//! Context values: process-wide named slots that functions can attach to
//! (`spec.md` §3, §5, §9 Open Question #1).
//!
//! `context <name> = <default-expr>` declares a slot; `provide <name> =
//! <expr>` mutates it for the remainder of the dynamic extent in which it
//! runs. `SPEC_FULL.md`'s Open Question resolution: `provide` mutates the
//! registry's current value in place for the rest of the program — there is
//! no explicit `end provide`/block scoping in `spec.md`'s grammar, so
//! treating it as durable-until-overwritten is the simplest reading
//! consistent with the seed scenarios.

use std::collections::HashMap;

use crate::value::Value;

/// Holds every declared context's current value.
#[derive(Debug, Default)]
pub struct ContextRegistry {
    values: HashMap<String, Value>,
}

impl ContextRegistry {
    /// `context <name> = <default>` (`spec.md` §6 `ContextDefStmt`):
    /// installs the default, unconditionally. Re-declaring a context resets
    /// it — contexts are process-wide singletons, not stackable.
    pub fn declare(&mut self, name: impl Into<String>, default: Value) {
        self.values.insert(name.into(), default);
    }

    /// `provide <name> = <value>` (`spec.md` §6 `ProvideStmt`): fails if
    /// `name` was never declared via `context`.
    pub fn provide(&mut self, name: &str, value: Value) -> bool {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            true
        } else {
            false
        }
    }

    /// Current value of a declared context, read at function-call time by
    /// `function.rs::bind_context` (`spec.md` §4.2 step 3).
    #[must_use]
    pub fn current(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    #[must_use]
    pub fn is_declared(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provide_updates_an_already_declared_context() {
        let mut ctx = ContextRegistry::default();
        ctx.declare("locale", Value::str("en"));
        assert!(ctx.provide("locale", Value::str("fr")));
        assert!(matches!(ctx.current("locale"), Some(Value::Str(s)) if &*s == "fr"));
    }

    #[test]
    fn provide_on_undeclared_context_fails() {
        let mut ctx = ContextRegistry::default();
        assert!(!ctx.provide("missing", Value::Null));
    }
}
