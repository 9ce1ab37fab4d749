//! Function parameter lists and declared-type matching (`spec.md` §3, §4.3).
//!
//! Conduit parameters are simpler than the Python signatures this module was
//! originally built for: no positional-only markers, no `*args`/`**kwargs`,
//! no keyword-only group. Each parameter is just a name, an optional type
//! annotation, and an optional default expression (`spec.md` §3: "Function:
//! parameters (each: name, optional type annotation, optional default
//! expression AST)...").

use std::rc::Rc;

use crate::{expressions::Expr, value::Value};

/// The declared parameter/return types recognized by overload resolution
/// and `#validate`/`#coerce` (`spec.md` §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeName {
    Int,
    Str,
    Bool,
    List,
    Tuple,
    Function,
    Any,
}

impl TypeName {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "int" | "number" => Some(TypeName::Int),
            "string" | "str" => Some(TypeName::Str),
            "bool" => Some(TypeName::Bool),
            "list" => Some(TypeName::List),
            "tuple" => Some(TypeName::Tuple),
            "function" => Some(TypeName::Function),
            "any" => Some(TypeName::Any),
            _ => None,
        }
    }

    /// Whether `value`'s runtime type matches this declared type
    /// (`spec.md` §4.3 "Type matching rules").
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            TypeName::Any => true,
            TypeName::Int => matches!(value, Value::Number(_)),
            TypeName::Str => matches!(value, Value::Str(_)),
            TypeName::Bool => matches!(value, Value::Bool(_)),
            TypeName::List => matches!(value, Value::List(_)),
            TypeName::Tuple => matches!(value, Value::Tuple(_)),
            TypeName::Function => value.is_callable(),
        }
    }
}

/// A declared type annotation, optionally marked nullable (`spec.md` §4.3:
/// "an optional marker allows null").
#[derive(Debug, Clone, Copy)]
pub struct TypeAnnotation {
    pub name: TypeName,
    pub optional: bool,
}

impl TypeAnnotation {
    #[must_use]
    pub fn matches(&self, value: &Value) -> bool {
        if value.is_null() {
            return self.optional;
        }
        self.name.matches(value)
    }
}

/// A single function parameter.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub type_ann: Option<TypeAnnotation>,
    pub default: Option<Rc<Expr>>,
}

impl Param {
    /// Parameters literally named `_` are ignored during binding
    /// (`spec.md` §4.2 step 2).
    #[must_use]
    pub fn is_ignored(&self) -> bool {
        self.name == "_"
    }
}

/// The full parameter list plus optional declared return type
/// (`spec.md` §3: "optional type signature (param types + return type)").
#[derive(Debug, Clone, Default)]
pub struct Signature {
    pub params: Vec<Param>,
    pub return_type: Option<TypeAnnotation>,
}

impl Signature {
    /// A function only becomes part of an `OverloadSet` when it carries a
    /// type signature (`spec.md` §4.1): at least one parameter or the
    /// return type must be annotated.
    #[must_use]
    pub fn is_typed(&self) -> bool {
        self.return_type.is_some() || self.params.iter().any(|p| p.type_ann.is_some())
    }

    /// Score of `args` against this signature per `spec.md` §4.3: `+2` per
    /// matching declared type, `+0` for an undeclared parameter, `None`
    /// (disqualified) if any declared type fails to match.
    #[must_use]
    pub fn score(&self, args: &[Value]) -> Option<u32> {
        let mut score = 0u32;
        for (i, param) in self.params.iter().enumerate() {
            let Some(type_ann) = &param.type_ann else { continue };
            let arg = args.get(i).unwrap_or(&Value::Null);
            if type_ann.matches(arg) {
                score += 2;
            } else {
                return None;
            }
        }
        Some(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_name_matches_declared_kinds() {
        assert!(TypeName::Int.matches(&Value::Number(1.0)));
        assert!(!TypeName::Int.matches(&Value::str("x")));
        assert!(TypeName::Any.matches(&Value::Null));
    }

    #[test]
    fn optional_annotation_allows_null() {
        let ann = TypeAnnotation { name: TypeName::Int, optional: true };
        assert!(ann.matches(&Value::Null));
        let strict = TypeAnnotation { name: TypeName::Int, optional: false };
        assert!(!strict.matches(&Value::Null));
    }
}
