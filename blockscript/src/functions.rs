//! Function registry with signature-keyed overloads.
//!
//! Entries are keyed by (name, ordered argument-type list) and hold the
//! return type plus the callable.  Lookup is by exact signature — there is
//! no coercion, so `int` and `double` overloads of the same name are fully
//! independent registrations.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ScriptError, ScriptResult};
use crate::expr::{EvalContext, Expr};
use crate::value::{Type, Value};

/// A registered function implementation.
///
/// Callables receive the *unevaluated* argument nodes and the evaluation
/// context, and decide whether/when to evaluate each argument.
pub type Callable = Arc<dyn Fn(&[Expr], &mut dyn EvalContext) -> ScriptResult<Value> + Send + Sync>;

struct Overload {
    signature: Vec<Type>,
    return_type: Type,
    callable: Callable,
}

/// Registry mapping (name, signature) to (return type, callable).
#[derive(Default)]
pub struct FunctionTable {
    entries: HashMap<String, Vec<Overload>>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` for the given signature.  Re-registering an
    /// identical (name, signature) pair replaces the earlier entry — last
    /// registration wins.
    pub fn register<F>(&mut self, name: &str, signature: &[Type], return_type: Type, callable: F)
    where
        F: Fn(&[Expr], &mut dyn EvalContext) -> ScriptResult<Value> + Send + Sync + 'static,
    {
        let overload = Overload {
            signature: signature.to_vec(),
            return_type,
            callable: Arc::new(callable),
        };
        let overloads = self.entries.entry(name.to_owned()).or_default();
        match overloads
            .iter_mut()
            .find(|o| o.signature.as_slice() == signature)
        {
            Some(slot) => *slot = overload,
            None => overloads.push(overload),
        }
    }

    /// Is any overload registered under `name`?
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Is an overload with exactly this signature registered under `name`?
    pub fn contains_signature(&self, name: &str, signature: &[Type]) -> bool {
        self.lookup(name, signature).is_ok()
    }

    /// Return type of the exact (name, signature) overload.
    pub fn return_type(&self, name: &str, signature: &[Type]) -> ScriptResult<Type> {
        self.lookup(name, signature).map(|o| o.return_type)
    }

    /// Callable of the exact (name, signature) overload.  Returned by
    /// handle so the table borrow can end before the call is made.
    pub fn callable(&self, name: &str, signature: &[Type]) -> ScriptResult<Callable> {
        self.lookup(name, signature).map(|o| o.callable.clone())
    }

    fn lookup(&self, name: &str, signature: &[Type]) -> ScriptResult<&Overload> {
        self.entries
            .get(name)
            .and_then(|overloads| {
                overloads
                    .iter()
                    .find(|o| o.signature.as_slice() == signature)
            })
            .ok_or_else(|| {
                ScriptError::syntax(format!(
                    "no function registered as {name}({})",
                    format_signature(signature)
                ))
            })
    }
}

fn format_signature(signature: &[Type]) -> String {
    signature
        .iter()
        .map(|ty| ty.name())
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &[Expr], _: &mut dyn EvalContext) -> ScriptResult<Value> {
        Ok(Value::Bool(true))
    }

    #[test]
    fn register_and_query() {
        let mut table = FunctionTable::new();
        table.register("ADD", &[Type::Int, Type::Int], Type::Int, noop);
        table.register("ADD", &[Type::Double, Type::Double], Type::Double, noop);

        assert!(table.contains("ADD"));
        assert!(!table.contains("GLORP"));
        assert!(table.contains_signature("ADD", &[Type::Int, Type::Int]));
        assert!(table.contains_signature("ADD", &[Type::Double, Type::Double]));
        assert!(!table.contains_signature("ADD", &[Type::Bool, Type::Bool]));
        assert!(!table.contains_signature("ADD", &[]));

        assert_eq!(
            table.return_type("ADD", &[Type::Int, Type::Int]).unwrap(),
            Type::Int
        );
        assert_eq!(
            table
                .return_type("ADD", &[Type::Double, Type::Double])
                .unwrap(),
            Type::Double
        );
    }

    #[test]
    fn missing_signature_is_a_syntax_error() {
        let table = FunctionTable::new();
        let err = table.return_type("ADD", &[Type::Int]).unwrap_err();
        assert!(matches!(err, ScriptError::Syntax(_)));
        assert!(err.to_string().contains("ADD(int)"));
    }

    #[test]
    fn last_registration_wins() {
        let mut table = FunctionTable::new();
        table.register("F", &[Type::Int], Type::Int, noop);
        table.register("F", &[Type::Int], Type::Bool, noop);
        assert_eq!(table.return_type("F", &[Type::Int]).unwrap(), Type::Bool);
        // Still a single overload, not two.
        table.register("F", &[Type::Double], Type::Double, noop);
        assert!(table.contains_signature("F", &[Type::Int]));
        assert!(table.contains_signature("F", &[Type::Double]));
    }
}
