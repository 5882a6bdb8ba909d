//! Lexical scopes

use crate::error::{EvalError, Result};
use crate::value::Value;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// Shared handle to a scope; closures keep their defining scope alive
pub type Env = Rc<RefCell<Scope>>;

#[derive(Clone)]
struct Binding {
    value: Value,
    mutable: bool,
}

#[derive(Default)]
pub struct Scope {
    vars: FxHashMap<String, Binding>,
    parent: Option<Env>,
}

impl Scope {
    pub fn root() -> Env {
        Rc::new(RefCell::new(Scope::default()))
    }

    pub fn child(parent: &Env) -> Env {
        Rc::new(RefCell::new(Scope {
            vars: FxHashMap::default(),
            parent: Some(parent.clone()),
        }))
    }

    /// Bind a name in this scope, shadowing outer bindings
    pub fn declare(env: &Env, name: &str, value: Value, mutable: bool) {
        env.borrow_mut()
            .vars
            .insert(name.to_string(), Binding { value, mutable });
    }

    pub fn lookup(env: &Env, name: &str) -> Option<Value> {
        let scope = env.borrow();
        match scope.vars.get(name) {
            Some(binding) => Some(binding.value.clone()),
            None => scope.parent.as_ref().and_then(|p| Scope::lookup(p, name)),
        }
    }

    /// Update the nearest binding of `name`
    pub fn assign(env: &Env, name: &str, value: Value) -> Result<()> {
        let mut scope = env.borrow_mut();
        if let Some(binding) = scope.vars.get_mut(name) {
            if !binding.mutable {
                return Err(EvalError::ConstAssign(name.to_string()));
            }
            binding.value = value;
            return Ok(());
        }
        match scope.parent.clone() {
            Some(parent) => {
                drop(scope);
                Scope::assign(&parent, name, value)
            }
            None => Err(EvalError::Undefined(name.to_string())),
        }
    }

    /// Drop all bindings, breaking closure reference cycles
    pub fn clear(env: &Env) {
        env.borrow_mut().vars.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shadowing_and_assignment() {
        let outer = Scope::root();
        Scope::declare(&outer, "size", Value::Number(1.0), true);
        Scope::declare(&outer, "base", Value::Number(2.0), false);
        let inner = Scope::child(&outer);
        Scope::declare(&inner, "size", Value::Number(3.0), true);

        assert!(matches!(Scope::lookup(&inner, "size"), Some(Value::Number(n)) if n == 3.0));
        Scope::assign(&inner, "size", Value::Number(4.0)).unwrap();
        assert!(matches!(Scope::lookup(&outer, "size"), Some(Value::Number(n)) if n == 1.0));
        assert_eq!(
            Scope::assign(&inner, "base", Value::Null),
            Err(EvalError::ConstAssign("base".into()))
        );
        assert_eq!(
            Scope::assign(&inner, "missing", Value::Null),
            Err(EvalError::Undefined("missing".into()))
        );
    }
}
