//! Lexically scoped name binding.
//!
//! An environment is a chain of frames. The bottom frame holds the built-ins,
//! the frame above it is the program's global scope, and every user function
//! call pushes one frame parented to the function's captured definition
//! environment. `if`/`while`/`for` bodies do not push frames.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::value::{Builtin, Value};

#[derive(Debug, Default)]
struct Frame {
    bindings: HashMap<String, Value>,
    parent: Option<Environment>,
}

#[derive(Debug, Clone)]
pub struct Environment(Rc<RefCell<Frame>>);

const BUILTINS: &[Builtin] = &[
    Builtin::Print,
    Builtin::Input,
    Builtin::Len,
    Builtin::Chr,
    Builtin::Ord,
    Builtin::Int,
    Builtin::Float,
    Builtin::Str,
    Builtin::Abs,
    Builtin::ReadFile,
    Builtin::ReadLines,
    Builtin::MapNew,
    Builtin::SetNew,
];

impl Environment {
    /// The global scope: a fresh frame on top of the built-ins frame.
    pub fn global() -> Self {
        let builtins = Environment(Rc::default());
        for builtin in BUILTINS {
            builtins.define(builtin.name(), Value::Builtin(*builtin));
        }

        builtins.child()
    }

    pub fn child(&self) -> Self {
        Environment(Rc::new(RefCell::new(Frame {
            bindings: HashMap::new(),
            parent: Some(self.clone()),
        })))
    }

    /// Read a name, walking the chain from innermost outward.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.0.borrow().bindings.get(name) {
            return Some(value.clone());
        }

        let parent = self.0.borrow().parent.clone();
        parent.and_then(|parent| parent.get(name))
    }

    /// Bind a name in this frame, shadowing any outer binding.
    pub fn define(&self, name: &str, value: Value) {
        self.0.borrow_mut().bindings.insert(name.to_owned(), value);
    }

    /// Write a name: update the nearest existing binding, or create one in
    /// this frame when the name is unbound everywhere.
    pub fn assign(&self, name: &str, value: Value) {
        if !self.update(name, &value) {
            self.define(name, value);
        }
    }

    fn update(&self, name: &str, value: &Value) -> bool {
        {
            let mut frame = self.0.borrow_mut();
            if frame.bindings.contains_key(name) {
                frame.bindings.insert(name.to_owned(), value.clone());
                return true;
            }
        }

        let parent = self.0.borrow().parent.clone();
        parent.is_some_and(|parent| parent.update(name, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_resolve_from_global() {
        let env = Environment::global();

        assert!(matches!(
            env.get("print"),
            Some(Value::Builtin(Builtin::Print))
        ));
        assert!(matches!(env.get("len"), Some(Value::Builtin(Builtin::Len))));
        assert!(env.get("no_such_name").is_none());
    }

    #[test]
    fn test_assign_creates_innermost() {
        let global = Environment::global();
        let inner = global.child();

        inner.assign("x", Value::Integer(1));

        assert!(inner.get("x").is_some());
        assert!(global.get("x").is_none());
    }

    #[test]
    fn test_assign_updates_existing_outer_binding() {
        let global = Environment::global();
        global.assign("x", Value::Integer(1));

        let inner = global.child();
        inner.assign("x", Value::Integer(2));

        assert_eq!(global.get("x"), Some(Value::Integer(2)));
    }

    #[test]
    fn test_define_shadows_outer_binding() {
        let global = Environment::global();
        global.assign("x", Value::Integer(1));

        let inner = global.child();
        inner.define("x", Value::Integer(2));

        assert_eq!(inner.get("x"), Some(Value::Integer(2)));
        assert_eq!(global.get("x"), Some(Value::Integer(1)));
    }

    #[test]
    fn test_read_walks_outward() {
        let global = Environment::global();
        global.assign("x", Value::Integer(42));

        let inner = global.child().child();

        assert_eq!(inner.get("x"), Some(Value::Integer(42)));
    }
}
