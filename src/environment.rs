use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::LoxideError;
use crate::token::Span;
use crate::value::Value;

/// One level of name bindings. Environments chain through `enclosing`, and
/// closures keep whole chains alive past the call that created them, which
/// is why the links are `Rc<RefCell<_>>` rather than plain ownership.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Self {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Insert or overwrite in this scope. Always succeeds; shadows any
    /// outer binding of the same name.
    pub fn define(&mut self, name: String, value: Value) {
        self.values.insert(name, value);
    }

    pub fn get(&self, name: &str, span: Span) -> Result<Value, LoxideError> {
        if let Some(value) = self.values.get(name) {
            return Ok(value.clone());
        }

        if let Some(enclosing) = &self.enclosing {
            return enclosing.borrow().get(name, span);
        }

        Err(LoxideError::Runtime {
            message: format!("Undefined variable '{}'.", name),
            span,
        })
    }

    pub fn assign(&mut self, name: &str, value: Value, span: Span) -> Result<(), LoxideError> {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
            return Ok(());
        }

        if let Some(enclosing) = &self.enclosing {
            return enclosing.borrow_mut().assign(name, value, span);
        }

        Err(LoxideError::Runtime {
            message: format!("Undefined variable '{}'.", name),
            span,
        })
    }

    /// Read a binding exactly `distance` scopes up, without searching.
    /// `None` means the resolver and interpreter disagree about scope
    /// layout, which the caller reports as an undefined variable.
    pub fn get_at(&self, distance: usize, name: &str) -> Option<Value> {
        if distance == 0 {
            self.values.get(name).cloned()
        } else {
            self.enclosing
                .as_ref()
                .and_then(|enc| enc.borrow().get_at(distance - 1, name))
        }
    }

    /// Write a binding exactly `distance` scopes up, without searching.
    pub fn assign_at(&mut self, distance: usize, name: &str, value: Value) {
        if distance == 0 {
            self.values.insert(name.to_string(), value);
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign_at(distance - 1, name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Literal;

    fn num(n: f64) -> Value {
        Value::Literal(Literal::Number(n))
    }

    fn str_value(s: &str) -> Value {
        Value::Literal(Literal::String(s.to_string()))
    }

    #[test]
    fn define_and_get_variable() {
        let mut env = Environment::new();
        env.define("x".to_string(), num(42.0));
        let result = env.get("x", 0..1).unwrap();
        assert_eq!(result, num(42.0));
    }

    #[test]
    fn get_undefined_variable_returns_error() {
        let env = Environment::new();
        let result = env.get("x", 0..1);
        assert!(matches!(result, Err(LoxideError::Runtime { .. })));
    }

    #[test]
    fn redefining_overwrites_in_place() {
        let mut env = Environment::new();
        env.define("x".to_string(), num(1.0));
        env.define("x".to_string(), str_value("later"));
        assert_eq!(env.get("x", 0..1).unwrap(), str_value("later"));
    }

    #[test]
    fn assign_updates_existing_variable() {
        let mut env = Environment::new();
        env.define("x".to_string(), num(1.0));
        env.assign("x", num(42.0), 0..1).unwrap();
        assert_eq!(env.get("x", 0..1).unwrap(), num(42.0));
    }

    #[test]
    fn assign_undefined_variable_returns_error() {
        let mut env = Environment::new();
        let result = env.assign("x", num(42.0), 0..1);
        assert!(matches!(result, Err(LoxideError::Runtime { .. })));
    }

    // === enclosing scope tests ===

    #[test]
    fn get_from_enclosing_scope() {
        let outer = Rc::new(RefCell::new(Environment::new()));
        outer.borrow_mut().define("x".to_string(), num(42.0));

        let inner = Environment::with_enclosing(Rc::clone(&outer));
        assert_eq!(inner.get("x", 0..1).unwrap(), num(42.0));
    }

    #[test]
    fn inner_shadows_outer() {
        let outer = Rc::new(RefCell::new(Environment::new()));
        outer.borrow_mut().define("x".to_string(), num(1.0));

        let mut inner = Environment::with_enclosing(Rc::clone(&outer));
        inner.define("x".to_string(), num(99.0));

        assert_eq!(inner.get("x", 0..1).unwrap(), num(99.0));
        assert_eq!(outer.borrow().get("x", 0..1).unwrap(), num(1.0));
    }

    #[test]
    fn assign_updates_enclosing_scope() {
        let outer = Rc::new(RefCell::new(Environment::new()));
        outer.borrow_mut().define("x".to_string(), num(1.0));

        let mut inner = Environment::with_enclosing(Rc::clone(&outer));
        inner.assign("x", num(42.0), 0..1).unwrap();

        assert_eq!(outer.borrow().get("x", 0..1).unwrap(), num(42.0));
    }

    #[test]
    fn get_searches_through_multiple_levels() {
        let root = Rc::new(RefCell::new(Environment::new()));
        root.borrow_mut().define("x".to_string(), num(7.0));
        let middle = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(&root))));
        let leaf = Environment::with_enclosing(Rc::clone(&middle));

        assert_eq!(leaf.get("x", 0..1).unwrap(), num(7.0));
    }

    // === distance-indexed access ===

    #[test]
    fn get_at_distance_0_reads_local() {
        let mut env = Environment::new();
        env.define("x".to_string(), num(42.0));
        assert_eq!(env.get_at(0, "x"), Some(num(42.0)));
    }

    #[test]
    fn get_at_distance_1_reads_enclosing() {
        let outer = Rc::new(RefCell::new(Environment::new()));
        outer.borrow_mut().define("x".to_string(), num(42.0));

        let inner = Environment::with_enclosing(Rc::clone(&outer));
        assert_eq!(inner.get_at(1, "x"), Some(num(42.0)));
    }

    #[test]
    fn get_at_does_not_search_past_the_target_scope() {
        let outer = Rc::new(RefCell::new(Environment::new()));
        outer.borrow_mut().define("x".to_string(), num(1.0));

        let inner = Environment::with_enclosing(Rc::clone(&outer));
        // x lives one level up; at distance 0 it must not be found.
        assert_eq!(inner.get_at(0, "x"), None);
    }

    #[test]
    fn get_at_skips_shadowing_bindings_below_the_target() {
        let outer = Rc::new(RefCell::new(Environment::new()));
        outer.borrow_mut().define("x".to_string(), num(1.0));

        let mut inner = Environment::with_enclosing(Rc::clone(&outer));
        inner.define("x".to_string(), num(99.0));

        // Distance 1 reads the outer binding even though a local shadows it.
        assert_eq!(inner.get_at(1, "x"), Some(num(1.0)));
    }

    #[test]
    fn assign_at_distance_0_updates_local() {
        let mut env = Environment::new();
        env.define("x".to_string(), num(1.0));
        env.assign_at(0, "x", num(42.0));
        assert_eq!(env.get_at(0, "x"), Some(num(42.0)));
    }

    #[test]
    fn assign_at_distance_1_updates_enclosing_past_shadow() {
        let outer = Rc::new(RefCell::new(Environment::new()));
        outer.borrow_mut().define("x".to_string(), num(1.0));

        let mut inner = Environment::with_enclosing(Rc::clone(&outer));
        inner.define("x".to_string(), num(0.0));
        inner.assign_at(1, "x", num(42.0));

        assert_eq!(outer.borrow().get_at(0, "x"), Some(num(42.0)));
        // The shadowing local is untouched.
        assert_eq!(inner.get_at(0, "x"), Some(num(0.0)));
    }
}
