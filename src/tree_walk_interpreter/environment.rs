use super::RuntimeValue;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub type EnvironmentRef = Rc<RefCell<Environment>>;

/// One lexical scope's bindings, chained to the enclosing scope. The globals
/// environment is the only one without a parent. Resolved references read a
/// specific ancestor directly; only globals are looked up by name at the end
/// of the chain.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, RuntimeValue>,
    parent: Option<EnvironmentRef>,
}

impl Environment {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            parent: None,
        }
    }
    pub fn new_with_parent(parent: EnvironmentRef) -> Self {
        Environment {
            parent: Some(parent),
            ..Default::default()
        }
    }
    pub fn wrap(self) -> EnvironmentRef {
        Rc::new(RefCell::new(self))
    }
    /// Binding never fails: duplicate locals are rejected statically, and
    /// globals may be redefined freely.
    pub fn define(&mut self, name: &str, value: RuntimeValue) {
        self.values.insert(name.to_string(), value);
    }
    pub fn get_local(&self, name: &str) -> Option<RuntimeValue> {
        self.values.get(name).cloned()
    }
    pub fn assign_local(&mut self, name: &str, value: RuntimeValue) -> Option<RuntimeValue> {
        let target = self.values.get_mut(name)?;
        *target = value.clone();
        Some(value)
    }
    pub fn ancestor<T, F: FnOnce(&Self) -> T>(&self, depth: usize, cb: F) -> Option<T> {
        if depth == 0 {
            Some(cb(self))
        } else {
            self.parent
                .as_ref()
                .and_then(|parent| parent.borrow().ancestor(depth - 1, cb))
        }
    }
    pub fn ancestor_mut<T, F: FnOnce(&mut Self) -> T>(&mut self, depth: usize, cb: F) -> Option<T> {
        if depth == 0 {
            Some(cb(self))
        } else {
            self.parent
                .as_ref()
                .and_then(|parent| parent.borrow_mut().ancestor_mut(depth - 1, cb))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn define_then_get() {
        let mut env = Environment::new();
        env.define("a", RuntimeValue::number(1.0));
        assert_eq!(env.get_local("a"), Some(RuntimeValue::number(1.0)));
        assert_eq!(env.get_local("b"), None);
    }

    #[test]
    fn redefinition_replaces_the_binding() {
        let mut env = Environment::new();
        env.define("a", RuntimeValue::number(1.0));
        env.define("a", RuntimeValue::number(2.0));
        assert_eq!(env.get_local("a"), Some(RuntimeValue::number(2.0)));
    }

    #[test]
    fn assign_local_fails_on_missing_name() {
        let mut env = Environment::new();
        assert!(env.assign_local("ghost", RuntimeValue::nil()).is_none());
    }

    #[test]
    fn ancestor_walks_the_chain() {
        let globals = Environment::new().wrap();
        globals.borrow_mut().define("g", RuntimeValue::number(1.0));
        let middle = Environment::new_with_parent(globals).wrap();
        middle.borrow_mut().define("m", RuntimeValue::number(2.0));
        let inner = Environment::new_with_parent(middle).wrap();

        let inner_ref = inner.borrow();
        assert_eq!(
            inner_ref.ancestor(1, |env| env.get_local("m")),
            Some(Some(RuntimeValue::number(2.0)))
        );
        assert_eq!(
            inner_ref.ancestor(2, |env| env.get_local("g")),
            Some(Some(RuntimeValue::number(1.0)))
        );
        assert_eq!(inner_ref.ancestor(3, |_| ()), None);
    }

    #[test]
    fn mutation_through_one_handle_is_visible_through_another() {
        let shared = Environment::new().wrap();
        shared.borrow_mut().define("n", RuntimeValue::number(1.0));
        let other = shared.clone();
        other
            .borrow_mut()
            .assign_local("n", RuntimeValue::number(5.0));
        assert_eq!(
            shared.borrow().get_local("n"),
            Some(RuntimeValue::number(5.0))
        );
    }
}
