use super::{class::Class, RuntimeValue};
use crate::side_table::UniqueId;
use std::{
    cell::RefCell,
    collections::HashMap,
    fmt::{Debug, Display},
    rc::Rc,
};

/// An instance: a field map plus the class it was constructed from. Fields
/// shadow methods; method lookup binds `this` on the way out. Static fields
/// of the class are not visible through an instance.
#[derive(Clone)]
pub struct Instance(Rc<InstanceImpl>);

struct InstanceImpl {
    id: UniqueId,
    class: Class,
    fields: RefCell<HashMap<String, RuntimeValue>>,
}

impl Instance {
    pub fn new(class: Class) -> Self {
        Self(Rc::new(InstanceImpl {
            id: UniqueId::new(),
            class,
            fields: RefCell::new(HashMap::new()),
        }))
    }

    pub fn get(&self, name: &str) -> Option<RuntimeValue> {
        self.0.fields.borrow().get(name).cloned().or_else(|| {
            self.0
                .class
                .find_method(name)
                .map(|method| RuntimeValue::Function(method.bind(self.clone())))
        })
    }

    pub fn set(&self, name: &str, value: RuntimeValue) {
        self.0.fields.borrow_mut().insert(name.to_string(), value);
    }
}

impl Display for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{} instance>", self.0.class.name())
    }
}
impl Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}
impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}
