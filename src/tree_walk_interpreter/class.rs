use super::{
    callable::Callable, function::Function, instance::Instance, Completion, Interpreter,
    RuntimeValue,
};
use crate::{keywords::INIT, side_table::UniqueId};
use std::{
    cell::RefCell,
    collections::HashMap,
    fmt::{Debug, Display},
    io::Write,
    rc::Rc,
};

/// A class value. Carries the instance-method table and, because a class is
/// itself an object, a mutable static-field map of its own. Static methods
/// live in the field map as ordinary function values.
#[derive(Clone)]
pub struct Class(Rc<ClassImpl>);

struct ClassImpl {
    id: UniqueId,
    name: String,
    superclass: Option<Class>,
    methods: HashMap<String, Function>,
    fields: RefCell<HashMap<String, RuntimeValue>>,
}

impl Class {
    pub fn new(
        name: &str,
        superclass: Option<Class>,
        methods: HashMap<String, Function>,
        statics: HashMap<String, RuntimeValue>,
    ) -> Self {
        Self(Rc::new(ClassImpl {
            id: UniqueId::new(),
            name: name.to_string(),
            superclass,
            methods,
            fields: RefCell::new(statics),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Instance-method lookup, walking the superclass chain. The returned
    /// function is unbound.
    pub fn find_method(&self, name: &str) -> Option<Function> {
        self.0.methods.get(name).cloned().or_else(|| {
            self.0
                .superclass
                .as_ref()
                .and_then(|superclass| superclass.find_method(name))
        })
    }

    pub fn get_static(&self, name: &str) -> Option<RuntimeValue> {
        self.0.fields.borrow().get(name).cloned()
    }

    pub fn set_static(&self, name: &str, value: RuntimeValue) {
        self.0.fields.borrow_mut().insert(name.to_string(), value);
    }

    fn initializer(&self) -> Option<&Function> {
        self.0.methods.get(INIT)
    }
}

impl Callable for Class {
    fn arity(&self) -> usize {
        self.initializer().map_or(0, |initializer| initializer.arity())
    }

    fn call<W: Write>(
        &self,
        interpreter: &mut Interpreter<W>,
        args: &[RuntimeValue],
    ) -> Completion {
        let instance = Instance::new(self.clone());
        if let Some(initializer) = self.initializer() {
            initializer.bind(instance.clone()).call(interpreter, args)?;
        }
        Ok(RuntimeValue::Instance(instance))
    }
}

impl Display for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<class {}>", self.0.name)
    }
}
impl Debug for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}
impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}
