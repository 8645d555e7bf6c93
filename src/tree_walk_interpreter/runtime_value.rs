use super::{
    class::Class, function::Function, instance::Instance, native::NativeFunction, RuntimeError,
};
use crate::ast;
use itertools::Itertools;
use std::{
    fmt::{Debug, Display},
    rc::Rc,
};

/// The closed set of values an Ivy program can produce. Strings are shared
/// behind `Rc`; functions, classes, and instances are handles compared by
/// identity.
#[derive(PartialEq, Clone)]
pub enum RuntimeValue {
    String(Rc<String>),
    Number(f64),
    Boolean(bool),
    Native(NativeFunction),
    Function(Function),
    Class(Class),
    Instance(Instance),
    Nil,
}

impl Debug for RuntimeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(string) => {
                f.write_str("\"")?;
                f.write_str(string.replace('\n', "\\n").replace('\"', "\\\"").as_str())?;
                f.write_str("\"")
            }
            Self::Number(n) => write!(f, "{}", n),
            Self::Boolean(b) => match b {
                true => f.write_str("true"),
                false => f.write_str("false"),
            },
            Self::Native(value) => Debug::fmt(value, f),
            Self::Function(value) => Debug::fmt(value, f),
            Self::Class(value) => Debug::fmt(value, f),
            Self::Instance(value) => Debug::fmt(value, f),
            Self::Nil => f.write_str("nil"),
        }
    }
}

// User-visible formatting. Numbers rely on the host's shortest-form
// rendering, which already drops the decimal point for exact integers.
impl Display for RuntimeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(string) => f.write_str(string),
            Self::Number(n) => write!(f, "{}", n),
            Self::Boolean(b) => match b {
                true => f.write_str("true"),
                false => f.write_str("false"),
            },
            Self::Native(value) => Display::fmt(value, f),
            Self::Function(value) => Display::fmt(value, f),
            Self::Class(value) => Display::fmt(value, f),
            Self::Instance(value) => Display::fmt(value, f),
            Self::Nil => f.write_str("nil"),
        }
    }
}

impl From<f64> for RuntimeValue {
    fn from(value: f64) -> Self {
        Self::number(value)
    }
}
impl From<bool> for RuntimeValue {
    fn from(value: bool) -> Self {
        Self::boolean(value)
    }
}
impl From<String> for RuntimeValue {
    fn from(value: String) -> Self {
        Self::string(value)
    }
}
impl From<&ast::LiteralValue> for RuntimeValue {
    fn from(value: &ast::LiteralValue) -> Self {
        use ast::LiteralValue::*;
        match value {
            String(value) => value.clone().into(),
            Number(value) => (*value).into(),
            Boolean(value) => (*value).into(),
            Nil => Self::nil(),
        }
    }
}
impl From<Function> for RuntimeValue {
    fn from(value: Function) -> Self {
        Self::Function(value)
    }
}
impl From<Class> for RuntimeValue {
    fn from(value: Class) -> Self {
        Self::Class(value)
    }
}
impl From<Instance> for RuntimeValue {
    fn from(value: Instance) -> Self {
        Self::Instance(value)
    }
}
impl From<NativeFunction> for RuntimeValue {
    fn from(value: NativeFunction) -> Self {
        Self::Native(value)
    }
}

impl RuntimeValue {
    pub fn nil() -> Self {
        RuntimeValue::Nil
    }
    pub fn number(value: f64) -> Self {
        RuntimeValue::Number(value)
    }
    pub fn boolean(value: bool) -> Self {
        RuntimeValue::Boolean(value)
    }
    pub fn string(value: String) -> Self {
        RuntimeValue::String(Rc::new(value))
    }
    pub fn type_of(&self) -> ValueType {
        match self {
            RuntimeValue::String(_) => ValueType::String,
            RuntimeValue::Number(_) => ValueType::Number,
            RuntimeValue::Boolean(_) => ValueType::Boolean,
            RuntimeValue::Native(_) => ValueType::Function,
            RuntimeValue::Function(_) => ValueType::Function,
            RuntimeValue::Class(_) => ValueType::Class,
            RuntimeValue::Instance(_) => ValueType::Instance,
            RuntimeValue::Nil => ValueType::Nil,
        }
    }
    pub fn cast_number<F: Fn(ValueDescriptor, ValueType) -> RuntimeError>(
        &self,
        make_error: F,
    ) -> Result<f64, RuntimeError> {
        match self {
            RuntimeValue::Number(value) => Ok(*value),
            other => Err(make_error(ValueType::Number.into(), other.type_of())),
        }
    }
    /// Truthiness: `nil` and `false` are falsy, everything else is truthy.
    pub fn cast_boolean(&self) -> bool {
        match self {
            RuntimeValue::Boolean(value) => *value,
            RuntimeValue::Nil => false,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ValueType {
    String,
    Number,
    Boolean,
    Nil,
    Function,
    Class,
    Instance,
}

impl Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ValueType::String => "string",
            ValueType::Number => "number",
            ValueType::Boolean => "boolean",
            ValueType::Nil => "nil",
            ValueType::Function => "function",
            ValueType::Class => "class",
            ValueType::Instance => "instance",
        })
    }
}

impl ValueType {
    pub fn fmt_a(&self) -> &str {
        match self {
            ValueType::String => "a string",
            ValueType::Number => "a number",
            ValueType::Boolean => "a boolean",
            ValueType::Nil => "nil",
            ValueType::Function => "a function",
            ValueType::Class => "a class",
            ValueType::Instance => "an instance",
        }
    }
}

/// The type, or set of types, an operator expected; feeds error messages.
#[derive(Debug)]
pub enum ValueDescriptor {
    Single(ValueType),
    AnyOf(Vec<ValueType>),
}
impl From<ValueType> for ValueDescriptor {
    fn from(value_type: ValueType) -> Self {
        ValueDescriptor::Single(value_type)
    }
}
impl ValueDescriptor {
    pub fn fmt_a(&self) -> String {
        match self {
            Self::Single(value_type) => value_type.fmt_a().to_string(),
            Self::AnyOf(types) => {
                Itertools::intersperse(types.iter().map(ValueType::fmt_a), " or ").collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn numbers_format_without_trailing_zero() {
        assert_eq!(RuntimeValue::number(3.0).to_string(), "3");
        assert_eq!(RuntimeValue::number(2.5).to_string(), "2.5");
        assert_eq!(RuntimeValue::number(-0.5).to_string(), "-0.5");
    }

    #[test]
    fn nil_and_booleans_format_as_keywords() {
        assert_eq!(RuntimeValue::nil().to_string(), "nil");
        assert_eq!(RuntimeValue::boolean(true).to_string(), "true");
        assert_eq!(RuntimeValue::boolean(false).to_string(), "false");
    }

    #[test]
    fn strings_format_unquoted() {
        assert_eq!(RuntimeValue::string("hi".to_string()).to_string(), "hi");
    }

    #[test]
    fn equality_is_by_value_within_a_type() {
        assert_eq!(RuntimeValue::number(1.0), RuntimeValue::number(1.0));
        assert_eq!(
            RuntimeValue::string("a".to_string()),
            RuntimeValue::string("a".to_string())
        );
        assert_eq!(RuntimeValue::nil(), RuntimeValue::nil());
    }

    #[test]
    fn equality_is_false_across_types() {
        assert_ne!(RuntimeValue::number(1.0), RuntimeValue::boolean(true));
        assert_ne!(RuntimeValue::nil(), RuntimeValue::boolean(false));
        assert_ne!(
            RuntimeValue::string("1".to_string()),
            RuntimeValue::number(1.0)
        );
    }

    #[test]
    fn truthiness() {
        assert!(!RuntimeValue::nil().cast_boolean());
        assert!(!RuntimeValue::boolean(false).cast_boolean());
        assert!(RuntimeValue::number(0.0).cast_boolean());
        assert!(RuntimeValue::string(String::new()).cast_boolean());
    }

    #[test]
    fn descriptor_lists_alternatives() {
        let descriptor = ValueDescriptor::AnyOf(vec![ValueType::Number, ValueType::String]);
        assert_eq!(descriptor.fmt_a(), "a number or a string");
    }
}
