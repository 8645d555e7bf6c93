use super::{ValueDescriptor, ValueType};
use crate::{source::SourceSpan, source_reference::SourceReference};
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum RuntimeError {
    #[error("Operand must be {}, but found {}", .expected_type.fmt_a(), .actual_type.fmt_a())]
    OperandTypeError {
        expected_type: ValueDescriptor,
        actual_type: ValueType,
        #[label("{} was found here", .actual_type.fmt_a())]
        operand_loc: SourceSpan,
        operator: String,
        #[label("the '{operator}' operator expected {}", .expected_type.fmt_a())]
        operator_loc: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Operands must be two numbers or two strings.")]
    PlusOperandsError {
        left_type: ValueType,
        right_type: ValueType,
        #[label("{} was found here", .left_type.fmt_a())]
        left_loc: SourceSpan,
        #[label("{} was found here", .right_type.fmt_a())]
        right_loc: SourceSpan,
        #[label("'+' takes two numbers, or strings to concatenate")]
        operator_loc: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Undefined variable '{name}'.")]
    UndefinedVariable {
        name: String,
        #[label("found here")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Object is not callable.")]
    UncallableValue {
        actual_type: ValueType,
        #[label("Attempted to call {} here", .actual_type.fmt_a())]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Expected {expected_arity} argument(s), got {actual_arity}.")]
    UnexpectedCallArity {
        expected_arity: usize,
        actual_arity: usize,
        #[label("On this call")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Only instances have properties.")]
    PropertyAccessOnNonInstance {
        actual_type: ValueType,
        property_name: String,
        #[label("Attempted to access '{property_name}' on {} here", .actual_type.fmt_a())]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Undefined property '{name}'.")]
    UndefinedProperty {
        name: String,
        #[label("This property is not defined")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Undefined static property '{name}'.")]
    UndefinedStaticProperty {
        name: String,
        #[label("This static property is not defined")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Superclass must be a class.")]
    SuperclassMustBeClass {
        actual_type: ValueType,
        #[label("{} is not a class", .actual_type.fmt_a())]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
}
