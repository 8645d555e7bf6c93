use super::{RuntimeError, RuntimeValue};

/// The ways evaluation can stop short of producing a value. `Break` and
/// `Continue` are caught by the enclosing loop, `Return` by the function
/// call that is executing the body, and `Error` only at the top of
/// `interpret`. Carrying all four in the error channel lets `?` unwind the
/// evaluator without a dedicated catch at every statement.
#[derive(Debug)]
pub enum Signal {
    Break,
    Continue,
    Return(RuntimeValue),
    Error(RuntimeError),
}

pub type Completion<T = RuntimeValue> = Result<T, Signal>;

impl From<RuntimeError> for Signal {
    fn from(error: RuntimeError) -> Self {
        Signal::Error(error)
    }
}
