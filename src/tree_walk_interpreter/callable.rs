use super::{Completion, Interpreter, RuntimeValue};
use std::io::Write;

/// Anything a call expression can invoke: user functions, classes (invoking
/// one constructs an instance), and the built-ins. Arity is checked by the
/// caller before `call` runs.
pub trait Callable {
    fn arity(&self) -> usize;
    fn call<W: Write>(
        &self,
        interpreter: &mut Interpreter<W>,
        args: &[RuntimeValue],
    ) -> Completion;
}
