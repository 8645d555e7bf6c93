use super::{callable::Callable, Completion, Interpreter, RuntimeValue};
use crate::side_table::UniqueId;
use std::{
    fmt::{Debug, Display},
    io::Write,
    rc::Rc,
    time::SystemTime,
};

#[derive(Debug, Clone, Copy)]
pub enum NativeKind {
    Clock,
    Input,
    Print,
    Println,
}

/// A built-in function. The host implementations need the interpreter's
/// output handle, so dispatch happens here rather than through bare
/// function pointers.
#[derive(Clone)]
pub struct NativeFunction(Rc<NativeFunctionImpl>);

struct NativeFunctionImpl {
    id: UniqueId,
    name: &'static str,
    arity: usize,
    kind: NativeKind,
}

impl NativeFunction {
    pub fn new(name: &'static str, arity: usize, kind: NativeKind) -> Self {
        Self(Rc::new(NativeFunctionImpl {
            id: UniqueId::new(),
            name,
            arity,
            kind,
        }))
    }
}

impl Callable for NativeFunction {
    fn arity(&self) -> usize {
        self.0.arity
    }

    fn call<W: Write>(
        &self,
        interpreter: &mut Interpreter<W>,
        args: &[RuntimeValue],
    ) -> Completion {
        match self.0.kind {
            NativeKind::Clock => Ok(RuntimeValue::number(
                SystemTime::now()
                    .duration_since(SystemTime::UNIX_EPOCH)
                    .unwrap()
                    .as_secs_f64(),
            )),
            NativeKind::Input => {
                let mut line = String::new();
                match std::io::stdin().read_line(&mut line) {
                    // 0 bytes read means end of input
                    Ok(0) => Ok(RuntimeValue::nil()),
                    Ok(_) => {
                        if line.ends_with('\n') {
                            line.pop();
                            if line.ends_with('\r') {
                                line.pop();
                            }
                        }
                        Ok(RuntimeValue::string(line))
                    }
                    Err(_) => {
                        // Reported, not fatal: the call produces nil and
                        // evaluation continues.
                        eprintln!("An input error occured.");
                        Ok(RuntimeValue::nil())
                    }
                }
            }
            NativeKind::Print => {
                write!(interpreter.stdout, "{}", args[0]).unwrap();
                Ok(RuntimeValue::nil())
            }
            NativeKind::Println => {
                writeln!(interpreter.stdout, "{}", args[0]).unwrap();
                Ok(RuntimeValue::nil())
            }
        }
    }
}

impl Display for NativeFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<builtin fn {}>", self.0.name)
    }
}
impl Debug for NativeFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}
impl PartialEq for NativeFunction {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}
