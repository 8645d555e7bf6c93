use super::{
    callable::Callable, environment::Environment, instance::Instance, signal::Signal, Completion,
    Ctx, EnvironmentRef, Interpreter, RuntimeValue,
};
use crate::{ast, keywords::THIS, side_table::UniqueId};
use std::{
    fmt::{Debug, Display},
    io::Write,
    rc::Rc,
};

/// A user function: shared declaration plus the environment captured where
/// the function value was produced. Binding a method layers one more
/// environment, holding `this`, on top of that closure.
#[derive(Clone)]
pub struct Function(Rc<FunctionImpl>);

struct FunctionImpl {
    id: UniqueId,
    fun: Rc<ast::Fun>,
    closure: EnvironmentRef,
    ctx: Ctx,
    is_initializer: bool,
}

impl Function {
    pub fn new(fun: Rc<ast::Fun>, closure: EnvironmentRef, ctx: Ctx, is_initializer: bool) -> Self {
        Self(Rc::new(FunctionImpl {
            id: UniqueId::new(),
            fun,
            closure,
            ctx,
            is_initializer,
        }))
    }

    pub fn name(&self) -> Option<&str> {
        self.0.fun.name.as_ref().map(|name| name.name.as_str())
    }

    pub fn bind(&self, instance: Instance) -> Function {
        let mut env = Environment::new_with_parent(self.0.closure.clone());
        env.define(THIS, RuntimeValue::Instance(instance));
        Function::new(
            self.0.fun.clone(),
            env.wrap(),
            self.0.ctx.clone(),
            self.0.is_initializer,
        )
    }
}

impl Callable for Function {
    fn arity(&self) -> usize {
        self.0.fun.parameters.len()
    }

    fn call<W: Write>(
        &self,
        interpreter: &mut Interpreter<W>,
        args: &[RuntimeValue],
    ) -> Completion {
        let mut call_env = Environment::new_with_parent(self.0.closure.clone());
        for (parameter, value) in self.0.fun.parameters.iter().zip(args) {
            call_env.define(&parameter.name, value.clone());
        }

        let ctx = self.0.ctx.clone();
        let result = interpreter.run_with_env(call_env.wrap(), |interpreter| {
            for stmt in self.0.fun.body.iter() {
                interpreter.eval_decl_or_stmt(stmt, &ctx)?;
            }
            Ok(RuntimeValue::nil())
        });

        let return_value = match result {
            Ok(value) => value,
            Err(Signal::Return(value)) => value,
            Err(other) => return Err(other),
        };

        if self.0.is_initializer {
            // The resolver rejects `return <expr>` in initializers, so the
            // instance bound at `this` is always the result.
            Ok(self
                .0
                .closure
                .borrow()
                .get_local(THIS)
                .expect("initializers are called bound"))
        } else {
            Ok(return_value)
        }
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => write!(f, "<function {}>", name),
            None => f.write_str("<function>"),
        }
    }
}
impl Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}
impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}
