mod callable;
mod class;
mod environment;
mod error;
mod function;
mod instance;
mod native;
mod runtime_value;
mod signal;

use crate::{
    ast::*,
    keywords::{INIT, SUPER, THIS},
    resolver::{Resolutions, Resolver, ResolverError},
    side_table::UniqueId,
    source::SourceSpan,
    source_reference::SourceReference,
};
use callable::Callable;
use class::Class;
use environment::{Environment, EnvironmentRef};
pub use error::RuntimeError;
use function::Function;
use log::debug;
use native::{NativeFunction, NativeKind};
pub use runtime_value::{RuntimeValue, ValueDescriptor, ValueType};
pub use signal::{Completion, Signal};
use std::{collections::HashMap, io::Write, mem};

/// Per-program evaluation context threaded through the tree walk, so
/// runtime errors raised from any depth can render their source line.
#[derive(Debug, Clone)]
pub struct Ctx {
    source_code: SourceReference,
}

/// The tree-walking evaluator. Owns the globals environment (pre-loaded
/// with the built-ins) and the resolution side table produced by `prepare`.
pub struct Interpreter<'out, Stdout: Write> {
    environment: EnvironmentRef,
    globals: EnvironmentRef,
    stdout: &'out mut Stdout,
    resolutions: Resolutions,
    id: UniqueId,
}

/// A program that has been resolved against a specific interpreter's side
/// table. The pairing is enforced so hop counts are never replayed against
/// the wrong table.
pub struct PreparedProgram(UniqueId, Program);

impl<'out, Stdout: Write> Interpreter<'out, Stdout> {
    pub fn new(stdout: &'out mut Stdout) -> Self {
        let globals = Environment::new().wrap();
        let mut interpreter = Self {
            environment: globals.clone(),
            globals,
            stdout,
            resolutions: Resolutions::new(),
            id: UniqueId::new(),
        };
        interpreter.define_native("clock", 0, NativeKind::Clock);
        interpreter.define_native("input", 0, NativeKind::Input);
        interpreter.define_native("print", 1, NativeKind::Print);
        interpreter.define_native("println", 1, NativeKind::Println);
        interpreter
    }

    /// Run the static analysis pass. Errors here mark the program
    /// unrunnable; on success the hop counts live in this interpreter.
    pub fn prepare(&mut self, program: Program) -> Result<PreparedProgram, Vec<ResolverError>> {
        Resolver::resolve(&program, &mut self.resolutions)?;
        Ok(PreparedProgram(self.id, program))
    }

    pub fn interpret(&mut self, program: &PreparedProgram) -> Result<RuntimeValue, RuntimeError> {
        assert_eq!(
            program.0, self.id,
            "program was prepared against a different interpreter"
        );
        debug!("interpreting {} statements", program.1.statements.len());
        let ctx = Ctx {
            source_code: program.1.source_reference.clone(),
        };
        let result =
            try_for_each_and_return_last(&program.1.statements, RuntimeValue::nil(), |stmt| {
                self.eval_decl_or_stmt(stmt, &ctx)
            });
        match result {
            Ok(value) | Err(Signal::Return(value)) => Ok(value),
            // Stray loop signals cannot reach here in resolved programs.
            Err(Signal::Break) | Err(Signal::Continue) => Ok(RuntimeValue::nil()),
            Err(Signal::Error(error)) => Err(error),
        }
    }

    fn eval_decl_or_stmt(&mut self, decl_or_stmt: &DeclOrStmt, ctx: &Ctx) -> Completion {
        match decl_or_stmt {
            DeclOrStmt::Decl(decl) => self.eval_decl(decl, ctx),
            DeclOrStmt::Stmt(stmt) => self.eval_stmt(stmt, ctx),
        }
    }

    fn eval_decl(&mut self, decl: &Decl, ctx: &Ctx) -> Completion {
        match decl {
            Decl::Var(decl) => {
                for item in decl.items.iter() {
                    // The initializer runs before the name is bound, so it
                    // can never observe the variable it initializes.
                    let value = item
                        .initializer
                        .as_ref()
                        .map(|expr| self.eval_expr(expr, ctx))
                        .transpose()?
                        .unwrap_or_else(RuntimeValue::nil);
                    self.environment
                        .borrow_mut()
                        .define(&item.identifier.name, value);
                }
                Ok(RuntimeValue::nil())
            }
            Decl::Fun(decl) => {
                let name = &decl.fun.name.as_ref().expect("declared functions are named").name;
                let function = Function::new(
                    decl.fun.clone(),
                    self.environment.clone(),
                    ctx.clone(),
                    false,
                );
                self.environment
                    .borrow_mut()
                    .define(name, RuntimeValue::Function(function));
                Ok(RuntimeValue::nil())
            }
            Decl::Class(decl) => self.eval_class_decl(decl, ctx),
        }
    }

    fn eval_class_decl(&mut self, decl: &ClassDecl, ctx: &Ctx) -> Completion {
        // Bind the name first so methods may refer to the class.
        self.environment
            .borrow_mut()
            .define(&decl.name.name, RuntimeValue::nil());

        let superclass = match &decl.superclass {
            Some(superclass_expr) => {
                match self.eval_variable(&superclass_expr.identifier, ctx)? {
                    RuntimeValue::Class(class) => Some(class),
                    other => {
                        return Err(RuntimeError::SuperclassMustBeClass {
                            actual_type: other.type_of(),
                            found_at: superclass_expr.source_span(),
                            source_code: ctx.source_code.clone(),
                        }
                        .into())
                    }
                }
            }
            None => None,
        };

        // Subclasses get one extra closure layer holding `super`; methods
        // capture it, matching the scope the resolver pushed.
        let method_closure = match &superclass {
            Some(class) => {
                let env = Environment::new_with_parent(self.environment.clone()).wrap();
                env.borrow_mut()
                    .define(SUPER, RuntimeValue::Class(class.clone()));
                env
            }
            None => self.environment.clone(),
        };

        let mut methods = HashMap::new();
        let mut statics = HashMap::new();
        for method in decl.methods.iter() {
            let name = method
                .fun
                .name
                .as_ref()
                .expect("methods are named")
                .name
                .clone();
            let function = Function::new(
                method.fun.clone(),
                method_closure.clone(),
                ctx.clone(),
                name == INIT,
            );
            if method.is_static {
                statics.insert(name, RuntimeValue::Function(function));
            } else {
                methods.insert(name, function);
            }
        }

        let class = Class::new(&decl.name.name, superclass, methods, statics);
        self.environment
            .borrow_mut()
            .assign_local(&decl.name.name, RuntimeValue::Class(class))
            .expect("class name was bound above");
        Ok(RuntimeValue::nil())
    }

    fn eval_stmt(&mut self, stmt: &Stmt, ctx: &Ctx) -> Completion {
        match stmt {
            Stmt::Expr(stmt) => self.eval_expr(&stmt.expression, ctx),
            Stmt::Block(stmt) => self.run_with_env(
                Environment::new_with_parent(self.environment.clone()).wrap(),
                |this| {
                    try_for_each_and_return_last(&stmt.statements, RuntimeValue::nil(), |stmt| {
                        this.eval_decl_or_stmt(stmt, ctx)
                    })
                },
            ),
            Stmt::If(stmt) => {
                if self.eval_expr(&stmt.condition, ctx)?.cast_boolean() {
                    self.eval_stmt(&stmt.then_branch, ctx)?;
                } else if let Some(else_branch) = &stmt.else_branch {
                    self.eval_stmt(else_branch, ctx)?;
                }
                Ok(RuntimeValue::nil())
            }
            Stmt::While(stmt) => {
                while self.eval_expr(&stmt.condition, ctx)?.cast_boolean() {
                    match self.eval_stmt(&stmt.body, ctx) {
                        Ok(_) => {}
                        Err(Signal::Break) => break,
                        Err(Signal::Continue) => continue,
                        Err(other) => return Err(other),
                    }
                }
                Ok(RuntimeValue::nil())
            }
            Stmt::For(stmt) => self.run_with_env(
                Environment::new_with_parent(self.environment.clone()).wrap(),
                |this| {
                    if let Some(initializer) = &stmt.initializer {
                        this.eval_decl_or_stmt(initializer, ctx)?;
                    }
                    while this.eval_expr(&stmt.condition, ctx)?.cast_boolean() {
                        match this.eval_stmt(&stmt.body, ctx) {
                            // The increment runs after `continue`, but a
                            // `break` skips it.
                            Ok(_) | Err(Signal::Continue) => {}
                            Err(Signal::Break) => break,
                            Err(other) => return Err(other),
                        }
                        if let Some(increment) = &stmt.increment {
                            this.eval_expr(increment, ctx)?;
                        }
                    }
                    Ok(RuntimeValue::nil())
                },
            ),
            Stmt::Break(_) => Err(Signal::Break),
            Stmt::Continue(_) => Err(Signal::Continue),
            Stmt::Return(stmt) => {
                let value = match &stmt.value {
                    Some(expression) => self.eval_expr(expression, ctx)?,
                    None => RuntimeValue::nil(),
                };
                Err(Signal::Return(value))
            }
        }
    }

    fn eval_expr(&mut self, expr: &Expr, ctx: &Ctx) -> Completion {
        match expr {
            Expr::Literal(LiteralExpr { value, .. }) => Ok(value.into()),
            Expr::Grouping(GroupingExpr { expr }) => self.eval_expr(expr, ctx),
            Expr::Variable(VariableExpr { identifier }) => self.eval_variable(identifier, ctx),
            Expr::Unary(UnaryExpr { operator, right }) => {
                let right_val = self.eval_expr(right, ctx)?;
                Ok(match operator.inner() {
                    UnaryOperator::Minus => (-right_val.cast_number(|expected, actual| {
                        RuntimeError::OperandTypeError {
                            expected_type: expected,
                            actual_type: actual,
                            operand_loc: right.source_span(),
                            operator: operator.inner().to_string(),
                            operator_loc: operator.source_span(),
                            source_code: ctx.source_code.clone(),
                        }
                    })?)
                    .into(),
                    UnaryOperator::Not => (!right_val.cast_boolean()).into(),
                })
            }
            Expr::Binary(expr) => self.eval_binary(expr, ctx),
            Expr::Logical(LogicalExpr {
                left,
                operator,
                right,
            }) => {
                let left_val = self.eval_expr(left, ctx)?;
                match operator.inner() {
                    LogicalOperator::Or if left_val.cast_boolean() => Ok(left_val),
                    LogicalOperator::And if !left_val.cast_boolean() => Ok(left_val),
                    _ => self.eval_expr(right, ctx),
                }
            }
            Expr::Ternary(TernaryExpr {
                condition,
                then_branch,
                else_branch,
                ..
            }) => {
                if self.eval_expr(condition, ctx)?.cast_boolean() {
                    self.eval_expr(then_branch, ctx)
                } else {
                    self.eval_expr(else_branch, ctx)
                }
            }
            Expr::Assign(AssignExpr { target, value }) => {
                let value = self.eval_expr(value, ctx)?;
                self.lookup_identifier_mut(target, |environment| {
                    environment.assign_local(&target.name, value.clone())
                })
                .ok_or_else(|| {
                    Signal::from(RuntimeError::UndefinedVariable {
                        name: target.name.clone(),
                        found_at: target.source_span(),
                        source_code: ctx.source_code.clone(),
                    })
                })
            }
            Expr::Call(call_expr) => {
                let span = call_expr.source_span();
                match self.eval_expr(&call_expr.callee, ctx)? {
                    RuntimeValue::Native(native) => {
                        self.eval_call(span, &native, &call_expr.arguments, ctx)
                    }
                    RuntimeValue::Function(function) => {
                        self.eval_call(span, &function, &call_expr.arguments, ctx)
                    }
                    RuntimeValue::Class(class) => {
                        self.eval_call(span, &class, &call_expr.arguments, ctx)
                    }
                    other => Err(RuntimeError::UncallableValue {
                        actual_type: other.type_of(),
                        found_at: span,
                        source_code: ctx.source_code.clone(),
                    }
                    .into()),
                }
            }
            Expr::Get(get_expr) => match self.eval_expr(&get_expr.object, ctx)? {
                RuntimeValue::Instance(instance) => {
                    instance.get(&get_expr.name.name).ok_or_else(|| {
                        Signal::from(RuntimeError::UndefinedProperty {
                            name: get_expr.name.name.clone(),
                            found_at: get_expr.name.source_span(),
                            source_code: ctx.source_code.clone(),
                        })
                    })
                }
                RuntimeValue::Class(class) => {
                    class.get_static(&get_expr.name.name).ok_or_else(|| {
                        Signal::from(RuntimeError::UndefinedStaticProperty {
                            name: get_expr.name.name.clone(),
                            found_at: get_expr.name.source_span(),
                            source_code: ctx.source_code.clone(),
                        })
                    })
                }
                other => Err(RuntimeError::PropertyAccessOnNonInstance {
                    actual_type: other.type_of(),
                    property_name: get_expr.name.name.clone(),
                    found_at: get_expr.name.source_span(),
                    source_code: ctx.source_code.clone(),
                }
                .into()),
            },
            Expr::Set(set_expr) => match self.eval_expr(&set_expr.object, ctx)? {
                RuntimeValue::Instance(instance) => {
                    let value = self.eval_expr(&set_expr.value, ctx)?;
                    instance.set(&set_expr.name.name, value.clone());
                    Ok(value)
                }
                RuntimeValue::Class(class) => {
                    let value = self.eval_expr(&set_expr.value, ctx)?;
                    class.set_static(&set_expr.name.name, value.clone());
                    Ok(value)
                }
                other => Err(RuntimeError::PropertyAccessOnNonInstance {
                    actual_type: other.type_of(),
                    property_name: set_expr.name.name.clone(),
                    found_at: set_expr.name.source_span(),
                    source_code: ctx.source_code.clone(),
                }
                .into()),
            },
            Expr::This(this_expr) => Ok(self.lookup_identifier(&this_expr.keyword, |environment| {
                environment
                    .get_local(THIS)
                    .expect("'this' is defined wherever the resolver allowed it")
            })),
            Expr::Super(super_expr) => self.eval_super(super_expr, ctx),
            Expr::Function(function_expr) => Ok(RuntimeValue::Function(Function::new(
                function_expr.fun.clone(),
                self.environment.clone(),
                ctx.clone(),
                false,
            ))),
        }
    }

    fn eval_binary(&mut self, expr: &BinaryExpr, ctx: &Ctx) -> Completion {
        let BinaryExpr {
            left,
            operator,
            right,
        } = expr;
        let left_val = self.eval_expr(left, ctx)?;
        let right_val = self.eval_expr(right, ctx)?;

        let make_left_err =
            |expected: ValueDescriptor, actual: ValueType| RuntimeError::OperandTypeError {
                expected_type: expected,
                actual_type: actual,
                operand_loc: left.source_span(),
                operator: operator.inner().to_string(),
                operator_loc: operator.source_span(),
                source_code: ctx.source_code.clone(),
            };
        let make_right_err =
            |expected: ValueDescriptor, actual: ValueType| RuntimeError::OperandTypeError {
                expected_type: expected,
                actual_type: actual,
                operand_loc: right.source_span(),
                operator: operator.inner().to_string(),
                operator_loc: operator.source_span(),
                source_code: ctx.source_code.clone(),
            };

        Ok(match operator.inner() {
            BinaryOperator::Plus => match (&left_val, &right_val) {
                (RuntimeValue::Number(left_num), RuntimeValue::Number(right_num)) => {
                    (left_num + right_num).into()
                }
                (RuntimeValue::String(left_str), RuntimeValue::String(right_str)) => {
                    let mut joined = String::with_capacity(left_str.len() + right_str.len());
                    joined.push_str(left_str);
                    joined.push_str(right_str);
                    joined.into()
                }
                // A string on either side concatenates with the other
                // operand's printed form; numbers format per the usual rule.
                (RuntimeValue::String(_), _) | (_, RuntimeValue::String(_)) => {
                    format!("{}{}", left_val, right_val).into()
                }
                _ => {
                    return Err(RuntimeError::PlusOperandsError {
                        left_type: left_val.type_of(),
                        right_type: right_val.type_of(),
                        left_loc: left.source_span(),
                        right_loc: right.source_span(),
                        operator_loc: operator.source_span(),
                        source_code: ctx.source_code.clone(),
                    }
                    .into())
                }
            },
            BinaryOperator::Minus => (left_val.cast_number(&make_left_err)?
                - right_val.cast_number(&make_right_err)?)
            .into(),
            BinaryOperator::Multiply => (left_val.cast_number(&make_left_err)?
                * right_val.cast_number(&make_right_err)?)
            .into(),
            // Division by zero follows IEEE-754: infinities and NaN, not
            // errors.
            BinaryOperator::Divide => (left_val.cast_number(&make_left_err)?
                / right_val.cast_number(&make_right_err)?)
            .into(),
            BinaryOperator::NotEqualTo => (left_val != right_val).into(),
            BinaryOperator::EqualTo => (left_val == right_val).into(),
            BinaryOperator::LessThan => (left_val.cast_number(&make_left_err)?
                < right_val.cast_number(&make_right_err)?)
            .into(),
            BinaryOperator::LessThanOrEqualTo => (left_val.cast_number(&make_left_err)?
                <= right_val.cast_number(&make_right_err)?)
            .into(),
            BinaryOperator::GreaterThan => (left_val.cast_number(&make_left_err)?
                > right_val.cast_number(&make_right_err)?)
            .into(),
            BinaryOperator::GreaterThanOrEqualTo => (left_val.cast_number(&make_left_err)?
                >= right_val.cast_number(&make_right_err)?)
            .into(),
        })
    }

    fn eval_super(&mut self, super_expr: &SuperExpr, ctx: &Ctx) -> Completion {
        let distance = *self
            .resolutions
            .get(&super_expr.keyword)
            .expect("'super' is resolved wherever the resolver allowed it");

        let superclass = self
            .environment
            .borrow()
            .ancestor(distance, |environment| environment.get_local(SUPER))
            .flatten()
            .expect("'super' scope exists at the resolved distance");
        let superclass = match superclass {
            RuntimeValue::Class(class) => class,
            other => panic!("'super' resolved to {}, not a class", other.type_of()),
        };

        // The instance sits one environment closer than the superclass: the
        // scope pushed when the enclosing method was bound.
        let instance = self
            .environment
            .borrow()
            .ancestor(distance - 1, |environment| environment.get_local(THIS))
            .flatten()
            .expect("'this' scope exists inside the 'super' scope");
        let instance = match instance {
            RuntimeValue::Instance(instance) => instance,
            other => panic!("'this' resolved to {}, not an instance", other.type_of()),
        };

        let method = superclass
            .find_method(&super_expr.method.name)
            .ok_or_else(|| RuntimeError::UndefinedProperty {
                name: super_expr.method.name.clone(),
                found_at: super_expr.method.source_span(),
                source_code: ctx.source_code.clone(),
            })?;

        Ok(RuntimeValue::Function(method.bind(instance)))
    }

    fn eval_variable(&mut self, identifier: &Identifier, ctx: &Ctx) -> Completion {
        self.lookup_identifier(identifier, |environment| {
            environment.get_local(&identifier.name)
        })
        .ok_or_else(|| {
            Signal::from(RuntimeError::UndefinedVariable {
                name: identifier.name.clone(),
                found_at: identifier.source_span(),
                source_code: ctx.source_code.clone(),
            })
        })
    }

    fn eval_call<C: Callable>(
        &mut self,
        callable_source_span: SourceSpan,
        callable: &C,
        arguments: &[Expr],
        ctx: &Ctx,
    ) -> Completion {
        let argument_vals = arguments
            .iter()
            .map(|arg| self.eval_expr(arg, ctx))
            .collect::<Result<Vec<_>, _>>()?;

        if argument_vals.len() != callable.arity() {
            Err(RuntimeError::UnexpectedCallArity {
                expected_arity: callable.arity(),
                actual_arity: argument_vals.len(),
                found_at: callable_source_span,
                source_code: ctx.source_code.clone(),
            }
            .into())
        } else {
            callable.call(self, &argument_vals)
        }
    }

    /// Resolved references read the recorded ancestor directly; everything
    /// else is a global access.
    fn lookup_identifier<T>(
        &self,
        identifier: &Identifier,
        cb: impl FnOnce(&Environment) -> T,
    ) -> T {
        match self.resolutions.get(identifier) {
            Some(distance) => self
                .environment
                .borrow()
                .ancestor(*distance, cb)
                .expect("environment chain is at least as deep as any hop count"),
            None => cb(&self.globals.borrow()),
        }
    }

    fn lookup_identifier_mut<T>(
        &self,
        identifier: &Identifier,
        cb: impl FnOnce(&mut Environment) -> T,
    ) -> T {
        match self.resolutions.get(identifier) {
            Some(distance) => self
                .environment
                .borrow_mut()
                .ancestor_mut(*distance, cb)
                .expect("environment chain is at least as deep as any hop count"),
            None => cb(&mut self.globals.borrow_mut()),
        }
    }

    /// Swap the active environment for the duration of `run`, restoring it
    /// on every exit path, signals and errors included.
    fn run_with_env<T>(
        &mut self,
        new_env: EnvironmentRef,
        run: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let old_env = mem::replace(&mut self.environment, new_env);
        let result = run(self);
        self.environment = old_env;
        result
    }

    fn define_native(&mut self, name: &'static str, arity: usize, kind: NativeKind) {
        self.globals.borrow_mut().define(
            name,
            RuntimeValue::Native(NativeFunction::new(name, arity, kind)),
        );
    }
}

fn try_for_each_and_return_last<In, F: FnMut(&In) -> Completion>(
    items: &[In],
    default: RuntimeValue,
    mut run: F,
) -> Completion {
    for item in &items[..items.len().max(1) - 1] {
        run(item)?;
    }
    match items.last() {
        Some(item) => run(item),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parser::Parser, scanner::Scanner};
    use pretty_assertions::assert_eq;
    use std::rc::Rc;

    fn run(source: &str) -> (String, Result<RuntimeValue, RuntimeError>) {
        let tokens = Scanner::new(source)
            .map(|result| result.expect("unexpected scan error"))
            .collect();
        let (program, errors) =
            Parser::parse(tokens, SourceReference::new("<test>", source));
        assert!(errors.is_empty(), "parse errors: {:?}", errors);

        let mut output = Vec::new();
        let mut interpreter = Interpreter::new(&mut output);
        let prepared = match interpreter.prepare(program) {
            Ok(prepared) => prepared,
            Err(errors) => panic!("resolver errors: {:?}", errors),
        };
        let result = interpreter.interpret(&prepared);
        (String::from_utf8(output).unwrap(), result)
    }

    fn run_expecting_output(source: &str) -> String {
        let (output, result) = run(source);
        result.expect("unexpected runtime error");
        output
    }

    #[test]
    fn string_number_concatenation() {
        assert_eq!(
            run_expecting_output(r#"println("Hello agent " + 72 + "!");"#),
            "Hello agent 72!\n"
        );
    }

    #[test]
    fn closures_capture_the_environment_where_they_were_evaluated() {
        assert_eq!(
            run_expecting_output(
                "var q = 10;\n{ function w() { println(q); } w(); var q = 12; w(); }"
            ),
            "10\n10\n"
        );
    }

    #[test]
    fn closures_sharing_an_environment_see_each_other_writes() {
        assert_eq!(
            run_expecting_output(
                "function counter() {\n\
                 \tvar n = 0;\n\
                 \tfunction bump() { n += 1; }\n\
                 \tfunction read() => n;\n\
                 \tbump(); bump();\n\
                 \tprintln(read());\n\
                 }\n\
                 counter();"
            ),
            "2\n"
        );
    }

    #[test]
    fn inheritance_and_super_dispatch() {
        assert_eq!(
            run_expecting_output(
                "class A { function __init__() { this.v = 1; } function f() { println(this.v); } }\n\
                 class B inherits A { function __init__() { super.__init__(); this.v = 2; } }\n\
                 B().f();"
            ),
            "2\n"
        );
    }

    #[test]
    fn static_methods_are_class_properties() {
        assert_eq!(
            run_expecting_output(
                "class M { static function s() { println(\"hi\"); } } M.s();"
            ),
            "hi\n"
        );
    }

    #[test]
    fn static_methods_are_not_instance_properties() {
        let (_, result) = run(
            "class M { static function s() { println(\"hi\"); } } M().s();",
        );
        match result {
            Err(RuntimeError::UndefinedProperty { name, .. }) => assert_eq!(name, "s"),
            other => panic!("expected undefined property error, got {:?}", other),
        }
    }

    #[test]
    fn loop_control_signals() {
        assert_eq!(
            run_expecting_output(
                "for (var i = 0; i < 5; i += 1) { if (i == 1) continue; if (i == 3) break; println(i); }"
            ),
            "0\n2\n"
        );
    }

    #[test]
    fn arrow_function_immediately_invoked() {
        assert_eq!(
            run_expecting_output(r#"print((function () => "Hello, World!")());"#),
            "Hello, World!"
        );
    }

    #[test]
    fn ternary_evaluates_exactly_one_arm() {
        assert_eq!(
            run_expecting_output(
                "function t() { println(\"t\"); return 1; }\n\
                 function f() { println(\"f\"); return 2; }\n\
                 println(true ? t() : f());"
            ),
            "t\n1\n"
        );
    }

    #[test]
    fn logical_operators_short_circuit_and_return_operands() {
        assert_eq!(
            run_expecting_output(
                "println(nil or \"fallback\");\n\
                 println(false and \"never\");\n\
                 println(1 or 2);\n\
                 println(1 and 2);"
            ),
            "fallback\nfalse\n1\n2\n"
        );
    }

    #[test]
    fn plus_type_error_raises_a_runtime_error() {
        let (_, result) = run("1 + true;");
        assert!(matches!(
            result,
            Err(RuntimeError::PlusOperandsError { .. })
        ));
    }

    #[test]
    fn calling_a_class_with_wrong_arity_fails() {
        let (_, result) = run("class K { function __init__(a) { this.a = a; } } K();");
        match result {
            Err(RuntimeError::UnexpectedCallArity {
                expected_arity,
                actual_arity,
                ..
            }) => {
                assert_eq!((expected_arity, actual_arity), (1, 0));
            }
            other => panic!("expected arity error, got {:?}", other),
        }
    }

    #[test]
    fn class_without_initializer_has_arity_zero() {
        assert_eq!(
            run_expecting_output("class Empty {} println(Empty());"),
            "<Empty instance>\n"
        );
    }

    #[test]
    fn bound_methods_can_be_detached() {
        assert_eq!(
            run_expecting_output(
                "class Greeter {\n\
                 \tfunction __init__(name) { this.name = name; }\n\
                 \tfunction greet() { println(\"hi \" + this.name); }\n\
                 }\n\
                 var g = Greeter(\"ada\").greet;\n\
                 g();"
            ),
            "hi ada\n"
        );
    }

    #[test]
    fn fields_shadow_methods() {
        assert_eq!(
            run_expecting_output(
                "class C { function m() => \"method\"; }\n\
                 var c = C();\n\
                 c.m = function () => \"field\";\n\
                 println(c.m());"
            ),
            "field\n"
        );
    }

    #[test]
    fn static_fields_are_mutable_through_the_class() {
        assert_eq!(
            run_expecting_output(
                "class Config {}\n\
                 Config.retries = 3;\n\
                 Config.retries += 1;\n\
                 println(Config.retries);"
            ),
            "4\n"
        );
    }

    #[test]
    fn environment_is_restored_after_a_runtime_error() {
        let source = "var x = 1; { var y = 2; 1 + true; }";
        let tokens = Scanner::new(source)
            .map(|result| result.expect("unexpected scan error"))
            .collect();
        let (program, errors) =
            Parser::parse(tokens, SourceReference::new("<test>", source));
        assert!(errors.is_empty());

        let mut output = Vec::new();
        let mut interpreter = Interpreter::new(&mut output);
        let prepared = interpreter.prepare(program).unwrap();
        assert!(interpreter.interpret(&prepared).is_err());
        assert!(Rc::ptr_eq(&interpreter.environment, &interpreter.globals));
    }

    #[test]
    fn class_arity_matches_initializer_arity() {
        assert_eq!(
            run_expecting_output(
                "class P { function __init__(x, y) { this.x = x; this.y = y; } }\n\
                 var p = P(1, 2);\n\
                 println(p.x + p.y);"
            ),
            "3\n"
        );
    }

    #[test]
    fn initializer_returns_the_instance_even_on_bare_return() {
        assert_eq!(
            run_expecting_output(
                "class K { function __init__() { this.ok = true; return; } }\n\
                 println(K().ok);"
            ),
            "true\n"
        );
    }

    #[test]
    fn method_inheritance_through_a_chain() {
        assert_eq!(
            run_expecting_output(
                "class A { function who() => \"A\"; }\n\
                 class B inherits A {}\n\
                 class C inherits B {}\n\
                 println(C().who());"
            ),
            "A\n"
        );
    }

    #[test]
    fn repl_style_result_value() {
        let (_, result) = run("1 + 2;");
        assert_eq!(result.unwrap(), RuntimeValue::number(3.0));
    }
}
