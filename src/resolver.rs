use std::collections::HashMap;

use log::debug;
use miette::Diagnostic;
use thiserror::Error;

use crate::{
    ast::*,
    keywords::{INIT, SUPER, THIS},
    side_table::SideTable,
    source::SourceSpan,
    source_reference::SourceReference,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryStatus {
    Declared,
    Defined,
}

#[derive(Debug, Clone)]
struct ScopeEntry {
    declared_at: SourceSpan,
    status: EntryStatus,
}

type Scope = HashMap<String, ScopeEntry>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionKind {
    None,
    Function,
    Method,
    StaticMethod,
    Initializer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassKind {
    None,
    Class,
    Subclass,
}

#[derive(Error, Diagnostic, Debug)]
pub enum ResolverError {
    #[error("Cannot read local variable in its own initializer.")]
    VariableUsedInOwnInitializer {
        #[label("Variable is being declared here")]
        declared_at: SourceSpan,
        #[label("Variable is being used here")]
        used_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Variable with this name already declared in this scope.")]
    VariableAlreadyDeclared {
        name: String,
        #[label("'{name}' is declared in the same scope again here")]
        found_at: SourceSpan,
        #[label("'{name}' was first declared here")]
        first_found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Cannot return from top-level code.")]
    ReturnFromTopLevel {
        #[label("Return outside of function found here")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Cannot return a value from an initializer.")]
    ReturnValueFromInitializer {
        #[label("Initializers produce the new instance, not this value")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Break statement cannot appear outside a loop.")]
    BreakOutsideLoop {
        #[label("'break' found here")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Continue statement cannot appear outside a loop.")]
    ContinueOutsideLoop {
        #[label("'continue' found here")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Cannot use 'this' outside of a class.")]
    ThisOutsideClass {
        #[label("'this' found here")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Cannot use 'this' inside a static method.")]
    ThisInStaticMethod {
        #[label("'this' found here")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Cannot use 'super' outside of a class.")]
    SuperOutsideClass {
        #[label("'super' found here")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Cannot use 'super' in a class with no superclass.")]
    SuperWithoutSuperclass {
        #[label("'super' found here")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Cannot use 'super' inside a static method.")]
    SuperInStaticMethod {
        #[label("'super' found here")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Constructor cannot be a static method.")]
    StaticInitializer {
        #[label("the initializer is declared static here")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
}

/// Hop counts, keyed on the identity of each reference site. A missing entry
/// means the reference is global.
pub type Resolutions = SideTable<Identifier, usize>;

/// Static scope analysis. Walks the whole AST once, pairing every local
/// variable reference with the number of environments to skip at runtime,
/// and rejecting the constructs that cannot be checked during execution
/// (stray `return`/`break`/`continue`, misplaced `this`/`super`, duplicate
/// locals, reads of a variable from its own initializer).
pub struct Resolver<'a> {
    scopes: Vec<Scope>,
    errors: Vec<ResolverError>,
    current_function: FunctionKind,
    current_class: ClassKind,
    in_loop: bool,
    source_reference: SourceReference,
    resolutions: &'a mut Resolutions,
}

impl Resolver<'_> {
    pub fn resolve(
        program: &Program,
        resolutions: &mut Resolutions,
    ) -> Result<(), Vec<ResolverError>> {
        let mut resolver = Resolver {
            scopes: Vec::new(),
            errors: Vec::new(),
            current_function: FunctionKind::None,
            current_class: ClassKind::None,
            in_loop: false,
            source_reference: program.source_reference.clone(),
            resolutions,
        };
        resolver.resolve_block(&program.statements);
        debug!(
            "resolved program: {} entries, {} errors",
            resolver.resolutions.len(),
            resolver.errors.len()
        );
        if resolver.errors.is_empty() {
            Ok(())
        } else {
            Err(resolver.errors)
        }
    }

    fn resolve_block(&mut self, body: &[DeclOrStmt]) {
        for stmt in body {
            self.resolve_decl_or_stmt(stmt);
        }
    }

    fn resolve_decl_or_stmt(&mut self, decl_or_stmt: &DeclOrStmt) {
        match decl_or_stmt {
            DeclOrStmt::Decl(decl) => self.resolve_decl(decl),
            DeclOrStmt::Stmt(stmt) => self.resolve_stmt(stmt),
        }
    }

    fn resolve_decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Var(decl) => {
                for item in decl.items.iter() {
                    self.declare(&item.identifier);
                    if let Some(initializer) = &item.initializer {
                        self.resolve_expr(initializer);
                    }
                    self.define(&item.identifier);
                }
            }
            Decl::Fun(decl) => {
                let name = decl.fun.name.as_ref().expect("declared functions are named");
                self.declare(name);
                self.define(name);
                self.resolve_function(&decl.fun, FunctionKind::Function);
            }
            Decl::Class(decl) => self.resolve_class_decl(decl),
        }
    }

    fn resolve_class_decl(&mut self, decl: &ClassDecl) {
        self.declare(&decl.name);
        self.define(&decl.name);

        let enclosing_class = self.current_class;
        self.current_class = ClassKind::Class;

        if let Some(superclass) = &decl.superclass {
            self.resolve_expr_variable(superclass);
            self.begin_scope();
            self.insert_defined(SUPER, superclass.source_span());
            self.current_class = ClassKind::Subclass;
        }

        self.begin_scope();
        self.insert_defined(THIS, decl.name.source_span());
        for method in decl.methods.iter() {
            let name = method.fun.name.as_ref().expect("methods are named");
            let kind = if name.name == INIT {
                if method.is_static {
                    self.errors.push(ResolverError::StaticInitializer {
                        found_at: name.source_span(),
                        source_code: self.source_reference.clone(),
                    });
                }
                FunctionKind::Initializer
            } else if method.is_static {
                FunctionKind::StaticMethod
            } else {
                FunctionKind::Method
            };
            self.resolve_function(&method.fun, kind);
        }
        self.end_scope();

        if decl.superclass.is_some() {
            self.end_scope();
        }
        self.current_class = enclosing_class;
    }

    fn resolve_function(&mut self, fun: &Fun, kind: FunctionKind) {
        let enclosing_function = self.current_function;
        self.current_function = kind;
        self.begin_scope();
        for parameter in fun.parameters.iter() {
            self.declare(parameter);
            self.define(parameter);
        }
        self.resolve_block(&fun.body);
        self.end_scope();
        self.current_function = enclosing_function;
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(stmt) => {
                self.resolve_expr(&stmt.expression);
            }
            Stmt::Block(stmt) => {
                self.begin_scope();
                self.resolve_block(&stmt.statements);
                self.end_scope();
            }
            Stmt::If(stmt) => {
                self.resolve_expr(&stmt.condition);
                self.resolve_stmt(&stmt.then_branch);
                if let Some(else_branch) = &stmt.else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::While(stmt) => {
                self.resolve_expr(&stmt.condition);
                let enclosing_loop = self.in_loop;
                self.in_loop = true;
                self.resolve_stmt(&stmt.body);
                self.in_loop = enclosing_loop;
            }
            Stmt::For(stmt) => {
                self.begin_scope();
                let enclosing_loop = self.in_loop;
                self.in_loop = true;
                if let Some(initializer) = &stmt.initializer {
                    self.resolve_decl_or_stmt(initializer);
                }
                self.resolve_expr(&stmt.condition);
                if let Some(increment) = &stmt.increment {
                    self.resolve_expr(increment);
                }
                self.resolve_stmt(&stmt.body);
                self.in_loop = enclosing_loop;
                self.end_scope();
            }
            Stmt::Break(stmt) => {
                if !self.in_loop {
                    self.errors.push(ResolverError::BreakOutsideLoop {
                        found_at: stmt.keyword_span,
                        source_code: self.source_reference.clone(),
                    });
                }
            }
            Stmt::Continue(stmt) => {
                if !self.in_loop {
                    self.errors.push(ResolverError::ContinueOutsideLoop {
                        found_at: stmt.keyword_span,
                        source_code: self.source_reference.clone(),
                    });
                }
            }
            Stmt::Return(stmt) => {
                if self.current_function == FunctionKind::None {
                    self.errors.push(ResolverError::ReturnFromTopLevel {
                        found_at: stmt.return_span,
                        source_code: self.source_reference.clone(),
                    });
                }
                if let Some(value) = &stmt.value {
                    if self.current_function == FunctionKind::Initializer {
                        self.errors.push(ResolverError::ReturnValueFromInitializer {
                            found_at: stmt.return_span,
                            source_code: self.source_reference.clone(),
                        });
                    }
                    self.resolve_expr(value);
                }
            }
        }
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}
            Expr::Variable(expr) => self.resolve_expr_variable(expr),
            Expr::Assign(expr) => {
                self.resolve_expr(&expr.value);
                self.resolve_local(&expr.target);
            }
            Expr::Get(expr) => {
                self.resolve_expr(&expr.object);
            }
            Expr::Set(expr) => {
                self.resolve_expr(&expr.value);
                self.resolve_expr(&expr.object);
            }
            Expr::This(expr) => {
                if self.current_class == ClassKind::None {
                    self.errors.push(ResolverError::ThisOutsideClass {
                        found_at: expr.source_span(),
                        source_code: self.source_reference.clone(),
                    });
                    return;
                }
                if self.current_function == FunctionKind::StaticMethod {
                    self.errors.push(ResolverError::ThisInStaticMethod {
                        found_at: expr.source_span(),
                        source_code: self.source_reference.clone(),
                    });
                    return;
                }
                self.resolve_local(&expr.keyword);
            }
            Expr::Super(expr) => {
                if self.current_class == ClassKind::None {
                    self.errors.push(ResolverError::SuperOutsideClass {
                        found_at: expr.keyword.source_span(),
                        source_code: self.source_reference.clone(),
                    });
                } else if self.current_class == ClassKind::Class {
                    self.errors.push(ResolverError::SuperWithoutSuperclass {
                        found_at: expr.keyword.source_span(),
                        source_code: self.source_reference.clone(),
                    });
                } else if self.current_function == FunctionKind::StaticMethod {
                    // An unbound static method has no `this` scope, so the
                    // runtime `super` lookup could never succeed.
                    self.errors.push(ResolverError::SuperInStaticMethod {
                        found_at: expr.keyword.source_span(),
                        source_code: self.source_reference.clone(),
                    });
                }
                self.resolve_local(&expr.keyword);
            }
            Expr::Grouping(expr) => {
                self.resolve_expr(&expr.expr);
            }
            Expr::Unary(expr) => {
                self.resolve_expr(&expr.right);
            }
            Expr::Binary(expr) => {
                self.resolve_expr(&expr.left);
                self.resolve_expr(&expr.right);
            }
            Expr::Logical(expr) => {
                self.resolve_expr(&expr.left);
                self.resolve_expr(&expr.right);
            }
            Expr::Ternary(expr) => {
                self.resolve_expr(&expr.condition);
                self.resolve_expr(&expr.then_branch);
                self.resolve_expr(&expr.else_branch);
            }
            Expr::Call(expr) => {
                self.resolve_expr(&expr.callee);
                for argument in expr.arguments.iter() {
                    self.resolve_expr(argument);
                }
            }
            Expr::Function(expr) => {
                self.resolve_function(&expr.fun, FunctionKind::Function);
            }
        }
    }

    fn resolve_expr_variable(&mut self, expr: &VariableExpr) {
        if let Some(ScopeEntry {
            status: EntryStatus::Declared,
            declared_at,
        }) = self.current_scope_entry(&expr.identifier.name)
        {
            self.errors
                .push(ResolverError::VariableUsedInOwnInitializer {
                    declared_at,
                    used_at: expr.source_span(),
                    source_code: self.source_reference.clone(),
                });
        }
        self.resolve_local(&expr.identifier);
    }

    /// Scan from the innermost scope outwards; the first scope holding the
    /// name gives its hop count. No match means the reference is global and
    /// stays out of the table.
    fn resolve_local(&mut self, identifier: &Identifier) {
        let found = self
            .scopes
            .iter()
            .rev()
            .enumerate()
            .find(|(_, scope)| scope.contains_key(&identifier.name));
        if let Some((hops, _)) = found {
            self.resolutions.set(identifier, hops);
        }
    }

    fn begin_scope(&mut self) {
        self.scopes.push(Scope::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, identifier: &Identifier) {
        let source_code = self.source_reference.clone();
        if let Some(current_scope) = self.scopes.last_mut() {
            if let Some(entry) = current_scope.get(&identifier.name) {
                self.errors.push(ResolverError::VariableAlreadyDeclared {
                    name: identifier.name.clone(),
                    found_at: identifier.source_span(),
                    first_found_at: entry.declared_at,
                    source_code,
                });
                return;
            }
            current_scope.insert(
                identifier.name.clone(),
                ScopeEntry {
                    declared_at: identifier.source_span(),
                    status: EntryStatus::Declared,
                },
            );
        }
    }

    fn define(&mut self, identifier: &Identifier) {
        if let Some(current_scope) = self.scopes.last_mut() {
            if let Some(entry) = current_scope.get_mut(&identifier.name) {
                entry.status = EntryStatus::Defined;
            }
        }
    }

    fn insert_defined(&mut self, name: &str, declared_at: SourceSpan) {
        self.scopes
            .last_mut()
            .expect("scope was just pushed")
            .insert(
                name.to_string(),
                ScopeEntry {
                    declared_at,
                    status: EntryStatus::Defined,
                },
            );
    }

    fn current_scope_entry(&self, name: &str) -> Option<ScopeEntry> {
        self.scopes
            .last()
            .and_then(|scope| scope.get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parser::Parser, scanner::Scanner};

    fn resolve_source(source: &str) -> Result<Resolutions, Vec<ResolverError>> {
        let tokens = Scanner::new(source)
            .map(|result| result.expect("unexpected scan error"))
            .collect();
        let (program, errors) = Parser::parse(tokens, SourceReference::new("<test>", source));
        assert!(errors.is_empty(), "parse errors: {:?}", errors);
        let mut resolutions = Resolutions::new();
        Resolver::resolve(&program, &mut resolutions)?;
        Ok(resolutions)
    }

    fn expect_errors(source: &str) -> Vec<ResolverError> {
        resolve_source(source).expect_err("expected resolver errors")
    }

    #[test]
    fn top_level_references_stay_out_of_the_table() {
        let resolutions = resolve_source("var a = 1; a;").unwrap();
        assert!(resolutions.is_empty());
    }

    #[test]
    fn local_references_get_hop_counts() {
        let resolutions = resolve_source("{ var a = 1; { a; } }").unwrap();
        assert_eq!(resolutions.len(), 1);
    }

    #[test]
    fn return_at_top_level_is_rejected() {
        let errors = expect_errors("return 1;");
        assert!(matches!(errors[0], ResolverError::ReturnFromTopLevel { .. }));
    }

    #[test]
    fn return_value_from_initializer_is_rejected() {
        let errors = expect_errors("class K { function __init__() { return 1; } }");
        assert!(matches!(
            errors[0],
            ResolverError::ReturnValueFromInitializer { .. }
        ));
    }

    #[test]
    fn bare_return_from_initializer_is_allowed() {
        assert!(resolve_source("class K { function __init__() { return; } }").is_ok());
    }

    #[test]
    fn break_outside_loop_is_rejected() {
        let errors = expect_errors("break;");
        assert!(matches!(errors[0], ResolverError::BreakOutsideLoop { .. }));
    }

    #[test]
    fn continue_inside_for_is_allowed() {
        assert!(resolve_source("for (var i = 0; i < 3; i += 1) { continue; }").is_ok());
    }

    #[test]
    fn this_outside_class_is_rejected() {
        let errors = expect_errors("this;");
        assert!(matches!(errors[0], ResolverError::ThisOutsideClass { .. }));
    }

    #[test]
    fn this_in_static_method_is_rejected() {
        let errors = expect_errors("class K { static function s() { this; } }");
        assert!(matches!(errors[0], ResolverError::ThisInStaticMethod { .. }));
    }

    #[test]
    fn super_without_superclass_is_rejected() {
        let errors = expect_errors("class K { function m() { super.m(); } }");
        assert!(matches!(
            errors[0],
            ResolverError::SuperWithoutSuperclass { .. }
        ));
    }

    #[test]
    fn static_initializer_is_rejected() {
        let errors = expect_errors("class K { static function __init__() {} }");
        assert!(matches!(errors[0], ResolverError::StaticInitializer { .. }));
    }

    #[test]
    fn variable_read_in_own_initializer_is_rejected() {
        let errors = expect_errors("{ var x = x; }");
        assert!(matches!(
            errors[0],
            ResolverError::VariableUsedInOwnInitializer { .. }
        ));
    }

    #[test]
    fn duplicate_declaration_in_local_scope_is_rejected() {
        let errors = expect_errors("{ var x = 1; var x = 2; }");
        assert!(matches!(
            errors[0],
            ResolverError::VariableAlreadyDeclared { .. }
        ));
    }

    #[test]
    fn global_redeclaration_is_allowed() {
        assert!(resolve_source("var x = 1; var x = 2;").is_ok());
    }
}
