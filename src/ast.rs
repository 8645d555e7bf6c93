use std::{fmt::Display, ops::Deref, rc::Rc};

use crate::{
    side_table::{Unique, UniqueId},
    source::SourceSpan,
    source_reference::SourceReference,
};

/// A value paired with the span of the source text it came from.
#[derive(Debug, Clone)]
pub struct WithSpan<T> {
    inner: T,
    source_span: SourceSpan,
}

impl<T> WithSpan<T> {
    pub fn new(inner: T, source_span: SourceSpan) -> Self {
        Self { inner, source_span }
    }
    pub fn source_span(&self) -> SourceSpan {
        self.source_span
    }
    pub fn inner(&self) -> &T {
        &self.inner
    }
}
impl<T> Deref for WithSpan<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

pub trait AstNode {
    fn source_span(&self) -> SourceSpan;
}

#[derive(Debug)]
pub struct Program {
    pub statements: Vec<DeclOrStmt>,
    pub source_reference: SourceReference,
}

/// A name appearing in the source. Each occurrence has its own identity so
/// the resolver can record a hop-count per reference site. Clones made while
/// desugaring share the original's identity, and with it its resolution.
#[derive(Debug, Clone)]
pub struct Identifier {
    pub id: UniqueId,
    pub name: String,
    pub source_span: SourceSpan,
}

impl Identifier {
    pub fn new(name: String, source_span: SourceSpan) -> Self {
        Self {
            id: UniqueId::new(),
            name,
            source_span,
        }
    }
}
impl Unique for Identifier {
    fn id(&self) -> UniqueId {
        self.id
    }
}
impl AstNode for Identifier {
    fn source_span(&self) -> SourceSpan {
        self.source_span
    }
}
impl Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone)]
pub enum DeclOrStmt {
    Decl(Decl),
    Stmt(Stmt),
}
impl AstNode for DeclOrStmt {
    fn source_span(&self) -> SourceSpan {
        match self {
            Self::Decl(decl) => decl.source_span(),
            Self::Stmt(stmt) => stmt.source_span(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Decl {
    Var(VarDecl),
    Fun(FunDecl),
    Class(ClassDecl),
}
impl AstNode for Decl {
    fn source_span(&self) -> SourceSpan {
        match self {
            Self::Var(decl) => decl.source_span(),
            Self::Fun(decl) => decl.source_span(),
            Self::Class(decl) => decl.source_span(),
        }
    }
}

/// One `name (= initializer)?` item of a `var` list. A `: const` annotation
/// is accepted by the parser but carries no semantics.
#[derive(Debug, Clone)]
pub struct VarItem {
    pub identifier: Identifier,
    pub initializer: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub var_span: SourceSpan,
    pub items: Vec<VarItem>,
    pub semicolon_span: SourceSpan,
}
impl AstNode for VarDecl {
    fn source_span(&self) -> SourceSpan {
        SourceSpan::range(self.var_span.start(), self.semicolon_span.end())
    }
}

/// A function's signature and body, shared between declarations, methods,
/// and function expressions. `name` is None for anonymous functions. The
/// span runs from the `function` keyword through the end of the body.
#[derive(Debug)]
pub struct Fun {
    pub name: Option<Identifier>,
    pub parameters: Vec<Identifier>,
    pub body: Vec<DeclOrStmt>,
    pub span: SourceSpan,
}
impl AstNode for Fun {
    fn source_span(&self) -> SourceSpan {
        self.span
    }
}

#[derive(Debug, Clone)]
pub struct FunDecl {
    pub fun: Rc<Fun>,
}
impl AstNode for FunDecl {
    fn source_span(&self) -> SourceSpan {
        self.fun.span
    }
}

#[derive(Debug, Clone)]
pub struct Method {
    pub fun: Rc<Fun>,
    pub is_static: bool,
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub class_span: SourceSpan,
    pub name: Identifier,
    pub superclass: Option<VariableExpr>,
    pub methods: Vec<Method>,
    pub close_brace_span: SourceSpan,
}
impl AstNode for ClassDecl {
    fn source_span(&self) -> SourceSpan {
        SourceSpan::range(self.class_span.start(), self.close_brace_span.end())
    }
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expr(ExprStmt),
    Block(BlockStmt),
    If(IfStmt),
    While(WhileStmt),
    For(ForStmt),
    Break(BreakStmt),
    Continue(ContinueStmt),
    Return(ReturnStmt),
}
impl AstNode for Stmt {
    fn source_span(&self) -> SourceSpan {
        match self {
            Self::Expr(stmt) => stmt.source_span(),
            Self::Block(stmt) => stmt.source_span(),
            Self::If(stmt) => stmt.source_span(),
            Self::While(stmt) => stmt.source_span(),
            Self::For(stmt) => stmt.source_span(),
            Self::Break(stmt) => stmt.source_span(),
            Self::Continue(stmt) => stmt.source_span(),
            Self::Return(stmt) => stmt.source_span(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExprStmt {
    pub expression: Expr,
}
impl AstNode for ExprStmt {
    fn source_span(&self) -> SourceSpan {
        self.expression.source_span()
    }
}

#[derive(Debug, Clone)]
pub struct BlockStmt {
    pub statements: Vec<DeclOrStmt>,
    pub open_span: SourceSpan,
    pub close_span: SourceSpan,
}
impl AstNode for BlockStmt {
    fn source_span(&self) -> SourceSpan {
        SourceSpan::range(self.open_span.start(), self.close_span.end())
    }
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub if_span: SourceSpan,
    pub condition: Expr,
    pub then_branch: Box<Stmt>,
    pub else_branch: Option<Box<Stmt>>,
}
impl AstNode for IfStmt {
    fn source_span(&self) -> SourceSpan {
        let end = self
            .else_branch
            .as_ref()
            .map(|stmt| stmt.source_span().end())
            .unwrap_or_else(|| self.then_branch.source_span().end());
        SourceSpan::range(self.if_span.start(), end)
    }
}

#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub while_span: SourceSpan,
    pub condition: Expr,
    pub body: Box<Stmt>,
}
impl AstNode for WhileStmt {
    fn source_span(&self) -> SourceSpan {
        SourceSpan::range(self.while_span.start(), self.body.source_span().end())
    }
}

/// `for` carries its own scope: the initializer binding is visible to the
/// condition, increment, and body, and nowhere else. A missing condition is
/// filled in with `true` by the parser.
#[derive(Debug, Clone)]
pub struct ForStmt {
    pub for_span: SourceSpan,
    pub initializer: Option<Box<DeclOrStmt>>,
    pub condition: Expr,
    pub increment: Option<Expr>,
    pub body: Box<Stmt>,
}
impl AstNode for ForStmt {
    fn source_span(&self) -> SourceSpan {
        SourceSpan::range(self.for_span.start(), self.body.source_span().end())
    }
}

#[derive(Debug, Clone)]
pub struct BreakStmt {
    pub keyword_span: SourceSpan,
}
impl AstNode for BreakStmt {
    fn source_span(&self) -> SourceSpan {
        self.keyword_span
    }
}

#[derive(Debug, Clone)]
pub struct ContinueStmt {
    pub keyword_span: SourceSpan,
}
impl AstNode for ContinueStmt {
    fn source_span(&self) -> SourceSpan {
        self.keyword_span
    }
}

#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub return_span: SourceSpan,
    pub value: Option<Expr>,
}
impl AstNode for ReturnStmt {
    fn source_span(&self) -> SourceSpan {
        let end = self
            .value
            .as_ref()
            .map(|expr| expr.source_span().end())
            .unwrap_or_else(|| self.return_span.end());
        SourceSpan::range(self.return_span.start(), end)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    String(String),
    Number(f64),
    Boolean(bool),
    Nil,
}

#[derive(Debug, Clone)]
pub enum BinaryOperator {
    Plus,
    Minus,
    Multiply,
    Divide,
    NotEqualTo,
    EqualTo,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
}
impl Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::NotEqualTo => "!=",
            Self::EqualTo => "==",
            Self::LessThan => "<",
            Self::LessThanOrEqualTo => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqualTo => ">=",
        })
    }
}

#[derive(Debug, Clone)]
pub enum LogicalOperator {
    And,
    Or,
}
impl Display for LogicalOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::And => "and",
            Self::Or => "or",
        })
    }
}

#[derive(Debug, Clone)]
pub enum UnaryOperator {
    Not,
    Minus,
}
impl Display for UnaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Minus => f.write_str("-"),
            Self::Not => f.write_str("!"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(LiteralExpr),
    Variable(VariableExpr),
    Assign(AssignExpr),
    Get(GetExpr),
    Set(SetExpr),
    This(ThisExpr),
    Super(SuperExpr),
    Grouping(GroupingExpr),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    Logical(LogicalExpr),
    Ternary(TernaryExpr),
    Call(CallExpr),
    Function(FunctionExpr),
}
impl AstNode for Expr {
    fn source_span(&self) -> SourceSpan {
        match self {
            Self::Literal(expr) => expr.source_span(),
            Self::Variable(expr) => expr.source_span(),
            Self::Assign(expr) => expr.source_span(),
            Self::Get(expr) => expr.source_span(),
            Self::Set(expr) => expr.source_span(),
            Self::This(expr) => expr.source_span(),
            Self::Super(expr) => expr.source_span(),
            Self::Grouping(expr) => expr.source_span(),
            Self::Unary(expr) => expr.source_span(),
            Self::Binary(expr) => expr.source_span(),
            Self::Logical(expr) => expr.source_span(),
            Self::Ternary(expr) => expr.source_span(),
            Self::Call(expr) => expr.source_span(),
            Self::Function(expr) => expr.source_span(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LiteralExpr {
    pub value: LiteralValue,
    pub source_span: SourceSpan,
}
impl AstNode for LiteralExpr {
    fn source_span(&self) -> SourceSpan {
        self.source_span
    }
}

#[derive(Debug, Clone)]
pub struct VariableExpr {
    pub identifier: Identifier,
}
impl AstNode for VariableExpr {
    fn source_span(&self) -> SourceSpan {
        self.identifier.source_span()
    }
}

#[derive(Debug, Clone)]
pub struct AssignExpr {
    pub target: Identifier,
    pub value: Box<Expr>,
}
impl AstNode for AssignExpr {
    fn source_span(&self) -> SourceSpan {
        SourceSpan::range(
            self.target.source_span().start(),
            self.value.source_span().end(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct GetExpr {
    pub object: Box<Expr>,
    pub name: Identifier,
}
impl AstNode for GetExpr {
    fn source_span(&self) -> SourceSpan {
        SourceSpan::range(
            self.object.source_span().start(),
            self.name.source_span().end(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct SetExpr {
    pub object: Box<Expr>,
    pub name: Identifier,
    pub value: Box<Expr>,
}
impl AstNode for SetExpr {
    fn source_span(&self) -> SourceSpan {
        SourceSpan::range(
            self.object.source_span().start(),
            self.value.source_span().end(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct ThisExpr {
    pub keyword: Identifier,
}
impl AstNode for ThisExpr {
    fn source_span(&self) -> SourceSpan {
        self.keyword.source_span()
    }
}

#[derive(Debug, Clone)]
pub struct SuperExpr {
    pub keyword: Identifier,
    pub method: Identifier,
}
impl AstNode for SuperExpr {
    fn source_span(&self) -> SourceSpan {
        SourceSpan::range(
            self.keyword.source_span().start(),
            self.method.source_span().end(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct GroupingExpr {
    pub expr: Box<Expr>,
}
impl AstNode for GroupingExpr {
    fn source_span(&self) -> SourceSpan {
        self.expr.source_span()
    }
}

#[derive(Debug, Clone)]
pub struct UnaryExpr {
    pub operator: WithSpan<UnaryOperator>,
    pub right: Box<Expr>,
}
impl AstNode for UnaryExpr {
    fn source_span(&self) -> SourceSpan {
        SourceSpan::range(
            self.operator.source_span().start(),
            self.right.source_span().end(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub operator: WithSpan<BinaryOperator>,
    pub right: Box<Expr>,
}
impl AstNode for BinaryExpr {
    fn source_span(&self) -> SourceSpan {
        SourceSpan::range(
            self.left.source_span().start(),
            self.right.source_span().end(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct LogicalExpr {
    pub left: Box<Expr>,
    pub operator: WithSpan<LogicalOperator>,
    pub right: Box<Expr>,
}
impl AstNode for LogicalExpr {
    fn source_span(&self) -> SourceSpan {
        SourceSpan::range(
            self.left.source_span().start(),
            self.right.source_span().end(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct TernaryExpr {
    pub question_span: SourceSpan,
    pub condition: Box<Expr>,
    pub then_branch: Box<Expr>,
    pub else_branch: Box<Expr>,
}
impl AstNode for TernaryExpr {
    fn source_span(&self) -> SourceSpan {
        SourceSpan::range(
            self.condition.source_span().start(),
            self.else_branch.source_span().end(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct CallExpr {
    pub callee: Box<Expr>,
    pub arguments: Vec<Expr>,
    pub close_paren_span: SourceSpan,
}
impl AstNode for CallExpr {
    fn source_span(&self) -> SourceSpan {
        SourceSpan::range(
            self.callee.source_span().start(),
            self.close_paren_span.end(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct FunctionExpr {
    pub fun: Rc<Fun>,
}
impl AstNode for FunctionExpr {
    fn source_span(&self) -> SourceSpan {
        self.fun.span
    }
}
