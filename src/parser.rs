use log::debug;
use miette::Diagnostic;
use std::rc::Rc;
use thiserror::Error;

use crate::{
    ast::*,
    scanner::{Token, TokenType, TokenTypeName},
    source::SourceSpan,
    source_reference::SourceReference,
};

#[derive(Error, Diagnostic, Debug)]
pub enum ParserError {
    #[error("Expected {expected:?}")]
    ExpectedToken {
        expected: TokenTypeName,
        actual: TokenTypeName,
        #[label("Found {actual:?} instead of {expected:?}")]
        found_at: SourceSpan,
    },
    #[error("Expected a semicolon at the end of this statement")]
    ExpectedSemicolon {
        actual: TokenTypeName,
        #[label("Found {actual:?} instead of a semicolon (;)")]
        found_at: SourceSpan,
    },
    #[error("Expected closing parenthesis")]
    UnmatchedParenthesis {
        #[label("Opening parenthesis here")]
        opener: SourceSpan,
        found_token_type: TokenTypeName,
        #[label("Found {found_token_type:?} instead")]
        found_at: SourceSpan,
    },
    #[error("Expected a {what}")]
    ExpectedIdentifier {
        what: &'static str,
        actual: TokenTypeName,
        #[label("Found {actual:?} instead of a {what}")]
        found_at: SourceSpan,
    },
    #[error("Unexpected token in expression")]
    UnexpectedExpressionToken {
        actual: TokenTypeName,
        #[label("Found {actual:?} instead of a number, variable, unary, etc.")]
        found_at: SourceSpan,
    },
    #[error("Invalid assignment target.")]
    InvalidAssignmentTarget {
        #[label("The expression before this operator cannot be assigned to")]
        found_at: SourceSpan,
    },
    #[error("Cannot have more than 8 arguments")]
    TooManyArguments {
        #[label("Argument limit reached here")]
        found_at: SourceSpan,
    },
    #[error("Cannot have more than 255 parameters")]
    TooManyParameters {
        #[label("Parameter limit reached here")]
        found_at: SourceSpan,
    },
    #[error("Missing left-hand operand for binary operator '{operator}'")]
    MissingLeftOperand {
        operator: String,
        #[label("This operator has no left-hand operand")]
        found_at: SourceSpan,
    },
    #[error("Keyword 'static' cannot appear outside a class.")]
    StaticOutsideClass {
        #[label("'static' found here")]
        found_at: SourceSpan,
    },
}

/// Recursive-descent parser. Never fails as a whole: on a syntax error it
/// records the diagnostic, synchronizes to the next statement boundary and
/// keeps going, so a single run can report several errors. A program that
/// produced any error must not be run.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    recovered_errors: Vec<ParserError>,
}

impl Parser {
    pub fn parse(
        tokens: Vec<Token>,
        source_reference: SourceReference,
    ) -> (Program, Vec<ParserError>) {
        let mut parser = Self::new(tokens);
        let statements = parser.parse_program();
        debug!(
            "parsed {} top-level statements, {} recovered errors",
            statements.len(),
            parser.recovered_errors.len()
        );
        (
            Program {
                statements,
                source_reference,
            },
            parser.recovered_errors,
        )
    }

    fn new(mut tokens: Vec<Token>) -> Self {
        // The scanner stops early when the final token is malformed; parsing
        // relies on a trailing Eof being present.
        let needs_eof = !matches!(
            tokens.last(),
            Some(Token {
                token_type: TokenType::Eof,
                ..
            })
        );
        if needs_eof {
            let offset = tokens.last().map(|t| t.span.end().byte_offset()).unwrap_or(0);
            tokens.push(Token::new((offset..offset + 1).into(), TokenType::Eof));
        }
        Parser {
            tokens,
            current: 0,
            recovered_errors: Vec::new(),
        }
    }

    fn parse_program(&mut self) -> Vec<DeclOrStmt> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            match self.parse_decl_or_stmt() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    self.recovered_errors.push(err);
                    self.synchronize();
                }
            }
        }
        statements
    }

    fn parse_decl_or_stmt(&mut self) -> Result<DeclOrStmt, ParserError> {
        if let Some(class_span) = self.consume_match(|token| match token.token_type {
            TokenType::Class => Some(token.span),
            _ => None,
        }) {
            return Ok(DeclOrStmt::Decl(Decl::Class(
                self.parse_class_decl(class_span)?,
            )));
        }

        // `function` opens a declaration only when a name follows; otherwise
        // it begins a function expression and statement parsing handles it.
        if self.check_fun_followed_by_name() {
            let keyword_span = self.advance_span();
            return Ok(DeclOrStmt::Decl(Decl::Fun(
                self.parse_fun_decl(keyword_span)?,
            )));
        }

        if let Some(var_span) = self.consume_match(|token| match token.token_type {
            TokenType::Var => Some(token.span),
            _ => None,
        }) {
            return Ok(DeclOrStmt::Decl(Decl::Var(self.parse_var_decl(var_span)?)));
        }

        Ok(DeclOrStmt::Stmt(self.parse_stmt()?))
    }

    fn check_fun_followed_by_name(&self) -> bool {
        self.peek().token_type == TokenType::Fun
            && matches!(
                self.peek_next().map(|token| &token.token_type),
                Some(TokenType::Identifier(_))
            )
    }

    fn parse_class_decl(&mut self, class_span: SourceSpan) -> Result<ClassDecl, ParserError> {
        let name = self.parse_identifier("class name")?;

        let superclass = if self
            .consume_match(|token| match token.token_type {
                TokenType::Inherits => Some(()),
                _ => None,
            })
            .is_some()
        {
            Some(VariableExpr {
                identifier: self.parse_identifier("superclass name")?,
            })
        } else {
            None
        };

        self.consume_token_or_error(TokenType::OpenBrace)?;
        let mut methods = Vec::new();
        while !self.check(&TokenType::CloseBrace) && !self.is_at_end() {
            methods.push(self.parse_method()?);
        }
        let close_brace_span = self.consume_token_or_error(TokenType::CloseBrace)?;

        Ok(ClassDecl {
            class_span,
            name,
            superclass,
            methods,
            close_brace_span,
        })
    }

    fn parse_method(&mut self) -> Result<Method, ParserError> {
        let is_static = self
            .consume_match(|token| match token.token_type {
                TokenType::Static => Some(()),
                _ => None,
            })
            .is_some();
        let keyword_span = self.consume_token_or_error(TokenType::Fun)?;
        let name = self.parse_identifier("method name")?;
        let fun = self.parse_function(Some(name), keyword_span, true)?;
        Ok(Method { fun, is_static })
    }

    fn parse_fun_decl(&mut self, keyword_span: SourceSpan) -> Result<FunDecl, ParserError> {
        let name = self.parse_identifier("function name")?;
        let fun = self.parse_function(Some(name), keyword_span, true)?;
        Ok(FunDecl { fun })
    }

    fn parse_function(
        &mut self,
        name: Option<Identifier>,
        keyword_span: SourceSpan,
        is_stmt: bool,
    ) -> Result<Rc<Fun>, ParserError> {
        self.consume_token_or_error(TokenType::OpenParen)?;
        let mut parameters = Vec::new();
        if !self.check(&TokenType::CloseParen) {
            loop {
                if parameters.len() >= 255 {
                    let found_at = self.peek().span;
                    self.recovered_errors
                        .push(ParserError::TooManyParameters { found_at });
                }
                parameters.push(self.parse_identifier("parameter name")?);
                if !self.consume_comma() {
                    break;
                }
            }
        }
        self.consume_token_or_error(TokenType::CloseParen)?;

        let (body, end) = if let Some(arrow_span) = self.consume_match(|token| {
            match token.token_type {
                TokenType::EqualGreater => Some(token.span),
                _ => None,
            }
        }) {
            // `=> expr` is sugar for a body holding a single return.
            let expression = self.parse_expr()?;
            let end = expression.source_span().end();
            if is_stmt {
                self.consume_statement_end_semicolon()?;
            }
            let body = vec![DeclOrStmt::Stmt(Stmt::Return(ReturnStmt {
                return_span: arrow_span,
                value: Some(expression),
            }))];
            (body, end)
        } else {
            let open_span = self.consume_token_or_error(TokenType::OpenBrace)?;
            let block = self.parse_block(open_span)?;
            (block.statements, block.close_span.end())
        };

        Ok(Rc::new(Fun {
            name,
            parameters,
            body,
            span: SourceSpan::range(keyword_span.start(), end),
        }))
    }

    fn parse_var_decl(&mut self, var_span: SourceSpan) -> Result<VarDecl, ParserError> {
        let mut items = Vec::new();
        loop {
            let identifier = self.parse_identifier("variable name")?;
            if self
                .consume_match(|token| match token.token_type {
                    TokenType::Colon => Some(()),
                    _ => None,
                })
                .is_some()
            {
                // Accepted and discarded; `const` has no runtime meaning.
                self.consume_token(TokenType::Const);
            }
            let initializer = if self
                .consume_match(|token| match token.token_type {
                    TokenType::Equal => Some(()),
                    _ => None,
                })
                .is_some()
            {
                Some(self.parse_expr()?)
            } else {
                None
            };
            items.push(VarItem {
                identifier,
                initializer,
            });
            if !self.consume_comma() {
                break;
            }
        }
        let semicolon_span = self.consume_statement_end_semicolon()?;
        Ok(VarDecl {
            var_span,
            items,
            semicolon_span,
        })
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParserError> {
        if let Some(if_span) = self.consume_match(|token| match token.token_type {
            TokenType::If => Some(token.span),
            _ => None,
        }) {
            return self.parse_if_stmt(if_span);
        }
        if let Some(return_span) = self.consume_match(|token| match token.token_type {
            TokenType::Return => Some(token.span),
            _ => None,
        }) {
            let value = if self.check(&TokenType::Semicolon) {
                None
            } else {
                Some(self.parse_expr()?)
            };
            self.consume_statement_end_semicolon()?;
            return Ok(Stmt::Return(ReturnStmt { return_span, value }));
        }
        if let Some(while_span) = self.consume_match(|token| match token.token_type {
            TokenType::While => Some(token.span),
            _ => None,
        }) {
            return self.parse_while_stmt(while_span);
        }
        if let Some(for_span) = self.consume_match(|token| match token.token_type {
            TokenType::For => Some(token.span),
            _ => None,
        }) {
            return self.parse_for_stmt(for_span);
        }
        if let Some(keyword_span) = self.consume_match(|token| match token.token_type {
            TokenType::Break => Some(token.span),
            _ => None,
        }) {
            self.consume_statement_end_semicolon()?;
            return Ok(Stmt::Break(BreakStmt { keyword_span }));
        }
        if let Some(keyword_span) = self.consume_match(|token| match token.token_type {
            TokenType::Continue => Some(token.span),
            _ => None,
        }) {
            self.consume_statement_end_semicolon()?;
            return Ok(Stmt::Continue(ContinueStmt { keyword_span }));
        }
        if let Some(open_span) = self.consume_match(|token| match token.token_type {
            TokenType::OpenBrace => Some(token.span),
            _ => None,
        }) {
            return Ok(Stmt::Block(self.parse_block(open_span)?));
        }

        let expression = self.parse_expr()?;
        self.consume_statement_end_semicolon()?;
        Ok(Stmt::Expr(ExprStmt { expression }))
    }

    fn parse_if_stmt(&mut self, if_span: SourceSpan) -> Result<Stmt, ParserError> {
        self.consume_token_or_error(TokenType::OpenParen)?;
        let condition = self.parse_expr()?;
        self.consume_token_or_error(TokenType::CloseParen)?;
        let then_branch = Box::new(self.parse_stmt()?);
        let else_branch = if self
            .consume_match(|token| match token.token_type {
                TokenType::Else => Some(()),
                _ => None,
            })
            .is_some()
        {
            Some(Box::new(self.parse_stmt()?))
        } else {
            None
        };
        Ok(Stmt::If(IfStmt {
            if_span,
            condition,
            then_branch,
            else_branch,
        }))
    }

    fn parse_while_stmt(&mut self, while_span: SourceSpan) -> Result<Stmt, ParserError> {
        self.consume_token_or_error(TokenType::OpenParen)?;
        let condition = self.parse_expr()?;
        self.consume_token_or_error(TokenType::CloseParen)?;
        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt::While(WhileStmt {
            while_span,
            condition,
            body,
        }))
    }

    fn parse_for_stmt(&mut self, for_span: SourceSpan) -> Result<Stmt, ParserError> {
        self.consume_token_or_error(TokenType::OpenParen)?;

        let initializer = if self.consume_token(TokenType::Semicolon) {
            None
        } else if let Some(var_span) = self.consume_match(|token| match token.token_type {
            TokenType::Var => Some(token.span),
            _ => None,
        }) {
            Some(Box::new(DeclOrStmt::Decl(Decl::Var(
                self.parse_var_decl(var_span)?,
            ))))
        } else {
            let expression = self.parse_expr()?;
            self.consume_statement_end_semicolon()?;
            Some(Box::new(DeclOrStmt::Stmt(Stmt::Expr(ExprStmt {
                expression,
            }))))
        };

        let condition = if self.check(&TokenType::Semicolon) {
            Expr::Literal(LiteralExpr {
                value: LiteralValue::Boolean(true),
                source_span: self.peek().span,
            })
        } else {
            self.parse_expr()?
        };
        self.consume_statement_end_semicolon()?;

        let increment = if self.check(&TokenType::CloseParen) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.consume_token_or_error(TokenType::CloseParen)?;

        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt::For(ForStmt {
            for_span,
            initializer,
            condition,
            increment,
            body,
        }))
    }

    fn parse_block(&mut self, open_span: SourceSpan) -> Result<BlockStmt, ParserError> {
        let mut statements = Vec::new();
        while !self.check(&TokenType::CloseBrace) && !self.is_at_end() {
            match self.parse_decl_or_stmt() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    self.recovered_errors.push(err);
                    self.synchronize();
                }
            }
        }
        let close_span = self.consume_token_or_error(TokenType::CloseBrace)?;
        Ok(BlockStmt {
            statements,
            open_span,
            close_span,
        })
    }

    fn parse_expr(&mut self) -> Result<Expr, ParserError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr, ParserError> {
        let expr = self.parse_ternary()?;

        if let Some((augment, op_span)) = self.consume_match(|token| match token.token_type {
            TokenType::Equal => Some((None, token.span)),
            TokenType::PlusEqual => Some((Some(BinaryOperator::Plus), token.span)),
            TokenType::MinusEqual => Some((Some(BinaryOperator::Minus), token.span)),
            TokenType::StarEqual => Some((Some(BinaryOperator::Multiply), token.span)),
            TokenType::SlashEqual => Some((Some(BinaryOperator::Divide), token.span)),
            _ => None,
        }) {
            let mut value = self.parse_assignment()?;
            if let Some(operator) = augment {
                // `x += e` desugars to `x = x + e`, re-using the target
                // expression (and its resolution) for the read.
                value = Expr::Binary(BinaryExpr {
                    left: Box::new(expr.clone()),
                    operator: WithSpan::new(operator, op_span),
                    right: Box::new(value),
                });
            }
            return Ok(match expr {
                Expr::Variable(variable) => Expr::Assign(AssignExpr {
                    target: variable.identifier,
                    value: Box::new(value),
                }),
                Expr::Get(get) => Expr::Set(SetExpr {
                    object: get.object,
                    name: get.name,
                    value: Box::new(value),
                }),
                other => {
                    self.recovered_errors
                        .push(ParserError::InvalidAssignmentTarget { found_at: op_span });
                    other
                }
            });
        }

        Ok(expr)
    }

    fn parse_ternary(&mut self) -> Result<Expr, ParserError> {
        let mut expr = self.parse_logic_or()?;

        while let Some(question_span) = self.consume_match(|token| match token.token_type {
            TokenType::Question => Some(token.span),
            _ => None,
        }) {
            let then_branch = self.parse_ternary()?;
            self.consume_token_or_error(TokenType::Colon)?;
            let else_branch = self.parse_ternary()?;
            expr = Expr::Ternary(TernaryExpr {
                question_span,
                condition: Box::new(expr),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            });
        }

        Ok(expr)
    }

    fn parse_logic_or(&mut self) -> Result<Expr, ParserError> {
        let mut expr = self.parse_logic_and()?;

        while let Some(operator) = self.consume_match(|token| match token.token_type {
            TokenType::Or => Some(WithSpan::new(LogicalOperator::Or, token.span)),
            _ => None,
        }) {
            expr = Expr::Logical(LogicalExpr {
                left: Box::new(expr),
                operator,
                right: Box::new(self.parse_logic_and()?),
            });
        }

        Ok(expr)
    }

    fn parse_logic_and(&mut self) -> Result<Expr, ParserError> {
        let mut expr = self.parse_equality()?;

        while let Some(operator) = self.consume_match(|token| match token.token_type {
            TokenType::And => Some(WithSpan::new(LogicalOperator::And, token.span)),
            _ => None,
        }) {
            expr = Expr::Logical(LogicalExpr {
                left: Box::new(expr),
                operator,
                right: Box::new(self.parse_equality()?),
            });
        }

        Ok(expr)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParserError> {
        let mut expr = self.parse_comparison()?;

        while let Some(operator) = self.consume_match(|token| match token.token_type {
            TokenType::BangEqual => Some(WithSpan::new(BinaryOperator::NotEqualTo, token.span)),
            TokenType::EqualEqual => Some(WithSpan::new(BinaryOperator::EqualTo, token.span)),
            _ => None,
        }) {
            expr = Expr::Binary(BinaryExpr {
                left: Box::new(expr),
                operator,
                right: Box::new(self.parse_comparison()?),
            });
        }

        Ok(expr)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParserError> {
        let mut expr = self.parse_addition()?;

        while let Some(operator) = self.consume_match(|token| match token.token_type {
            TokenType::Less => Some(WithSpan::new(BinaryOperator::LessThan, token.span)),
            TokenType::LessEqual => {
                Some(WithSpan::new(BinaryOperator::LessThanOrEqualTo, token.span))
            }
            TokenType::Greater => Some(WithSpan::new(BinaryOperator::GreaterThan, token.span)),
            TokenType::GreaterEqual => Some(WithSpan::new(
                BinaryOperator::GreaterThanOrEqualTo,
                token.span,
            )),
            _ => None,
        }) {
            expr = Expr::Binary(BinaryExpr {
                left: Box::new(expr),
                operator,
                right: Box::new(self.parse_addition()?),
            });
        }

        Ok(expr)
    }

    fn parse_addition(&mut self) -> Result<Expr, ParserError> {
        let mut expr = self.parse_multiplication()?;

        while let Some(operator) = self.consume_match(|token| match token.token_type {
            TokenType::Minus => Some(WithSpan::new(BinaryOperator::Minus, token.span)),
            TokenType::Plus => Some(WithSpan::new(BinaryOperator::Plus, token.span)),
            _ => None,
        }) {
            expr = Expr::Binary(BinaryExpr {
                left: Box::new(expr),
                operator,
                right: Box::new(self.parse_multiplication()?),
            });
        }

        Ok(expr)
    }

    fn parse_multiplication(&mut self) -> Result<Expr, ParserError> {
        let mut expr = self.parse_unary()?;

        while let Some(operator) = self.consume_match(|token| match token.token_type {
            TokenType::Star => Some(WithSpan::new(BinaryOperator::Multiply, token.span)),
            TokenType::Slash => Some(WithSpan::new(BinaryOperator::Divide, token.span)),
            _ => None,
        }) {
            expr = Expr::Binary(BinaryExpr {
                left: Box::new(expr),
                operator,
                right: Box::new(self.parse_unary()?),
            });
        }

        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParserError> {
        // A binary operator with nothing to its left: consume and discard
        // the right-hand operand, then report against the operator.
        if let Some((operator, found_at)) = self.consume_match(|token| match token.token_type {
            TokenType::Plus => Some(("+", token.span)),
            TokenType::Star => Some(("*", token.span)),
            TokenType::Slash => Some(("/", token.span)),
            _ => None,
        }) {
            if operator == "+" {
                self.parse_multiplication()?;
            } else {
                self.parse_unary()?;
            }
            return Err(ParserError::MissingLeftOperand {
                operator: operator.to_string(),
                found_at,
            });
        }

        if let Some(operator) = self.consume_match(|token| match token.token_type {
            TokenType::Minus => Some(WithSpan::new(UnaryOperator::Minus, token.span)),
            TokenType::Bang => Some(WithSpan::new(UnaryOperator::Not, token.span)),
            _ => None,
        }) {
            return Ok(Expr::Unary(UnaryExpr {
                operator,
                right: Box::new(self.parse_unary()?),
            }));
        }

        self.parse_call()
    }

    fn parse_call(&mut self) -> Result<Expr, ParserError> {
        let mut expr = self.parse_primary()?;

        loop {
            if let Some(open_span) = self.consume_match(|token| match token.token_type {
                TokenType::OpenParen => Some(token.span),
                _ => None,
            }) {
                expr = self.finish_call(expr, open_span)?;
            } else if self
                .consume_match(|token| match token.token_type {
                    TokenType::Dot => Some(()),
                    _ => None,
                })
                .is_some()
            {
                let name = self.parse_identifier("property name")?;
                expr = Expr::Get(GetExpr {
                    object: Box::new(expr),
                    name,
                });
            } else {
                return Ok(expr);
            }
        }
    }

    fn finish_call(&mut self, callee: Expr, open_span: SourceSpan) -> Result<Expr, ParserError> {
        let mut arguments = Vec::new();
        if !self.check(&TokenType::CloseParen) {
            loop {
                if arguments.len() >= 8 {
                    let found_at = self.peek().span;
                    self.recovered_errors
                        .push(ParserError::TooManyArguments { found_at });
                }
                arguments.push(self.parse_expr()?);
                if !self.consume_comma() {
                    break;
                }
            }
        }
        let close_paren_span = if self.consume_token(TokenType::CloseParen) {
            self.previous().span
        } else {
            let token = self.peek();
            return Err(ParserError::UnmatchedParenthesis {
                opener: open_span,
                found_token_type: (&token.token_type).into(),
                found_at: token.span,
            });
        };
        Ok(Expr::Call(CallExpr {
            callee: Box::new(callee),
            arguments,
            close_paren_span,
        }))
    }

    fn parse_primary(&mut self) -> Result<Expr, ParserError> {
        if let Some(literal) = self.consume_match(|token| {
            let value = match &token.token_type {
                TokenType::False => LiteralValue::Boolean(false),
                TokenType::True => LiteralValue::Boolean(true),
                TokenType::Nil => LiteralValue::Nil,
                TokenType::Number(number) => LiteralValue::Number(*number),
                _ => return None,
            };
            Some(LiteralExpr {
                value,
                source_span: token.span,
            })
        }) {
            return Ok(Expr::Literal(literal));
        }

        // Adjacent string literals concatenate into a single literal.
        if let Some((first, span)) = self.consume_match(|token| match &token.token_type {
            TokenType::String(string) => Some((string.clone(), token.span)),
            _ => None,
        }) {
            let mut value = first;
            let mut end = span.end();
            while let Some((next, next_span)) = self.consume_match(|token| {
                match &token.token_type {
                    TokenType::String(string) => Some((string.clone(), token.span)),
                    _ => None,
                }
            }) {
                value.push_str(&next);
                end = next_span.end();
            }
            return Ok(Expr::Literal(LiteralExpr {
                value: LiteralValue::String(value),
                source_span: SourceSpan::range(span.start(), end),
            }));
        }

        if let Some(keyword) = self.consume_match(|token| match token.token_type {
            TokenType::This => Some(Identifier::new(
                crate::keywords::THIS.to_string(),
                token.span,
            )),
            _ => None,
        }) {
            return Ok(Expr::This(ThisExpr { keyword }));
        }

        if let Some(keyword) = self.consume_match(|token| match token.token_type {
            TokenType::Super => Some(Identifier::new(
                crate::keywords::SUPER.to_string(),
                token.span,
            )),
            _ => None,
        }) {
            self.consume_token_or_error(TokenType::Dot)?;
            let method = self.parse_identifier("superclass method name")?;
            return Ok(Expr::Super(SuperExpr { keyword, method }));
        }

        if let Some(opening_span) = self.consume_match(|token| match token.token_type {
            TokenType::OpenParen => Some(token.span),
            _ => None,
        }) {
            let expr = self.parse_expr()?;
            if !self.consume_token(TokenType::CloseParen) {
                let token = self.peek();
                return Err(ParserError::UnmatchedParenthesis {
                    opener: opening_span,
                    found_token_type: (&token.token_type).into(),
                    found_at: token.span,
                });
            }
            return Ok(Expr::Grouping(GroupingExpr {
                expr: Box::new(expr),
            }));
        }

        if let Some(identifier) = self.consume_match(|token| match &token.token_type {
            TokenType::Identifier(name) => Some(Identifier::new(name.clone(), token.span)),
            _ => None,
        }) {
            return Ok(Expr::Variable(VariableExpr { identifier }));
        }

        if let Some(keyword_span) = self.consume_match(|token| match token.token_type {
            TokenType::Fun => Some(token.span),
            _ => None,
        }) {
            let fun = self.parse_function(None, keyword_span, false)?;
            return Ok(Expr::Function(FunctionExpr { fun }));
        }

        if let Some(found_at) = self.consume_match(|token| match token.token_type {
            TokenType::Static => Some(token.span),
            _ => None,
        }) {
            return Err(ParserError::StaticOutsideClass { found_at });
        }

        let token = self.peek();
        Err(ParserError::UnexpectedExpressionToken {
            actual: (&token.token_type).into(),
            found_at: token.span,
        })
    }

    fn parse_identifier(&mut self, what: &'static str) -> Result<Identifier, ParserError> {
        match self.consume_match(|token| match &token.token_type {
            TokenType::Identifier(name) => Some(Identifier::new(name.clone(), token.span)),
            _ => None,
        }) {
            Some(identifier) => Ok(identifier),
            None => {
                let token = self.peek();
                Err(ParserError::ExpectedIdentifier {
                    what,
                    actual: (&token.token_type).into(),
                    found_at: token.span,
                })
            }
        }
    }

    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous().token_type == TokenType::Semicolon {
                return;
            }
            match self.peek().token_type {
                TokenType::Class
                | TokenType::Fun
                | TokenType::Var
                | TokenType::For
                | TokenType::If
                | TokenType::While
                | TokenType::Return => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn peek_next(&self) -> Option<&Token> {
        self.tokens.get(self.current + 1)
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::Eof
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn advance_span(&mut self) -> SourceSpan {
        self.advance().span
    }

    fn check(&self, token_type: &TokenType) -> bool {
        !self.is_at_end() && self.peek().token_type == *token_type
    }

    fn consume_match<T, F: Fn(&Token) -> Option<T>>(&mut self, check: F) -> Option<T> {
        if self.is_at_end() {
            return None;
        }
        match check(self.peek()) {
            Some(value) => {
                self.advance();
                Some(value)
            }
            None => None,
        }
    }

    fn consume_token(&mut self, token_type: TokenType) -> bool {
        if self.check(&token_type) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume_token_or_error(&mut self, token_type: TokenType) -> Result<SourceSpan, ParserError> {
        if self.check(&token_type) {
            Ok(self.advance_span())
        } else {
            let token = self.peek();
            Err(ParserError::ExpectedToken {
                expected: (&token_type).into(),
                actual: (&token.token_type).into(),
                found_at: token.span,
            })
        }
    }

    fn consume_statement_end_semicolon(&mut self) -> Result<SourceSpan, ParserError> {
        if self.check(&TokenType::Semicolon) {
            Ok(self.advance_span())
        } else {
            let token = self.peek();
            Err(ParserError::ExpectedSemicolon {
                actual: (&token.token_type).into(),
                found_at: token.span,
            })
        }
    }

    fn consume_comma(&mut self) -> bool {
        self.consume_token(TokenType::Comma)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Scanner;
    use pretty_assertions::assert_eq;

    fn parse_source(source: &str) -> (Program, Vec<ParserError>) {
        let tokens = Scanner::new(source)
            .map(|result| result.expect("unexpected scan error"))
            .collect();
        Parser::parse(tokens, SourceReference::new("<test>", source))
    }

    fn single_expr(program: &Program) -> &Expr {
        match &program.statements[..] {
            [DeclOrStmt::Stmt(Stmt::Expr(stmt))] => &stmt.expression,
            other => panic!("expected a single expression statement, got {:?}", other),
        }
    }

    #[test]
    fn augmented_assignment_desugars_to_binary() {
        let (program, errors) = parse_source("x += 2;");
        assert!(errors.is_empty());
        match single_expr(&program) {
            Expr::Assign(assign) => {
                assert_eq!(assign.target.name, "x");
                match assign.value.as_ref() {
                    Expr::Binary(binary) => {
                        assert!(matches!(*binary.operator.inner(), BinaryOperator::Plus));
                        match binary.left.as_ref() {
                            Expr::Variable(variable) => {
                                // the synthesized read shares the target's identity
                                assert_eq!(variable.identifier.id, assign.target.id);
                            }
                            other => panic!("expected variable read, got {:?}", other),
                        }
                    }
                    other => panic!("expected binary value, got {:?}", other),
                }
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn augmented_assignment_on_property_desugars_to_set() {
        let (program, errors) = parse_source("a.b *= 3;");
        assert!(errors.is_empty());
        match single_expr(&program) {
            Expr::Set(set) => {
                assert_eq!(set.name.name, "b");
                assert!(matches!(set.value.as_ref(), Expr::Binary(_)));
            }
            other => panic!("expected property set, got {:?}", other),
        }
    }

    #[test]
    fn invalid_assignment_target_is_reported_but_recovered() {
        let (_, errors) = parse_source("1 = 2;");
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            ParserError::InvalidAssignmentTarget { .. }
        ));
    }

    #[test]
    fn ternary_is_right_associative() {
        let (program, errors) = parse_source("a ? b : c ? d : e;");
        assert!(errors.is_empty());
        match single_expr(&program) {
            Expr::Ternary(ternary) => match ternary.else_branch.as_ref() {
                Expr::Ternary(_) => {}
                other => panic!("expected nested ternary in else branch, got {:?}", other),
            },
            other => panic!("expected ternary, got {:?}", other),
        }
    }

    #[test]
    fn adjacent_string_literals_concatenate() {
        let (program, errors) = parse_source("\"foo\" \"bar\";");
        assert!(errors.is_empty());
        match single_expr(&program) {
            Expr::Literal(literal) => {
                assert_eq!(literal.value, LiteralValue::String("foobar".to_string()));
            }
            other => panic!("expected literal, got {:?}", other),
        }
    }

    #[test]
    fn arrow_function_synthesizes_a_return() {
        let (program, errors) = parse_source("function double(x) => x * 2;");
        assert!(errors.is_empty());
        match &program.statements[..] {
            [DeclOrStmt::Decl(Decl::Fun(decl))] => match &decl.fun.body[..] {
                [DeclOrStmt::Stmt(Stmt::Return(ret))] => assert!(ret.value.is_some()),
                other => panic!("expected synthesized return, got {:?}", other),
            },
            other => panic!("expected function declaration, got {:?}", other),
        }
    }

    #[test]
    fn anonymous_function_parses_in_expression_position() {
        let (program, errors) = parse_source("(function (x) => x)(1);");
        assert!(errors.is_empty());
        match single_expr(&program) {
            Expr::Call(call) => match call.callee.as_ref() {
                Expr::Grouping(grouping) => {
                    assert!(matches!(grouping.expr.as_ref(), Expr::Function(_)))
                }
                other => panic!("expected grouped function, got {:?}", other),
            },
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn more_than_eight_arguments_is_reported() {
        let (_, errors) = parse_source("f(1, 2, 3, 4, 5, 6, 7, 8, 9);");
        assert!(errors
            .iter()
            .any(|err| matches!(err, ParserError::TooManyArguments { .. })));
    }

    #[test]
    fn missing_left_operand_is_reported() {
        let (_, errors) = parse_source("* 2;");
        assert!(errors
            .iter()
            .any(|err| matches!(err, ParserError::MissingLeftOperand { .. })));
    }

    #[test]
    fn static_outside_class_is_reported() {
        let (_, errors) = parse_source("static;");
        assert!(errors
            .iter()
            .any(|err| matches!(err, ParserError::StaticOutsideClass { .. })));
    }

    #[test]
    fn synchronization_reports_multiple_errors() {
        let (program, errors) = parse_source("var = 1;\nvar ok = 2;\n+ 3;\nvar fine = 4;");
        assert_eq!(errors.len(), 2);
        // the two well-formed declarations survive
        assert_eq!(program.statements.len(), 2);
    }

    #[test]
    fn var_list_parses_items_with_const_annotations() {
        let (program, errors) = parse_source("var a : const = 1, b, c = 3;");
        assert!(errors.is_empty());
        match &program.statements[..] {
            [DeclOrStmt::Decl(Decl::Var(decl))] => {
                assert_eq!(decl.items.len(), 3);
                assert!(decl.items[0].initializer.is_some());
                assert!(decl.items[1].initializer.is_none());
                assert!(decl.items[2].initializer.is_some());
            }
            other => panic!("expected var declaration, got {:?}", other),
        }
    }

    #[test]
    fn class_with_methods_and_superclass() {
        let (program, errors) = parse_source(
            "class Square inherits Shape { function __init__(n) { this.n = n; } static function unit() => Square(1); }",
        );
        assert!(errors.is_empty());
        match &program.statements[..] {
            [DeclOrStmt::Decl(Decl::Class(decl))] => {
                assert_eq!(decl.name.name, "Square");
                assert_eq!(
                    decl.superclass.as_ref().map(|s| s.identifier.name.as_str()),
                    Some("Shape")
                );
                assert_eq!(decl.methods.len(), 2);
                assert!(!decl.methods[0].is_static);
                assert!(decl.methods[1].is_static);
            }
            other => panic!("expected class declaration, got {:?}", other),
        }
    }
}
