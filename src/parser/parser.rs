use crate::parser::ast::*;
use crate::parser::lexer::{LexError, Lexer, Token};
use std::fmt;

/// Parser error type
#[derive(Debug)]
pub struct ParseError {
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Parse error at line {}, column {}: {}",
            self.location.line, self.location.column, self.message
        )
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            message: err.message,
            location: err.location,
        }
    }
}

/// Recursive descent parser for the JavaScript subset
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    /// How many loops enclose the cursor; function bodies reset it
    loop_depth: usize,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize()?;
        Ok(Self {
            tokens,
            position: 0,
            loop_depth: 0,
        })
    }

    /// Parse the entire program (top-level statement list)
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut program = Program::new();

        while !self.is_at_end() {
            program.body.push(self.parse_statement()?);
        }

        Ok(program)
    }

    /// Parse a statement
    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let loc = self.current_location();

        if self.check(&Token::Let(loc)) || self.check(&Token::Const(loc)) || self.check(&Token::Var(loc)) {
            return self.parse_var_declaration();
        }

        if self.check(&Token::Function(loc)) {
            return self.parse_function_declaration();
        }

        if self.match_token(&Token::Return(loc)) {
            return self.parse_return_statement(loc);
        }

        if self.match_token(&Token::If(loc)) {
            return self.parse_if_statement(loc);
        }

        if self.match_token(&Token::While(loc)) {
            return self.parse_while_statement(loc);
        }

        if self.match_token(&Token::Do(loc)) {
            return self.parse_do_while_statement(loc);
        }

        if self.match_token(&Token::For(loc)) {
            return self.parse_for_statement(loc);
        }

        if self.match_token(&Token::Break(loc)) {
            if self.loop_depth == 0 {
                return Err(ParseError {
                    message: "Illegal break statement".to_string(),
                    location: loc,
                });
            }
            self.end_statement()?;
            return Ok(Stmt::Break { location: loc });
        }

        if self.match_token(&Token::Continue(loc)) {
            if self.loop_depth == 0 {
                return Err(ParseError {
                    message: "Illegal continue statement".to_string(),
                    location: loc,
                });
            }
            self.end_statement()?;
            return Ok(Stmt::Continue { location: loc });
        }

        if self.match_token(&Token::LBrace(loc)) {
            let body = self.parse_block_statements()?;
            self.expect_token(&Token::RBrace(loc), "Expected '}' after block")?;
            return Ok(Stmt::Block {
                body,
                location: loc,
            });
        }

        // Stray semicolons are empty statements
        if self.match_token(&Token::Semicolon(loc)) {
            return Ok(Stmt::Block {
                body: Vec::new(),
                location: loc,
            });
        }

        // Otherwise, an expression statement
        let expr = self.parse_expression()?;
        self.end_statement()?;
        Ok(Stmt::Expression {
            expr,
            location: loc,
        })
    }

    /// Parse `let`/`const`/`var` declaration with one or more declarators
    fn parse_var_declaration(&mut self) -> Result<Stmt, ParseError> {
        let loc = self.current_location();
        let kind = if self.match_token(&Token::Let(loc)) {
            DeclKind::Let
        } else if self.match_token(&Token::Const(loc)) {
            DeclKind::Const
        } else {
            self.expect_token(&Token::Var(loc), "Expected declaration keyword")?;
            DeclKind::Var
        };

        let mut declarators = Vec::new();
        loop {
            let name = self.expect_identifier()?;
            let init = if self.match_token(&Token::Eq(self.current_location())) {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            declarators.push(Declarator { name, init });

            if !self.match_token(&Token::Comma(self.current_location())) {
                break;
            }
        }

        self.end_statement()?;
        Ok(Stmt::VarDecl {
            kind,
            declarators,
            location: loc,
        })
    }

    /// Parse `function name(params) { body }`
    fn parse_function_declaration(&mut self) -> Result<Stmt, ParseError> {
        let loc = self.current_location();
        self.expect_token(&Token::Function(loc), "Expected 'function'")?;
        let name = self.expect_identifier()?;

        self.expect_token(&Token::LParen(self.current_location()), "Expected '(' after function name")?;
        let params = self.parse_parameter_list()?;
        self.expect_token(&Token::RParen(self.current_location()), "Expected ')' after parameters")?;
        self.expect_token(&Token::LBrace(self.current_location()), "Expected '{' before function body")?;
        let body = self.parse_function_block()?;
        self.expect_token(&Token::RBrace(self.current_location()), "Expected '}' after function body")?;

        Ok(Stmt::FunctionDecl {
            function: Function {
                name: Some(name),
                params,
                body: FnBody::Block(body),
            },
            location: loc,
        })
    }

    /// Parse parameter list: (name [= default], ...)
    fn parse_parameter_list(&mut self) -> Result<Vec<Param>, ParseError> {
        let mut params = Vec::new();

        if self.check(&Token::RParen(self.current_location())) {
            return Ok(params);
        }

        loop {
            let name = self.expect_identifier()?;
            let default = if self.match_token(&Token::Eq(self.current_location())) {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            params.push(Param { name, default });

            if !self.match_token(&Token::Comma(self.current_location())) {
                break;
            }
        }

        Ok(params)
    }

    /// Parse return statement; a line break after `return` means a bare return
    fn parse_return_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        let next = self.peek();
        let expr = if matches!(next, Token::Semicolon(_) | Token::RBrace(_) | Token::Eof(_))
            || next.location().line > loc.line
        {
            None
        } else {
            Some(self.parse_expression()?)
        };

        self.end_statement()?;
        Ok(Stmt::Return { expr, location: loc })
    }

    /// Parse if statement
    fn parse_if_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        self.expect_token(&Token::LParen(loc), "Expected '(' after 'if'")?;
        let condition = self.parse_expression()?;
        self.expect_token(&Token::RParen(self.current_location()), "Expected ')' after if condition")?;

        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.match_token(&Token::Else(self.current_location())) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
            location: loc,
        })
    }

    /// Parse while statement
    fn parse_while_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        self.expect_token(&Token::LParen(loc), "Expected '(' after 'while'")?;
        let condition = self.parse_expression()?;
        self.expect_token(&Token::RParen(self.current_location()), "Expected ')' after while condition")?;
        let body = Box::new(self.parse_loop_body()?);

        Ok(Stmt::While {
            condition,
            body,
            location: loc,
        })
    }

    /// Parse do-while statement
    fn parse_do_while_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        let body = Box::new(self.parse_loop_body()?);

        self.expect_token(&Token::While(self.current_location()), "Expected 'while' after do body")?;
        self.expect_token(&Token::LParen(self.current_location()), "Expected '(' after 'while'")?;
        let condition = self.parse_expression()?;
        self.expect_token(&Token::RParen(self.current_location()), "Expected ')' after do-while condition")?;
        self.end_statement()?;

        Ok(Stmt::DoWhile {
            body,
            condition,
            location: loc,
        })
    }

    /// Parse classic `for (init; test; update)` or `for (decl of iterable)`
    fn parse_for_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        self.expect_token(&Token::LParen(loc), "Expected '(' after 'for'")?;

        // for..of: declaration keyword, binding, contextual `of`
        if let Some(kind) = self.peek_decl_kind() {
            if matches!(self.peek_ahead(1), Some(Token::Ident(_, _)))
                && matches!(self.peek_ahead(2), Some(Token::Ident(word, _)) if word == "of")
            {
                self.advance(); // declaration keyword
                let binding = self.expect_identifier()?;
                self.advance(); // `of`
                let iterable = self.parse_expression()?;
                self.expect_token(&Token::RParen(self.current_location()), "Expected ')' after for..of")?;
                let body = Box::new(self.parse_loop_body()?);
                return Ok(Stmt::ForOf {
                    kind,
                    binding,
                    iterable,
                    body,
                    location: loc,
                });
            }
        }

        // Init (optional): declaration or expression
        let init = if self.match_token(&Token::Semicolon(self.current_location())) {
            None
        } else if self.peek_decl_kind().is_some() {
            // parse_var_declaration consumes the ';' via end_statement
            Some(Box::new(self.parse_var_declaration()?))
        } else {
            let init_loc = self.current_location();
            let expr = self.parse_expression()?;
            self.expect_token(&Token::Semicolon(self.current_location()), "Expected ';' after for init")?;
            Some(Box::new(Stmt::Expression {
                expr,
                location: init_loc,
            }))
        };

        // Test (optional)
        let test = if self.check(&Token::Semicolon(self.current_location())) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_token(&Token::Semicolon(self.current_location()), "Expected ';' after for condition")?;

        // Update (optional)
        let update = if self.check(&Token::RParen(self.current_location())) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_token(&Token::RParen(self.current_location()), "Expected ')' after for clauses")?;

        let body = Box::new(self.parse_loop_body()?);

        Ok(Stmt::For {
            init,
            test,
            update,
            body,
            location: loc,
        })
    }

    /// Parse a loop body, with `break`/`continue` legal inside it
    fn parse_loop_body(&mut self) -> Result<Stmt, ParseError> {
        self.loop_depth += 1;
        let body = self.parse_statement();
        self.loop_depth -= 1;
        body
    }

    /// Parse a function body; an enclosing loop does not reach into it, so
    /// a `break` directly inside is illegal again
    fn parse_function_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let saved = std::mem::replace(&mut self.loop_depth, 0);
        let body = self.parse_block_statements();
        self.loop_depth = saved;
        body
    }

    /// Parse statements inside braces, excluding the braces themselves
    fn parse_block_statements(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = Vec::new();

        while !self.check(&Token::RBrace(self.current_location())) && !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }

        Ok(statements)
    }

    /// Consume a statement terminator. A literal ';' always works; otherwise
    /// the statement ends if the next token is '}', end of input, or starts a
    /// new line (pragmatic automatic semicolon insertion).
    fn end_statement(&mut self) -> Result<(), ParseError> {
        if self.match_token(&Token::Semicolon(self.current_location())) {
            return Ok(());
        }
        if matches!(self.peek(), Token::RBrace(_) | Token::Eof(_)) {
            return Ok(());
        }
        if self.position > 0 && self.current_location().line > self.previous_location().line {
            return Ok(());
        }
        Err(ParseError {
            message: format!("Expected ';' before {}", self.peek()),
            location: self.current_location(),
        })
    }

    // ===== Expressions =====

    /// Parse expression (top-level entry point)
    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_assignment()
    }

    /// Parse assignment (right-associative), or an arrow function
    fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        if self.arrow_ahead() {
            return self.parse_arrow_function();
        }

        let expr = self.parse_conditional()?;

        let loc = self.current_location();
        let op = if self.match_token(&Token::Eq(loc)) {
            Some(AssignOp::Assign)
        } else if self.match_token(&Token::PlusEq(loc)) {
            Some(AssignOp::Add)
        } else if self.match_token(&Token::MinusEq(loc)) {
            Some(AssignOp::Sub)
        } else if self.match_token(&Token::StarEq(loc)) {
            Some(AssignOp::Mul)
        } else if self.match_token(&Token::SlashEq(loc)) {
            Some(AssignOp::Div)
        } else if self.match_token(&Token::PercentEq(loc)) {
            Some(AssignOp::Mod)
        } else {
            None
        };

        if let Some(op) = op {
            if !matches!(expr, Expr::Identifier(_, _) | Expr::Member { .. }) {
                return Err(ParseError {
                    message: "Invalid assignment target".to_string(),
                    location: expr.location(),
                });
            }
            let value = Box::new(self.parse_assignment()?);
            return Ok(Expr::Assignment {
                target: Box::new(expr),
                op,
                value,
                location: loc,
            });
        }

        Ok(expr)
    }

    /// Look ahead for an arrow function head: `x =>` or `( ... ) =>`
    fn arrow_ahead(&self) -> bool {
        match self.peek() {
            Token::Ident(_, _) => matches!(self.peek_ahead(1), Some(Token::Arrow(_))),
            Token::LParen(_) => {
                let mut depth = 0usize;
                let mut offset = 0usize;
                loop {
                    match self.peek_ahead(offset) {
                        Some(Token::LParen(_)) => depth += 1,
                        Some(Token::RParen(_)) => {
                            depth -= 1;
                            if depth == 0 {
                                return matches!(
                                    self.peek_ahead(offset + 1),
                                    Some(Token::Arrow(_))
                                );
                            }
                        }
                        Some(Token::Eof(_)) | None => return false,
                        _ => {}
                    }
                    offset += 1;
                }
            }
            _ => false,
        }
    }

    /// Parse an arrow function: `x => body` or `(a, b = 1) => body`
    fn parse_arrow_function(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();

        let params = if let Token::Ident(name, _) = self.peek_token() {
            self.advance();
            vec![Param {
                name,
                default: None,
            }]
        } else {
            self.expect_token(&Token::LParen(loc), "Expected '(' in arrow function")?;
            let params = self.parse_parameter_list()?;
            self.expect_token(&Token::RParen(self.current_location()), "Expected ')' after arrow parameters")?;
            params
        };

        self.expect_token(&Token::Arrow(self.current_location()), "Expected '=>'")?;

        let body = if self.match_token(&Token::LBrace(self.current_location())) {
            let body = self.parse_function_block()?;
            self.expect_token(&Token::RBrace(self.current_location()), "Expected '}' after arrow body")?;
            FnBody::Block(body)
        } else {
            FnBody::Expr(Box::new(self.parse_assignment()?))
        };

        Ok(Expr::Function {
            function: Box::new(Function {
                name: None,
                params,
                body,
            }),
            location: loc,
        })
    }

    /// Parse ternary: condition ? consequent : alternate
    fn parse_conditional(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_nullish()?;

        if self.match_token(&Token::Question(self.current_location())) {
            let loc = self.previous_location();
            let consequent = Box::new(self.parse_assignment()?);
            self.expect_token(&Token::Colon(self.current_location()), "Expected ':' in conditional expression")?;
            let alternate = Box::new(self.parse_assignment()?);

            return Ok(Expr::Conditional {
                condition: Box::new(expr),
                consequent,
                alternate,
                location: loc,
            });
        }

        Ok(expr)
    }

    /// Parse nullish coalescing (??)
    fn parse_nullish(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_logical_or()?;

        while self.match_token(&Token::QuestionQuestion(self.current_location())) {
            let loc = self.previous_location();
            let right = Box::new(self.parse_logical_or()?);
            left = Expr::Logical {
                op: LogicalOp::Nullish,
                left: Box::new(left),
                right,
                location: loc,
            };
        }

        Ok(left)
    }

    /// Parse logical OR (||)
    fn parse_logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_logical_and()?;

        while self.match_token(&Token::OrOr(self.current_location())) {
            let loc = self.previous_location();
            let right = Box::new(self.parse_logical_and()?);
            left = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right,
                location: loc,
            };
        }

        Ok(left)
    }

    /// Parse logical AND (&&)
    fn parse_logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;

        while self.match_token(&Token::AndAnd(self.current_location())) {
            let loc = self.previous_location();
            let right = Box::new(self.parse_equality()?);
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right,
                location: loc,
            };
        }

        Ok(left)
    }

    /// Parse equality (== != === !==)
    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_relational()?;

        loop {
            let loc = self.current_location();
            let op = if self.match_token(&Token::EqEqEq(loc)) {
                BinOp::StrictEq
            } else if self.match_token(&Token::NotEqEq(loc)) {
                BinOp::StrictNe
            } else if self.match_token(&Token::EqEq(loc)) {
                BinOp::Eq
            } else if self.match_token(&Token::NotEq(loc)) {
                BinOp::Ne
            } else {
                break;
            };

            let right = Box::new(self.parse_relational()?);
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right,
                location: loc,
            };
        }

        Ok(left)
    }

    /// Parse relational (< <= > >=)
    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;

        loop {
            let loc = self.current_location();
            let op = if self.match_token(&Token::Lt(loc)) {
                BinOp::Lt
            } else if self.match_token(&Token::Le(loc)) {
                BinOp::Le
            } else if self.match_token(&Token::Gt(loc)) {
                BinOp::Gt
            } else if self.match_token(&Token::Ge(loc)) {
                BinOp::Ge
            } else {
                break;
            };

            let right = Box::new(self.parse_additive()?);
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right,
                location: loc,
            };
        }

        Ok(left)
    }

    /// Parse additive (+ -)
    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let loc = self.current_location();
            let op = if self.match_token(&Token::Plus(loc)) {
                BinOp::Add
            } else if self.match_token(&Token::Minus(loc)) {
                BinOp::Sub
            } else {
                break;
            };

            let right = Box::new(self.parse_multiplicative()?);
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right,
                location: loc,
            };
        }

        Ok(left)
    }

    /// Parse multiplicative (* / %)
    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_exponent()?;

        loop {
            let loc = self.current_location();
            let op = if self.match_token(&Token::Star(loc)) {
                BinOp::Mul
            } else if self.match_token(&Token::Slash(loc)) {
                BinOp::Div
            } else if self.match_token(&Token::Percent(loc)) {
                BinOp::Mod
            } else {
                break;
            };

            let right = Box::new(self.parse_exponent()?);
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right,
                location: loc,
            };
        }

        Ok(left)
    }

    /// Parse exponentiation (**), right-associative
    fn parse_exponent(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_unary()?;

        if self.match_token(&Token::StarStar(self.current_location())) {
            let loc = self.previous_location();
            let right = Box::new(self.parse_exponent()?);
            return Ok(Expr::Binary {
                op: BinOp::Pow,
                left: Box::new(left),
                right,
                location: loc,
            });
        }

        Ok(left)
    }

    /// Parse unary (! - + typeof) and prefix ++/--
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();

        if self.match_token(&Token::Bang(loc)) {
            let operand = Box::new(self.parse_unary()?);
            return Ok(Expr::Unary {
                op: UnOp::Not,
                operand,
                location: loc,
            });
        }

        if self.match_token(&Token::Minus(loc)) {
            let operand = Box::new(self.parse_unary()?);
            return Ok(Expr::Unary {
                op: UnOp::Neg,
                operand,
                location: loc,
            });
        }

        if self.match_token(&Token::Plus(loc)) {
            let operand = Box::new(self.parse_unary()?);
            return Ok(Expr::Unary {
                op: UnOp::Pos,
                operand,
                location: loc,
            });
        }

        if self.match_token(&Token::Typeof(loc)) {
            let operand = Box::new(self.parse_unary()?);
            return Ok(Expr::Unary {
                op: UnOp::Typeof,
                operand,
                location: loc,
            });
        }

        if self.match_token(&Token::PlusPlus(loc)) {
            let target = Box::new(self.parse_unary()?);
            return Ok(Expr::Update {
                op: UpdateOp::Inc,
                prefix: true,
                target,
                location: loc,
            });
        }

        if self.match_token(&Token::MinusMinus(loc)) {
            let target = Box::new(self.parse_unary()?);
            return Ok(Expr::Update {
                op: UpdateOp::Dec,
                prefix: true,
                target,
                location: loc,
            });
        }

        self.parse_postfix()
    }

    /// Parse postfix ++/--
    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_call_member()?;

        let loc = self.current_location();
        if self.match_token(&Token::PlusPlus(loc)) {
            return Ok(Expr::Update {
                op: UpdateOp::Inc,
                prefix: false,
                target: Box::new(expr),
                location: loc,
            });
        }
        if self.match_token(&Token::MinusMinus(loc)) {
            return Ok(Expr::Update {
                op: UpdateOp::Dec,
                prefix: false,
                target: Box::new(expr),
                location: loc,
            });
        }

        Ok(expr)
    }

    /// Parse calls and member accesses (`f(x)`, `a.b`, `a[i]`), left to right
    fn parse_call_member(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            let loc = self.current_location();

            if self.match_token(&Token::LParen(loc)) {
                let args = self.parse_argument_list()?;
                self.expect_token(&Token::RParen(self.current_location()), "Expected ')' after arguments")?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                    location: loc,
                };
            } else if self.match_token(&Token::Dot(loc)) {
                let name = self.expect_identifier()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property: MemberKey::Static(name),
                    location: loc,
                };
            } else if self.match_token(&Token::LBracket(loc)) {
                let index = self.parse_expression()?;
                self.expect_token(&Token::RBracket(self.current_location()), "Expected ']' after index")?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property: MemberKey::Computed(Box::new(index)),
                    location: loc,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// Parse argument list: expr, expr, ...
    fn parse_argument_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();

        if self.check(&Token::RParen(self.current_location())) {
            return Ok(args);
        }

        loop {
            args.push(self.parse_assignment()?);

            if !self.match_token(&Token::Comma(self.current_location())) {
                break;
            }
        }

        Ok(args)
    }

    /// Parse primary (literals, identifiers, array/object literals,
    /// function expressions, `new`, parenthesized expressions)
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();

        if let Token::Number(n, loc) = self.peek_token() {
            self.advance();
            return Ok(Expr::Number(n, loc));
        }

        if let Token::Str(s, loc) = self.peek_token() {
            self.advance();
            return Ok(Expr::Str(s, loc));
        }

        if self.match_token(&Token::True(loc)) {
            return Ok(Expr::Bool(true, loc));
        }

        if self.match_token(&Token::False(loc)) {
            return Ok(Expr::Bool(false, loc));
        }

        if self.match_token(&Token::Null(loc)) {
            return Ok(Expr::Null(loc));
        }

        if self.match_token(&Token::This(loc)) {
            return Ok(Expr::This(loc));
        }

        if self.match_token(&Token::New(loc)) {
            let constructor = self.expect_identifier()?;
            let args = if self.match_token(&Token::LParen(self.current_location())) {
                let args = self.parse_argument_list()?;
                self.expect_token(&Token::RParen(self.current_location()), "Expected ')' after constructor arguments")?;
                args
            } else {
                Vec::new()
            };
            return Ok(Expr::New {
                constructor,
                args,
                location: loc,
            });
        }

        if self.check(&Token::Function(loc)) {
            return self.parse_function_expression();
        }

        if self.match_token(&Token::LBracket(loc)) {
            let mut elements = Vec::new();
            if !self.check(&Token::RBracket(self.current_location())) {
                loop {
                    elements.push(self.parse_assignment()?);
                    if !self.match_token(&Token::Comma(self.current_location())) {
                        break;
                    }
                    // Trailing comma
                    if self.check(&Token::RBracket(self.current_location())) {
                        break;
                    }
                }
            }
            self.expect_token(&Token::RBracket(self.current_location()), "Expected ']' after array literal")?;
            return Ok(Expr::Array {
                elements,
                location: loc,
            });
        }

        if self.match_token(&Token::LBrace(loc)) {
            let properties = self.parse_object_properties()?;
            self.expect_token(&Token::RBrace(self.current_location()), "Expected '}' after object literal")?;
            return Ok(Expr::Object {
                properties,
                location: loc,
            });
        }

        if let Token::Ident(name, loc) = self.peek_token() {
            self.advance();
            return Ok(Expr::Identifier(name, loc));
        }

        if self.match_token(&Token::LParen(loc)) {
            let expr = self.parse_expression()?;
            self.expect_token(&Token::RParen(self.current_location()), "Expected ')' after expression")?;
            return Ok(expr);
        }

        Err(ParseError {
            message: format!("Unexpected token: {}", self.peek()),
            location: loc,
        })
    }

    /// Parse `function [name](params) { body }` in expression position
    fn parse_function_expression(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();
        self.expect_token(&Token::Function(loc), "Expected 'function'")?;

        let name = if let Token::Ident(name, _) = self.peek_token() {
            self.advance();
            Some(name)
        } else {
            None
        };

        self.expect_token(&Token::LParen(self.current_location()), "Expected '(' after 'function'")?;
        let params = self.parse_parameter_list()?;
        self.expect_token(&Token::RParen(self.current_location()), "Expected ')' after parameters")?;
        self.expect_token(&Token::LBrace(self.current_location()), "Expected '{' before function body")?;
        let body = self.parse_function_block()?;
        self.expect_token(&Token::RBrace(self.current_location()), "Expected '}' after function body")?;

        Ok(Expr::Function {
            function: Box::new(Function {
                name,
                params,
                body: FnBody::Block(body),
            }),
            location: loc,
        })
    }

    /// Parse object literal members: `key: value`, string/number keys, and
    /// shorthand `{ name }`
    fn parse_object_properties(&mut self) -> Result<Vec<(String, Expr)>, ParseError> {
        let mut properties = Vec::new();

        if self.check(&Token::RBrace(self.current_location())) {
            return Ok(properties);
        }

        loop {
            let key = match self.peek_token() {
                Token::Ident(name, _) => {
                    self.advance();
                    name
                }
                Token::Str(s, _) => {
                    self.advance();
                    s
                }
                Token::Number(n, _) => {
                    self.advance();
                    crate::runtime::value::format_number(n)
                }
                other => {
                    return Err(ParseError {
                        message: format!("Expected property name, found {}", other),
                        location: other.location(),
                    });
                }
            };

            if self.match_token(&Token::Colon(self.current_location())) {
                let value = self.parse_assignment()?;
                properties.push((key, value));
            } else {
                // Shorthand { name }
                let loc = self.previous_location();
                properties.push((key.clone(), Expr::Identifier(key, loc)));
            }

            if !self.match_token(&Token::Comma(self.current_location())) {
                break;
            }
            // Trailing comma
            if self.check(&Token::RBrace(self.current_location())) {
                break;
            }
        }

        Ok(properties)
    }

    // ===== Helper methods =====

    /// The declaration keyword under the cursor, if any (without consuming it)
    fn peek_decl_kind(&self) -> Option<DeclKind> {
        match self.peek() {
            Token::Let(_) => Some(DeclKind::Let),
            Token::Const(_) => Some(DeclKind::Const),
            Token::Var(_) => Some(DeclKind::Var),
            _ => None,
        }
    }

    fn match_token(&mut self, token: &Token) -> bool {
        if std::mem::discriminant(self.peek()) == std::mem::discriminant(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof(_))
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn peek_token(&self) -> Token {
        self.tokens[self.position].clone()
    }

    fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.position - 1]
    }

    fn previous_location(&self) -> SourceLocation {
        self.previous().location()
    }

    fn current_location(&self) -> SourceLocation {
        self.peek().location()
    }

    fn expect_token(&mut self, token: &Token, message: &str) -> Result<(), ParseError> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError {
                message: format!("{}, found {}", message, self.peek()),
                location: self.current_location(),
            })
        }
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        if let Token::Ident(name, _) = self.peek_token() {
            self.advance();
            Ok(name)
        } else {
            Err(ParseError {
                message: format!("Expected identifier, found {}", self.peek()),
                location: self.current_location(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Program {
        Parser::new(source).unwrap().parse_program().unwrap()
    }

    #[test]
    fn test_parse_let_declaration() {
        let program = parse("let x = 1, y = 2;");
        assert_eq!(program.body.len(), 1);
        match &program.body[0] {
            Stmt::VarDecl {
                kind, declarators, ..
            } => {
                assert_eq!(*kind, DeclKind::Let);
                assert_eq!(declarators.len(), 2);
                assert_eq!(declarators[0].name, "x");
                assert_eq!(declarators[1].name, "y");
            }
            _ => panic!("Expected variable declaration"),
        }
    }

    #[test]
    fn test_parse_function_declaration() {
        let program = parse("function add(a, b = 1) { return a + b; }");
        match &program.body[0] {
            Stmt::FunctionDecl { function, .. } => {
                assert_eq!(function.name.as_deref(), Some("add"));
                assert_eq!(function.params.len(), 2);
                assert!(function.params[1].default.is_some());
            }
            _ => panic!("Expected function declaration"),
        }
    }

    #[test]
    fn test_parse_arrow_functions() {
        let program = parse("let f = x => x * 2; let g = (a, b) => { return a + b; };");
        assert_eq!(program.body.len(), 2);
        for stmt in &program.body {
            match stmt {
                Stmt::VarDecl { declarators, .. } => {
                    assert!(matches!(
                        declarators[0].init,
                        Some(Expr::Function { .. })
                    ));
                }
                _ => panic!("Expected variable declaration"),
            }
        }
    }

    #[test]
    fn test_parse_precedence() {
        let program = parse("let x = 1 + 2 * 3;");
        match &program.body[0] {
            Stmt::VarDecl { declarators, .. } => match &declarators[0].init {
                Some(Expr::Binary { op, right, .. }) => {
                    assert_eq!(*op, BinOp::Add);
                    assert!(matches!(
                        **right,
                        Expr::Binary {
                            op: BinOp::Mul,
                            ..
                        }
                    ));
                }
                _ => panic!("Expected binary expression"),
            },
            _ => panic!("Expected variable declaration"),
        }
    }

    #[test]
    fn test_parse_for_of() {
        let program = parse("for (const item of items) { console.log(item); }");
        assert!(matches!(
            &program.body[0],
            Stmt::ForOf { binding, .. } if binding == "item"
        ));
    }

    #[test]
    fn test_parse_member_chain() {
        let program = parse("obj.a[0].b();");
        match &program.body[0] {
            Stmt::Expression { expr, .. } => {
                assert!(matches!(expr, Expr::Call { .. }));
                assert_eq!(expr.to_source(), "obj.a[0].b()");
            }
            _ => panic!("Expected expression statement"),
        }
    }

    #[test]
    fn test_asi_newline_terminates() {
        let program = parse("let x = 1\nlet y = 2\nx + y");
        assert_eq!(program.body.len(), 3);
    }

    #[test]
    fn test_missing_semicolon_same_line_fails() {
        let result = Parser::new("let x = 1 let y = 2").unwrap().parse_program();
        assert!(result.is_err());
    }

    #[test]
    fn test_declaration_without_name_fails() {
        let result = Parser::new("let = ;").unwrap().parse_program();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_assignment_target_fails() {
        let result = Parser::new("1 = 2;").unwrap().parse_program();
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_object_literal() {
        let program = parse("let p = { x: 1, 'y z': 2, short };");
        match &program.body[0] {
            Stmt::VarDecl { declarators, .. } => match &declarators[0].init {
                Some(Expr::Object { properties, .. }) => {
                    assert_eq!(properties.len(), 3);
                    assert_eq!(properties[1].0, "y z");
                    assert!(matches!(&properties[2].1, Expr::Identifier(n, _) if n == "short"));
                }
                _ => panic!("Expected object literal"),
            },
            _ => panic!("Expected variable declaration"),
        }
    }

    #[test]
    fn test_break_outside_loop_fails() {
        let result = Parser::new("break;").unwrap().parse_program();
        assert!(result.is_err());
        let result = Parser::new("if (x) { break; }").unwrap().parse_program();
        assert!(result.is_err());
    }

    #[test]
    fn test_continue_outside_loop_fails() {
        let result = Parser::new("continue;").unwrap().parse_program();
        assert!(result.is_err());
    }

    #[test]
    fn test_break_and_continue_inside_loops_parse() {
        parse("while (x) { if (y) { break; } continue; }");
        parse("for (let i = 0; i < 3; i++) { break; }");
        parse("for (const item of items) { continue; }");
        parse("do { break; } while (x);");
    }

    #[test]
    fn test_break_inside_function_in_loop_fails() {
        let result = Parser::new("while (x) { let f = function () { break; }; }")
            .unwrap()
            .parse_program();
        assert!(result.is_err());
        let result = Parser::new("while (x) { let f = () => { continue; }; }")
            .unwrap()
            .parse_program();
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_new_expression() {
        let program = parse("let m = new Map();");
        match &program.body[0] {
            Stmt::VarDecl { declarators, .. } => {
                assert!(matches!(
                    &declarators[0].init,
                    Some(Expr::New { constructor, .. }) if constructor == "Map"
                ));
            }
            _ => panic!("Expected variable declaration"),
        }
    }
}
