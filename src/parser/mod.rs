//! Parsing of Culebra token streams.
//!
//! A hand-written recursive-descent parser with precedence climbing for
//! expressions. Blocks are delimited by the lexer's INDENT/DEDENT tokens, so
//! the grammar here never looks at whitespace itself.

pub mod ast;

use std::mem::discriminant;

use crate::error::{Error, Position, Result};
use crate::lexer::{Token, TokenKind};

use self::ast::{BinaryOp, Block, Expression, IfBranch, Program, Statement, UnaryOp};

pub struct Parser {
    tokens: Vec<Token>,
    index: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, index: 0 }
    }

    pub fn parse(mut self) -> Result<Program> {
        let mut statements = vec![];

        while !self.check(&TokenKind::Eof) {
            if self.check(&TokenKind::Newline) {
                self.advance();
                continue;
            }
            statements.push(self.parse_statement()?);
        }

        Ok(Program::new(statements))
    }

    fn peek(&self) -> &Token {
        // the token stream always ends with EOF, which is never consumed
        self.tokens
            .get(self.index)
            .unwrap_or_else(|| self.tokens.last().expect("token stream is never empty"))
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        discriminant(&self.peek().kind) == discriminant(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            return true;
        }
        false
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token> {
        if self.check(kind) {
            return Ok(self.advance());
        }

        let found = self.peek();
        Err(Error::syntax(
            found.position,
            format!("expected {kind}, found {}", found.kind),
        ))
    }

    fn expect_identifier(&mut self) -> Result<(String, Position)> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Ident(name) => {
                self.advance();
                Ok((name, token.position))
            }
            other => Err(Error::syntax(
                token.position,
                format!("expected identifier, found {other}"),
            )),
        }
    }

    // ------------------------------------------------------------------
    // statements
    // ------------------------------------------------------------------

    fn parse_statement(&mut self) -> Result<Statement> {
        match self.peek().kind {
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Def => self.parse_def(),
            TokenKind::Return => self.parse_return(),
            _ => {
                let statement = self.parse_simple_statement()?;
                self.expect(&TokenKind::Newline)?;
                Ok(statement)
            }
        }
    }

    /// An assignment or expression statement, without the trailing NEWLINE.
    /// Also used for the INIT and STEP clauses of `for`.
    fn parse_simple_statement(&mut self) -> Result<Statement> {
        let expr = self.parse_expression()?;
        let position = expr.position();

        if self.check(&TokenKind::Assign) {
            let assign = self.advance();
            if !expr.is_lvalue() {
                return Err(Error::syntax(
                    assign.position,
                    "invalid assignment target; expected a name or index expression",
                ));
            }
            let value = self.parse_expression()?;
            return Ok(Statement::Assignment {
                target: expr,
                value,
                position,
            });
        }

        Ok(Statement::Expression { expr, position })
    }

    /// `:` NEWLINE INDENT statement+ DEDENT
    fn parse_block(&mut self) -> Result<Block> {
        self.expect(&TokenKind::Colon)?;
        self.expect(&TokenKind::Newline)?;
        self.expect(&TokenKind::Indent)?;

        let mut statements = vec![];
        while !self.check(&TokenKind::Dedent) && !self.check(&TokenKind::Eof) {
            if self.check(&TokenKind::Newline) {
                self.advance();
                continue;
            }
            statements.push(self.parse_statement()?);
        }

        self.expect(&TokenKind::Dedent)?;

        Ok(statements)
    }

    fn parse_if(&mut self) -> Result<Statement> {
        let position = self.advance().position;

        let condition = self.parse_expression()?;
        let body = self.parse_block()?;

        let mut branches = vec![IfBranch { condition, body }];
        let mut else_body = None;

        loop {
            if self.check(&TokenKind::Elif) {
                self.advance();
                let condition = self.parse_expression()?;
                let body = self.parse_block()?;
                branches.push(IfBranch { condition, body });
                continue;
            }

            if self.check(&TokenKind::Else) {
                self.advance();
                else_body = Some(self.parse_block()?);
            }

            break;
        }

        Ok(Statement::If {
            branches,
            else_body,
            position,
        })
    }

    fn parse_while(&mut self) -> Result<Statement> {
        let position = self.advance().position;

        let condition = self.parse_expression()?;
        let body = self.parse_block()?;

        Ok(Statement::While {
            condition,
            body,
            position,
        })
    }

    /// `for INIT; COND; STEP: BLOCK`
    fn parse_for(&mut self) -> Result<Statement> {
        let position = self.advance().position;

        let init = self.parse_simple_statement()?;
        self.expect(&TokenKind::Semicolon)?;
        let condition = self.parse_expression()?;
        self.expect(&TokenKind::Semicolon)?;
        let step = self.parse_simple_statement()?;
        let body = self.parse_block()?;

        Ok(Statement::For {
            init: Box::new(init),
            condition,
            step: Box::new(step),
            body,
            position,
        })
    }

    fn parse_def(&mut self) -> Result<Statement> {
        let position = self.advance().position;

        let (name, _) = self.expect_identifier()?;
        self.expect(&TokenKind::LParen)?;

        let mut params = vec![];
        if !self.check(&TokenKind::RParen) {
            loop {
                let (param, _) = self.expect_identifier()?;
                params.push(param);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen)?;

        let body = self.parse_block()?;

        Ok(Statement::FunctionDef {
            name,
            params,
            body,
            position,
        })
    }

    fn parse_return(&mut self) -> Result<Statement> {
        let position = self.advance().position;

        let value = if self.check(&TokenKind::Newline) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::Newline)?;

        Ok(Statement::Return { value, position })
    }

    // ------------------------------------------------------------------
    // expressions, lowest precedence first
    // ------------------------------------------------------------------

    fn parse_expression(&mut self) -> Result<Expression> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expression> {
        let mut lhs = self.parse_and()?;

        while self.check(&TokenKind::Or) {
            let position = self.advance().position;
            let rhs = self.parse_and()?;
            lhs = Expression::Binary {
                op: BinaryOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                position,
            };
        }

        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expression> {
        let mut lhs = self.parse_not()?;

        while self.check(&TokenKind::And) {
            let position = self.advance().position;
            let rhs = self.parse_not()?;
            lhs = Expression::Binary {
                op: BinaryOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                position,
            };
        }

        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expression> {
        if self.check(&TokenKind::Not) {
            let position = self.advance().position;
            let operand = self.parse_not()?;
            return Ok(Expression::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
                position,
            });
        }

        self.parse_comparison()
    }

    fn comparison_op(&self) -> Option<BinaryOp> {
        let op = match self.peek().kind {
            TokenKind::Equal => BinaryOp::Eq,
            TokenKind::NotEqual => BinaryOp::Ne,
            TokenKind::Less => BinaryOp::Lt,
            TokenKind::LessEqual => BinaryOp::Le,
            TokenKind::Greater => BinaryOp::Gt,
            TokenKind::GreaterEqual => BinaryOp::Ge,
            _ => return None,
        };
        Some(op)
    }

    fn parse_comparison(&mut self) -> Result<Expression> {
        let lhs = self.parse_additive()?;

        let Some(op) = self.comparison_op() else {
            return Ok(lhs);
        };
        let position = self.advance().position;
        let rhs = self.parse_additive()?;

        // comparisons are non-associative: `a < b < c` is rejected rather
        // than silently misparsed
        if self.comparison_op().is_some() {
            return Err(Error::syntax(
                self.peek().position,
                "chained comparisons are not supported",
            ));
        }

        Ok(Expression::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            position,
        })
    }

    fn parse_additive(&mut self) -> Result<Expression> {
        let mut lhs = self.parse_multiplicative()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            let position = self.advance().position;
            let rhs = self.parse_multiplicative()?;
            lhs = Expression::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                position,
            };
        }

        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression> {
        let mut lhs = self.parse_unary()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => break,
            };
            let position = self.advance().position;
            let rhs = self.parse_unary()?;
            lhs = Expression::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                position,
            };
        }

        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expression> {
        if self.check(&TokenKind::Minus) {
            let position = self.advance().position;
            let operand = self.parse_unary()?;
            return Ok(Expression::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
                position,
            });
        }

        self.parse_postfix()
    }

    /// A primary followed by any chain of calls, index accesses, and dot
    /// accesses, left-associatively.
    fn parse_postfix(&mut self) -> Result<Expression> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.peek().kind {
                TokenKind::LParen => {
                    let position = self.advance().position;
                    let mut args = vec![];
                    if !self.check(&TokenKind::RParen) {
                        loop {
                            args.push(self.parse_expression()?);
                            if !self.eat(&TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(&TokenKind::RParen)?;
                    expr = Expression::Call {
                        callee: Box::new(expr),
                        args,
                        position,
                    };
                }
                TokenKind::LBracket => {
                    let position = self.advance().position;
                    let index = self.parse_expression()?;
                    self.expect(&TokenKind::RBracket)?;
                    expr = Expression::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                        position,
                    };
                }
                TokenKind::Dot => {
                    let position = self.advance().position;
                    let (name, _) = self.expect_identifier()?;
                    expr = Expression::Dot {
                        object: Box::new(expr),
                        name,
                        position,
                    };
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expression> {
        let token = self.peek().clone();

        match token.kind {
            TokenKind::Int(value) => {
                self.advance();
                Ok(Expression::Integer {
                    value,
                    position: token.position,
                })
            }
            TokenKind::Float(value) => {
                self.advance();
                Ok(Expression::Float {
                    value,
                    position: token.position,
                })
            }
            TokenKind::Str(value) => {
                self.advance();
                Ok(Expression::Str {
                    value,
                    position: token.position,
                })
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression::Boolean {
                    value: true,
                    position: token.position,
                })
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression::Boolean {
                    value: false,
                    position: token.position,
                })
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expression::Identifier {
                    name,
                    position: token.position,
                })
            }
            TokenKind::LParen => self.parse_parenthesized(),
            TokenKind::LBracket => self.parse_array(),
            TokenKind::LBrace => self.parse_map_or_set(),
            other => Err(Error::syntax(
                token.position,
                format!("expected an expression, found {other}"),
            )),
        }
    }

    /// `(e)` is grouping; `(e1, e2, …)` with at least two elements is a
    /// tuple. `(e,)` is rejected.
    fn parse_parenthesized(&mut self) -> Result<Expression> {
        let position = self.advance().position;
        let first = self.parse_expression()?;

        if !self.check(&TokenKind::Comma) {
            self.expect(&TokenKind::RParen)?;
            return Ok(Expression::Grouping {
                expr: Box::new(first),
                position,
            });
        }

        let mut elements = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.check(&TokenKind::RParen) {
                return Err(Error::syntax(
                    self.peek().position,
                    "tuples require at least two elements",
                ));
            }
            elements.push(self.parse_expression()?);
        }
        self.expect(&TokenKind::RParen)?;

        Ok(Expression::Tuple { elements, position })
    }

    fn parse_array(&mut self) -> Result<Expression> {
        let position = self.advance().position;

        let mut elements = vec![];
        if !self.check(&TokenKind::RBracket) {
            loop {
                elements.push(self.parse_expression()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RBracket)?;

        Ok(Expression::Array { elements, position })
    }

    /// After `{`, a `:` behind the first expression selects a map literal;
    /// anything else is a set. `{}` is rejected: `Map()` and `Set()` spell
    /// the empty collections.
    fn parse_map_or_set(&mut self) -> Result<Expression> {
        let position = self.advance().position;

        if self.check(&TokenKind::RBrace) {
            return Err(Error::syntax(
                self.peek().position,
                "empty '{}' is ambiguous; use Map() or Set()",
            ));
        }

        let first = self.parse_expression()?;

        if self.check(&TokenKind::Colon) {
            self.advance();
            let value = self.parse_expression()?;
            let mut entries = vec![(first, value)];

            while self.eat(&TokenKind::Comma) {
                let key = self.parse_expression()?;
                self.expect(&TokenKind::Colon)?;
                let value = self.parse_expression()?;
                entries.push((key, value));
            }
            self.expect(&TokenKind::RBrace)?;

            return Ok(Expression::Map { entries, position });
        }

        let mut elements = vec![first];
        while self.eat(&TokenKind::Comma) {
            elements.push(self.parse_expression()?);
        }
        self.expect(&TokenKind::RBrace)?;

        Ok(Expression::Set { elements, position })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse_source(input: &str) -> Result<Program> {
        Parser::new(Lexer::new(input).lex()?).parse()
    }

    fn parse_expr(input: &str) -> Expression {
        let program = parse_source(input).expect("parsing should succeed");
        match program.statements.into_iter().next() {
            Some(Statement::Expression { expr, .. }) => expr,
            other => panic!("expected an expression statement, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_precedence() {
        let expr = parse_expr("1 + 2 * 3");

        let Expression::Binary { op: BinaryOp::Add, rhs, .. } = expr else {
            panic!("expected addition at the root");
        };
        assert!(matches!(
            *rhs,
            Expression::Binary { op: BinaryOp::Mul, .. }
        ));
    }

    #[test]
    fn test_parse_unary_minus_binds_tighter_than_mul() {
        let expr = parse_expr("-a * b");

        let Expression::Binary { op: BinaryOp::Mul, lhs, .. } = expr else {
            panic!("expected multiplication at the root");
        };
        assert!(matches!(*lhs, Expression::Unary { op: UnaryOp::Neg, .. }));
    }

    #[test]
    fn test_parse_not_below_comparison() {
        let expr = parse_expr("not a == b");

        assert!(matches!(
            expr,
            Expression::Unary { op: UnaryOp::Not, .. }
        ));
    }

    #[test]
    fn test_parse_chained_comparison_rejected() {
        let result = parse_source("a < b < c\n");

        assert!(result.is_err());
    }

    #[test]
    fn test_parse_grouping_vs_tuple() {
        assert!(matches!(parse_expr("(1)"), Expression::Grouping { .. }));

        let Expression::Tuple { elements, .. } = parse_expr("(1, 2, 3)") else {
            panic!("expected a tuple");
        };
        assert_eq!(elements.len(), 3);
    }

    #[test]
    fn test_parse_one_element_tuple_rejected() {
        assert!(parse_source("(1,)\n").is_err());
    }

    #[test]
    fn test_parse_map_vs_set() {
        assert!(matches!(
            parse_expr("{1: \"a\", 2: \"b\"}"),
            Expression::Map { .. }
        ));
        assert!(matches!(parse_expr("{1, 2, 3}"), Expression::Set { .. }));
    }

    #[test]
    fn test_parse_empty_braces_rejected() {
        assert!(parse_source("{}\n").is_err());
    }

    #[test]
    fn test_parse_assignment_targets() {
        assert!(matches!(
            parse_source("x = 1\n").unwrap().statements[0],
            Statement::Assignment { .. }
        ));
        assert!(matches!(
            parse_source("a[0] = 1\n").unwrap().statements[0],
            Statement::Assignment { .. }
        ));
        assert!(parse_source("f() = 1\n").is_err());
        assert!(parse_source("a.b = 1\n").is_err());
    }

    #[test]
    fn test_parse_if_elif_else() {
        let program = parse_source("if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\n")
            .expect("parsing should succeed");

        let Statement::If { branches, else_body, .. } = &program.statements[0] else {
            panic!("expected an if statement");
        };
        assert_eq!(branches.len(), 2);
        assert!(else_body.is_some());
    }

    #[test]
    fn test_parse_for_loop() {
        let program = parse_source("for i = 0; i < 10; i = i + 1:\n    print(i)\n")
            .expect("parsing should succeed");

        let Statement::For { init, step, body, .. } = &program.statements[0] else {
            panic!("expected a for statement");
        };
        assert!(matches!(**init, Statement::Assignment { .. }));
        assert!(matches!(**step, Statement::Assignment { .. }));
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn test_parse_function_def() {
        let program = parse_source("def add(a, b):\n    return a + b\n")
            .expect("parsing should succeed");

        let Statement::FunctionDef { name, params, body, .. } = &program.statements[0] else {
            panic!("expected a function definition");
        };
        assert_eq!(name, "add");
        assert_eq!(params, &vec!["a".to_string(), "b".to_string()]);
        assert!(matches!(body[0], Statement::Return { value: Some(_), .. }));
    }

    #[test]
    fn test_parse_bare_return() {
        let program =
            parse_source("def noop():\n    return\n").expect("parsing should succeed");

        let Statement::FunctionDef { body, .. } = &program.statements[0] else {
            panic!("expected a function definition");
        };
        assert!(matches!(body[0], Statement::Return { value: None, .. }));
    }

    #[test]
    fn test_parse_postfix_chain() {
        let expr = parse_expr("m.get(\"k\")[0](1)");

        // chain applies left to right: dot, call, index, call
        let Expression::Call { callee, .. } = expr else {
            panic!("expected outer call");
        };
        let Expression::Index { object, .. } = *callee else {
            panic!("expected index under the call");
        };
        let Expression::Call { callee, .. } = *object else {
            panic!("expected method call under the index");
        };
        assert!(matches!(*callee, Expression::Dot { .. }));
    }

    #[test]
    fn test_parse_nested_blocks() {
        let source = "def fib(n):\n    if n < 2:\n        return n\n    return fib(n - 1) + fib(n - 2)\n";
        let program = parse_source(source).expect("parsing should succeed");

        let Statement::FunctionDef { body, .. } = &program.statements[0] else {
            panic!("expected a function definition");
        };
        assert_eq!(body.len(), 2);
    }

    #[test]
    fn test_parse_deterministic() {
        let source = "a = [1, 2]\nprint(a[0] + 1)\n";

        assert_eq!(parse_source(source), parse_source(source));
    }
}
