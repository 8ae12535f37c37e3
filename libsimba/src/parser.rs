//! A recursive-descent parser for simba programs.
//!
//! One grammar serves expressions, patterns, and programs: patterns differ from target
//! expressions only in that upper-case identifiers are wildcards, which is a property of names
//! rather than of syntax.

use crate::common::Span;
use crate::diagnostics::Diagnostic;
use crate::grammar::*;
use crate::scanner::types::{Token, TokenType as TT};
use crate::utils::PeekIter;

use core::convert::TryFrom;

/// Parses a list of tokens into a program of statements.
pub fn parse_program(tokens: Vec<Token>) -> (StmtList, Vec<Diagnostic>) {
    let mut parser = Parser::new(tokens);
    let program = parser.parse_program();
    (program, parser.diagnostics)
}

/// Parses a list of tokens into a single expression.
pub fn parse_expression(tokens: Vec<Token>) -> (RcExpr, Vec<Diagnostic>) {
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expression();
    (expr, parser.diagnostics)
}

macro_rules! binary_expr_parser {
    ($self:ident $($name:ident: next=$next_term:ident, op=[$($matching_op:tt)+])*) => {
        $(
        fn $name(&mut $self) -> RcExpr {
            use BinaryOperator::*;

            let mut lhs = $self.$next_term();
            while let Ok(op) = $self
                .input
                .peek()
                .map_or_else(|| Err(()), BinaryOperator::try_from)
            {
                match op {
                    $($matching_op)+ => {
                        $self.input.next();
                        let rhs = $self.$next_term();
                        lhs = Expr::binary(op, lhs, rhs);
                    }
                    _ => break,
                }
            }
            lhs
        }
        )*
    };
}

struct Parser {
    input: PeekIter<Token>,
    diagnostics: Vec<Diagnostic>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            input: PeekIter::new(tokens.into_iter()),
            diagnostics: Vec::new(),
        }
    }

    fn done(&mut self) -> bool {
        matches!(self.input.peek().map(|t| &t.ty), Some(&TT::EOF) | None)
    }

    fn skip_stmt_ends(&mut self) {
        while self.input.peek().map(|t| &t.ty) == Some(&TT::StmtEnd) {
            self.input.next();
        }
    }

    fn push_diag(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// An empty expression, used to recover from parse errors.
    fn empty_expr() -> RcExpr {
        // Variables must be named, so an unnamed variable encodes an empty expression.
        Expr::var(String::new())
    }

    fn parse_program(&mut self) -> StmtList {
        let mut stmts = Vec::new();
        self.skip_stmt_ends();
        while !self.done() {
            stmts.push(self.parse_stmt());
            if !self.done() && self.input.peek().map(|t| &t.ty) != Some(&TT::StmtEnd) {
                let tok = self.input.peek().unwrap();
                let (span, tok_str) = (tok.span, tok.to_string());
                self.push_diag(Diagnostic::span_err(
                    span,
                    format!(r#"Expected end of statement, found "{}""#, tok_str),
                    Some("statements are separated by newlines or semicolons".into()),
                ));
                // Skip to the next statement boundary.
                while !self.done() && self.input.peek().map(|t| &t.ty) != Some(&TT::StmtEnd) {
                    self.input.next();
                }
            }
            self.skip_stmt_ends();
        }
        StmtList::new(stmts)
    }

    fn parse_expression(&mut self) -> RcExpr {
        self.skip_stmt_ends();
        let expr = self.expr();
        self.skip_stmt_ends();
        if !self.done() {
            let tok = self.input.peek().unwrap();
            let (span, tok_str) = (tok.span, tok.to_string());
            self.push_diag(Diagnostic::span_err(
                span,
                format!(r#"Expected end of input, found "{}""#, tok_str),
                Some("expected a single expression".into()),
            ));
        }
        expr
    }

    fn parse_stmt(&mut self) -> Stmt {
        let lookahead = self.input.peek_map_n(2, |t| t.ty.clone());
        let is_assignment = matches!(
            (lookahead.get(0), lookahead.get(1)),
            (Some(TT::Variable(_)), Some(TT::Equal))
        );

        if is_assignment {
            let var = match self.input.next().map(|t| t.ty) {
                Some(TT::Variable(name)) => name,
                _ => unreachable!(),
            };
            self.input.next(); // =
            let rhs = self.expr();
            Stmt::Assignment(Assignment { var, rhs })
        } else {
            Stmt::Expr(self.expr())
        }
    }

    fn expr(&mut self) -> RcExpr {
        self.or_term()
    }

    binary_expr_parser!(
        self

        // Loosest to tightest, following the surface grammar:
        //   | < ^ < & < (<< >>) < (+ -) < *
        or_term:      next = xor_term,     op = [BitOr]
        xor_term:     next = and_term,     op = [BitXor]
        and_term:     next = shift_term,   op = [BitAnd]
        shift_term:   next = add_sub_term, op = [Shl | Shr]
        add_sub_term: next = mul_term,     op = [Plus | Minus]
        mul_term:     next = unary_term,   op = [Mult]
    );

    /// Unary `-` and `~` bind tighter than `*`, so `-2*A` parses as `(-2) * A`.
    fn unary_term(&mut self) -> RcExpr {
        if self.done() {
            let span = self.eof_span();
            self.push_diag(Diagnostic::span_err(
                span,
                "Expected an expression, found end of input",
                Some("expected an expression".into()),
            ));
            return Self::empty_expr();
        }

        if let Some(Ok(op)) = self.input.peek().map(UnaryOperator::try_from) {
            self.input.next();
            return Expr::unary(op, self.unary_term());
        }

        self.atom()
    }

    fn atom(&mut self) -> RcExpr {
        let Token { ty, span } = self.input.next().unwrap();
        match ty {
            TT::Int(n) => Expr::num(n),
            TT::Variable(name) => {
                if self.input.peek().map(|t| &t.ty) == Some(&TT::OpenParen) {
                    self.input.next();
                    self.finish_call(name)
                } else {
                    Expr::var(name)
                }
            }
            TT::OpenParen => {
                let inner = self.expr();
                self.expect_close_paren(span);
                inner
            }
            ty => {
                let tok_str = Token::new(ty, span).to_string();
                self.push_diag(Diagnostic::span_err(
                    span,
                    format!(r#"Expected an expression, found "{}""#, tok_str),
                    Some("expected an expression".into()),
                ));
                Self::empty_expr()
            }
        }
    }

    fn finish_call(&mut self, func: String) -> RcExpr {
        let mut args = Vec::new();
        if self.input.peek().map(|t| &t.ty) != Some(&TT::CloseParen) {
            args.push(self.expr());
            while self.input.peek().map(|t| &t.ty) == Some(&TT::Comma) {
                self.input.next();
                args.push(self.expr());
            }
        }
        let span = self.eof_span();
        self.expect_close_paren(span);
        Expr::call(func, args)
    }

    fn expect_close_paren(&mut self, open_span: Span) {
        if self.input.peek().map(|t| &t.ty) == Some(&TT::CloseParen) {
            self.input.next();
        } else {
            self.push_diag(
                Diagnostic::span_err(
                    open_span,
                    "Unclosed parenthesis",
                    Some("expected a closing parenthesis".into()),
                )
                .with_help(r#"insert a ")""#.to_string()),
            );
        }
    }

    fn eof_span(&mut self) -> Span {
        self.input
            .peek()
            .map(|t| t.span)
            .unwrap_or_else(|| (0, 0).into())
    }
}
