//! Utilities for collecting items in a simba expression tree.

use super::*;
use crate::common::UnsupportedWidth;

use std::collections::HashSet;

/// Collects unique variable names in an expression. Wildcards count as variables.
pub fn collect_var_names(expr: &RcExpr) -> HashSet<String> {
    let mut collector = VarNameCollector::default();
    collector.visit_expr(expr);
    collector.vars
}

/// Collects unique wildcard names in a pattern expression.
pub fn collect_wildcards(expr: &RcExpr) -> HashSet<String> {
    collect_var_names(expr)
        .into_iter()
        .filter(|name| is_wildcard(name))
        .collect()
}

#[derive(Default)]
struct VarNameCollector {
    vars: HashSet<String>,
}

impl Visitor for VarNameCollector {
    fn visit_var(&mut self, name: &str) {
        self.vars.insert(name.to_string());
    }
}

/// Whether the expression is closed over literals: built only from literals, operators, and
/// leveled nodes. Variables and foreign calls make an expression open.
pub fn is_const_expr(expr: &RcExpr) -> bool {
    match expr.as_ref() {
        Expr::Num(_) => true,
        Expr::Var(_) | Expr::Call(_) => false,
        Expr::BinaryExpr(binary_expr) => {
            is_const_expr(&binary_expr.lhs) && is_const_expr(&binary_expr.rhs)
        }
        Expr::UnaryExpr(unary_expr) => is_const_expr(&unary_expr.rhs),
        Expr::NaryExpr(nary_expr) => nary_expr.args.iter().all(is_const_expr),
    }
}

/// Infers the working bit-vector width of an expression from its literals.
///
/// The width is the smallest of {1, 2, 4, 8, 16, 32, 64} covering every literal's magnitude.
/// Returns `None` when the expression carries no literals (callers default to 8), and an
/// [`UnsupportedWidth`](UnsupportedWidth) error when a literal needs more than 64 bits.
pub fn infer_width(expr: &RcExpr) -> Result<Option<u32>, UnsupportedWidth> {
    let mut collector = WidthCollector::default();
    collector.visit_expr(expr);
    collector.finish()
}

/// [Width inference](infer_width) over every expression of a program.
pub fn infer_width_stmts(stmt_list: &StmtList) -> Result<Option<u32>, UnsupportedWidth> {
    let mut collector = WidthCollector::default();
    collector.visit_stmt_list(stmt_list);
    collector.finish()
}

#[derive(Default)]
struct WidthCollector {
    max_bitlen: u32,
}

impl WidthCollector {
    fn finish(self) -> Result<Option<u32>, UnsupportedWidth> {
        let width = match self.max_bitlen {
            0 => return Ok(None),
            1 | 2 => self.max_bitlen,
            3 | 4 => 4,
            5..=8 => 8,
            9..=16 => 16,
            17..=32 => 32,
            33..=64 => 64,
            bits => return Err(UnsupportedWidth { bits }),
        };
        Ok(Some(width))
    }
}

impl Visitor for WidthCollector {
    fn visit_num(&mut self, num: i128) {
        let magnitude = num.unsigned_abs();
        let bitlen = (128 - magnitude.leading_zeros()) as u32;
        if bitlen > self.max_bitlen {
            self.max_bitlen = bitlen;
        }
    }
}
