//! Read-only and rebuilding walks over the libsimba IR.
//!
//! Passes implement [`Transformer`](Transformer) and override `transform_expr`, delegating to
//! `walk_expr` for the cases they do not handle; collectors implement [`Visitor`](Visitor) the
//! same way. Adding a new node kind extends the match in each default walk, and the compiler
//! enumerates every pass that must handle it.

use super::*;

/// A read-only visitor over an expression tree.
pub trait Visitor {
    /// Visits an expression. The default implementation [walks](Visitor::walk_expr) the tree.
    fn visit_expr(&mut self, expr: &RcExpr) {
        self.walk_expr(expr)
    }

    /// Visits a literal.
    fn visit_num(&mut self, _num: i128) {}

    /// Visits a variable.
    fn visit_var(&mut self, _name: &str) {}

    /// Recurses into the children of `expr`.
    fn walk_expr(&mut self, expr: &RcExpr) {
        match expr.as_ref() {
            Expr::Num(n) => self.visit_num(*n),
            Expr::Var(name) => self.visit_var(name),
            Expr::BinaryExpr(binary_expr) => {
                self.visit_expr(&binary_expr.lhs);
                self.visit_expr(&binary_expr.rhs);
            }
            Expr::UnaryExpr(unary_expr) => self.visit_expr(&unary_expr.rhs),
            Expr::NaryExpr(nary_expr) => {
                for arg in &nary_expr.args {
                    self.visit_expr(arg);
                }
            }
            Expr::Call(call) => {
                for arg in &call.args {
                    self.visit_expr(arg);
                }
            }
        }
    }

    /// Visits every expression of a statement list.
    fn visit_stmt_list(&mut self, stmt_list: &StmtList) {
        for stmt in stmt_list.iter() {
            match stmt {
                Stmt::Expr(expr) => self.visit_expr(expr),
                Stmt::Assignment(asgn) => self.visit_expr(&asgn.rhs),
            }
        }
    }
}

/// A transformer producing a new expression tree from an existing one.
///
/// The input tree is never mutated; unchanged subtrees are shared with the result.
pub trait Transformer {
    /// Transforms an expression. The default implementation rebuilds the node over transformed
    /// children via [`walk_expr`](Transformer::walk_expr).
    fn transform_expr(&mut self, expr: &RcExpr) -> RcExpr {
        self.walk_expr(expr)
    }

    /// Rebuilds `expr` over its transformed children.
    fn walk_expr(&mut self, expr: &RcExpr) -> RcExpr {
        match expr.as_ref() {
            Expr::Num(_) | Expr::Var(_) => Rc::clone(expr),
            Expr::BinaryExpr(binary_expr) => Expr::binary(
                binary_expr.op,
                self.transform_expr(&binary_expr.lhs),
                self.transform_expr(&binary_expr.rhs),
            ),
            Expr::UnaryExpr(unary_expr) => {
                Expr::unary(unary_expr.op, self.transform_expr(&unary_expr.rhs))
            }
            Expr::NaryExpr(nary_expr) => Expr::nary(
                nary_expr.op,
                nary_expr
                    .args
                    .iter()
                    .map(|arg| self.transform_expr(arg))
                    .collect(),
            ),
            Expr::Call(call) => Expr::call(
                call.func.clone(),
                call.args
                    .iter()
                    .map(|arg| self.transform_expr(arg))
                    .collect(),
            ),
        }
    }
}
