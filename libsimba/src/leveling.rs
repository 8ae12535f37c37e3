//! Leveling of associative operator chains into n-ary nodes, and its inverse.
//!
//! Leveling runs before matching so commutativity can be handled by permutation; it is always
//! undone before arithmetic simplification.

use crate::grammar::*;

use std::rc::Rc;

/// Levels every maximal chain of an associative+commutative operator into one
/// [`NaryExpr`](NaryExpr).
///
/// If `only` is given, just that operator is leveled. Chains of two operands stay binary; a
/// leveled node always has at least three. Leveling is maximal: no leveled node has a direct
/// child with the same top operator.
pub fn level(expr: &RcExpr, only: Option<BinaryOperator>) -> RcExpr {
    let filter = |op: BinaryOperator| op.is_associative() && only.map_or(true, |o| o == op);
    match expr.as_ref() {
        Expr::Num(_) | Expr::Var(_) => Rc::clone(expr),
        Expr::BinaryExpr(binary_expr) if filter(binary_expr.op) => {
            let mut args = Vec::new();
            flatten_chain(expr, binary_expr.op, only, &mut args);
            if args.len() > 2 {
                Expr::nary(binary_expr.op, args)
            } else {
                let mut args = args.into_iter();
                let (lhs, rhs) = (args.next().unwrap(), args.next().unwrap());
                Expr::binary(binary_expr.op, lhs, rhs)
            }
        }
        Expr::BinaryExpr(binary_expr) => Expr::binary(
            binary_expr.op,
            level(&binary_expr.lhs, only),
            level(&binary_expr.rhs, only),
        ),
        Expr::UnaryExpr(unary_expr) => Expr::unary(unary_expr.op, level(&unary_expr.rhs, only)),
        Expr::NaryExpr(nary_expr) => {
            // Re-level the children, splicing same-operator results to keep leveling maximal.
            let mut args = Vec::with_capacity(nary_expr.args.len());
            for arg in &nary_expr.args {
                let leveled = level(arg, only);
                match leveled.as_ref() {
                    Expr::NaryExpr(child) if child.op == nary_expr.op => {
                        args.extend(child.args.iter().cloned())
                    }
                    _ => args.push(leveled),
                }
            }
            Expr::nary(nary_expr.op, args)
        }
        Expr::Call(call) => Expr::call(
            call.func.clone(),
            call.args.iter().map(|arg| level(arg, only)).collect(),
        ),
    }
}

/// Collects the operands of a maximal `op` chain rooted at `expr`, leveling each operand.
fn flatten_chain(expr: &RcExpr, op: BinaryOperator, only: Option<BinaryOperator>, out: &mut Vec<RcExpr>) {
    match expr.as_ref() {
        Expr::BinaryExpr(binary_expr) if binary_expr.op == op => {
            flatten_chain(&binary_expr.lhs, op, only, out);
            flatten_chain(&binary_expr.rhs, op, only, out);
        }
        Expr::NaryExpr(nary_expr) if nary_expr.op == op => {
            for arg in &nary_expr.args {
                flatten_chain(arg, op, only, out);
            }
        }
        _ => out.push(level(expr, only)),
    }
}

/// Undoes [leveling](level), rebuilding every n-ary node as a left-spine binary chain over its
/// operator.
pub fn unlevel(expr: &RcExpr) -> RcExpr {
    match expr.as_ref() {
        Expr::Num(_) | Expr::Var(_) => Rc::clone(expr),
        Expr::BinaryExpr(binary_expr) => Expr::binary(
            binary_expr.op,
            unlevel(&binary_expr.lhs),
            unlevel(&binary_expr.rhs),
        ),
        Expr::UnaryExpr(unary_expr) => Expr::unary(unary_expr.op, unlevel(&unary_expr.rhs)),
        Expr::NaryExpr(nary_expr) => {
            let mut args = nary_expr.args.iter().map(unlevel);
            let first = args.next().expect("leveled node without operands");
            args.fold(first, |lhs, rhs| Expr::binary(nary_expr.op, lhs, rhs))
        }
        Expr::Call(call) => Expr::call(call.func.clone(), call.args.iter().map(unlevel).collect()),
    }
}
