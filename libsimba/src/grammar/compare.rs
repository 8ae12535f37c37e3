//! Structural comparison of expressions modulo commutativity.
//!
//! Rather than patching equality behaviour into containers, comparison is driven by a *canonical
//! key*: a recursive rendering of a tree in which the operands of commutative nodes are sorted by
//! their own keys. Two trees are commutatively equal exactly when their keys are equal, so
//! multiset comparison of leveled operands and comparison of whole bindings reduce to ordinary
//! string equality.

use super::*;

/// Renders the canonical key of an expression.
///
/// Keys are total-ordered and hashable; commutatively equivalent trees share one key. Literal
/// values are rendered exactly (not modulo `2^n`), mirroring structural comparison of literals.
pub fn canonical_key(expr: &RcExpr) -> String {
    match expr.as_ref() {
        Expr::Num(n) => n.to_string(),
        Expr::Var(name) => name.clone(),
        Expr::BinaryExpr(binary_expr) => {
            let lhs = canonical_key(&binary_expr.lhs);
            let rhs = canonical_key(&binary_expr.rhs);
            let (first, second) = if binary_expr.op.is_commutative() && rhs < lhs {
                (rhs, lhs)
            } else {
                (lhs, rhs)
            };
            format!("({:?} {} {})", binary_expr.op, first, second)
        }
        Expr::UnaryExpr(unary_expr) => {
            format!("({:?} {})", unary_expr.op, canonical_key(&unary_expr.rhs))
        }
        Expr::NaryExpr(nary_expr) => {
            let mut keys: Vec<String> = nary_expr.args.iter().map(canonical_key).collect();
            keys.sort();
            format!("({:?}* {})", nary_expr.op, keys.join(" "))
        }
        Expr::Call(call) => {
            let args: Vec<String> = call.args.iter().map(canonical_key).collect();
            format!("(call {} {})", call.func, args.join(" "))
        }
    }
}

/// Compares two expressions for structural equality modulo commutativity.
///
/// Operands of commutative binary nodes are interchangeable, and leveled nodes compare as
/// multisets. Associativity is *not* considered: `(a + b) + c` and `a + (b + c)` differ.
pub fn eq_commutative(a: &RcExpr, b: &RcExpr) -> bool {
    canonical_key(a) == canonical_key(b)
}

/// Compares two statements for commutative structural equality.
pub fn eq_stmt(a: &Stmt, b: &Stmt) -> bool {
    match (a, b) {
        (Stmt::Expr(a), Stmt::Expr(b)) => eq_commutative(a, b),
        (Stmt::Assignment(a), Stmt::Assignment(b)) => {
            a.var == b.var && eq_commutative(&a.rhs, &b.rhs)
        }
        _ => false,
    }
}

/// Compares two programs statement-wise.
pub fn eq_stmt_list(a: &StmtList, b: &StmtList) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(a, b)| eq_stmt(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test::parse_expr;

    macro_rules! eq_commutative_tests {
        ($($name:ident: $a:expr, $b:expr => $eq:expr)*) => {
        $(
            #[test]
            fn $name() {
                let a = parse_expr($a);
                let b = parse_expr($b);
                assert_eq!(eq_commutative(&a, &b), $eq);
                assert_eq!(eq_commutative(&b, &a), $eq);
            }
        )*
        }
    }

    eq_commutative_tests! {
        identical: "x + y", "x + y" => true
        commuted_add: "x + y", "y + x" => true
        commuted_mult: "2 * x", "x * 2" => true
        commuted_nested: "(x | y) & (a ^ b)", "(b ^ a) & (y | x)" => true
        not_associated: "(a + b) + c", "a + (b + c)" => false
        sub_not_commutative: "x - y", "y - x" => false
        shift_not_commutative: "x << y", "y << x" => false
        different_consts: "x + 1", "x + 2" => false
        exact_const_compare: "x + 255", "x + -1" => false
        unary: "~x", "~x" => true
        unary_mismatch: "~x", "-x" => false
        call: "bv32(x + y)", "bv32(y + x)" => true
        call_name_mismatch: "bv32(x)", "bv16(x)" => false
    }

    #[test]
    fn nary_multiset() {
        use crate::leveling::level;
        let a = level(&parse_expr("x + y + z"), None);
        let b = level(&parse_expr("z + x + y"), None);
        let c = level(&parse_expr("z + z + y"), None);
        assert!(eq_commutative(&a, &b));
        assert!(!eq_commutative(&a, &c));
    }
}
