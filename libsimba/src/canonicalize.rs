//! Canonicalising tree transforms.
//!
//! These passes erase syntactic variants that the pattern matcher should not have to enumerate:
//! constant left shifts become multiplications, subtraction and negation become multiplication by
//! `-1`, and full-width masks vanish. Each pass is shape-only; the only numeric work is forming
//! the new literal `2^k`.

use crate::grammar::*;

use std::rc::Rc;

bitflags::bitflags! {
    /// Selects canonicalisation passes.
    pub struct CanonPasses: u32 {
        /// `x << k` becomes `x * 2^k` for constant `k < n`.
        const SHIFT_TO_MULT = 0b0001;
        /// `a - b` becomes `a + (-1)*b`; `-x` becomes `(-1)*x`.
        const SUB_TO_MULT = 0b0010;
        /// `x & (2^n - 1)` becomes `x`, on either side.
        const REMOVE_MASK = 0b0100;
        /// `~x` becomes `(-1)*x + (-1)`.
        const NOT_TO_INV = 0b1000;
    }
}

/// Applies the standard canonicalisation passes, in order: shift-to-mult, sub-to-mult, mask
/// removal.
///
/// After this transform no `-` or unary `-` remains in the tree. `~` is preserved; the rewrite
/// driver additionally applies [`not_to_inv`](not_to_inv) on targets before matching.
pub fn canonicalize(expr: &RcExpr, nbits: u32) -> RcExpr {
    canonicalize_with(
        expr,
        nbits,
        CanonPasses::SHIFT_TO_MULT | CanonPasses::SUB_TO_MULT | CanonPasses::REMOVE_MASK,
    )
}

/// Applies the selected canonicalisation passes in declaration order.
pub fn canonicalize_with(expr: &RcExpr, nbits: u32, passes: CanonPasses) -> RcExpr {
    let mut expr = Rc::clone(expr);
    if passes.contains(CanonPasses::SHIFT_TO_MULT) {
        expr = ShiftToMult { nbits }.transform_expr(&expr);
    }
    if passes.contains(CanonPasses::SUB_TO_MULT) {
        expr = SubToMult.transform_expr(&expr);
    }
    if passes.contains(CanonPasses::REMOVE_MASK) {
        expr = RemoveMask { nbits }.transform_expr(&expr);
    }
    if passes.contains(CanonPasses::NOT_TO_INV) {
        expr = NotToInv.transform_expr(&expr);
    }
    expr
}

/// Rewrites `~x` to `(-1)*x + (-1)`.
///
/// Patterns keep `~` symbolically; the matcher treats both encodings as equivalent.
pub fn not_to_inv(expr: &RcExpr) -> RcExpr {
    NotToInv.transform_expr(expr)
}

/// Transforms left shifts by an in-range constant into multiplications.
struct ShiftToMult {
    nbits: u32,
}

impl Transformer for ShiftToMult {
    fn transform_expr(&mut self, expr: &RcExpr) -> RcExpr {
        if let Expr::BinaryExpr(binary_expr) = expr.as_ref() {
            if binary_expr.op == BinaryOperator::Shl {
                if let Some(k) = binary_expr.rhs.get_num() {
                    if k >= 0 && (k as u32) < self.nbits {
                        let lhs = self.transform_expr(&binary_expr.lhs);
                        return Expr::binary(BinaryOperator::Mult, lhs, Expr::num(1i128 << (k as u32)));
                    }
                }
            }
        }
        self.walk_expr(expr)
    }
}

/// Encodes subtraction and negation as multiplication by `-1`.
struct SubToMult;

impl Transformer for SubToMult {
    fn transform_expr(&mut self, expr: &RcExpr) -> RcExpr {
        match expr.as_ref() {
            Expr::BinaryExpr(binary_expr) if binary_expr.op == BinaryOperator::Minus => {
                let lhs = self.transform_expr(&binary_expr.lhs);
                let rhs = self.transform_expr(&binary_expr.rhs);
                let neg_rhs = Expr::binary(BinaryOperator::Mult, Expr::num(-1), rhs);
                Expr::binary(BinaryOperator::Plus, lhs, neg_rhs)
            }
            Expr::UnaryExpr(unary_expr) if unary_expr.op == UnaryOperator::Neg => {
                let rhs = self.transform_expr(&unary_expr.rhs);
                Expr::binary(BinaryOperator::Mult, Expr::num(-1), rhs)
            }
            _ => self.walk_expr(expr),
        }
    }
}

/// Drops conjunctions with the full-width mask `2^n - 1`.
struct RemoveMask {
    nbits: u32,
}

impl RemoveMask {
    fn mask(&self) -> i128 {
        (1i128 << self.nbits) - 1
    }
}

impl Transformer for RemoveMask {
    fn transform_expr(&mut self, expr: &RcExpr) -> RcExpr {
        if let Expr::BinaryExpr(binary_expr) = expr.as_ref() {
            if binary_expr.op == BinaryOperator::BitAnd {
                if binary_expr.rhs.get_num() == Some(self.mask()) {
                    return self.transform_expr(&binary_expr.lhs);
                }
                if binary_expr.lhs.get_num() == Some(self.mask()) {
                    return self.transform_expr(&binary_expr.rhs);
                }
            }
        }
        self.walk_expr(expr)
    }
}

/// Rewrites complement into its arithmetic encoding `-x - 1`, in subtraction-free form.
struct NotToInv;

impl Transformer for NotToInv {
    fn transform_expr(&mut self, expr: &RcExpr) -> RcExpr {
        if let Expr::UnaryExpr(unary_expr) = expr.as_ref() {
            if unary_expr.op == UnaryOperator::BitNot {
                let rhs = self.transform_expr(&unary_expr.rhs);
                let neg = Expr::binary(BinaryOperator::Mult, Expr::num(-1), rhs);
                return Expr::binary(BinaryOperator::Plus, neg, Expr::num(-1));
            }
        }
        self.walk_expr(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::Emit;
    use crate::utils::test::parse_expr;

    macro_rules! canonicalize_tests {
        ($($name:ident: $nbits:expr, $program:expr => $s_form:expr)*) => {
        $(
            #[test]
            fn $name() {
                let expr = parse_expr($program);
                let canon = canonicalize(&expr, $nbits);
                assert_eq!(canon.emit_s_expression(), $s_form);
            }
        )*
        }
    }

    canonicalize_tests! {
        shift_to_mult:          8, "x << 1"          => "(* x 2)"
        shift_to_mult_nested:   8, "(y*32) << 1"     => "(* (* y 32) 2)"
        shift_to_mult_large:    8, "var << 4"        => "(* var 16)"
        shift_nonconst_kept:    8, "3 << var"        => "(<< 3 var)"
        shift_in_context:       8, "(x ^ y) + (x << 1)" => "(+ (^ x y) (* x 2))"
        shift_out_of_range:     8, "x << 9"          => "(<< x 9)"

        sub_to_mult:            8, "x - 3"           => "(+ x (* -1 3))"
        neg_to_mult:            8, "-x"              => "(* -1 x)"
        neg_sub_chain:          8, "- x - y"         => "(+ (* -1 x) (* -1 y))"

        mask_removed_right:     8, "x & 255"         => "x"
        mask_removed_left:      8, "255 & x"         => "x"
        mask_kept_other_width: 16, "x & 255"         => "(& x 255)"
        mask_kept_partial:      8, "x & 254"         => "(& x 254)"

        not_kept:               8, "~x + 1"          => "(+ (~ x) 1)"
    }

    #[test]
    fn not_to_inv_encoding() {
        let expr = parse_expr("(x ^ ~y) + 1");
        let inv = not_to_inv(&expr);
        assert_eq!(inv.emit_s_expression(), "(+ (^ x (+ (* -1 y) -1)) 1)");
    }

    #[test]
    fn not_to_inv_nested() {
        let expr = parse_expr("~~x");
        let inv = not_to_inv(&expr);
        assert_eq!(
            inv.emit_s_expression(),
            "(+ (* -1 (+ (* -1 x) -1)) -1)"
        );
    }

    #[test]
    fn idempotent() {
        let cases = vec![
            "x << 1",
            "x - 3 - y",
            "-x & 255",
            "(x ^ ~y) + ((x | y) << 1)",
            "-(43 ^ ~tmp2) - (43 | tmp2)",
        ];
        for case in cases {
            let once = canonicalize(&parse_expr(case), 8);
            let twice = canonicalize(&once, 8);
            assert_eq!(once, twice, "case: {}", case);
        }
    }
}
