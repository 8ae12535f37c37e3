//! The arithmetic simplifier: sum-of-products normal form modulo `2^n`.
//!
//! Bitwise subtrees are first *frozen* into opaque function applications so the arithmetic core
//! cannot distribute through them. The remaining arithmetic skeleton is expanded into a
//! [polynomial](crate::math::Poly) over opaque atoms, which collects like terms and reduces
//! coefficients modulo `2^n`, and is then re-emitted in a stable shape. Finally the freezing is
//! inverted.
//!
//! ```text
//! (x | y) + x + 2*x - (x | y)  ->  3*x
//! ```

use crate::grammar::compare::canonical_key;
use crate::grammar::*;
use crate::math::Poly;

use std::collections::HashMap;
use std::rc::Rc;

/// Names standing for bitwise operators while a tree is frozen.
const FROZEN_FUNCS: &[(&str, BinaryOperator)] = &[
    ("band", BinaryOperator::BitAnd),
    ("bor", BinaryOperator::BitOr),
    ("bxor", BinaryOperator::BitXor),
    ("bshl", BinaryOperator::Shl),
    ("bshr", BinaryOperator::Shr),
];

const FROZEN_NOT: &str = "bnot";

/// Reduces the arithmetic skeleton of `expr` to a canonical sum-of-products form modulo `2^n`,
/// treating bitwise subtrees as opaque terms.
///
/// The result orders the constant term first and then monomials in a stable order, each emitted
/// as `coeff * atom * ...` with unit coefficients omitted. The input must be unleveled.
pub fn simplify_arith(expr: &RcExpr, nbits: u32) -> RcExpr {
    let frozen = freeze(expr);
    let mut atoms = AtomTable::default();
    let normalized = normalize(&frozen, nbits, &mut atoms);
    unfreeze(&normalized)
}

/// Interned opaque atoms, keyed by canonical key so commutatively equal subtrees share one atom.
#[derive(Default)]
struct AtomTable {
    exprs: Vec<RcExpr>,
    ids: HashMap<String, usize>,
}

impl AtomTable {
    fn intern(&mut self, expr: RcExpr) -> usize {
        let key = canonical_key(&expr);
        if let Some(&id) = self.ids.get(&key) {
            return id;
        }
        let id = self.exprs.len();
        self.exprs.push(expr);
        self.ids.insert(key, id);
        id
    }

    fn get(&self, id: usize) -> &RcExpr {
        &self.exprs[id]
    }
}

/// Renames bitwise operators into opaque applications: `x & y` becomes `band(x, y)`.
fn freeze(expr: &RcExpr) -> RcExpr {
    struct Freeze;
    impl Transformer for Freeze {
        fn transform_expr(&mut self, expr: &RcExpr) -> RcExpr {
            match expr.as_ref() {
                Expr::BinaryExpr(binary_expr) => {
                    let lhs = self.transform_expr(&binary_expr.lhs);
                    let rhs = self.transform_expr(&binary_expr.rhs);
                    match FROZEN_FUNCS.iter().find(|(_, op)| *op == binary_expr.op) {
                        Some((name, _)) => Expr::call(*name, vec![lhs, rhs]),
                        None => Expr::binary(binary_expr.op, lhs, rhs),
                    }
                }
                Expr::UnaryExpr(unary_expr) if unary_expr.op == UnaryOperator::BitNot => {
                    Expr::call(FROZEN_NOT, vec![self.transform_expr(&unary_expr.rhs)])
                }
                _ => self.walk_expr(expr),
            }
        }
    }
    Freeze.transform_expr(expr)
}

/// Inverts [`freeze`](freeze).
fn unfreeze(expr: &RcExpr) -> RcExpr {
    struct Unfreeze;
    impl Transformer for Unfreeze {
        fn transform_expr(&mut self, expr: &RcExpr) -> RcExpr {
            if let Expr::Call(call) = expr.as_ref() {
                if call.args.len() == 2 {
                    if let Some((_, op)) =
                        FROZEN_FUNCS.iter().find(|(name, _)| *name == call.func)
                    {
                        return Expr::binary(
                            *op,
                            self.transform_expr(&call.args[0]),
                            self.transform_expr(&call.args[1]),
                        );
                    }
                }
                if call.args.len() == 1 && call.func == FROZEN_NOT {
                    return Expr::unary(UnaryOperator::BitNot, self.transform_expr(&call.args[0]));
                }
            }
            self.walk_expr(expr)
        }
    }
    Unfreeze.transform_expr(expr)
}

/// Normalizes a frozen tree: polynomial expansion followed by stable re-emission.
fn normalize(expr: &RcExpr, nbits: u32, atoms: &mut AtomTable) -> RcExpr {
    let poly = to_poly(expr, nbits, atoms);
    poly_to_expr(&poly, atoms)
}

fn to_poly(expr: &RcExpr, nbits: u32, atoms: &mut AtomTable) -> Poly {
    match expr.as_ref() {
        Expr::Num(n) => Poly::constant(*n, nbits),
        Expr::Var(_) => {
            let id = atoms.intern(Rc::clone(expr));
            Poly::atom(id, nbits)
        }
        Expr::Call(call) => {
            // Opaque applications keep their own arithmetic normalized, the way an
            // uninterpreted function's arguments would be.
            let args: Vec<RcExpr> = call
                .args
                .iter()
                .map(|arg| normalize(arg, nbits, atoms))
                .collect();
            let id = atoms.intern(Expr::call(call.func.clone(), args));
            Poly::atom(id, nbits)
        }
        Expr::BinaryExpr(binary_expr) => {
            let lhs = to_poly(&binary_expr.lhs, nbits, atoms);
            let rhs = to_poly(&binary_expr.rhs, nbits, atoms);
            match binary_expr.op {
                BinaryOperator::Plus => lhs.add(rhs),
                BinaryOperator::Minus => lhs.add(rhs.neg()),
                BinaryOperator::Mult => lhs.mul(&rhs),
                op => unreachable!("bitwise operator {:?} survived freezing", op),
            }
        }
        Expr::UnaryExpr(unary_expr) => match unary_expr.op {
            UnaryOperator::Neg => to_poly(&unary_expr.rhs, nbits, atoms).neg(),
            UnaryOperator::BitNot => unreachable!("complement survived freezing"),
        },
        Expr::NaryExpr(nary_expr) => {
            let mut args = nary_expr.args.iter().map(|arg| to_poly(arg, nbits, atoms));
            let first = args.next().expect("leveled node without operands");
            match nary_expr.op {
                BinaryOperator::Plus => args.fold(first, Poly::add),
                BinaryOperator::Mult => args.fold(first, |acc, p| acc.mul(&p)),
                op => unreachable!("bitwise operator {:?} survived freezing", op),
            }
        }
    }
}

fn poly_to_expr(poly: &Poly, atoms: &AtomTable) -> RcExpr {
    if poly.is_zero() {
        return Expr::num(0);
    }

    let mut terms = Vec::new();
    for (mono, coeff) in poly.terms() {
        let mut factors: Vec<RcExpr> = Vec::with_capacity(mono.len() + 1);
        if mono.is_empty() || coeff != 1 {
            factors.push(Expr::num(coeff));
        }
        for &id in mono {
            factors.push(Rc::clone(atoms.get(id)));
        }
        let mut factors = factors.into_iter();
        let first = factors.next().unwrap();
        terms.push(factors.fold(first, |acc, f| Expr::binary(BinaryOperator::Mult, acc, f)));
    }

    let mut terms = terms.into_iter();
    let first = terms.next().unwrap();
    terms.fold(first, |acc, t| Expr::binary(BinaryOperator::Plus, acc, t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::Emit;
    use crate::utils::test::parse_expr;

    macro_rules! arith_tests {
        ($($name:ident: $nbits:expr, $program:expr => $pretty:expr)*) => {
        $(
            #[test]
            fn $name() {
                let expr = parse_expr($program);
                let simplified = simplify_arith(&expr, $nbits);
                assert_eq!(simplified.emit_pretty(), $pretty);
            }
        )*
        }
    }

    arith_tests! {
        variable:          8, "x"                => "x"
        cancellation:      8, "x + 3 - 3"        => "x"
        product_cancel:    8, "x + x*y - x*y"    => "x"
        const_collect:     8, "x + 45 + 243"     => "(32 + x)"
        like_terms:        8, "x + x + x"        => "(3 * x)"
        coeff_expand:      8, "2*(x + 3) - 2*x"  => "6"
        to_zero:           8, "x - x"            => "0"
        neg_fold:          8, "-x + x"           => "0"
        mod_wrap:          8, "255*x + x"        => "0"
        opaque_bitwise:    8, "(x | y) + x + 2*x - (x | y)" => "(3 * x)"
        opaque_collects:   8, "(x & y) + (x & y)" => "(2 * (x & y))"
        opaque_commutes:   8, "(x & y) + (y & x)" => "(2 * (x & y))"
        no_distribution:   8, "2*(x & y)"         => "(2 * (x & y))"
        inner_arith:       8, "(x + x & y) + 0"   => "((2 * x) & y)"
        square:            8, "x*x + x*x"         => "((2 * x) * x)"
        big_constants:    32, "(2937410391*x + 83248285) - 1 + 4064867995" => "(4148116279 + (2937410391 * x))"
        shifts_opaque:     8, "(x >> 1) + (x >> 1)" => "(2 * (x >> 1))"
        complement_opaque: 8, "~x + ~x"            => "(2 * ~x)"
    }

    #[test]
    fn sound_at_width() {
        use crate::fold::eval_const;
        use crate::rewrite::Binding;

        // Spot-check the normal form against brute-force evaluation at width 4.
        let cases = vec!["x + 3*x - 2", "2*(x + 3) + x*x", "5 - x - x"];
        for case in cases {
            let expr = parse_expr(case);
            let simplified = simplify_arith(&expr, 4);
            for value in 0..16 {
                let mut binding = Binding::default();
                binding.insert("x", Expr::num(value));
                let lhs = binding.substitute(&expr);
                let rhs = binding.substitute(&simplified);
                assert_eq!(
                    eval_const(&lhs, 4),
                    eval_const(&rhs, 4),
                    "case: {} at x={}",
                    case,
                    value
                );
            }
        }
    }
}
