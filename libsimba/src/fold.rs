//! Constant folding and literal reduction modulo `2^n`.

use crate::grammar::collectors::is_const_expr;
use crate::grammar::*;

use std::rc::Rc;

/// Folds every closed constant subtree to a single literal, reduced modulo `2^n`.
///
/// Leveled nodes fold their literal operands into one literal child (kept after the symbolic
/// operands), which is enough because leveled operators are associative and commutative.
pub fn fold_constants(expr: &RcExpr, nbits: u32) -> RcExpr {
    match expr.as_ref() {
        Expr::BinaryExpr(_) | Expr::UnaryExpr(_) if is_const_expr(expr) => {
            Expr::num(eval_const(expr, nbits))
        }
        Expr::Num(_) | Expr::Var(_) => Rc::clone(expr),
        Expr::BinaryExpr(binary_expr) => Expr::binary(
            binary_expr.op,
            fold_constants(&binary_expr.lhs, nbits),
            fold_constants(&binary_expr.rhs, nbits),
        ),
        Expr::UnaryExpr(unary_expr) => {
            Expr::unary(unary_expr.op, fold_constants(&unary_expr.rhs, nbits))
        }
        Expr::NaryExpr(nary_expr) => {
            let args: Vec<RcExpr> = nary_expr
                .args
                .iter()
                .map(|arg| fold_constants(arg, nbits))
                .collect();
            let literals: Vec<i128> = args.iter().filter_map(|arg| arg.get_num()).collect();
            if literals.len() < 2 {
                return Expr::nary(nary_expr.op, args);
            }
            let folded = literals
                .into_iter()
                .map(|n| n.rem_euclid(modulus(nbits)))
                .fold(None, |acc, n| match acc {
                    None => Some(n),
                    Some(acc) => Some(eval_binary(nary_expr.op, acc, n, nbits)),
                })
                .unwrap();
            let mut rest: Vec<RcExpr> = args.into_iter().filter(|arg| !arg.is_num()).collect();
            rest.push(Expr::num(folded));
            if rest.len() == 1 {
                rest.pop().unwrap()
            } else {
                Expr::nary(nary_expr.op, rest)
            }
        }
        Expr::Call(call) => Expr::call(
            call.func.clone(),
            call.args
                .iter()
                .map(|arg| fold_constants(arg, nbits))
                .collect(),
        ),
    }
}

/// Reduces every literal in the tree modulo `2^n`.
pub fn reduce_literals(expr: &RcExpr, nbits: u32) -> RcExpr {
    struct Reduce {
        nbits: u32,
    }
    impl Transformer for Reduce {
        fn transform_expr(&mut self, expr: &RcExpr) -> RcExpr {
            match expr.as_ref() {
                Expr::Num(n) => Expr::num(n.rem_euclid(modulus(self.nbits))),
                _ => self.walk_expr(expr),
            }
        }
    }
    Reduce { nbits }.transform_expr(expr)
}

/// `2^n` as an `i128`. Widths are validated to `1..=64`, so this cannot overflow.
pub(crate) fn modulus(nbits: u32) -> i128 {
    1i128 << nbits
}

/// Evaluates a closed constant expression to its value modulo `2^n`.
///
/// Panics when the expression contains a variable or foreign call; callers check
/// [`is_const_expr`](crate::grammar::collectors::is_const_expr) first.
pub(crate) fn eval_const(expr: &RcExpr, nbits: u32) -> i128 {
    match expr.as_ref() {
        Expr::Num(n) => n.rem_euclid(modulus(nbits)),
        Expr::BinaryExpr(binary_expr) => eval_binary(
            binary_expr.op,
            eval_const(&binary_expr.lhs, nbits),
            eval_const(&binary_expr.rhs, nbits),
            nbits,
        ),
        Expr::UnaryExpr(unary_expr) => {
            eval_unary(unary_expr.op, eval_const(&unary_expr.rhs, nbits), nbits)
        }
        Expr::NaryExpr(nary_expr) => nary_expr
            .args
            .iter()
            .map(|arg| eval_const(arg, nbits))
            .fold(None, |acc, n| match acc {
                None => Some(n),
                Some(acc) => Some(eval_binary(nary_expr.op, acc, n, nbits)),
            })
            .expect("leveled node without operands"),
        Expr::Var(_) | Expr::Call(_) => {
            unreachable!("constant evaluation of an open expression: {:?}", expr)
        }
    }
}

/// Evaluates `a op b` at width `n`. Operands must already be reduced to `[0, 2^n)`.
///
/// `>>` is a logical shift on the n-bit value, matching the engine's SMT encoding (`bvlshr`).
pub(crate) fn eval_binary(op: BinaryOperator, a: i128, b: i128, nbits: u32) -> i128 {
    use BinaryOperator::*;
    let m = modulus(nbits);
    debug_assert!((0..m).contains(&a) && (0..m).contains(&b));
    match op {
        Plus => (a + b).rem_euclid(m),
        Minus => (a - b).rem_euclid(m),
        Mult => ((a as u128).wrapping_mul(b as u128) % (m as u128)) as i128,
        BitAnd => a & b,
        BitOr => a | b,
        BitXor => a ^ b,
        Shl => {
            if b >= nbits as i128 {
                0
            } else {
                ((a as u128) << (b as u32)).rem_euclid(m as u128) as i128
            }
        }
        Shr => {
            if b >= nbits as i128 {
                0
            } else {
                a >> (b as u32)
            }
        }
    }
}

/// Evaluates `op a` at width `n`. The operand must already be reduced to `[0, 2^n)`.
pub(crate) fn eval_unary(op: UnaryOperator, a: i128, nbits: u32) -> i128 {
    let m = modulus(nbits);
    debug_assert!((0..m).contains(&a));
    match op {
        UnaryOperator::Neg => (-a).rem_euclid(m),
        UnaryOperator::BitNot => (m - 1) ^ a,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::Emit;
    use crate::leveling::level;
    use crate::utils::test::parse_expr;

    macro_rules! fold_tests {
        ($($name:ident: $nbits:expr, $program:expr => $s_form:expr)*) => {
        $(
            #[test]
            fn $name() {
                let expr = parse_expr($program);
                let folded = fold_constants(&expr, $nbits);
                assert_eq!(folded.emit_s_expression(), $s_form);
            }
        )*
        }
    }

    fold_tests! {
        add:               8, "1 + 2"          => "3"
        add_mod:           8, "200 + 100"      => "44"
        sub_mod:           8, "1 - 2"          => "255"
        mult:              8, "16 * 16"        => "0"
        neg:               8, "-1"             => "255"
        not:               8, "~0"             => "255"
        not_value:        32, "~4211719010"    => "83248285"
        and:               8, "0x0f & 0x3c"    => "12"
        or:                8, "0x0f | 0x30"    => "63"
        xor:              32, "4211719010 ^ 0" => "4211719010"
        shl:               8, "1 << 3"         => "8"
        shl_overflow:      8, "1 << 9"         => "0"
        shr:               8, "128 >> 3"       => "16"
        shr_all:           8, "128 >> 200"     => "0"
        nested:            8, "~(1 << 4) + 1"  => "240"
        open_untouched:    8, "x + 1"          => "(+ x 1)"
        open_inner_folds:  8, "x + (1 + 2)*1"  => "(+ x 3)"
        call_arg_folds:    8, "bv32(1 + 2)"    => "(bv32 3)"
    }

    #[test]
    fn nary_partial_fold() {
        let expr = level(&parse_expr("45 + x + 32"), None);
        let folded = fold_constants(&expr, 32);
        assert_eq!(folded.emit_s_expression(), "(+ x 77)");
    }

    #[test]
    fn nary_single_literal_untouched() {
        let expr = level(&parse_expr("45 + x + y"), None);
        let folded = fold_constants(&expr, 32);
        assert_eq!(folded.emit_s_expression(), "(+ 45 x y)");
    }

    #[test]
    fn nary_all_literals() {
        let expr = level(&parse_expr("45 + 3 + 32"), None);
        let folded = fold_constants(&expr, 32);
        assert_eq!(folded.emit_s_expression(), "80");
    }

    #[test]
    fn nary_mult_fold() {
        let expr = level(&parse_expr("2 * x * 3"), None);
        let folded = fold_constants(&expr, 8);
        assert_eq!(folded.emit_s_expression(), "(* x 6)");
    }

    #[test]
    fn reduce_literals_everywhere() {
        let expr = parse_expr("(300 & x) + bv32(257) - 1");
        let reduced = reduce_literals(&expr, 8);
        assert_eq!(reduced.emit_s_expression(), "(- (+ (& 44 x) (bv32 1)) 1)");
    }

    #[test]
    fn fold_matches_modular_eval() {
        // fold(c, n).value == eval(c) mod 2^n for closed expressions.
        let cases = vec!["1 + 2*3", "-(2 + 3)", "~(255 - 3)", "(250 | 5) ^ 17"];
        for case in cases {
            for &nbits in &[8u32, 16, 32, 64] {
                let expr = parse_expr(case);
                let folded = fold_constants(&expr, nbits);
                let value = folded.get_num().expect("closed expression must fold");
                assert_eq!(value, eval_const(&expr, nbits), "case: {} @ {}", case, nbits);
                assert!((0..modulus(nbits)).contains(&value));
            }
        }
    }
}
