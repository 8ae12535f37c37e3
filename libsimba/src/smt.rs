//! The bit-vector SMT backend used by the pattern matcher's semantic fallback.
//!
//! Queries are small: a handful of width-`n` bit-vectors and one assertion. The engine asks two
//! kinds of questions — "are these two expressions equal for every valuation?" (an `unsat` check
//! of their disequality) and "which wildcard value makes this pattern equal a constant?" (a model
//! query). Solver failures of any kind are conservative: the matcher treats them as "not proved".

mod z3;

pub use z3::Z3Binary;

use crate::fold::modulus;
use crate::grammar::*;

/// The verdict of an equivalence query.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// The two expressions are equal for every valuation.
    Proved,
    /// A counterexample exists.
    Refuted,
    /// The solver could not decide (timeout, missing solver, unencodable term).
    Unknown,
}

/// A bit-vector solver.
pub trait Solver {
    /// Decides whether `lhs = rhs` holds for every valuation of their variables at width `n`.
    fn prove_equal(&self, lhs: &RcExpr, rhs: &RcExpr, nbits: u32) -> Verdict;

    /// Finds a value for `wildcard` such that `pattern = value (mod 2^n)`, if one exists.
    ///
    /// `wildcard` must be the only variable of `pattern`.
    fn solve(&self, value: i128, pattern: &RcExpr, wildcard: &str, nbits: u32) -> Option<i128>;
}

/// Renders an expression as an SMT-LIB2 bit-vector term of width `n`.
///
/// Foreign calls have no encoding; they surface as an error, which querying code reports as
/// [`Verdict::Unknown`](Verdict::Unknown).
pub(crate) fn emit_term(expr: &RcExpr, nbits: u32) -> Result<String, UnencodableTerm> {
    use BinaryOperator::*;
    match expr.as_ref() {
        Expr::Num(n) => Ok(format!("(_ bv{} {})", n.rem_euclid(modulus(nbits)), nbits)),
        Expr::Var(name) => Ok(name.clone()),
        Expr::BinaryExpr(binary_expr) => {
            let op = match binary_expr.op {
                Plus => "bvadd",
                Minus => "bvsub",
                Mult => "bvmul",
                BitAnd => "bvand",
                BitOr => "bvor",
                BitXor => "bvxor",
                Shl => "bvshl",
                Shr => "bvlshr",
            };
            Ok(format!(
                "({} {} {})",
                op,
                emit_term(&binary_expr.lhs, nbits)?,
                emit_term(&binary_expr.rhs, nbits)?
            ))
        }
        Expr::UnaryExpr(unary_expr) => {
            let op = match unary_expr.op {
                UnaryOperator::Neg => "bvneg",
                UnaryOperator::BitNot => "bvnot",
            };
            Ok(format!("({} {})", op, emit_term(&unary_expr.rhs, nbits)?))
        }
        Expr::NaryExpr(nary_expr) => {
            // Callers unlevel before querying; fold a chain anyway so stray leveled nodes
            // encode correctly.
            let op = match nary_expr.op {
                Plus => "bvadd",
                Mult => "bvmul",
                BitAnd => "bvand",
                BitOr => "bvor",
                BitXor => "bvxor",
                _ => unreachable!("leveled node with non-associative operator"),
            };
            let mut args = nary_expr.args.iter();
            let mut term = emit_term(args.next().expect("leveled node without operands"), nbits)?;
            for arg in args {
                term = format!("({} {} {})", op, term, emit_term(arg, nbits)?);
            }
            Ok(term)
        }
        Expr::Call(call) => Err(UnencodableTerm {
            func: call.func.clone(),
        }),
    }
}

/// Error raised when a term has no bit-vector encoding.
#[derive(Debug, Clone)]
pub(crate) struct UnencodableTerm {
    /// The foreign function that stopped the encoding.
    pub func: String,
}

impl core::fmt::Display for UnencodableTerm {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "foreign call \"{}\" has no bit-vector encoding", self.func)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test::parse_expr;

    macro_rules! emit_term_tests {
        ($($name:ident: $program:expr => $term:expr)*) => {
        $(
            #[test]
            fn $name() {
                let expr = parse_expr($program);
                assert_eq!(emit_term(&expr, 8).unwrap(), $term);
            }
        )*
        }
    }

    emit_term_tests! {
        num: "7" => "(_ bv7 8)"
        num_reduced: "300" => "(_ bv44 8)"
        var: "x" => "x"
        add: "x + 1" => "(bvadd x (_ bv1 8))"
        sub: "x - 1" => "(bvsub x (_ bv1 8))"
        neg: "-x" => "(bvneg x)"
        not: "~x" => "(bvnot x)"
        shifts: "x << 1 >> 2" => "(bvlshr (bvshl x (_ bv1 8)) (_ bv2 8))"
        mixed: "(x ^ ~y) + 2*(x | y)"
            => "(bvadd (bvxor x (bvnot y)) (bvmul (_ bv2 8) (bvor x y)))"
    }

    #[test]
    fn negative_literal_wraps() {
        let expr = crate::grammar::Expr::num(-1);
        assert_eq!(emit_term(&expr, 8).unwrap(), "(_ bv255 8)");
    }

    #[test]
    fn foreign_call_unencodable() {
        let expr = parse_expr("bv32(x) + 1");
        assert!(emit_term(&expr, 8).is_err());
    }
}
