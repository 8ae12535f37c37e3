//! The pattern-driven rewriter: replaces matched pattern instances in a target tree.

use crate::grammar::*;
use crate::leveling::unlevel;
use crate::rewrite::PatternMatcher;
use crate::smt::Solver;

use std::rc::Rc;

/// Rewrites instances of one pattern inside a target tree.
///
/// The tree is walked top-down; `BinaryExpr` and `NaryExpr` nodes attempt a whole-node match
/// first and are replaced on success. A leveled node whose operand list is longer than the
/// pattern's additionally tries every operand subset of the pattern's size, splicing the
/// replacement in with the remaining operands — the n-to-m associative rule application. At most
/// one rule application happens per node per pass; the driver re-runs the rule list to propagate.
pub struct Replacer<'a> {
    pattern: RcExpr,
    replacement: RcExpr,
    nbits: u32,
    solver: &'a dyn Solver,
}

impl<'a> Replacer<'a> {
    /// Creates a replacer for one `(pattern, replacement)` rule.
    ///
    /// The pattern should be canonicalised and leveled the same way targets are; the replacement
    /// is spliced verbatim under the matched binding.
    pub fn new(
        pattern: &RcExpr,
        replacement: &RcExpr,
        nbits: u32,
        solver: &'a dyn Solver,
    ) -> Self {
        Self {
            pattern: Rc::clone(pattern),
            replacement: Rc::clone(replacement),
            nbits,
            solver,
        }
    }

    /// Applies the rule everywhere it matches in `target`.
    pub fn apply(&self, target: &RcExpr) -> RcExpr {
        match target.as_ref() {
            Expr::BinaryExpr(_) => match self.try_whole_node(target) {
                Some(replaced) => replaced,
                None => self.descend(target),
            },
            Expr::NaryExpr(nary_expr) => match self.try_nary(target, nary_expr) {
                Some(replaced) => replaced,
                None => self.descend(target),
            },
            _ => self.descend(target),
        }
    }

    /// Rebuilds `target` over rewritten children.
    fn descend(&self, target: &RcExpr) -> RcExpr {
        match target.as_ref() {
            Expr::Num(_) | Expr::Var(_) => Rc::clone(target),
            Expr::BinaryExpr(binary_expr) => Expr::binary(
                binary_expr.op,
                self.apply(&binary_expr.lhs),
                self.apply(&binary_expr.rhs),
            ),
            Expr::UnaryExpr(unary_expr) => {
                Expr::unary(unary_expr.op, self.apply(&unary_expr.rhs))
            }
            Expr::NaryExpr(nary_expr) => Expr::nary(
                nary_expr.op,
                nary_expr.args.iter().map(|arg| self.apply(arg)).collect(),
            ),
            Expr::Call(call) => Expr::call(
                call.func.clone(),
                call.args.iter().map(|arg| self.apply(arg)).collect(),
            ),
        }
    }

    /// Matches the pattern against the whole node, splicing the substituted replacement on
    /// success.
    fn try_whole_node(&self, node: &RcExpr) -> Option<RcExpr> {
        let mut matcher = PatternMatcher::new(node, self.nbits, self.solver);
        if matcher.matches(node, &self.pattern) {
            Some(matcher.into_binding().substitute(&self.replacement))
        } else {
            None
        }
    }

    /// Matching at a leveled node: whole-node for same-arity patterns, otherwise subset
    /// splicing against a leveled or binary pattern of the same operator.
    fn try_nary(&self, node: &RcExpr, nary_expr: &NaryExpr) -> Option<RcExpr> {
        match self.pattern.as_ref() {
            Expr::NaryExpr(pattern) if pattern.op == nary_expr.op => {
                if pattern.args.len() == nary_expr.args.len() {
                    self.try_whole_node(node)
                } else if pattern.args.len() < nary_expr.args.len() {
                    self.try_subsets(nary_expr, pattern.args.len())
                } else {
                    None
                }
            }
            Expr::BinaryExpr(pattern) if pattern.op == nary_expr.op => {
                self.try_subsets(nary_expr, 2)
            }
            _ => None,
        }
    }

    /// Tries every `k`-subset of the node's operands against the pattern. On a match, the
    /// substituted replacement joins the unmatched operands and the spliced node is unleveled.
    fn try_subsets(&self, nary_expr: &NaryExpr, k: usize) -> Option<RcExpr> {
        for subset in combinations(nary_expr.args.len(), k) {
            let picked: Vec<RcExpr> = subset
                .iter()
                .map(|&i| Rc::clone(&nary_expr.args[i]))
                .collect();
            // A leveled pattern probes a leveled node; a binary pattern probes a binary node.
            let probe = match self.pattern.as_ref() {
                Expr::NaryExpr(_) => Expr::nary(nary_expr.op, picked),
                _ => {
                    debug_assert_eq!(k, 2);
                    let mut picked = picked.into_iter();
                    let (lhs, rhs) = (picked.next().unwrap(), picked.next().unwrap());
                    Expr::binary(nary_expr.op, lhs, rhs)
                }
            };

            let mut matcher = PatternMatcher::new(&probe, self.nbits, self.solver);
            if matcher.matches(&probe, &self.pattern) {
                let replaced = matcher.into_binding().substitute(&self.replacement);
                let mut args = Vec::with_capacity(nary_expr.args.len() - k + 1);
                args.push(replaced);
                for (i, arg) in nary_expr.args.iter().enumerate() {
                    if !subset.contains(&i) {
                        args.push(Rc::clone(arg));
                    }
                }
                let spliced = if args.len() == 1 {
                    args.pop().unwrap()
                } else {
                    Expr::nary(nary_expr.op, args)
                };
                return Some(unlevel(&spliced));
            }
        }
        None
    }
}

/// All `k`-subsets of `0..n` as sorted index vectors, in lexicographic order.
fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    fn build(start: usize, n: usize, k: usize, prefix: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if prefix.len() == k {
            out.push(prefix.clone());
            return;
        }
        for i in start..n {
            prefix.push(i);
            build(i + 1, n, k, prefix, out);
            prefix.pop();
        }
    }
    let mut out = Vec::new();
    if k <= n {
        build(0, n, k, &mut Vec::new(), &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonicalize::canonicalize;
    use crate::emit::Emit;
    use crate::grammar::compare::eq_commutative;
    use crate::leveling::level;
    use crate::smt::Z3Binary;
    use crate::utils::test::parse_expr;

    /// Mirrors the driver's rule preparation: pattern canonicalised and leveled on `+`,
    /// replacement raw, target canonicalised and leveled on `+`.
    fn replace(target: &str, pattern: &str, replacement: &str, nbits: u32) -> RcExpr {
        let solver = Z3Binary::default();
        let target = level(
            &canonicalize(&parse_expr(target), nbits),
            Some(BinaryOperator::Plus),
        );
        let pattern = level(
            &canonicalize(&parse_expr(pattern), nbits),
            Some(BinaryOperator::Plus),
        );
        let replacement = parse_expr(replacement);
        Replacer::new(&pattern, &replacement, nbits, &solver).apply(&target)
    }

    /// Raw replacement, without canonicalisation: matches the rule and target trees as written.
    fn replace_raw(target: &str, pattern: &str, replacement: &str, nbits: u32) -> RcExpr {
        let solver = Z3Binary::default();
        let target = parse_expr(target);
        let pattern = parse_expr(pattern);
        let replacement = parse_expr(replacement);
        Replacer::new(&pattern, &replacement, nbits, &solver).apply(&target)
    }

    macro_rules! replacer_tests {
        ($($name:ident: $target:expr => $expected:expr)*) => {
        $(
            #[test]
            fn $name() {
                let replaced = replace_raw($target, "(A ^ ~B) + 2*(A | B)", "A + B - 1", 8);
                assert!(
                    eq_commutative(&replaced, &parse_expr($expected)),
                    "got: {}", replaced.emit_pretty()
                );
            }
        )*
        }
    }

    replacer_tests! {
        simple:      "(x ^ ~y) + 2*(x | y)" => "x + y - 1"
        const_side:  "(x ^ ~45) + (45 | x)*2" => "x + 45 - 1"
        nested:      "((a + 32) ^ ~(var*5)) + ((a + 32) | (var*5))*2"
            => "(a + 32) + (var*5) - 1"
        in_context:  "z * ((x ^ ~y) + 2*(x | y))" => "z * (x + y - 1)"
        no_match:    "(x ^ y) + 2*(x & y)" => "(x ^ y) + 2*(x & y)"
    }

    #[test]
    fn associative_two_of_three() {
        // 3*A + 2*B -> B over a three-operand sum leaves the spectator operand in place.
        let replaced = replace("2*x + y + 3*g", "3*A + 2*B", "B", 8);
        assert!(
            eq_commutative(&replaced, &parse_expr("x + y")),
            "got: {}",
            replaced.emit_pretty()
        );
    }

    #[test]
    fn associative_exact_pair() {
        let replaced = replace("2*x + 3*y", "3*A + 2*B", "B", 8);
        assert!(
            eq_commutative(&replaced, &parse_expr("x")),
            "got: {}",
            replaced.emit_pretty()
        );
    }

    #[test]
    fn leveled_pattern_in_larger_sum() {
        // A three-operand pattern inside a four-operand sum.
        let replaced = replace("3*z + x + 2*y + w", "A + 2*B + 3*C", "A", 8);
        assert!(
            eq_commutative(&replaced, &parse_expr("x + w")),
            "got: {}",
            replaced.emit_pretty()
        );
    }

    #[test]
    fn leveled_pattern_same_arity() {
        let replaced = replace("3*z + x + 2*y", "A + 2*B + 3*C", "A", 8);
        assert!(
            eq_commutative(&replaced, &parse_expr("x")),
            "got: {}",
            replaced.emit_pretty()
        );
    }

    #[test]
    fn mismatched_nary_op_untouched() {
        let solver = Z3Binary::default();
        let target = level(&parse_expr("3*z ^ x ^ 2*y"), None);
        let pattern = level(&parse_expr("A + 3*z"), None);
        let replacement = parse_expr("A");
        let replaced = Replacer::new(&pattern, &replacement, 8, &solver).apply(&target);
        assert!(eq_commutative(&replaced, &target));
    }

    #[test]
    fn real_mba_chain() {
        let replaced = replace(
            "(4211719010 ^ 2937410391*x) + 2*(2937410391*x | 83248285) + 4064867995",
            "(A ^ ~B) + 2*(A | B)",
            "A + B - 1",
            32,
        );
        assert!(
            eq_commutative(
                &replaced,
                &parse_expr("(((2937410391 * x) + 83248285) - 1) + 4064867995")
            ),
            "got: {}",
            replaced.emit_pretty()
        );
    }

    #[test]
    fn combinations_cover_subsets() {
        assert_eq!(
            combinations(4, 2),
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3]
            ]
        );
        assert_eq!(combinations(2, 2), vec![vec![0, 1]]);
        assert!(combinations(1, 2).is_empty());
    }
}
