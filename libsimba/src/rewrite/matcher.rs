//! The pattern matcher: structural matching with wildcards, modular constant comparison, and an
//! SMT-backed semantic fallback.

use crate::canonicalize::canonicalize;
use crate::fold::{eval_const, modulus};
use crate::grammar::collectors::{collect_var_names, collect_wildcards, is_const_expr};
use crate::grammar::compare::eq_commutative;
use crate::grammar::*;
use crate::leveling::{level, unlevel};
use crate::rewrite::Binding;
use crate::smt::{Solver, Verdict};

use std::rc::Rc;

/// Matches a pattern against a target expression, canonicalising and leveling both sides first.
///
/// On success, returns the binding of the pattern's wildcards to target subtrees.
pub fn match_expr(
    target: &RcExpr,
    pattern: &RcExpr,
    nbits: u32,
    solver: &dyn Solver,
) -> Option<Binding> {
    let target = level(&canonicalize(target, nbits), Some(BinaryOperator::Plus));
    let pattern = level(&canonicalize(pattern, nbits), Some(BinaryOperator::Plus));
    let mut matcher = PatternMatcher::new(&target, nbits, solver);
    if matcher.matches(&target, &pattern) {
        Some(matcher.into_binding())
    } else {
        None
    }
}

/// Matches one pattern against one target tree, accumulating wildcard bindings.
///
/// A matcher holds per-call state only (the current binding, the dead-binding list) and is
/// allocated fresh for every top-level match attempt.
pub struct PatternMatcher<'a> {
    /// Wildcards bound so far.
    wildcards: Binding,
    /// Bindings that are known not to extend to a full match; retried orderings at the root
    /// prune against these.
    no_solution: Vec<Binding>,
    /// The root of the match; symmetric retries apply only here.
    root: RcExpr,
    nbits: u32,
    solver: &'a dyn Solver,
}

impl<'a> PatternMatcher<'a> {
    /// Creates a matcher rooted at `root`.
    pub fn new(root: &RcExpr, nbits: u32, solver: &'a dyn Solver) -> Self {
        Self {
            wildcards: Binding::default(),
            no_solution: Vec::new(),
            root: Rc::clone(root),
            nbits,
            solver,
        }
    }

    /// Consumes the matcher, returning the accumulated binding.
    pub fn into_binding(self) -> Binding {
        self.wildcards
    }

    /// Matches `pattern` against `target`, extending the current binding.
    pub fn matches(&mut self, target: &RcExpr, pattern: &RcExpr) -> bool {
        // A wildcard pattern checks its binding against the target, or binds it.
        if let Expr::Var(name) = pattern.as_ref() {
            if is_wildcard(name) {
                return self.check_wildcard(target, name.clone());
            }
        }

        match (target.as_ref(), pattern.as_ref()) {
            (Expr::Num(a), Expr::Num(b)) => (a - b).rem_euclid(modulus(self.nbits)) == 0,
            (Expr::Var(a), Expr::Var(b)) => a == b,
            (Expr::UnaryExpr(t), Expr::UnaryExpr(p)) => {
                t.op == p.op && self.matches(&t.rhs, &p.rhs)
            }
            (Expr::BinaryExpr(t), Expr::BinaryExpr(p)) if t.op == p.op => {
                let (t, p) = (t.clone(), p.clone());
                self.match_binary(target, &t, &p)
            }
            (Expr::NaryExpr(t), Expr::NaryExpr(p)) => {
                let (t, p) = (t.clone(), p.clone());
                self.match_nary(&t, &p)
            }
            (Expr::Call(t), Expr::Call(p)) => {
                if t.func != p.func || t.args.len() != p.args.len() {
                    return false;
                }
                let pairs: Vec<_> = t
                    .args
                    .iter()
                    .cloned()
                    .zip(p.args.iter().cloned())
                    .collect();
                pairs.iter().all(|(t, p)| self.matches(t, p))
            }
            // Different node kinds may still be the same pattern written differently.
            _ => self.check_pattern(target, pattern),
        }
    }

    fn check_wildcard(&mut self, target: &RcExpr, name: String) -> bool {
        match self.wildcards.get(&name) {
            Some(bound) => {
                let bound = Rc::clone(bound);
                eq_commutative(&bound, target) || self.check_eq_smt(target, &bound)
            }
            None => {
                self.wildcards.insert(name, Rc::clone(target));
                true
            }
        }
    }

    /// Matches two applications of the same binary operator.
    ///
    /// Commutative operators try both operand pairings; each attempt snapshots the binding so a
    /// failed ordering leaks no partial assignments. Because matching one pairing can bind
    /// wildcards the other operand then has to satisfy, each pairing is also retried with the
    /// opposite evaluation order. At the root, a fully failed set of pairings records the binding
    /// as dead and retries once more against the pruned state.
    fn match_binary(&mut self, target: &RcExpr, t: &BinaryExpr, p: &BinaryExpr) -> bool {
        let previous = self.wildcards.clone();

        let cond1 = self.matches(&t.lhs, &p.lhs) && self.matches(&t.rhs, &p.rhs);
        let dead = self.binding_is_dead();
        if cond1 && !dead {
            return true;
        }
        if dead {
            self.wildcards = previous.clone();
        }
        if !cond1 && !dead {
            let backup = self.wildcards.clone();
            self.wildcards = previous.clone();
            let cond1_swapped = self.matches(&t.rhs, &p.rhs) && self.matches(&t.lhs, &p.lhs);
            if cond1_swapped {
                return true;
            }
            self.wildcards = backup;
        }

        if t.op.is_commutative() {
            let cond2 = self.matches(&t.lhs, &p.rhs) && self.matches(&t.rhs, &p.lhs);
            if cond2 {
                return true;
            }
            let backup = self.wildcards.clone();
            self.wildcards = previous.clone();
            let cond2_swapped = self.matches(&t.rhs, &p.lhs) && self.matches(&t.lhs, &p.rhs);
            if cond2_swapped {
                return true;
            }
            self.wildcards = backup;

            // Every pairing failed; at the root, mark the accumulated binding dead and retry
            // against the pruned state.
            if Rc::ptr_eq(target, &self.root) {
                self.no_solution.push(self.wildcards.clone());
                self.wildcards = previous;
                let cond1 = self.matches(&t.lhs, &p.lhs) && self.matches(&t.rhs, &p.rhs);
                if cond1 {
                    return true;
                }
                return self.matches(&t.lhs, &p.rhs) && self.matches(&t.rhs, &p.lhs);
            }
        }

        self.wildcards = previous;
        false
    }

    fn binding_is_dead(&self) -> bool {
        self.no_solution
            .iter()
            .any(|dead| dead.eq_commutative(&self.wildcards))
    }

    /// Matches leveled nodes of the same operator and arity, trying every permutation of the
    /// target's operands against the pattern's.
    fn match_nary(&mut self, t: &NaryExpr, p: &NaryExpr) -> bool {
        if t.op != p.op || t.args.len() != p.args.len() {
            return false;
        }
        let old = self.wildcards.clone();
        for perm in permutations(t.args.len()) {
            self.wildcards = old.clone();
            if perm
                .iter()
                .zip(p.args.iter())
                .all(|(&i, pattern)| {
                    let target = Rc::clone(&t.args[i]);
                    let pattern = Rc::clone(pattern);
                    self.matches(&target, &pattern)
                })
            {
                return true;
            }
        }
        self.wildcards = old;
        false
    }

    /// Targeted reductions for a pattern written differently from the target, applied in order.
    /// Each returns a decisive answer if its guard fires.
    fn check_pattern(&mut self, target: &RcExpr, pattern: &RcExpr) -> bool {
        let m = modulus(self.nbits);

        // A closed constant pattern against a literal folds and compares modularly.
        if is_const_expr(pattern) {
            if let Expr::Num(t) = target.as_ref() {
                return (eval_const(pattern, self.nbits) - t).rem_euclid(m) == 0;
            }
            // A closed pattern cannot match a non-literal except semantically.
            return self.check_eq_smt(target, pattern);
        }

        // A literal target against an open pattern is an equation to solve.
        if let Expr::Num(t) = target.as_ref() {
            return self.match_literal(*t, pattern);
        }

        // `~W` binds the complement of the target.
        if let Expr::UnaryExpr(unary_expr) = pattern.as_ref() {
            if unary_expr.op == UnaryOperator::BitNot {
                if let Expr::Var(name) = unary_expr.rhs.as_ref() {
                    if is_wildcard(name) && !self.wildcards.contains(name) {
                        let complement =
                            Expr::unary(UnaryOperator::BitNot, Rc::clone(target));
                        self.wildcards.insert(name.clone(), complement);
                        return true;
                    }
                }
            }
            return self.check_eq_smt(target, pattern);
        }

        if let Expr::BinaryExpr(binary_expr) = pattern.as_ref() {
            if binary_expr.op == BinaryOperator::Mult {
                // `(-1) * W` binds the negation of the target.
                if binary_expr.lhs.get_num() == Some(-1) {
                    if let Expr::Var(name) = binary_expr.rhs.as_ref() {
                        if is_wildcard(name) && !self.wildcards.contains(name) {
                            let negation = Expr::binary(
                                BinaryOperator::Mult,
                                Expr::num(-1),
                                Rc::clone(target),
                            );
                            self.wildcards.insert(name.clone(), negation);
                            return true;
                        }
                    }
                }

                // `2 * Q`: with every wildcard of `Q` bound, the doubling can be checked
                // semantically.
                let operand = if binary_expr.lhs.get_num() == Some(2) {
                    Some(&binary_expr.rhs)
                } else if binary_expr.rhs.get_num() == Some(2) {
                    Some(&binary_expr.lhs)
                } else {
                    None
                };
                return match operand {
                    Some(operand) => {
                        if collect_wildcards(operand)
                            .iter()
                            .any(|name| !self.wildcards.contains(name))
                        {
                            return false;
                        }
                        self.check_eq_smt(target, pattern)
                    }
                    // A multiplication pattern in neither special form cannot be reconciled.
                    None => false,
                };
            }
        }

        self.check_eq_smt(target, pattern)
    }

    /// Reduction for a literal target: substitute bound wildcards, then either compare the closed
    /// pattern or solve for the single remaining wildcard.
    ///
    /// A target equivalent to 0 is refused: too many equations hold there by accident, producing
    /// wrong bindings.
    fn match_literal(&mut self, value: i128, pattern: &RcExpr) -> bool {
        let m = modulus(self.nbits);
        if value.rem_euclid(m) == 0 {
            return false;
        }

        let substituted = self.wildcards.substitute(pattern);
        let names = collect_var_names(&substituted);
        if names.is_empty() {
            return is_const_expr(&substituted)
                && (eval_const(&substituted, self.nbits) - value).rem_euclid(m) == 0;
        }
        if names.len() > 1 {
            return false;
        }
        let name = names.into_iter().next().unwrap();
        if !is_wildcard(&name) {
            return false;
        }

        match self
            .solver
            .solve(value, &unlevel(&substituted), &name, self.nbits)
        {
            Some(model) => {
                self.wildcards.insert(name, Expr::num(model));
                true
            }
            None => false,
        }
    }

    /// The semantic fallback: with every wildcard bound, asks the solver whether the target and
    /// the substituted pattern disagree anywhere.
    ///
    /// Conservative on every failure: unbound wildcards, unencodable terms, solver timeouts, and
    /// closed targets equal to 0 all fail the match.
    fn check_eq_smt(&self, target: &RcExpr, pattern: &RcExpr) -> bool {
        let substituted = self.wildcards.substitute(pattern);
        if !collect_wildcards(&substituted).is_empty() {
            return false;
        }
        if is_const_expr(target) && eval_const(target, self.nbits) == 0 {
            return false;
        }
        let lhs = unlevel(target);
        let rhs = unlevel(&substituted);
        if eq_commutative(&lhs, &rhs) {
            return true;
        }
        self.solver.prove_equal(&lhs, &rhs, self.nbits) == Verdict::Proved
    }
}

/// All permutations of `0..n`, in lexicographic order.
fn permutations(n: usize) -> Vec<Vec<usize>> {
    fn build(prefix: &mut Vec<usize>, remaining: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if remaining.is_empty() {
            out.push(prefix.clone());
            return;
        }
        for i in 0..remaining.len() {
            let item = remaining.remove(i);
            prefix.push(item);
            build(prefix, remaining, out);
            prefix.pop();
            remaining.insert(i, item);
        }
    }
    let mut out = Vec::new();
    build(&mut Vec::new(), &mut (0..n).collect(), &mut out);
    out
}
