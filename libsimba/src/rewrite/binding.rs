//! Bindings of names to expression subtrees.
//!
//! The matcher binds wildcards; the driver reuses the same structure to thread assigned variables
//! between statements. Snapshotting a binding is a plain clone of reference-counted subtrees, so
//! the matcher's backtracking never copies trees.

use crate::grammar::compare::eq_commutative;
use crate::grammar::*;

use std::collections::HashMap;
use std::rc::Rc;

/// A mapping of variable names to expression subtrees.
#[derive(Clone, Debug, Default)]
pub struct Binding {
    map: HashMap<String, RcExpr>,
}

impl Binding {
    /// Looks up the subtree bound to `name`.
    pub fn get(&self, name: &str) -> Option<&RcExpr> {
        self.map.get(name)
    }

    /// Whether `name` is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// Binds `name` to `value`, returning any previous binding.
    pub fn insert<S: Into<String>>(&mut self, name: S, value: RcExpr) -> Option<RcExpr> {
        self.map.insert(name.into(), value)
    }

    /// Whether no name is bound.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Substitutes every bound variable of `expr` with its bound subtree.
    pub fn substitute(&self, expr: &RcExpr) -> RcExpr {
        if self.map.is_empty() {
            return Rc::clone(expr);
        }
        struct Substitute<'a> {
            binding: &'a Binding,
        }
        impl Transformer for Substitute<'_> {
            fn transform_expr(&mut self, expr: &RcExpr) -> RcExpr {
                match expr.as_ref() {
                    Expr::Var(name) => match self.binding.get(name) {
                        Some(value) => Rc::clone(value),
                        None => Rc::clone(expr),
                    },
                    _ => self.walk_expr(expr),
                }
            }
        }
        Substitute { binding: self }.transform_expr(expr)
    }

    /// Compares two bindings: same names, and bound subtrees equal modulo commutativity.
    pub fn eq_commutative(&self, other: &Binding) -> bool {
        self.map.len() == other.map.len()
            && self.map.iter().all(|(name, value)| {
                other
                    .get(name)
                    .map_or(false, |other_value| eq_commutative(value, other_value))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::Emit;
    use crate::utils::test::parse_expr;

    #[test]
    fn substitute() {
        let mut binding = Binding::default();
        binding.insert("A", parse_expr("x + 1"));
        binding.insert("B", parse_expr("y"));

        let template = parse_expr("(A ^ ~B) + A");
        let result = binding.substitute(&template);
        assert_eq!(result.emit_pretty(), "(((x + 1) ^ ~y) + (x + 1))");
    }

    #[test]
    fn substitute_leaves_unbound() {
        let mut binding = Binding::default();
        binding.insert("A", parse_expr("1"));
        let result = binding.substitute(&parse_expr("A + B + x"));
        assert_eq!(result.emit_pretty(), "((1 + B) + x)");
    }

    #[test]
    fn eq_commutative_bindings() {
        let mut a = Binding::default();
        a.insert("A", parse_expr("x + y"));
        let mut b = Binding::default();
        b.insert("A", parse_expr("y + x"));
        let mut c = Binding::default();
        c.insert("A", parse_expr("x * y"));

        assert!(a.eq_commutative(&b));
        assert!(!a.eq_commutative(&c));
        assert!(!a.eq_commutative(&Binding::default()));
    }
}
