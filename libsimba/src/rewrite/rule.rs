//! Rewrite rules and the rule library.

use crate::canonicalize::canonicalize;
use crate::diagnostics::Diagnostic;
use crate::grammar::collectors::collect_wildcards;
use crate::grammar::*;
use crate::leveling::level;
use crate::parser::parse_expression;
use crate::scanner::scan;
use crate::utils::indent;

use core::fmt;
use std::error::Error;

/// A built rewrite rule.
///
/// The pattern is canonicalised and leveled on `+`, the shape targets have when the rewriter
/// runs; the replacement is kept as written and substituted verbatim.
#[derive(Debug)]
pub struct Rule {
    pattern: RcExpr,
    replacement: RcExpr,
    source: (String, String),
}

impl Rule {
    /// Builds a rule from its textual `(pattern, replacement)` form at width `n`.
    pub fn build(pattern: &str, replacement: &str, nbits: u32) -> Result<Rule, BuildRuleError> {
        let pattern_ast = Self::parse_side(pattern)?;
        let replacement_ast = Self::parse_side(replacement)?;

        // Every wildcard the replacement mentions must be bound by the pattern.
        let bound = collect_wildcards(&pattern_ast);
        let mut unbound: Vec<String> = collect_wildcards(&replacement_ast)
            .into_iter()
            .filter(|name| !bound.contains(name))
            .collect();
        if !unbound.is_empty() {
            unbound.sort();
            return Err(BuildRuleError {
                rule: format!("{} -> {}", pattern, replacement),
                reason: format!(
                    r#"replacement wildcard(s) "{}" are not bound by the pattern"#,
                    unbound.join(r#"", ""#)
                ),
            });
        }

        let pattern_ast = level(
            &canonicalize(&pattern_ast, nbits),
            Some(BinaryOperator::Plus),
        );
        Ok(Rule {
            pattern: pattern_ast,
            replacement: replacement_ast,
            source: (pattern.to_string(), replacement.to_string()),
        })
    }

    fn parse_side(text: &str) -> Result<RcExpr, BuildRuleError> {
        let scanned = scan(text);
        let (expr, parse_diagnostics) = parse_expression(scanned.tokens);
        let diagnostics: Vec<&Diagnostic> = scanned
            .diagnostics
            .iter()
            .chain(parse_diagnostics.iter())
            .collect();
        match diagnostics.first() {
            None => Ok(expr),
            Some(diagnostic) => Err(BuildRuleError {
                rule: text.to_string(),
                reason: diagnostic.title.clone(),
            }),
        }
    }

    /// The canonicalised, leveled pattern.
    pub fn pattern(&self) -> &RcExpr {
        &self.pattern
    }

    /// The replacement template, as written.
    pub fn replacement(&self) -> &RcExpr {
        &self.replacement
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source.0, self.source.1)
    }
}

/// An unbuilt rule set: textual `(pattern, replacement)` pairs.
pub struct RuleSet {
    rules: Vec<(String, String)>,
}

impl Default for RuleSet {
    /// The shipping MBA identity library.
    fn default() -> Self {
        Self {
            rules: default_rules()
                .iter()
                .map(|(p, r)| (p.to_string(), r.to_string()))
                .collect(),
        }
    }
}

impl RuleSet {
    /// An empty rule set.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Appends a custom rule. Custom rules run after the built-in ones, in insertion order.
    pub fn insert<P: Into<String>, R: Into<String>>(&mut self, pattern: P, replacement: R) {
        self.rules.push((pattern.into(), replacement.into()));
    }

    /// Number of rules in the set.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Builds every rule at width `n`, preserving order.
    pub fn build(&self, nbits: u32) -> Result<Vec<Rule>, BuildRuleErrors> {
        let mut built = Vec::with_capacity(self.rules.len());
        let mut errors = Vec::new();
        for (pattern, replacement) in &self.rules {
            match Rule::build(pattern, replacement, nbits) {
                Ok(rule) => built.push(rule),
                Err(err) => errors.push(err),
            }
        }
        if errors.is_empty() {
            Ok(built)
        } else {
            Err(BuildRuleErrors { errors })
        }
    }
}

/// The default MBA identity library.
///
/// The order is load-bearing: later rules assume earlier ones have already fired. In particular
/// the doubling rules at the tail break several samples when moved higher in the list.
pub fn default_rules() -> &'static [(&'static str, &'static str)] {
    &[
        ("(A ^ ~B) + 2*(A | B)", "A + B - 1"),
        ("(A | B) - (A & ~B)", "B"),
        ("- (A ^ ~B) - 2*(A | B)", "-A - B + 1"),
        ("A + B + 1 + (~A | ~B)", "(A | B)"),
        ("A - B + (~(2*A) & 2*B)", "A ^ B"),
        ("- A - (~(2*A) & 2*B)", "- (A ^ B) - B"),
        ("-B + (~(2*A) & 2*B)", "(A ^ B) - A"),
        ("-B + 2*(~A & B)", "(A ^ B) - A"),
        ("A - B + 2*(~A & B)", "(A ^ B)"),
        ("(A & B) + (A | B)", "A + B"),
        ("(A ^ B) + 2*(A & B)", "A + B"),
        ("A + B - 2*(A & B)", "(A ^ B)"),
        ("- A - B + 2*(A | B)", "(A ^ B)"),
        ("A + B - (A | B)", "A & B"),
        ("(A & B) - (~A | B)", "A + 1"),
        ("(A | B) - (A & B)", "A ^ B"),
        ("-B + (2*(~A) & 2*B)", "(A ^ B) - A"),
        ("-2*(~A & B) + B", "- (A ^ B) + A"),
        ("A + B + (~A & ~B)", "(A & B) - 1"),
        ("A + B + 2*(~A | ~B)", "(A ^ B) - 2"),
        ("((2*A + 1) & 2*B)", "(2*A & 2*B)"),
        ("2*(A ^ 127)", "2*(~A)"),
    ]
}

/// One rule that failed to build.
#[derive(Debug)]
pub struct BuildRuleError {
    rule: String,
    reason: String,
}

impl fmt::Display for BuildRuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Could not build rule\n    \"{}\"\n{}", self.rule, self.reason)
    }
}

impl Error for BuildRuleError {}

/// Errors that result from an attempt to [build a rule set](RuleSet::build).
#[derive(Debug)]
pub struct BuildRuleErrors {
    errors: Vec<BuildRuleError>,
}

impl fmt::Display for BuildRuleErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let errors = self
            .errors
            .iter()
            .enumerate()
            .map(|(i, e)| format!("({}) {}", i + 1, e))
            .map(|s| indent(s, 4))
            .collect::<Vec<_>>()
            .join("\n");
        write!(
            f,
            "Failed to build rules with {} errors.\n{}",
            self.errors.len(),
            errors
        )
    }
}

impl Error for BuildRuleErrors {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::Emit;

    #[test]
    fn builds_default_rules() {
        let rules = RuleSet::default().build(8).unwrap();
        assert_eq!(rules.len(), 22);
        assert_eq!(rules[0].to_string(), "(A ^ ~B) + 2*(A | B) -> A + B - 1");
    }

    #[test]
    fn pattern_is_canonicalised() {
        let rule = Rule::build("(A | B) - (A & ~B)", "B", 8).unwrap();
        // Subtraction is gone; the pattern is an addition of a negated conjunction.
        assert_eq!(
            rule.pattern().emit_s_expression(),
            "(+ (| A B) (* -1 (& A (~ B))))"
        );
        // The replacement stays as written.
        assert_eq!(rule.replacement().emit_s_expression(), "B");
    }

    #[test]
    fn leveled_on_plus() {
        let rule = Rule::build("A + B + 1 + (~A | ~B)", "(A | B)", 8).unwrap();
        assert_eq!(
            rule.pattern().emit_s_expression(),
            "(+ A B 1 (| (~ A) (~ B)))"
        );
    }

    #[test]
    fn unbound_replacement_wildcard() {
        let err = Rule::build("A + A", "A + C", 8).unwrap_err();
        assert!(err.to_string().contains(r#""C""#));
    }

    #[test]
    fn unparsable_rule() {
        let mut set = RuleSet::empty();
        set.insert("A + ", "A");
        set.insert("A", "A @ B");
        let err = set.build(8).unwrap_err();
        assert!(err.to_string().contains("2 errors"));
    }

    #[test]
    fn custom_rules_follow_defaults() {
        let mut set = RuleSet::default();
        set.insert("A + A + A", "3*A");
        let rules = set.build(8).unwrap();
        assert_eq!(rules.last().unwrap().to_string(), "A + A + A -> 3*A");
    }

    #[test]
    fn default_rules_are_sound() {
        use crate::smt::{Solver, Verdict, Z3Binary};
        use crate::utils::test::parse_expr;

        if !Z3Binary::available() {
            eprintln!("skipping: no z3 on PATH");
            return;
        }
        let solver = Z3Binary::default();
        for (pattern, replacement) in default_rules() {
            // The final doubling rule encodes an 8-bit mask and only holds there.
            let widths: &[u32] = if *pattern == "2*(A ^ 127)" {
                &[8]
            } else {
                &[8, 16, 32, 64]
            };
            for &nbits in widths {
                let lhs = parse_expr(pattern);
                let rhs = parse_expr(replacement);
                assert_eq!(
                    solver.prove_equal(&lhs, &rhs, nbits),
                    Verdict::Proved,
                    "rule {} -> {} at width {}",
                    pattern,
                    replacement,
                    nbits
                );
            }
        }
    }
}
