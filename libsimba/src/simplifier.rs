//! The driver: runs canonicalisation, rewriting, and arithmetic simplification to a fixed point
//! over a sequence of assignments.

use crate::arith::simplify_arith;
use crate::canonicalize::{canonicalize, not_to_inv};
use crate::common::UnsupportedWidth;
use crate::diagnostics::Diagnostic;
use crate::emit::Emit;
use crate::fold::{fold_constants, reduce_literals};
use crate::grammar::collectors::infer_width_stmts;
use crate::grammar::compare::canonical_key;
use crate::grammar::*;
use crate::leveling::{level, unlevel};
use crate::parser::parse_program;
use crate::rewrite::{Binding, BuildRuleErrors, Replacer, Rule, RuleSet};
use crate::scanner::scan;
use crate::smt::{Solver, Z3Binary};

use core::fmt;
use std::collections::HashSet;
use std::error::Error;
use std::rc::Rc;

/// Simplifies a program with the default rule library.
///
/// The program is a sequence of assignments with an optional trailing expression; a bare
/// expression is a one-statement program. When `nbits` is `None` the width is inferred from the
/// program's literals (default 8).
pub fn simplify(source: &str, nbits: Option<u32>) -> Result<String, SimplifyError> {
    simplify_with(source, nbits, &RuleSet::default())
}

/// Simplifies a program with a caller-provided rule set.
pub fn simplify_with(
    source: &str,
    nbits: Option<u32>,
    rules: &RuleSet,
) -> Result<String, SimplifyError> {
    let scanned = scan(source);
    if !scanned.diagnostics.is_empty() {
        return Err(SimplifyError::Parse(scanned.diagnostics));
    }
    let (program, diagnostics) = parse_program(scanned.tokens);
    if !diagnostics.is_empty() {
        return Err(SimplifyError::Parse(diagnostics));
    }

    let nbits = resolve_width(&program, nbits)?;
    let mut simplifier = Simplifier::new(nbits, rules)?;
    Ok(simplifier.simplify_program(program).emit_pretty())
}

/// Resolves the working width: a user-supplied width is validated, and an absent one is
/// [inferred](infer_width_stmts) from the program's literals (default 8).
pub fn resolve_width(program: &StmtList, nbits: Option<u32>) -> Result<u32, UnsupportedWidth> {
    match nbits {
        Some(nbits) if (1..=64).contains(&nbits) => Ok(nbits),
        Some(nbits) => Err(UnsupportedWidth { bits: nbits }),
        None => Ok(infer_width_stmts(program)?.unwrap_or(8)),
    }
}

/// Simplifies a succession of assignments.
///
/// For each statement the driver inlines previously simplified variables, then iterates the
/// rewrite pipeline until the value stabilises, and finally records the result for later
/// statements.
pub struct Simplifier {
    /// Previously simplified assignments, inlined into later right-hand sides.
    context: Binding,
    nbits: u32,
    rules: Vec<Rule>,
    solver: Box<dyn Solver>,
}

impl Simplifier {
    /// Creates a driver at width `n` with the given rule set and the default solver.
    pub fn new(nbits: u32, rules: &RuleSet) -> Result<Self, SimplifyError> {
        Self::with_solver(nbits, rules, Box::new(Z3Binary::default()))
    }

    /// Creates a driver with a caller-provided solver.
    pub fn with_solver(
        nbits: u32,
        rules: &RuleSet,
        solver: Box<dyn Solver>,
    ) -> Result<Self, SimplifyError> {
        if !(1..=64).contains(&nbits) {
            return Err(SimplifyError::Width(UnsupportedWidth { bits: nbits }));
        }
        let rules = rules.build(nbits).map_err(SimplifyError::Rules)?;
        Ok(Self {
            context: Binding::default(),
            nbits,
            rules,
            solver,
        })
    }

    /// Simplifies every statement in order, threading assignments through the context.
    pub fn simplify_program(&mut self, program: StmtList) -> StmtList {
        let stmts = program
            .into_iter()
            .map(|stmt| match stmt {
                Stmt::Expr(expr) => Stmt::Expr(self.simplify_expr(&expr)),
                Stmt::Assignment(asgn) => {
                    let rhs = self.simplify_expr(&asgn.rhs);
                    self.context.insert(asgn.var.clone(), Rc::clone(&rhs));
                    Stmt::Assignment(Assignment { var: asgn.var, rhs })
                }
            })
            .collect();
        StmtList::new(stmts)
    }

    /// Inlines the context into `expr` and simplifies to a fixed point.
    pub fn simplify_expr(&mut self, expr: &RcExpr) -> RcExpr {
        let expr = self.context.substitute(expr);
        self.fixpoint(&expr)
    }

    /// Iterates [`pass`](Simplifier::pass) until the tree stabilises under leveled commutative
    /// equality, a previously seen form recurs, or another iteration would strictly grow the
    /// printed form — in which case the predecessor wins.
    fn fixpoint(&self, expr: &RcExpr) -> RcExpr {
        let mut prev = Rc::clone(expr);
        let mut prev_key = leveled_key(&prev);
        let mut seen = HashSet::new();
        seen.insert(prev_key.clone());

        loop {
            let next = self.pass(&prev);
            let next_key = leveled_key(&next);
            if next_key == prev_key {
                return next;
            }
            if next.emit_pretty().len() > prev.emit_pretty().len() {
                return prev;
            }
            if !seen.insert(next_key.clone()) {
                return next;
            }
            prev = next;
            prev_key = next_key;
        }
    }

    /// One simplification pass: canonicalise and level, apply every rule once, fold constants,
    /// normalize the arithmetic skeleton, reduce literals.
    fn pass(&self, expr: &RcExpr) -> RcExpr {
        let expr = canonicalize(expr, self.nbits);
        let expr = not_to_inv(&expr);
        let mut expr = level(&expr, Some(BinaryOperator::Plus));
        for rule in &self.rules {
            expr = Replacer::new(
                rule.pattern(),
                rule.replacement(),
                self.nbits,
                self.solver.as_ref(),
            )
            .apply(&expr);
        }
        let expr = level(&expr, Some(BinaryOperator::BitXor));
        let expr = fold_constants(&expr, self.nbits);
        let expr = unlevel(&expr);
        let expr = simplify_arith(&expr, self.nbits);
        reduce_literals(&expr, self.nbits)
    }
}

/// The comparison key for the driver's fixed-point check: commutative structural equality under
/// full leveling, so re-associated forms of one chain compare equal.
fn leveled_key(expr: &RcExpr) -> String {
    canonical_key(&level(expr, None))
}

/// Errors surfaced by the [driver](Simplifier).
#[derive(Debug)]
pub enum SimplifyError {
    /// The program did not scan or parse.
    Parse(Vec<Diagnostic>),
    /// The width is outside `1..=64`, or a literal needs more than 64 bits.
    Width(UnsupportedWidth),
    /// The rule library did not build.
    Rules(BuildRuleErrors),
}

impl fmt::Display for SimplifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(diagnostics) => {
                write!(f, "{} error(s) parsing the program", diagnostics.len())
            }
            Self::Width(err) => err.fmt(f),
            Self::Rules(err) => err.fmt(f),
        }
    }
}

impl Error for SimplifyError {}

impl From<UnsupportedWidth> for SimplifyError {
    fn from(err: UnsupportedWidth) -> Self {
        Self::Width(err)
    }
}
