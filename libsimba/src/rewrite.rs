//! The pattern-driven rewrite engine: wildcard bindings, the matcher, the replacer, and the rule
//! library.

mod binding;
mod matcher;
mod replacer;
mod rule;

pub use binding::Binding;
pub use matcher::{match_expr, PatternMatcher};
pub use replacer::Replacer;
pub use rule::{default_rules, BuildRuleError, BuildRuleErrors, Rule, RuleSet};
