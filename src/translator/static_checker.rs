//! Static checker for wrap-time clause analysis
//!
//! Performs cheap checks that don't need a call:
//! - Unbound names: `x > 0` where `x` is not a parameter, the result
//!   binding or an environment entry, and calls to unknown functions
//! - Constant clauses: `1 < 2`, `(0..3).contains(&5)`
//!
//! Findings are advisory. The environment is live, so a name unbound at wrap
//! time may resolve by call time.

use std::collections::BTreeSet;

use crate::binding::Bindings;
use crate::env::builtins;
use crate::error::EvalError;
use crate::parser::contracts::Clause;
use crate::translator::evaluator::{evaluate_clause, Scope};

/// Result of a static check
#[derive(Debug, Clone, PartialEq)]
pub enum StaticCheckResult {
    /// Every name resolves; the clause depends on the call.
    Resolved,
    /// Names and functions that resolve nowhere, sorted.
    Unbound(Vec<String>),
    /// The clause reads no names and always yields this value.
    Constant(bool),
    /// The clause reads no names and always fails to evaluate.
    Faulty(EvalError),
}

impl StaticCheckResult {
    /// Whether the finding is worth a warning.
    pub fn is_suspicious(&self) -> bool {
        !matches!(
            self,
            StaticCheckResult::Resolved | StaticCheckResult::Constant(true)
        )
    }
}

/// Check one compiled clause against the names known at wrap time.
///
/// `known` holds parameter names and environment entries, values and
/// functions alike. An environment function shadowing a built-in keeps the
/// clause from being folded.
pub fn check_clause_statically(clause: &Clause, known: &BTreeSet<String>) -> StaticCheckResult {
    let names = clause.condition.free_names();
    let functions = clause.condition.called_functions();

    let unbound: BTreeSet<String> = names
        .iter()
        .chain(functions.iter().filter(|f| !builtins::is_builtin(f.as_str())))
        .filter(|name| !known.contains(*name))
        .cloned()
        .collect();
    if !unbound.is_empty() {
        return StaticCheckResult::Unbound(unbound.into_iter().collect());
    }

    let foldable = names.is_empty() && functions.iter().all(|f| !known.contains(f));
    if !foldable {
        return StaticCheckResult::Resolved;
    }
    let empty = Bindings::new();
    match evaluate_clause(&clause.condition, &Scope::locals_only(&empty)) {
        Ok(value) => StaticCheckResult::Constant(value),
        Err(err) => StaticCheckResult::Faulty(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::contracts::ContractType;

    fn check(source: &str, known: &[&str]) -> StaticCheckResult {
        let clause = Clause::compile(ContractType::Requires, source).unwrap();
        let known = known.iter().map(|s| s.to_string()).collect();
        check_clause_statically(&clause, &known)
    }

    #[test]
    fn test_resolved() {
        assert_eq!(check("a > 0 && ret < b", &["a", "b", "ret"]), StaticCheckResult::Resolved);
        assert!(!check("a > 0", &["a"]).is_suspicious());
    }

    #[test]
    fn test_unbound_names() {
        let result = check("a > limit && z < 0", &["a"]);
        assert_eq!(
            result,
            StaticCheckResult::Unbound(vec!["limit".into(), "z".into()])
        );
        assert!(result.is_suspicious());
    }

    #[test]
    fn test_constant_clauses() {
        assert_eq!(check("1 < 2", &[]), StaticCheckResult::Constant(true));
        assert_eq!(check("(0..3).contains(&5)", &[]), StaticCheckResult::Constant(false));
        assert!(check("1 > 2", &[]).is_suspicious());
    }

    #[test]
    fn test_faulty_constant() {
        assert_eq!(check("1 / 0 == 0", &[]), StaticCheckResult::Faulty(EvalError::DivideByZero));
    }

    #[test]
    fn test_builtin_calls_fold() {
        assert_eq!(check("len([1, 2]) == 2", &[]), StaticCheckResult::Constant(true));
        // Shadowed by an environment function
        assert_eq!(check("len([1, 2]) == 2", &["len"]), StaticCheckResult::Resolved);
    }

    #[test]
    fn test_unknown_functions() {
        assert_eq!(check("tick()", &["tick"]), StaticCheckResult::Resolved);
        assert_eq!(
            check("a > 0 && nope(a)", &["a"]),
            StaticCheckResult::Unbound(vec!["nope".into()])
        );
    }
}
