//! Guard conditions.
//!
//! Grammar (after trimming):
//! - empty: always true
//! - `A==B` / `A!=B`: string comparison; each side is `$name` (variable,
//!   missing renders as the empty string) or a literal
//! - `$name`: truthiness of the variable, missing is false
//! - anything else: true
//!
//! `==` is tried before `!=`. A side split that does not yield exactly two
//! parts falls through to the next rule.

use crate::variables::VariableStore;

pub fn evaluate(condition: &str, store: &VariableStore) -> bool {
    let condition = condition.trim();
    if condition.is_empty() {
        return true;
    }

    if let Some(result) = compare(condition, "==", store) {
        return result;
    }
    if let Some(result) = compare(condition, "!=", store).map(|eq| !eq) {
        return result;
    }

    if let Some(name) = condition.strip_prefix('$') {
        return store.get(name).is_some_and(|v| v.is_truthy());
    }

    true
}

/// Returns whether both sides are equal, or `None` when `op` does not split
/// the condition into exactly two parts.
fn compare(condition: &str, op: &str, store: &VariableStore) -> Option<bool> {
    let mut parts = condition.split(op);
    let (left, right) = (parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    Some(operand(left.trim(), store) == operand(right.trim(), store))
}

fn operand(token: &str, store: &VariableStore) -> String {
    match token.strip_prefix('$') {
        Some(name) => store.get(name).map(|v| v.to_string()).unwrap_or_default(),
        None => token.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> VariableStore {
        let s = VariableStore::new();
        s.set("status", "ready");
        s.set("count", 3);
        s.set("found", true);
        s.set("missing_flag", false);
        s
    }

    #[test]
    fn empty_condition_is_always_true() {
        let s = store();
        assert!(evaluate("", &s));
        assert!(evaluate("   ", &s));
        assert!(evaluate("", &VariableStore::new()));
    }

    #[test]
    fn equality_against_literals() {
        let s = store();
        assert!(evaluate("$status==ready", &s));
        assert!(!evaluate("$status!=ready", &s));
        assert!(evaluate(" $status == ready ", &s));
        assert!(evaluate("$count==3", &s));
        assert!(evaluate("$found==true", &s));
        assert!(evaluate("$status!=busy", &s));
    }

    #[test]
    fn both_sides_can_be_variables() {
        let s = store();
        s.set("other", "ready");
        assert!(evaluate("$status==$other", &s));
        assert!(evaluate("$nope==$also_nope", &s));
        assert!(evaluate("$nope==", &s));
    }

    #[test]
    fn bare_variable_uses_truthiness() {
        let s = store();
        assert!(evaluate("$found", &s));
        assert!(!evaluate("$missing_flag", &s));
        assert!(!evaluate("$foo", &s));
    }

    #[test]
    fn unknown_syntax_fails_open() {
        let s = store();
        assert!(evaluate("status is ready", &s));
        assert!(evaluate("a==b==c", &s));
    }

    #[test]
    fn equality_operator_wins_over_inequality() {
        let s = store();
        // Splits on `==` first: "$status" vs "ready!=x".
        assert!(!evaluate("$status==ready!=x", &s));
        s.set("status", "ready!=x");
        assert!(evaluate("$status==ready!=x", &s));
    }
}
