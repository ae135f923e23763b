//! Precompiled scope predicates
//!
//! A [`Checker`] answers "may the principal perform this action on any of
//! these scopes" without walking the permission snapshot again. It is
//! compiled once per (snapshot, action, prefixes) and can then be used for
//! every item of a listing, from any thread.

use std::collections::HashSet;

use crate::scope::Wildcards;
use crate::types::ActionScopes;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Rule {
    Deny,
    Allow,
    Lookup(HashSet<String>),
}

/// Compiled predicate over candidate scopes for one action
///
/// Owns a copy of the scopes it needs; later changes to the principal's
/// permissions do not affect an already compiled checker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checker {
    rule: Rule,
}

impl Checker {
    /// Checker that rejects every candidate
    pub fn deny() -> Self {
        Self { rule: Rule::Deny }
    }

    /// Checker that accepts every candidate
    pub fn allow() -> Self {
        Self { rule: Rule::Allow }
    }

    /// Compiles a checker for `action` from a permission snapshot
    ///
    /// A missing snapshot or action yields a denying checker. A granted scope
    /// equal to one of the wildcards derived from `prefixes` yields an
    /// allowing checker; otherwise the granted scopes are matched literally.
    pub fn compile<S: AsRef<str>>(
        permissions: Option<&ActionScopes>,
        prefixes: &[S],
        action: &str,
    ) -> Self {
        let Some(scopes) = permissions.and_then(|p| p.get(action)) else {
            return Self::deny();
        };

        let wildcards = Wildcards::from_prefixes(prefixes);
        let mut lookup = HashSet::with_capacity(scopes.len());
        for scope in scopes {
            if wildcards.contains(scope) {
                return Self::allow();
            }
            lookup.insert(scope.clone());
        }

        Self {
            rule: Rule::Lookup(lookup),
        }
    }

    /// Whether at least one candidate scope is permitted
    pub fn check<S: AsRef<str>>(&self, scopes: &[S]) -> bool {
        match &self.rule {
            Rule::Deny => false,
            Rule::Allow => true,
            Rule::Lookup(lookup) => scopes.iter().any(|s| lookup.contains(s.as_ref())),
        }
    }

    /// Whether a single scope is permitted
    pub fn check_one(&self, scope: &str) -> bool {
        self.check(&[scope])
    }

    /// Whether the checker accepts everything
    pub fn is_allow_all(&self) -> bool {
        self.rule == Rule::Allow
    }

    /// Whether the checker rejects everything
    pub fn is_deny_all(&self) -> bool {
        self.rule == Rule::Deny
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(action: &str, scopes: &[&str]) -> ActionScopes {
        let mut permissions = ActionScopes::new();
        permissions.insert(
            action.to_string(),
            scopes.iter().map(|s| s.to_string()).collect(),
        );
        permissions
    }

    #[test]
    fn test_missing_snapshot_denies() {
        let checker = Checker::compile(None, &["dashboards"], "dashboards:read");
        assert!(checker.is_deny_all());
        assert!(!checker.check_one("dashboards:uid:a"));
    }

    #[test]
    fn test_missing_action_denies() {
        let permissions = snapshot("dashboards:read", &["*"]);
        let checker = Checker::compile(Some(&permissions), &["dashboards"], "dashboards:write");
        assert!(checker.is_deny_all());
    }

    #[test]
    fn test_prefix_wildcard_allows_unseen_scopes() {
        let permissions = snapshot("dashboards:read", &["dashboards:uid:a", "dashboards:*"]);
        let checker = Checker::compile(Some(&permissions), &["dashboards"], "dashboards:read");

        assert!(checker.is_allow_all());
        assert!(checker.check_one("dashboards:uid:zzz"));
        assert!(checker.check::<&str>(&[]));
    }

    #[test]
    fn test_universal_wildcard_allows() {
        let permissions = snapshot("dashboards:read", &["*"]);
        let checker = Checker::compile::<&str>(Some(&permissions), &[], "dashboards:read");
        assert!(checker.is_allow_all());
    }

    #[test]
    fn test_unrelated_wildcard_is_literal() {
        let permissions = snapshot("dashboards:read", &["folders:*", "dashboards:uid:a"]);
        let checker = Checker::compile(Some(&permissions), &["dashboards:uid"], "dashboards:read");

        assert!(!checker.is_allow_all());
        assert!(checker.check(&["dashboards:uid:b", "dashboards:uid:a"]));
        assert!(!checker.check(&["dashboards:uid:b"]));
        assert!(!checker.check(&["folders:uid:x"]));
        assert!(checker.check(&["folders:*"]));
    }

    #[test]
    fn test_checker_detached_from_snapshot() {
        let mut permissions = snapshot("dashboards:read", &["dashboards:uid:a"]);
        let checker = Checker::compile(Some(&permissions), &["dashboards"], "dashboards:read");

        permissions.clear();
        assert!(checker.check_one("dashboards:uid:a"));
    }
}
