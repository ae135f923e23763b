//! Test suite for the scope module
//!
//! Tests cover:
//! - Wildcard derivation properties
//! - Granted scope matching properties
//! - Resolver lookup and caching under concurrent access

use super::*;
use crate::error::AccessControlError;
use proptest::prelude::*;
use std::sync::Arc;
use std::thread;

fn segment() -> impl Strategy<Value = String> {
    "[a-z]{1,8}"
}

fn scope_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(segment(), 1..5).prop_map(|segments| segments.join(":"))
}

// ============================================================================
// Wildcard Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_wildcards_always_contain_universal(prefixes in prop::collection::vec(scope_strategy(), 0..6)) {
        let wildcards = Wildcards::from_prefixes(&prefixes[..]);
        prop_assert!(wildcards.contains(WILDCARD));
        prop_assert_eq!(wildcards.iter().next(), Some(WILDCARD));
    }

    #[test]
    fn prop_wildcards_cover_every_segment(prefixes in prop::collection::vec(scope_strategy(), 1..6)) {
        let wildcards = Wildcards::from_prefixes(&prefixes[..]);
        for prefix in &prefixes {
            for segment in prefix.split(SEPARATOR) {
                let wildcard = format!("{}:*", segment);
                prop_assert!(wildcards.contains(&wildcard));
            }
        }
    }

    #[test]
    fn prop_wildcards_have_no_duplicates(prefixes in prop::collection::vec(scope_strategy(), 0..6)) {
        let wildcards = Wildcards::from_prefixes(&prefixes[..]);
        let mut seen = std::collections::HashSet::new();
        for wildcard in wildcards.iter() {
            prop_assert!(seen.insert(wildcard.to_string()));
        }
    }
}

// ============================================================================
// Matching Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_scope_matches_itself(scope in scope_strategy()) {
        prop_assert!(matches(&scope, &scope));
    }

    #[test]
    fn prop_universal_wildcard_matches_everything(scope in scope_strategy()) {
        prop_assert!(matches(WILDCARD, &scope));
    }

    #[test]
    fn prop_parent_wildcard_matches_children(parent in scope_strategy(), child in segment()) {
        let granted = format!("{}:*", parent);
        let target = format!("{}:{}", parent, child);
        prop_assert!(is_wildcard(&granted));
        prop_assert!(matches(&granted, &target));
    }
}

// ============================================================================
// Resolver Tests
// ============================================================================

#[test]
fn test_resolver_lookup_by_scope_prefix() {
    let mut resolvers = ScopeResolvers::new();
    resolvers
        .register(
            "dashboards:id:",
            resolver_fn(|org_id, scope| {
                let id = scope.trim_start_matches("dashboards:id:");
                Ok(vec![format!("dashboards:uid:{}-{}", org_id, id)])
            }),
        )
        .unwrap();

    let resolved = tokio_test::block_on(resolvers.mutator_for(3).mutate("dashboards:id:7")).unwrap();
    assert_eq!(resolved, vec!["dashboards:uid:3-7"]);

    assert!(resolvers.contains("dashboards:id:"));
    assert!(!resolvers.contains("dashboards"));
}

#[test]
fn test_resolver_errors_are_not_resolver_misses() {
    let mut resolvers = ScopeResolvers::new();
    resolvers
        .register(
            "folders",
            resolver_fn(|_, _| Err(AccessControlError::Evaluation("folder store offline".to_string()))),
        )
        .unwrap();

    let err = tokio_test::block_on(resolvers.mutator_for(1).mutate("folders:uid:x")).unwrap_err();
    assert!(!err.is_resolver_not_found());
}

#[test]
fn test_concurrent_resolution() {
    let mut resolvers = ScopeResolvers::new();
    resolvers
        .register(
            "dashboards:id:",
            resolver_fn(|_, scope| Ok(vec![scope.replace(":id:", ":uid:")])),
        )
        .unwrap();
    let resolvers = Arc::new(resolvers);

    let mut handles = vec![];
    for i in 0..10 {
        let resolvers = Arc::clone(&resolvers);
        let handle = thread::spawn(move || {
            let scope = format!("dashboards:id:{}", i % 5);
            tokio_test::block_on(resolvers.mutator_for(1).mutate(&scope)).unwrap()
        });
        handles.push(handle);
    }

    for handle in handles {
        let resolved = handle.join().unwrap();
        assert_eq!(resolved.len(), 1);
        assert!(resolved[0].starts_with("dashboards:uid:"));
    }

    let stats = resolvers.stats();
    assert_eq!(stats.hits + stats.misses, 10);
    assert_eq!(stats.entries, 5);
}

#[test]
fn test_cache_hit_rate() {
    let mut resolvers = ScopeResolvers::new();
    resolvers
        .register("teams:id:", resolver_fn(|_, _| Ok(vec!["teams:uid:a".to_string()])))
        .unwrap();

    let mutator = resolvers.mutator_for(1);
    for _ in 0..4 {
        tokio_test::block_on(mutator.mutate("teams:id:1")).unwrap();
    }

    let stats = resolvers.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 3);
    assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);

    resolvers.clear_cache();
    assert_eq!(resolvers.stats().entries, 0);
}
