//! Scope attribute resolver registry with TTL caching
//!
//! Resolvers expand attribute-style scopes (e.g. `dashboards:id:42`) into the
//! canonical scopes permissions are granted on (e.g. `dashboards:uid:abc`,
//! `folders:uid:parent`). The registry is filled during wiring and is
//! read-only afterwards; only its result cache is mutated concurrently.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use super::types::{scope_prefix, SEPARATOR};
use crate::error::{AccessControlError, Result};
use crate::types::OrgId;

/// Default TTL for resolved scopes (30 seconds)
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);

/// Expands one scope into zero or more canonical scopes for an organization
#[async_trait]
pub trait ScopeAttributeResolver: Send + Sync {
    /// Resolve a scope
    async fn resolve(&self, org_id: OrgId, scope: &str) -> Result<Vec<String>>;
}

/// Resolver backed by a synchronous closure, see [`resolver_fn`]
pub struct FnResolver<F> {
    f: F,
}

#[async_trait]
impl<F> ScopeAttributeResolver for FnResolver<F>
where
    F: Fn(OrgId, &str) -> Result<Vec<String>> + Send + Sync,
{
    async fn resolve(&self, org_id: OrgId, scope: &str) -> Result<Vec<String>> {
        (self.f)(org_id, scope)
    }
}

/// Wraps a closure as a [`ScopeAttributeResolver`]
pub fn resolver_fn<F>(f: F) -> FnResolver<F>
where
    F: Fn(OrgId, &str) -> Result<Vec<String>> + Send + Sync,
{
    FnResolver { f }
}

/// Rewrites a single scope into its replacements
///
/// This is what an evaluator calls for every scope it holds when producing a
/// resolved copy of itself.
#[async_trait]
pub trait ScopeMutator: Send + Sync {
    /// Replacement scopes, or `ResolverNotFound` when nothing covers the scope
    async fn mutate(&self, scope: &str) -> Result<Vec<String>>;
}

/// Cache entry with TTL
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    created_at: Instant,
    ttl: Duration,
}

impl<T> CacheEntry<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            ttl,
        }
    }

    fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }

    fn get(&self) -> Option<&T> {
        if self.is_expired() {
            None
        } else {
            Some(&self.value)
        }
    }
}

/// Statistics about the resolved scope cache
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: usize,
    /// Number of cache misses
    pub misses: usize,
    /// Number of expired entries encountered
    pub expirations: usize,
    /// Total number of entries in cache
    pub entries: usize,
}

impl CacheStats {
    /// Calculates the cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

type CacheKey = (OrgId, String);

/// Registry of scope attribute resolvers keyed by scope prefix
///
/// # Examples
///
/// ```
/// use cretoai_accesscontrol::scope::{resolver_fn, ScopeMutator, ScopeResolvers};
///
/// # tokio_test::block_on(async {
/// let mut resolvers = ScopeResolvers::new();
/// resolvers
///     .register("dashboards:id:", resolver_fn(|_, _| Ok(vec!["dashboards:uid:abc".to_string()])))
///     .unwrap();
///
/// let mutator = resolvers.mutator_for(1);
/// assert_eq!(mutator.mutate("dashboards:id:42").await.unwrap(), vec!["dashboards:uid:abc"]);
/// assert!(mutator.mutate("folders:id:7").await.is_err());
/// # });
/// ```
pub struct ScopeResolvers {
    /// Resolvers by registered prefix
    resolvers: HashMap<String, Arc<dyn ScopeAttributeResolver>>,
    /// Resolved scopes by (org, scope)
    cache: Arc<DashMap<CacheKey, CacheEntry<Vec<String>>>>,
    /// Cache TTL duration, zero disables caching
    ttl: Duration,
    /// Cache statistics
    stats: Arc<DashMap<String, usize>>,
}

impl ScopeResolvers {
    /// Creates an empty registry with the default TTL
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_CACHE_TTL)
    }

    /// Creates an empty registry with a custom TTL
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            resolvers: HashMap::new(),
            cache: Arc::new(DashMap::new()),
            ttl,
            stats: Arc::new(DashMap::new()),
        }
    }

    /// Registers a resolver under a prefix, replacing any previous one
    ///
    /// Takes `&mut self`: once the registry is shared with evaluations no
    /// further registration is possible.
    pub fn register<R>(&mut self, prefix: impl Into<String>, resolver: R) -> Result<()>
    where
        R: ScopeAttributeResolver + 'static,
    {
        let prefix = prefix.into();
        if prefix.is_empty() {
            return Err(AccessControlError::InvalidInput(
                "resolver prefix cannot be empty".to_string(),
            ));
        }

        if self.resolvers.insert(prefix.clone(), Arc::new(resolver)).is_some() {
            debug!("Replacing scope resolver for prefix '{}'", prefix);
        }
        // Results from the replaced resolver must not be served
        self.clear_cache();

        Ok(())
    }

    /// Whether a resolver is registered under exactly this prefix
    pub fn contains(&self, prefix: &str) -> bool {
        self.resolvers.contains_key(prefix)
    }

    /// Number of registered resolvers
    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    /// Whether no resolver is registered
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Builds the scope mutator for an organization
    pub fn mutator_for(&self, org_id: OrgId) -> ScopeAttributeMutator<'_> {
        ScopeAttributeMutator {
            resolvers: self,
            org_id,
        }
    }

    /// Finds the resolver covering a scope, longest prefix first
    fn find(&self, scope: &str) -> Option<&Arc<dyn ScopeAttributeResolver>> {
        candidate_prefixes(scope)
            .iter()
            .find_map(|prefix| self.resolvers.get(prefix))
    }

    async fn resolve(&self, org_id: OrgId, scope: &str) -> Result<Vec<String>> {
        let resolver = self
            .find(scope)
            .ok_or_else(|| AccessControlError::ResolverNotFound(scope.to_string()))?;

        let cache_key = (org_id, scope.to_string());

        if !self.ttl.is_zero() {
            if let Some(entry) = self.cache.get(&cache_key) {
                if let Some(scopes) = entry.get() {
                    self.increment_stat("hits");
                    return Ok(scopes.clone());
                }
                self.increment_stat("expirations");
            } else {
                self.increment_stat("misses");
            }
        }

        let resolved = resolver.resolve(org_id, scope).await?;
        debug!("Resolved scope '{}' in org {} to {:?}", scope, org_id, resolved);

        if !self.ttl.is_zero() {
            self.cache
                .insert(cache_key, CacheEntry::new(resolved.clone(), self.ttl));
        }

        Ok(resolved)
    }

    /// Clears the cache
    pub fn clear_cache(&self) {
        self.cache.clear();
        self.stats.clear();
    }

    /// Removes expired entries from the cache
    pub fn cleanup_expired(&self) {
        self.cache.retain(|_, entry| !entry.is_expired());
    }

    /// Returns cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.get_stat("hits"),
            misses: self.get_stat("misses"),
            expirations: self.get_stat("expirations"),
            entries: self.cache.len(),
        }
    }

    /// Returns the current cache TTL
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn increment_stat(&self, key: &str) {
        self.stats
            .entry(key.to_string())
            .and_modify(|count| *count += 1)
            .or_insert(1);
    }

    fn get_stat(&self, key: &str) -> usize {
        self.stats.get(key).map(|v| *v).unwrap_or(0)
    }
}

impl Default for ScopeResolvers {
    fn default() -> Self {
        Self::new()
    }
}

/// Prefixes a resolver may be registered under for a scope, longest first
///
/// `dashboards:uid:abc` → `dashboards:uid:`, `dashboards:uid`, `dashboards:`, `dashboards`
fn candidate_prefixes(scope: &str) -> Vec<String> {
    let prefix = scope_prefix(scope);
    let first = scope.split(SEPARATOR).next().unwrap_or(scope);

    let mut candidates: Vec<String> = Vec::with_capacity(4);
    for candidate in [
        prefix.clone(),
        prefix.trim_end_matches(SEPARATOR).to_string(),
        format!("{}{}", first, SEPARATOR),
        first.to_string(),
    ] {
        if !candidate.is_empty() && !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }
    candidates
}

/// Scope mutator over every registered resolver for one organization
pub struct ScopeAttributeMutator<'a> {
    resolvers: &'a ScopeResolvers,
    org_id: OrgId,
}

impl ScopeAttributeMutator<'_> {
    /// Organization the mutator resolves for
    pub fn org_id(&self) -> OrgId {
        self.org_id
    }
}

#[async_trait]
impl<'a> ScopeMutator for ScopeAttributeMutator<'a> {
    async fn mutate(&self, scope: &str) -> Result<Vec<String>> {
        self.resolvers.resolve(self.org_id, scope).await
    }
}
